//! Static audit of compose configurations.

use serde_json::{Map, Value};

use crate::error::ComposeError;

/// Host paths that must not be bind-mounted into a service.
pub const SENSITIVE_HOST_PATHS: &[&str] = &["/", "/etc", "/var", "/usr"];

/// Capabilities that must not be added to a service.
pub const DANGEROUS_CAPABILITIES: &[&str] = &["SYS_ADMIN", "NET_ADMIN", "SYS_PTRACE"];

const DOCKER_SOCKET: &str = "docker.sock";

const MERGE_KEY: &str = "<<";

/// Audit every service, returning one warning per finding.
pub(crate) fn audit(config: &Value) -> Result<Vec<String>, ComposeError> {
    let root = config.as_object().ok_or(ComposeError::NotMapping)?;
    let services = match root.get("services") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(services)) => services,
        Some(_) => return Err(ComposeError::ServicesNotMapping),
    };
    if services.contains_key(MERGE_KEY) {
        return Err(ComposeError::UnresolvedMerge("services".to_string()));
    }

    let mut warnings = Vec::new();
    for (name, service) in services {
        match service {
            Value::Null => {}
            Value::Object(service) => audit_service(name, service, &mut warnings)?,
            _ => return Err(ComposeError::ServiceNotMapping(name.clone())),
        }
    }
    Ok(warnings)
}

fn audit_service(
    name: &str,
    service: &Map<String, Value>,
    warnings: &mut Vec<String>,
) -> Result<(), ComposeError> {
    // Merged settings must be applied by the loader before auditing.
    if service.contains_key(MERGE_KEY) {
        return Err(ComposeError::UnresolvedMerge(name.to_string()));
    }

    if service.get("privileged").is_some_and(is_truthy) {
        warnings.push(format!("Service '{name}' uses privileged mode"));
    }

    if service.get("network_mode").and_then(Value::as_str) == Some("host") {
        warnings.push(format!("Service '{name}' uses host network"));
    }

    for volume in list_field(name, service, "volumes")? {
        let Some(mount) = BindMount::from_value(volume) else {
            continue;
        };
        if mount.source.contains(DOCKER_SOCKET) && !mount.read_only {
            warnings.push(format!("Service '{name}' has write access to Docker socket"));
        }
        let host = normalize_host_path(&mount.source);
        if SENSITIVE_HOST_PATHS.contains(&host) {
            warnings.push(format!("Service '{name}' mounts sensitive host path: {host}"));
        }
    }

    for cap in list_field(name, service, "cap_add")? {
        let Some(cap) = cap.as_str() else {
            continue;
        };
        let upper = cap.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("CAP_").unwrap_or(&upper);
        if DANGEROUS_CAPABILITIES.contains(&bare) {
            warnings.push(format!("Service '{name}' adds dangerous capability: {cap}"));
        }
    }

    Ok(())
}

/// A host-to-container mount, from either volume syntax.
#[derive(Debug, PartialEq, Eq)]
struct BindMount {
    source: String,
    read_only: bool,
}

impl BindMount {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            // host:container[:mode]; a lone path is an anonymous volume
            Value::String(spec) => {
                let mut parts = spec.split(':');
                let source = parts.next()?;
                parts.next()?;
                let read_only = parts
                    .next()
                    .is_some_and(|mode| mode.split(',').any(|m| m.trim() == "ro"));
                Some(Self {
                    source: source.to_string(),
                    read_only,
                })
            }
            Value::Object(long) => Some(Self {
                source: long.get("source")?.as_str()?.to_string(),
                read_only: long.get("read_only").is_some_and(is_truthy),
            }),
            _ => None,
        }
    }
}

fn list_field<'a>(
    service: &str,
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a [Value], ComposeError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ComposeError::FieldNotList {
            service: service.to_string(),
            field,
        }),
    }
}

fn normalize_host_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        _ => false,
    }
}
