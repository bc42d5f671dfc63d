//! Container image trust and launch hardening.
//!
//! [`DockerSafeguards`] decides whether an image reference comes from a
//! trusted registry, renders the flags every container launch must carry,
//! and audits compose configurations for dangerous settings.

mod compose;
mod limits;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use compose::{DANGEROUS_CAPABILITIES, SENSITIVE_HOST_PATHS};
pub use limits::{DEFAULT_CPU_LIMIT, DEFAULT_MEMORY_LIMIT, DEFAULT_PIDS_LIMIT, ResourceLimits};

use crate::error::ComposeError;
use crate::paths;

/// Registry prefixes trusted when none are configured.
pub const TRUSTED_REGISTRIES: &[&str] = &[
    "ghcr.io/traylinx/",
    "docker.io/library/",
    "docker.io/traylinx/",
    "gcr.io/traylinx/",
];

/// Where the workdir is mounted inside the container.
pub const CONTAINER_WORKDIR: &str = "/app";

/// Outcome of [`DockerSafeguards::verify_image`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVerificationResult {
    /// Whether the image comes from a trusted registry
    pub is_trusted: bool,
    /// The trusted prefix that matched
    pub registry: Option<String>,
    /// Human-readable explanation
    pub reason: String,
}

/// Image trust and container hardening settings.
#[derive(Clone, Debug)]
pub struct DockerSafeguards {
    trusted_registries: Vec<String>,
    resource_limits: ResourceLimits,
}

impl Default for DockerSafeguards {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

impl DockerSafeguards {
    /// Create safeguards with the given registries and limits.
    ///
    /// An empty registry list means [`TRUSTED_REGISTRIES`].
    pub fn new(trusted_registries: Vec<String>, resource_limits: Option<ResourceLimits>) -> Self {
        let trusted_registries = if trusted_registries.is_empty() {
            TRUSTED_REGISTRIES.iter().map(|r| r.to_string()).collect()
        } else {
            trusted_registries
        };
        Self {
            trusted_registries,
            resource_limits: resource_limits.unwrap_or_default(),
        }
    }

    /// The trusted registry prefixes, in match order.
    pub fn trusted_registries(&self) -> &[String] {
        &self.trusted_registries
    }

    /// The limits rendered by [`get_resource_limit_flags`](Self::get_resource_limit_flags).
    pub fn resource_limits(&self) -> &ResourceLimits {
        &self.resource_limits
    }

    /// Check whether `image` comes from a trusted registry.
    ///
    /// Matching is a case-insensitive prefix match on the normalized
    /// reference, so `python:3.11` is checked as `docker.io/library/python:3.11`.
    pub fn verify_image(&self, image: &str) -> ImageVerificationResult {
        let image = image.trim().to_lowercase();

        // These would normalize into a trusted prefix without naming an image.
        if image.is_empty() {
            return untrusted("Image reference is empty");
        }
        if image.starts_with('-') || image.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return untrusted("Image reference is malformed");
        }

        let normalized = normalize_image_reference(&image);
        match self
            .trusted_registries
            .iter()
            .find(|registry| normalized.starts_with(&registry.trim().to_lowercase()))
        {
            Some(registry) => ImageVerificationResult {
                is_trusted: true,
                registry: Some(registry.clone()),
                reason: "Image from trusted registry".to_string(),
            },
            None => untrusted(format!(
                "Image not from trusted registry. Trusted: {}",
                self.trusted_registries.join(", ")
            )),
        }
    }

    /// Returns true if [`verify_image`](Self::verify_image) trusts `image`.
    pub fn is_trusted_image(&self, image: &str) -> bool {
        self.verify_image(image).is_trusted
    }

    /// `--memory`, `--cpus` and `--pids-limit` flags with their values.
    pub fn get_resource_limit_flags(&self) -> Vec<String> {
        self.resource_limits.to_flags()
    }

    /// Hardening flags for every container launch.
    pub fn get_security_flags(&self) -> Vec<String> {
        [
            "--security-opt",
            "no-new-privileges:true",
            "--cap-drop",
            "ALL",
            "--read-only",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// The only mount a container gets: the resolved workdir, read-write.
    pub fn get_safe_volume_mounts(&self, workdir: impl AsRef<Path>) -> Vec<String> {
        let workdir = paths::resolve_root(workdir.as_ref());
        vec![format!("{}:{CONTAINER_WORKDIR}:rw", workdir.display())]
    }

    /// [`get_safe_volume_mounts`](Self::get_safe_volume_mounts) as `-v` flags.
    pub fn get_safe_volume_mount_flags(&self, workdir: impl AsRef<Path>) -> Vec<String> {
        self.get_safe_volume_mounts(workdir)
            .into_iter()
            .flat_map(|mount| ["-v".to_string(), mount])
            .collect()
    }

    /// Volume, resource limit and security flags, in that order.
    pub fn get_all_safe_flags(&self, workdir: impl AsRef<Path>) -> Vec<String> {
        let mut flags = self.get_safe_volume_mount_flags(workdir);
        flags.extend(self.get_resource_limit_flags());
        flags.extend(self.get_security_flags());
        flags
    }

    /// Audit a parsed compose document, one warning per finding.
    ///
    /// Never fails: a malformed document is reported as a warning.
    pub fn validate_compose_config(&self, config: &Value) -> Vec<String> {
        match self.audit_compose(config) {
            Ok(warnings) => warnings,
            Err(e) => vec![format!("Malformed compose configuration: {e}")],
        }
    }

    /// Audit a parsed compose document, separating structural errors from findings.
    pub fn audit_compose(&self, config: &Value) -> Result<Vec<String>, ComposeError> {
        compose::audit(config)
    }
}

/// Expand short image references to their Docker Hub form.
///
/// `python` becomes `docker.io/library/python` and `user/repo` becomes
/// `docker.io/user/repo`. References whose first segment looks like a
/// registry host are returned unchanged.
pub fn normalize_image_reference(image: &str) -> String {
    match image.split_once('/') {
        None => format!("docker.io/library/{image}"),
        Some((first, rest)) if !rest.contains('/') && !first.contains('.') => {
            format!("docker.io/{image}")
        }
        Some(_) => image.to_string(),
    }
}

fn untrusted(reason: impl Into<String>) -> ImageVerificationResult {
    ImageVerificationResult {
        is_trusted: false,
        registry: None,
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_official_image_trusted() {
        let safeguards = DockerSafeguards::default();
        let result = safeguards.verify_image("python:3.11");
        assert!(result.is_trusted);
        assert_eq!(result.registry.as_deref(), Some("docker.io/library/"));
    }

    #[test]
    fn test_traylinx_images_trusted() {
        let safeguards = DockerSafeguards::default();
        assert!(safeguards.is_trusted_image("ghcr.io/traylinx/agent:v1"));
        assert!(safeguards.is_trusted_image("traylinx/agent:latest"));
        assert!(safeguards.is_trusted_image("gcr.io/traylinx/tools"));
    }

    #[test]
    fn test_trust_is_case_insensitive() {
        let safeguards = DockerSafeguards::default();
        assert!(safeguards.is_trusted_image("GHCR.IO/TRAYLINX/agent:V1"));
        assert!(safeguards.is_trusted_image("  Python:3.11  "));
    }

    #[test]
    fn test_untrusted_registry() {
        let safeguards = DockerSafeguards::default();
        let result = safeguards.verify_image("evil.io/malware:latest");
        assert!(!result.is_trusted);
        assert!(result.registry.is_none());
        assert_eq!(
            result.reason,
            "Image not from trusted registry. Trusted: ghcr.io/traylinx/, docker.io/library/, docker.io/traylinx/, gcr.io/traylinx/"
        );
    }

    #[test]
    fn test_hub_user_image_untrusted() {
        let safeguards = DockerSafeguards::default();
        assert!(!safeguards.is_trusted_image("someuser/tool:1.0"));
        // A dotted first segment is a registry host, not a Hub user
        assert!(!safeguards.is_trusted_image("registry.example.com/library/python"));
    }

    #[test]
    fn test_malformed_references_untrusted() {
        let safeguards = DockerSafeguards::default();
        for image in ["", "   ", "--privileged", "python --privileged", "python\n"] {
            assert!(!safeguards.is_trusted_image(image), "{image:?}");
        }
    }

    #[test]
    fn test_custom_registries_replace_defaults() {
        let safeguards = DockerSafeguards::new(vec!["Registry.Corp/".to_string()], None);
        assert!(safeguards.is_trusted_image("registry.corp/team/app:1"));
        assert!(!safeguards.is_trusted_image("python:3.11"));
    }

    #[test]
    fn test_normalize_image_reference() {
        assert_eq!(normalize_image_reference("alpine"), "docker.io/library/alpine");
        assert_eq!(normalize_image_reference("user/app"), "docker.io/user/app");
        assert_eq!(
            normalize_image_reference("localhost:5000/app"),
            "docker.io/localhost:5000/app"
        );
        assert_eq!(normalize_image_reference("quay.io/org/app"), "quay.io/org/app");
    }

    #[test]
    fn test_resource_limit_flags() {
        let safeguards = DockerSafeguards::default();
        assert_eq!(
            safeguards.get_resource_limit_flags(),
            vec!["--memory", "2g", "--cpus", "2", "--pids-limit", "100"]
        );

        let custom = DockerSafeguards::new(
            Vec::new(),
            Some(ResourceLimits {
                memory: "512m".to_string(),
                ..ResourceLimits::default()
            }),
        );
        assert_eq!(custom.get_resource_limit_flags()[1], "512m");
    }

    #[test]
    fn test_security_flags() {
        let flags = DockerSafeguards::default().get_security_flags();
        assert_eq!(
            flags,
            vec![
                "--security-opt",
                "no-new-privileges:true",
                "--cap-drop",
                "ALL",
                "--read-only",
            ]
        );
    }

    #[test]
    fn test_volume_mounts() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = paths::resolve_root(dir.path());
        let safeguards = DockerSafeguards::default();

        let mounts = safeguards.get_safe_volume_mounts(dir.path());
        assert_eq!(mounts, vec![format!("{}:/app:rw", resolved.display())]);

        let flags = safeguards.get_safe_volume_mount_flags(dir.path());
        assert_eq!(flags, vec!["-v".to_string(), mounts[0].clone()]);
    }

    #[test]
    fn test_all_safe_flags_order() {
        let dir = tempfile::tempdir().unwrap();
        let flags = DockerSafeguards::default().get_all_safe_flags(dir.path());
        assert_eq!(flags[0], "-v");
        assert_eq!(flags[2], "--memory");
        assert_eq!(flags.last().map(String::as_str), Some("--read-only"));
        assert_eq!(flags.len(), 2 + 6 + 5);
    }

    #[test]
    fn test_validate_compose_never_fails() {
        let safeguards = DockerSafeguards::default();
        let warnings = safeguards.validate_compose_config(&json!("not a mapping"));
        assert_eq!(
            warnings,
            vec!["Malformed compose configuration: compose configuration is not a mapping"]
        );

        let warnings = safeguards.validate_compose_config(&json!({
            "services": { "app": { "privileged": true } }
        }));
        assert_eq!(warnings, vec!["Service 'app' uses privileged mode"]);
    }
}
