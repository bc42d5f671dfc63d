//! The policy engine: one decision function per kind of agent action.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::PolicyConfig;
use crate::docker::{DockerSafeguards, TRUSTED_REGISTRIES};
use crate::paths::PathValidator;
use crate::result::PolicyResult;
use crate::shell::{self, ShellParser};

/// Executables the engine refuses to see in a multi-command chain.
///
/// [`DANGEROUS_EXECUTABLES`](crate::shell::DANGEROUS_EXECUTABLES) plus `sudo`.
pub const CHAIN_DENIED_EXECUTABLES: &[&str] = &["rm", "dd", "mkfs", "fdisk", "parted", "sudo"];

const DELETE_OPERATIONS: &[&str] = &["delete", "rm", "remove"];

/// Gatekeeper for shell commands, file operations and container operations.
///
/// Configuration is fixed at construction and every check is a pure
/// function of it, so one engine can be shared across threads. Checks
/// never fail: internal errors become DENY results.
#[derive(Debug)]
pub struct PolicyEngine {
    workdir: PathBuf,
    interactive: bool,
    shell_parser: ShellParser,
    path_validator: PathValidator,
    docker_safeguards: DockerSafeguards,
}

impl PolicyEngine {
    /// Create an engine confined to `workdir`.
    ///
    /// When `interactive` is false there is nobody to confirm with, so
    /// checks that would ask the user either deny or pass through.
    pub fn new(workdir: impl AsRef<Path>, config: PolicyConfig, interactive: bool) -> Self {
        let PolicyConfig {
            custom_deny_patterns,
            allowed_paths,
            trusted_registries,
            resource_limits,
        } = config;

        let path_validator = PathValidator::new(workdir, &allowed_paths);
        let shell_parser = ShellParser::with_custom_patterns(custom_deny_patterns);
        let docker_safeguards = DockerSafeguards::new(trusted_registries, resource_limits);

        tracing::debug!(
            workdir = %path_validator.workdir().display(),
            interactive,
            deny_rules = shell_parser.deny_rule_count(),
            allowed_paths = path_validator.allowed_paths().len(),
            "policy engine ready"
        );

        Self {
            workdir: path_validator.workdir().to_path_buf(),
            interactive,
            shell_parser,
            path_validator,
            docker_safeguards,
        }
    }

    /// The resolved sandbox root.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Whether ASK_USER results may be returned.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// The shell parser used by [`check_shell_command`](Self::check_shell_command).
    pub fn shell_parser(&self) -> &ShellParser {
        &self.shell_parser
    }

    /// The path validator used by the file and shell checks.
    pub fn path_validator(&self) -> &PathValidator {
        &self.path_validator
    }

    /// The safeguards used by the container checks.
    pub fn docker_safeguards(&self) -> &DockerSafeguards {
        &self.docker_safeguards
    }

    /// Decide whether an agent may run `command`.
    ///
    /// Checks run in order and the first hit wins: deny patterns, warn
    /// patterns (interactive only), parsing, destructive executables in a
    /// chain, then path-like arguments of the first command.
    pub fn check_shell_command(&self, command: &str) -> PolicyResult {
        record("shell", self.evaluate_shell_command(command))
    }

    fn evaluate_shell_command(&self, command: &str) -> PolicyResult {
        if let Some(hit) = self.shell_parser.check_deny_patterns(command).into_iter().next() {
            return PolicyResult::deny(hit.reason).with_pattern(hit.pattern);
        }

        if self.interactive
            && let Some(hit) = self.shell_parser.check_warn_patterns(command).into_iter().next()
        {
            return PolicyResult::ask_user(format!("Potentially dangerous: {}", hit.reason))
                .with_pattern(hit.pattern);
        }

        let parsed = match self.shell_parser.try_parse(command) {
            Ok(parsed) => parsed,
            Err(e) => return PolicyResult::deny(format!("Command parse error: {e}")),
        };

        if let Some(exe) = shell::dangerous_in_chain(&parsed.executables(), CHAIN_DENIED_EXECUTABLES)
        {
            return PolicyResult::deny(format!("Dangerous command '{exe}' in command chain"));
        }

        for arg in parsed.args.iter().filter(|arg| is_path_like(arg)) {
            if let Err(e) = self.path_validator.validate(arg) {
                return PolicyResult::deny(format!("Path validation failed: {e}"));
            }
        }

        PolicyResult::allow("Command passed all security checks")
    }

    /// Decide whether an agent may perform `operation` on `path`.
    ///
    /// Deletions ask for confirmation in interactive mode.
    pub fn check_file_operation(&self, operation: &str, path: impl AsRef<Path>) -> PolicyResult {
        let path = path.as_ref();
        let result = if let Err(e) = self.path_validator.validate(path) {
            PolicyResult::deny(format!("Path validation failed: {e}"))
        } else if self.interactive && is_delete(operation) {
            PolicyResult::ask_user(format!("Confirm deletion of: {}", path.display()))
        } else {
            PolicyResult::allow(format!("File operation '{operation}' allowed"))
        };
        record("file", result)
    }

    /// Decide whether `image` may be pulled.
    pub fn check_docker_pull(&self, image: &str) -> PolicyResult {
        let verification = self.docker_safeguards.verify_image(image);
        let result = match verification.registry {
            Some(registry) if verification.is_trusted => {
                PolicyResult::allow(format!("Image from trusted registry: {registry}"))
            }
            _ if self.interactive => {
                PolicyResult::ask_user(verification.reason).with_suggestions(self.pull_suggestions())
            }
            _ => PolicyResult::deny(verification.reason),
        };
        record("docker_pull", result)
    }

    /// Decide whether a parsed compose document may be brought up.
    ///
    /// A document too malformed to audit is denied even in interactive mode.
    pub fn check_docker_compose(&self, config: &Value) -> PolicyResult {
        let result = match self.docker_safeguards.audit_compose(config) {
            Err(e) => PolicyResult::deny(format!("Malformed compose configuration: {e}")),
            Ok(warnings) if warnings.is_empty() => {
                PolicyResult::allow("Compose configuration passed security checks")
            }
            Ok(warnings) if self.interactive => {
                PolicyResult::ask_user("Security warnings found in compose configuration")
                    .with_suggestions(warnings)
            }
            Ok(warnings) => PolicyResult::deny(format!("Security issues: {}", warnings.join("; "))),
        };
        record("docker_compose", result)
    }

    /// Returns true if `result` is ALLOW.
    pub fn is_allowed(&self, result: &PolicyResult) -> bool {
        result.is_allowed()
    }

    /// Returns true if `result` is ASK_USER.
    pub fn requires_confirmation(&self, result: &PolicyResult) -> bool {
        result.requires_confirmation()
    }

    /// The flags a container launch in this engine's workdir must carry.
    pub fn container_flags(&self) -> Vec<String> {
        self.docker_safeguards.get_all_safe_flags(&self.workdir)
    }

    fn pull_suggestions(&self) -> Vec<String> {
        let registry = self
            .docker_safeguards
            .trusted_registries()
            .first()
            .map(String::as_str)
            .unwrap_or(TRUSTED_REGISTRIES[0]);
        vec![
            format!("Use an official image from {registry}"),
            "Add the registry to trusted_registries in config".to_string(),
        ]
    }
}

fn is_path_like(arg: &str) -> bool {
    arg.starts_with('/') || arg.starts_with('~') || arg.contains("..")
}

fn is_delete(operation: &str) -> bool {
    let operation = operation.trim();
    DELETE_OPERATIONS
        .iter()
        .any(|op| op.eq_ignore_ascii_case(operation))
}

fn record(check: &'static str, result: PolicyResult) -> PolicyResult {
    tracing::debug!(
        check,
        decision = %result.decision,
        reason = %result.reason,
        matched_pattern = result.matched_pattern.as_deref(),
        "policy decision"
    );
    result
}
