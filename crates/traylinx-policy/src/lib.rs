//! Traylinx Policy: security gatekeeping for autonomous agents
//!
//! Every potentially dangerous action an agent attempts on the host (a shell
//! command, a file operation, an image pull, a compose deployment) is checked
//! by a [`PolicyEngine`] before it runs. Each check returns a [`PolicyResult`]
//! whose decision is ALLOW, DENY, or ASK_USER, with a human-readable reason.
//!
//! The engine never returns an error: anything it cannot reason about is
//! denied.
//!
//! ```rust
//! use traylinx_policy::{PolicyConfig, PolicyDecision, PolicyEngine};
//!
//! let engine = PolicyEngine::new("/app/project", PolicyConfig::default(), false);
//!
//! assert!(engine.check_shell_command("ls -la").is_allowed());
//! assert_eq!(
//!     engine.check_shell_command("rm -rf /").decision,
//!     PolicyDecision::Deny
//! );
//! assert_eq!(
//!     engine.check_docker_pull("evil.io/malware:latest").decision,
//!     PolicyDecision::Deny
//! );
//! ```

mod config;
mod engine;
mod error;
mod result;


pub mod docker;
pub mod paths;
pub mod shell;

pub use config::PolicyConfig;
pub use docker::{DockerSafeguards, ImageVerificationResult, ResourceLimits};
pub use engine::{CHAIN_DENIED_EXECUTABLES, PolicyEngine};
pub use error::{
    CommandViolation, ComposeError, ConfigError, ParseError, PathError, PathViolation,
};
pub use paths::{PathValidator, is_path_safe, validate_path};
pub use result::{PolicyDecision, PolicyResult};
pub use shell::{ParsedCommand, PatternMatch, PatternRule, ShellParser};
