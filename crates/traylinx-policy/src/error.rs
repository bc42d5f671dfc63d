//! Error types for the policy components.
//!
//! None of these escape [`PolicyEngine`](crate::PolicyEngine)'s `check_*`
//! methods; they are folded into DENY results there.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving a filesystem path.
#[derive(Debug, Error)]
pub enum PathError {
    /// The path contains a NUL byte and cannot be passed to the OS.
    #[error("path contains a null byte")]
    NulByte,
    /// Symlink resolution did not terminate.
    #[error("too many levels of symbolic links resolving {0}")]
    SymlinkLoop(PathBuf),
    /// The path starts with `~` but no home directory is known.
    #[error("cannot expand '~': home directory is unknown")]
    NoHomeDir,
    /// The current directory was needed but could not be determined.
    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    /// The OS rejected a lookup while resolving the path.
    #[error("cannot resolve {path}: {source}")]
    Io {
        /// Path being inspected when the error occurred
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while parsing a shell command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The command contains a NUL byte, which no shell can receive intact.
    #[error("command contains a null byte")]
    NulByte,
    /// The command exceeds the maximum length the parser will inspect.
    #[error("command is {len} bytes, exceeding the {max} byte limit")]
    TooLong {
        /// Length of the rejected command in bytes
        len: usize,
        /// Maximum accepted length in bytes
        max: usize,
    },
}

/// Structural problems in a compose configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// The document root is not a mapping.
    #[error("compose configuration is not a mapping")]
    NotMapping,
    /// `services` is present but not a mapping.
    #[error("'services' is not a mapping")]
    ServicesNotMapping,
    /// A service definition is neither a mapping nor empty.
    #[error("service '{0}' is not a mapping")]
    ServiceNotMapping(String),
    /// A `<<` merge key was left unapplied, hiding inherited settings.
    #[error("'{0}' contains an unresolved '<<' merge key")]
    UnresolvedMerge(String),
    /// A list-valued service field has the wrong shape.
    #[error("service '{service}' field '{field}' is not a list")]
    FieldNotList {
        /// Service name
        service: String,
        /// Offending field
        field: &'static str,
    },
}

/// Errors that can occur while loading or validating a [`PolicyConfig`](crate::PolicyConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// TOML syntax or shape error.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON syntax or shape error.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// A custom deny pattern is not a valid regular expression.
    #[error("invalid deny pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The pattern as written in the config
        pattern: String,
        /// Compiler error message
        message: String,
    },
}

/// Why a path was rejected by [`PathValidator::validate`](crate::PathValidator::validate).
#[derive(Debug, Error)]
pub enum PathViolation {
    /// A `..` component resolves to somewhere not permitted.
    #[error("Path traversal detected")]
    Traversal,
    /// The raw path contains a NUL byte.
    #[error("Null byte injection detected")]
    NulByte,
    /// The path is, or lies under, a sensitive location.
    #[error("Access to sensitive path: {}", .0.display())]
    Sensitive(PathBuf),
    /// The path resolves outside the workdir and every allowed path.
    #[error("Path outside allowed directories: {0}")]
    Outside(String),
    /// The path could not be resolved at all.
    #[error("Path resolution error: {0}")]
    Unresolvable(#[from] PathError),
}

/// Why a command was rejected by [`ShellParser::check`](crate::ShellParser::check).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandViolation {
    /// A deny pattern matched the raw command text.
    #[error("Blocked: {0}")]
    Blocked(String),
    /// A destructive executable appears in a multi-command chain.
    #[error("Dangerous command '{0}' in chain")]
    DangerousChain(String),
    /// The command could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}
