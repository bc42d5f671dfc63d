//! Shell command inspection.
//!
//! [`ShellParser`] turns a raw command string into a [`ParsedCommand`] chain
//! and matches the raw text against deny and warn [pattern lists](patterns).
//! Structure and text are checked independently: a deny pattern blocks a
//! command no matter how it parses, and a destructive executable is caught
//! anywhere in a chain even when no pattern matches.
//!
//! ## Example
//!
//! ```rust
//! use traylinx_policy::ShellParser;
//!
//! let parser = ShellParser::new();
//!
//! let cmd = parser.parse("cat file.txt | grep pattern");
//! assert_eq!(cmd.executable, "cat");
//! assert!(cmd.has_pipe);
//!
//! assert!(parser.is_safe("ls -la"));
//! assert!(!parser.is_safe("ls && rm -rf /tmp"));
//! ```

mod parser;
pub mod patterns;

use std::path::Path;

pub use parser::{MAX_COMMAND_LEN, ParsedCommand};
pub use patterns::{DENY_PATTERNS, PatternMatch, PatternRule, WARN_PATTERNS};

use crate::error::{CommandViolation, ParseError};
use patterns::PatternSet;

/// Executables that must never run as part of a multi-command chain.
pub const DANGEROUS_EXECUTABLES: &[&str] = &["rm", "dd", "mkfs", "fdisk", "parted"];

/// Parser for shell commands with deny/warn pattern checks.
///
/// Pattern lists are compiled once at construction; the parser is immutable
/// afterwards and can be shared across threads.
#[derive(Debug)]
pub struct ShellParser {
    deny: PatternSet,
    warn: PatternSet,
}

impl Default for ShellParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellParser {
    /// Create a parser with the built-in pattern lists.
    pub fn new() -> Self {
        Self::with_custom_patterns(Vec::new())
    }

    /// Create a parser whose deny list is the built-in list followed by `custom`.
    pub fn with_custom_patterns(custom: impl IntoIterator<Item = PatternRule>) -> Self {
        let mut deny = PatternSet::from_builtin(DENY_PATTERNS);
        deny.extend(custom);
        Self {
            deny,
            warn: PatternSet::from_builtin(WARN_PATTERNS),
        }
    }

    /// Parse a command into its chain structure.
    ///
    /// Never fails: unbalanced quoting degrades to whitespace splitting.
    pub fn parse(&self, command: &str) -> ParsedCommand {
        parser::parse(command)
    }

    /// Parse a command, rejecting input too long or malformed to reason about.
    ///
    /// Rejects commands containing NUL bytes or longer than [`MAX_COMMAND_LEN`].
    pub fn try_parse(&self, command: &str) -> Result<ParsedCommand, ParseError> {
        parser::try_parse(command)
    }

    /// Number of deny rules, built-in and custom.
    pub fn deny_rule_count(&self) -> usize {
        self.deny.len()
    }

    /// Every deny pattern matching the raw command.
    pub fn check_deny_patterns(&self, command: &str) -> Vec<PatternMatch> {
        self.deny.matches(command)
    }

    /// Every warn pattern matching the raw command.
    pub fn check_warn_patterns(&self, command: &str) -> Vec<PatternMatch> {
        self.warn.matches(command)
    }

    /// Executables of `cmd` and its whole chain, in chain order.
    pub fn get_all_executables(&self, cmd: &ParsedCommand) -> Vec<String> {
        cmd.executables().into_iter().map(str::to_string).collect()
    }

    /// Check a command, returning why it is unsafe.
    ///
    /// Deny patterns are checked first, then the parsed chain is checked for
    /// [`DANGEROUS_EXECUTABLES`] alongside any other executable.
    pub fn check(&self, command: &str) -> Result<(), CommandViolation> {
        if let Some(first) = self.check_deny_patterns(command).into_iter().next() {
            return Err(CommandViolation::Blocked(first.reason));
        }

        let parsed = self.try_parse(command)?;
        if let Some(exe) = dangerous_in_chain(&parsed.executables(), DANGEROUS_EXECUTABLES) {
            return Err(CommandViolation::DangerousChain(exe.to_string()));
        }

        Ok(())
    }

    /// Returns true if [`check`](Self::check) passes.
    pub fn is_safe(&self, command: &str) -> bool {
        self.check(command).is_ok()
    }
}

/// The first executable in `dangerous` when the chain has more than one executable.
///
/// Executables are compared by file name, so `/bin/rm` counts as `rm`.
pub(crate) fn dangerous_in_chain<'a>(
    executables: &[&'a str],
    dangerous: &[&str],
) -> Option<&'a str> {
    if executables.len() < 2 {
        return None;
    }
    executables.iter().copied().find(|exe| {
        let name = Path::new(exe)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(exe);
        dangerous.contains(&name)
    })
}
