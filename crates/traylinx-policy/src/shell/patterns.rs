//! Regex rule lists matched against raw command text.

use regex_lite::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Built-in patterns that block a command outright.
pub const DENY_PATTERNS: &[(&str, &str)] = &[
    // Destructive file operations
    (
        r"rm\s+(-[rRf]+\s+|--recursive\s+|--force\s+)*(/|~|\$HOME)",
        "Recursive delete of root/home",
    ),
    (r"rm\s+-[rRf]*\s+\*", "Wildcard recursive delete"),
    // Remote code execution
    (r"curl\s+.*\|\s*(ba)?sh", "Remote script execution via curl"),
    (r"wget\s+.*\|\s*(ba)?sh", "Remote script execution via wget"),
    (r"curl\s+.*-o\s+/tmp/.*&&.*sh", "Download and execute pattern"),
    // System damage
    (r"dd\s+if=.*of=/dev/sd[a-z]", "Direct disk write"),
    (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;", "Fork bomb"),
    (r"mkfs\.", "Filesystem format"),
    (r">\s*/dev/sd[a-z]", "Direct device write"),
    // Permissions
    (r"chmod\s+(-R\s+)?777\s+/", "Overly permissive chmod on root"),
    (r"chown\s+(-R\s+)?.*\s+/", "Chown on root"),
    // Sensitive files
    (r"cat\s+(/etc/shadow|/etc/passwd)", "Sensitive file read"),
    (r">\s*~?/.ssh/", "SSH key modification"),
    // Network exfiltration
    (r"nc\s+-[e]", "Netcat with execute"),
    (r"/dev/tcp/", "Bash TCP device"),
    // Privilege escalation
    (r"sudo\s+su\s*$", "Privilege escalation"),
    (r"sudo\s+-i\s*$", "Interactive sudo"),
];

/// Built-in patterns that warrant confirmation but do not block on their own.
pub const WARN_PATTERNS: &[(&str, &str)] = &[
    (r"eval\s+", "Dynamic code evaluation"),
    (r"exec\s+", "Process replacement"),
    (r"\$\(.*\)", "Command substitution"),
    (r"`.*`", "Backtick command substitution"),
    (r"source\s+", "Script sourcing"),
    (r"\.\s+/", "Dot sourcing"),
];

/// A `(pattern, reason)` pair as written in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Regular expression, matched case-insensitively anywhere in the command
    pub pattern: String,
    /// Short human-readable description of what the pattern catches
    pub reason: String,
}

impl PatternRule {
    /// Create a new rule.
    pub fn new(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Compile the pattern the same way the parser will.
    pub fn compile(&self) -> Result<Regex, regex_lite::Error> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()
    }
}

/// A rule that matched a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternMatch {
    /// The pattern source text
    pub pattern: String,
    /// Why the pattern matters
    pub reason: String,
}

#[derive(Debug)]
struct CompiledRule {
    rule: PatternRule,
    // A rule that failed to compile is kept and always matches.
    regex: Result<Regex, String>,
}

impl CompiledRule {
    fn new(rule: PatternRule) -> Self {
        let regex = rule.compile().map_err(|e| {
            tracing::warn!(
                pattern = %rule.pattern,
                error = %e,
                "pattern failed to compile; it will match every command"
            );
            e.to_string()
        });
        Self { rule, regex }
    }

    fn check(&self, command: &str) -> Option<PatternMatch> {
        match &self.regex {
            Ok(re) if re.is_match(command) => Some(PatternMatch {
                pattern: self.rule.pattern.clone(),
                reason: self.rule.reason.clone(),
            }),
            Ok(_) => None,
            Err(message) => Some(PatternMatch {
                pattern: self.rule.pattern.clone(),
                reason: format!("{} (invalid pattern: {})", self.rule.reason, message),
            }),
        }
    }
}

/// An ordered list of compiled rules.
#[derive(Debug, Default)]
pub(crate) struct PatternSet {
    rules: Vec<CompiledRule>,
}

impl PatternSet {
    pub(crate) fn from_builtin(builtin: &[(&str, &str)]) -> Self {
        Self::from_rules(
            builtin
                .iter()
                .map(|(pattern, reason)| PatternRule::new(*pattern, *reason)),
        )
    }

    pub(crate) fn from_rules(rules: impl IntoIterator<Item = PatternRule>) -> Self {
        Self {
            rules: rules.into_iter().map(CompiledRule::new).collect(),
        }
    }

    pub(crate) fn extend(&mut self, rules: impl IntoIterator<Item = PatternRule>) {
        self.rules.extend(rules.into_iter().map(CompiledRule::new));
    }

    /// Every rule matching `command`, in list order.
    pub(crate) fn matches(&self, command: &str) -> Vec<PatternMatch> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(command))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }
}
