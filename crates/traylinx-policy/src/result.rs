//! Decision types returned by every policy check.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The verdict of a policy check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    /// The operation may proceed.
    Allow,
    /// The operation must not proceed.
    Deny,
    /// The operation may proceed only after explicit human confirmation.
    AskUser,
}

impl PolicyDecision {
    /// Lowercase label used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyDecision::Allow => "allow",
            PolicyDecision::Deny => "deny",
            PolicyDecision::AskUser => "ask_user",
        }
    }
}

impl fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one policy check.
///
/// Created fresh per check and consumed by the caller to decide whether to
/// execute, abort, or prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// The verdict
    pub decision: PolicyDecision,
    /// Human-readable explanation, shown verbatim to the user
    pub reason: String,
    /// The rule that triggered a DENY or ASK_USER, for audit logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    /// Remediation hints shown alongside the reason
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl PolicyResult {
    /// An ALLOW result.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self::new(PolicyDecision::Allow, reason)
    }

    /// A DENY result.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::new(PolicyDecision::Deny, reason)
    }

    /// An ASK_USER result.
    pub fn ask_user(reason: impl Into<String>) -> Self {
        Self::new(PolicyDecision::AskUser, reason)
    }

    fn new(decision: PolicyDecision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            matched_pattern: None,
            suggestions: Vec::new(),
        }
    }

    /// Attach the rule that produced this result.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.matched_pattern = Some(pattern.into());
        self
    }

    /// Attach remediation hints.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Returns true if the decision is ALLOW.
    pub fn is_allowed(&self) -> bool {
        self.decision == PolicyDecision::Allow
    }

    /// Returns true if the decision is ASK_USER.
    pub fn requires_confirmation(&self) -> bool {
        self.decision == PolicyDecision::AskUser
    }

    /// Returns the reason if the decision is DENY, None otherwise.
    pub fn denial_reason(&self) -> Option<&str> {
        match self.decision {
            PolicyDecision::Deny => Some(&self.reason),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let allow = PolicyResult::allow("ok");
        assert!(allow.is_allowed());
        assert!(!allow.requires_confirmation());
        assert!(allow.denial_reason().is_none());

        let ask = PolicyResult::ask_user("sure?");
        assert!(!ask.is_allowed());
        assert!(ask.requires_confirmation());

        let deny = PolicyResult::deny("nope");
        assert!(!deny.is_allowed());
        assert!(!deny.requires_confirmation());
        assert_eq!(deny.denial_reason(), Some("nope"));
    }

    #[test]
    fn test_serialized_form() {
        let result = PolicyResult::ask_user("Potentially dangerous: Dynamic code evaluation")
            .with_pattern(r"eval\s+");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["decision"], "ask_user");
        assert_eq!(json["matched_pattern"], r"eval\s+");
        // Empty suggestions are omitted entirely
        assert!(json.get("suggestions").is_none());
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(PolicyDecision::Allow.to_string(), "allow");
        assert_eq!(PolicyDecision::Deny.to_string(), "deny");
        assert_eq!(PolicyDecision::AskUser.to_string(), "ask_user");
    }
}
