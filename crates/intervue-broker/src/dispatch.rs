/// Room pattern the broker routes to the agent binary.
///
/// Declared once out-of-band at the broker; the core relies on the broker's
/// guarantee that any room matching the pattern gets exactly one agent
/// instance spawned into it when a participant joins. Without the rule,
/// rooms stay joinable and the core degrades to text-only mode.
pub const AGENT_ROOM_PATTERN: &str = "interview-*";

/// A broker-side dispatch rule. The adapter only validates and matches
/// patterns — it never spawns workers itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRule {
    pub pattern: String,
}

impl DispatchRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The rule that routes interview rooms to the agent entrypoint.
    pub fn agent_rule() -> Self {
        Self::new(AGENT_ROOM_PATTERN)
    }

    /// Prefix-glob match: a trailing `*` matches any suffix, otherwise the
    /// room name must match exactly.
    pub fn matches(&self, room_name: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => room_name.starts_with(prefix),
            None => room_name == self.pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::room_name_for;

    #[test]
    fn agent_rule_matches_interview_rooms() {
        let rule = DispatchRule::agent_rule();
        assert!(rule.matches(&room_name_for("abc-123")));
        assert!(rule.matches("interview-"));
        assert!(!rule.matches("standup-abc"));
    }

    #[test]
    fn exact_patterns_need_exact_names() {
        let rule = DispatchRule::new("interview-fixed");
        assert!(rule.matches("interview-fixed"));
        assert!(!rule.matches("interview-fixed-2"));
    }
}
