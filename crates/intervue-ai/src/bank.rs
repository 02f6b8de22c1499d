//! Static question bank backing the fallback planner.
//!
//! Templates use `{job_title}` substitution. Keyed by question kind and a
//! junior/mid vs senior/lead split so a lead interview does not open with
//! fizzbuzz.

use intervue_core::types::{QuestionKind, Seniority};

pub struct BankEntry {
    pub competency: &'static str,
    pub template: &'static str,
}

const TECHNICAL_EARLY: &[BankEntry] = &[
    BankEntry {
        competency: "fundamentals",
        template: "Walk me through how you would debug a {job_title} task that works locally but fails in production.",
    },
    BankEntry {
        competency: "coding",
        template: "Describe a piece of code you wrote recently as a {job_title} that you are proud of. What made it good?",
    },
    BankEntry {
        competency: "testing",
        template: "How do you decide what to test when you deliver a change in your day-to-day {job_title} work?",
    },
    BankEntry {
        competency: "tooling",
        template: "Which tools do you reach for first when a {job_title} task involves unfamiliar code, and why?",
    },
    BankEntry {
        competency: "data modeling",
        template: "How would you model the core data for a small project in your area as a {job_title}?",
    },
];

const TECHNICAL_SENIOR: &[BankEntry] = &[
    BankEntry {
        competency: "system design",
        template: "Design the high-level architecture for a service a {job_title} team would own. What trade-offs drive your choices?",
    },
    BankEntry {
        competency: "scalability",
        template: "Tell me how you would evolve an existing {job_title} system that has hit its scaling limits.",
    },
    BankEntry {
        competency: "reliability",
        template: "How do you approach failure modes and graceful degradation when designing as a {job_title}?",
    },
    BankEntry {
        competency: "technical strategy",
        template: "Describe a technical bet you made as a {job_title} that shaped your team's roadmap.",
    },
    BankEntry {
        competency: "code review",
        template: "What do you look for when reviewing a risky change in a {job_title} codebase?",
    },
];

const BEHAVIORAL_EARLY: &[BankEntry] = &[
    BankEntry {
        competency: "teamwork",
        template: "Tell me about a time you disagreed with a teammate on a {job_title} task. How did it resolve?",
    },
    BankEntry {
        competency: "learning",
        template: "Describe something difficult you had to learn quickly for your {job_title} work.",
    },
    BankEntry {
        competency: "ownership",
        template: "Tell me about a mistake you made as a {job_title} and what you changed afterwards.",
    },
    BankEntry {
        competency: "communication",
        template: "How do you keep non-technical colleagues informed about your {job_title} work?",
    },
];

const BEHAVIORAL_SENIOR: &[BankEntry] = &[
    BankEntry {
        competency: "leadership",
        template: "Tell me about a time you had to align several engineers around one {job_title} direction.",
    },
    BankEntry {
        competency: "mentoring",
        template: "How have you grown a less experienced engineer on your {job_title} team?",
    },
    BankEntry {
        competency: "conflict resolution",
        template: "Describe a cross-team conflict you resolved as a {job_title}. What was the cost of the resolution?",
    },
    BankEntry {
        competency: "influence",
        template: "Tell me about a decision you reversed after pushback. What convinced you?",
    },
];

const SITUATIONAL_EARLY: &[BankEntry] = &[
    BankEntry {
        competency: "prioritization",
        template: "You have two urgent {job_title} tasks and time for one before the deadline. How do you decide?",
    },
    BankEntry {
        competency: "incident response",
        template: "A change you shipped as a {job_title} is causing errors for users right now. What do you do first?",
    },
    BankEntry {
        competency: "ambiguity",
        template: "You receive a vague request with no acceptance criteria. How do you proceed as a {job_title}?",
    },
];

const SITUATIONAL_SENIOR: &[BankEntry] = &[
    BankEntry {
        competency: "stakeholder management",
        template: "A stakeholder demands a {job_title} feature your team believes is harmful. How do you handle the conversation?",
    },
    BankEntry {
        competency: "risk management",
        template: "Mid-quarter you discover the current {job_title} plan cannot ship on time. Walk me through your next week.",
    },
    BankEntry {
        competency: "quality vs speed",
        template: "Leadership asks you to cut the testing phase to hit a date. What is your response as a {job_title}?",
    },
];

const GENERAL: &[BankEntry] = &[
    BankEntry {
        competency: "motivation",
        template: "What draws you to this {job_title} role?",
    },
    BankEntry {
        competency: "self-assessment",
        template: "What would your current colleagues say is your biggest strength as a {job_title}, and your biggest gap?",
    },
    BankEntry {
        competency: "career goals",
        template: "Where do you want your {job_title} career to be in three years?",
    },
];

/// Templates for the given kind and seniority.
pub fn bank_for(kind: QuestionKind, seniority: Seniority) -> &'static [BankEntry] {
    let senior = matches!(seniority, Seniority::Senior | Seniority::Lead);
    match (kind, senior) {
        (QuestionKind::Technical, false) => TECHNICAL_EARLY,
        (QuestionKind::Technical, true) => TECHNICAL_SENIOR,
        (QuestionKind::Behavioral, false) => BEHAVIORAL_EARLY,
        (QuestionKind::Behavioral, true) => BEHAVIORAL_SENIOR,
        (QuestionKind::Situational, false) => SITUATIONAL_EARLY,
        (QuestionKind::Situational, true) => SITUATIONAL_SENIOR,
        (QuestionKind::General, _) => GENERAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bucket_has_templates() {
        for kind in [
            QuestionKind::Technical,
            QuestionKind::Behavioral,
            QuestionKind::Situational,
            QuestionKind::General,
        ] {
            for seniority in [Seniority::Junior, Seniority::Lead] {
                assert!(!bank_for(kind, seniority).is_empty());
            }
        }
    }

    #[test]
    fn templates_reference_the_job_title() {
        for entry in TECHNICAL_EARLY.iter().chain(GENERAL) {
            assert!(entry.template.contains("{job_title}"));
        }
    }
}
