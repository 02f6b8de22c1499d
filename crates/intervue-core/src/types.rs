use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an interview session (UUIDv7 — time-sortable for
/// easier log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Target seniority of the mock interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Lead,
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seniority::Junior => write!(f, "junior"),
            Seniority::Mid => write!(f, "mid"),
            Seniority::Senior => write!(f, "senior"),
            Seniority::Lead => write!(f, "lead"),
        }
    }
}

impl std::str::FromStr for Seniority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "junior" => Ok(Seniority::Junior),
            "mid" => Ok(Seniority::Mid),
            "senior" => Ok(Seniority::Senior),
            "lead" => Ok(Seniority::Lead),
            other => Err(format!("unknown seniority: {}", other)),
        }
    }
}

/// Session lifecycle status. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

/// How a session collects answers.
///
/// Scripted sessions pre-generate questions at creation; answers arrive over
/// HTTP and the report summarizes question/answer pairs. Conversational
/// sessions skip pre-generation; the report is derived from the transcript
/// alone. Fixed per session at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Scripted,
    Conversational,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Scripted => write!(f, "scripted"),
            SessionMode::Conversational => write!(f, "conversational"),
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scripted" => Ok(SessionMode::Scripted),
            "conversational" => Ok(SessionMode::Conversational),
            other => Err(format!("unknown session mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Technical,
    Behavioral,
    Situational,
    General,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Technical => write!(f, "technical"),
            QuestionKind::Behavioral => write!(f, "behavioral"),
            QuestionKind::Situational => write!(f, "situational"),
            QuestionKind::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "technical" => Ok(QuestionKind::Technical),
            "behavioral" => Ok(QuestionKind::Behavioral),
            "situational" => Ok(QuestionKind::Situational),
            "general" => Ok(QuestionKind::General),
            other => Err(format!("unknown question kind: {}", other)),
        }
    }
}

/// Speaker role in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One committed utterance in the session transcript.
///
/// The transcript is append-only while the agent runs; the whole sequence is
/// snapshotted into `Session.transcript` on a timer and at finalize time.
/// Timestamps are non-decreasing within one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Who produced a report: the LLM summarizer or the in-process fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Llm,
    Fallback,
}

/// Structured evaluation report attached to a completed session.
///
/// Shape bounds (enforced by the summarizers): 2–5 strengths, 2–5 weaknesses,
/// 3–6 action-plan steps, 2–4 suggested roles. `completion_note` is present
/// iff the interview was partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub overall_score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub action_plan: Vec<String>,
    pub suggested_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_note: Option<String>,
    pub generated_by: ReportSource,
}

impl Report {
    /// True when this report covers an incomplete interview.
    pub fn is_partial(&self) -> bool {
        self.completion_note.is_some()
    }
}

/// Scores produced by the answer evaluator. All dimensions 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerScores {
    pub overall: u8,
    pub relevance: u8,
    pub clarity: u8,
    pub structure: u8,
    pub impact: u8,
    pub coach_notes: String,
}

/// A persisted interview session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub job_title: String,
    pub seniority: Seniority,
    pub language: String,
    pub mode: SessionMode,
    pub num_questions: u8,
    pub status: SessionStatus,
    pub overall_score: Option<u8>,
    pub summary: Option<Report>,
    pub transcript: Option<Vec<TranscriptEntry>>,
    /// Counter maintained by transcript snapshots — how many questions the
    /// agent has asked so far. Used for conversational partiality detection.
    pub questions_asked: u32,
    /// RFC3339.
    pub created_at: String,
    /// RFC3339; set iff status is `completed`.
    pub completed_at: Option<String>,
}

/// A pre-generated interview question (scripted mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub session_id: SessionId,
    /// 1-based, unique within the session.
    pub index: u32,
    pub kind: QuestionKind,
    pub competency: String,
    pub text: String,
}

/// A write-once answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub question_id: String,
    pub text: String,
    pub relevance: Option<u8>,
    pub clarity: Option<u8>,
    pub structure: Option<u8>,
    pub impact: Option<u8>,
    pub overall_score: u8,
    pub coach_notes: String,
    pub created_at: String,
}

/// Upper bound on every score field in the data model.
pub const MAX_SCORE: u8 = 100;

/// Validate a score against the 0..=100 range shared by every score field.
pub fn score_in_range(score: u8) -> bool {
    score <= MAX_SCORE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seniority_roundtrip() {
        for s in ["junior", "mid", "senior", "lead"] {
            let parsed: Seniority = s.parse().expect("parse failed");
            assert_eq!(parsed.to_string(), s);
        }
        assert!("principal".parse::<Seniority>().is_err());
    }

    #[test]
    fn seniority_is_ordinal() {
        assert!(Seniority::Junior < Seniority::Mid);
        assert!(Seniority::Senior < Seniority::Lead);
    }

    #[test]
    fn report_partial_iff_completion_note() {
        let mut report = Report {
            overall_score: 70,
            strengths: vec!["a".into(), "b".into()],
            weaknesses: vec!["c".into(), "d".into()],
            action_plan: vec!["x".into(), "y".into(), "z".into()],
            suggested_roles: vec!["r1".into(), "r2".into()],
            completion_note: None,
            generated_by: ReportSource::Fallback,
        };
        assert!(!report.is_partial());
        report.completion_note = Some("interview ended early".into());
        assert!(report.is_partial());
    }

    #[test]
    fn transcript_entry_serde_roundtrip() {
        let entry = TranscriptEntry::now(Role::Assistant, "Tell me about yourself.");
        let json = serde_json::to_string(&entry).expect("serialize");
        let back: TranscriptEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, entry);
    }

    #[test]
    fn session_mode_defaults_to_scripted() {
        assert_eq!(SessionMode::default(), SessionMode::Scripted);
    }
}
