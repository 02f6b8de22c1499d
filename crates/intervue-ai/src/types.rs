use intervue_core::types::{Answer, Question, QuestionKind, Seniority, TranscriptEntry};
use serde::{Deserialize, Serialize};

/// Inputs to the interview planner.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub job_title: String,
    pub seniority: Seniority,
    pub language: String,
    pub num_questions: u8,
}

/// One planned question, before persistence assigns it an id and index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedQuestion {
    pub kind: QuestionKind,
    pub competency: String,
    pub text: String,
}

/// Context handed to the evaluator alongside a question/answer pair.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub job_title: String,
    pub seniority: Seniority,
    /// 1-based index of the question being answered.
    pub question_index: u32,
    pub total_questions: u8,
}

/// Summarizer input for scripted sessions: the answered pairs plus which
/// indices never got an answer. Partial iff `unanswered` is non-empty.
#[derive(Debug, Clone)]
pub struct ScriptedSummaryInput {
    pub job_title: String,
    pub seniority: Seniority,
    pub pairs: Vec<(Question, Answer)>,
    pub unanswered: Vec<u32>,
}

impl ScriptedSummaryInput {
    pub fn is_partial(&self) -> bool {
        !self.unanswered.is_empty()
    }
}

/// Summarizer input for conversational sessions: the raw transcript plus
/// question progress. Partial iff `questions_asked < target_questions`.
#[derive(Debug, Clone)]
pub struct TranscriptSummaryInput {
    pub job_title: String,
    pub seniority: Seniority,
    pub transcript: Vec<TranscriptEntry>,
    pub questions_asked: u32,
    pub target_questions: u8,
}

impl TranscriptSummaryInput {
    pub fn is_partial(&self) -> bool {
        self.questions_asked < self.target_questions as u32
    }
}
