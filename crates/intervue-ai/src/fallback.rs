//! Dependency-free implementations of the planner, evaluator and summarizer.
//!
//! These run entirely in-process and are engaged when no LLM is configured
//! or when the configured one is unavailable. Deterministic on purpose: the
//! same inputs always produce the same scores.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use intervue_core::types::{AnswerScores, QuestionKind, Report, ReportSource, Seniority};

use crate::bank::bank_for;
use crate::coach::{Evaluator, Planner, Summarizer};
use crate::error::Result;
use crate::types::{
    EvalContext, PlanRequest, PlannedQuestion, ScriptedSummaryInput, TranscriptSummaryInput,
};

/// Score assigned when no per-answer scores exist to average.
const NEUTRAL_SCORE: u8 = 70;
/// Dimension averages at or above this become strengths.
const STRENGTH_THRESHOLD: u32 = 75;
/// Dimension averages below this become weaknesses.
const WEAKNESS_THRESHOLD: u32 = 60;

/// The in-process coach. Stateless; one instance serves all sessions.
#[derive(Debug, Clone, Default)]
pub struct FallbackCoach;

impl FallbackCoach {
    pub fn new() -> Self {
        Self
    }

    /// Exactly `num_questions` templated questions with a ~40/30/20/10
    /// technical/behavioral/situational/general mix.
    pub fn plan(&self, req: &PlanRequest) -> Vec<PlannedQuestion> {
        let mut out = Vec::with_capacity(req.num_questions as usize);
        for (kind, count) in kind_counts(req.num_questions) {
            let bank = bank_for(kind, req.seniority);
            for i in 0..count {
                let entry = &bank[i % bank.len()];
                out.push(PlannedQuestion {
                    kind,
                    competency: entry.competency.to_string(),
                    text: entry.template.replace("{job_title}", &req.job_title),
                });
            }
        }
        debug!(n = out.len(), "fallback plan generated");
        out
    }

    /// Heuristic scoring: answer-length buckets plus small bounded noise
    /// derived from a hash of the answer, so repeated evaluation of the same
    /// answer is stable.
    pub fn evaluate(&self, _question: &str, answer: &str, _ctx: &EvalContext) -> AnswerScores {
        let words = answer.split_whitespace().count();
        let (base, notes) = match words {
            0..=9 => (
                44u8,
                "Your answer is very short. Expand with a concrete example and the outcome it produced.",
            ),
            10..=29 => (
                60,
                "A reasonable start. Add more specifics: what was the situation, what did you do, what changed?",
            ),
            30..=79 => (
                74,
                "Good level of detail. Tighten the structure: situation, action, result, in that order.",
            ),
            80..=159 => (
                79,
                "Thorough answer. Watch the length; lead with the result so the key point lands early.",
            ),
            _ => (
                71,
                "Very long answer. Cut secondary detail and keep one strong example with a measurable result.",
            ),
        };

        let noise = hash_noise(answer);
        let overall = shift(base, noise[0]);
        AnswerScores {
            overall,
            relevance: shift(overall, noise[1]),
            clarity: shift(overall, noise[2]),
            structure: shift(overall, noise[3]),
            impact: shift(overall, noise[4]),
            coach_notes: notes.to_string(),
        }
    }

    /// Mean of the per-answer overall scores (neutral when none), strengths
    /// and weaknesses from the dimension averages.
    pub fn summarize_scripted(&self, input: &ScriptedSummaryInput) -> Report {
        let answers: Vec<_> = input.pairs.iter().map(|(_, a)| a).collect();
        let overall = mean(answers.iter().map(|a| a.overall_score as u32)).unwrap_or(NEUTRAL_SCORE as u32) as u8;

        let dims = [
            ("relevance", mean(answers.iter().filter_map(|a| a.relevance.map(u32::from)))),
            ("clarity", mean(answers.iter().filter_map(|a| a.clarity.map(u32::from)))),
            ("structure", mean(answers.iter().filter_map(|a| a.structure.map(u32::from)))),
            ("impact", mean(answers.iter().filter_map(|a| a.impact.map(u32::from)))),
        ];

        let mut strengths: Vec<String> = dims
            .iter()
            .filter(|(_, avg)| avg.is_some_and(|v| v >= STRENGTH_THRESHOLD))
            .map(|(name, _)| strength_phrase(name))
            .collect();
        let mut weaknesses: Vec<String> = dims
            .iter()
            .filter(|(_, avg)| avg.is_some_and(|v| v < WEAKNESS_THRESHOLD))
            .map(|(name, _)| weakness_phrase(name))
            .collect();
        pad_strengths(&mut strengths);
        pad_weaknesses(&mut weaknesses);

        let completion_note = input.is_partial().then(|| {
            format!(
                "Interview partially completed: {} of {} questions were answered.",
                input.pairs.len(),
                input.pairs.len() + input.unanswered.len()
            )
        });

        Report {
            overall_score: overall,
            strengths,
            weaknesses,
            action_plan: action_plan(),
            suggested_roles: suggested_roles(&input.job_title, input.seniority),
            completion_note,
            generated_by: ReportSource::Fallback,
        }
    }

    /// Transcript-only summary: no per-answer scores exist, so the overall
    /// is neutral and the qualitative lists come from the generic pools.
    pub fn summarize_conversational(&self, input: &TranscriptSummaryInput) -> Report {
        let user_turns = input
            .transcript
            .iter()
            .filter(|e| e.role == intervue_core::types::Role::User)
            .count();

        let mut strengths = Vec::new();
        if user_turns >= input.questions_asked as usize && input.questions_asked > 0 {
            strengths.push("responded to every question that was asked".to_string());
        }
        let mut weaknesses = Vec::new();
        pad_strengths(&mut strengths);
        pad_weaknesses(&mut weaknesses);

        let completion_note = input.is_partial().then(|| {
            format!(
                "Interview ended after {} of {} planned questions.",
                input.questions_asked, input.target_questions
            )
        });

        Report {
            overall_score: NEUTRAL_SCORE,
            strengths,
            weaknesses,
            action_plan: action_plan(),
            suggested_roles: suggested_roles(&input.job_title, input.seniority),
            completion_note,
            generated_by: ReportSource::Fallback,
        }
    }

    /// The degenerate report for a session with no transcript and no
    /// answers. Finalize never fails on an empty session; it commits this
    /// instead.
    pub fn empty_session_report(&self, job_title: &str, seniority: Seniority) -> Report {
        Report {
            overall_score: 0,
            strengths: vec![
                "showed up and created an interview session".to_string(),
                "can immediately retry with a fresh session".to_string(),
            ],
            weaknesses: vec!["no interview data".to_string(), "no answers were recorded".to_string()],
            action_plan: vec![
                "start a new session".to_string(),
                "check your microphone and connection before joining".to_string(),
                "answer at least one question to receive real feedback".to_string(),
            ],
            suggested_roles: suggested_roles(job_title, seniority),
            completion_note: Some(
                "No transcript or answers were captured for this session, so no evaluation was possible."
                    .to_string(),
            ),
            generated_by: ReportSource::Fallback,
        }
    }
}

#[async_trait]
impl Planner for FallbackCoach {
    async fn generate_interview_plan(&self, req: &PlanRequest) -> Result<Vec<PlannedQuestion>> {
        Ok(self.plan(req))
    }
}

#[async_trait]
impl Evaluator for FallbackCoach {
    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        ctx: &EvalContext,
    ) -> Result<AnswerScores> {
        Ok(self.evaluate(question, answer, ctx))
    }
}

#[async_trait]
impl Summarizer for FallbackCoach {
    async fn summarize_session(&self, input: &ScriptedSummaryInput) -> Result<Report> {
        Ok(self.summarize_scripted(input))
    }

    async fn summarize_transcript(&self, input: &TranscriptSummaryInput) -> Result<Report> {
        Ok(self.summarize_conversational(input))
    }
}

/// Kind counts for `n` questions: 40% technical, 30% behavioral, 20%
/// situational, remainder general. Always sums to exactly `n`.
fn kind_counts(n: u8) -> [(QuestionKind, usize); 4] {
    let n = n as usize;
    let technical = (n * 4 + 5) / 10;
    let behavioral = (n * 3 + 5) / 10;
    let mut situational = (n * 2 + 5) / 10;
    while technical + behavioral + situational > n {
        situational -= 1;
    }
    let general = n - technical - behavioral - situational;
    // General questions open the interview; the rest follow in blocks.
    [
        (QuestionKind::General, general),
        (QuestionKind::Technical, technical),
        (QuestionKind::Behavioral, behavioral),
        (QuestionKind::Situational, situational),
    ]
}

fn mean(values: impl Iterator<Item = u32>) -> Option<u32> {
    let (sum, count) = values.fold((0u32, 0u32), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| (sum + count / 2) / count)
}

fn shift(score: u8, delta: i8) -> u8 {
    (score as i16 + delta as i16).clamp(0, 100) as u8
}

/// Five small deltas in -3..=3, derived from a hash of the answer text.
fn hash_noise(answer: &str) -> [i8; 5] {
    let digest = Sha256::digest(answer.as_bytes());
    let mut out = [0i8; 5];
    for (i, byte) in digest.iter().take(5).enumerate() {
        out[i] = (byte % 7) as i8 - 3;
    }
    out
}

fn strength_phrase(dimension: &str) -> String {
    match dimension {
        "relevance" => "answers stay on topic and address the question asked",
        "clarity" => "communicates clearly and is easy to follow",
        "structure" => "answers are well structured from situation to result",
        _ => "highlights concrete impact and measurable outcomes",
    }
    .to_string()
}

fn weakness_phrase(dimension: &str) -> String {
    match dimension {
        "relevance" => "answers drift away from the question being asked",
        "clarity" => "key points get lost in long or tangled sentences",
        "structure" => "answers lack a clear beginning, middle and end",
        _ => "impact is described without numbers or concrete outcomes",
    }
    .to_string()
}

fn pad_strengths(strengths: &mut Vec<String>) {
    const POOL: &[&str] = &[
        "engaged with the full interview format",
        "kept answers professional in tone",
        "showed willingness to reflect on past work",
    ];
    for filler in POOL {
        if strengths.len() >= 2 {
            break;
        }
        strengths.push(filler.to_string());
    }
    strengths.truncate(5);
}

fn pad_weaknesses(weaknesses: &mut Vec<String>) {
    const POOL: &[&str] = &[
        "answers could use more measurable outcomes",
        "more preparation on common question patterns would help",
        "examples could be more recent and specific",
    ];
    for filler in POOL {
        if weaknesses.len() >= 2 {
            break;
        }
        weaknesses.push(filler.to_string());
    }
    weaknesses.truncate(5);
}

fn action_plan() -> Vec<String> {
    vec![
        "Pick three past projects and write them up in situation-action-result form.".to_string(),
        "Rehearse answers aloud and keep each under two minutes.".to_string(),
        "Add one measurable outcome to every example you use.".to_string(),
        "Run another mock interview and compare the scores.".to_string(),
    ]
}

fn suggested_roles(job_title: &str, seniority: Seniority) -> Vec<String> {
    let next = match seniority {
        Seniority::Junior => "Mid-level",
        Seniority::Mid => "Senior",
        Seniority::Senior => "Lead",
        Seniority::Lead => "Principal",
    };
    vec![job_title.to_string(), format!("{next} {job_title}")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use intervue_core::types::{Answer, Question, Role, SessionId, TranscriptEntry};

    fn request(n: u8) -> PlanRequest {
        PlanRequest {
            job_title: "Data Engineer".into(),
            seniority: Seniority::Mid,
            language: "en".into(),
            num_questions: n,
        }
    }

    fn ctx() -> EvalContext {
        EvalContext {
            job_title: "Data Engineer".into(),
            seniority: Seniority::Mid,
            question_index: 1,
            total_questions: 3,
        }
    }

    fn pair(index: u32, overall: u8) -> (Question, Answer) {
        let question = Question {
            id: format!("q{index}"),
            session_id: SessionId::from("s1"),
            index,
            kind: QuestionKind::General,
            competency: "general".into(),
            text: "Why this role?".into(),
        };
        let answer = Answer {
            id: format!("a{index}"),
            question_id: question.id.clone(),
            text: "Because.".into(),
            relevance: Some(overall),
            clarity: Some(overall),
            structure: Some(overall),
            impact: Some(overall),
            overall_score: overall,
            coach_notes: String::new(),
            created_at: String::new(),
        };
        (question, answer)
    }

    #[test]
    fn plan_returns_exactly_n_for_all_valid_sizes() {
        let coach = FallbackCoach::new();
        for n in 1..=20u8 {
            let plan = coach.plan(&request(n));
            assert_eq!(plan.len(), n as usize, "n = {n}");
        }
    }

    #[test]
    fn plan_mix_is_roughly_forty_thirty_twenty_ten() {
        let coach = FallbackCoach::new();
        let plan = coach.plan(&request(20));
        let count = |kind| plan.iter().filter(|q| q.kind == kind).count();
        assert_eq!(count(QuestionKind::Technical), 8);
        assert_eq!(count(QuestionKind::Behavioral), 6);
        assert_eq!(count(QuestionKind::Situational), 4);
        assert_eq!(count(QuestionKind::General), 2);
    }

    #[test]
    fn plan_substitutes_the_job_title() {
        let coach = FallbackCoach::new();
        let plan = coach.plan(&request(5));
        assert!(plan.iter().any(|q| q.text.contains("Data Engineer")));
        assert!(plan.iter().all(|q| !q.text.contains("{job_title}")));
    }

    #[test]
    fn evaluation_is_deterministic_and_in_range() {
        let coach = FallbackCoach::new();
        let answer = "I led the migration of our batch pipeline to streaming, \
                      cutting end-to-end latency from hours to minutes.";
        let first = coach.evaluate("Q", answer, &ctx());
        let second = coach.evaluate("Q", answer, &ctx());
        assert_eq!(first, second);
        for score in [
            first.overall,
            first.relevance,
            first.clarity,
            first.structure,
            first.impact,
        ] {
            assert!(score <= 100);
        }
    }

    #[test]
    fn longer_answers_score_higher_than_one_liners() {
        let coach = FallbackCoach::new();
        let short = coach.evaluate("Q", "I did stuff.", &ctx());
        let long = coach.evaluate(
            "Q",
            &"When our nightly job started missing its window I profiled it, found a quadratic join, rewrote it incrementally and verified the fix against a replay of a week of data. ".repeat(2),
            &ctx(),
        );
        assert!(long.overall > short.overall);
    }

    #[test]
    fn scripted_summary_overall_is_the_mean() {
        let coach = FallbackCoach::new();
        let input = ScriptedSummaryInput {
            job_title: "Data Engineer".into(),
            seniority: Seniority::Mid,
            pairs: vec![pair(1, 60), pair(2, 70), pair(3, 80)],
            unanswered: vec![],
        };
        let report = coach.summarize_scripted(&input);
        assert_eq!(report.overall_score, 70);
        assert_eq!(report.generated_by, ReportSource::Fallback);
        assert!(report.completion_note.is_none());
        assert!((2..=5).contains(&report.strengths.len()));
        assert!((2..=5).contains(&report.weaknesses.len()));
        assert!((3..=6).contains(&report.action_plan.len()));
        assert!((2..=4).contains(&report.suggested_roles.len()));
    }

    #[test]
    fn scripted_summary_without_answers_is_neutral() {
        let coach = FallbackCoach::new();
        let input = ScriptedSummaryInput {
            job_title: "Data Engineer".into(),
            seniority: Seniority::Mid,
            pairs: vec![],
            unanswered: vec![1, 2, 3],
        };
        let report = coach.summarize_scripted(&input);
        assert_eq!(report.overall_score, 70);
        let note = report.completion_note.expect("partial note");
        assert!(note.contains("0 of 3"));
    }

    #[test]
    fn conversational_summary_flags_partiality() {
        let coach = FallbackCoach::new();
        let input = TranscriptSummaryInput {
            job_title: "Data Engineer".into(),
            seniority: Seniority::Senior,
            transcript: vec![
                TranscriptEntry::now(Role::Assistant, "Question one?"),
                TranscriptEntry::now(Role::User, "Answer one."),
            ],
            questions_asked: 2,
            target_questions: 5,
        };
        let report = coach.summarize_conversational(&input);
        assert!(report.completion_note.expect("note").contains("2 of 5"));
    }

    #[test]
    fn empty_session_report_scores_zero() {
        let coach = FallbackCoach::new();
        let report = coach.empty_session_report("Data Engineer", Seniority::Junior);
        assert_eq!(report.overall_score, 0);
        assert!(report
            .weaknesses
            .iter()
            .any(|w| w.contains("no interview data")));
        assert!(report.completion_note.is_some());
    }
}
