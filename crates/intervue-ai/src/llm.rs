//! OpenAI-compatible chat-completions client backing the planner, evaluator
//! and summarizer when an LLM is configured.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use intervue_core::config::LlmConfig;
use intervue_core::types::{AnswerScores, Report, ReportSource, Role};

use crate::coach::{Evaluator, Planner, Summarizer};
use crate::error::{AiError, Result};
use crate::types::{
    EvalContext, PlanRequest, PlannedQuestion, ScriptedSummaryInput, TranscriptSummaryInput,
};

/// A well-known OpenAI-compatible provider.
struct KnownProvider {
    id: &'static str,
    base_url: &'static str,
    chat_path: &'static str,
}

const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        id: "openai",
        base_url: "https://api.openai.com",
        chat_path: "/v1/chat/completions",
    },
    KnownProvider {
        id: "groq",
        base_url: "https://api.groq.com/openai",
        chat_path: "/v1/chat/completions",
    },
    KnownProvider {
        id: "openrouter",
        base_url: "https://openrouter.ai/api",
        chat_path: "/v1/chat/completions",
    },
];

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

pub struct LlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl LlmClient {
    /// Resolve the provider id to an endpoint; unknown ids require
    /// `base_url` in the config.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let endpoint = match KNOWN_PROVIDERS.iter().find(|p| p.id == config.provider) {
            Some(p) => format!(
                "{}{}",
                config.base_url.as_deref().unwrap_or(p.base_url),
                p.chat_path
            ),
            None => match &config.base_url {
                Some(base) => format!("{}/v1/chat/completions", base.trim_end_matches('/')),
                None => {
                    return Err(AiError::Unavailable(format!(
                        "unknown LLM provider '{}' and no base_url configured",
                        config.provider
                    )))
                }
            },
        };
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// One chat-completions round trip, returning the assistant text.
    pub async fn chat(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let mut wire: Vec<serde_json::Value> =
            vec![json!({"role": "system", "content": system})];
        wire.extend(messages.iter().map(|m| {
            json!({
                "role": m.role.to_string(),
                "content": m.content,
            })
        }));

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": wire,
        });

        debug!(model = %self.model, "sending chat request");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000)
                .unwrap_or(5000);
            return Err(AiError::RateLimited {
                retry_after_ms: retry,
            });
        }
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status, body = %message, "LLM API error");
            return Err(AiError::Api { status, message });
        }

        let api: ApiResponse = resp
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        api.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::Parse("response has no choices".into()))
    }

    /// Chat round trip whose answer must be a JSON object.
    async fn chat_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let text = self
            .chat(
                system,
                &[ChatMessage {
                    role: Role::User,
                    content: user.to_string(),
                }],
            )
            .await?;
        extract_json(&text)
    }
}

#[async_trait]
impl Planner for LlmClient {
    async fn generate_interview_plan(&self, req: &PlanRequest) -> Result<Vec<PlannedQuestion>> {
        let system = "You are an expert interview designer. \
                      Respond with a single JSON object and nothing else.";
        let user = format!(
            "Design a mock job interview for a {seniority} {title} candidate, in language '{lang}'. \
             Produce exactly {n} questions with a mix of roughly 40% technical, 30% behavioral, \
             20% situational and 10% general questions. \
             Respond as: {{\"questions\": [{{\"kind\": \"technical|behavioral|situational|general\", \
             \"competency\": \"...\", \"text\": \"...\"}}]}}",
            seniority = req.seniority,
            title = req.job_title,
            lang = req.language,
            n = req.num_questions,
        );

        let value = self.chat_json(system, &user).await?;
        let parsed: PlanJson =
            serde_json::from_value(value).map_err(|e| AiError::Parse(e.to_string()))?;
        if parsed.questions.len() != req.num_questions as usize {
            return Err(AiError::Parse(format!(
                "planner returned {} questions, wanted {}",
                parsed.questions.len(),
                req.num_questions
            )));
        }
        Ok(parsed.questions)
    }
}

#[async_trait]
impl Evaluator for LlmClient {
    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        ctx: &EvalContext,
    ) -> Result<AnswerScores> {
        let system = "You are an experienced interview coach scoring one answer. \
                      Respond with a single JSON object and nothing else.";
        let user = format!(
            "Role: {seniority} {title}. Question {i} of {n}.\n\
             Question: {question}\nAnswer: {answer}\n\
             Score each dimension 0-100 and give one short paragraph of coaching. \
             Respond as: {{\"overall\": 0, \"relevance\": 0, \"clarity\": 0, \
             \"structure\": 0, \"impact\": 0, \"coach_notes\": \"...\"}}",
            seniority = ctx.seniority,
            title = ctx.job_title,
            i = ctx.question_index,
            n = ctx.total_questions,
        );

        let value = self.chat_json(system, &user).await?;
        let parsed: ScoresJson =
            serde_json::from_value(value).map_err(|e| AiError::Parse(e.to_string()))?;
        Ok(AnswerScores {
            overall: clamp_score(parsed.overall),
            relevance: clamp_score(parsed.relevance),
            clarity: clamp_score(parsed.clarity),
            structure: clamp_score(parsed.structure),
            impact: clamp_score(parsed.impact),
            coach_notes: parsed.coach_notes,
        })
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize_session(&self, input: &ScriptedSummaryInput) -> Result<Report> {
        let mut exchanges = String::new();
        for (question, answer) in &input.pairs {
            exchanges.push_str(&format!(
                "Q{} ({}): {}\nAnswer (scored {}): {}\n",
                question.index, question.kind, question.text, answer.overall_score, answer.text
            ));
        }
        let user = format!(
            "Candidate: {seniority} {title}.\n{partial}\nInterview exchanges:\n{exchanges}\n{shape}",
            seniority = input.seniority,
            title = input.job_title,
            partial = partial_line(input.is_partial()),
            shape = REPORT_SHAPE,
        );
        self.report_from(&user, input.is_partial()).await
    }

    async fn summarize_transcript(&self, input: &TranscriptSummaryInput) -> Result<Report> {
        let mut lines = String::new();
        for entry in &input.transcript {
            lines.push_str(&format!("{}: {}\n", entry.role, entry.text));
        }
        let user = format!(
            "Candidate: {seniority} {title}. {asked} of {target} planned questions were asked.\n\
             {partial}\nTranscript:\n{lines}\n{shape}",
            seniority = input.seniority,
            title = input.job_title,
            asked = input.questions_asked,
            target = input.target_questions,
            partial = partial_line(input.is_partial()),
            shape = REPORT_SHAPE,
        );
        self.report_from(&user, input.is_partial()).await
    }
}

const REPORT_SHAPE: &str = "Respond as: {\"overall_score\": 0, \"strengths\": [\"..\"], \
    \"weaknesses\": [\"..\"], \"action_plan\": [\"..\"], \"suggested_roles\": [\"..\"], \
    \"completion_note\": null}. Give 2-5 strengths, 2-5 weaknesses, 3-6 action plan steps \
    and 2-4 suggested roles.";

fn partial_line(partial: bool) -> &'static str {
    if partial {
        "The interview was only partially completed; say so in completion_note."
    } else {
        "The interview was fully completed; completion_note must be null."
    }
}

impl LlmClient {
    async fn report_from(&self, user: &str, partial: bool) -> Result<Report> {
        let system = "You are an experienced interview coach writing a final evaluation. \
                      Respond with a single JSON object and nothing else.";
        let value = self.chat_json(system, user).await?;
        let parsed: ReportJson =
            serde_json::from_value(value).map_err(|e| AiError::Parse(e.to_string()))?;

        let report = Report {
            overall_score: clamp_score(parsed.overall_score),
            strengths: parsed.strengths,
            weaknesses: parsed.weaknesses,
            action_plan: parsed.action_plan,
            suggested_roles: parsed.suggested_roles,
            // The partiality decision is ours, not the model's.
            completion_note: if partial {
                Some(parsed.completion_note.unwrap_or_else(|| {
                    "The interview ended before all planned questions were covered.".to_string()
                }))
            } else {
                None
            },
            generated_by: ReportSource::Llm,
        };
        validate_report_shape(&report)?;
        Ok(report)
    }
}

fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

fn validate_report_shape(report: &Report) -> Result<()> {
    let ok = (2..=5).contains(&report.strengths.len())
        && (2..=5).contains(&report.weaknesses.len())
        && (3..=6).contains(&report.action_plan.len())
        && (2..=4).contains(&report.suggested_roles.len());
    if ok {
        Ok(())
    } else {
        Err(AiError::Parse("report lists are out of shape bounds".into()))
    }
}

/// Pull a JSON object out of a model response that may wrap it in markdown
/// fences or prose.
fn extract_json(text: &str) -> Result<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }
    Err(AiError::Parse("no JSON object in model response".into()))
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct PlanJson {
    questions: Vec<PlannedQuestion>,
}

#[derive(Deserialize)]
struct ScoresJson {
    overall: i64,
    relevance: i64,
    clarity: i64,
    structure: i64,
    impact: i64,
    coach_notes: String,
}

#[derive(Deserialize)]
struct ReportJson {
    overall_score: i64,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    action_plan: Vec<String>,
    suggested_roles: Vec<String>,
    #[serde(default)]
    completion_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_handles_bare_and_fenced_objects() {
        let bare = r#"{"overall": 70}"#;
        assert_eq!(extract_json(bare).unwrap()["overall"], 70);

        let fenced = "Here you go:\n```json\n{\"overall\": 55}\n```\nGood luck!";
        assert_eq!(extract_json(fenced).unwrap()["overall"], 55);

        assert!(extract_json("no json here").is_err());
    }

    #[test]
    fn scores_clamp_into_range() {
        assert_eq!(clamp_score(-20), 0);
        assert_eq!(clamp_score(50), 50);
        assert_eq!(clamp_score(140), 100);
    }

    #[test]
    fn unknown_provider_without_base_url_fails() {
        let config = LlmConfig {
            provider: "mystery".into(),
            model: "m".into(),
            api_key: "k".into(),
            temperature: 0.4,
            base_url: None,
        };
        assert!(LlmClient::from_config(&config).is_err());
    }

    #[test]
    fn custom_provider_with_base_url_resolves() {
        let config = LlmConfig {
            provider: "local".into(),
            model: "m".into(),
            api_key: "k".into(),
            temperature: 0.4,
            base_url: Some("http://localhost:8000".into()),
        };
        let client = LlmClient::from_config(&config).expect("client");
        assert_eq!(client.endpoint, "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn report_shape_validation_rejects_thin_lists() {
        let report = Report {
            overall_score: 70,
            strengths: vec!["one".into()],
            weaknesses: vec!["a".into(), "b".into()],
            action_plan: vec!["x".into(), "y".into(), "z".into()],
            suggested_roles: vec!["r1".into(), "r2".into()],
            completion_note: None,
            generated_by: ReportSource::Llm,
        };
        assert!(validate_report_shape(&report).is_err());
    }
}
