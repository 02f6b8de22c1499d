use intervue_core::types::{Seniority, Session};

/// The closing line the agent speaks (and instructs the model to use). Must
/// contain one of the configured closing-phrase keywords so completion
/// detection recognises it.
pub const CLOSING_LINE: &str =
    "Thank you for completing the interview. We will now prepare your evaluation report.";

/// Spoken once after the room connects.
pub fn greeting_line(job_title: &str) -> String {
    format!(
        "Welcome to your mock interview for the {job_title} position. \
         I will ask you a series of questions; answer each one as you would \
         in a real interview. Let's begin."
    )
}

/// System prompt for the realtime model. Static per session: it pins the
/// role, the exact question budget and the required closing phrase.
pub fn build_instructions(session: &Session) -> String {
    let level = match session.seniority {
        Seniority::Junior => "an entry-level",
        Seniority::Mid => "a mid-level",
        Seniority::Senior => "a senior",
        Seniority::Lead => "a lead",
    };
    format!(
        "You are a professional job interviewer conducting a spoken mock interview \
         for {level} {title} position, in language '{lang}'. \
         Ask exactly {n} interview questions, one at a time, and wait for the \
         candidate's full answer before continuing. Do not ask more than {n} \
         questions and do not skip any. Keep your speech natural and concise; \
         never use markdown or lists, your words are spoken aloud. \
         After the candidate answers the final question, end the interview by \
         saying: \"{closing}\"",
        level = level,
        title = session.job_title,
        lang = session.language,
        n = session.num_questions,
        closing = CLOSING_LINE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use intervue_core::types::{SessionId, SessionMode, SessionStatus};

    fn session(n: u8) -> Session {
        Session {
            id: SessionId::from("s1"),
            job_title: "Site Reliability Engineer".into(),
            seniority: Seniority::Senior,
            language: "en".into(),
            mode: SessionMode::Conversational,
            num_questions: n,
            status: SessionStatus::Active,
            overall_score: None,
            summary: None,
            transcript: None,
            questions_asked: 0,
            created_at: String::new(),
            completed_at: None,
        }
    }

    #[test]
    fn instructions_pin_count_title_and_closing() {
        let text = build_instructions(&session(7));
        assert!(text.contains("exactly 7"));
        assert!(text.contains("Site Reliability Engineer"));
        assert!(text.contains(CLOSING_LINE));
    }

    #[test]
    fn closing_line_matches_a_default_keyword() {
        let phrases = intervue_core::config::IntervueConfig::default().closing_phrases;
        let lower = CLOSING_LINE.to_lowercase();
        assert!(phrases.iter().any(|p| lower.contains(&p.to_lowercase())));
    }
}
