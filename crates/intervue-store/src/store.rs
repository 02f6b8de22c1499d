use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use intervue_core::types::{
    score_in_range, Answer, AnswerScores, Question, QuestionKind, Report, Seniority, Session,
    SessionId, SessionMode, SessionStatus, TranscriptEntry,
};

use crate::db;
use crate::error::{Result, StoreError};

/// Parameters for a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub job_title: String,
    pub seniority: Seniority,
    pub language: String,
    pub mode: SessionMode,
    pub num_questions: u8,
}

/// One planned question, before it gets an id and an index.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub kind: QuestionKind,
    pub competency: String,
    pub text: String,
}

/// Thread-safe durable store for sessions, questions, answers, transcripts
/// and reports.
///
/// Wraps a single SQLite connection in a `Mutex`; the lock doubles as the
/// row-level serialization the compound operations need. The orchestrator
/// and a dispatched agent each open their own connection to the same file.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Open (and initialise) the database at `url`.
    pub fn open(url: &str) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(db::open(url)?),
        })
    }

    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    #[instrument(skip(self, new))]
    pub fn create_session(&self, new: NewSession) -> Result<Session> {
        if new.num_questions < 1 {
            return Err(StoreError::Validation(
                "num_questions must be at least 1".into(),
            ));
        }
        let id = SessionId::new();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO sessions
             (id, job_title, seniority, language, mode, num_questions,
              status, questions_asked, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', 0, ?7)",
            rusqlite::params![
                id.as_str(),
                new.job_title,
                new.seniority.to_string(),
                new.language,
                new.mode.to_string(),
                new.num_questions,
                now,
            ],
        )?;
        debug!(session_id = %id, "session created");
        Ok(Session {
            id,
            job_title: new.job_title,
            seniority: new.seniority,
            language: new.language,
            mode: new.mode,
            num_questions: new.num_questions,
            status: SessionStatus::Active,
            overall_score: None,
            summary: None,
            transcript: None,
            questions_asked: 0,
            created_at: now,
            completed_at: None,
        })
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Session> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, job_title, seniority, language, mode, num_questions,
                    status, overall_score, summary, transcript, questions_asked,
                    created_at, completed_at
             FROM sessions WHERE id = ?1",
            [id.as_str()],
            row_to_session,
        )
        .map_err(|e| not_found_or_db(e, "session", id.as_str()))
    }

    /// Mark an active session failed. Terminal; transcript and any partial
    /// report stay in place. A no-op when the session already left `active`.
    #[instrument(skip(self))]
    pub fn mark_failed(&self, id: &SessionId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE sessions SET status = 'failed' WHERE id = ?1 AND status = 'active'",
            [id.as_str()],
        )?;
        if n == 0 {
            debug!(session_id = %id, "mark_failed skipped: session not active");
        }
        Ok(())
    }

    // ── Questions & answers ──────────────────────────────────────────────────

    /// Persist the planned questions for a scripted session, assigning
    /// 1-based indices in order.
    pub fn insert_questions(
        &self,
        session_id: &SessionId,
        planned: &[NewQuestion],
    ) -> Result<Vec<Question>> {
        let db = self.db.lock().unwrap();
        let mut out = Vec::with_capacity(planned.len());
        for (i, q) in planned.iter().enumerate() {
            let id = Uuid::new_v4().to_string();
            let index = (i + 1) as u32;
            db.execute(
                "INSERT INTO questions (id, session_id, idx, kind, competency, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id,
                    session_id.as_str(),
                    index,
                    q.kind.to_string(),
                    q.competency,
                    q.text,
                ],
            )?;
            out.push(Question {
                id,
                session_id: session_id.clone(),
                index,
                kind: q.kind,
                competency: q.competency.clone(),
                text: q.text.clone(),
            });
        }
        Ok(out)
    }

    pub fn get_question(&self, question_id: &str) -> Result<Question> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT id, session_id, idx, kind, competency, text
             FROM questions WHERE id = ?1",
            [question_id],
            row_to_question,
        )
        .map_err(|e| not_found_or_db(e, "question", question_id))
    }

    /// Fetch a question by its 1-based index, `None` past the end.
    pub fn question_by_index(
        &self,
        session_id: &SessionId,
        index: u32,
    ) -> Result<Option<Question>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, session_id, idx, kind, competency, text
             FROM questions WHERE session_id = ?1 AND idx = ?2",
            rusqlite::params![session_id.as_str(), index],
            row_to_question,
        ) {
            Ok(q) => Ok(Some(q)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    pub fn questions_for_session(&self, session_id: &SessionId) -> Result<Vec<Question>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, session_id, idx, kind, competency, text
             FROM questions WHERE session_id = ?1 ORDER BY idx",
        )?;
        let rows = stmt.query_map([session_id.as_str()], row_to_question)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Write-once answer insert. A second write for the same question is a
    /// `Conflict`, never an overwrite.
    #[instrument(skip(self, text, scores))]
    pub fn insert_answer(
        &self,
        question_id: &str,
        text: &str,
        scores: &AnswerScores,
    ) -> Result<Answer> {
        validate_scores(scores)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let inserted = db.execute(
            "INSERT INTO answers
             (id, question_id, text, relevance, clarity, structure, impact,
              overall_score, coach_notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                id,
                question_id,
                text,
                scores.relevance,
                scores.clarity,
                scores.structure,
                scores.impact,
                scores.overall,
                scores.coach_notes,
                now,
            ],
        );
        match inserted {
            Ok(_) => Ok(Answer {
                id,
                question_id: question_id.to_string(),
                text: text.to_string(),
                relevance: Some(scores.relevance),
                clarity: Some(scores.clarity),
                structure: Some(scores.structure),
                impact: Some(scores.impact),
                overall_score: scores.overall,
                coach_notes: scores.coach_notes.clone(),
                created_at: now,
            }),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "question {} already has an answer",
                question_id
            ))),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// All answered (question, answer) pairs for a session, in question order.
    pub fn answered_pairs(&self, session_id: &SessionId) -> Result<Vec<(Question, Answer)>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT q.id, q.session_id, q.idx, q.kind, q.competency, q.text,
                    a.id, a.question_id, a.text, a.relevance, a.clarity,
                    a.structure, a.impact, a.overall_score, a.coach_notes, a.created_at
             FROM questions q
             JOIN answers a ON a.question_id = q.id
             WHERE q.session_id = ?1
             ORDER BY q.idx",
        )?;
        let rows = stmt.query_map([session_id.as_str()], |row| {
            let question = row_to_question(row)?;
            let answer = Answer {
                id: row.get(6)?,
                question_id: row.get(7)?,
                text: row.get(8)?,
                relevance: row.get(9)?,
                clarity: row.get(10)?,
                structure: row.get(11)?,
                impact: row.get(12)?,
                overall_score: row.get(13)?,
                coach_notes: row.get(14)?,
                created_at: row.get(15)?,
            };
            Ok((question, answer))
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// 1-based indices of questions that have no answer yet, ascending.
    pub fn unanswered_indices(&self, session_id: &SessionId) -> Result<Vec<u32>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT q.idx FROM questions q
             LEFT JOIN answers a ON a.question_id = q.id
             WHERE q.session_id = ?1 AND a.id IS NULL
             ORDER BY q.idx",
        )?;
        let rows = stmt.query_map([session_id.as_str()], |row| row.get::<_, u32>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ── Compound operations ──────────────────────────────────────────────────

    /// Idempotent whole-snapshot transcript write.
    ///
    /// Overwrites the transcript column and the `questions_asked` counter
    /// under the connection lock. Last-writer-wins is acceptable because the
    /// agent is the sole writer for its session. Entries with decreasing
    /// timestamps are rejected at this boundary.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn append_or_replace_transcript(
        &self,
        session_id: &SessionId,
        entries: &[TranscriptEntry],
        questions_asked: u32,
    ) -> Result<()> {
        for pair in entries.windows(2) {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(StoreError::Validation(
                    "transcript timestamps must be non-decreasing".into(),
                ));
            }
        }
        let json = serde_json::to_string(entries)?;
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE sessions SET transcript = ?1, questions_asked = ?2 WHERE id = ?3",
            rusqlite::params![json, questions_asked, session_id.as_str()],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                what: "session",
                id: session_id.as_str().to_string(),
            });
        }
        debug!(session_id = %session_id, "transcript snapshot written");
        Ok(())
    }

    /// Conditional finalize: commit `report`, flip the session to
    /// `completed` and stamp `completed_at` iff the session is still
    /// `active`. Every caller gets the committed report back, whether this
    /// call wrote it or a concurrent writer won the race.
    #[instrument(skip(self, report))]
    pub fn finalize_session(&self, session_id: &SessionId, report: &Report) -> Result<Report> {
        validate_report(report)?;
        let json = serde_json::to_string(report)?;
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let wrote = db.execute(
            "UPDATE sessions
             SET summary = ?1, overall_score = ?2, status = 'completed', completed_at = ?3
             WHERE id = ?4 AND status = 'active'",
            rusqlite::params![json, report.overall_score, now, session_id.as_str()],
        )?;
        if wrote == 0 {
            debug!(session_id = %session_id, "finalize lost the race or session left active");
        }
        self.read_committed_report(&db, session_id)
    }

    /// Attach a report to a `failed` session without resurrecting it.
    ///
    /// Lets a later report request observe a fallback report even after the
    /// agent died mid-finalize. Writes only when no report is stored yet.
    pub fn attach_report_to_failed(
        &self,
        session_id: &SessionId,
        report: &Report,
    ) -> Result<Report> {
        validate_report(report)?;
        let json = serde_json::to_string(report)?;
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE sessions SET summary = ?1, overall_score = ?2
             WHERE id = ?3 AND status = 'failed' AND summary IS NULL",
            rusqlite::params![json, report.overall_score, session_id.as_str()],
        )?;
        self.read_committed_report(&db, session_id)
    }

    fn read_committed_report(&self, db: &Connection, session_id: &SessionId) -> Result<Report> {
        let (status, summary): (String, Option<String>) = db
            .query_row(
                "SELECT status, summary FROM sessions WHERE id = ?1",
                [session_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| not_found_or_db(e, "session", session_id.as_str()))?;
        match summary {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => {
                warn!(session_id = %session_id, %status, "no report committed");
                Err(StoreError::Conflict(format!(
                    "session {} is {} and carries no report",
                    session_id, status
                )))
            }
        }
    }
}

fn validate_scores(scores: &AnswerScores) -> Result<()> {
    let all = [
        scores.overall,
        scores.relevance,
        scores.clarity,
        scores.structure,
        scores.impact,
    ];
    if all.iter().any(|s| !score_in_range(*s)) {
        return Err(StoreError::Validation(
            "scores must be within 0..=100".into(),
        ));
    }
    Ok(())
}

fn validate_report(report: &Report) -> Result<()> {
    if !score_in_range(report.overall_score) {
        return Err(StoreError::Validation(
            "report overall_score must be within 0..=100".into(),
        ));
    }
    Ok(())
}

// SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && (err.extended_code == 2067 || err.extended_code == 1555)
    )
}

fn not_found_or_db(e: rusqlite::Error, what: &'static str, id: &str) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
            what,
            id: id.to_string(),
        },
        e => StoreError::Database(e),
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let seniority: String = row.get(2)?;
    let mode: String = row.get(4)?;
    let status: String = row.get(6)?;
    let summary: Option<String> = row.get(8)?;
    let transcript: Option<String> = row.get(9)?;

    Ok(Session {
        id: SessionId(row.get(0)?),
        job_title: row.get(1)?,
        seniority: parse_column(2, &seniority)?,
        language: row.get(3)?,
        mode: parse_column(4, &mode)?,
        num_questions: row.get::<_, i64>(5)? as u8,
        status: parse_column(6, &status)?,
        overall_score: row.get::<_, Option<i64>>(7)?.map(|v| v as u8),
        summary: parse_json_column(8, summary)?,
        transcript: parse_json_column(9, transcript)?,
        questions_asked: row.get::<_, i64>(10)? as u32,
        created_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

fn row_to_question(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    let kind: String = row.get(3)?;
    Ok(Question {
        id: row.get(0)?,
        session_id: SessionId(row.get(1)?),
        index: row.get::<_, i64>(2)? as u32,
        kind: parse_column(3, &kind)?,
        competency: row.get(4)?,
        text: row.get(5)?,
    })
}

fn parse_column<T: std::str::FromStr<Err = String>>(
    idx: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

fn parse_json_column<T: serde::de::DeserializeOwned>(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
    }
}
