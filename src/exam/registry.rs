// src/exam/registry.rs

//! Live exam sessions.
//!
//! Each session owns one countdown task. When it fires, the last saved draft
//! is scored and stored exactly as if the student had submitted it. Whichever
//! of submit and expiry moves the session out of [`Page::Exam`] first wins;
//! the other sees [`ExamError::ExamClosed`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use uuid::Uuid;

use super::flow::{Event, Page};
use crate::error::ExamError;
use crate::ledger::{LedgerError, SharedLedger};
use crate::models::attempt::AttemptRecord;
use crate::scoring::{self, ScoreCard, ScoringConfig};
use crate::utils::html::highlight_mistakes;

/// How long a finished session's result can still be fetched.
pub const RESULT_RETENTION: Duration = Duration::from_secs(15 * 60);

/// Further attempts to store an expired exam after the first write fails.
const EXPIRY_RETRIES: u32 = 3;
const EXPIRY_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finish {
    Submitted,
    Expired,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamOutcome {
    pub finish: Finish,
    pub score: ScoreCard,
    /// Typed text as HTML, one marked span per mistake.
    pub highlighted: String,
    pub record: AttemptRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamStatus {
    pub page: Page,
    pub name: String,
    pub category: String,
    pub remaining_secs: u64,
    pub outcome: Option<ExamOutcome>,
    /// Set when time ran out but the result could not be stored.
    pub error: Option<String>,
}

struct ExamSession {
    name: String,
    category: String,
    paragraph: Arc<str>,
    page: Page,
    started_at: Instant,
    deadline: Instant,
    draft: String,
    countdown: Option<JoinHandle<()>>,
    finished_at: Option<Instant>,
    outcome: Option<ExamOutcome>,
    error: Option<String>,
}

struct Inner {
    sessions: Mutex<HashMap<Uuid, ExamSession>>,
    ledger: SharedLedger,
    duration: Duration,
    scoring: ScoringConfig,
}

#[derive(Clone)]
pub struct ExamRegistry {
    inner: Arc<Inner>,
}

impl ExamRegistry {
    pub fn new(ledger: SharedLedger, duration: Duration, scoring: ScoringConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                ledger,
                duration,
                scoring,
            }),
        }
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Starts an exam for `name` on `paragraph` and schedules its expiry.
    pub async fn open(
        &self,
        name: &str,
        category: &str,
        paragraph: String,
    ) -> Result<Uuid, ExamError> {
        if self.inner.ledger.has_attempted(name).await? {
            tracing::warn!("Refusing exam start for '{}': already attempted", name);
            return Err(ExamError::DuplicateAttempt(name.to_string()));
        }

        let page = Page::Login
            .on(Event::ProceedAsStudent)?
            .on(Event::StartExam)?;
        let id = Uuid::new_v4();
        let started_at = Instant::now();
        let deadline = started_at + self.inner.duration;

        let mut sessions = self.inner.sessions.lock().await;
        sessions.retain(|_, s| {
            s.finished_at
                .is_none_or(|at| at + RESULT_RETENTION > started_at)
        });
        let countdown = self.spawn_countdown(id, deadline);
        sessions.insert(
            id,
            ExamSession {
                name: name.to_string(),
                category: category.to_string(),
                paragraph: Arc::from(paragraph),
                page,
                started_at,
                deadline,
                draft: String::new(),
                countdown: Some(countdown),
                finished_at: None,
                outcome: None,
                error: None,
            },
        );

        tracing::info!(
            "Exam {} started for '{}' ({}), {}s on the clock",
            id,
            name,
            category,
            self.inner.duration.as_secs()
        );
        Ok(id)
    }

    fn spawn_countdown(&self, id: Uuid, deadline: Instant) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            sleep_until(deadline).await;
            let mut retries = 0;
            loop {
                match registry.finish(id, Finish::Expired, None).await {
                    Ok(outcome) => {
                        tracing::info!(
                            "Time up for '{}': {} WPM final, {} mistakes",
                            outcome.record.name,
                            outcome.record.final_speed_wpm,
                            outcome.record.mistake_count
                        );
                        return;
                    }
                    Err(
                        ExamError::ExamClosed
                        | ExamError::SessionNotFound
                        | ExamError::DuplicateAttempt(_),
                    ) => return,
                    Err(e) if retries < EXPIRY_RETRIES => {
                        retries += 1;
                        tracing::warn!(
                            "Failed to store expired exam {} (attempt {}): {}",
                            id,
                            retries,
                            e
                        );
                        tokio::time::sleep(EXPIRY_RETRY_DELAY).await;
                    }
                    Err(e) => {
                        tracing::error!("Giving up on expired exam {}: {}", id, e);
                        registry.abandon(id, e.to_string()).await;
                        return;
                    }
                }
            }
        })
    }

    /// Closes an expired session whose result could not be stored.
    async fn abandon(&self, id: Uuid, error: String) {
        let mut sessions = self.inner.sessions.lock().await;
        let Some(session) = sessions.get_mut(&id) else {
            return;
        };
        let Ok(page) = session.page.on(Event::Expire) else {
            return;
        };
        session.page = page;
        session.error = Some(format!("Result could not be stored: {error}"));
        session.close(Finish::Expired);
    }

    /// Saves the text the expiry callback will score.
    pub async fn save_draft(&self, id: Uuid, typed: String) -> Result<(), ExamError> {
        let mut sessions = self.inner.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(ExamError::SessionNotFound)?;
        if session.page != Page::Exam || Instant::now() >= session.deadline {
            return Err(ExamError::ExamClosed);
        }
        session.draft = typed;
        Ok(())
    }

    pub async fn status(&self, id: Uuid) -> Result<ExamStatus, ExamError> {
        let sessions = self.inner.sessions.lock().await;
        let session = sessions.get(&id).ok_or(ExamError::SessionNotFound)?;
        let remaining_secs = if session.page == Page::Exam {
            session
                .deadline
                .saturating_duration_since(Instant::now())
                .as_secs()
        } else {
            0
        };

        Ok(ExamStatus {
            page: session.page,
            name: session.name.clone(),
            category: session.category.clone(),
            remaining_secs,
            outcome: session.outcome.clone(),
            error: session.error.clone(),
        })
    }

    pub async fn submit(&self, id: Uuid, typed: String) -> Result<ExamOutcome, ExamError> {
        self.finish(id, Finish::Submitted, Some(typed)).await
    }

    /// Scores the session and writes it to the ledger.
    /// `typed` is `None` when the countdown fired; the draft is used then.
    async fn finish(
        &self,
        id: Uuid,
        finish: Finish,
        typed: Option<String>,
    ) -> Result<ExamOutcome, ExamError> {
        let (name, category, paragraph, typed, elapsed) = {
            let mut sessions = self.inner.sessions.lock().await;
            let session = sessions.get_mut(&id).ok_or(ExamError::SessionNotFound)?;
            if session.page != Page::Exam {
                return Err(ExamError::ExamClosed);
            }

            let elapsed = match finish {
                Finish::Submitted => {
                    session.page = session.page.on(Event::Submit)?;
                    Instant::now().min(session.deadline) - session.started_at
                }
                Finish::Expired => {
                    session.page = session.page.on(Event::Expire)?;
                    self.inner.duration
                }
            };
            let typed = typed.unwrap_or_else(|| session.draft.clone());

            (
                session.name.clone(),
                session.category.clone(),
                Arc::clone(&session.paragraph),
                typed,
                elapsed,
            )
        };

        let score = scoring::score(
            &paragraph,
            &typed,
            elapsed.as_secs_f64() / 60.0,
            &self.inner.scoring,
        );
        let highlighted = highlight_mistakes(&paragraph, &typed, &score);
        let record = AttemptRecord::from_score(
            name,
            category,
            &score,
            self.inner.scoring.rounding,
            Some(Utc::now()),
        );

        let appended = self.inner.ledger.append(record.clone()).await;

        let mut sessions = self.inner.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(ExamError::SessionNotFound)?;
        match appended {
            Ok(()) => {
                session.close(finish);
                let outcome = ExamOutcome {
                    finish,
                    score,
                    highlighted,
                    record,
                };
                session.outcome = Some(outcome.clone());
                tracing::info!(
                    "Stored result for '{}': {} mistakes, {} WPM final, marks {}",
                    outcome.record.name,
                    outcome.record.mistake_count,
                    outcome.record.final_speed_wpm,
                    outcome.record.marks
                );
                Ok(outcome)
            }
            Err(LedgerError::Duplicate(name)) => {
                session.close(finish);
                tracing::warn!("Rejected duplicate attempt for '{}'", name);
                Err(ExamError::DuplicateAttempt(name))
            }
            Err(e) => {
                // nothing was stored: reopen so a resubmit or the expiry retry can land
                session.page = session.page.on(Event::StartExam)?;
                session.draft = typed;
                // the countdown may have fired while the write was pending
                let countdown_gone = session
                    .countdown
                    .as_ref()
                    .is_none_or(JoinHandle::is_finished);
                if finish == Finish::Submitted && countdown_gone {
                    session.countdown = Some(self.spawn_countdown(id, session.deadline));
                }
                Err(e.into())
            }
        }
    }
}

impl ExamSession {
    fn close(&mut self, finish: Finish) {
        self.finished_at = Some(Instant::now());
        let countdown = self.countdown.take();
        if finish == Finish::Submitted {
            if let Some(handle) = countdown {
                handle.abort();
            }
        }
    }
}
