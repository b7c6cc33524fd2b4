use crate::config::Config;
use crate::error::AppError;
use crate::exam::ExamRegistry;
use crate::ledger::SharedLedger;
use crate::paragraph::ParagraphStore;
use crate::utils::hash::{hash_password, verify_password};
use axum::extract::FromRef;

/// The static admin credential pair. Only the Argon2 hash of the password is kept.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Result<Self, AppError> {
        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<bool, AppError> {
        if username != self.username {
            return Ok(false);
        }
        verify_password(password, &self.password_hash)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ledger: SharedLedger,
    pub paragraphs: ParagraphStore,
    pub exams: ExamRegistry,
    pub admin: AdminCredentials,
}

impl AppState {
    pub fn new(config: Config, ledger: SharedLedger) -> Result<Self, AppError> {
        let admin = AdminCredentials::new(&config.admin_username, &config.admin_password)?;
        let paragraphs = ParagraphStore::new(&config.paragraph_path);
        let exams = ExamRegistry::new(ledger.clone(), config.exam_duration, config.scoring());

        Ok(Self {
            config,
            ledger,
            paragraphs,
            exams,
            admin,
        })
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SharedLedger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}

impl FromRef<AppState> for ParagraphStore {
    fn from_ref(state: &AppState) -> Self {
        state.paragraphs.clone()
    }
}

impl FromRef<AppState> for ExamRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}

impl FromRef<AppState> for AdminCredentials {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}
