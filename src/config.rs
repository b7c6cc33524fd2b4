// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::ledger::{LedgerBackend, NameMatch};
use crate::scoring::{ScoringConfig, marks::TierRounding};

pub const DEFAULT_CATEGORIES: [&str; 3] = ["10 WPM", "25 WPM", "40 WPM"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Lifetime of admin tokens, in seconds.
    pub jwt_expiration: u64,
    pub admin_username: String,
    pub admin_password: String,
    pub rust_log: String,
    pub ledger_backend: LedgerBackend,
    pub database_url: String,
    pub ledger_csv_path: PathBuf,
    pub paragraph_path: PathBuf,
    pub exam_duration: Duration,
    pub categories: Vec<String>,
    pub marks_rounding: TierRounding,
    pub name_match: NameMatch,
    pub autojunk: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let categories = match env::var("CATEGORIES") {
            Ok(raw) => {
                let list: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                if list.is_empty() {
                    return Err(ConfigError::Invalid {
                        var: "CATEGORIES",
                        value: raw,
                    });
                }
                list
            }
            Err(_) => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        };

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            jwt_secret: require("JWT_SECRET")?,
            jwt_expiration: parse_var("JWT_EXPIRATION", 3600)?,
            admin_username: require("ADMIN_USERNAME")?,
            admin_password: require("ADMIN_PASSWORD")?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ledger_backend: parse_var("LEDGER_BACKEND", LedgerBackend::Sqlite)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://typing_results.db".to_string()),
            ledger_csv_path: parse_var("LEDGER_CSV_PATH", PathBuf::from("student_results.csv"))?,
            paragraph_path: parse_var("PARAGRAPH_PATH", PathBuf::from("daily_paragraph.txt"))?,
            exam_duration: Duration::from_secs(parse_var("TEST_DURATION_SECS", 600)?),
            categories,
            marks_rounding: parse_var("MARKS_ROUNDING", TierRounding::Truncate)?,
            name_match: parse_var("NAME_MATCH", NameMatch::Exact)?,
            autojunk: parse_var("AUTOJUNK", true)?,
        })
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            rounding: self.marks_rounding,
            autojunk: self.autojunk,
        }
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
