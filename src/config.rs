use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/bookings.db";

/// Hours (inclusive) offered as candidate slots, one per hour on the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 18,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub admin_chat_id: Option<i64>,
    pub webapp_url: Option<String>,
    pub static_dir: String,
    pub db_timeout: Duration,
    pub working_hours: WorkingHours,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match optional_var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| anyhow!("Invalid {}", name)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url =
            optional_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let http_port = parse_var("HTTP_PORT", 3000u16)?;

        let admin_chat_id = match optional_var("ADMIN_CHAT_ID") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| anyhow!("Invalid ADMIN_CHAT_ID"))?,
            ),
            None => None,
        };

        let webapp_url = optional_var("WEBAPP_URL");
        let static_dir = optional_var("STATIC_DIR").unwrap_or_else(|| "./static".to_string());

        let timeout_secs = parse_var("DB_TIMEOUT_SECS", 5u64)?;
        if timeout_secs == 0 {
            return Err(anyhow!("DB_TIMEOUT_SECS must be greater than zero"));
        }

        let defaults = WorkingHours::default();
        let working_hours = WorkingHours {
            start_hour: parse_var("WORK_START_HOUR", defaults.start_hour)?,
            end_hour: parse_var("WORK_END_HOUR", defaults.end_hour)?,
        };
        if working_hours.start_hour >= working_hours.end_hour || working_hours.end_hour > 23 {
            return Err(anyhow!(
                "Invalid working hours {}..{}",
                working_hours.start_hour,
                working_hours.end_hour
            ));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            admin_chat_id,
            webapp_url,
            static_dir,
            db_timeout: Duration::from_secs(timeout_secs),
            working_hours,
        })
    }
}
