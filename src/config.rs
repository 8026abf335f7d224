use std::{env, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::selfie::window::DEFAULT_WINDOW_SECS;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Teacher account, there is no teacher table
    pub teacher_username: String,
    pub teacher_password: String,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub selfie_window_secs: u32,
    pub poll_interval_secs: u64,

    pub photo_dir: PathBuf,
    pub photo_base_url: String,
    pub max_photo_bytes: usize,

    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            teacher_username: required("TEACHER_USERNAME")?,
            teacher_password: required("TEACHER_PASSWORD")?,

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            selfie_window_secs: parsed("SELFIE_WINDOW_SECS", DEFAULT_WINDOW_SECS)?,
            poll_interval_secs: parsed("POLL_INTERVAL_SECS", 10)?,

            photo_dir: env::var("PHOTO_DIR")
                .unwrap_or_else(|_| "photos".to_string())
                .into(),
            photo_base_url: env::var("PHOTO_BASE_URL")
                .unwrap_or_else(|_| "/photos".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_photo_bytes: parsed("MAX_PHOTO_BYTES", 5 * 1024 * 1024)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}={v:?} is invalid: {e}")),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "mysql://localhost/attendify".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            teacher_username: "teacher".into(),
            teacher_password: "pass".into(),
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            selfie_window_secs: DEFAULT_WINDOW_SECS,
            poll_interval_secs: 10,
            photo_dir: PathBuf::from("photos"),
            photo_base_url: "/photos".into(),
            max_photo_bytes: 1024,
            log_dir: "logs".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_falls_back_to_default() {
        assert_eq!(parse_or::<u32>("SELFIE_WINDOW_SECS", None, 600).unwrap(), 600);
    }

    #[test]
    fn present_value_is_parsed() {
        assert_eq!(parse_or::<u64>("POLL_INTERVAL_SECS", Some(" 5 ".into()), 10).unwrap(), 5);
    }

    #[test]
    fn bad_value_names_the_key() {
        let err = parse_or::<u32>("RATE_LOGIN_PER_MIN", Some("lots".into()), 60).unwrap_err();
        assert!(err.to_string().contains("RATE_LOGIN_PER_MIN"));
    }
}
