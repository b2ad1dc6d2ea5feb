// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Minimum score (percentage) required to pass a quiz attempt.
/// Also the threshold below which a skill's average counts as a skill gap.
pub const PASSING_SCORE_PERCENTAGE: f64 = 70.0;

/// Bounds for the number of questions sampled per attempt.
pub const MIN_QUESTION_COUNT: i64 = 1;
pub const MAX_QUESTION_COUNT: i64 = 50;
pub const DEFAULT_QUESTION_COUNT: i64 = 10;

/// Default page sizes for paginated views.
pub const DEFAULT_HISTORY_PAGE_SIZE: i64 = 10;
pub const DEFAULT_LEADERBOARD_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
        }
    }
}
