//! Command line surface for the apiary bot binary.

use std::path::PathBuf;

use clap::Parser;

use apiary_telegram::DEFAULT_TELEGRAM_API_BASE;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "apiary-bot",
    about = "Telegram assistant that registers beekeepers and tracks bee families",
    version
)]
pub struct Cli {
    #[arg(
        long = "telegram-bot-token",
        env = "TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        help = "Bot API token issued by @BotFather"
    )]
    pub telegram_bot_token: String,

    #[arg(
        long = "api-base",
        env = "APIARY_TELEGRAM_API_BASE",
        default_value = DEFAULT_TELEGRAM_API_BASE,
        help = "Base URL for the Telegram Bot API"
    )]
    pub api_base: String,

    #[arg(
        long = "db-path",
        env = "APIARY_DB_PATH",
        default_value = "apiary.db",
        help = "SQLite database file holding keeper profiles and bee families"
    )]
    pub db_path: PathBuf,

    #[arg(
        long = "poll-timeout-seconds",
        env = "APIARY_POLL_TIMEOUT_SECONDS",
        default_value_t = 30,
        help = "Long-poll window in seconds passed to getUpdates"
    )]
    pub poll_timeout_seconds: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "APIARY_REQUEST_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for Bot API calls, excluding the poll window"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "APIARY_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per Bot API call before giving up"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "APIARY_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay in milliseconds for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "error-backoff-ms",
        env = "APIARY_ERROR_BACKOFF_MS",
        default_value_t = 2_000,
        value_parser = parse_positive_u64,
        help = "Pause after a failed poll cycle before polling again"
    )]
    pub error_backoff_ms: u64,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn unit_cli_defaults_cover_runtime_tunables() {
        let cli = Cli::try_parse_from(["apiary-bot", "--telegram-bot-token", "test-token"])
            .expect("parse");
        assert_eq!(cli.telegram_bot_token, "test-token");
        assert_eq!(cli.api_base, DEFAULT_TELEGRAM_API_BASE);
        assert_eq!(cli.db_path.to_string_lossy(), "apiary.db");
        assert_eq!(cli.poll_timeout_seconds, 30);
        assert_eq!(cli.request_timeout_ms, 15_000);
        assert_eq!(cli.retry_max_attempts, 3);
        assert_eq!(cli.retry_base_delay_ms, 500);
        assert_eq!(cli.error_backoff_ms, 2_000);
    }

    #[test]
    fn unit_cli_rejects_zero_retry_attempts() {
        let result = Cli::try_parse_from([
            "apiary-bot",
            "--telegram-bot-token",
            "test-token",
            "--retry-max-attempts",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unit_cli_accepts_custom_db_path_and_api_base() {
        let cli = Cli::try_parse_from([
            "apiary-bot",
            "--telegram-bot-token",
            "test-token",
            "--db-path",
            "/var/lib/apiary/hive.db",
            "--api-base",
            "http://127.0.0.1:8081",
        ])
        .expect("parse");
        assert_eq!(cli.db_path.to_string_lossy(), "/var/lib/apiary/hive.db");
        assert_eq!(cli.api_base, "http://127.0.0.1:8081");
    }
}
