use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use kudos_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let fields: Vec<(&str, String, Option<&str>)> = vec![
        (
            "storage.snapshot_path",
            config.storage.snapshot_path.display().to_string(),
            Some("KUDOS_STORAGE_SNAPSHOT_PATH"),
        ),
        (
            "slack.app_token",
            redact_token(config.slack.app_token.expose_secret()),
            Some("KUDOS_SLACK_APP_TOKEN"),
        ),
        (
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            Some("KUDOS_SLACK_BOT_TOKEN"),
        ),
        (
            "praise.weekly_limit",
            config.praise.weekly_limit.to_string(),
            Some("KUDOS_PRAISE_WEEKLY_LIMIT"),
        ),
        (
            "leaderboard.schedule_days",
            config.leaderboard.schedule_days.to_string(),
            Some("KUDOS_LEADERBOARD_SCHEDULE_DAYS"),
        ),
        (
            "leaderboard.post_time",
            config.leaderboard.post_time.clone(),
            Some("KUDOS_LEADERBOARD_POST_TIME"),
        ),
        (
            "leaderboard.channel_name",
            config.leaderboard.channel_name.clone(),
            Some("KUDOS_LEADERBOARD_CHANNEL"),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            Some("KUDOS_SERVER_BIND_ADDRESS"),
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            Some("KUDOS_SERVER_HEALTH_CHECK_PORT"),
        ),
        ("logging.level", config.logging.level.clone(), Some("KUDOS_LOGGING_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("KUDOS_LOGGING_FORMAT")),
    ];

    for (key, value, env_var) in fields {
        lines.push(render_line(
            key,
            &value,
            field_source(key, env_var, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.join("\n")
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} ({source})")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("kudos.toml"), PathBuf::from("config/kudos.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key: &str,
    env_var: Option<&str>,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if let Some(var) = env_var {
        if env::var(var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env: {var}");
        }
    }

    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if file_has_key(doc, key) {
            return format!("file: {}", path.display());
        }
    }

    "default".to_string()
}

fn file_has_key(doc: &Value, dotted_key: &str) -> bool {
    let mut current = doc;
    for part in dotted_key.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "(unset)".to_string();
    }
    let prefix: String = token.chars().take(5).collect();
    format!("{prefix}***")
}
