//! Startup configuration, read from the environment (and `.env`, loaded by `main`).

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TOKEN_FILE: &str = "token.txt";
pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

/// Errors that prevent the bot from starting.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no Discord token found: set DISCORD_TOKEN or put the token in {}", .0.display())]
    MissingToken(PathBuf),

    #[error("failed to read token file {}: {source}", .path.display())]
    TokenFile { path: PathBuf, source: io::Error },

    #[error("invalid RESOLVE_TIMEOUT '{value}': {source}")]
    InvalidTimeout {
        value: String,
        source: humantime::DurationError,
    },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    /// `None` disables the resolver timeout.
    pub resolve_timeout: Option<Duration>,
    pub ytdlp_path: String,
}

impl BotConfig {
    /// Reads `DISCORD_TOKEN` (falling back to `DISCORD_TOKEN_FILE`, default `token.txt`),
    /// `COMMAND_PREFIX`, `RESOLVE_TIMEOUT` and `YTDLP_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_file = env::var("DISCORD_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE));
        let token = load_token(env::var("DISCORD_TOKEN").ok(), &token_file)?;

        let prefix = env::var("COMMAND_PREFIX")
            .ok()
            .filter(|prefix| !prefix.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let resolve_timeout = parse_timeout(env::var("RESOLVE_TIMEOUT").ok().as_deref())?;

        let ytdlp_path =
            env::var("YTDLP_PATH").unwrap_or_else(|_| DEFAULT_YTDLP_PATH.to_string());

        Ok(Self {
            token,
            prefix,
            resolve_timeout,
            ytdlp_path,
        })
    }
}

/// The environment value wins when it is non-empty; otherwise the token file is read.
pub fn load_token(from_env: Option<String>, token_file: &Path) -> Result<String, ConfigError> {
    if let Some(token) = from_env.map(|t| t.trim().to_string()) {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let contents = match fs::read_to_string(token_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingToken(token_file.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::TokenFile {
                path: token_file.to_path_buf(),
                source,
            });
        }
    };

    let token = contents.trim();
    if token.is_empty() {
        return Err(ConfigError::MissingToken(token_file.to_path_buf()));
    }
    Ok(token.to_string())
}

/// Parse a humantime duration such as `30s` or `1m 30s`. `0` and `off` disable the timeout.
pub fn parse_timeout(value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Some(DEFAULT_RESOLVE_TIMEOUT));
    };

    if value == "0" || value.eq_ignore_ascii_case("off") {
        return Ok(None);
    }

    let duration = humantime::parse_duration(value).map_err(|source| {
        ConfigError::InvalidTimeout {
            value: value.to_string(),
            source,
        }
    })?;

    Ok((!duration.is_zero()).then_some(duration))
}
