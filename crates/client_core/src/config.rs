use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const SETTINGS_FILE: &str = "planner.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub session_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/api".into(),
            request_timeout_secs: 30,
            session_path: None,
        }
    }
}

/// Keys accepted in `planner.toml`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    session_path: Option<PathBuf>,
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Defaults, then `planner.toml` in the working directory, then the
/// environment. The resulting API URL is normalized.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let file_cfg = match fs::read_to_string(path) {
        Ok(raw) => Some(
            toml::from_str::<FileSettings>(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?,
        ),
        Err(_) => None,
    };

    finalize(apply_overrides(Settings::default(), file_cfg.as_ref(), env))
}

pub(crate) fn apply_overrides(
    mut settings: Settings,
    file_cfg: Option<&FileSettings>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    if let Some(file_cfg) = file_cfg {
        if let Some(v) = &file_cfg.api_url {
            settings.api_url = v.clone();
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            settings.request_timeout_secs = v;
        }
        if let Some(v) = &file_cfg.session_path {
            settings.session_path = Some(v.clone());
        }
    }

    if let Some(v) = env("EVENT_PLANNER_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__SESSION_PATH") {
        settings.session_path = Some(PathBuf::from(v));
    }

    settings
}

fn finalize(mut settings: Settings) -> anyhow::Result<Settings> {
    settings.api_url = normalize_api_url(&settings.api_url)?;
    Ok(settings)
}

/// Validates the base URL and strips trailing slashes so paths can be
/// appended with `format!("{api_url}/events")`.
pub fn normalize_api_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("api url must not be empty");
    }

    let parsed = Url::parse(trimmed).with_context(|| format!("invalid api url '{trimmed}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("api url '{trimmed}' must use http or https");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
