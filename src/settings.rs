use std::path::{Path, PathBuf};

use iced::Theme;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const APP_DIR: &str = "streamflix";
const CONFIG_FILENAME: &str = "config.json";
const THEME_FILENAME: &str = "theme.json";

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Master switch for the remote API; off means placeholder data only.
    pub use_api: bool,
    pub api_base: String,
    pub image_base: String,
    pub api_key: String,
    /// Takes precedence over `api_key` when set.
    pub bearer_token: Option<String>,
    pub language: String,
    pub region: String,
    pub request_timeout_secs: u64,
    /// Forces the density used to pick 1x or 2x poster sources. Unset
    /// follows the window's scale factor.
    pub image_density: Option<f32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            use_api: true,
            api_base: String::from("https://api.themoviedb.org/3"),
            image_base: String::from("https://image.tmdb.org/t/p"),
            api_key: String::new(),
            bearer_token: None,
            language: String::from("fr-FR"),
            region: String::from("FR"),
            request_timeout_secs: 15,
            image_density: None,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

impl AppSettings {
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    /// Config file (if any) overlaid with `STREAMFLIX_*` environment variables.
    pub fn load() -> Self {
        let mut settings = Self::config_path()
            .map(|path| Self::from_file(&path))
            .unwrap_or_default();
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    pub fn from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(flag) = lookup("STREAMFLIX_USE_API") {
            self.use_api = !matches!(flag.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Some(base) = lookup("STREAMFLIX_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.api_base = base.trim().trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("STREAMFLIX_API_KEY") {
            self.api_key = key.trim().to_string();
        }
        if let Some(token) = lookup("STREAMFLIX_BEARER") {
            let token = token.trim().to_string();
            self.bearer_token = (!token.is_empty()).then_some(token);
        }
        if let Some(lang) = lookup("STREAMFLIX_LANG").filter(|v| !v.trim().is_empty()) {
            self.language = lang.trim().to_string();
        }
        if let Some(region) = lookup("STREAMFLIX_REGION").filter(|v| !v.trim().is_empty()) {
            self.region = region.trim().to_string();
        }
        if let Some(density) = lookup("STREAMFLIX_IMAGE_DENSITY")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
        {
            self.image_density = Some(density);
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn has_credential(&self) -> bool {
        self.bearer().is_some() || !self.api_key.trim().is_empty()
    }

    /// The API is only called when enabled and a credential exists.
    pub fn remote_enabled(&self) -> bool {
        self.use_api && self.has_credential()
    }

    pub fn log_summary(&self) {
        let auth = if self.bearer().is_some() {
            "bearer"
        } else if !self.api_key.trim().is_empty() {
            "api_key"
        } else {
            "none"
        };
        info!(
            api_base = %self.api_base,
            language = %self.language,
            region = %self.region,
            auth,
            remote = self.remote_enabled(),
            "Settings loaded"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
    Cinema,
}

impl ThemeChoice {
    pub fn next(self) -> Self {
        match self {
            ThemeChoice::Dark => ThemeChoice::Light,
            ThemeChoice::Light => ThemeChoice::Cinema,
            ThemeChoice::Cinema => ThemeChoice::Dark,
        }
    }

    pub fn to_theme(self) -> Theme {
        match self {
            ThemeChoice::Dark => Theme::Dark,
            ThemeChoice::Light => Theme::Light,
            ThemeChoice::Cinema => Theme::Dracula,
        }
    }
}

impl std::fmt::Display for ThemeChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeChoice::Dark => write!(f, "Dark"),
            ThemeChoice::Light => write!(f, "Light"),
            ThemeChoice::Cinema => write!(f, "Cinema"),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ThemeFile {
    theme: ThemeChoice,
}

/// The one persisted user preference. Storage failures never surface.
#[derive(Debug, Clone)]
pub struct ThemePreference {
    path: Option<PathBuf>,
}

impl ThemePreference {
    pub fn new() -> Self {
        Self {
            path: config_dir().map(|dir| dir.join(THEME_FILENAME)),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn load(&self) -> ThemeChoice {
        self.path
            .as_ref()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| serde_json::from_str::<ThemeFile>(&content).ok())
            .map(|file| file.theme)
            .unwrap_or_default()
    }

    pub fn save(&self, theme: ThemeChoice) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(content) = serde_json::to_string(&ThemeFile { theme }) {
            if let Err(e) = std::fs::write(path, content) {
                warn!(error = %e, "Could not store theme preference");
            }
        }
    }
}
