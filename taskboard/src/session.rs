//! Persisted client state: auth token, theme mode and accent color.
//!
//! Stored as a small TOML document (`state.toml`) under the platform data
//! directory. Every write replaces the whole file. A session without a
//! path lives in memory only (tests, or when no data dir is available).

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Default accent color.
pub const DEFAULT_ACCENT: &str = "#3B82F6";

/// Errors that can occur when reading or writing persisted state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to read the state file.
    #[error("failed to read state file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the state file.
    #[error("failed to write state file {path}: {source}")]
    Write {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The state file is not valid TOML.
    #[error("failed to parse state file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The state could not be serialized.
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Accent color is not `#RRGGBB`.
    #[error("invalid accent color {0:?} (expected #RRGGBB)")]
    InvalidAccent(String),

    /// Unknown theme name.
    #[error("unknown theme {0:?} (expected light, dark or auto)")]
    InvalidTheme(String),
}

/// Interface theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light palette.
    Light,
    /// Dark palette.
    Dark,
    /// Follow the terminal background.
    #[default]
    Auto,
}

impl std::str::FromStr for ThemeMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "auto" => Ok(Self::Auto),
            other => Err(SessionError::InvalidTheme(other.to_string())),
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// On-disk layout. Keys match the storage slot names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct StoredState {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(rename = "app-theme")]
    theme: ThemeMode,
    #[serde(rename = "app-accent-color")]
    accent_color: String,
}

impl Default for StoredState {
    fn default() -> Self {
        Self {
            token: None,
            theme: ThemeMode::Auto,
            accent_color: DEFAULT_ACCENT.to_string(),
        }
    }
}

/// Process-wide credential and preference store.
///
/// Shared as `Arc<Session>`; the HTTP gateway reads the token on every
/// request.
#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    state: RwLock<StoredState>,
}

impl Session {
    /// Default location: `<data dir>/taskboard/state.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("taskboard").join("state.toml"))
    }

    /// A session that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoredState::default()),
        }
    }

    /// Opens the state file at `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file exists but cannot be read or
    /// parsed.
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let state = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredState::default(),
            Err(e) => {
                return Err(SessionError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        tracing::debug!(path = %path.display(), "session state loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            state: RwLock::new(state),
        })
    }

    /// Bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    /// Returns `true` if a token is stored.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.state.read().token.is_some()
    }

    /// Stores (or with `None`, clears) the bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the state file cannot be written.
    pub fn set_token(&self, token: Option<String>) -> Result<(), SessionError> {
        self.update(|state| state.token = token.filter(|t| !t.is_empty()))
    }

    /// Theme preference.
    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        self.state.read().theme
    }

    /// Persists a theme preference.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the state file cannot be written.
    pub fn set_theme(&self, theme: ThemeMode) -> Result<(), SessionError> {
        self.update(|state| state.theme = theme)
    }

    /// Accent color as `#RRGGBB`.
    #[must_use]
    pub fn accent_color(&self) -> String {
        self.state.read().accent_color.clone()
    }

    /// Persists an accent color after checking it is `#RRGGBB`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidAccent`] for malformed colors, or an
    /// I/O error if the state file cannot be written.
    pub fn set_accent_color(&self, color: &str) -> Result<(), SessionError> {
        let color = color.trim();
        if parse_hex_color(color).is_none() {
            return Err(SessionError::InvalidAccent(color.to_string()));
        }
        let normalized = color.to_ascii_uppercase();
        self.update(|state| state.accent_color = normalized)
    }

    fn update(&self, apply: impl FnOnce(&mut StoredState)) -> Result<(), SessionError> {
        let snapshot = {
            let mut state = self.state.write();
            apply(&mut state);
            state.clone()
        };
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_state(path, &snapshot)
    }
}

/// Parses `#RRGGBB` into its components.
#[must_use]
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn write_state(path: &Path, state: &StoredState) -> Result<(), SessionError> {
    let contents = toml::to_string(state)?;
    let write_err = |source| SessionError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, contents).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)
}
