//! Configuration system (layered: code > env > settings file).

pub mod npc;

pub use npc::{NpcConfig, TurnPolicy};

use std::path::{Path, PathBuf};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ColloquyError;

/// SDK-wide settings: which game the SDK talks for and its model defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkSettings {
    /// Game identifier issued by the service dashboard. Required.
    #[builder(into)]
    pub game_id: Option<String>,
    /// Chat model used when a client does not name one.
    #[builder(into)]
    pub default_chat_model: Option<String>,
    #[builder(into)]
    pub default_image_model: Option<String>,
    /// Development-only token. Heavily rate-limited server side.
    #[builder(into)]
    pub developer_token: Option<String>,
    /// Force the player authentication flow even when a developer token exists.
    #[builder(default)]
    pub ignore_developer_token: bool,
}

impl SdkSettings {
    /// Load from environment variables (COLLOQUY_GAME_ID, COLLOQUY_CHAT_MODEL, etc.).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            game_id: var("COLLOQUY_GAME_ID"),
            default_chat_model: var("COLLOQUY_CHAT_MODEL"),
            default_image_model: var("COLLOQUY_IMAGE_MODEL"),
            developer_token: var("COLLOQUY_DEVELOPER_TOKEN"),
            ignore_developer_token: var("COLLOQUY_IGNORE_DEVELOPER_TOKEN")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ColloquyError> {
        toml::from_str(text).map_err(|e| ColloquyError::Configuration(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ColloquyError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Write settings to a TOML file, creating parent directories.
    pub fn save_toml_file(&self, path: impl AsRef<Path>) -> Result<(), ColloquyError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text =
            toml::to_string_pretty(self).map_err(|e| ColloquyError::Configuration(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Platform settings location, e.g. `~/.config/colloquy/settings.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "colloquy")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Settings file values, overridden by any environment variable that is set.
    pub fn load() -> Result<Self, ColloquyError> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => Self::from_toml_file(path)?,
            _ => Self::default(),
        };
        Ok(base.merged_with(Self::from_env()))
    }

    /// Overlay every field that `other` sets onto `self`.
    pub fn merged_with(self, other: Self) -> Self {
        Self {
            game_id: other.game_id.or(self.game_id),
            default_chat_model: other.default_chat_model.or(self.default_chat_model),
            default_image_model: other.default_image_model.or(self.default_image_model),
            developer_token: other.developer_token.or(self.developer_token),
            ignore_developer_token: other.ignore_developer_token || self.ignore_developer_token,
        }
    }

    /// Check the settings are usable for initialization.
    pub fn validate(&self) -> Result<(), ColloquyError> {
        match self.game_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(()),
            _ => Err(ColloquyError::Configuration(
                "game_id is required; set it in settings.toml or COLLOQUY_GAME_ID".into(),
            )),
        }
    }

    /// Pick the developer token to authenticate with, if any.
    ///
    /// An explicit token wins over the configured one; neither is used when
    /// `ignore_developer_token` is set.
    pub fn resolve_developer_token(&self, explicit: Option<String>) -> Option<String> {
        if self.ignore_developer_token {
            return None;
        }
        explicit
            .or_else(|| self.developer_token.clone())
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_game_id() {
        assert!(matches!(
            SdkSettings::default().validate(),
            Err(ColloquyError::Configuration(_))
        ));
        assert!(SdkSettings::builder()
            .game_id("   ")
            .build()
            .validate()
            .is_err());
        assert!(SdkSettings::builder()
            .game_id("game-42")
            .build()
            .validate()
            .is_ok());
    }

    #[test]
    fn explicit_developer_token_wins() {
        let settings = SdkSettings::builder().developer_token("from-settings").build();
        assert_eq!(
            settings.resolve_developer_token(Some("explicit".into())),
            Some("explicit".to_string())
        );
        assert_eq!(
            settings.resolve_developer_token(None),
            Some("from-settings".to_string())
        );
    }

    #[test]
    fn ignore_flag_disables_developer_tokens() {
        let settings = SdkSettings::builder()
            .developer_token("from-settings")
            .ignore_developer_token(true)
            .build();
        assert_eq!(settings.resolve_developer_token(Some("explicit".into())), None);
    }

    #[test]
    fn merge_prefers_overlay_values() {
        let file = SdkSettings::builder()
            .game_id("file-game")
            .default_chat_model("file-model")
            .build();
        let env = SdkSettings::builder().default_chat_model("env-model").build();
        let merged = file.merged_with(env);
        assert_eq!(merged.game_id.as_deref(), Some("file-game"));
        assert_eq!(merged.default_chat_model.as_deref(), Some("env-model"));
    }

    #[test]
    fn toml_missing_fields_default() {
        let settings = SdkSettings::from_toml_str(r#"game_id = "g""#).unwrap();
        assert_eq!(settings.game_id.as_deref(), Some("g"));
        assert_eq!(settings.default_chat_model, None);
        assert!(!settings.ignore_developer_token);
    }

    #[test]
    fn toml_type_errors_are_configuration_errors() {
        assert!(matches!(
            SdkSettings::from_toml_str("game_id = 5"),
            Err(ColloquyError::Configuration(_))
        ));
    }
}
