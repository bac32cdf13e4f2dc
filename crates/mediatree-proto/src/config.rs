use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_address")]
    pub address: String,
    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// `"local"` for the in-process player, `host:port` for a networked
    /// renderer, empty to take the first renderer the server advertises.
    #[serde(default = "default_renderer")]
    pub renderer: String,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Tracks per splice command when queueing an album.
    #[serde(default = "default_tracks_per_message")]
    pub tracks_per_message: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_nav_popup_idle_secs")]
    pub nav_popup_idle_secs: u64,
    #[serde(default = "default_image_controls_idle_secs")]
    pub image_controls_idle_secs: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

/// Where playback commands go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererChoice {
    Local,
    Auto,
    Remote(String),
}

impl PlayerConfig {
    pub fn renderer_choice(&self) -> RendererChoice {
        match self.renderer.trim() {
            "" => RendererChoice::Auto,
            "local" => RendererChoice::Local,
            addr => RendererChoice::Remote(addr.to_string()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            renderer: default_renderer(),
            volume: default_volume(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            tracks_per_message: default_tracks_per_message(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            nav_popup_idle_secs: default_nav_popup_idle_secs(),
            image_controls_idle_secs: default_image_controls_idle_secs(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_server_address() -> String {
    platform::default_server_address()
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_renderer() -> String {
    "local".to_string()
}

fn default_volume() -> f64 {
    0.5
}

fn default_tracks_per_message() -> usize {
    50
}

fn default_nav_popup_idle_secs() -> u64 {
    5
}

fn default_image_controls_idle_secs() -> u64 {
    3
}

fn default_log_capacity() -> usize {
    500
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.reconnect_delay_ms, 1000);
        assert_eq!(config.server.address, "127.0.0.1:10101");
        assert_eq!(config.player.renderer_choice(), RendererChoice::Local);
        assert_eq!(config.browser.tracks_per_message, 50);
        assert_eq!(config.ui.nav_popup_idle_secs, 5);
        assert!(Config::config_path().ends_with("mediatree/config.toml"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [player]
            renderer = "10.0.0.5:10102"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.player.renderer_choice(),
            RendererChoice::Remote("10.0.0.5:10102".to_string())
        );
        assert_eq!(config.player.volume, 0.5);
        assert_eq!(config.ui.log_capacity, 500);
    }

    #[test]
    fn test_empty_renderer_means_auto() {
        let config = Config::from_toml_str("[player]\nrenderer = \"\"\n").unwrap();
        assert_eq!(config.player.renderer_choice(), RendererChoice::Auto);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert_eq!(back.server.address, config.server.address);
        assert_eq!(back.browser.tracks_per_message, 50);
    }
}
