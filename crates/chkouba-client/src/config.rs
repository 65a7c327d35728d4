//! config - client settings loaded from toml
//!
//! every field has a default, so an absent file or a partial file is fine.
//! default location is `<config dir>/chkouba/client.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// accepted range for `animation_speed`
pub const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.1..=10.0;

/// config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no config directory on this platform")]
    NoConfigDir,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// seat name the server knows us by
    pub player_name: String,
    pub server: ServerConfig,
    pub viewport: ViewportConfig,
    pub timings: AnimationTimings,
    /// 0.5 = slow, 1.0 = normal, 2.0 = fast
    pub animation_speed: f32,
    /// when off, every tween and pause completes immediately
    pub animations_enabled: bool,
    pub snap: SnapTolerance,
    pub assets: AssetConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub game_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}

/// stage durations in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTimings {
    pub present: u64,
    pub flip_half: u64,
    pub hold: u64,
    pub highlight: u64,
    pub contact: u64,
    pub gather: u64,
    pub collect: u64,
    pub drop: u64,
    pub sync: u64,
    pub removal: u64,
    /// start delay for freshly dealt hand cards after a remote move
    pub deal_delay: u64,
    /// clears an unconfirmed pending move
    pub failsafe: u64,
    /// pause before acknowledging on behalf of an idle ai seat
    pub auto_ack: u64,
    /// releases shorter than this count as taps
    pub tap_threshold: u64,
}

/// below both thresholds a sync snaps instead of tweening
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapTolerance {
    pub position_px: f32,
    pub rotation_deg: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub card_back: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            server: ServerConfig::default(),
            viewport: ViewportConfig::default(),
            timings: AnimationTimings::default(),
            animation_speed: 1.0,
            animations_enabled: true,
            snap: SnapTolerance::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".to_string(),
            game_id: "default".to_string(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            present: 800,
            flip_half: 300,
            hold: 1000,
            highlight: 800,
            contact: 600,
            gather: 600,
            collect: 1000,
            drop: 800,
            sync: 600,
            removal: 800,
            deal_delay: 3500,
            failsafe: 1000,
            auto_ack: 1000,
            tap_threshold: 200,
        }
    }
}

impl Default for SnapTolerance {
    fn default() -> Self {
        Self {
            position_px: 1.0,
            rotation_deg: 0.5,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            card_back: "card_back".to_string(),
        }
    }
}

impl AnimationTimings {
    /// apply the speed multiplier; disabled animations take no time
    pub fn scaled(&self, speed: f32, enabled: bool) -> Self {
        if !enabled {
            return Self {
                present: 0,
                flip_half: 0,
                hold: 0,
                highlight: 0,
                contact: 0,
                gather: 0,
                collect: 0,
                drop: 0,
                sync: 0,
                removal: 0,
                deal_delay: 0,
                // input timing is not an animation
                failsafe: self.failsafe,
                auto_ack: self.auto_ack,
                tap_threshold: self.tap_threshold,
            };
        }
        let speed = if speed.is_finite() {
            speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end())
        } else {
            1.0
        };
        let s = |ms: u64| (ms as f32 / speed).round() as u64;
        Self {
            present: s(self.present),
            flip_half: s(self.flip_half),
            hold: s(self.hold),
            highlight: s(self.highlight),
            contact: s(self.contact),
            gather: s(self.gather),
            collect: s(self.collect),
            drop: s(self.drop),
            sync: s(self.sync),
            removal: s(self.removal),
            deal_delay: s(self.deal_delay),
            failsafe: self.failsafe,
            auto_ack: s(self.auto_ack),
            tap_threshold: self.tap_threshold,
        }
    }
}

impl ClientConfig {
    /// default config path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("chkouba").join("client.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// load from an explicit path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// load from the default path, falling back to defaults if it is absent
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_name.trim().is_empty() {
            return Err(ConfigError::Invalid("player_name is empty".into()));
        }
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport must be positive, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if !SPEED_RANGE.contains(&self.animation_speed) {
            return Err(ConfigError::Invalid(format!(
                "animation_speed must be within 0.1..=10.0, got {}",
                self.animation_speed
            )));
        }
        if self.snap.position_px < 0.0 || self.snap.rotation_deg < 0.0 {
            return Err(ConfigError::Invalid("snap tolerance must not be negative".into()));
        }
        Ok(())
    }

    /// timings after speed and the enabled flag are applied
    pub fn effective_timings(&self) -> AnimationTimings {
        self.timings.scaled(self.animation_speed, self.animations_enabled)
    }

    /// websocket endpoint for this seat
    pub fn ws_endpoint(&self) -> String {
        format!(
            "{}/ws/{}/{}",
            self.server.url.trim_end_matches('/'),
            self.server.game_id,
            self.player_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timings.present, 800);
        assert_eq!(config.timings.deal_delay, 3500);
    }

    #[test]
    fn test_partial_toml() {
        let config = ClientConfig::from_toml(
            r#"
            player_name = "Alice"
            animation_speed = 2.0

            [timings]
            hold = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.player_name, "Alice");
        assert_eq!(config.timings.hold, 500);
        assert_eq!(config.timings.present, 800);
        assert_eq!(config.effective_timings().present, 400);
        assert_eq!(config.effective_timings().failsafe, 1000);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let err = ClientConfig::from_toml("animation_speed = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_extreme_speed_rejected() {
        for speed in ["1e-30", "100.0", "nan", "inf"] {
            let err = ClientConfig::from_toml(&format!("animation_speed = {}", speed)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "speed {} accepted", speed);
        }
        assert!(ClientConfig::from_toml("animation_speed = 10.0").is_ok());
    }

    #[test]
    fn test_scaled_clamps_speed() {
        let t = AnimationTimings::default().scaled(1e-30, true);
        assert_eq!(t.deal_delay, 35000);
        assert_eq!(t.sync, 6000);
        let t = AnimationTimings::default().scaled(f32::NAN, true);
        assert_eq!(t.present, 800);
    }

    #[test]
    fn test_invalid_viewport_rejected() {
        let mut config = ClientConfig::default();
        config.viewport.width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_animations_keep_input_timing() {
        let mut config = ClientConfig::default();
        config.animations_enabled = false;
        let t = config.effective_timings();
        assert_eq!(t.present, 0);
        assert_eq!(t.collect, 0);
        assert_eq!(t.tap_threshold, 200);
        assert_eq!(t.failsafe, 1000);
    }

    #[test]
    fn test_ws_endpoint() {
        let mut config = ClientConfig::default();
        config.server.url = "ws://host:8000/".into();
        config.server.game_id = "g1".into();
        config.player_name = "Alice".into();
        assert_eq!(config.ws_endpoint(), "ws://host:8000/ws/g1/Alice");
    }
}
