use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::drill::{DrillTuning, DrillType};
use crate::pairing::{DEFAULT_MAX_PENDING_FRAMES, DEFAULT_PAIRING_TIMEOUT};

pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

const DEFAULT_API_ADDR: &str = "127.0.0.1:8800";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EngineConfigFile {
    api_addr: Option<String>,
    pairing_timeout_ms: Option<u64>,
    max_pending_frames: Option<usize>,
    session_idle_timeout_ms: Option<u64>,
    tuning: Option<BTreeMap<String, TuningOverride>>,
}

/// Per-drill override of the built-in detector constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningOverride {
    pub cooldown_frames: Option<u64>,
    pub proximity_factor: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_addr: String,
    pub pairing_timeout: Duration,
    pub max_pending_frames: usize,
    /// Sessions with no submission for this long are dropped by the API sweep.
    pub session_idle_timeout: Duration,
    pub tuning: BTreeMap<DrillType, TuningOverride>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_addr: DEFAULT_API_ADDR.to_string(),
            pairing_timeout: DEFAULT_PAIRING_TIMEOUT,
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            tuning: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// File named by `DRILL_CONFIG` (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DRILL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a config file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EngineConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let mut tuning = BTreeMap::new();
        for (name, overrides) in file.tuning.unwrap_or_default() {
            let drill: DrillType = name
                .parse()
                .map_err(|e| anyhow!("invalid tuning section: {}", e))?;
            tuning.insert(drill, overrides);
        }
        Ok(Self {
            api_addr: file.api_addr.unwrap_or(defaults.api_addr),
            pairing_timeout: file
                .pairing_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pairing_timeout),
            max_pending_frames: file
                .max_pending_frames
                .unwrap_or(defaults.max_pending_frames),
            session_idle_timeout: file
                .session_idle_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.session_idle_timeout),
            tuning,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("DRILL_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr.trim().to_string();
            }
        }
        if let Ok(timeout) = std::env::var("DRILL_PAIRING_TIMEOUT_MS") {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("DRILL_PAIRING_TIMEOUT_MS must be an integer number of milliseconds")
            })?;
            self.pairing_timeout = Duration::from_millis(millis);
        }
        if let Ok(frames) = std::env::var("DRILL_MAX_PENDING_FRAMES") {
            self.max_pending_frames = frames
                .trim()
                .parse()
                .map_err(|_| anyhow!("DRILL_MAX_PENDING_FRAMES must be an integer"))?;
        }
        if let Ok(timeout) = std::env::var("DRILL_SESSION_IDLE_TIMEOUT_MS") {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("DRILL_SESSION_IDLE_TIMEOUT_MS must be an integer number of milliseconds")
            })?;
            self.session_idle_timeout = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.api_addr.trim().is_empty() {
            return Err(anyhow!("api_addr must not be empty"));
        }
        if self.pairing_timeout.is_zero() {
            return Err(anyhow!("pairing timeout must be greater than zero"));
        }
        if self.max_pending_frames == 0 {
            return Err(anyhow!("max_pending_frames must be greater than zero"));
        }
        if self.session_idle_timeout.is_zero() {
            return Err(anyhow!("session idle timeout must be greater than zero"));
        }
        for (drill, overrides) in &self.tuning {
            if overrides.cooldown_frames == Some(0) {
                return Err(anyhow!("{}: cooldown_frames must be greater than zero", drill));
            }
            if let Some(factor) = overrides.proximity_factor {
                if drill.default_tuning().proximity_factor.is_none() {
                    return Err(anyhow!("{}: drill has no proximity threshold", drill));
                }
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(anyhow!(
                        "{}: proximity_factor must be a positive number",
                        drill
                    ));
                }
            }
        }
        Ok(())
    }

    /// Built-in constants for `drill` with any configured override applied.
    pub fn tuning_for(&self, drill: DrillType) -> DrillTuning {
        let mut tuning = drill.default_tuning();
        if let Some(overrides) = self.tuning.get(&drill) {
            if let Some(cooldown) = overrides.cooldown_frames {
                tuning.cooldown_frames = cooldown;
            }
            if overrides.proximity_factor.is_some() {
                tuning.proximity_factor = overrides.proximity_factor;
            }
        }
        tuning
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: EngineConfigFile = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_layer_on_defaults() {
        let mut cfg = EngineConfig::default();
        cfg.tuning.insert(
            DrillType::PushPull,
            TuningOverride {
                cooldown_frames: Some(8),
                proximity_factor: None,
            },
        );
        let tuning = cfg.tuning_for(DrillType::PushPull);
        assert_eq!(tuning.cooldown_frames, 8);
        assert_eq!(tuning.proximity_factor, Some(0.70));
        assert_eq!(
            cfg.tuning_for(DrillType::ToeTap),
            DrillType::ToeTap.default_tuning()
        );
    }

    #[test]
    fn proximity_override_needs_a_proximity_drill() {
        let mut cfg = EngineConfig::default();
        cfg.tuning.insert(
            DrillType::InsideTap,
            TuningOverride {
                cooldown_frames: None,
                proximity_factor: Some(0.5),
            },
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_cooldown_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.tuning.insert(
            DrillType::ToeTap,
            TuningOverride {
                cooldown_frames: Some(0),
                proximity_factor: None,
            },
        );
        assert!(cfg.validate().is_err());
    }
}
