use std::path::Path;

use anyhow::Context;

use crate::animation::highlight::HIGHLIGHT_BASE_OPACITY;
use crate::foundation::error::{MarkerlayError, MarkerlayResult};
use crate::overlay::binding::BindingTable;
use crate::session::tracking::TrackingConfig;

/// Name of the reference image group the demo experience ships with.
pub const DEFAULT_REFERENCE_GROUP: &str = "AR Resources";

/// Delay before the scan hint is shown after tracking (re)starts.
pub const SCAN_HINT_DELAY_SEC: f64 = 7.5;

/// Session time during which a second restart request is ignored.
pub const RESTART_COOLDOWN_SEC: f64 = 5.0;

pub const SCAN_HINT: &str = "Look around to detect images";

fn default_group() -> String {
    DEFAULT_REFERENCE_GROUP.to_string()
}

fn default_highlight_opacity() -> f64 {
    HIGHLIGHT_BASE_OPACITY
}

fn default_scan_hint_delay() -> f64 {
    SCAN_HINT_DELAY_SEC
}

fn default_restart_cooldown() -> f64 {
    RESTART_COOLDOWN_SEC
}

fn default_tick_hz() -> u32 {
    30
}

/// Everything configurable about one image-tracking experience.
///
/// Loaded from JSON; every field may be omitted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperienceConfig {
    #[serde(default = "default_group")]
    pub reference_group: String,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub bindings: BindingTable,
    #[serde(default = "default_highlight_opacity")]
    pub highlight_base_opacity: f64,
    #[serde(default = "default_scan_hint_delay")]
    pub scan_hint_delay_sec: f64,
    #[serde(default = "default_restart_cooldown")]
    pub restart_cooldown_sec: f64,
    /// Scene ticks per second when the session is driven by the CLI.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            reference_group: default_group(),
            tracking: TrackingConfig::default(),
            bindings: BindingTable::default(),
            highlight_base_opacity: default_highlight_opacity(),
            scan_hint_delay_sec: default_scan_hint_delay(),
            restart_cooldown_sec: default_restart_cooldown(),
            tick_hz: default_tick_hz(),
        }
    }
}

impl ExperienceConfig {
    /// The bundled experience: museum poster, fire poster and the hand-eye animation.
    pub fn demo() -> Self {
        Self {
            bindings: BindingTable::demo(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> MarkerlayResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| MarkerlayError::serde(format!("experience config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> MarkerlayResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read experience config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> MarkerlayResult<()> {
        if self.reference_group.trim().is_empty() {
            return Err(MarkerlayError::validation("reference_group must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.highlight_base_opacity) {
            return Err(MarkerlayError::validation(format!(
                "highlight_base_opacity must be in [0, 1], got {}",
                self.highlight_base_opacity
            )));
        }
        for (name, v) in [
            ("scan_hint_delay_sec", self.scan_hint_delay_sec),
            ("restart_cooldown_sec", self.restart_cooldown_sec),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(MarkerlayError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if self.tick_hz == 0 {
            return Err(MarkerlayError::validation("tick_hz must be > 0"));
        }
        self.tracking.validate()?;
        self.bindings.validate()
    }

    pub fn tick_sec(&self) -> f64 {
        1.0 / f64::from(self.tick_hz)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
