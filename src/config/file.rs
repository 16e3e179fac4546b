use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::calibration::CalibratorKind;
use crate::orientation::Orientation;

const DEFAULT_PANEL: &str = "waveshare-1.69";

/// `touchcal.toml`. Every tuning value is optional; unset ones keep the
/// built-in default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "default_panel")]
    pub panel: String,
    pub bus: Option<u32>,
    pub address: Option<u8>,
    pub profile: Option<PathBuf>,
    #[serde(default)]
    pub calibrator: CalibratorKind,
    pub orientation: Option<Orientation>,
    pub smoothing: Option<f64>,
    pub poll_hz: Option<u32>,

    // calibration tuning
    pub reject_fraction: Option<f64>,
    pub target_margin: Option<u32>,
    pub step_timeout_ms: Option<u64>,
    pub samples_per_corner: Option<usize>,
    pub min_corner_samples: Option<usize>,
    pub raw_pad: Option<u16>,
    pub swipe_window_ms: Option<u64>,
    pub swipe_min_samples: Option<usize>,
    pub swipe_trim_fraction: Option<f64>,
    pub swipe_min_travel: Option<u16>,

    // runtime behaviour
    pub swipe_threshold: Option<i32>,
    pub adaptive_margin: Option<u16>,
    pub adaptive_pad: Option<u16>,
    pub save_interval_ms: Option<u64>,
    pub long_press_ms: Option<u64>,
    pub long_press_zone: Option<i32>,
    pub retry_delay_ms: Option<u64>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            panel: DEFAULT_PANEL.into(),
            bus: None,
            address: None,
            profile: None,
            calibrator: CalibratorKind::default(),
            orientation: None,
            smoothing: None,
            poll_hz: None,
            reject_fraction: None,
            target_margin: None,
            step_timeout_ms: None,
            samples_per_corner: None,
            min_corner_samples: None,
            raw_pad: None,
            swipe_window_ms: None,
            swipe_min_samples: None,
            swipe_trim_fraction: None,
            swipe_min_travel: None,
            swipe_threshold: None,
            adaptive_margin: None,
            adaptive_pad: None,
            save_interval_ms: None,
            long_press_ms: None,
            long_press_zone: None,
            retry_delay_ms: None,
        }
    }
}

fn default_panel() -> String {
    DEFAULT_PANEL.into()
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    parse(&content, path)
}

fn parse(content: &str, path: &Path) -> Option<FileConfig> {
    match toml::from_str(content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    for path in default_config_paths() {
        if path.exists() {
            if let Some(config) = load_from_path(&path) {
                return Some(config);
            }
        }
    }
    None
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("touchcal.toml"));

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join("touchcal.toml"));
    }

    paths
}
