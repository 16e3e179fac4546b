mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;
use std::time::Duration;

use crate::calibration::CalibrationSettings;
use crate::engine::EngineSettings;
use crate::orientation::Orientation;
use crate::panel::{PanelProfile, WAVESHARE_1IN69};
use crate::store;

const DEFAULT_POLL_HZ: u32 = 30;

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub panel: &'static PanelProfile,
    /// Fixed bus; `None` probes the panel's candidate buses.
    pub bus: Option<u32>,
    pub address: u8,
    pub profile_path: PathBuf,
    /// Overrides the stored orientation when set.
    pub orientation: Option<Orientation>,
    /// Overrides the stored smoothing factor when set.
    pub smoothing: Option<f64>,
    pub poll_hz: u32,
    pub engine: EngineSettings,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let f = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        let panel_name = cli.panel.clone().unwrap_or(f.panel);
        let panel = PanelProfile::by_name(&panel_name).unwrap_or_else(|| {
            log::warn!("Unknown panel '{}', using {}", panel_name, WAVESHARE_1IN69.name);
            &WAVESHARE_1IN69
        });

        let cal_defaults = CalibrationSettings::default();
        let ms = |v: Option<u64>, d: Duration| v.map(Duration::from_millis).unwrap_or(d);
        let calibration = CalibrationSettings {
            screen: panel.screen(),
            target_margin: f.target_margin.unwrap_or(cal_defaults.target_margin),
            step_timeout: ms(f.step_timeout_ms, cal_defaults.step_timeout),
            samples_per_corner: f.samples_per_corner.unwrap_or(cal_defaults.samples_per_corner),
            min_corner_samples: f.min_corner_samples.unwrap_or(cal_defaults.min_corner_samples),
            reject_fraction: cli
                .reject_fraction
                .or(f.reject_fraction)
                .unwrap_or(cal_defaults.reject_fraction),
            raw_pad: f.raw_pad.unwrap_or(cal_defaults.raw_pad),
            swipe_window: ms(f.swipe_window_ms, cal_defaults.swipe_window),
            swipe_min_samples: f.swipe_min_samples.unwrap_or(cal_defaults.swipe_min_samples),
            swipe_trim_fraction: f.swipe_trim_fraction.unwrap_or(cal_defaults.swipe_trim_fraction),
            swipe_min_travel: f.swipe_min_travel.unwrap_or(cal_defaults.swipe_min_travel),
        };

        let d = EngineSettings::default();
        let engine = EngineSettings {
            calibration,
            calibrator: cli.calibrator.unwrap_or(f.calibrator),
            save_interval: ms(f.save_interval_ms, d.save_interval),
            long_press: ms(f.long_press_ms, d.long_press),
            long_press_zone: f.long_press_zone.unwrap_or(d.long_press_zone),
            retry_delay: ms(f.retry_delay_ms, d.retry_delay),
            swipe_threshold: f.swipe_threshold.unwrap_or(d.swipe_threshold),
            adaptive_margin: f.adaptive_margin.unwrap_or(d.adaptive_margin),
            adaptive_pad: f.adaptive_pad.unwrap_or(d.adaptive_pad),
        };

        Self {
            panel,
            bus: cli.bus.or(f.bus),
            address: cli.address.or(f.address).unwrap_or(panel.touch_address),
            profile_path: cli
                .profile
                .clone()
                .or(f.profile)
                .unwrap_or_else(store::default_profile_path),
            orientation: cli.orientation.or(f.orientation),
            smoothing: cli.smoothing.or(f.smoothing),
            poll_hz: cli.poll_hz.or(f.poll_hz).unwrap_or(DEFAULT_POLL_HZ),
            engine,
        }
    }

    /// Buses to try, in order.
    pub fn buses(&self) -> Vec<u32> {
        match self.bus {
            Some(b) => vec![b],
            None => self.panel.candidate_buses.to_vec(),
        }
    }

    pub fn frame_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.poll_hz.max(1) as f64)
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.poll_hz == 0 || self.poll_hz > 1000 {
            return Err("poll_hz must be between 1 and 1000");
        }
        if let Some(a) = self.smoothing {
            if !(a > 0.0 && a <= 1.0) {
                return Err("smoothing must be in (0, 1]");
            }
        }
        let cal = &self.engine.calibration;
        if !(cal.reject_fraction.is_finite() && cal.reject_fraction > 0.0) {
            return Err("reject_fraction must be a positive number");
        }
        if cal.samples_per_corner == 0 {
            return Err("samples_per_corner must be at least 1");
        }
        if !(cal.swipe_trim_fraction > 0.0 && cal.swipe_trim_fraction <= 0.5) {
            return Err("swipe_trim_fraction must be in (0, 0.5]");
        }
        if cal.step_timeout.is_zero() {
            return Err("step_timeout_ms must be non-zero");
        }
        if self.address > 0x7F {
            return Err("I2C address must be a 7-bit address");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibratorKind;
    use clap::Parser;
    use std::io::Write;

    fn load(args: &[&str], toml: &str) -> Config {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let mut argv = vec!["touchcal", "--config", path.as_str()];
        argv.extend_from_slice(args);
        Config::load(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn defaults_follow_panel() {
        let cfg = load(&[], "");
        assert_eq!(cfg.panel.name, "waveshare-1.69");
        assert_eq!(cfg.engine.calibration.screen, (240, 280));
        assert_eq!(cfg.address, 0x15);
        assert_eq!(cfg.buses(), vec![1, 13, 14]);
        assert_eq!(cfg.poll_hz, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn cli_overrides_file() {
        let cfg = load(
            &["--calibrator", "gesture", "--bus", "3"],
            "calibrator = \"affine\"\nbus = 1\npanel = \"waveshare-1.28\"\nstep_timeout_ms = 4000\n",
        );
        assert_eq!(cfg.engine.calibrator, CalibratorKind::Gesture);
        assert_eq!(cfg.buses(), vec![3]);
        assert_eq!(cfg.engine.calibration.screen, (240, 240));
        assert_eq!(cfg.engine.calibration.step_timeout, Duration::from_secs(4));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = load(&[], "");
        cfg.smoothing = Some(0.0);
        assert!(cfg.validate().is_err());

        let mut cfg = load(&[], "");
        cfg.engine.calibration.reject_fraction = f64::NAN;
        assert!(cfg.validate().is_err());

        let cfg = load(&["--poll-hz", "0"], "");
        assert!(cfg.validate().is_err());
    }
}
