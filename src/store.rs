//! Profile persistence: one TOML file, overwritten atomically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CalibrationError, CalibrationResult};
use crate::profile::CalibrationProfile;

pub const DEFAULT_PROFILE_FILE: &str = "touchcal-profile.toml";

/// Default profile location: `$HOME/.config/touchcal-profile.toml`, falling
/// back to the working directory when `HOME` is unset.
pub fn default_profile_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".config").join(DEFAULT_PROFILE_FILE),
        Err(_) => PathBuf::from(DEFAULT_PROFILE_FILE),
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored profile. `Ok(None)` if nothing has been saved yet.
    pub fn try_load(&self) -> CalibrationResult<Option<CalibrationProfile>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile: CalibrationProfile = toml::from_str(&content)
            .map_err(|e| CalibrationError::ProfileCorrupt(e.to_string()))?;
        Ok(Some(profile))
    }

    /// Load the profile, substituting the default when it is missing,
    /// unreadable or corrupt. Never fails.
    pub fn load(&self) -> CalibrationProfile {
        let profile = match self.try_load() {
            Ok(Some(profile)) => {
                log::debug!("[store] loaded profile from {}", self.path.display());
                profile
            }
            Ok(None) => {
                log::info!("[store] no profile at {}, using defaults", self.path.display());
                return CalibrationProfile::default();
            }
            Err(e) => {
                log::warn!("[store] {}: {}; using defaults", self.path.display(), e);
                return CalibrationProfile::default();
            }
        };
        sanitize(profile)
    }

    /// Full overwrite. Writes a sibling temp file and renames it over the
    /// target so a crash never leaves a half-written profile.
    pub fn save(&self, profile: &CalibrationProfile) -> CalibrationResult<()> {
        let content = toml::to_string_pretty(profile)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        log::debug!("[store] saved profile to {}", self.path.display());
        Ok(())
    }

    /// Overwrite with the default (uncalibrated) profile.
    pub fn reset(&self) -> CalibrationResult<CalibrationProfile> {
        let profile = CalibrationProfile::default();
        self.save(&profile)?;
        Ok(profile)
    }
}

/// Repair fields a hand-edited or truncated file can break, keeping whatever
/// is still usable.
fn sanitize(mut profile: CalibrationProfile) -> CalibrationProfile {
    let defaults = CalibrationProfile::default();

    if profile.affine.is_some() && !profile.has_usable_affine() {
        log::warn!("[store] stored affine coefficients are not finite, dropping them");
        profile.affine = None;
        profile.calibrated = false;
    }
    if profile.affine.is_none() && !profile.has_usable_range() {
        log::warn!(
            "[store] stored raw range x=[{}, {}] y=[{}, {}] is degenerate, using full range",
            profile.raw_x_min,
            profile.raw_x_max,
            profile.raw_y_min,
            profile.raw_y_max
        );
        profile.raw_x_min = defaults.raw_x_min;
        profile.raw_x_max = defaults.raw_x_max;
        profile.raw_y_min = defaults.raw_y_min;
        profile.raw_y_max = defaults.raw_y_max;
        profile.calibrated = false;
    }
    if !(profile.smoothing_alpha > 0.0 && profile.smoothing_alpha <= 1.0) {
        log::warn!(
            "[store] smoothing alpha {} out of range, using {}",
            profile.smoothing_alpha,
            defaults.smoothing_alpha
        );
        profile.smoothing_alpha = defaults.smoothing_alpha;
    }
    profile
}
