//! The owning context for one touch panel.
//!
//! `TouchEngine` holds the stored profile and threads it by reference through
//! the expander and whichever calibrator is running. The mapper sees the
//! stored profile with any session overrides layered on top; only the stored
//! profile is ever saved. The host
//! calls [`TouchEngine::tick`] once per frame with whatever the source
//! returned; nothing in here sleeps.

use std::time::Duration;

use crate::adaptive::{AdaptiveRangeExpander, DEFAULT_EDGE_MARGIN, DEFAULT_EDGE_PAD};
use crate::calibration::{CalibrationSettings, Calibrator, CalibratorKind, MarkerSurface, Progress};
use crate::error::{CalibrationError, CalibrationResult};
use crate::mapper::{CoordinateMapper, ScreenPoint};
use crate::profile::{CalibrationProfile, ProfileOverrides};
use crate::sample::RawSample;
use crate::store::CalibrationStore;
use crate::swipe::{SwipeDetector, SwipeDirection, DEFAULT_SWIPE_THRESHOLD};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub calibration: CalibrationSettings,
    pub calibrator: CalibratorKind,
    /// Minimum time between two coalesced profile writes.
    pub save_interval: Duration,
    pub long_press: Duration,
    /// Side of the top-left square that arms the long-press trigger, in pixels.
    pub long_press_zone: i32,
    /// Wait before retrying a failed calibration of an uncalibrated profile.
    pub retry_delay: Duration,
    pub swipe_threshold: i32,
    pub adaptive_margin: u16,
    pub adaptive_pad: u16,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            calibration: CalibrationSettings::default(),
            calibrator: CalibratorKind::default(),
            save_interval: Duration::from_secs(2),
            long_press: Duration::from_secs(3),
            long_press_zone: 40,
            retry_delay: Duration::from_secs(5),
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            adaptive_margin: DEFAULT_EDGE_MARGIN,
            adaptive_pad: DEFAULT_EDGE_PAD,
        }
    }
}

/// What happened during one tick.
#[derive(Debug)]
pub enum Frame {
    /// No finger on the panel.
    Idle,
    Touch {
        point: ScreenPoint,
        swipe: Option<SwipeDirection>,
    },
    Calibrating,
    Calibrated,
    CalibrationFailed(CalibrationError),
    /// The long-press trigger fired; calibration starts on the next tick.
    RecalibrationRequested,
}

pub struct TouchEngine {
    settings: EngineSettings,
    store: CalibrationStore,
    profile: CalibrationProfile,
    overrides: ProfileOverrides,
    /// `profile` with `overrides` applied; what touches are mapped with.
    active: CalibrationProfile,
    mapper: CoordinateMapper,
    expander: AdaptiveRangeExpander,
    swipe: SwipeDetector,
    calibrator: Option<Box<dyn Calibrator>>,
    retry_in: Option<Duration>,
    dirty: bool,
    since_save: Duration,
    held: Duration,
    hold_fired: bool,
}

impl TouchEngine {
    /// Build an engine around the profile currently in `store`.
    pub fn new(settings: EngineSettings, store: CalibrationStore) -> Self {
        let profile = store.load();
        Self::with_profile(settings, store, profile)
    }

    pub fn with_profile(
        settings: EngineSettings,
        store: CalibrationStore,
        profile: CalibrationProfile,
    ) -> Self {
        log::info!(
            "[engine] profile: {} x=[{}, {}] y=[{}, {}] affine={} calibrated={}",
            profile.orientation(),
            profile.raw_x_min,
            profile.raw_x_max,
            profile.raw_y_min,
            profile.raw_y_max,
            profile.affine.is_some(),
            profile.calibrated
        );
        Self {
            mapper: CoordinateMapper::new(settings.calibration.screen),
            expander: AdaptiveRangeExpander::new(settings.adaptive_margin, settings.adaptive_pad),
            swipe: SwipeDetector::new(settings.swipe_threshold),
            settings,
            store,
            active: profile.clone(),
            profile,
            overrides: ProfileOverrides::default(),
            calibrator: None,
            retry_in: None,
            dirty: false,
            since_save: Duration::ZERO,
            held: Duration::ZERO,
            hold_fired: false,
        }
    }

    /// Layer session overrides over the stored profile for mapping.
    pub fn with_overrides(mut self, overrides: ProfileOverrides) -> Self {
        if let Some(o) = overrides.orientation {
            log::info!("[engine] orientation forced to {}", o);
        }
        if let Some(alpha) = overrides.smoothing_alpha {
            log::info!("[engine] smoothing forced to {}", alpha);
        }
        self.overrides = overrides;
        self.refresh_active();
        self
    }

    /// The profile as stored, without overrides.
    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// The profile touches are currently mapped with.
    pub fn active_profile(&self) -> &CalibrationProfile {
        &self.active
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_some()
    }

    /// Whether an adaptive change is waiting to be written.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Invalidate the current profile so the next tick starts a calibrator.
    /// The cleared flag is persisted right away.
    pub fn request_recalibration(&mut self) {
        log::info!("[engine] recalibration requested");
        self.profile.calibrated = false;
        self.calibrator = None;
        self.retry_in = None;
        self.dirty = true;
        if let Err(e) = self.flush() {
            log::error!("[engine] failed to persist recalibration request: {}", e);
        }
    }

    /// Write pending changes now, regardless of the coalescing interval.
    pub fn flush(&mut self) -> CalibrationResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.store.save(&self.profile)?;
        self.dirty = false;
        self.since_save = Duration::ZERO;
        Ok(())
    }

    pub fn tick(
        &mut self,
        dt: Duration,
        sample: Option<RawSample>,
        surface: &mut dyn MarkerSurface,
    ) -> Frame {
        self.since_save = self.since_save.saturating_add(dt);

        if self.calibrator.is_none() && self.should_start_calibration(dt) {
            self.start_calibration();
        }

        let frame = match self.calibrator.as_mut() {
            Some(cal) => {
                let progress = cal.advance(dt, sample, surface);
                self.finish_calibration(progress, surface)
            }
            None => self.track(dt, sample),
        };

        if self.dirty && self.since_save >= self.settings.save_interval {
            if let Err(e) = self.flush() {
                log::error!("[engine] failed to save profile: {}", e);
                // try again after another full interval
                self.since_save = Duration::ZERO;
            }
        }
        frame
    }

    fn should_start_calibration(&mut self, dt: Duration) -> bool {
        if !self.profile.needs_calibration() {
            return false;
        }
        match self.retry_in {
            None => true,
            Some(left) if left <= dt => {
                self.retry_in = None;
                true
            }
            Some(left) => {
                self.retry_in = Some(left - dt);
                false
            }
        }
    }

    fn start_calibration(&mut self) {
        let kind = self.settings.calibrator;
        log::info!("[engine] starting {} calibration", kind);
        self.mapper.release();
        self.swipe.update(None);
        self.reset_hold();
        self.calibrator = Some(kind.build(&self.settings.calibration, &self.profile));
    }

    fn finish_calibration(&mut self, progress: Progress, surface: &mut dyn MarkerSurface) -> Frame {
        match progress {
            Progress::Pending => Frame::Calibrating,
            Progress::Done(profile) => {
                self.calibrator = None;
                self.profile = profile;
                self.refresh_active();
                self.mapper.release();
                self.dirty = true;
                if let Err(e) = self.flush() {
                    log::error!("[engine] calibrated profile not saved: {}", e);
                }
                log::info!("[engine] calibration complete: {}", self.profile.orientation());
                surface.show_status("ok");
                Frame::Calibrated
            }
            Progress::Failed(e) => {
                self.calibrator = None;
                log::warn!("[engine] calibration failed: {}", e);
                surface.show_status("failed");
                if self.profile.needs_calibration() {
                    log::info!(
                        "[engine] retrying in {:.1}s",
                        self.settings.retry_delay.as_secs_f64()
                    );
                    self.retry_in = Some(self.settings.retry_delay);
                }
                Frame::CalibrationFailed(e)
            }
        }
    }

    fn track(&mut self, dt: Duration, sample: Option<RawSample>) -> Frame {
        let Some(raw) = sample.filter(|s| s.touching) else {
            self.mapper.release();
            self.swipe.update(None);
            self.reset_hold();
            return Frame::Idle;
        };

        self.expander.observe(raw, &mut self.profile);
        if self.expander.take_dirty() {
            self.dirty = true;
            self.refresh_active();
        }

        let point = self.mapper.map(raw, &self.active);
        let swipe = self.swipe.update(Some(point));
        if let Some(dir) = swipe {
            log::debug!("[engine] swipe {}", dir);
        }

        if self.long_press(dt, point) {
            self.request_recalibration();
            return Frame::RecalibrationRequested;
        }
        Frame::Touch { point, swipe }
    }

    fn long_press(&mut self, dt: Duration, point: ScreenPoint) -> bool {
        let zone = self.settings.long_press_zone;
        if point.x >= zone || point.y >= zone {
            self.reset_hold();
            return false;
        }
        self.held = self.held.saturating_add(dt);
        if self.hold_fired || self.held < self.settings.long_press {
            return false;
        }
        self.hold_fired = true;
        log::info!("[engine] long press in top-left corner");
        true
    }

    fn refresh_active(&mut self) {
        self.active = self.overrides.apply(&self.profile);
    }

    fn reset_hold(&mut self) {
        self.held = Duration::ZERO;
        self.hold_fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::corner_targets;
    use crate::calibration::test_support::{synth_raw, RecordingSurface, TICK};
    use crate::orientation::Orientation;
    use tempfile::TempDir;

    const SCREEN: (u32, u32) = (240, 280);

    fn settings() -> EngineSettings {
        EngineSettings {
            calibration: CalibrationSettings {
                screen: SCREEN,
                samples_per_corner: 3,
                step_timeout: Duration::from_millis(200),
                ..Default::default()
            },
            retry_delay: Duration::from_millis(500),
            ..Default::default()
        }
    }

    /// Profile matching what `synth_raw` produces for the identity orientation.
    fn calibrated_profile() -> CalibrationProfile {
        let mut p = CalibrationProfile::default();
        p.set_orientation(Orientation::IDENTITY);
        p.raw_x_min = 600;
        p.raw_x_max = 3400;
        p.raw_y_min = 500;
        p.raw_y_max = 3500;
        p.smoothing_alpha = 1.0;
        p.calibrated = true;
        p
    }

    fn engine(dir: &TempDir, profile: CalibrationProfile) -> TouchEngine {
        let store = CalibrationStore::new(dir.path().join("profile.toml"));
        TouchEngine::with_profile(settings(), store, profile)
    }

    fn touch(engine: &mut TouchEngine, surface: &mut RecordingSurface, x: f64, y: f64, o: Orientation) -> Frame {
        engine.tick(TICK, Some(synth_raw(o, x, y, SCREEN)), surface)
    }

    #[test]
    fn uncalibrated_profile_runs_calibrator_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, CalibrationProfile::default());
        let mut surface = RecordingSurface::default();
        let o = Orientation::new(true, true, false);

        let mut last = Frame::Idle;
        for t in corner_targets(SCREEN, 20) {
            for _ in 0..3 {
                last = touch(&mut engine, &mut surface, t.x as f64, t.y as f64, o);
            }
            if !matches!(last, Frame::Calibrated) {
                last = engine.tick(TICK, None, &mut surface);
            }
        }
        assert!(matches!(last, Frame::Calibrated), "{:?}", last);
        assert!(!engine.is_calibrating());
        assert_eq!(engine.profile().orientation(), o);
        assert_eq!(surface.statuses, vec!["ok".to_string()]);

        let stored = engine.store().load();
        assert!(stored.calibrated);
        assert_eq!(stored.orientation(), o);
    }

    #[test]
    fn failure_keeps_profile_and_retries_later() {
        let dir = TempDir::new().unwrap();
        let before = CalibrationProfile::default();
        let mut engine = engine(&dir, before.clone());
        let mut surface = RecordingSurface::default();

        let mut failed = false;
        for _ in 0..20 {
            if let Frame::CalibrationFailed(e) = engine.tick(TICK, None, &mut surface) {
                assert_eq!(e.short_label(), "timeout");
                failed = true;
                break;
            }
        }
        assert!(failed);
        assert_eq!(engine.profile(), &before);
        assert_eq!(surface.statuses, vec!["failed".to_string()]);

        // during the retry delay touches are tracked with the old profile
        assert!(matches!(
            touch(&mut engine, &mut surface, 120.0, 140.0, Orientation::IDENTITY),
            Frame::Touch { .. }
        ));
        let mut restarted = false;
        for _ in 0..20 {
            if matches!(engine.tick(TICK, None, &mut surface), Frame::Calibrating) {
                restarted = true;
                break;
            }
        }
        assert!(restarted);
    }

    #[test]
    fn calibrated_profile_maps_touches() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, calibrated_profile());
        let mut surface = RecordingSurface::default();

        match touch(&mut engine, &mut surface, 120.0, 140.0, Orientation::IDENTITY) {
            Frame::Touch { point, swipe } => {
                assert!((point.x - 120).abs() <= 1 && (point.y - 140).abs() <= 1, "{:?}", point);
                assert_eq!(swipe, None);
            }
            other => panic!("expected Touch, got {:?}", other),
        }
        match touch(&mut engine, &mut surface, 170.0, 142.0, Orientation::IDENTITY) {
            Frame::Touch { swipe, .. } => assert_eq!(swipe, Some(SwipeDirection::Right)),
            other => panic!("expected Touch, got {:?}", other),
        }
        assert!(matches!(engine.tick(TICK, None, &mut surface), Frame::Idle));
        assert!(!engine.is_calibrating());
    }

    #[test]
    fn adaptive_changes_are_saved_after_interval() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, calibrated_profile());
        let mut surface = RecordingSurface::default();

        engine.tick(TICK, Some(RawSample::touching(3398, 2000)), &mut surface);
        assert!(engine.has_unsaved_changes());
        assert_eq!(engine.profile().raw_x_max, 3424);
        assert!(engine.store().try_load().unwrap().is_none());

        let interval = engine.settings.save_interval;
        engine.tick(interval, None, &mut surface);
        assert!(!engine.has_unsaved_changes());
        assert_eq!(engine.store().load().raw_x_max, 3424);
    }

    #[test]
    fn long_press_top_left_requests_recalibration() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, calibrated_profile());
        let mut surface = RecordingSurface::default();
        let corner = synth_raw(Orientation::IDENTITY, 5.0, 5.0, SCREEN);

        let hold = engine.settings.long_press;
        let ticks = (hold.as_millis() / TICK.as_millis()) as usize + 1;
        let mut fired = false;
        for _ in 0..ticks {
            if matches!(engine.tick(TICK, Some(corner), &mut surface), Frame::RecalibrationRequested) {
                fired = true;
                break;
            }
        }
        assert!(fired);
        assert!(!engine.profile().calibrated);
        assert!(!engine.store().load().calibrated);
        assert!(matches!(engine.tick(TICK, None, &mut surface), Frame::Calibrating));
    }

    #[test]
    fn request_recalibration_starts_immediately() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir, calibrated_profile());
        let mut surface = RecordingSurface::default();
        engine.request_recalibration();
        assert!(matches!(engine.tick(TICK, None, &mut surface), Frame::Calibrating));
        assert_eq!(surface.frames.len(), 1);
    }

    #[test]
    fn overrides_map_touches_but_are_not_saved() {
        let dir = TempDir::new().unwrap();
        let mut stored = calibrated_profile();
        stored.set_orientation(Orientation::new(true, false, false));
        stored.smoothing_alpha = 0.5;
        let mut engine = engine(&dir, stored.clone()).with_overrides(ProfileOverrides {
            orientation: Some(Orientation::IDENTITY),
            smoothing_alpha: Some(1.0),
        });
        let mut surface = RecordingSurface::default();

        match touch(&mut engine, &mut surface, 60.0, 200.0, Orientation::IDENTITY) {
            Frame::Touch { point, .. } => {
                assert!((point.x - 60).abs() <= 1 && (point.y - 200).abs() <= 1, "{:?}", point);
            }
            other => panic!("expected Touch, got {:?}", other),
        }

        // an edge touch widens the range and triggers a coalesced save
        engine.tick(TICK, Some(RawSample::touching(3398, 2000)), &mut surface);
        assert!(engine.has_unsaved_changes());
        assert_eq!(engine.active_profile().raw_x_max, 3424);
        let interval = engine.settings.save_interval;
        engine.tick(interval, None, &mut surface);
        assert!(!engine.has_unsaved_changes());

        let saved = engine.store().load();
        assert_eq!(saved.raw_x_max, 3424);
        assert_eq!(saved.orientation(), stored.orientation());
        assert_eq!(saved.smoothing_alpha, 0.5);
        assert_eq!(engine.profile().orientation(), stored.orientation());
        assert_eq!(engine.active_profile().orientation(), Orientation::IDENTITY);
    }
}
