use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use linux_embedded_hal::I2cdev;

use touchcal::calibration::LogSurface;
use touchcal::config::{Cli, Command, Config};
use touchcal::dump;
use touchcal::engine::{Frame, TouchEngine};
use touchcal::profile::{CalibrationProfile, ProfileOverrides};
use touchcal::sample::{Cst816Source, RawSampleSource};
use touchcal::store::CalibrationStore;
use touchcal::transport::probe_buses;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Some(Command::Dump { .. }) => "warn",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = Config::load(&cli);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let store = CalibrationStore::new(config.profile_path.clone());

    match cli.command.unwrap_or(Command::Run) {
        Command::Show => show(&store),
        Command::Reset => {
            store.reset()?;
            println!("Profile at {} reset to defaults", store.path().display());
            Ok(())
        }
        Command::Dump { count } => {
            let mut source = open_source(&config)?;
            let profile = overrides(&config).apply(&store.load());
            eprintln!("Dumping raw samples (Ctrl+C to stop):\n");
            dump::run_dump(
                &mut source,
                &profile,
                config.panel.screen(),
                config.frame_time(),
                count,
                &mut std::io::stdout().lock(),
            )
        }
        Command::Calibrate => calibrate(&config, store),
        Command::Run => run(&config, store),
    }
}

fn show(store: &CalibrationStore) -> Result<(), BoxError> {
    match store.try_load()? {
        Some(profile) => {
            println!("# {}", store.path().display());
            print!("{}", toml::to_string_pretty(&profile)?);
        }
        None => {
            println!("# no profile at {}, defaults:", store.path().display());
            print!("{}", toml::to_string_pretty(&CalibrationProfile::default())?);
        }
    }
    Ok(())
}

fn open_source(config: &Config) -> Result<Cst816Source<I2cdev>, BoxError> {
    let found = probe_buses(&config.buses(), config.address)?;
    log::info!(
        "[touch] {} on i2c-{} at 0x{:02X}",
        config.panel.name,
        found.bus,
        config.address
    );
    Ok(Cst816Source::new(found.i2c, config.address))
}

fn overrides(config: &Config) -> ProfileOverrides {
    ProfileOverrides {
        orientation: config.orientation,
        smoothing_alpha: config.smoothing,
    }
}

fn start_engine(config: &Config, store: CalibrationStore) -> TouchEngine {
    TouchEngine::new(config.engine.clone(), store).with_overrides(overrides(config))
}

fn calibrate(config: &Config, store: CalibrationStore) -> Result<(), BoxError> {
    let mut source = open_source(config)?;
    let mut engine = start_engine(config, store);
    let mut surface = LogSurface::default();
    engine.request_recalibration();

    let frame = config.frame_time();
    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        let dt = now - last;
        last = now;

        match engine.tick(dt, source.poll(), &mut surface) {
            Frame::Calibrated => {
                engine.flush()?;
                println!("Calibration saved to {}", engine.store().path().display());
                return Ok(());
            }
            Frame::CalibrationFailed(e) => return Err(e.into()),
            _ => {}
        }
        pace(now, frame);
    }
}

fn run(config: &Config, store: CalibrationStore) -> Result<(), BoxError> {
    let mut source = loop {
        match open_source(config) {
            Ok(s) => break s,
            Err(e) => {
                log::error!("[touch] {}", e);
                log::warn!("[touch] controller not found, retrying in 2s…");
                thread::sleep(RECONNECT_DELAY);
            }
        }
    };

    let mut engine = start_engine(config, store);
    let mut surface = LogSurface::default();
    log::info!("[touch] polling at {} Hz", config.poll_hz);

    let frame = config.frame_time();
    let mut last = Instant::now();
    let mut frames: u64 = 0;
    loop {
        let now = Instant::now();
        let dt = now - last;
        last = now;

        match engine.tick(dt, source.poll(), &mut surface) {
            Frame::Touch { point, swipe } => {
                log::debug!("[touch] ({}, {})", point.x, point.y);
                if let Some(dir) = swipe {
                    log::info!("[touch] swipe {} at ({}, {})", dir, point.x, point.y);
                }
            }
            Frame::CalibrationFailed(e) => {
                log::warn!("[touch] calibration failed ({}), keeping previous profile", e.short_label());
            }
            Frame::Calibrated => {
                let p = engine.active_profile();
                log::info!("[touch] now using {} (affine={})", p.orientation(), p.affine.is_some());
            }
            Frame::Idle | Frame::Calibrating | Frame::RecalibrationRequested => {}
        }

        frames += 1;
        if frames % 900 == 0 {
            log::debug!(
                "[touch] frames: {}, read errors: {}",
                frames,
                source.error_count()
            );
        }
        pace(now, frame);
    }
}

/// Sleep for whatever is left of this frame.
fn pace(frame_start: Instant, frame: Duration) {
    let spent = frame_start.elapsed();
    if spent < frame {
        thread::sleep(frame - spent);
    }
}
