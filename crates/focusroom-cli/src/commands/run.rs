use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use focusroom_core::playback::AudioEvent;
use focusroom_core::{
    AudioBackend, Config, Database, ManualClock, MemoryBackend, SessionController, SessionLog,
    ValidationError,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{engine, print_json, session_sound, task_selection};

#[derive(Args)]
pub struct RunArgs {
    /// Focus length in minutes (1-180); defaults to the configured length
    #[arg(long)]
    minutes: Option<u32>,
    /// JSON file with task candidates
    #[arg(long)]
    tasks: Option<PathBuf>,
    /// Use the first task as given instead of ranking
    #[arg(long)]
    manual: bool,
    /// Sound category to play during the session
    #[arg(long)]
    sound: Option<String>,
    /// Simulated seconds per real second
    #[arg(long, default_value = "1")]
    speed: f64,
    /// Use simulated playback even when an audio device is available
    #[arg(long)]
    simulate: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(args.speed.is_finite() && args.speed > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "--speed".into(),
            message: format!("must be a positive number (got {})", args.speed),
        }
        .into());
    }
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    #[cfg(feature = "device")]
    if !args.simulate {
        match focusroom_core::DeviceBackend::open() {
            Ok(backend) => {
                if args.speed != 1.0 {
                    warn!(speed = args.speed, "audio plays in real time regardless of --speed");
                }
                let engine = engine(backend, &config)?;
                return runtime.block_on(run_session(args, config, engine, |b| b.poll_finished()));
            }
            Err(e) => warn!(error = %e, "no audio output; using simulated playback"),
        }
    }
    #[cfg(not(feature = "device"))]
    let _ = args.simulate;

    let engine = engine(MemoryBackend::new(), &config)?;
    runtime.block_on(run_session(args, config, engine, |b| {
        b.advance(Duration::from_secs(1))
    }))
}

/// One session in the foreground: a 1 Hz heartbeat on a simulated clock.
/// `finished` collects the backend's completion notices once per tick.
async fn run_session<B: AudioBackend>(
    args: RunArgs,
    config: Config,
    engine: focusroom_core::PlaybackEngine<B>,
    finished: impl Fn(&B) -> Vec<AudioEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let log = SessionLog::new(&db, config.session.min_recorded_minutes);
    let minutes = args.minutes.unwrap_or(config.session.default_minutes);
    let selection = task_selection(&config, args.tasks.as_deref(), args.manual)?;
    let sound = session_sound(&config, args.sound.as_deref())?;

    let (audio_tx, audio_rx) = mpsc::unbounded_channel();
    let pump = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_events(audio_rx).await })
    };

    let clock = ManualClock::new(Utc::now());
    let mut ctl =
        SessionController::new(Arc::new(clock.clone()), Arc::new(engine.clone())).with_sound(sound);

    ctl.enter_scope();
    print_json(&ctl.start(minutes, &selection)?)?;

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / args.speed));
    ticker.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut now_playing: Option<String> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                clock.advance_secs(1);
                for event in finished(engine.backend()) {
                    let _ = audio_tx.send(event);
                }
                if let Some(event) = ctl.tick() {
                    print_json(&event)?;
                }

                let track = ctl.view().current_track.map(|t| t.display_name);
                if track != now_playing {
                    if let Some(name) = &track {
                        info!(track = %name, remaining = ctl.remaining_seconds(), "now playing");
                    }
                    now_playing = track;
                }
                if !ctl.session().is_some_and(|s| s.is_running()) {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                if let Some(event) = ctl.user_cancel() {
                    print_json(&event)?;
                }
                break;
            }
        }
    }

    ctl.exit_scope();
    if let Some(event) = ctl.report(&log) {
        print_json(&event)?;
    }

    engine.stop().await;
    drop(audio_tx);
    join_pump(pump).await;
    Ok(())
}

/// Wait for the event pump to drain. Returns `false` if it panicked or was
/// cancelled.
async fn join_pump(pump: JoinHandle<()>) -> bool {
    match pump.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "audio event pump failed");
            false
        }
    }
}
