use std::time::Duration;

use clap::Subcommand;
use focusroom_core::{
    AudioBackend, Config, MemoryBackend, PlaybackEngine, PreviewStart, SoundCategory,
};

use super::{catalog, engine, parse_category, print_json};

#[derive(Subcommand)]
pub enum SoundAction {
    /// List the tracks of a category in playlist order
    List {
        /// Category name, e.g. "Lo-Fi" or "nature"
        category: String,
    },
    /// Play the first track of a category for the preview window
    Preview {
        /// Category name, e.g. "Lo-Fi" or "nature"
        category: String,
        /// Use simulated playback even when an audio device is available
        #[arg(long)]
        simulate: bool,
    },
}

pub fn run(action: SoundAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match action {
        SoundAction::List { category } => {
            let category = parse_category(&category)?;
            print_json(&catalog(&config)?.resolve_tracks(category))?;
        }
        SoundAction::Preview { category, simulate } => {
            let category = parse_category(&category)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;

            #[cfg(feature = "device")]
            if !simulate {
                match focusroom_core::DeviceBackend::open() {
                    Ok(backend) => {
                        let engine = engine(backend, &config)?;
                        return runtime.block_on(preview(&engine, category));
                    }
                    Err(e) => tracing::warn!(error = %e, "no audio output; using simulated playback"),
                }
            }
            #[cfg(not(feature = "device"))]
            let _ = simulate;

            let engine = engine(MemoryBackend::new(), &config)?;
            runtime.block_on(preview(&engine, category))?;
        }
    }

    Ok(())
}

async fn preview<B: AudioBackend>(
    engine: &PlaybackEngine<B>,
    category: SoundCategory,
) -> Result<(), Box<dyn std::error::Error>> {
    match engine.preview_track(category).await {
        PreviewStart::Playing(track) => {
            eprintln!("Previewing {}", track.display_name);
            print_json(&engine.snapshot())?;
        }
        PreviewStart::NoTracks => return Err(format!("no tracks for {category}").into()),
        other => return Err(format!("preview not available: {other:?}").into()),
    }
    // The preview stops itself once its window has passed.
    while engine.snapshot().is_preview_mode {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    print_json(&engine.snapshot())
}
