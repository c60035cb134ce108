//! Simulated frame loop against a background worker.

use crate::demo::DemoEngine;
use clap::Args;
use ponder_audio::{
    AudioBackend, AudioBridge, AudioClock, AudioParams, BackendStreamConfig, CpalBackend,
    SampleBank, SoundBank, StreamHandle,
};
use ponder_config::Settings;
use ponder_offload::{
    BudgetFactory, FrameInput, ProducerCoordinator, UnitImage, WorkerScheduler, link, spawn_worker,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct RunArgs {
    /// Config file (defaults to the user config, if any)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run; 0 runs until Ctrl+C
    #[arg(long)]
    frames: Option<u64>,

    /// Frames per second
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Frames between player moves
    #[arg(long)]
    move_interval: Option<u64>,

    /// Search budget of the reference unit in milliseconds
    #[arg(long)]
    budget_ms: Option<f64>,

    /// Disable audio output
    #[arg(long)]
    no_audio: bool,
}

impl RunArgs {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::load_or_default()?,
        };

        if let Some(frames) = self.frames {
            settings.producer.frames = frames;
        }
        if let Some(rate) = self.frame_rate {
            settings.producer.frame_rate = rate;
        }
        if let Some(interval) = self.move_interval {
            settings.producer.move_interval = interval;
        }
        if let Some(budget) = self.budget_ms {
            settings.worker.budget_ms = budget;
        }
        if self.no_audio {
            settings.audio.enabled = false;
        }

        settings.validate()?;
        Ok(settings)
    }
}

/// Open the output stream. Failure leaves the run silent, never aborts it.
fn start_audio(
    settings: &Settings,
    params: &Arc<AudioParams>,
    clock: &Arc<AudioClock>,
) -> Option<StreamHandle> {
    let audio = &settings.audio;
    if !audio.enabled {
        return None;
    }

    let bank = match &audio.sounds_dir {
        Some(dir) => match SoundBank::load_dir(dir, audio.sample_rate) {
            Ok(bank) => bank,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to load sounds; using built-in tones");
                SoundBank::synthesized(audio.sample_rate)
            }
        },
        None => SoundBank::synthesized(audio.sample_rate),
    };

    let mut bridge = AudioBridge::new(Arc::clone(params), Arc::clone(clock))
        .with_unit(Box::new(SampleBank::new(bank)));

    let config = BackendStreamConfig {
        sample_rate: audio.sample_rate,
        buffer_size: audio.buffer_size,
        channels: 2,
        device_name: audio.device.clone(),
    };

    let backend = CpalBackend::new();
    let stream = backend.build_output_stream(
        &config,
        Box::new(move |data| bridge.process_interleaved(data, 2)),
        Box::new(|message| tracing::warn!(%message, "audio stream error")),
    );

    match stream {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "audio unavailable; continuing without sound");
            None
        }
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let settings = args.settings()?;
    let producer = &settings.producer;

    let image = UnitImage {
        budget_ms: settings.worker.budget_ms,
        memory_bytes: settings.worker.memory_bytes,
    }
    .to_bytes()?;

    let (producer_link, worker_link) = link();
    let worker = spawn_worker(WorkerScheduler::new(BudgetFactory), worker_link)?;
    let stats = worker.stats();

    let params = Arc::new(AudioParams::new());
    let clock = Arc::new(AudioClock::new());
    let stream = start_audio(&settings, &params, &clock);

    println!("ponder run");
    println!("  Frame rate: {} fps", producer.frame_rate);
    match producer.frames {
        0 => println!("  Frames: until Ctrl+C"),
        n => println!("  Frames: {n}"),
    }
    println!("  Move interval: {} frames", producer.move_interval);
    println!("  Search budget: {} ms", settings.worker.budget_ms);
    let audio_on = stream.is_some();
    println!("  Audio: {}", if audio_on { "on" } else { "off" });
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut coordinator =
        ProducerCoordinator::new(DemoEngine::new(producer.move_interval), producer_link);
    coordinator.send_init(image);

    let period = Duration::from_secs_f64(settings.frame_period_secs());
    let start = Instant::now();
    let mut frame = 0u64;

    while running.load(Ordering::SeqCst) && (producer.frames == 0 || frame < producer.frames) {
        let input = FrameInput {
            frame,
            now_ms: start.elapsed().as_secs_f64() * 1000.0,
            audio_position: clock.position(),
        };
        let report = coordinator.frame(&input);
        params.publish_raw(report.sound.sound, report.sound.started_at);

        if report.responses > 0 {
            println!(
                "[frame {frame:>6}] engine replied ({} total)",
                coordinator.engine().engine_moves()
            );
        }
        if let Some(id) = report.request {
            tracing::debug!(frame, %id, "player moved");
        }

        frame += 1;
        let deadline = start + period.mul_f64(frame as f64);
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    let requests = coordinator.requests_issued();
    let responses = coordinator.responses_applied();
    let player_moves = coordinator.engine().player_moves();
    let engine_moves = coordinator.engine().engine_moves();
    drop(coordinator);
    worker.join();
    drop(stream);

    println!();
    println!("Summary");
    println!("  Frames:            {frame}");
    println!("  Player moves:      {player_moves}");
    println!("  Engine moves:      {engine_moves}");
    println!("  Requests issued:   {requests}");
    println!("  Responses applied: {responses}");
    println!(
        "  Worker searches:   {} completed, {} cancelled, {} rejected",
        stats.completed(),
        stats.cancelled(),
        stats.rejected()
    );
    if audio_on {
        println!(
            "  Audio rendered:    {:.2}s",
            clock.seconds(settings.audio.sample_rate)
        );
    }
    println!("Done!");
    Ok(())
}
