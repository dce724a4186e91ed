mod capture;
mod compose;
mod control;
mod output;
mod render;
mod segmentation;
mod state;

use anyhow::{Context, Result};
use capture::{CaptureSource, WebcamCapture};
use clap::Parser;
use compose::Mode;
use output::{OutputSink, V4L2Output};
use render::{Backgrounds, Renderer, TickOutcome};
use segmentation::{InternalResolution, SegmentationWorker};
use state::{ModelStatus, SharedState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Output (viewport) width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output (viewport) height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to segmentation model (ONNX file)
    #[arg(long)]
    model: PathBuf,

    /// Model input resolution relative to the 640x480 camera grid
    #[arg(long, value_enum, default_value_t = InternalResolution::Medium)]
    internal_resolution: InternalResolution,

    /// Matte score above which a pixel counts as person
    #[arg(long, default_value_t = 0.6)]
    threshold: f32,

    /// Background shown inside the body in swap mode
    #[arg(long)]
    swap_background: PathBuf,

    /// Background shown around the body in scene mode
    #[arg(long)]
    scene_background: PathBuf,

    /// Backdrop the person is staged on in summit mode
    #[arg(long)]
    summit_background: PathBuf,

    /// Mode at startup; switch at runtime by typing swap, scene or summit
    #[arg(long, value_enum, default_value_t = Mode::Summit)]
    mode: Mode,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Summit swap starting");
    tracing::info!("Viewport: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", args.fps);
    tracing::info!("Initial mode: {}", args.mode.as_str());

    let backgrounds = Backgrounds::load(&args.swap_background, &args.scene_background, &args.summit_background)
        .context("Failed to load background images")?;

    // Initialize capture
    let mut capture = WebcamCapture::new(args.input_device).context("Failed to initialize webcam capture")?;

    // Initialize output
    let mut output = V4L2Output::new(&args.output_device, args.output_width, args.output_height)
        .context("Failed to initialize v4l2loopback output")?;

    let state = SharedState::new(args.mode, (args.output_width, args.output_height));

    // Model loads on the worker thread; the display runs meanwhile
    let model_path = args.model.clone();
    let (resolution, threshold) = (args.internal_resolution, args.threshold);
    let mut worker = SegmentationWorker::spawn(Arc::clone(&state), move || {
        segmentation::create_default_model(&model_path, resolution, threshold)
    })?;

    control::spawn_stdin(Arc::clone(&state))?;
    tracing::info!("Type swap, scene, summit or 'viewport WxH' to control the output");

    let result = run_pipeline(&mut capture, &mut output, &worker, &state, Renderer::new(backgrounds), args.fps);
    worker.stop();
    result
}

fn run_pipeline<C, O>(
    capture: &mut C,
    output: &mut O,
    worker: &SegmentationWorker,
    state: &SharedState,
    mut renderer: Renderer,
    target_fps: u32,
) -> Result<()>
where
    C: CaptureSource,
    O: OutputSink,
{
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut frame_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_render_time = Duration::ZERO;
    let mut total_output_time = Duration::ZERO;
    let mut last_status = ModelStatus::Loading;

    let (capture_width, capture_height) = capture.resolution();
    let (output_width, output_height) = output.resolution();
    tracing::info!(
        "Starting display loop: {}x{} camera -> {}x{} output",
        capture_width,
        capture_height,
        output_width,
        output_height
    );
    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        // Capture frame
        let capture_start = Instant::now();
        let frame = Arc::new(capture.capture_frame().context("Failed to capture frame")?);
        total_capture_time += capture_start.elapsed();

        worker.offer(Arc::clone(&frame));

        // One snapshot per tick
        let snapshot = state.snapshot();
        if snapshot.status != last_status {
            match snapshot.status {
                ModelStatus::Ready => tracing::info!("Segmentation model ready"),
                ModelStatus::Unavailable => {
                    tracing::error!("Segmentation model unavailable, segmentation modes disabled")
                }
                ModelStatus::Loading => {}
            }
            last_status = snapshot.status;
        }

        let render_start = Instant::now();
        let outcome = renderer.render(&frame, &snapshot).context("Failed to composite frame")?;
        total_render_time += render_start.elapsed();

        // Output frame
        let output_start = Instant::now();
        output
            .write_frame(renderer.canvas())
            .context("Failed to write frame")?;
        total_output_time += output_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_render_ms = total_render_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_render_ms + avg_output_ms;
            let actual_fps = 1000.0 / total_ms;

            tracing::info!(
                "Frame {} [{}]: capture={:.1}ms, render={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
                frame_count,
                describe(outcome),
                avg_capture_ms,
                avg_render_ms,
                avg_output_ms,
                total_ms,
                actual_fps
            );
            if !worker.is_running() && last_status == ModelStatus::Ready {
                tracing::warn!("Segmentation loop has exited; masks will no longer update");
            }
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}

fn describe(outcome: TickOutcome) -> &'static str {
    match outcome {
        TickOutcome::Waiting => "waiting for model",
        TickOutcome::Flat { fresh: true } => "composite",
        TickOutcome::Flat { fresh: false } => "composite (stale)",
        TickOutcome::Summit { person: true } => "summit",
        TickOutcome::Summit { person: false } => "summit (backdrop only)",
    }
}
