//! Application entry point: LUFS normalizer.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line (usage errors exit with status 5).
//! 3. Load [`AppConfig`] from `--config` or the platform settings file
//!    (defaults on first run or when unreadable).
//! 4. Choose the run mode; batch jobs are validated before anything runs.
//! 5. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 6. Either run the batch on the runtime, or hand a runtime handle to the
//!    desktop form and block in [`eframe::run_native`] until it closes.

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;
use lufs_normalizer::{
    app::NormalizerApp,
    cli::{Cli, RunMode},
    config::{AppConfig, AppPaths},
    engine::Toolchain,
    normalize::{
        run_batch, BatchEvent, BatchJob, FailurePolicy, NormalizeError, NormalizeSettings,
        Normalizer,
    },
    session::Session,
};

// ---------------------------------------------------------------------------
// Batch mode
// ---------------------------------------------------------------------------

/// Prints per-unit results and logs progress in 10 % steps.
#[derive(Default)]
struct CliReporter {
    last_decile: Option<u32>,
}

impl CliReporter {
    fn handle(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::UnitStarted { .. } => self.last_decile = None,
            BatchEvent::Progress { index, fraction } => {
                let decile = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u32;
                if self.last_decile != Some(decile) {
                    self.last_decile = Some(decile);
                    log::info!("batch: file {} at {}%", index + 1, decile * 10);
                }
            }
            BatchEvent::UnitFinished { input, output, .. } => {
                let name = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| input.display().to_string());
                println!("OK: {name} -> {}", output.display());
            }
            BatchEvent::UnitFailed { .. } | BatchEvent::BatchFinished(_) => {}
        }
    }
}

async fn run_cli(job: &BatchJob, config: &AppConfig) -> Result<(), NormalizeError> {
    let tools = Toolchain::discover(&config.tools)?;
    let normalizer = Normalizer::new(tools);

    let mut reporter = CliReporter::default();
    run_batch(&normalizer, job, FailurePolicy::AbortOnError, |event| {
        reporter.handle(event)
    })
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Desktop form
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("14 LUFS Normalizer (FFmpeg loudnorm)")
        .with_inner_size([width, height])
        .with_min_inner_size([480.0, 420.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

fn run_gui(
    runtime: tokio::runtime::Handle,
    prefill: NormalizeSettings,
    config: AppConfig,
    config_path: PathBuf,
) -> Result<(), NormalizeError> {
    let session = Session::new(&prefill, config.ui.last_dir.clone());
    let options = native_options(&config);
    let app = NormalizerApp::new(session, config, config_path, runtime);

    eframe::run_native(
        "lufs-normalizer",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| NormalizeError::GuiUnavailable(e.to_string()))
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn run(cli: Cli, config: AppConfig, config_path: PathBuf) -> Result<(), NormalizeError> {
    let mode = cli.plan(&config)?;

    // 2 workers: the batch (or the form's worker thread) plus probe tasks.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    match mode {
        RunMode::Gui { prefill } => run_gui(rt.handle().clone(), prefill, config, config_path),
        RunMode::Batch(job) => rt.block_on(run_cli(&job, &config)),
    }
}

fn report(err: &NormalizeError) -> i32 {
    eprintln!("Error: {err}");
    if let Some(tail) = err.stderr_tail() {
        eprintln!("{tail}");
    }
    err.exit_code()
}

fn main() {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line; help and version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(NormalizeError::Usage(e.to_string()).exit_code());
        }
    };

    // 3. Configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);
    let config = AppConfig::load_from(&config_path).unwrap_or_else(|e| {
        log::warn!("Failed to load config {} ({e}); using defaults", config_path.display());
        AppConfig::default()
    });

    // 4-6.
    let code = match run(cli, config, config_path) {
        Ok(()) => 0,
        Err(e) => report(&e),
    };
    std::process::exit(code);
}
