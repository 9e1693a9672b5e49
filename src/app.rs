//! Desktop form: egui/eframe application.
//!
//! # Architecture
//!
//! [`NormalizerApp`] is the top-level [`eframe::App`]. It owns the
//! [`Session`] and one channel pair:
//!
//! * `tx`: cloned into the `normalize-worker` thread and into bitrate
//!   probe tasks.
//! * `rx`: drained every frame; each [`UiMessage`] is applied to the
//!   session.
//!
//! ```text
//!  UI thread                       normalize-worker thread
//!  ─────────                       ───────────────────────
//!  Run ─▶ Session::build_job ─▶    runtime.block_on(run_batch(..))
//!                                        │ BatchEvent
//!  update() ◀── try_recv ◀── tx ◀────────┘
//! ```
//!
//! The UI thread never launches ffmpeg itself.

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::engine::{probe_bitrate, ChannelLayout, Toolchain};
use crate::normalize::{run_batch, BatchEvent, FailurePolicy, Normalizer};
use crate::session::{FileProgress, Session, UiMessage};

// ---------------------------------------------------------------------------
// NormalizerApp
// ---------------------------------------------------------------------------

pub struct NormalizerApp {
    session: Session,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
    /// Where `config` is written back on exit.
    config_path: PathBuf,

    // ── Background work ──────────────────────────────────────────────────
    runtime: tokio::runtime::Handle,
    tx: mpsc::UnboundedSender<UiMessage>,
    rx: mpsc::UnboundedReceiver<UiMessage>,
}

impl NormalizerApp {
    pub fn new(
        session: Session,
        config: AppConfig,
        config_path: PathBuf,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            config,
            config_path,
            runtime,
            tx,
            rx,
        }
    }

    /// Drain all pending worker messages (non-blocking).
    fn poll_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.session.apply(message);
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────

    fn add_files(&mut self, ctx: &egui::Context) {
        let Some(picked) = rfd::FileDialog::new()
            .set_title("Select audio files")
            .set_directory(&self.session.last_dir)
            .pick_files()
        else {
            return;
        };
        log::debug!("ui: {} file(s) picked", picked.len());

        if let Some(single) = self.session.add_files(picked) {
            self.spawn_bitrate_probe(single, ctx);
        }
    }

    /// Prefill the bitrate field from the source file, off the UI thread.
    fn spawn_bitrate_probe(&self, input: PathBuf, ctx: &egui::Context) {
        let tools = match Toolchain::discover(&self.config.tools) {
            Ok(tools) => tools,
            Err(e) => {
                log::debug!("ui: skipping bitrate probe: {e}");
                return;
            }
        };
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let bitrate = probe_bitrate(&tools, &input).await;
            let _ = tx.send(UiMessage::BitrateProbed(bitrate));
            ctx.request_repaint();
        });
    }

    fn browse_output(&mut self) {
        let Some(name) = self.session.suggested_output_name(&self.config.output) else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select output file")
            .set_directory(&self.session.last_dir)
            .set_file_name(name)
            .save_file()
        {
            self.session.set_output(&path);
        }
    }

    fn run(&mut self, ctx: &egui::Context) {
        let job = match self.session.build_job(&self.config.output) {
            Ok(job) => job,
            Err(e) => {
                show_error("Cannot start", &e.to_string());
                return;
            }
        };
        let tools = match Toolchain::discover(&self.config.tools) {
            Ok(tools) => tools,
            Err(e) => {
                show_error("FFmpeg missing", &e.to_string());
                return;
            }
        };

        self.session.start_run();
        log::info!("ui: starting batch of {} file(s)", job.inputs.len());

        let normalizer = Normalizer::new(tools);
        let runtime = self.runtime.clone();
        let tx = self.tx.clone();
        let ctx = ctx.clone();

        let spawned = std::thread::Builder::new()
            .name("normalize-worker".into())
            .spawn(move || {
                let emit = {
                    let tx = tx.clone();
                    let ctx = ctx.clone();
                    move |event: BatchEvent| {
                        let _ = tx.send(UiMessage::Batch(event));
                        ctx.request_repaint();
                    }
                };
                let result = runtime.block_on(run_batch(
                    &normalizer,
                    &job,
                    FailurePolicy::ContinueOnError,
                    emit,
                ));
                if let Err(e) = result {
                    let _ = tx.send(UiMessage::WorkerFailed(e.to_string()));
                    ctx.request_repaint();
                }
            });

        if let Err(e) = spawned {
            log::error!("ui: failed to spawn normalize-worker: {e}");
            self.session
                .apply(UiMessage::WorkerFailed(format!("could not start worker: {e}")));
        }
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_inputs(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let idle = !self.session.running;
        ui.group(|ui| {
            ui.label(egui::RichText::new("Input Files").strong());
            egui::ScrollArea::vertical()
                .id_salt("inputs")
                .max_height(110.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for path in &self.session.selected_files {
                        ui.label(path.display().to_string());
                    }
                });
            ui.horizontal(|ui| {
                if ui.add_enabled(idle, egui::Button::new("Add Files…")).clicked() {
                    self.add_files(ctx);
                }
                if ui.add_enabled(idle, egui::Button::new("Clear")).clicked() {
                    self.session.clear_files();
                }
            });
        });
    }

    fn draw_output(&mut self, ui: &mut egui::Ui) {
        let enabled = self.session.output_enabled() && !self.session.running;
        ui.group(|ui| {
            ui.label(egui::RichText::new("Output (single file only)").strong());
            ui.horizontal(|ui| {
                ui.add_enabled(
                    enabled,
                    egui::TextEdit::singleline(&mut self.session.output).desired_width(420.0),
                );
                if ui.add_enabled(enabled, egui::Button::new("Browse…")).clicked() {
                    self.browse_output();
                }
            });
        });
    }

    fn draw_parameters(&mut self, ui: &mut egui::Ui) {
        let idle = !self.session.running;
        ui.group(|ui| {
            ui.label(egui::RichText::new("Parameters").strong());
            ui.add_enabled_ui(idle, |ui| {
                egui::Grid::new("parameters")
                    .num_columns(4)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("I (LUFS)");
                        ui.add(egui::TextEdit::singleline(&mut self.session.integrated).desired_width(70.0));
                        ui.label("TP (dBTP)");
                        ui.add(egui::TextEdit::singleline(&mut self.session.true_peak).desired_width(70.0));
                        ui.end_row();

                        ui.label("LRA");
                        ui.add(egui::TextEdit::singleline(&mut self.session.range).desired_width(70.0));
                        ui.label("Bitrate");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.session.bitrate)
                                .hint_text("e.g. 192k")
                                .desired_width(70.0),
                        );
                        ui.end_row();
                    });

                ui.horizontal(|ui| {
                    ui.label("Channels");
                    ui.radio_value(&mut self.session.channels, None, "Keep");
                    ui.radio_value(&mut self.session.channels, Some(ChannelLayout::Mono), "Mono");
                    ui.radio_value(&mut self.session.channels, Some(ChannelLayout::Stereo), "Stereo");
                });
            });
        });
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.session.running, egui::Button::new("Run"))
                .clicked()
            {
                self.run(ctx);
            }
            if ui.button("Quit").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        let progress = self.session.progress;
        let bar = match progress {
            FileProgress::Idle => egui::ProgressBar::new(0.0),
            FileProgress::Indeterminate => egui::ProgressBar::new(0.0).animate(true),
            FileProgress::Fraction(f) => egui::ProgressBar::new(f.clamp(0.0, 1.0)),
        };
        ui.add(bar.text(progress.label()));
    }

    fn draw_log(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Log").strong());
        egui::ScrollArea::vertical()
            .id_salt("log")
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in self.session.log_lines() {
                    ui.label(egui::RichText::new(line).monospace());
                }
            });
    }
}

/// Blocking native message box, the form's only modal.
fn show_error(title: &str, message: &str) {
    log::warn!("ui: {title}: {message}");
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for NormalizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_messages();

        if self.session.running {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_inputs(ui, ctx);
            ui.add_space(4.0);
            self.draw_output(ui);
            ui.add_space(4.0);
            self.draw_parameters(ui);
            ui.add_space(6.0);
            self.draw_controls(ui, ctx);
            ui.separator();
            self.draw_log(ui);
        });
    }

    /// Remember the last used directory (best-effort).
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.config.ui.last_dir = Some(self.session.last_dir.clone());
        if let Err(e) = self.config.save_to(&self.config_path) {
            log::warn!("ui: failed to save settings to {}: {e}", self.config_path.display());
        }
        log::info!("ui: form closing");
    }
}
