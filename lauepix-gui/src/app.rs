//! Main application state and logic.
//!
//! Contains the `LauepixApp` struct which owns the console session, the
//! backend channel, and message handling.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

use eframe::egui;
use lauepix_core::{Session, Stage};
use lauepix_io::{encode_file, ChannelClient, ChannelConfig, ChannelEvent, ChannelHandle};

use crate::message::AppMessage;
use crate::state::{ConnectionState, UiState};

/// How often the UI wakes up to drain backend messages when idle.
const MESSAGE_POLL: Duration = Duration::from_millis(100);

/// Main application state.
pub struct LauepixApp {
    /// Pipeline, reflection and view state driven by the backend.
    pub(crate) session: Session<ChannelHandle>,
    /// Backend channel; dropping it stops the worker.
    pub(crate) client: ChannelClient,
    /// Backend endpoint, shown in the top bar.
    pub(crate) server_url: String,
    pub(crate) connection: ConnectionState,

    /// UI display state.
    pub(crate) ui_state: UiState,

    /// Message receiver for async operations.
    pub(crate) rx: Receiver<AppMessage>,
    /// Message sender for async operations.
    pub(crate) tx: Sender<AppMessage>,
}

impl LauepixApp {
    /// Start the channel client and build the app around it.
    ///
    /// # Errors
    ///
    /// Fails if the channel worker thread cannot be started.
    pub fn new(config: ChannelConfig) -> lauepix_io::Result<Self> {
        let (tx, rx) = channel();
        let server_url = config.url.clone();
        let client = ChannelClient::spawn(config, tx.clone())?;
        Ok(Self {
            session: Session::new(client.handle()),
            client,
            server_url,
            connection: ConnectionState::default(),
            ui_state: UiState::default(),
            rx,
            tx,
        })
    }

    /// Surface the outcome of a user action in the status line.
    fn report(&mut self, result: lauepix_core::Result<()>) {
        match result {
            Ok(()) => self.ui_state.notice = None,
            Err(e) => {
                log::warn!("{e}");
                self.ui_state.notice = Some(e.to_string());
            }
        }
    }

    /// Run a stage with the options from its panel.
    pub fn run_stage(&mut self, stage: Stage) {
        let options = self.ui_state.options_for(stage);
        let result = self.session.run_stage(stage, &options);
        self.report(result);
    }

    /// Ask the backend to stop the running stage.
    pub fn cancel_stage(&mut self, stage: Stage) {
        let result = self.session.cancel(stage);
        self.report(result);
    }

    /// Read a local file in the background and upload it once encoded.
    pub fn import_file(&mut self, path: PathBuf) {
        self.ui_state.import_error = None;
        let tx = self.tx.clone();
        thread::spawn(move || {
            let message = match encode_file(&path) {
                Ok(file) => AppMessage::ImportFileReady(file),
                Err(e) => AppMessage::ImportFileError(format!("{}: {e}", path.display())),
            };
            let _ = tx.send(message);
        });
    }

    /// Let the backend open its own file browser.
    pub fn browse_for_import(&mut self) {
        self.ui_state.import_error = None;
        let options = self.ui_state.options_for(Stage::Import);
        let result = self.session.browse_for_import(&options);
        self.report(result);
    }

    /// Restrict the experiment images to the picked ToF window.
    pub fn update_tof_range(&mut self, min: f64, max: f64) {
        self.ui_state.tof_range = Some((min, max));
        let result = self.session.update_tof_range(min, max);
        self.report(result);
    }

    pub fn store_planner_orientation(&mut self) {
        let result = self.session.store_planner_orientation();
        self.report(result);
    }

    pub fn clear_planner(&mut self) {
        let result = self.session.clear_planner();
        self.report(result);
    }

    pub fn request_next_planner_orientation(&mut self) {
        let result = self.session.request_next_planner_orientation();
        self.report(result);
    }

    /// Whether commands can be sent right now.
    pub fn can_send(&self) -> bool {
        self.client.is_connected()
    }

    /// Handle pending messages from async workers.
    pub fn handle_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                AppMessage::Channel(ChannelEvent::Message(inbound)) => {
                    let selected = self.session.reflections().selected().cloned();
                    self.session.dispatch(*inbound);
                    if self.session.reflections().selected() != selected.as_ref() {
                        self.ui_state.scroll_to_selection = true;
                    }
                }
                AppMessage::Channel(event) => {
                    if self.connection.apply(&event) && self.connection.is_connected() {
                        self.ui_state.notice = None;
                    }
                }
                AppMessage::ImportFileReady(file) => {
                    let options = self.ui_state.options_for(Stage::Import);
                    let result = self
                        .session
                        .import_file(file.filename, file.data_url, &options);
                    self.report(result);
                }
                AppMessage::ImportFileError(e) => {
                    log::warn!("import failed: {e}");
                    self.ui_state.import_error = Some(e);
                }
            }
        }
    }
}

impl eframe::App for LauepixApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        crate::ui::theme::apply_system_theme(ctx);
        self.handle_messages();
        self.render_top_panel(ctx);
        self.render_side_panel(ctx);
        self.render_central_panel(ctx);

        ctx.request_repaint_after(MESSAGE_POLL);
    }
}
