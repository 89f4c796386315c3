//! Lauepix CLI
//!
//! Headless access to the lauepix console logic: replay a transcript of
//! backend messages, or drive import and the following stages against a
//! live backend.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use lauepix_core::{
    markup_to_plain, OptionSet, RecordingTransport, Session, Stage, StageStatus, Transport,
};
use lauepix_io::config::{DEFAULT_CLIENT_ID, DEFAULT_URL};
use lauepix_io::{encode_file, ChannelClient, ChannelConfig, ChannelEvent, EncodedFile};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("I/O error: {0}")]
    LauepixIo(#[from] lauepix_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] lauepix_core::Error),

    #[error("no terminal result after {0:?}")]
    Timeout(Duration),

    #[error("connection lost during run: {0}")]
    ConnectionLost(String),

    #[error("channel worker stopped")]
    ChannelClosed,
}

/// Pipeline stage selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    Import,
    FindSpots,
    Index,
    Refine,
    Integrate,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Import => Stage::Import,
            StageArg::FindSpots => Stage::FindSpots,
            StageArg::Index => Stage::Index,
            StageArg::Refine => Stage::Refine,
            StageArg::Integrate => Stage::Integrate,
        }
    }
}

/// Operator console for Laue time-of-flight processing, without the GUI.
#[derive(Parser)]
#[command(name = "lauepix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a recorded transcript of backend messages and print the result
    Replay {
        /// File with one JSON channel message per line
        transcript: PathBuf,

        /// Print every stage log, not just the status table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Import a file and run the stages after it against a live backend
    Run {
        /// Experiment file to upload
        file: PathBuf,

        /// Last stage to run
        #[arg(short, long, value_enum, default_value = "import")]
        until: StageArg,

        /// Backend WebSocket endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        server: String,

        /// Channel name registered with the backend
        #[arg(long, default_value = DEFAULT_CLIENT_ID)]
        client_id: String,

        /// Advanced options for one stage, as STAGE:"key=value ..."
        #[arg(long = "args", value_parser = parse_stage_args)]
        stage_args: Vec<(StageArg, String)>,

        /// Give up when a stage has not finished after this many seconds
        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            transcript,
            verbose,
        } => {
            let reader = BufReader::new(File::open(&transcript)?);
            let mut session = Session::new(RecordingTransport::new());
            let applied = replay(reader, &mut session)?;
            log::info!("applied {applied} messages from {}", transcript.display());

            let mut out = io::stdout().lock();
            write_report(&mut out, &session, verbose)?;
        }
        Commands::Run {
            file,
            until,
            server,
            client_id,
            stage_args,
            timeout_secs,
        } => {
            let upload = encode_file(&file)?;
            let mut options = StageOptions::default();
            for (stage, text) in stage_args {
                options.set(stage.into(), text);
            }

            let mut config = ChannelConfig::new(server);
            config.client_id = client_id;
            let session = run_remote(
                config,
                Pipeline::new(upload, until.into()),
                &options,
                Duration::from_secs(timeout_secs),
            )?;

            let mut out = io::stdout().lock();
            write_report(&mut out, &session, true)?;
        }
    }

    Ok(())
}

/// Parse `STAGE:TEXT` for `--args`.
fn parse_stage_args(value: &str) -> std::result::Result<(StageArg, String), String> {
    let (stage, text) = value
        .split_once(':')
        .ok_or_else(|| format!("expected STAGE:OPTIONS, got {value:?}"))?;
    let stage = StageArg::from_str(stage, true)?;
    Ok((stage, text.to_string()))
}

/// Feed every non-empty line of `reader` to the session.
fn replay<T: Transport>(reader: impl BufRead, session: &mut Session<T>) -> Result<usize> {
    let mut applied = 0usize;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        session.dispatch_text(line);
        applied += 1;
    }
    Ok(applied)
}

/// Advanced option text per stage.
#[derive(Debug, Default)]
struct StageOptions {
    advanced: [String; 5],
}

impl StageOptions {
    fn set(&mut self, stage: Stage, text: String) {
        self.advanced[stage.index()] = text;
    }

    fn options_for(&self, stage: Stage) -> OptionSet {
        let mut options = OptionSet::new();
        options.set_advanced(self.advanced[stage.index()].clone());
        options
    }
}

/// What the pipeline did on one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// A stage is still running.
    Waiting,
    Started(Stage),
    /// The last planned stage has reported its result.
    Finished,
}

/// Import followed by each stage up to `last`, one run at a time.
struct Pipeline {
    upload: EncodedFile,
    plan: Vec<Stage>,
    next: usize,
}

impl Pipeline {
    fn new(upload: EncodedFile, last: Stage) -> Self {
        Self {
            upload,
            plan: Stage::ALL.into_iter().take(last.index() + 1).collect(),
            next: 0,
        }
    }

    fn current(&self) -> Option<Stage> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.plan.get(i).copied())
    }

    /// Start the next stage once the current one has produced its result.
    fn step<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        options: &StageOptions,
    ) -> Result<Step> {
        if let Some(current) = self.current() {
            if session.stages().status(current) == StageStatus::Running {
                return Ok(Step::Waiting);
            }
        }
        let Some(&stage) = self.plan.get(self.next) else {
            return Ok(Step::Finished);
        };

        let stage_options = options.options_for(stage);
        if stage == Stage::Import {
            session.import_file(
                self.upload.filename.clone(),
                self.upload.data_url.clone(),
                &stage_options,
            )?;
        } else {
            session.run_stage(stage, &stage_options)?;
        }
        self.next += 1;
        Ok(Step::Started(stage))
    }
}

/// Connect, run the pipeline to its last stage and return the final session.
fn run_remote(
    config: ChannelConfig,
    mut pipeline: Pipeline,
    options: &StageOptions,
    timeout: Duration,
) -> Result<Session<lauepix_io::ChannelHandle>> {
    let (tx, rx) = mpsc::channel::<ChannelEvent>();
    let server = config.url.clone();
    let client = ChannelClient::spawn(config, tx)?;
    let mut session = Session::new(client.handle());
    let mut deadline = Instant::now() + timeout;
    let mut started = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = match rx.recv_timeout(remaining) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => {
                if let Some(stage) = session.stages().running().next() {
                    log::warn!("cancelling {stage}");
                    if let Err(e) = session.cancel(stage) {
                        log::warn!("could not cancel {stage}: {e}");
                    }
                }
                return Err(CliError::Timeout(timeout));
            }
            Err(RecvTimeoutError::Disconnected) => return Err(CliError::ChannelClosed),
        };

        match event {
            ChannelEvent::Connected => {
                log::info!("connected to {server}");
                if started {
                    continue;
                }
                started = true;
            }
            ChannelEvent::Message(inbound) => session.dispatch(*inbound),
            ChannelEvent::ConnectFailed(reason) => {
                log::warn!("cannot reach {server}: {reason}");
                continue;
            }
            ChannelEvent::Disconnected(reason) => {
                if started {
                    return Err(CliError::ConnectionLost(reason));
                }
                continue;
            }
        }

        match pipeline.step(&mut session, options)? {
            Step::Waiting => {}
            Step::Started(stage) => {
                eprintln!("Running {stage}...");
                deadline = Instant::now() + timeout;
            }
            Step::Finished => return Ok(session),
        }
    }
}

/// Print the stage table, summaries and reflection table.
fn write_report<T: Transport>(
    out: &mut impl Write,
    session: &Session<T>,
    logs: bool,
) -> io::Result<()> {
    let summary = session.summary();
    if !summary.instrument_name.is_empty() {
        writeln!(
            out,
            "Experiment: {} {}",
            summary.instrument_name, summary.experiment_description
        )?;
    }

    writeln!(out, "{:<12} | {:<8} | Result", "Stage", "Status")?;
    writeln!(out, "{:-<34}", "")?;
    for stage in Stage::ALL {
        let status = match session.stages().status(stage) {
            StageStatus::Disabled => "disabled",
            StageStatus::Idle => "idle",
            StageStatus::Running => "running",
        };
        let result = if session.stages().has_result(stage) {
            "yes"
        } else {
            "-"
        };
        writeln!(out, "{:<12} | {status:<8} | {result}", stage.label())?;
    }

    for text in [
        &summary.reflections_summary,
        &summary.crystal_summary,
        &summary.integration_summary,
    ] {
        if !text.is_empty() {
            writeln!(out, "{text}")?;
        }
    }

    if logs {
        for stage in Stage::ALL {
            let log = &session.stages().record(stage).log;
            if !log.is_empty() {
                writeln!(out, "\n[{stage}]\n{}", markup_to_plain(log).trim_end())?;
            }
        }
    }

    let reflections = session.reflections().reflections();
    if !reflections.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{:>5} | {:>5} | {:<12} | {:<14} | {:>12} | {:>12}",
            "ID", "Panel", "Miller index", "XYZ obs", "Wavelength", "ToF (µs)"
        )?;
        for r in reflections {
            writeln!(
                out,
                "{:>5} | {:>5} | {:<12} | {:<14} | {:>12} | {:>12}",
                r.id, r.panel, r.miller_idx, r.xyz_obs, r.wavelength, r.tof
            )?;
        }
    }
    Ok(())
}
