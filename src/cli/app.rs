//! App runners for the record and supported subcommands

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::fs;
use tokio::time::{interval, sleep, Duration as TokioDuration};
use tracing::{debug, info};

use crate::application::ports::{CaptureError, ConfigStore};
use crate::application::{MediaRecorder, RecorderError, RecorderEvent, RecorderOptions};
use crate::domain::config::AppConfig;
use crate::domain::mime::{is_type_supported, negotiate, EncoderKind};
use crate::domain::recording::Duration;
use crate::infrastructure::{patch_wave_header, CpalCapture, DefaultEncoderFactory, XdgConfigStore};

use super::args::{RecordArgs, RecordOptions};
use super::presenter::{Presenter, RecordingProgress};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Failures of the record command
#[derive(Debug, Error)]
pub enum RecordCommandError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("{kind}: {message}")]
    Fault { kind: String, message: String },

    #[error("Capture task failed: {0}")]
    Join(String),

    #[error("Failed to write recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("No audio data was recorded")]
    Empty,
}

/// Run the record subcommand
pub async fn run_record(args: RecordArgs) -> ExitCode {
    let mut presenter = Presenter::new();

    let file_config = XdgConfigStore::new().load_or_empty().await;
    let options = match resolve_record_options(args, file_config) {
        Ok(options) => options,
        Err(message) => {
            presenter.error(&message);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    match record(&options, &mut presenter).await {
        Ok((path, bytes)) => {
            presenter.spinner_success(&format!(
                "Saved {} ({})",
                path.display(),
                crate::domain::audio::format_size(bytes)
            ));
            presenter.output(&path.to_string_lossy());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail("Recording failed");
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Merge defaults < config file < CLI and validate the result
pub fn resolve_record_options(args: RecordArgs, file_config: AppConfig) -> Result<RecordOptions, String> {
    let cli_config = AppConfig {
        mime_type: args.mime_type,
        duration: args.duration,
        timeslice: args.timeslice,
        audio_bits_per_second: args.audio_bits_per_second,
        ..AppConfig::empty()
    };
    let config = AppConfig::defaults().merge(file_config).merge(cli_config);

    let mime_type = config.mime_type.clone().unwrap_or_default();
    if !is_type_supported(&mime_type) {
        return Err(format!("Unsupported MIME type: \"{}\"", mime_type));
    }

    let duration = match config.duration.as_deref() {
        Some(s) => s
            .parse::<Duration>()
            .map_err(|e| format!("Invalid duration: {}", e))?,
        None => Duration::default_duration(),
    };
    let timeslice = config
        .timeslice
        .as_deref()
        .map(|s| s.parse::<Duration>())
        .transpose()
        .map_err(|e| format!("Invalid timeslice: {}", e))?;

    Ok(RecordOptions {
        duration,
        timeslice,
        mime_type,
        audio_bits_per_second: config.audio_bits_per_second,
        buffer_size: config.buffer_size_or_default(),
        output: args.output,
        output_dir: config.output_dir_or_default(),
    })
}

async fn record(
    options: &RecordOptions,
    presenter: &mut Presenter,
) -> Result<(PathBuf, usize), RecordCommandError> {
    let buffer_size = options.buffer_size;
    // Device setup blocks; keep it off the runtime threads
    let capture = tokio::task::spawn_blocking(move || CpalCapture::open(Some(buffer_size)))
        .await
        .map_err(|e| RecordCommandError::Join(e.to_string()))??;

    let mut recorder = MediaRecorder::new(
        capture,
        DefaultEncoderFactory::new(),
        RecorderOptions {
            mime_type: Some(options.mime_type.clone()),
            audio_bits_per_second: options.audio_bits_per_second,
            bits_per_second: None,
        },
    )?;
    let Some(mut events) = recorder.take_events() else {
        return Err(RecordCommandError::Empty);
    };

    let timeslice_ms = options
        .timeslice
        .map(|t| i64::try_from(t.as_millis()).unwrap_or(i64::MAX));
    recorder.start(timeslice_ms)?;
    presenter.info(&format!(
        "Recording {} as {} ({} Hz, {} ch)",
        options.duration,
        recorder.mime_type(),
        recorder.sample_rate(),
        recorder.channel_count()
    ));
    presenter.start_spinner("Starting encoder...");

    let total_ms = options.duration.as_millis();
    let deadline = sleep(options.duration.as_std());
    tokio::pin!(deadline);
    let mut ticker = interval(TokioDuration::from_millis(100));
    let mut started = Instant::now();

    let mut data = Vec::new();
    let mut chunks = 0;
    let mut stopping = false;
    let mut fault = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    RecorderEvent::Start => {
                        started = Instant::now();
                        presenter.event("start", "");
                    }
                    RecorderEvent::DataAvailable(chunk) => {
                        debug!(bytes = chunk.size_bytes(), last = chunk.is_final(), "chunk received");
                        presenter.event("dataavailable", &chunk.human_readable_size());
                        data.extend_from_slice(chunk.data());
                        chunks += 1;
                    }
                    RecorderEvent::Stop => {
                        presenter.event("stop", "");
                        break;
                    }
                    RecorderEvent::Error { kind, message } => {
                        presenter.error(&format!("{}: {}", kind, message));
                        fault = Some(RecordCommandError::Fault { kind: kind.to_string(), message });
                        if !stopping {
                            stopping = true;
                            recorder.stop()?;
                        }
                    }
                    other => presenter.event(other.name(), ""),
                }
            }
            _ = &mut deadline, if !stopping => {
                stopping = true;
                recorder.stop()?;
                presenter.update_spinner("Finishing...");
            }
            _ = tokio::signal::ctrl_c(), if !stopping => {
                presenter.warn("Interrupted, stopping");
                stopping = true;
                recorder.stop()?;
            }
            _ = ticker.tick(), if !stopping => {
                let elapsed = started.elapsed().as_millis() as u64;
                presenter.update_recording_progress(&RecordingProgress {
                    elapsed_ms: elapsed.min(total_ms),
                    total_ms,
                    bytes: data.len(),
                    chunks,
                });
            }
        }
    }

    if let Some(fault) = fault {
        return Err(fault);
    }
    if data.is_empty() {
        return Err(RecordCommandError::Empty);
    }

    let kind = recorder.encoder_kind();
    if kind == EncoderKind::Wave {
        patch_wave_header(&mut data);
    }

    let path = output_path(options, kind);
    write_recording(&path, &data).await?;
    info!(path = %path.display(), bytes = data.len(), "recording saved");
    Ok((path, data.len()))
}

fn output_path(options: &RecordOptions, kind: EncoderKind) -> PathBuf {
    if let Some(ref path) = options.output {
        return path.clone();
    }
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    options
        .output_dir
        .join(format!("recording-{}.{}", stamp, kind.extension()))
}

async fn write_recording(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await
}

/// Run the supported subcommand. Fails if any type is unsupported.
pub fn run_supported(mime_types: &[String]) -> ExitCode {
    let presenter = Presenter::new();
    let mut all_supported = true;

    for mime_type in mime_types {
        presenter.output(&describe_support(mime_type));
        all_supported &= is_type_supported(mime_type);
    }

    if all_supported {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// One line describing whether `mime_type` can be recorded
pub fn describe_support(mime_type: &str) -> String {
    match negotiate(mime_type) {
        Some(negotiated) if DefaultEncoderFactory::is_available(negotiated.kind) => format!(
            "{}: supported ({} as {})",
            mime_type, negotiated.kind, negotiated.mime_type
        ),
        Some(negotiated) => format!(
            "{}: supported ({}, not built in; enable the opus feature)",
            mime_type, negotiated.kind
        ),
        None => format!("{}: not supported", mime_type),
    }
}
