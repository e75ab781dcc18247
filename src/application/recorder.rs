//! Media recorder - lifecycle state machine over a capture source and an
//! isolated encoder channel
//!
//! All mutable recorder state lives behind one mutex. Public operations take
//! it synchronously; a single pump task drains the shared encoder response
//! queue and applies each message under the same lock, so observers see
//! events in the order the state machine produced them.

use std::mem;
use std::sync::{Arc, Mutex, Weak};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::chunker::FrameChunker;
use super::encoder_channel::{ChannelMessage, EncoderChannel, ResponseSender};
use super::events::{ErrorKind, RecorderEvent};
use super::lock;
use super::ports::{CaptureSource, EncoderError, EncoderFactory, EncoderParams, EncoderResponse, FrameSink};
use crate::domain::audio::EncodedChunk;
use crate::domain::error::TimesliceError;
use crate::domain::mime::{negotiate, EncoderKind, NegotiatedMime};
use crate::domain::recording::Timeslice;
use crate::domain::session::{InvalidStateTransition, RecorderLifecycle, RecorderState, WorkerState};

/// Construction options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Requested container descriptor; empty or `None` selects the default
    pub mime_type: Option<String>,
    pub audio_bits_per_second: Option<u32>,
    /// Used for audio when `audio_bits_per_second` is not set
    pub bits_per_second: Option<u32>,
}

impl RecorderOptions {
    pub fn with_mime_type(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime_type.into()),
            ..Self::default()
        }
    }

    fn audio_bitrate(&self) -> Option<u32> {
        self.audio_bits_per_second.or(self.bits_per_second)
    }
}

/// Synchronous recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Unsupported MIME type: \"{0}\"")]
    UnsupportedDescriptor(String),

    #[error("Capture source unavailable: {0}")]
    CaptureUnavailable(String),

    #[error(transparent)]
    InvalidTimeslice(#[from] TimesliceError),

    #[error("Encoder setup failed: {0}")]
    Encoder(#[from] EncoderError),

    #[error("A Tokio runtime is required to drive the recorder")]
    NoRuntime,
}

/// Records from a capture source into encoded chunks delivered as
/// [`RecorderEvent`]s
pub struct MediaRecorder<C: CaptureSource + 'static> {
    inner: Arc<Mutex<Inner<C>>>,
    events: Option<mpsc::UnboundedReceiver<RecorderEvent>>,
    pump: JoinHandle<()>,
}

impl<C: CaptureSource + 'static> MediaRecorder<C> {
    /// Negotiate the container, read the track settings and spawn the first
    /// encoder channel. Must be called inside a Tokio runtime.
    pub fn new<F>(capture: C, factory: F, options: RecorderOptions) -> Result<Self, RecorderError>
    where
        F: EncoderFactory + 'static,
    {
        let requested = options.mime_type.clone().unwrap_or_default();
        let negotiated =
            negotiate(&requested).ok_or_else(|| RecorderError::UnsupportedDescriptor(requested.clone()))?;

        let track = capture
            .track()
            .ok_or_else(|| RecorderError::CaptureUnavailable("no audio track".to_string()))?;

        let runtime = Handle::try_current().map_err(|_| RecorderError::NoRuntime)?;

        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let factory: Arc<dyn EncoderFactory> = Arc::new(factory);

        let channel = EncoderChannel::spawn(negotiated.kind, 0, Arc::clone(&factory), response_tx.clone())?;

        let chunker = Arc::new(Mutex::new(FrameChunker::new(track.sample_rate)));
        if let Some(sender) = channel.sender() {
            lock(&chunker).attach(sender);
        }
        let sink: FrameSink = {
            let chunker = Arc::clone(&chunker);
            Arc::new(move |frame| {
                lock(&chunker).on_frame(frame);
            })
        };

        info!(
            mime_type = %negotiated.mime_type,
            encoder = %negotiated.kind,
            sample_rate = track.sample_rate,
            channels = track.channel_count_or_default(),
            "media recorder created"
        );

        let inner = Arc::new(Mutex::new(Inner {
            lifecycle: RecorderLifecycle::new(),
            sample_rate: track.sample_rate,
            channel_count: track.channel_count_or_default(),
            audio_bits_per_second: options.audio_bitrate(),
            negotiated,
            capture,
            chunker,
            sink,
            channel,
            factory,
            responses: response_tx,
            events: event_tx,
        }));

        let pump = runtime.spawn(pump_responses(Arc::downgrade(&inner), response_rx));

        Ok(Self {
            inner,
            events: Some(event_rx),
            pump,
        })
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<RecorderEvent>> {
        self.events.take()
    }

    /// Begin recording. `timeslice_ms` requests a `DataAvailable` event every
    /// given number of milliseconds; `None` or zero flushes only on stop or
    /// explicit request.
    pub fn start(&self, timeslice_ms: Option<i64>) -> Result<(), RecorderError> {
        let mut inner = lock(&self.inner);
        inner.lifecycle.ensure(RecorderState::Inactive, "start")?;

        let timeslice = timeslice_ms
            .map(Timeslice::from_millis)
            .transpose()?
            .unwrap_or(Timeslice::UNBOUNDED);

        if !inner.channel.is_accepting() {
            inner.renew_channel()?;
        }

        inner.lifecycle.start()?;
        lock(&inner.chunker).configure(timeslice);
        info!(timeslice = %timeslice, generation = inner.channel.generation(), "recording started");

        if inner.channel.state() == WorkerState::ReadyToInit {
            inner.send_init();
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<(), RecorderError> {
        let mut inner = lock(&self.inner);
        inner.lifecycle.pause()?;
        inner.capture.disconnect();
        inner.emit(RecorderEvent::Pause);
        debug!("recording paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), RecorderError> {
        let mut inner = lock(&self.inner);
        inner.lifecycle.resume()?;
        lock(&inner.chunker).reset();

        match inner.channel.state() {
            WorkerState::Encoding => {
                inner.connect_capture();
            }
            WorkerState::ReadyToInit => inner.send_init(),
            WorkerState::Inactive | WorkerState::Closed => {}
        }

        inner.emit(RecorderEvent::Resume);
        debug!("recording resumed");
        Ok(())
    }

    /// Stop recording. The final chunk and `Stop` follow asynchronously.
    pub fn stop(&self) -> Result<(), RecorderError> {
        let mut inner = lock(&self.inner);
        inner.lifecycle.stop()?;
        inner.capture.disconnect();

        if !inner.channel.is_accepting() {
            // Channel already failed; no final chunk will arrive
            inner.emit(RecorderEvent::Stop);
        } else if let Err(e) = inner.channel.done() {
            warn!(error = %e, "encoder did not accept done");
            inner.emit(RecorderEvent::Stop);
        }

        info!(generation = inner.channel.generation(), "recording stopped");
        Ok(())
    }

    /// Ask for the audio encoded so far to be delivered now
    pub fn request_data(&self) -> Result<(), RecorderError> {
        let mut inner = lock(&self.inner);
        inner.lifecycle.ensure_active("request data")?;
        if let Err(e) = inner.channel.request_data() {
            debug!(error = %e, "data request dropped");
        }
        Ok(())
    }

    pub fn state(&self) -> RecorderState {
        lock(&self.inner).lifecycle.state()
    }

    pub fn worker_state(&self) -> WorkerState {
        lock(&self.inner).channel.state()
    }

    /// Negotiated container type
    pub fn mime_type(&self) -> String {
        lock(&self.inner).negotiated.mime_type.clone()
    }

    pub fn encoder_kind(&self) -> EncoderKind {
        lock(&self.inner).negotiated.kind
    }

    pub fn audio_bits_per_second(&self) -> Option<u32> {
        lock(&self.inner).audio_bits_per_second
    }

    /// Audio only
    pub fn video_bits_per_second(&self) -> Option<u32> {
        None
    }

    pub fn sample_rate(&self) -> u32 {
        lock(&self.inner).sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        lock(&self.inner).channel_count
    }
}

impl<C: CaptureSource + 'static> Drop for MediaRecorder<C> {
    fn drop(&mut self) {
        {
            let mut inner = lock(&self.inner);
            inner.capture.disconnect();
            lock(&inner.chunker).detach();
            inner.channel.terminate();
        }
        self.pump.abort();
    }
}

struct Inner<C> {
    lifecycle: RecorderLifecycle,
    negotiated: NegotiatedMime,
    sample_rate: u32,
    channel_count: u16,
    audio_bits_per_second: Option<u32>,
    capture: C,
    chunker: Arc<Mutex<FrameChunker>>,
    sink: FrameSink,
    channel: EncoderChannel,
    factory: Arc<dyn EncoderFactory>,
    responses: ResponseSender,
    events: mpsc::UnboundedSender<RecorderEvent>,
}

impl<C: CaptureSource> Inner<C> {
    fn emit(&self, event: RecorderEvent) {
        trace!(event = event.name(), "emitting event");
        // Nobody listening is not an error
        let _ = self.events.send(event);
    }

    fn encoder_params(&self) -> EncoderParams {
        EncoderParams {
            sample_rate: self.sample_rate,
            channel_count: self.channel_count,
            bits_per_second: self.audio_bits_per_second,
        }
    }

    /// Replace a closed or finishing channel with a fresh one
    fn renew_channel(&mut self) -> Result<(), EncoderError> {
        let generation = self.channel.generation() + 1;
        let channel = EncoderChannel::spawn(
            self.negotiated.kind,
            generation,
            Arc::clone(&self.factory),
            self.responses.clone(),
        )?;

        let mut chunker = lock(&self.chunker);
        match channel.sender() {
            Some(sender) => chunker.attach(sender),
            None => chunker.detach(),
        }
        drop(chunker);

        // A finishing worker still delivers its last data under the old tag
        let previous = mem::replace(&mut self.channel, channel);
        debug!(previous = previous.generation(), generation, "encoder channel renewed");
        Ok(())
    }

    /// Initialize the encoder with the track settings, connect capture and
    /// announce the start
    fn send_init(&mut self) {
        let params = self.encoder_params();
        if let Err(e) = self.channel.init(params) {
            warn!(error = %e, "encoder init not sent");
            return;
        }
        if self.connect_capture() {
            self.emit(RecorderEvent::Start);
        }
    }

    fn connect_capture(&mut self) -> bool {
        match self.capture.connect(Arc::clone(&self.sink)) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "capture connect failed");
                self.emit(RecorderEvent::Error {
                    kind: ErrorKind::CaptureFault,
                    message: e.to_string(),
                });
                false
            }
        }
    }

    fn handle_message(&mut self, message: ChannelMessage) {
        let current = message.generation == self.channel.generation();
        let mime_type = self.negotiated.mime_type.clone();

        match message.response {
            EncoderResponse::ReadyToInit => {
                if current && self.channel.mark_ready_to_init() && self.lifecycle.is_recording() {
                    self.send_init();
                }
            }
            EncoderResponse::EncodedData(buffers) => {
                self.emit(RecorderEvent::DataAvailable(EncodedChunk::from_buffers(
                    buffers, mime_type, false,
                )));
            }
            EncoderResponse::LastEncodedData(buffers) => {
                self.emit(RecorderEvent::DataAvailable(EncodedChunk::from_buffers(
                    buffers, mime_type, true,
                )));
                self.emit(RecorderEvent::Stop);
                if current {
                    self.channel.mark_closed();
                    lock(&self.chunker).detach();
                }
            }
            EncoderResponse::Fault(reason) => {
                // A stop waiting on the final chunk still needs its Stop
                let finishing = current && self.channel.is_finishing();
                if current {
                    self.capture.disconnect();
                    lock(&self.chunker).detach();
                    self.channel.terminate();
                } else {
                    debug!(generation = message.generation, "fault from a replaced channel");
                }
                self.emit(RecorderEvent::Error {
                    kind: ErrorKind::EncoderFault,
                    message: reason,
                });
                if finishing {
                    self.emit(RecorderEvent::Stop);
                }
            }
        }
    }
}

async fn pump_responses<C: CaptureSource + 'static>(
    inner: Weak<Mutex<Inner<C>>>,
    mut responses: mpsc::UnboundedReceiver<ChannelMessage>,
) {
    while let Some(message) = responses.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        lock(&inner).handle_message(message);
    }
}
