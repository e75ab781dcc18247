//! Encoder channel: the recorder-side handle on one isolated encoder worker
//!
//! Each channel owns a dedicated worker thread. The recorder talks to it only
//! through a FIFO command queue and reads responses from a shared queue where
//! every message is tagged with the channel generation, so trailing responses
//! of a replaced channel never touch the current one.

use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ports::{EncoderCommand, EncoderError, EncoderFactory, EncoderParams, EncoderResponse};
use crate::domain::audio::AudioFrame;
use crate::domain::mime::EncoderKind;
use crate::domain::session::WorkerState;

/// A response together with the generation of the channel that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub generation: u64,
    pub response: EncoderResponse,
}

/// Sending half of the shared response queue
pub type ResponseSender = mpsc::UnboundedSender<ChannelMessage>;

/// Cloneable command sender handed to the frame chunker
#[derive(Debug, Clone)]
pub struct ChannelSender {
    generation: u64,
    commands: mpsc::UnboundedSender<EncoderCommand>,
}

impl ChannelSender {
    pub(crate) fn new(generation: u64, commands: mpsc::UnboundedSender<EncoderCommand>) -> Self {
        Self {
            generation,
            commands,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move a frame into the encoder queue. Returns false once the worker is
    /// gone.
    pub fn push_input_data(&self, frame: AudioFrame) -> bool {
        self.send(EncoderCommand::PushInputData(frame))
    }

    /// Request a flush. Returns false once the worker is gone.
    pub fn get_encoded_data(&self) -> bool {
        self.send(EncoderCommand::GetEncodedData)
    }

    fn send(&self, command: EncoderCommand) -> bool {
        let name = command.name();
        if self.commands.send(command).is_err() {
            debug!(generation = self.generation, command = name, "encoder worker gone, command dropped");
            return false;
        }
        true
    }
}

/// Errors from channel operations that the worker state does not allow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("Cannot send {command} while the encoder is {state}")]
    NotAccepting {
        command: &'static str,
        state: WorkerState,
    },
}

/// Recorder-side state of one encoder worker
#[derive(Debug)]
pub struct EncoderChannel {
    generation: u64,
    kind: EncoderKind,
    state: WorkerState,
    sender: Option<ChannelSender>,
}

impl EncoderChannel {
    /// Spawn a worker thread for `kind`. The worker builds its encoder, then
    /// announces `ReadyToInit` on `responses`.
    pub fn spawn(
        kind: EncoderKind,
        generation: u64,
        factory: Arc<dyn EncoderFactory>,
        responses: ResponseSender,
    ) -> Result<Self, EncoderError> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name(format!("encoder-{}-{}", kind, generation))
            .spawn(move || run_worker(kind, generation, factory, command_rx, responses))
            .map_err(|e| EncoderError::SpawnFailed(e.to_string()))?;

        info!(generation, encoder = %kind, "encoder channel spawned");

        Ok(Self {
            generation,
            kind,
            state: WorkerState::Inactive,
            sender: Some(ChannelSender::new(generation, command_tx)),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> EncoderKind {
        self.kind
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// True until `done` has been sent or the channel closed
    pub fn is_accepting(&self) -> bool {
        self.sender.is_some() && !self.state.is_closed()
    }

    /// `done` sent, final response still outstanding
    pub fn is_finishing(&self) -> bool {
        self.sender.is_none() && !self.state.is_closed()
    }

    /// Command sender for the frame chunker, if still accepting
    pub fn sender(&self) -> Option<ChannelSender> {
        self.sender.clone().filter(|_| !self.state.is_closed())
    }

    /// Record the worker's `ReadyToInit` signal. Returns true if the channel
    /// moved to `ReadyToInit`.
    pub fn mark_ready_to_init(&mut self) -> bool {
        if self.state != WorkerState::Inactive || self.sender.is_none() {
            return false;
        }
        self.state = WorkerState::ReadyToInit;
        debug!(generation = self.generation, "encoder ready to init");
        true
    }

    /// Send `init` and move to `Encoding`
    pub fn init(&mut self, params: EncoderParams) -> Result<(), ChannelError> {
        if self.state != WorkerState::ReadyToInit {
            return Err(self.not_accepting("init"));
        }
        self.send(EncoderCommand::Init(params))?;
        self.state = WorkerState::Encoding;
        info!(
            generation = self.generation,
            sample_rate = params.sample_rate,
            channels = params.channel_count,
            bits_per_second = ?params.bits_per_second,
            "encoder init sent"
        );
        Ok(())
    }

    /// Send `getEncodedData`. Queued in order even before `init`; the worker
    /// then answers with empty data.
    pub fn request_data(&mut self) -> Result<(), ChannelError> {
        self.send(EncoderCommand::GetEncodedData)
    }

    /// Send `done`. The channel stops accepting commands and closes when the
    /// final response arrives.
    pub fn done(&mut self) -> Result<(), ChannelError> {
        self.send(EncoderCommand::Done)?;
        self.sender = None;
        debug!(generation = self.generation, "encoder done sent");
        Ok(())
    }

    /// Final response received
    pub fn mark_closed(&mut self) {
        self.state = WorkerState::Closed;
        self.sender = None;
        debug!(generation = self.generation, "encoder channel closed");
    }

    /// Drop the command queue and close. The worker exits once every command
    /// sender is gone; unflushed audio is discarded.
    pub fn terminate(&mut self) {
        if self.state == WorkerState::Encoding {
            warn!(generation = self.generation, "terminating encoder channel while encoding");
        }
        self.mark_closed();
    }

    fn send(&mut self, command: EncoderCommand) -> Result<(), ChannelError> {
        let name = command.name();
        let Some(sender) = self.sender.as_ref().filter(|_| !self.state.is_closed()) else {
            return Err(self.not_accepting(name));
        };
        if !sender.send(command) {
            return Err(self.not_accepting(name));
        }
        Ok(())
    }

    fn not_accepting(&self, command: &'static str) -> ChannelError {
        ChannelError::NotAccepting {
            command,
            state: self.state,
        }
    }
}

/// Encoder context main loop. Runs until `done`, a fault, or until every
/// command sender has been dropped.
fn run_worker(
    kind: EncoderKind,
    generation: u64,
    factory: Arc<dyn EncoderFactory>,
    mut commands: mpsc::UnboundedReceiver<EncoderCommand>,
    responses: ResponseSender,
) {
    let reply = |response: EncoderResponse| {
        responses
            .send(ChannelMessage {
                generation,
                response,
            })
            .is_ok()
    };

    let mut encoder = match factory.create(kind) {
        Ok(encoder) => encoder,
        Err(e) => {
            warn!(generation, error = %e, "encoder setup failed");
            reply(EncoderResponse::Fault(e.to_string()));
            return;
        }
    };
    if !reply(EncoderResponse::ReadyToInit) {
        return;
    }

    let mut initialized = false;
    while let Some(command) = commands.blocking_recv() {
        let result = match command {
            EncoderCommand::Init(params) => encoder.init(params).map(|()| {
                initialized = true;
                None
            }),
            EncoderCommand::PushInputData(frame) if initialized => {
                encoder.push(frame).map(|()| None)
            }
            EncoderCommand::PushInputData(_) => {
                Err(EncoderError::NotInitialized("pushInputData"))
            }
            EncoderCommand::GetEncodedData if initialized => {
                encoder.flush().map(|b| Some(EncoderResponse::EncodedData(b)))
            }
            EncoderCommand::GetEncodedData => Ok(Some(EncoderResponse::EncodedData(Vec::new()))),
            EncoderCommand::Done if initialized => encoder
                .finish()
                .map(|b| Some(EncoderResponse::LastEncodedData(b))),
            EncoderCommand::Done => Ok(Some(EncoderResponse::LastEncodedData(Vec::new()))),
        };

        match result {
            Ok(None) => {}
            Ok(Some(response)) => {
                let last = matches!(response, EncoderResponse::LastEncodedData(_));
                if !reply(response) || last {
                    break;
                }
            }
            Err(e) => {
                warn!(generation, error = %e, "encoder fault");
                reply(EncoderResponse::Fault(e.to_string()));
                break;
            }
        }
    }

    debug!(generation, "encoder worker exiting");
}
