//! Live microphone capture using cpal
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread for the
//! whole lifetime of the capture. The device callback runs continuously and
//! only delivers frames while a sink is connected.
//!
//! Lock order is slot, then whatever the sink locks. The recorder only takes
//! the slot through `connect`/`disconnect` and never while holding a lock the
//! sink needs.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, StreamConfig};
use tracing::{debug, info, warn};

use crate::application::lock;
use crate::application::ports::{CaptureError, CaptureSource, FrameSink};
use crate::domain::audio::{AudioFrame, TrackSettings, DEFAULT_BUFFER_SIZE};

/// Sink slot shared with the device callback. The epoch changes on every
/// connect so the callback can drop samples assembled before a pause.
#[derive(Default)]
struct SinkSlot {
    sink: Option<FrameSink>,
    epoch: u64,
}

/// Microphone capture through the default cpal input device
pub struct CpalCapture {
    track: TrackSettings,
    slot: Arc<Mutex<SinkSlot>>,
    shutdown: Option<std_mpsc::Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
}

impl CpalCapture {
    /// Open the default input device. Frames are delivered in buffers of
    /// `buffer_size` sample frames.
    pub fn open(buffer_size: Option<usize>) -> Result<Self, CaptureError> {
        let frames_per_buffer = buffer_size.filter(|n| *n > 0).unwrap_or(DEFAULT_BUFFER_SIZE);
        let slot = Arc::new(Mutex::new(SinkSlot::default()));
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        let thread_slot = Arc::clone(&slot);
        let stream_thread = thread::Builder::new()
            .name("cpal-capture".to_string())
            .spawn(move || {
                let stream = match Self::build_stream(thread_slot, frames_per_buffer) {
                    Ok((stream, track)) => {
                        let _ = ready_tx.send(Ok(track));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Blocks until the capture is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("capture stream closed");
            })
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

        let track = ready_rx
            .recv()
            .map_err(|_| CaptureError::StreamFailed("capture thread exited".into()))??;

        info!(
            sample_rate = track.sample_rate,
            channels = track.channel_count_or_default(),
            frames_per_buffer,
            "audio capture opened"
        );

        Ok(Self {
            track,
            slot,
            shutdown: Some(shutdown_tx),
            stream_thread: Some(stream_thread),
        })
    }

    /// Get the default input device
    fn get_input_device() -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.default_input_device().ok_or(CaptureError::NoAudioDevice)
    }

    fn build_stream(
        slot: Arc<Mutex<SinkSlot>>,
        frames_per_buffer: usize,
    ) -> Result<(cpal::Stream, TrackSettings), CaptureError> {
        let device = Self::get_input_device()?;
        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::StreamFailed(format!("Failed to get config: {}", e)))?;

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let track = TrackSettings::new(config.channels, config.sample_rate.0);

        let stream = match sample_format {
            SampleFormat::F32 => Self::input_stream::<f32>(&device, &config, slot, frames_per_buffer)?,
            SampleFormat::I16 => Self::input_stream::<i16>(&device, &config, slot, frames_per_buffer)?,
            SampleFormat::U16 => Self::input_stream::<u16>(&device, &config, slot, frames_per_buffer)?,
            other => {
                return Err(CaptureError::StreamFailed(format!(
                    "Unsupported sample format: {}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

        Ok((stream, track))
    }

    fn input_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        slot: Arc<Mutex<SinkSlot>>,
        frames_per_buffer: usize,
    ) -> Result<cpal::Stream, CaptureError>
    where
        T: SizedSample,
        f32: cpal::FromSample<T>,
    {
        let mut assembler = FrameAssembler::new(config.channels, config.sample_rate.0, frames_per_buffer);
        let mut seen_epoch = 0;

        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    let epoch = {
                        let slot = lock(&slot);
                        if slot.sink.is_none() {
                            return;
                        }
                        slot.epoch
                    };
                    if epoch != seen_epoch {
                        assembler.clear();
                        seen_epoch = epoch;
                    }
                    let samples: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
                    assembler.push_interleaved(&samples, |frame| {
                        deliver(&slot, epoch, frame);
                    });
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))
    }
}

/// Hand a frame to the sink connected under `epoch`. The slot stays locked
/// during the call so nothing is delivered once `disconnect` has returned.
fn deliver(slot: &Mutex<SinkSlot>, epoch: u64, frame: AudioFrame) -> bool {
    let slot = lock(slot);
    match slot.sink {
        Some(ref sink) if slot.epoch == epoch => {
            sink(frame);
            true
        }
        _ => false,
    }
}

impl CaptureSource for CpalCapture {
    fn track(&self) -> Option<TrackSettings> {
        Some(self.track)
    }

    fn connect(&self, sink: FrameSink) -> Result<(), CaptureError> {
        if self.shutdown.is_none() {
            return Err(CaptureError::Closed);
        }
        let mut slot = lock(&self.slot);
        slot.sink = Some(sink);
        slot.epoch += 1;
        debug!(epoch = slot.epoch, "capture connected");
        Ok(())
    }

    fn disconnect(&self) {
        if lock(&self.slot).sink.take().is_some() {
            debug!("capture disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        lock(&self.slot).sink.is_some()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.disconnect();
        self.shutdown.take();
        if let Some(handle) = self.stream_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Splits interleaved device samples into planar frames of a fixed length
#[derive(Debug)]
pub struct FrameAssembler {
    sample_rate: u32,
    frames_per_buffer: usize,
    planar: Vec<Vec<f32>>,
}

impl FrameAssembler {
    pub fn new(channels: u16, sample_rate: u32, frames_per_buffer: usize) -> Self {
        let channels = usize::from(channels.max(1));
        let frames_per_buffer = frames_per_buffer.max(1);
        Self {
            sample_rate,
            frames_per_buffer,
            planar: vec![Vec::with_capacity(frames_per_buffer); channels],
        }
    }

    /// Samples buffered toward the next frame
    pub fn pending(&self) -> usize {
        self.planar.first().map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.planar.iter_mut().for_each(Vec::clear);
    }

    /// Append interleaved samples, calling `emit` for every completed frame.
    /// A trailing partial sample group is ignored.
    pub fn push_interleaved(&mut self, samples: &[f32], mut emit: impl FnMut(AudioFrame)) {
        let channels = self.planar.len();
        let capacity = self.frames_per_buffer;
        for group in samples.chunks_exact(channels) {
            for (buffer, sample) in self.planar.iter_mut().zip(group) {
                buffer.push(*sample);
            }
            if self.pending() == self.frames_per_buffer {
                let buffers = self
                    .planar
                    .iter_mut()
                    .map(|b| std::mem::replace(b, Vec::with_capacity(capacity)))
                    .collect();
                emit(AudioFrame::new(buffers, self.sample_rate));
            }
        }
    }
}
