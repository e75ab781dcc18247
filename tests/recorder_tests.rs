//! Recorder lifecycle tests driven through a manual capture source

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use media_recorder::application::ports::{
    AudioEncoder, CaptureSource, EncoderError, EncoderFactory, EncoderParams,
};
use media_recorder::domain::audio::{AudioFrame, TrackSettings};
use media_recorder::domain::mime::EncoderKind;
use media_recorder::domain::session::{RecorderState, WorkerState};
use media_recorder::infrastructure::encoding::WAVE_HEADER_LEN;
use media_recorder::infrastructure::{DefaultEncoderFactory, ManualCapture};
use media_recorder::{ErrorKind, MediaRecorder, RecorderError, RecorderEvent, RecorderOptions};

const WAIT: Duration = Duration::from_secs(5);

type Recorder = MediaRecorder<Arc<ManualCapture>>;

mod support {
    use super::*;

    /// Blocks encoder creation until the test opens the gate
    pub struct GatedFactory {
        pub gate: Mutex<std_mpsc::Receiver<()>>,
    }

    impl EncoderFactory for GatedFactory {
        fn create(&self, kind: EncoderKind) -> Result<Box<dyn AudioEncoder>, EncoderError> {
            let _ = self.gate.lock().unwrap().recv();
            DefaultEncoderFactory::new().create(kind)
        }
    }

    /// Encoder that fails on the first pushed frame
    pub struct BrokenEncoder;

    impl AudioEncoder for BrokenEncoder {
        fn init(&mut self, _params: EncoderParams) -> Result<(), EncoderError> {
            Ok(())
        }

        fn push(&mut self, _frame: AudioFrame) -> Result<(), EncoderError> {
            Err(EncoderError::EncodeFailed("device lost".into()))
        }

        fn flush(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
            Ok(Vec::new())
        }

        fn finish(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
            Ok(Vec::new())
        }
    }

    pub struct BrokenFactory;

    impl EncoderFactory for BrokenFactory {
        fn create(&self, _kind: EncoderKind) -> Result<Box<dyn AudioEncoder>, EncoderError> {
            Ok(Box::new(BrokenEncoder))
        }
    }

    pub fn wav_recorder(
        capture: &Arc<ManualCapture>,
        factory: impl EncoderFactory + 'static,
    ) -> (Recorder, UnboundedReceiver<RecorderEvent>) {
        let mut recorder = MediaRecorder::new(
            Arc::clone(capture),
            factory,
            RecorderOptions::with_mime_type("audio/wav"),
        )
        .unwrap();
        let events = recorder.take_events().unwrap();
        (recorder, events)
    }

    pub async fn next_event(events: &mut UnboundedReceiver<RecorderEvent>) -> RecorderEvent {
        timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event stream closed")
    }

    /// Collect events up to and including `Stop`
    pub async fn until_stop(events: &mut UnboundedReceiver<RecorderEvent>) -> Vec<RecorderEvent> {
        let mut seen = Vec::new();
        loop {
            let event = next_event(events).await;
            let stop = event == RecorderEvent::Stop;
            seen.push(event);
            if stop {
                return seen;
            }
        }
    }

    /// Wait until the encoder channel reaches `state`
    pub async fn worker_reaches(recorder: &Recorder, state: WorkerState) {
        timeout(WAIT, async {
            while recorder.worker_state() != state {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker state never reached");
    }

    pub fn chunk_sizes(events: &[RecorderEvent]) -> Vec<(usize, bool)> {
        events
            .iter()
            .filter_map(|e| match e {
                RecorderEvent::DataAvailable(chunk) => Some((chunk.size_bytes(), chunk.is_final())),
                _ => None,
            })
            .collect()
    }
}

use support::*;

#[tokio::test]
async fn start_push_stop_yields_one_final_chunk() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    assert_eq!(recorder.worker_state(), WorkerState::Encoding);

    assert_eq!(capture.push_silence(10, 4800), 10);
    recorder.stop().unwrap();
    assert_eq!(recorder.state(), RecorderState::Inactive);

    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest), vec![(WAVE_HEADER_LEN + 10 * 4800 * 2, true)]);
    assert_eq!(rest.len(), 2);
    assert!(!capture.is_connected());
}

#[tokio::test]
async fn stop_without_frames_still_delivers_final_chunk() {
    let capture = Arc::new(ManualCapture::new(2, 16000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    recorder.stop().unwrap();

    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest), vec![(WAVE_HEADER_LEN, true)]);
    assert_eq!(recorder.worker_state(), WorkerState::Closed);
}

#[tokio::test]
async fn one_second_timeslice_flushes_once_per_second() {
    let capture = Arc::new(ManualCapture::new(2, 48000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(Some(1000)).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);

    assert_eq!(capture.push_silence(48, 1000), 48);
    match next_event(&mut events).await {
        RecorderEvent::DataAvailable(chunk) => {
            assert!(!chunk.is_final());
            assert_eq!(chunk.size_bytes(), WAVE_HEADER_LEN + 48000 * 2 * 2);
            assert_eq!(chunk.mime_type(), "audio/wav");
        }
        other => panic!("expected data, got {:?}", other),
    }

    // Half a second more does not reach the next slice
    capture.push_silence(24, 1000);
    recorder.stop().unwrap();
    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest), vec![(24000 * 2 * 2, true)]);
}

#[tokio::test]
async fn flush_count_follows_elapsed_audio() {
    let capture = Arc::new(ManualCapture::new(1, 8000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(Some(250)).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);

    // 2.875 s of audio in 125 ms buffers
    capture.push_silence(23, 1000);
    recorder.stop().unwrap();

    let sizes = chunk_sizes(&until_stop(&mut events).await);
    let periodic = sizes.iter().filter(|(_, last)| !last).count();
    assert_eq!(periodic, 11);
    assert_eq!(sizes.iter().filter(|(_, last)| *last).count(), 1);
    let total: usize = sizes.iter().map(|(n, _)| n).sum();
    assert_eq!(total, WAVE_HEADER_LEN + 23 * 1000 * 2);
}

#[tokio::test]
async fn invalid_transitions_fail_without_events() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    assert!(matches!(recorder.pause(), Err(RecorderError::InvalidState(_))));
    assert!(matches!(recorder.resume(), Err(RecorderError::InvalidState(_))));
    assert!(matches!(recorder.stop(), Err(RecorderError::InvalidState(_))));
    assert!(matches!(recorder.request_data(), Err(RecorderError::InvalidState(_))));
    assert_eq!(recorder.state(), RecorderState::Inactive);

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    assert!(matches!(recorder.start(None), Err(RecorderError::InvalidState(_))));
    assert!(matches!(recorder.resume(), Err(RecorderError::InvalidState(_))));
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.stop().unwrap();
    let rest = until_stop(&mut events).await;
    // A second start would have produced a second Start before Stop
    assert!(!rest.contains(&RecorderEvent::Start));
}

#[tokio::test]
async fn negative_timeslice_is_rejected() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, _events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    assert!(matches!(recorder.start(Some(-1)), Err(RecorderError::InvalidTimeslice(_))));
    assert_eq!(recorder.state(), RecorderState::Inactive);
    recorder.start(Some(0)).unwrap();
}

#[tokio::test]
async fn pause_and_resume_do_not_restart() {
    let capture = Arc::new(ManualCapture::new(1, 16000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    capture.push_silence(2, 1600);

    recorder.pause().unwrap();
    assert_eq!(recorder.state(), RecorderState::Paused);
    assert_eq!(next_event(&mut events).await, RecorderEvent::Pause);
    assert_eq!(capture.push_silence(5, 1600), 0);

    recorder.resume().unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);
    assert_eq!(next_event(&mut events).await, RecorderEvent::Resume);
    assert_eq!(capture.push_silence(1, 1600), 1);

    recorder.stop().unwrap();
    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest), vec![(WAVE_HEADER_LEN + 3 * 1600 * 2, true)]);
}

#[tokio::test]
async fn resume_restarts_the_timeslice() {
    let capture = Arc::new(ManualCapture::new(1, 1000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(Some(100)).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    assert_eq!(capture.push_silence(9, 10), 9);

    recorder.pause().unwrap();
    recorder.resume().unwrap();
    // 90 ms before the pause plus 10 ms after would fill a slice without the reset
    assert_eq!(capture.push_silence(1, 10), 1);
    recorder.stop().unwrap();

    let rest = until_stop(&mut events).await;
    assert_eq!(rest[0], RecorderEvent::Pause);
    assert_eq!(rest[1], RecorderEvent::Resume);
    assert_eq!(chunk_sizes(&rest), vec![(WAVE_HEADER_LEN + 10 * 10 * 2, true)]);
}

#[tokio::test]
async fn encoder_ready_while_paused_starts_on_resume() {
    let (open, gate) = std_mpsc::channel();
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(
        &capture,
        GatedFactory {
            gate: Mutex::new(gate),
        },
    );

    recorder.start(None).unwrap();
    recorder.pause().unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Pause);

    open.send(()).unwrap();
    worker_reaches(&recorder, WorkerState::ReadyToInit).await;
    // No init while paused
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(recorder.worker_state(), WorkerState::ReadyToInit);
    assert!(!capture.is_connected());
    assert!(events.try_recv().is_err());

    recorder.resume().unwrap();
    assert_eq!(recorder.worker_state(), WorkerState::Encoding);
    assert!(capture.is_connected());
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    assert_eq!(next_event(&mut events).await, RecorderEvent::Resume);

    capture.push_silence(1, 480);
    recorder.stop().unwrap();
    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest), vec![(WAVE_HEADER_LEN + 960, true)]);
}

#[tokio::test]
async fn stop_while_paused_finishes_the_stream() {
    let capture = Arc::new(ManualCapture::new(1, 16000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    recorder.pause().unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Pause);

    recorder.stop().unwrap();
    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest).len(), 1);
}

#[tokio::test]
async fn request_data_flushes_immediately() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    capture.push_silence(1, 480);
    recorder.request_data().unwrap();

    match next_event(&mut events).await {
        RecorderEvent::DataAvailable(chunk) => {
            assert!(!chunk.is_final());
            assert_eq!(chunk.size_bytes(), WAVE_HEADER_LEN + 960);
        }
        other => panic!("expected data, got {:?}", other),
    }
    recorder.stop().unwrap();
    until_stop(&mut events).await;
}

#[tokio::test]
async fn start_waits_for_a_slow_encoder() {
    let (open, gate) = std_mpsc::channel();
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(
        &capture,
        GatedFactory {
            gate: Mutex::new(gate),
        },
    );

    recorder.start(None).unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);
    assert_eq!(recorder.worker_state(), WorkerState::Inactive);
    assert!(!capture.push_frame(AudioFrame::silence(1, 480, 48000)));
    assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());

    open.send(()).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    assert_eq!(recorder.worker_state(), WorkerState::Encoding);
    assert!(capture.is_connected());

    recorder.stop().unwrap();
    until_stop(&mut events).await;
}

#[tokio::test]
async fn encoder_fault_closes_the_channel() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(&capture, BrokenFactory);

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    capture.push_silence(1, 480);

    match next_event(&mut events).await {
        RecorderEvent::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::EncoderFault);
            assert_eq!(kind.name(), "UnknownError");
            assert!(message.contains("device lost"));
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(recorder.worker_state(), WorkerState::Closed);
    assert!(!capture.is_connected());
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.stop().unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Stop);
}

#[tokio::test]
async fn restart_uses_a_fresh_encoder() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    recorder.stop().unwrap();
    until_stop(&mut events).await;

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    capture.push_silence(1, 100);
    recorder.stop().unwrap();

    // A new stream starts with its own header
    let rest = until_stop(&mut events).await;
    assert_eq!(chunk_sizes(&rest), vec![(WAVE_HEADER_LEN + 200, true)]);
}

#[tokio::test]
async fn restart_before_final_chunk_arrives() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let (recorder, mut events) = wav_recorder(&capture, DefaultEncoderFactory::new());

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    recorder.stop().unwrap();
    recorder.start(None).unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);

    let mut seen = Vec::new();
    while !(seen.contains(&RecorderEvent::Stop) && seen.contains(&RecorderEvent::Start)) {
        seen.push(next_event(&mut events).await);
    }
    assert_eq!(chunk_sizes(&seen), vec![(WAVE_HEADER_LEN, true)]);
    assert_eq!(recorder.worker_state(), WorkerState::Encoding);
    assert!(capture.is_connected());
}

#[tokio::test]
async fn construction_errors() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let result = MediaRecorder::new(
        Arc::clone(&capture),
        DefaultEncoderFactory::new(),
        RecorderOptions::with_mime_type("audio/ogg;codecs=vorbis"),
    );
    assert!(matches!(result, Err(RecorderError::UnsupportedDescriptor(_))));

    let result = MediaRecorder::new(
        ManualCapture::without_track(),
        DefaultEncoderFactory::new(),
        RecorderOptions::default(),
    );
    assert!(matches!(result, Err(RecorderError::CaptureUnavailable(_))));
}

#[test]
fn construction_requires_a_runtime() {
    let result = MediaRecorder::new(
        ManualCapture::new(1, 48000),
        DefaultEncoderFactory::new(),
        RecorderOptions::default(),
    );
    assert!(matches!(result, Err(RecorderError::NoRuntime)));
}

#[tokio::test]
async fn accessors_report_negotiated_settings() {
    let track = TrackSettings {
        channel_count: None,
        sample_rate: 44100,
    };
    let recorder = MediaRecorder::new(
        ManualCapture::with_track(track),
        DefaultEncoderFactory::new(),
        RecorderOptions {
            mime_type: Some("audio/webm;codecs=opus".to_string()),
            audio_bits_per_second: None,
            bits_per_second: Some(96000),
        },
    )
    .unwrap();

    assert_eq!(recorder.mime_type(), "audio/webm");
    assert_eq!(recorder.encoder_kind(), EncoderKind::WebmOpus);
    assert_eq!(recorder.audio_bits_per_second(), Some(96000));
    assert_eq!(recorder.video_bits_per_second(), None);
    assert_eq!(recorder.sample_rate(), 44100);
    assert_eq!(recorder.channel_count(), 1);
}

#[tokio::test]
async fn default_descriptor_selects_ogg() {
    let recorder = MediaRecorder::new(
        ManualCapture::new(2, 48000),
        DefaultEncoderFactory::new(),
        RecorderOptions::default(),
    )
    .unwrap();
    assert_eq!(recorder.mime_type(), "audio/ogg");
    assert_eq!(recorder.encoder_kind(), EncoderKind::OggOpus);
}

#[cfg(not(feature = "opus"))]
#[tokio::test]
async fn missing_opus_support_surfaces_as_error_event() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let mut recorder = MediaRecorder::new(
        Arc::clone(&capture),
        DefaultEncoderFactory::new(),
        RecorderOptions::with_mime_type("audio/ogg"),
    )
    .unwrap();
    let mut events = recorder.take_events().unwrap();

    recorder.start(None).unwrap();
    match next_event(&mut events).await {
        RecorderEvent::Error { kind, .. } => assert_eq!(kind, ErrorKind::EncoderFault),
        other => panic!("expected error, got {:?}", other),
    }
    recorder.stop().unwrap();
    let rest = until_stop(&mut events).await;
    assert!(chunk_sizes(&rest).is_empty());
}

#[cfg(feature = "opus")]
#[tokio::test]
async fn ogg_recording_produces_pages() {
    let capture = Arc::new(ManualCapture::new(1, 48000));
    let mut recorder = MediaRecorder::new(
        Arc::clone(&capture),
        DefaultEncoderFactory::new(),
        RecorderOptions::with_mime_type("audio/ogg;codecs=opus"),
    )
    .unwrap();
    let mut events = recorder.take_events().unwrap();

    recorder.start(None).unwrap();
    assert_eq!(next_event(&mut events).await, RecorderEvent::Start);
    capture.push_silence(10, 4800);
    recorder.stop().unwrap();

    let rest = until_stop(&mut events).await;
    match &rest[0] {
        RecorderEvent::DataAvailable(chunk) => {
            assert!(chunk.is_final());
            assert!(chunk.data().starts_with(b"OggS"));
            assert_eq!(chunk.mime_type(), "audio/ogg");
        }
        other => panic!("expected data, got {:?}", other),
    }
}
