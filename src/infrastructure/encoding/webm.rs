//! Opus in a WebM container
//!
//! A minimal live-style muxer: EBML header and an unknown-size Segment with
//! Info and Tracks, followed by one Cluster of SimpleBlocks per flush.

use std::mem;

use super::opus_stream::{opus_head, OpusPacket, OpusPacketizer, OPUS_SAMPLE_RATE, PRE_SKIP};
use crate::application::ports::{AudioEncoder, EncoderError, EncoderParams};
use crate::domain::audio::AudioFrame;

mod id {
    pub const EBML: u32 = 0x1A45_DFA3;
    pub const EBML_VERSION: u32 = 0x4286;
    pub const EBML_READ_VERSION: u32 = 0x42F7;
    pub const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
    pub const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
    pub const DOC_TYPE: u32 = 0x4282;
    pub const DOC_TYPE_VERSION: u32 = 0x4287;
    pub const DOC_TYPE_READ_VERSION: u32 = 0x4285;
    pub const SEGMENT: u32 = 0x1853_8067;
    pub const INFO: u32 = 0x1549_A966;
    pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
    pub const MUXING_APP: u32 = 0x4D80;
    pub const WRITING_APP: u32 = 0x5741;
    pub const TRACKS: u32 = 0x1654_AE6B;
    pub const TRACK_ENTRY: u32 = 0xAE;
    pub const TRACK_NUMBER: u32 = 0xD7;
    pub const TRACK_UID: u32 = 0x73C5;
    pub const TRACK_TYPE: u32 = 0x83;
    pub const CODEC_ID: u32 = 0x86;
    pub const CODEC_PRIVATE: u32 = 0x63A2;
    pub const CODEC_DELAY: u32 = 0x56AA;
    pub const SEEK_PRE_ROLL: u32 = 0x56BB;
    pub const AUDIO: u32 = 0xE1;
    pub const SAMPLING_FREQUENCY: u32 = 0xB5;
    pub const CHANNELS: u32 = 0x9F;
    pub const CLUSTER: u32 = 0x1F43_B675;
    pub const TIMECODE: u32 = 0xE7;
    pub const SIMPLE_BLOCK: u32 = 0xA3;
}

const APP_NAME: &str = "media-recorder";

/// Size field meaning "unknown", used for the live Segment
const UNKNOWN_SIZE: [u8; 8] = [0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

/// Largest block offset a Cluster may hold, in milliseconds
const MAX_CLUSTER_SPAN_MS: u64 = i16::MAX as u64;

const TRACK: u64 = 1;

/// WebM/Opus encoder
#[derive(Default)]
pub struct WebmOpusEncoder {
    packetizer: Option<OpusPacketizer>,
    header: Vec<u8>,
    packets: Vec<OpusPacket>,
}

impl WebmOpusEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_clusters(&mut self) -> Vec<Vec<u8>> {
        let mut bytes = mem::take(&mut self.header);
        for cluster in clusters(&mem::take(&mut self.packets)) {
            bytes.extend(cluster);
        }
        if bytes.is_empty() {
            Vec::new()
        } else {
            vec![bytes]
        }
    }

    fn packetizer(&mut self, command: &'static str) -> Result<&mut OpusPacketizer, EncoderError> {
        self.packetizer.as_mut().ok_or(EncoderError::NotInitialized(command))
    }
}

impl AudioEncoder for WebmOpusEncoder {
    fn init(&mut self, params: EncoderParams) -> Result<(), EncoderError> {
        let packetizer = OpusPacketizer::new(params)?;
        self.header = stream_header(packetizer.channels(), packetizer.input_rate());
        self.packets.clear();
        self.packetizer = Some(packetizer);
        Ok(())
    }

    fn push(&mut self, frame: AudioFrame) -> Result<(), EncoderError> {
        let packets = self.packetizer("pushInputData")?.push(frame)?;
        self.packets.extend(packets);
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        self.packetizer("getEncodedData")?;
        Ok(self.take_clusters())
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        let packets = self.packetizer("done")?.finish()?;
        self.packets.extend(packets);
        self.packetizer = None;
        Ok(self.take_clusters())
    }
}

fn stream_header(channels: usize, input_rate: u32) -> Vec<u8> {
    let mut ebml = Vec::new();
    put_uint(&mut ebml, id::EBML_VERSION, 1);
    put_uint(&mut ebml, id::EBML_READ_VERSION, 1);
    put_uint(&mut ebml, id::EBML_MAX_ID_LENGTH, 4);
    put_uint(&mut ebml, id::EBML_MAX_SIZE_LENGTH, 8);
    put_element(&mut ebml, id::DOC_TYPE, b"webm");
    put_uint(&mut ebml, id::DOC_TYPE_VERSION, 4);
    put_uint(&mut ebml, id::DOC_TYPE_READ_VERSION, 2);

    let mut info = Vec::new();
    put_uint(&mut info, id::TIMECODE_SCALE, 1_000_000);
    put_element(&mut info, id::MUXING_APP, APP_NAME.as_bytes());
    put_element(&mut info, id::WRITING_APP, APP_NAME.as_bytes());

    let mut audio = Vec::new();
    put_element(&mut audio, id::SAMPLING_FREQUENCY, &f64::from(OPUS_SAMPLE_RATE).to_be_bytes());
    put_uint(&mut audio, id::CHANNELS, channels as u64);

    let mut entry = Vec::new();
    put_uint(&mut entry, id::TRACK_NUMBER, TRACK);
    put_uint(&mut entry, id::TRACK_UID, TRACK);
    put_uint(&mut entry, id::TRACK_TYPE, 2); // audio
    put_element(&mut entry, id::CODEC_ID, b"A_OPUS");
    put_element(&mut entry, id::CODEC_PRIVATE, &opus_head(channels, input_rate));
    // Nanoseconds
    put_uint(
        &mut entry,
        id::CODEC_DELAY,
        u64::from(PRE_SKIP) * 1_000_000_000 / u64::from(OPUS_SAMPLE_RATE),
    );
    put_uint(&mut entry, id::SEEK_PRE_ROLL, 80_000_000);
    put_element(&mut entry, id::AUDIO, &audio);

    let mut tracks = Vec::new();
    put_element(&mut tracks, id::TRACK_ENTRY, &entry);

    let mut out = Vec::new();
    put_element(&mut out, id::EBML, &ebml);
    put_id(&mut out, id::SEGMENT);
    out.extend_from_slice(&UNKNOWN_SIZE);
    put_element(&mut out, id::INFO, &info);
    put_element(&mut out, id::TRACKS, &tracks);
    out
}

/// Group packets into Clusters whose block offsets fit in an i16
fn clusters(packets: &[OpusPacket]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = packets;
    while let Some(first) = rest.first() {
        let base = first.timestamp_ms();
        let len = rest
            .iter()
            .take_while(|p| p.timestamp_ms() - base <= MAX_CLUSTER_SPAN_MS)
            .count();
        let (group, tail) = rest.split_at(len);

        let mut body = Vec::new();
        put_uint(&mut body, id::TIMECODE, base);
        for packet in group {
            let offset = (packet.timestamp_ms() - base) as i16;
            let mut block = Vec::with_capacity(4 + packet.data.len());
            block.push(0x80 | TRACK as u8); // track number as a 1-byte vint
            block.extend_from_slice(&offset.to_be_bytes());
            block.push(0x80); // keyframe
            block.extend_from_slice(&packet.data);
            put_element(&mut body, id::SIMPLE_BLOCK, &block);
        }

        let mut cluster = Vec::new();
        put_element(&mut cluster, id::CLUSTER, &body);
        out.push(cluster);
        rest = tail;
    }
    out
}

fn put_id(out: &mut Vec<u8>, id: u32) {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.extend_from_slice(&bytes[skip..]);
}

/// EBML variable-length size, shortest form
fn put_size(out: &mut Vec<u8>, size: u64) {
    let len = (1..=8u32)
        .find(|n| size < (1u64 << (7 * n)) - 1)
        .unwrap_or(8);
    let marked = size | (1u64 << (7 * len));
    out.extend_from_slice(&marked.to_be_bytes()[(8 - len as usize)..]);
}

fn put_element(out: &mut Vec<u8>, id: u32, payload: &[u8]) {
    put_id(out, id);
    put_size(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

fn put_uint(out: &mut Vec<u8>, id: u32, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    put_element(out, id, &bytes[skip..]);
}
