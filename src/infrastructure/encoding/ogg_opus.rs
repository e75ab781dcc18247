//! Opus in an Ogg container

use std::mem;

use ogg::writing::{PacketWriteEndInfo, PacketWriter};

use super::opus_stream::{opus_head, opus_tags, OpusPacket, OpusPacketizer, OPUS_FRAME_SIZE, PRE_SKIP};
use crate::application::ports::{AudioEncoder, EncoderError, EncoderParams};
use crate::domain::audio::AudioFrame;

const VENDOR: &str = "media-recorder";

/// Ogg/Opus encoder.
///
/// The newest packet is held back so the stream can end on a page flagged
/// end-of-stream, and every flush closes the current page so each chunk
/// consists of complete pages.
pub struct OggOpusEncoder {
    packetizer: Option<OpusPacketizer>,
    writer: PacketWriter<'static, Vec<u8>>,
    serial: u32,
    held: Option<OpusPacket>,
}

impl OggOpusEncoder {
    pub fn new() -> Self {
        Self {
            packetizer: None,
            writer: PacketWriter::new(Vec::new()),
            serial: stream_serial(),
            held: None,
        }
    }

    fn write(&mut self, packet: Vec<u8>, end: PacketWriteEndInfo, granule: u64) -> Result<(), EncoderError> {
        self.writer
            .write_packet(packet, self.serial, end, granule)
            .map_err(|e| EncoderError::EncodeFailed(format!("failed to write Ogg page: {}", e)))
    }

    fn write_held(&mut self, end: PacketWriteEndInfo) -> Result<(), EncoderError> {
        if let Some(packet) = self.held.take() {
            let granule = page_granule(&packet);
            self.write(packet.data, end, granule)?;
        }
        Ok(())
    }

    fn take_bytes(&mut self) -> Vec<Vec<u8>> {
        let bytes = mem::take(self.writer.inner_mut());
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

impl Default for OggOpusEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEncoder for OggOpusEncoder {
    fn init(&mut self, params: EncoderParams) -> Result<(), EncoderError> {
        let packetizer = OpusPacketizer::new(params)?;
        let head = opus_head(packetizer.channels(), packetizer.input_rate());
        self.packetizer = Some(packetizer);

        self.write(head, PacketWriteEndInfo::EndPage, 0)?;
        self.write(opus_tags(VENDOR), PacketWriteEndInfo::EndPage, 0)
    }

    fn push(&mut self, frame: AudioFrame) -> Result<(), EncoderError> {
        let packets = self.packetizer("pushInputData")?.push(frame)?;
        for packet in packets {
            if let Some(previous) = self.held.replace(packet) {
                let granule = page_granule(&previous);
                self.write(previous.data, PacketWriteEndInfo::NormalPacket, granule)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        self.packetizer("getEncodedData")?;
        self.write_held(PacketWriteEndInfo::EndPage)?;
        Ok(self.take_bytes())
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, EncoderError> {
        let packetizer = self.packetizer("done")?;
        let mut packets = packetizer.finish()?;
        // Trim the padding of the final packet through its granule position
        let end_granule = u64::from(PRE_SKIP) + packetizer.output_samples();

        self.write_held(PacketWriteEndInfo::NormalPacket)?;
        let last = packets.pop();
        for packet in packets {
            let granule = page_granule(&packet);
            self.write(packet.data, PacketWriteEndInfo::NormalPacket, granule)?;
        }
        if let Some(last) = last {
            let granule = end_granule.max(page_granule(&last) - OPUS_FRAME_SIZE as u64);
            self.write(last.data, PacketWriteEndInfo::EndStream, granule)?;
        }

        self.packetizer = None;
        Ok(self.take_bytes())
    }
}

/// Granule position of a page ending with `packet`, counted from the start
/// of the pre-skip
fn page_granule(packet: &OpusPacket) -> u64 {
    u64::from(PRE_SKIP) + packet.end_sample()
}

/// Pseudo-random serial number for the Ogg logical stream
fn stream_serial() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    (now.as_secs() as u32) ^ now.subsec_nanos()
}
