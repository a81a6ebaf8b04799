use ffmpeg::{Packet, codec::encoder, frame};
use tracing::trace;

use crate::EncoderError;

/// One unit of compressed output.
pub struct EncodedPacket(Packet);

impl EncodedPacket {
    pub fn data(&self) -> &[u8] {
        self.0.data().unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.0.size()
    }

    pub fn pts(&self) -> Option<i64> {
        self.0.pts()
    }

    pub fn dts(&self) -> Option<i64> {
        self.0.dts()
    }

    pub fn is_key(&self) -> bool {
        self.0.is_key()
    }
}

impl From<Packet> for EncodedPacket {
    fn from(packet: Packet) -> Self {
        Self(packet)
    }
}

impl std::fmt::Debug for EncodedPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedPacket")
            .field("size", &self.size())
            .field("pts", &self.pts())
            .field("dts", &self.dts())
            .field("key", &self.is_key())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Open,
    Flushed,
}

/// Submit/drain bookkeeping shared by every encoder wrapper.
pub struct EncoderBase {
    state: EncoderState,
    frames_submitted: u64,
}

impl EncoderBase {
    pub(crate) fn new() -> Self {
        Self {
            state: EncoderState::Open,
            frames_submitted: 0,
        }
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    pub fn send_frame(
        &mut self,
        frame: &frame::Video,
        encoder: &mut encoder::encoder::Encoder,
    ) -> Result<(), EncoderError> {
        if self.state == EncoderState::Flushed {
            return Err(EncoderError::Flushed);
        }

        encoder.send_frame(frame)?;
        self.frames_submitted += 1;

        Ok(())
    }

    /// Pulls packets until the encoder needs more input or has nothing left.
    pub fn receive_packets(
        &mut self,
        encoder: &mut encoder::encoder::Encoder,
    ) -> Result<Vec<EncodedPacket>, EncoderError> {
        let mut packets = Vec::new();

        loop {
            let mut packet = Packet::empty();

            match encoder.receive_packet(&mut packet) {
                Ok(()) => packets.push(EncodedPacket(packet)),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::ffi::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        trace!("Received {} packets", packets.len());

        Ok(packets)
    }

    pub fn process_eof(
        &mut self,
        encoder: &mut encoder::encoder::Encoder,
    ) -> Result<Vec<EncodedPacket>, EncoderError> {
        if self.state == EncoderState::Flushed {
            return Ok(Vec::new());
        }

        encoder.send_eof()?;
        self.state = EncoderState::Flushed;

        self.receive_packets(encoder)
    }
}
