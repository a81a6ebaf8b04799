use std::{io, io::Write};

use fbcast_capture::{CaptureError, DisplayCapture};
use fbcast_enc_ffmpeg::{
    ElementaryStreamWriter, EncodedPacket, EncoderConfig, EncoderError, SEQUENCE_END_CODE,
    VideoEncoder,
};
use fbcast_frame_converter::{
    ChromaSubsampling, ColorSpaceConverter, ConvertError, ReusableFrame,
};
use tracing::{debug, info, trace, warn};

use crate::StopSignal;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("Convert: {0}")]
    Convert(#[from] ConvertError),
    #[error("Encoder: {0}")]
    Encoder(#[from] EncoderError),
    #[error("Output: {0}")]
    Io(#[from] io::Error),
    #[error("Capture is {capture:?} but the encoder expects {encoder:?}")]
    DimensionMismatch {
        capture: (u32, u32),
        encoder: (u32, u32),
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_captured: u64,
    pub packets_written: u64,
    pub bytes_written: u64,
}

/// Result of a completed capture session.
#[derive(Debug)]
pub struct FinishedRecording<W> {
    pub stats: PipelineStats,
    pub sink: W,
}

/// Owns every resource of a capture session: the display, the conversion
/// frame, the encoder and the output stream.
///
/// Each [`step`](Self::step) captures one screenshot, converts it into the
/// reusable frame, stamps the next presentation timestamp and writes out
/// whatever the encoder hands back. [`finish`](Self::finish) drains the
/// encoder and finalizes the stream.
pub struct CapturePipeline<C: DisplayCapture, W: Write> {
    capture: C,
    converter: ColorSpaceConverter,
    frame: ReusableFrame,
    encoder: VideoEncoder,
    writer: ElementaryStreamWriter<W>,
    next_pts: i64,
    frames_captured: u64,
}

impl<C: DisplayCapture, W: Write> CapturePipeline<C, W> {
    /// Opens the encoder for `config`, then the sink.
    ///
    /// `open_sink` only runs once the encoder is open, so a bad codec or
    /// mismatched dimensions never leave an output file behind.
    pub fn open(
        capture: C,
        config: EncoderConfig,
        subsampling: ChromaSubsampling,
        open_sink: impl FnOnce() -> io::Result<ElementaryStreamWriter<W>>,
    ) -> Result<Self, PipelineError> {
        check_dimensions(&capture, &config)?;

        let encoder = VideoEncoder::open(config)?;
        let writer = open_sink()?;

        Self::new(capture, encoder, writer, subsampling)
    }

    pub fn new(
        capture: C,
        encoder: VideoEncoder,
        writer: ElementaryStreamWriter<W>,
        subsampling: ChromaSubsampling,
    ) -> Result<Self, PipelineError> {
        check_dimensions(&capture, encoder.config())?;

        let frame = ReusableFrame::new(&encoder.config().video)?;

        debug!(
            "Pipeline ready: {}x{} via '{}' ({subsampling} chroma)",
            frame.width(),
            frame.height(),
            encoder.codec_name()
        );

        Ok(Self {
            capture,
            converter: ColorSpaceConverter::new(subsampling),
            frame,
            encoder,
            writer,
            next_pts: 0,
            frames_captured: 0,
        })
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn encoder(&self) -> &VideoEncoder {
        &self.encoder
    }

    /// Timestamp the next captured frame will carry.
    pub fn next_pts(&self) -> i64 {
        self.next_pts
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames_captured: self.frames_captured,
            packets_written: self.writer.packets_written(),
            bytes_written: self.writer.bytes_written(),
        }
    }

    /// Runs a single capture, convert, encode and write iteration and returns
    /// the packets it wrote.
    pub fn step(&mut self) -> Result<Vec<EncodedPacket>, PipelineError> {
        let frame = self.frame.make_writable()?;

        let buffer = self.capture.capture()?;
        self.converter.convert(&buffer, frame)?;
        drop(buffer);

        frame.set_pts(Some(self.next_pts));
        trace!("Captured frame pts={}", self.next_pts);
        self.next_pts += 1;

        self.encoder.submit(self.frame.frame())?;
        self.frames_captured += 1;

        let packets = self.encoder.drain_ready()?;
        self.write_packets(&packets)?;

        Ok(packets)
    }

    /// Steps until `stop` is raised or `max_frames` have been captured, then
    /// finishes the stream.
    ///
    /// The stop flag is checked before every iteration, so a frame already
    /// in flight is always written out.
    pub fn run(
        mut self,
        stop: &StopSignal,
        max_frames: Option<u64>,
    ) -> Result<FinishedRecording<W>, PipelineError> {
        info!("Capture loop started");

        loop {
            if stop.is_stopped() {
                info!("Stop requested after {} frames", self.frames_captured);
                break;
            }

            if let Some(max_frames) = max_frames
                && self.frames_captured >= max_frames
            {
                debug!("Reached frame limit of {max_frames}");
                break;
            }

            self.step()?;
        }

        self.finish()
    }

    /// Flushes the encoder, writes the remaining packets and finalizes the
    /// output, appending a sequence end code for codecs that expect one.
    pub fn finish(mut self) -> Result<FinishedRecording<W>, PipelineError> {
        let packets = self.encoder.flush()?;
        self.write_packets(&packets)?;

        if self.frames_captured == 0 {
            warn!("No frames were captured");
        }

        let mut stats = self.stats();
        let end_code = self.encoder.needs_sequence_end_code();
        let sink = self.writer.finalize(end_code)?;

        if end_code {
            stats.bytes_written += SEQUENCE_END_CODE.len() as u64;
        }

        info!(
            frames = stats.frames_captured,
            packets = stats.packets_written,
            bytes = stats.bytes_written,
            "Capture finished"
        );

        Ok(FinishedRecording { stats, sink })
    }

    fn write_packets(&mut self, packets: &[EncodedPacket]) -> io::Result<()> {
        if !packets.is_empty() {
            trace!("Writing {} packets", packets.len());
        }

        self.writer.write_all(packets)
    }
}

fn check_dimensions(
    capture: &impl DisplayCapture,
    config: &EncoderConfig,
) -> Result<(), PipelineError> {
    let capture = (capture.width(), capture.height());
    let encoder = (config.video.width, config.video.height);

    if capture != encoder {
        return Err(PipelineError::DimensionMismatch { capture, encoder });
    }

    Ok(())
}
