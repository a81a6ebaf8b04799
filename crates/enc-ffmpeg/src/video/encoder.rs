use fbcast_media_info::{Pixel, VideoInfo};
use ffmpeg::{
    Dictionary,
    codec::{self, codec::Codec, context, encoder},
    frame,
};
use tracing::{debug, info};

use crate::{EncodedPacket, EncoderBase, EncoderState};

#[derive(thiserror::Error, Debug)]
pub enum EncoderError {
    #[error("{0}")]
    FFmpeg(#[from] ffmpeg::Error),
    #[error("Codec '{0}' not found")]
    CodecNotFound(String),
    #[error("Codec '{0}' is not a video encoder")]
    NotVideoCodec(String),
    #[error("Pixel format {0:?} not supported by codec '{1}'")]
    PixFmtNotSupported(Pixel, String),
    #[error("Encoder has already been flushed")]
    Flushed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum H264Preset {
    #[default]
    Slow,
    Medium,
    Ultrafast,
}

impl H264Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            H264Preset::Slow => "slow",
            H264Preset::Medium => "medium",
            H264Preset::Ultrafast => "ultrafast",
        }
    }
}

/// Everything needed to open a [`VideoEncoder`]. Fixed once the encoder is open.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub codec_name: String,
    pub video: VideoInfo,
    pub bitrate: usize,
    pub gop_size: u32,
    pub max_b_frames: usize,
    /// Only applied when the codec is H.264.
    pub preset: H264Preset,
}

impl EncoderConfig {
    pub const DEFAULT_BITRATE: usize = 4_000_000;
    pub const DEFAULT_GOP_SIZE: u32 = 10;
    pub const DEFAULT_MAX_B_FRAMES: usize = 1;

    pub fn new(codec_name: impl Into<String>, video: VideoInfo) -> Self {
        Self {
            codec_name: codec_name.into(),
            video,
            bitrate: Self::DEFAULT_BITRATE,
            gop_size: Self::DEFAULT_GOP_SIZE,
            max_b_frames: Self::DEFAULT_MAX_B_FRAMES,
            preset: H264Preset::default(),
        }
    }

    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = gop_size;
        self
    }

    pub fn with_max_b_frames(mut self, max_b_frames: usize) -> Self {
        self.max_b_frames = max_b_frames;
        self
    }

    pub fn with_preset(mut self, preset: H264Preset) -> Self {
        self.preset = preset;
        self
    }
}

/// A libavcodec video encoder resolved by name.
///
/// Frames go in with [`submit`](Self::submit) in presentation order; packets
/// come out of [`drain_ready`](Self::drain_ready) in decode order. Because of
/// B-frame reordering a submission may yield zero, one or several packets.
pub struct VideoEncoder {
    base: EncoderBase,
    encoder: encoder::Video,
    codec_id: codec::Id,
    codec_name: String,
    config: EncoderConfig,
}

impl VideoEncoder {
    pub fn open(config: EncoderConfig) -> Result<Self, EncoderError> {
        let codec = encoder::find_by_name(&config.codec_name)
            .ok_or_else(|| EncoderError::CodecNotFound(config.codec_name.clone()))?;

        let video_codec = codec
            .video()
            .map_err(|_| EncoderError::NotVideoCodec(config.codec_name.clone()))?;

        if let Some(mut formats) = video_codec.formats()
            && !formats.any(|f| f == config.video.pixel_format)
        {
            return Err(EncoderError::PixFmtNotSupported(
                config.video.pixel_format,
                config.codec_name.clone(),
            ));
        }

        info!("Resolved codec '{}' ({:?})", codec.name(), codec.id());

        let encoder_ctx = context::Context::new_with_codec(codec);
        let mut encoder = encoder_ctx.encoder().video()?;

        let video = &config.video;
        encoder.set_width(video.width);
        encoder.set_height(video.height);
        encoder.set_format(video.pixel_format);
        encoder.set_time_base(video.time_base);
        encoder.set_frame_rate(Some(video.frame_rate));
        encoder.set_bit_rate(config.bitrate);
        encoder.set_gop(config.gop_size);
        encoder.set_max_b_frames(config.max_b_frames);

        let encoder = encoder.open_with(get_codec_options(&codec, &config))?;

        info!(
            "Opened {} encoder: {}x{} {:?}, {} bps, gop {}, {} b-frames",
            codec.name(),
            video.width,
            video.height,
            video.pixel_format,
            config.bitrate,
            config.gop_size,
            config.max_b_frames
        );

        Ok(Self {
            base: EncoderBase::new(),
            encoder,
            codec_id: codec.id(),
            codec_name: codec.name().to_string(),
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn codec_id(&self) -> codec::Id {
        self.codec_id
    }

    pub fn state(&self) -> EncoderState {
        self.base.state()
    }

    pub fn frames_submitted(&self) -> u64 {
        self.base.frames_submitted()
    }

    /// MPEG-1/2 elementary streams end with an explicit sequence end code.
    pub fn needs_sequence_end_code(&self) -> bool {
        matches!(
            self.codec_id(),
            codec::Id::MPEG1VIDEO | codec::Id::MPEG2VIDEO
        )
    }

    /// Codec parameters of the open encoder, e.g. for building a matching decoder.
    pub fn parameters(&self) -> codec::Parameters {
        codec::Parameters::from(&self.encoder)
    }

    /// Hands a frame to the encoder. The encoder may keep a reference to the
    /// frame's buffers until it has emitted the corresponding packet.
    pub fn submit(&mut self, frame: &frame::Video) -> Result<(), EncoderError> {
        self.base.send_frame(frame, &mut self.encoder)
    }

    /// Every packet that is ready now. An empty result just means the encoder
    /// wants more input.
    pub fn drain_ready(&mut self) -> Result<Vec<EncodedPacket>, EncoderError> {
        self.base.receive_packets(&mut self.encoder)
    }

    /// Signals end of stream and returns the packets still buffered.
    pub fn flush(&mut self) -> Result<Vec<EncodedPacket>, EncoderError> {
        let packets = self.base.process_eof(&mut self.encoder)?;
        debug!("Flushed {} buffered packets", packets.len());
        Ok(packets)
    }
}

fn get_codec_options(codec: &Codec, config: &EncoderConfig) -> Dictionary<'static> {
    let mut options = Dictionary::new();

    if codec.id() == codec::Id::H264 {
        options.set("preset", config.preset.as_str());
    }

    options
}
