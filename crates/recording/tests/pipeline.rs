use std::cell::Cell;

use fbcast_capture::{CaptureBuffer, CaptureError, DisplayCapture, PatternCapture, TestPattern};
use fbcast_enc_ffmpeg::{ElementaryStreamWriter, EncoderConfig, EncoderError, SEQUENCE_END_CODE};
use fbcast_frame_converter::ChromaSubsampling;
use fbcast_media_info::{FFRational, VideoInfo};
use fbcast_recording::{CapturePipeline, PipelineError, StopSignal};

const RED: TestPattern = TestPattern::SolidColor { r: 255, g: 0, b: 0 };

fn rawvideo_pipeline(
    width: u32,
    height: u32,
    pattern: TestPattern,
) -> CapturePipeline<PatternCapture, Vec<u8>> {
    ffmpeg::init().unwrap();

    let capture = PatternCapture::new(width, height, pattern).unwrap();
    let config = EncoderConfig::new("rawvideo", VideoInfo::yuv420p(width, height).unwrap());

    CapturePipeline::open(capture, config, ChromaSubsampling::default(), || {
        Ok(ElementaryStreamWriter::new(Vec::new()))
    })
    .unwrap()
}

/// Raises the stop signal once `limit` screenshots have been taken.
struct StopAfter {
    inner: PatternCapture,
    stop: StopSignal,
    limit: u64,
}

impl DisplayCapture for StopAfter {
    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn capture(&mut self) -> Result<CaptureBuffer, CaptureError> {
        let buffer = self.inner.capture()?;
        if self.inner.frames_captured() >= self.limit {
            self.stop.stop();
        }
        Ok(buffer)
    }
}

#[test]
fn step_stamps_consecutive_timestamps() {
    let mut pipeline = rawvideo_pipeline(4, 4, TestPattern::default());
    assert_eq!(pipeline.next_pts(), 0);

    let mut stamped = Vec::new();
    for expected in 1..=5 {
        let packets = pipeline.step().unwrap();
        assert_eq!(packets.len(), 1);
        stamped.extend(packets.iter().map(|packet| packet.pts()));
        assert_eq!(pipeline.next_pts(), expected);
    }

    // rawvideo carries each frame's pts onto its packet unchanged.
    assert_eq!(stamped, (0..5).map(Some).collect::<Vec<_>>());

    assert_eq!(pipeline.capture().frames_captured(), 5);
    assert_eq!(pipeline.encoder().frames_submitted(), 5);
}

#[test]
fn rawvideo_output_holds_converted_planes() {
    let pipeline = rawvideo_pipeline(2, 2, RED);

    let recording = pipeline.run(&StopSignal::new(), Some(2)).unwrap();

    // Y plane, then one Cb and one Cr sample per frame.
    let frame = [76, 76, 76, 76, 84, 255];
    assert_eq!(recording.sink, [frame, frame].concat());
    assert_eq!(recording.stats.frames_captured, 2);
    assert_eq!(recording.stats.packets_written, 2);
    assert_eq!(recording.stats.bytes_written, 12);
}

#[test]
fn frame_limit_bounds_the_run() {
    let pipeline = rawvideo_pipeline(4, 4, TestPattern::Checkerboard { size: 2 });

    let recording = pipeline.run(&StopSignal::new(), Some(3)).unwrap();

    assert_eq!(recording.stats.frames_captured, 3);
    assert_eq!(recording.sink.len(), 3 * (16 + 4 + 4));
}

#[test]
fn stop_before_start_writes_nothing() {
    let pipeline = rawvideo_pipeline(4, 4, TestPattern::default());
    let stop = StopSignal::new();
    stop.stop();

    let recording = pipeline.run(&stop, None).unwrap();

    assert_eq!(recording.stats.frames_captured, 0);
    assert!(recording.sink.is_empty());
}

#[test]
fn stop_signal_ends_the_loop_after_the_current_frame() {
    ffmpeg::init().unwrap();

    let stop = StopSignal::new();
    let capture = StopAfter {
        inner: PatternCapture::new(4, 4, TestPattern::default()).unwrap(),
        stop: stop.clone(),
        limit: 4,
    };
    let config = EncoderConfig::new("rawvideo", VideoInfo::yuv420p(4, 4).unwrap());
    let pipeline = CapturePipeline::open(capture, config, ChromaSubsampling::Average, || {
        Ok(ElementaryStreamWriter::new(Vec::new()))
    })
    .unwrap();

    let recording = pipeline.run(&stop, None).unwrap();

    assert_eq!(recording.stats.frames_captured, 4);
    assert_eq!(recording.stats.packets_written, 4);
}

#[test]
fn unknown_codec_never_opens_the_sink() {
    ffmpeg::init().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");
    let opened = Cell::new(false);

    let capture = PatternCapture::new(4, 4, TestPattern::default()).unwrap();
    let config = EncoderConfig::new("no-such-codec", VideoInfo::yuv420p(4, 4).unwrap());

    let result = CapturePipeline::open(capture, config, ChromaSubsampling::default(), || {
        opened.set(true);
        ElementaryStreamWriter::create(&path)
    });

    assert!(matches!(
        result,
        Err(PipelineError::Encoder(EncoderError::CodecNotFound(_)))
    ));
    assert!(!opened.get());
    assert!(!path.exists());
}

#[test]
fn capture_size_must_match_encoder() {
    ffmpeg::init().unwrap();

    let capture = PatternCapture::new(4, 4, TestPattern::default()).unwrap();
    let config = EncoderConfig::new("rawvideo", VideoInfo::yuv420p(2, 2).unwrap());

    let result = CapturePipeline::open(capture, config, ChromaSubsampling::default(), || {
        Ok(ElementaryStreamWriter::new(Vec::new()))
    });

    assert!(matches!(
        result,
        Err(PipelineError::DimensionMismatch {
            capture: (4, 4),
            encoder: (2, 2),
        })
    ));
}

#[test]
fn mpeg1_file_ends_with_sequence_end_code() {
    ffmpeg::init().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.mpg");

    let info = VideoInfo::yuv420p(32, 32)
        .unwrap()
        .with_time_base(FFRational(1, 25))
        .with_frame_rate(25);
    let capture = PatternCapture::new(32, 32, TestPattern::default()).unwrap();

    let pipeline = CapturePipeline::open(
        capture,
        EncoderConfig::new("mpeg1video", info),
        ChromaSubsampling::default(),
        || ElementaryStreamWriter::create(&path),
    )
    .unwrap();

    let recording = pipeline.run(&StopSignal::new(), Some(6)).unwrap();
    drop(recording.sink);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(recording.stats.frames_captured, 6);
    assert_eq!(recording.stats.packets_written, 6);
    assert_eq!(bytes.len() as u64, recording.stats.bytes_written);
    assert!(bytes.ends_with(&SEQUENCE_END_CODE));
    // MPEG-1 sequence header start code.
    assert_eq!(&bytes[..4], &[0x00, 0x00, 0x01, 0xB3]);
}
