use fbcast_capture::CaptureBuffer;
use fbcast_enc_ffmpeg::{
    ElementaryStreamWriter, EncodedPacket, EncoderConfig, EncoderError, EncoderState,
    SEQUENCE_END_CODE, VideoEncoder,
};
use fbcast_frame_converter::{ColorSpaceConverter, PlaneDescriptor, ReusableFrame};
use fbcast_media_info::{FFRational, VideoInfo};
use ffmpeg::{codec, frame};

fn black_frame(info: &VideoInfo) -> ReusableFrame {
    let capture = CaptureBuffer::from_fn(info.width, info.height, |_, _| [0, 0, 0]);
    let mut frame = ReusableFrame::new(info).unwrap();
    ColorSpaceConverter::default()
        .convert(&capture, frame.make_writable().unwrap())
        .unwrap();
    frame
}

fn encode_all(
    encoder: &mut VideoEncoder,
    frame: &mut ReusableFrame,
    count: i64,
) -> Vec<EncodedPacket> {
    let mut packets = Vec::new();

    for pts in 0..count {
        let writable = frame.make_writable().unwrap();
        writable.set_pts(Some(pts));
        encoder.submit(frame.frame()).unwrap();
        packets.extend(encoder.drain_ready().unwrap());
    }

    packets.extend(encoder.flush().unwrap());
    packets
}

#[test]
fn unknown_codec_is_rejected() {
    ffmpeg::init().unwrap();

    let config = EncoderConfig::new("definitely-not-a-codec", VideoInfo::yuv420p(2, 2).unwrap());

    assert!(matches!(
        VideoEncoder::open(config),
        Err(EncoderError::CodecNotFound(name)) if name == "definitely-not-a-codec"
    ));
}

#[test]
fn drain_before_input_is_not_an_error() {
    ffmpeg::init().unwrap();

    let config = EncoderConfig::new("rawvideo", VideoInfo::yuv420p(2, 2).unwrap());
    let mut encoder = VideoEncoder::open(config).unwrap();

    assert!(encoder.drain_ready().unwrap().is_empty());
    assert_eq!(encoder.state(), EncoderState::Open);
}

#[test]
fn black_2x2_round_trips_through_decoder() {
    ffmpeg::init().unwrap();

    let info = VideoInfo::yuv420p(2, 2).unwrap();
    let mut encoder = VideoEncoder::open(EncoderConfig::new("rawvideo", info)).unwrap();
    let mut frame = black_frame(&info);

    let packets = encode_all(&mut encoder, &mut frame, 1);

    assert_eq!(packets.len(), 1);
    assert!(packets[0].size() > 0);
    assert!(!encoder.needs_sequence_end_code());

    let mut decoder = codec::context::Context::from_parameters(encoder.parameters())
        .unwrap()
        .decoder()
        .video()
        .unwrap();
    decoder
        .send_packet(&ffmpeg::Packet::copy(packets[0].data()))
        .unwrap();
    decoder.send_eof().unwrap();

    let mut decoded = frame::Video::empty();
    decoder.receive_frame(&mut decoded).unwrap();

    assert_eq!((decoded.width(), decoded.height()), (2, 2));
    let [luma, cb, cr] = PlaneDescriptor::yuv420p(&decoded);
    assert_eq!(&decoded.data(0)[..2], &[0, 0]);
    assert_eq!(&decoded.data(0)[luma.stride..luma.stride + 2], &[0, 0]);
    assert_eq!(decoded.data(cb.index)[0], 128);
    assert_eq!(decoded.data(cr.index)[0], 128);
}

#[test]
fn submit_after_flush_fails() {
    ffmpeg::init().unwrap();

    let info = VideoInfo::yuv420p(2, 2).unwrap();
    let mut encoder = VideoEncoder::open(EncoderConfig::new("rawvideo", info)).unwrap();
    let frame = black_frame(&info);

    encoder.flush().unwrap();
    assert_eq!(encoder.state(), EncoderState::Flushed);
    assert!(encoder.flush().unwrap().is_empty());
    // Past end of stream the encoder reports EOF, which drains as nothing.
    assert!(encoder.drain_ready().unwrap().is_empty());
    assert!(matches!(
        encoder.submit(frame.frame()),
        Err(EncoderError::Flushed)
    ));
}

#[test]
fn mpeg1_stream_gets_every_frame_and_end_code() {
    ffmpeg::init().unwrap();

    let info = VideoInfo::yuv420p(32, 32)
        .unwrap()
        .with_time_base(FFRational(1, 25))
        .with_frame_rate(25);
    let mut encoder = VideoEncoder::open(EncoderConfig::new("mpeg1video", info)).unwrap();
    assert!(encoder.needs_sequence_end_code());

    let mut frame = black_frame(&info);
    let packets = encode_all(&mut encoder, &mut frame, 5);

    assert_eq!(packets.len(), 5);
    assert!(packets.iter().all(|p| p.size() > 0));
    assert!(packets[0].is_key());

    let mut writer = ElementaryStreamWriter::new(Vec::new());
    writer.write_all(&packets).unwrap();
    let bytes = writer.finalize(encoder.needs_sequence_end_code()).unwrap();

    let expected: Vec<u8> = packets.iter().flat_map(|p| p.data().to_vec()).collect();
    assert_eq!(&bytes[..expected.len()], &expected[..]);
    assert_eq!(&bytes[expected.len()..], &SEQUENCE_END_CODE);
}
