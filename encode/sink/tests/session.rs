use encode_sink::{
    AudioStreamInfo, ChannelLayout, EncodeSession, Error, FailurePoint, MemoryBackend, Medium,
    MuxState, OutputTarget, PipelineSignal, PixelFormat, Pts, Rational, SampleFormat, SyncState,
    VideoFrame, VideoStreamInfo, PCM_FRAME_SIZE,
};

const RATE: u32 = 48000;
const SAMPLE_BYTES: usize = 4; // stereo s16

fn session(target: OutputTarget, backend: MemoryBackend) -> EncodeSession<MemoryBackend> {
    EncodeSession::init(target, backend).unwrap().unwrap()
}

fn with_video(target: OutputTarget, backend: MemoryBackend) -> EncodeSession<MemoryBackend> {
    let mut s = session(target, backend);
    s.configure_video(VideoStreamInfo::new(16, 16, PixelFormat::Yuv420p))
        .unwrap();
    s
}

fn with_audio(s: &mut EncodeSession<MemoryBackend>) {
    let info = AudioStreamInfo::new(RATE, ChannelLayout::Stereo, SampleFormat::S16);
    assert_eq!(s.configure_audio(info).unwrap(), info);
}

fn image() -> VideoFrame {
    VideoFrame::blank(16, 16, PixelFormat::Yuv420p)
}

fn samples(count: usize, fill: u8) -> Vec<u8> {
    vec![fill; count * SAMPLE_BYTES]
}

fn pts(s: &EncodeSession<MemoryBackend>, medium: Medium) -> Vec<i64> {
    s.backend()
        .packets_for(medium)
        .map(|p| p.pts.unwrap().0)
        .collect()
}

#[test]
fn gaps_stretch_the_held_frame() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    for time in [0.0, 0.04, 0.12] {
        s.submit_video(&image(), Some(time)).unwrap();
    }
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1, 3]);
    assert_eq!(s.counters().video_frames, 3);
}

#[test]
fn late_frames_are_dropped() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    for time in [0.0, 0.04, 0.12, 0.08] {
        s.submit_video(&image(), Some(time)).unwrap();
    }
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1, 3]);
}

#[test]
fn neverdrop_pushes_late_frames_forward() {
    let target = OutputTarget::new("a.mkv")
        .with_fps(25.0)
        .with_neverdrop(true);
    let mut s = with_video(target, MemoryBackend::new());
    for time in [0.0, 0.04, 0.12, 0.08] {
        s.submit_video(&image(), Some(time)).unwrap();
    }
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1, 3, 4]);
}

#[test]
fn neverdrop_keeps_pts_increasing_across_jumps() {
    let target = OutputTarget::new("a.mkv")
        .with_fps(25.0)
        .with_neverdrop(true);
    let mut s = with_video(target, MemoryBackend::new());
    let times = [0.0, 0.04, 0.04, 0.0, 0.12, 0.08, 0.08, 0.2, 0.16];
    for time in times {
        s.submit_video(&image(), Some(time)).unwrap();
    }
    s.finish();

    let written = pts(&s, Medium::Video);
    assert_eq!(written.len(), times.len());
    assert!(written.windows(2).all(|w| w[0] < w[1]), "{written:?}");
    assert_eq!(written, (0..9).collect::<Vec<_>>());
}

#[test]
fn harddup_repeats_every_tick() {
    let target = OutputTarget::new("a.mkv")
        .with_fps(25.0)
        .with_harddup(true);
    let mut s = with_video(target, MemoryBackend::new());
    s.submit_video(&image(), Some(0.0)).unwrap();
    s.submit_video(&image(), Some(0.12)).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1, 2, 3]);
}

#[test]
fn video_offset_shifts_timestamps() {
    let target = OutputTarget::new("a.mkv")
        .with_fps(25.0)
        .with_video_offset(0.2);
    let mut s = with_video(target, MemoryBackend::new());
    s.submit_video(&image(), Some(0.0)).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![5]);
}

#[test]
fn delayed_encoder_is_drained_at_finish() {
    let backend = MemoryBackend::new().with_encoder_delay(Medium::Video, 2);
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), backend);
    for time in [0.0, 0.04, 0.08] {
        s.submit_video(&image(), Some(time)).unwrap();
    }
    assert_eq!(s.backend().packets().len(), 0);
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1, 2]);
}

#[test]
fn container_time_base_rescales_packets() {
    let mut s = with_video(OutputTarget::new("a.ts").with_fps(25.0), MemoryBackend::new());
    assert_eq!(s.time_base(), Some(Rational::new(1, 25)));
    s.submit_video(&image(), Some(0.0)).unwrap();
    s.submit_video(&image(), Some(0.04)).unwrap();
    s.finish();

    assert_eq!(pts(&s, Medium::Video), vec![0, 3600]);
    let first = s.backend().packets_for(Medium::Video).next().unwrap();
    assert_eq!(first.time_base, Rational::new(1, 90000));
    assert_eq!(first.duration.0, 3600);
}

#[test]
fn streams_cannot_be_added_after_header() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    s.submit_video(&image(), Some(0.0)).unwrap();
    assert_eq!(s.mux_state(), MuxState::Written);

    let err = s.alloc_stream(Medium::Audio).unwrap_err();
    assert!(matches!(err, Error::StreamAfterHeader(Medium::Audio)));
    assert!(err.is_misuse());

    let info = AudioStreamInfo::new(RATE, ChannelLayout::Stereo, SampleFormat::F32);
    assert!(matches!(
        s.configure_audio(info),
        Err(Error::StreamAfterHeader(Medium::Audio))
    ));
}

#[test]
fn one_stream_per_medium() {
    let mut s = session(OutputTarget::new("a.mkv"), MemoryBackend::new());
    s.alloc_stream(Medium::Video).unwrap();
    assert!(matches!(
        s.alloc_stream(Medium::Video),
        Err(Error::DuplicateStream(Medium::Video))
    ));
}

#[test]
fn resolution_change_is_rejected() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    let bigger = VideoFrame::blank(32, 16, PixelFormat::Yuv420p);
    assert!(matches!(
        s.submit_video(&bigger, Some(0.0)),
        Err(Error::ResolutionChange { to_width: 32, .. })
    ));
    assert!(matches!(
        s.configure_video(VideoStreamInfo::new(32, 16, PixelFormat::Yuv420p)),
        Err(Error::ResolutionChange { .. })
    ));
    assert!(s
        .configure_video(VideoStreamInfo::new(16, 16, PixelFormat::Yuv420p))
        .is_ok());
}

#[test]
fn failed_header_is_not_retried() {
    let backend = MemoryBackend::new().with_failure(FailurePoint::WriteHeader);
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), backend);
    assert!(matches!(
        s.submit_video(&image(), Some(0.0)),
        Err(Error::Media(_))
    ));
    assert_eq!(s.mux_state(), MuxState::Failed);
    assert!(matches!(
        s.submit_video(&image(), Some(0.04)),
        Err(Error::HeaderFailed)
    ));

    s.finish();
    assert!(s.is_finished());
    assert!(!s.backend().trailer_written());
}

#[test]
fn unopenable_sink_fails_start() {
    let backend = MemoryBackend::new().with_failure(FailurePoint::OpenSink);
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), backend);
    assert!(matches!(s.start(), Err(Error::Media(_))));
    assert!(!s.backend().header_written());
}

#[test]
fn finish_is_idempotent() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    s.submit_video(&image(), Some(0.0)).unwrap();
    s.finish();

    let counters = s.counters();
    let output = s.backend().output().to_vec();
    assert!(s.backend().trailer_written());
    assert!(!s.backend().sink_open());
    assert_eq!(s.backend().closed_encoders(), &[Medium::Video]);

    s.finish();
    s.signal(PipelineSignal::Eos).unwrap();
    assert_eq!(s.counters(), counters);
    assert_eq!(s.backend().output(), output.as_slice());
    assert_eq!(s.backend().closed_encoders(), &[Medium::Video]);
}

#[test]
fn trailer_failure_still_closes_output() {
    let backend = MemoryBackend::new().with_failure(FailurePoint::WriteTrailer);
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), backend);
    s.submit_video(&image(), Some(0.0)).unwrap();
    s.finish();

    assert!(s.is_finished());
    assert!(!s.backend().trailer_written());
    assert!(!s.backend().sink_open());
    assert!(!s.backend().output().is_empty());
}

#[test]
fn finish_without_header_writes_nothing() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    s.finish();
    assert!(!s.backend().header_written());
    assert!(!s.backend().trailer_written());
    assert!(s.backend().output().is_empty());
}

#[test]
fn null_format_writes_no_file() {
    let target = OutputTarget::new("ignored").with_format("null").with_fps(25.0);
    let mut s = with_video(target, MemoryBackend::new());
    s.submit_video(&image(), Some(0.0)).unwrap();
    s.finish();
    assert!(s.backend().header_written());
    assert!(s.backend().output().is_empty());
    assert_eq!(pts(&s, Medium::Video), vec![0]);
}

#[test]
fn pcm_audio_is_cut_into_fixed_frames() {
    let mut s = session(OutputTarget::new("a.avi"), MemoryBackend::new());
    with_audio(&mut s);

    let data = samples(PCM_FRAME_SIZE * 2 + 100, 0x10);
    assert_eq!(s.submit_audio(&data, Some(0.0)).unwrap(), data.len());
    assert_eq!(pts(&s, Medium::Audio), vec![0, 16384]);

    s.finish();
    assert_eq!(pts(&s, Medium::Audio), vec![0, 16384, 32768]);

    let last = s.backend().packets_for(Medium::Audio).last().unwrap();
    assert_eq!(last.data.len(), PCM_FRAME_SIZE * SAMPLE_BYTES);
    assert!(last.data[..100 * SAMPLE_BYTES].iter().all(|&b| b == 0x10));
    assert!(last.data[100 * SAMPLE_BYTES..].iter().all(|&b| b == 0));
    assert_eq!(s.counters().audio_bytes, 3 * (PCM_FRAME_SIZE * SAMPLE_BYTES) as u64);
}

#[test]
fn partial_samples_are_not_consumed() {
    let mut s = session(OutputTarget::new("a.avi"), MemoryBackend::new());
    with_audio(&mut s);
    assert_eq!(s.submit_audio(&[0u8; 10], Some(0.0)).unwrap(), 8);
}

#[test]
fn negative_audio_offset_skips_across_calls() {
    let target = OutputTarget::new("a.avi").with_audio_offset(-0.5);
    let mut s = session(target, MemoryBackend::new());
    with_audio(&mut s);

    // 24000 samples to skip
    assert_eq!(s.submit_audio(&samples(16000, 1), Some(0.0)).unwrap(), 16000 * SAMPLE_BYTES);
    let mut second = samples(8000, 2);
    second.extend(samples(8000, 3));
    s.submit_audio(&second, Some(16000.0 / RATE as f64)).unwrap();
    assert_eq!(s.backend().packets().len(), 0);

    s.finish();
    let packets: Vec<_> = s.backend().packets_for(Medium::Audio).collect();
    assert_eq!(packets.len(), 1);
    let kept = 8000 * SAMPLE_BYTES;
    assert!(packets[0].data[..kept].iter().all(|&b| b == 3));
    assert!(packets[0].data[kept..].iter().all(|&b| b == 0));
}

#[test]
fn positive_audio_offset_pads_once() {
    let target = OutputTarget::new("a.avi").with_audio_offset(0.1);
    let mut s = session(target, MemoryBackend::new());
    with_audio(&mut s);

    // 4800 samples of silence come first
    s.submit_audio(&samples(PCM_FRAME_SIZE - 4800, 0x11), Some(0.0))
        .unwrap();
    s.submit_audio(&samples(PCM_FRAME_SIZE, 0x22), Some(0.2413))
        .unwrap();

    let packets: Vec<_> = s.backend().packets_for(Medium::Audio).collect();
    assert_eq!(packets.len(), 2);
    let pad = 4800 * SAMPLE_BYTES;
    assert!(packets[0].data[..pad].iter().all(|&b| b == 0));
    assert!(packets[0].data[pad..].iter().all(|&b| b == 0x11));
    assert!(packets[1].data.iter().all(|&b| b == 0x22));
}

#[test]
fn copyts_audio_stays_monotonic() {
    let target = OutputTarget::new("a.avi").with_copyts(true);
    let mut s = session(target, MemoryBackend::new());
    with_audio(&mut s);

    s.submit_audio(&samples(PCM_FRAME_SIZE, 1), Some(5.0)).unwrap();
    s.submit_audio(&samples(PCM_FRAME_SIZE, 1), Some(1.0)).unwrap();
    assert_eq!(pts(&s, Medium::Audio), vec![240000, 240001]);
    assert_eq!(s.sync_state(), SyncState::Unknown);
}

#[test]
fn video_follows_the_audio_clock() {
    let mut s = with_video(OutputTarget::new("a.avi").with_fps(25.0), MemoryBackend::new());
    with_audio(&mut s);

    s.submit_audio(&samples(PCM_FRAME_SIZE, 0), Some(10.0)).unwrap();
    assert_eq!(s.sync_state(), SyncState::Locked);

    s.submit_video(&image(), Some(10.0)).unwrap();
    s.submit_video(&image(), Some(10.04)).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1]);
}

#[test]
fn video_before_audio_guesses_the_skew() {
    let mut s = with_video(OutputTarget::new("a.avi").with_fps(25.0), MemoryBackend::new());
    with_audio(&mut s);

    s.submit_video(&image(), Some(3.0)).unwrap();
    assert_eq!(s.sync_state(), SyncState::Tentative);
    s.submit_video(&image(), Some(3.04)).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 1]);
}

#[test]
fn discontinuity_holds_video_until_audio_reports() {
    let mut s = with_video(OutputTarget::new("a.avi").with_fps(25.0), MemoryBackend::new());
    with_audio(&mut s);

    s.submit_audio(&samples(PCM_FRAME_SIZE, 0), Some(0.0)).unwrap();
    s.submit_video(&image(), Some(0.0)).unwrap();

    s.signal(PipelineSignal::Flush).unwrap();
    assert_eq!(s.sync_state(), SyncState::ForcedInvalid);

    s.submit_video(&image(), Some(1.0)).unwrap();
    assert_eq!(pts(&s, Medium::Video), Vec::<i64>::new());

    // skew becomes 16384/48000 - 1.0, so video at 1.0 lands on 0.3413s
    s.submit_audio(&samples(PCM_FRAME_SIZE, 0), Some(1.0)).unwrap();
    assert_eq!(s.sync_state(), SyncState::Locked);
    s.submit_video(&image(), Some(1.0)).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![0, 9]);
}

#[test]
fn copyts_passes_video_times_through() {
    let target = OutputTarget::new("a.avi").with_fps(25.0).with_copyts(true);
    let mut s = with_video(target, MemoryBackend::new());
    with_audio(&mut s);

    s.submit_audio(&samples(PCM_FRAME_SIZE, 0), Some(10.0)).unwrap();
    s.submit_video(&image(), Some(2.0)).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![50]);
}

#[test]
fn frame_timestamp_is_used_without_time() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    let mut frame = image();
    frame.pts = Some(Pts(2));
    frame.time_base = Rational::new(1, 10);
    s.submit_video(&frame, None).unwrap();
    s.finish();
    assert_eq!(pts(&s, Medium::Video), vec![5]);
}

#[test]
fn status_reports_progress() {
    let mut s = with_video(OutputTarget::new("a.mkv").with_fps(25.0), MemoryBackend::new());
    for time in [0.0, 0.04, 0.08] {
        s.submit_video(&image(), Some(time)).unwrap();
    }
    let status = s.status(0.25, 0.08);
    assert!(status.starts_with("{25.0% "));
    assert!(status.ends_with("MB}"));
}
