/*!
    In-process backend.

    Simulates containers and encoders without compressing anything. Encoders
    pass timestamps through (optionally holding frames back), the sink keeps
    the written bytes in memory, and every interaction is recorded so callers
    can inspect what a session did. Useful as a dry-run sink and in tests.
*/

use std::collections::VecDeque;

use tracing::debug;

use encode_types::{
    AudioFrame, Error, MediaDuration, Medium, Packet, PixelFormat, Rational, Result, SampleFormat,
    VideoFrame,
};

use super::tables::{encoder_options, format_options};
use super::{Backend, EncoderDescriptor, EncoderSetup, OptionScope, OutputFormat};
use crate::options::{Dictionary, OptionKind, OptionSpec, value_has_flag};

const HEADER_MAGIC: &[u8; 4] = b"MEMF";
const TRAILER_MAGIC: &[u8; 4] = b"MEMT";
const PACKET_FRAMING: usize = 12;

/**
    Operations that can be made to fail on purpose.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePoint {
    OpenSink,
    WriteHeader,
    WritePacket,
    WriteTrailer,
    OpenEncoder(Medium),
}

struct MemoryEncoder {
    descriptor: EncoderDescriptor,
    time_base: Rational,
    delay: usize,
    queue: VecDeque<Packet>,
    options: Vec<(String, String)>,
    stats_in: Option<Vec<u8>>,
    pass1: bool,
    pending_stats: String,
    frames_in: u64,
    frames_out: u64,
    open: bool,
}

impl MemoryEncoder {
    fn new(descriptor: EncoderDescriptor, delay: usize) -> Self {
        Self {
            descriptor,
            time_base: Rational::new(1, 1),
            delay,
            queue: VecDeque::new(),
            options: Vec::new(),
            stats_in: None,
            pass1: false,
            pending_stats: String::new(),
            frames_in: 0,
            frames_out: 0,
            open: false,
        }
    }

    fn push(&mut self, packet: Option<Packet>) -> Result<Option<Packet>> {
        if !self.open {
            return Err(Error::codec(format!(
                "{} encoder is not open",
                self.descriptor.name
            )));
        }
        let draining = packet.is_none();
        if let Some(packet) = packet {
            self.frames_in += 1;
            self.queue.push_back(packet);
        }
        if !draining && self.queue.len() <= self.delay {
            return Ok(None);
        }
        let Some(mut out) = self.queue.pop_front() else {
            return Ok(None);
        };
        out.is_keyframe = out.medium == Medium::Audio || self.frames_out % 12 == 0;
        self.frames_out += 1;
        if self.pass1 {
            self.pending_stats.push_str(&format!(
                "in:{} out:{} type:{} q:2.00 size:{};\n",
                self.frames_in - 1,
                self.frames_out - 1,
                if out.is_keyframe { 'I' } else { 'P' },
                out.data.len()
            ));
        }
        Ok(Some(out))
    }
}

#[derive(Default)]
struct Streams {
    video: Option<MemoryEncoder>,
    audio: Option<MemoryEncoder>,
}

impl Streams {
    fn get(&self, medium: Medium) -> Option<&MemoryEncoder> {
        match medium {
            Medium::Video => self.video.as_ref(),
            Medium::Audio => self.audio.as_ref(),
        }
    }

    fn get_mut(&mut self, medium: Medium) -> Option<&mut MemoryEncoder> {
        match medium {
            Medium::Video => self.video.as_mut(),
            Medium::Audio => self.audio.as_mut(),
        }
    }

    fn slot(&mut self, medium: Medium) -> &mut Option<MemoryEncoder> {
        match medium {
            Medium::Video => &mut self.video,
            Medium::Audio => &mut self.audio,
        }
    }
}

/**
    Backend that keeps everything in memory.
*/
pub struct MemoryBackend {
    formats: Vec<(OutputFormat, &'static [&'static str])>,
    encoders: Vec<EncoderDescriptor>,
    extra_options: Vec<OptionSpec>,
    video_delay: usize,
    audio_delay: usize,
    stream_time_base: Option<Rational>,
    failures: Vec<FailurePoint>,
    format: Option<OutputFormat>,
    streams: Streams,
    chosen_time_bases: Vec<(Medium, Rational)>,
    sink: Option<Vec<u8>>,
    output: Vec<u8>,
    header_options: Vec<(String, String)>,
    header_written: bool,
    trailer_written: bool,
    packets: Vec<Packet>,
    closed_encoders: Vec<Medium>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /**
        Create a backend with the built-in formats and encoders.
    */
    pub fn new() -> Self {
        Self {
            formats: builtin_formats(),
            encoders: builtin_encoders(),
            extra_options: Vec::new(),
            video_delay: 0,
            audio_delay: 0,
            stream_time_base: None,
            failures: Vec::new(),
            format: None,
            streams: Streams::default(),
            chosen_time_bases: Vec::new(),
            sink: None,
            output: Vec::new(),
            header_options: Vec::new(),
            header_written: false,
            trailer_written: false,
            packets: Vec::new(),
            closed_encoders: Vec::new(),
        }
    }

    /**
        Hold back `frames` input frames in the encoder of `medium`; they are
        only released when more input arrives or on drain.
    */
    pub fn with_encoder_delay(mut self, medium: Medium, frames: usize) -> Self {
        match medium {
            Medium::Video => self.video_delay = frames,
            Medium::Audio => self.audio_delay = frames,
        }
        self
    }

    /**
        Force every stream to use `time_base` once the header is written,
        overriding the format's own choice.
    */
    pub fn with_stream_time_base(mut self, time_base: Rational) -> Self {
        self.stream_time_base = Some(time_base);
        self
    }

    /**
        Make `point` fail.
    */
    pub fn with_failure(mut self, point: FailurePoint) -> Self {
        self.failures.push(point);
        self
    }

    /**
        Register an additional encoder.
    */
    pub fn with_encoder(mut self, descriptor: EncoderDescriptor) -> Self {
        self.encoders.retain(|e| e.name != descriptor.name);
        self.encoders.push(descriptor);
        self
    }

    /**
        Accept `spec` on every encoder and container, as a library build with
        options beyond the built-in tables would.
    */
    pub fn with_option(mut self, spec: OptionSpec) -> Self {
        self.extra_options.push(spec);
        self
    }

    /**
        Packets written so far, in write order.
    */
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /**
        Packets written so far for one stream.
    */
    pub fn packets_for(&self, medium: Medium) -> impl Iterator<Item = &Packet> {
        self.packets.iter().filter(move |p| p.medium == medium)
    }

    /**
        Bytes of the closed output, or of the open sink.
    */
    pub fn output(&self) -> &[u8] {
        self.sink.as_deref().unwrap_or(&self.output)
    }

    pub fn sink_open(&self) -> bool {
        self.sink.is_some()
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn trailer_written(&self) -> bool {
        self.trailer_written
    }

    /**
        Options the header write consumed.
    */
    pub fn header_options(&self) -> &[(String, String)] {
        &self.header_options
    }

    /**
        Options the encoder of `medium` consumed when it was opened.
    */
    pub fn encoder_options(&self, medium: Medium) -> Option<&[(String, String)]> {
        self.streams.get(medium).map(|e| e.options.as_slice())
    }

    /**
        Second-pass statistics handed to the encoder of `medium`.
    */
    pub fn stats_in(&self, medium: Medium) -> Option<&[u8]> {
        self.streams.get(medium)?.stats_in.as_deref()
    }

    pub fn closed_encoders(&self) -> &[Medium] {
        &self.closed_encoders
    }

    fn fails(&self, point: FailurePoint) -> bool {
        self.failures.contains(&point)
    }

    fn append(&mut self, bytes: &[u8]) {
        if let Some(sink) = self.sink.as_mut() {
            sink.extend_from_slice(bytes);
        }
    }
}

impl Backend for MemoryBackend {
    fn find_option(&self, scope: OptionScope<'_>, key: &str) -> Option<OptionKind> {
        self.extra_options
            .iter()
            .find(|spec| spec.name == key)
            .map(|spec| spec.kind)
            .or_else(|| scope.find_static(key))
    }

    fn guess_format(&mut self, name: Option<&str>, file: &str) -> Option<OutputFormat> {
        let found = match name {
            Some(name) => self.formats.iter().find(|(format, _)| format.name == name),
            None => {
                let extension = file.rsplit_once('.')?.1.to_ascii_lowercase();
                self.formats
                    .iter()
                    .find(|(_, extensions)| extensions.contains(&extension.as_str()))
            }
        };
        let format = found.map(|(format, _)| format.clone())?;
        self.format = Some(format.clone());
        Some(format)
    }

    fn find_encoder(
        &mut self,
        name: Option<&str>,
        format: &OutputFormat,
        medium: Medium,
    ) -> Option<EncoderDescriptor> {
        let name = match (name, medium) {
            (Some(name), _) => name,
            (None, Medium::Video) => format.default_video_codec.as_deref()?,
            (None, Medium::Audio) => format.default_audio_codec.as_deref()?,
        };
        self.encoders
            .iter()
            .find(|e| e.name == name && e.medium == medium)
            .cloned()
    }

    fn new_stream(&mut self, encoder: &EncoderDescriptor) -> Result<()> {
        let delay = match encoder.medium {
            Medium::Video => self.video_delay,
            Medium::Audio => self.audio_delay,
        };
        let slot = self.streams.slot(encoder.medium);
        if slot.is_some() {
            return Err(Error::mux(format!("{} stream already exists", encoder.medium)));
        }
        *slot = Some(MemoryEncoder::new(encoder.clone(), delay));
        Ok(())
    }

    fn open_encoder(
        &mut self,
        medium: Medium,
        setup: &EncoderSetup,
        options: &mut Dictionary,
    ) -> Result<()> {
        if self.fails(FailurePoint::OpenEncoder(medium)) {
            return Err(Error::codec(format!("{medium} encoder refused to open")));
        }
        let descriptor = self
            .streams
            .get(medium)
            .map(|e| e.descriptor.clone())
            .ok_or_else(|| Error::codec(format!("no {medium} stream")))?;
        let consumed = options
            .take_known(|key| self.find_option(OptionScope::Encoder(&descriptor), key).is_some());

        let encoder = self
            .streams
            .get_mut(medium)
            .ok_or_else(|| Error::codec(format!("no {medium} stream")))?;
        encoder.options = consumed;
        encoder.pass1 = encoder
            .options
            .iter()
            .any(|(k, v)| k == "flags" && value_has_flag(v, "pass1"));
        encoder.stats_in = setup.stats_in.clone();
        encoder.time_base = setup.time_base;
        encoder.open = true;
        debug!(%medium, encoder = %encoder.descriptor.name, "memory encoder opened");
        Ok(())
    }

    fn encode_video(&mut self, frame: Option<&VideoFrame>) -> Result<Option<Packet>> {
        let encoder = self
            .streams
            .get_mut(Medium::Video)
            .ok_or_else(|| Error::codec("no video stream"))?;
        let packet = frame.map(|frame| {
            let size = frame.data.len() / 10 + 1;
            let fill = frame.pts.map(|p| p.0 as u8).unwrap_or(0);
            Packet::new(
                vec![fill; size],
                frame.pts,
                None,
                MediaDuration(1),
                encoder.time_base,
                false,
                Medium::Video,
            )
        });
        encoder.push(packet)
    }

    fn encode_audio(&mut self, frame: Option<&AudioFrame>) -> Result<Option<Packet>> {
        let encoder = self
            .streams
            .get_mut(Medium::Audio)
            .ok_or_else(|| Error::codec("no audio stream"))?;
        let pcm = encoder.descriptor.frame_size.is_none();
        let packet = frame.map(|frame| {
            let data = if pcm {
                frame.data.clone()
            } else {
                vec![0u8; frame.data.len() / 8 + 1]
            };
            Packet::new(
                data,
                frame.pts,
                None,
                MediaDuration(frame.samples as i64),
                encoder.time_base,
                true,
                Medium::Audio,
            )
        });
        encoder.push(packet)
    }

    fn stats_out(&mut self, medium: Medium) -> Option<String> {
        let encoder = self.streams.get_mut(medium)?;
        if encoder.pending_stats.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut encoder.pending_stats))
    }

    fn stream_time_base(&self, medium: Medium) -> Option<Rational> {
        if let Some((_, tb)) = self.chosen_time_bases.iter().find(|(m, _)| *m == medium) {
            return Some(*tb);
        }
        self.streams.get(medium).map(|e| e.time_base)
    }

    fn open_sink(&mut self, file: &str) -> Result<()> {
        if self.fails(FailurePoint::OpenSink) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("cannot open {file}"),
            )));
        }
        self.sink = Some(Vec::new());
        Ok(())
    }

    fn write_header(&mut self, options: &mut Dictionary) -> Result<()> {
        if self.fails(FailurePoint::WriteHeader) {
            return Err(Error::mux("header rejected"));
        }

        if let Some(format) = self.format.clone() {
            self.header_options = options
                .take_known(|key| self.find_option(OptionScope::Format(&format), key).is_some());
        }

        let imposed = self
            .stream_time_base
            .or_else(|| self.format.as_ref().and_then(|f| f.stream_time_base));
        for medium in Medium::ALL {
            if let Some(encoder) = self.streams.get(medium) {
                let tb = imposed.unwrap_or(encoder.time_base);
                self.chosen_time_bases.push((medium, tb));
            }
        }

        let mut header = HEADER_MAGIC.to_vec();
        header.extend_from_slice(&[0u8; 28]);
        self.append(&header);
        self.header_written = true;
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<()> {
        if !self.header_written {
            return Err(Error::mux("packet before header"));
        }
        if self.fails(FailurePoint::WritePacket) {
            return Err(Error::mux("packet rejected"));
        }
        let mut framing = [0u8; PACKET_FRAMING];
        framing[0] = packet.medium as u8;
        framing[4..].copy_from_slice(&packet.pts.map(|p| p.0).unwrap_or(-1).to_le_bytes());
        self.append(&framing);
        self.append(&packet.data);
        self.packets.push(packet);
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        if self.fails(FailurePoint::WriteTrailer) {
            return Err(Error::mux("trailer rejected"));
        }
        let mut trailer = TRAILER_MAGIC.to_vec();
        trailer.extend_from_slice(&(self.packets.len() as u64).to_le_bytes());
        trailer.extend_from_slice(&[0u8; 4]);
        self.append(&trailer);
        self.trailer_written = true;
        Ok(())
    }

    fn close_encoder(&mut self, medium: Medium) {
        if let Some(encoder) = self.streams.get_mut(medium) {
            encoder.open = false;
            encoder.queue.clear();
            self.closed_encoders.push(medium);
        }
    }

    fn sink_position(&self) -> Option<u64> {
        self.sink.as_ref().map(|sink| sink.len() as u64)
    }

    fn close_sink(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.take() {
            self.output = sink;
        }
        Ok(())
    }
}

fn format(name: &str, video: &str, audio: &str, global_header: bool) -> OutputFormat {
    OutputFormat {
        name: name.to_string(),
        no_file: false,
        global_header,
        default_video_codec: Some(video.to_string()),
        default_audio_codec: Some(audio.to_string()),
        stream_time_base: None,
        options: format_options(name),
    }
}

fn builtin_formats() -> Vec<(OutputFormat, &'static [&'static str])> {
    let mut mpegts = format("mpegts", "mpeg2video", "ac3", false);
    mpegts.stream_time_base = Some(Rational::new(1, 90000));

    let mut null = format("null", "rawvideo", "pcm_s16le", false);
    null.no_file = true;

    vec![
        (format("matroska", "libx264", "aac", true), &["mkv", "mka"]),
        (format("mp4", "libx264", "aac", true), &["mp4", "m4v"]),
        (mpegts, &["ts", "m2t"]),
        (format("avi", "mpeg4", "pcm_s16le", false), &["avi"]),
        (format("nut", "mpeg4", "pcm_s16le", false), &["nut"]),
        (null, &[]),
    ]
}

fn video_encoder(
    name: &str,
    pixel_formats: &[PixelFormat],
    reorders_frames: bool,
) -> EncoderDescriptor {
    EncoderDescriptor {
        name: name.to_string(),
        medium: Medium::Video,
        supported_frame_rates: Vec::new(),
        pixel_formats: pixel_formats.to_vec(),
        sample_formats: Vec::new(),
        frame_size: None,
        reorders_frames,
        options: encoder_options(name),
    }
}

fn audio_encoder(
    name: &str,
    sample_formats: &[SampleFormat],
    frame_size: Option<usize>,
) -> EncoderDescriptor {
    EncoderDescriptor {
        name: name.to_string(),
        medium: Medium::Audio,
        supported_frame_rates: Vec::new(),
        pixel_formats: Vec::new(),
        sample_formats: sample_formats.to_vec(),
        frame_size,
        reorders_frames: false,
        options: encoder_options(name),
    }
}

fn builtin_encoders() -> Vec<EncoderDescriptor> {
    let mut mpeg2 = video_encoder(
        "mpeg2video",
        &[PixelFormat::Yuv420p, PixelFormat::Yuv422p],
        true,
    );
    mpeg2.supported_frame_rates = vec![
        Rational::new(24000, 1001),
        Rational::new(24, 1),
        Rational::new(25, 1),
        Rational::new(30000, 1001),
        Rational::new(30, 1),
        Rational::new(50, 1),
        Rational::new(60000, 1001),
        Rational::new(60, 1),
    ];

    vec![
        video_encoder(
            "libx264",
            &[
                PixelFormat::Yuv420p,
                PixelFormat::Yuv422p,
                PixelFormat::Yuv444p,
                PixelFormat::Nv12,
                PixelFormat::Yuv420p10,
            ],
            true,
        ),
        video_encoder("mpeg4", &[PixelFormat::Yuv420p], false),
        mpeg2,
        video_encoder("rawvideo", &[], false),
        audio_encoder("aac", &[SampleFormat::F32], Some(1024)),
        audio_encoder("ac3", &[SampleFormat::F32], Some(1536)),
        audio_encoder("pcm_s16le", &[SampleFormat::S16], None),
        audio_encoder("pcm_u8", &[SampleFormat::U8], None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StreamParams;
    use encode_types::{Pts, VideoStreamInfo};

    fn open_video(backend: &mut MemoryBackend, options: &mut Dictionary) {
        let format = backend.guess_format(None, "out.mkv").unwrap();
        let encoder = backend.find_encoder(None, &format, Medium::Video).unwrap();
        backend.new_stream(&encoder).unwrap();
        let setup = EncoderSetup {
            params: StreamParams::Video(VideoStreamInfo::new(4, 4, PixelFormat::Yuv420p)),
            time_base: Rational::new(1, 25),
            stats_in: None,
        };
        backend.open_encoder(Medium::Video, &setup, options).unwrap();
    }

    fn frame(pts: i64) -> VideoFrame {
        let mut frame = VideoFrame::blank(4, 4, PixelFormat::Yuv420p);
        frame.pts = Some(Pts(pts));
        frame
    }

    #[test]
    fn guesses_by_name_and_extension() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.guess_format(None, "a.MKV").unwrap().name, "matroska");
        assert_eq!(backend.guess_format(Some("null"), "x").unwrap().name, "null");
        assert!(backend.guess_format(Some("null"), "x").unwrap().no_file);
        assert!(backend.guess_format(None, "noextension").is_none());
        assert!(backend.guess_format(Some("bogus"), "a.mkv").is_none());
    }

    #[test]
    fn default_encoders_follow_format() {
        let mut backend = MemoryBackend::new();
        let ts = backend.guess_format(None, "a.ts").unwrap();
        let video = backend.find_encoder(None, &ts, Medium::Video).unwrap();
        assert_eq!(video.name, "mpeg2video");
        assert!(!video.supported_frame_rates.is_empty());
        assert!(backend.find_encoder(Some("aac"), &ts, Medium::Video).is_none());
    }

    #[test]
    fn delayed_encoder_releases_on_drain() {
        let mut backend = MemoryBackend::new().with_encoder_delay(Medium::Video, 2);
        open_video(&mut backend, &mut Dictionary::new());

        assert!(backend.encode_video(Some(&frame(0))).unwrap().is_none());
        assert!(backend.encode_video(Some(&frame(1))).unwrap().is_none());
        let out = backend.encode_video(Some(&frame(2))).unwrap().unwrap();
        assert_eq!(out.pts, Some(Pts(0)));
        assert!(out.is_keyframe);

        assert_eq!(backend.encode_video(None).unwrap().unwrap().pts, Some(Pts(1)));
        assert_eq!(backend.encode_video(None).unwrap().unwrap().pts, Some(Pts(2)));
        assert!(backend.encode_video(None).unwrap().is_none());
    }

    #[test]
    fn pass1_emits_stats() {
        let mut backend = MemoryBackend::new();
        let mut options = Dictionary::new();
        options.set("flags", "+pass1", false);
        options.set("unknown_key", "1", false);
        open_video(&mut backend, &mut options);

        assert_eq!(options.len(), 1);
        assert!(backend.stats_out(Medium::Video).is_none());
        backend.encode_video(Some(&frame(0))).unwrap();
        let stats = backend.stats_out(Medium::Video).unwrap();
        assert!(stats.starts_with("in:0 out:0 type:I"));
        assert!(backend.stats_out(Medium::Video).is_none());
    }

    #[test]
    fn extra_options_are_consumed() {
        let mut backend =
            MemoryBackend::new().with_option(OptionSpec::new("sc_threshold", OptionKind::Int));
        let format = backend.guess_format(None, "out.mkv").unwrap();
        let encoder = backend.find_encoder(None, &format, Medium::Video).unwrap();
        assert_eq!(
            backend.find_option(OptionScope::Encoder(&encoder), "sc_threshold"),
            Some(OptionKind::Int)
        );
        assert!(backend.find_option(OptionScope::Encoder(&encoder), "me_range").is_none());
        assert!(backend.find_option(OptionScope::Format(&format), "muxdelay").is_some());

        let mut options = Dictionary::new();
        options.set("sc_threshold", "0", false);
        options.set("me_range", "16", false);
        open_video(&mut backend, &mut options);

        assert_eq!(options.iter().collect::<Vec<_>>(), vec![("me_range", "16")]);
        let consumed = backend.encoder_options(Medium::Video).unwrap();
        assert!(consumed.iter().any(|(k, v)| k == "sc_threshold" && v == "0"));
    }

    #[test]
    fn sink_accounts_framing() {
        let mut backend = MemoryBackend::new();
        open_video(&mut backend, &mut Dictionary::new());
        backend.open_sink("out.mkv").unwrap();
        backend.write_header(&mut Dictionary::new()).unwrap();
        let packet = backend.encode_video(Some(&frame(0))).unwrap().unwrap();
        let payload = packet.size() as u64;
        backend.write_packet(packet).unwrap();
        backend.write_trailer().unwrap();

        assert_eq!(backend.sink_position(), Some(32 + 12 + payload + 16));
        backend.close_sink().unwrap();
        assert!(!backend.sink_open());
        assert_eq!(backend.output().len() as u64, 32 + 12 + payload + 16);
    }

    #[test]
    fn injected_failures() {
        let mut backend = MemoryBackend::new()
            .with_failure(FailurePoint::OpenSink)
            .with_failure(FailurePoint::WriteTrailer);
        assert!(backend.open_sink("x.mkv").is_err());
        assert!(backend.write_trailer().is_err());
        assert!(backend.write_header(&mut Dictionary::new()).is_ok());
    }

    #[test]
    fn forced_stream_time_base_after_header() {
        let mut backend = MemoryBackend::new().with_stream_time_base(Rational::new(1, 90000));
        open_video(&mut backend, &mut Dictionary::new());
        assert_eq!(backend.stream_time_base(Medium::Video), Some(Rational::new(1, 25)));
        backend.write_header(&mut Dictionary::new()).unwrap();
        assert_eq!(
            backend.stream_time_base(Medium::Video),
            Some(Rational::new(1, 90000))
        );
    }
}
