/*!
    Backend writing real files through libavcodec and libavformat.
*/

use std::collections::VecDeque;
use std::ffi::{CStr, CString, c_void};
use std::ptr;

use ffmpeg_next::{
    codec::{self, Codec},
    encoder, ffi,
    format::{self, Pixel, Sample, sample::Type as SampleType},
    packet::Flags as PacketFlags,
    util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg},
};
use tracing::{debug, info, warn};

use encode_types::{
    AudioFrame, AudioStreamInfo, Error, MediaDuration, Medium, Packet, PixelFormat, Pts, Rational,
    Result, SampleFormat, VideoFrame, VideoStreamInfo,
};

use super::{Backend, EncoderDescriptor, EncoderSetup, OptionScope, OutputFormat, StreamParams};
use crate::options::{Dictionary, OptionKind, OptionTable};

const SEEK_CUR: i32 = 1;

enum EncoderContext {
    Video(encoder::video::Video),
    Audio(encoder::audio::Audio),
}

impl EncoderContext {
    fn encoder(&mut self) -> &mut encoder::Encoder {
        match self {
            Self::Video(video) => video,
            Self::Audio(audio) => audio,
        }
    }

    fn context_ptr(&mut self) -> *mut ffi::AVCodecContext {
        unsafe { self.encoder().as_mut_ptr() }
    }
}

struct OpenEncoder {
    context: EncoderContext,
    time_base: Rational,
    /// Sample format the encoder was opened with, for audio.
    sample_format: Option<Sample>,
    frame_size: usize,
    eof_sent: bool,
    pending: VecDeque<Packet>,
    pending_stats: String,
    /// Referenced by the codec context, so dropped after it.
    _stats_in: Option<CString>,
}

struct FfmpegStream {
    codec: Codec,
    index: usize,
    encoder: Option<OpenEncoder>,
}

/**
    Backend on top of `ffmpeg-next`.

    The output context is allocated when the first stream is added and
    freed, closing the file, by [`Backend::close_sink`].
*/
pub struct FfmpegBackend {
    format_name: Option<String>,
    file: String,
    output: Option<format::context::Output>,
    video: Option<FfmpegStream>,
    audio: Option<FfmpegStream>,
}

impl FfmpegBackend {
    pub fn new() -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;
        Ok(Self {
            format_name: None,
            file: String::new(),
            output: None,
            video: None,
            audio: None,
        })
    }

    fn stream(&self, medium: Medium) -> Option<&FfmpegStream> {
        match medium {
            Medium::Video => self.video.as_ref(),
            Medium::Audio => self.audio.as_ref(),
        }
    }

    fn stream_mut(&mut self, medium: Medium) -> Option<&mut FfmpegStream> {
        match medium {
            Medium::Video => self.video.as_mut(),
            Medium::Audio => self.audio.as_mut(),
        }
    }

    fn encoder_mut(&mut self, medium: Medium) -> Result<&mut OpenEncoder> {
        self.stream_mut(medium)
            .and_then(|s| s.encoder.as_mut())
            .ok_or_else(|| Error::codec(format!("{medium} encoder is not open")))
    }

    fn output_mut(&mut self) -> Result<&mut format::context::Output> {
        if self.output.is_none() {
            let name = self.format_name.as_deref().map(c_string).transpose()?;
            let file = c_string(&self.file)?;
            let mut raw = ptr::null_mut();
            let ret = unsafe {
                ffi::avformat_alloc_output_context2(
                    &mut raw,
                    ptr::null(),
                    name.as_ref().map_or(ptr::null(), |n| n.as_ptr()),
                    file.as_ptr(),
                )
            };
            if ret < 0 || raw.is_null() {
                return Err(Error::mux(format!(
                    "could not allocate output context: {}",
                    ffmpeg_next::Error::from(ret)
                )));
            }
            self.output = Some(unsafe { format::context::Output::wrap(raw) });
        }
        self.output
            .as_mut()
            .ok_or_else(|| Error::mux("no output context"))
    }

    fn encode(
        &mut self,
        medium: Medium,
        frame: Option<&ffmpeg_next::Frame>,
    ) -> Result<Option<Packet>> {
        let open = self.encoder_mut(medium)?;
        match frame {
            Some(frame) => open
                .context
                .encoder()
                .send_frame(frame)
                .map_err(|e| Error::codec(e.to_string()))?,
            None if !open.eof_sent => {
                open.eof_sent = true;
                open.context
                    .encoder()
                    .send_eof()
                    .map_err(|e| Error::codec(e.to_string()))?;
            }
            None => {}
        }
        open.receive_packets(medium)?;
        Ok(open.pending.pop_front())
    }
}

impl OpenEncoder {
    fn receive_packets(&mut self, medium: Medium) -> Result<()> {
        let mut encoded = ffmpeg_next::Packet::empty();
        loop {
            match self.context.encoder().receive_packet(&mut encoded) {
                Ok(()) => {
                    self.collect_stats();
                    self.pending.push_back(Packet::new(
                        encoded.data().map(<[u8]>::to_vec).unwrap_or_default(),
                        encoded.pts().map(Pts),
                        encoded.dts().map(Pts),
                        MediaDuration(encoded.duration()),
                        self.time_base,
                        encoded.is_key(),
                        medium,
                    ));
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::AVERROR(ffi::EAGAIN) => {
                    break;
                }
                Err(ffmpeg_next::Error::Eof) => {
                    break;
                }
                Err(e) => {
                    return Err(Error::codec(e.to_string()));
                }
            }
        }
        Ok(())
    }

    fn collect_stats(&mut self) {
        let context = self.context.context_ptr();
        unsafe {
            let stats = (*context).stats_out;
            if !stats.is_null() {
                self.pending_stats
                    .push_str(&CStr::from_ptr(stats).to_string_lossy());
            }
        }
    }
}

impl Backend for FfmpegBackend {
    fn find_option(&self, scope: OptionScope<'_>, key: &str) -> Option<OptionKind> {
        let key = CString::new(key).ok()?;
        let (generic, private) = match scope {
            OptionScope::Encoder(descriptor) => {
                let private = encoder::find_by_name(&descriptor.name)
                    .map_or(ptr::null(), |codec| unsafe { (*codec.as_ptr()).priv_class });
                (unsafe { ffi::avcodec_get_class() }, private)
            }
            OptionScope::Format(format) => {
                let name = CString::new(format.name.as_str()).ok()?;
                let raw = unsafe { ffi::av_guess_format(name.as_ptr(), ptr::null(), ptr::null()) };
                let private = if raw.is_null() {
                    ptr::null()
                } else {
                    unsafe { (*raw).priv_class }
                };
                (unsafe { ffi::avformat_get_class() }, private)
            }
        };
        [private, generic]
            .into_iter()
            .filter(|class| !class.is_null())
            .find_map(|class| find_in_class(class, &key))
    }

    fn guess_format(&mut self, name: Option<&str>, file: &str) -> Option<OutputFormat> {
        let name_c = name.map(CString::new).transpose().ok()?;
        let file_c = CString::new(file).ok()?;
        let raw = unsafe {
            ffi::av_guess_format(
                name_c.as_ref().map_or(ptr::null(), |n| n.as_ptr()),
                file_c.as_ptr(),
                ptr::null(),
            )
        };
        if raw.is_null() {
            return None;
        }

        let (format_name, flags, video_id, audio_id) = unsafe {
            (
                CStr::from_ptr((*raw).name).to_string_lossy().into_owned(),
                (*raw).flags,
                (*raw).video_codec,
                (*raw).audio_codec,
            )
        };

        self.format_name = Some(format_name.clone());
        self.file = file.to_string();

        Some(OutputFormat {
            no_file: flags & ffi::AVFMT_NOFILE as i32 != 0,
            global_header: flags & ffi::AVFMT_GLOBALHEADER as i32 != 0,
            default_video_codec: default_encoder_name(video_id),
            default_audio_codec: default_encoder_name(audio_id),
            stream_time_base: None,
            options: OptionTable::EMPTY,
            name: format_name,
        })
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
        let codec = encoder::find_by_name(name)?;
        if media_type(medium) != codec.medium() {
            return None;
        }
        Some(describe(&codec, medium))
    }

    fn new_stream(&mut self, descriptor: &EncoderDescriptor) -> Result<()> {
        let medium = descriptor.medium;
        if self.stream(medium).is_some() {
            return Err(Error::mux(format!("{medium} stream already exists")));
        }
        let codec = encoder::find_by_name(&descriptor.name)
            .ok_or_else(|| Error::codec(format!("encoder {} not found", descriptor.name)))?;
        let index = self
            .output_mut()?
            .add_stream(codec)
            .map_err(|e| Error::mux(e.to_string()))?
            .index();
        let stream = Some(FfmpegStream {
            codec,
            index,
            encoder: None,
        });
        match medium {
            Medium::Video => self.video = stream,
            Medium::Audio => self.audio = stream,
        }
        Ok(())
    }

    fn open_encoder(
        &mut self,
        medium: Medium,
        setup: &EncoderSetup,
        options: &mut Dictionary,
    ) -> Result<()> {
        let (codec, index) = self
            .stream(medium)
            .map(|s| (s.codec, s.index))
            .ok_or_else(|| Error::codec(format!("no {medium} stream")))?;

        let context = codec::context::Context::new_with_codec(codec).encoder();
        let mut sample_format = None;
        let mut context = match setup.params {
            StreamParams::Video(info) => {
                EncoderContext::Video(configure_video(context, &info, setup.time_base)?)
            }
            StreamParams::Audio(info) => {
                let format = encoder_sample_format(&codec, info.sample_format)?;
                sample_format = Some(format);
                EncoderContext::Audio(configure_audio(context, &info, format, setup.time_base)?)
            }
        };

        let stats_in = setup.stats_in.as_deref().and_then(|stats| match CString::new(stats) {
            Ok(stats) => Some(stats),
            Err(_) => {
                warn!(%medium, "pass statistics contain a NUL byte, encoding without them");
                None
            }
        });
        if let Some(stats) = &stats_in {
            unsafe { (*context.context_ptr()).stats_in = stats.as_ptr() as *mut _ };
        }

        // Options the encoder does not take stay in `options`
        let mut raw_options = to_ffmpeg(options).disown();
        let ret = unsafe {
            ffi::avcodec_open2(context.context_ptr(), codec.as_ptr(), &mut raw_options)
        };
        let leftover = unsafe { ffmpeg_next::Dictionary::own(raw_options) };
        *options = from_ffmpeg(&leftover);
        if ret < 0 {
            return Err(Error::codec(format!(
                "could not open {} encoder: {}",
                codec.name(),
                ffmpeg_next::Error::from(ret)
            )));
        }

        let frame_size = unsafe { (*context.context_ptr()).frame_size }.max(0) as usize;

        let output = self.output_mut()?;
        let mut stream = output
            .stream_mut(index)
            .ok_or_else(|| Error::mux(format!("{medium} stream missing from output")))?;
        match &context {
            EncoderContext::Video(video) => stream.set_parameters(video),
            EncoderContext::Audio(audio) => stream.set_parameters(audio),
        }
        stream.set_time_base(to_ffmpeg_rational(setup.time_base));

        debug!(%medium, encoder = codec.name(), frame_size, "ffmpeg encoder opened");

        if let Some(stream) = self.stream_mut(medium) {
            stream.encoder = Some(OpenEncoder {
                context,
                time_base: setup.time_base,
                sample_format,
                frame_size,
                eof_sent: false,
                pending: VecDeque::new(),
                pending_stats: String::new(),
                _stats_in: stats_in,
            });
        }
        Ok(())
    }

    fn encode_video(&mut self, frame: Option<&VideoFrame>) -> Result<Option<Packet>> {
        let converted = frame.map(video_frame).transpose()?;
        self.encode(Medium::Video, converted.as_deref())
    }

    fn encode_audio(&mut self, frame: Option<&AudioFrame>) -> Result<Option<Packet>> {
        let converted = match frame {
            Some(frame) => {
                let format = self
                    .encoder_mut(Medium::Audio)?
                    .sample_format
                    .ok_or_else(|| Error::codec("audio encoder has no sample format"))?;
                Some(audio_frame(frame, format)?)
            }
            None => None,
        };
        self.encode(Medium::Audio, converted.as_deref())
    }

    fn stats_out(&mut self, medium: Medium) -> Option<String> {
        let open = self.stream_mut(medium)?.encoder.as_mut()?;
        if open.pending_stats.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut open.pending_stats))
    }

    fn audio_frame_size(&self) -> Option<usize> {
        self.audio
            .as_ref()
            .and_then(|s| s.encoder.as_ref())
            .map(|e| e.frame_size)
            .filter(|&n| n > 0)
    }

    fn stream_time_base(&self, medium: Medium) -> Option<Rational> {
        let index = self.stream(medium)?.index;
        let time_base = self.output.as_ref()?.stream(index)?.time_base();
        from_ffmpeg_rational(time_base)
    }

    fn open_sink(&mut self, file: &str) -> Result<()> {
        let path = c_string(file)?;
        let output = self.output_mut()?;
        let ret = unsafe {
            let raw = output.as_mut_ptr();
            ffi::avio_open(&mut (*raw).pb, path.as_ptr(), ffi::AVIO_FLAG_WRITE as i32)
        };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::other(format!(
                "could not open {file}: {}",
                ffmpeg_next::Error::from(ret)
            ))));
        }
        Ok(())
    }

    fn write_header(&mut self, options: &mut Dictionary) -> Result<()> {
        let output = self.output_mut()?;
        let leftover = output
            .write_header_with(to_ffmpeg(options))
            .map_err(|e| Error::mux(e.to_string()))?;
        *options = from_ffmpeg(&leftover);
        info!(file = %self.file, "ffmpeg header written");
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let index = self
            .stream(packet.medium)
            .map(|s| s.index)
            .ok_or_else(|| Error::mux(format!("no {} stream", packet.medium)))?;

        let mut out = ffmpeg_next::Packet::copy(&packet.data);
        out.set_stream(index);
        out.set_pts(packet.pts.map(|p| p.0));
        out.set_dts(packet.dts.map(|p| p.0));
        out.set_duration(packet.duration.0);
        if packet.is_keyframe {
            out.set_flags(PacketFlags::KEY);
        }
        out.write_interleaved(self.output_mut()?)
            .map_err(|e| Error::mux(e.to_string()))
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.output_mut()?
            .write_trailer()
            .map_err(|e| Error::mux(e.to_string()))
    }

    fn close_encoder(&mut self, medium: Medium) {
        if let Some(stream) = self.stream_mut(medium) {
            stream.encoder = None;
        }
    }

    fn sink_position(&self) -> Option<u64> {
        let output = self.output.as_ref()?;
        let position = unsafe {
            let pb = (*output.as_ptr()).pb;
            if pb.is_null() {
                return None;
            }
            ffi::avio_seek(pb, 0, SEEK_CUR)
        };
        u64::try_from(position).ok()
    }

    fn close_sink(&mut self) -> Result<()> {
        if self.output.take().is_some() {
            debug!(file = %self.file, "output closed");
        }
        Ok(())
    }
}

/**
    Look `key` up in the options of `class` and its children, without an
    instance.
*/
fn find_in_class(class: *const ffi::AVClass, key: &CStr) -> Option<OptionKind> {
    let mut class = class;
    let option = unsafe {
        ffi::av_opt_find(
            &mut class as *mut *const ffi::AVClass as *mut c_void,
            key.as_ptr(),
            ptr::null(),
            0,
            ffi::AV_OPT_SEARCH_FAKE_OBJ as i32,
        )
    };
    if option.is_null() {
        return None;
    }
    // Values are checked when the encoder or header consumes them
    match unsafe { (*option).type_ } {
        ffi::AVOptionType::AV_OPT_TYPE_FLAGS => Some(OptionKind::LibraryFlags),
        _ => Some(OptionKind::String),
    }
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|e| Error::invalid_data(e.to_string()))
}

fn to_ffmpeg(options: &Dictionary) -> ffmpeg_next::Dictionary<'static> {
    let mut dict = ffmpeg_next::Dictionary::new();
    for (key, value) in options.iter() {
        dict.set(key, value);
    }
    dict
}

fn from_ffmpeg(dict: &ffmpeg_next::Dictionary) -> Dictionary {
    let mut options = Dictionary::new();
    for (key, value) in dict.iter() {
        options.set(key, value, false);
    }
    options
}

fn to_ffmpeg_rational(value: Rational) -> ffmpeg_next::Rational {
    ffmpeg_next::Rational::new(value.num, value.den)
}

fn from_ffmpeg_rational(value: ffmpeg_next::Rational) -> Option<Rational> {
    (value.denominator() != 0).then(|| Rational::new(value.numerator(), value.denominator()))
}

fn media_type(medium: Medium) -> ffmpeg_next::media::Type {
    match medium {
        Medium::Video => ffmpeg_next::media::Type::Video,
        Medium::Audio => ffmpeg_next::media::Type::Audio,
    }
}

fn default_encoder_name(id: ffi::AVCodecID) -> Option<String> {
    if id == ffi::AVCodecID::AV_CODEC_ID_NONE {
        return None;
    }
    encoder::find(codec::Id::from(id)).map(|c| c.name().to_string())
}

fn describe(codec: &Codec, medium: Medium) -> EncoderDescriptor {
    let mut descriptor = EncoderDescriptor {
        name: codec.name().to_string(),
        medium,
        supported_frame_rates: Vec::new(),
        pixel_formats: Vec::new(),
        sample_formats: Vec::new(),
        frame_size: None,
        reorders_frames: codec
            .capabilities()
            .contains(codec::capabilities::Capabilities::DELAY),
        options: OptionTable::EMPTY,
    };
    match medium {
        Medium::Video => {
            if let Ok(video) = codec.video() {
                if let Some(rates) = video.rates() {
                    descriptor.supported_frame_rates =
                        rates.filter_map(from_ffmpeg_rational).collect();
                }
                if let Some(formats) = video.formats() {
                    descriptor.pixel_formats = formats.filter_map(pixel_format_from_ffmpeg).collect();
                }
            }
        }
        Medium::Audio => {
            if let Ok(audio) = codec.audio() {
                if let Some(formats) = audio.formats() {
                    for format in formats.filter_map(sample_format_from_ffmpeg) {
                        if !descriptor.sample_formats.contains(&format) {
                            descriptor.sample_formats.push(format);
                        }
                    }
                }
            }
        }
    }
    descriptor
}

fn configure_video(
    context: encoder::Encoder,
    info: &VideoStreamInfo,
    time_base: Rational,
) -> Result<encoder::video::Video> {
    let mut video = context.video().map_err(|e| Error::codec(e.to_string()))?;
    video.set_width(info.width);
    video.set_height(info.height);
    video.set_format(pixel_format_to_ffmpeg(info.pixel_format));
    video.set_time_base(to_ffmpeg_rational(time_base));
    video.set_frame_rate(Some(to_ffmpeg_rational(time_base.invert())));
    video.set_aspect_ratio(to_ffmpeg_rational(info.sample_aspect_ratio));
    Ok(video)
}

fn configure_audio(
    context: encoder::Encoder,
    info: &AudioStreamInfo,
    format: Sample,
    time_base: Rational,
) -> Result<encoder::audio::Audio> {
    let mut audio = context.audio().map_err(|e| Error::codec(e.to_string()))?;
    audio.set_rate(info.sample_rate as i32);
    audio.set_format(format);
    audio.set_time_base(to_ffmpeg_rational(time_base));
    unsafe {
        let raw = audio.as_mut_ptr();
        ffi::av_channel_layout_default(&mut (*raw).ch_layout, info.channels.channels() as i32);
    }
    Ok(audio)
}

/**
    The encoder's own variant of `format`, preferring interleaved.
*/
fn encoder_sample_format(codec: &Codec, format: SampleFormat) -> Result<Sample> {
    let packed = sample_format_to_ffmpeg(format, SampleType::Packed);
    let Some(formats) = codec.audio().ok().and_then(|a| a.formats()) else {
        return Ok(packed);
    };
    let candidates: Vec<Sample> = formats
        .filter(|f| sample_format_from_ffmpeg(*f) == Some(format))
        .collect();
    if candidates.contains(&packed) {
        return Ok(packed);
    }
    candidates.first().copied().ok_or_else(|| {
        Error::unsupported_format(format!("{} does not take {format:?} samples", codec.name()))
    })
}

fn video_frame(frame: &VideoFrame) -> Result<VideoFrameFFmpeg> {
    if !frame.is_well_formed() {
        return Err(Error::invalid_data("video frame size does not match its geometry"));
    }
    let mut out = VideoFrameFFmpeg::new(
        pixel_format_to_ffmpeg(frame.format),
        frame.width,
        frame.height,
    );
    let mut offset = 0;
    let planes = frame.format.plane_layout(frame.width, frame.height);
    for (plane, (row_bytes, rows)) in planes.into_iter().enumerate() {
        let stride = out.stride(plane);
        let dst = out.data_mut(plane);
        for row in 0..rows {
            dst[row * stride..row * stride + row_bytes]
                .copy_from_slice(&frame.data[offset..offset + row_bytes]);
            offset += row_bytes;
        }
    }
    out.set_pts(frame.pts.map(|p| p.0));
    Ok(out)
}

fn audio_frame(frame: &AudioFrame, format: Sample) -> Result<AudioFrameFFmpeg> {
    let channels = frame.channels.channels() as usize;
    let bytes = frame.format.bytes_per_sample();
    if frame.data.len() < frame.expected_data_len() {
        return Err(Error::invalid_data("audio frame shorter than its sample count"));
    }

    let mut out = AudioFrameFFmpeg::empty();
    unsafe {
        let raw = out.as_mut_ptr();
        (*raw).format = ffi::AVSampleFormat::from(format) as i32;
        (*raw).nb_samples = frame.samples as i32;
        (*raw).sample_rate = frame.sample_rate as i32;
        ffi::av_channel_layout_default(&mut (*raw).ch_layout, channels as i32);
        let ret = ffi::av_frame_get_buffer(raw, 0);
        if ret < 0 {
            return Err(Error::codec(format!(
                "could not allocate audio frame: {}",
                ffmpeg_next::Error::from(ret)
            )));
        }
    }

    if format.is_planar() {
        for channel in 0..channels {
            let plane = out.data_mut(channel);
            for sample in 0..frame.samples {
                let src = (sample * channels + channel) * bytes;
                plane[sample * bytes..(sample + 1) * bytes]
                    .copy_from_slice(&frame.data[src..src + bytes]);
            }
        }
    } else {
        let len = frame.samples * channels * bytes;
        out.data_mut(0)[..len].copy_from_slice(&frame.data[..len]);
    }
    out.set_pts(frame.pts.map(|p| p.0));
    Ok(out)
}

fn pixel_format_to_ffmpeg(format: PixelFormat) -> Pixel {
    match format {
        PixelFormat::Yuv420p => Pixel::YUV420P,
        PixelFormat::Nv12 => Pixel::NV12,
        PixelFormat::Bgra => Pixel::BGRA,
        PixelFormat::Rgba => Pixel::RGBA,
        PixelFormat::Rgb24 => Pixel::RGB24,
        PixelFormat::Bgr24 => Pixel::BGR24,
        PixelFormat::Yuv422p => Pixel::YUV422P,
        PixelFormat::Yuv444p => Pixel::YUV444P,
        PixelFormat::Yuv420p10 => Pixel::YUV420P10LE,
    }
}

fn pixel_format_from_ffmpeg(format: Pixel) -> Option<PixelFormat> {
    match format {
        Pixel::YUV420P => Some(PixelFormat::Yuv420p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::YUV422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P => Some(PixelFormat::Yuv444p),
        Pixel::YUV420P10LE => Some(PixelFormat::Yuv420p10),
        _ => None,
    }
}

fn sample_format_to_ffmpeg(format: SampleFormat, layout: SampleType) -> Sample {
    match format {
        SampleFormat::F32 => Sample::F32(layout),
        SampleFormat::F64 => Sample::F64(layout),
        SampleFormat::S16 => Sample::I16(layout),
        SampleFormat::S32 => Sample::I32(layout),
        SampleFormat::U8 => Sample::U8(layout),
    }
}

fn sample_format_from_ffmpeg(format: Sample) -> Option<SampleFormat> {
    match format {
        Sample::F32(_) => Some(SampleFormat::F32),
        Sample::F64(_) => Some(SampleFormat::F64),
        Sample::I16(_) => Some(SampleFormat::S16),
        Sample::I32(_) => Some(SampleFormat::S32),
        Sample::U8(_) => Some(SampleFormat::U8),
        _ => None,
    }
}
