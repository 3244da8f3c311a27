/*!
    The encode/mux library seam.

    A session never compresses or writes container bytes itself. It drives a
    [`Backend`], which guesses container formats, finds and opens encoders,
    encodes frames and interleaves packets into the output.
*/

mod memory;
mod tables;

#[cfg(feature = "ffmpeg")]
mod ffmpeg;

pub use memory::{FailurePoint, MemoryBackend};

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegBackend;

use encode_types::{
    AudioFrame, AudioStreamInfo, Medium, Packet, PixelFormat, Rational, Result, SampleFormat,
    VideoFrame, VideoStreamInfo,
};

use crate::options::{
    CODEC_OPTIONS, Dictionary, FORMAT_OPTIONS, OptionKind, OptionTable, find_in_tables,
};

/**
    A container format the backend can write.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct OutputFormat {
    pub name: String,
    /// The format writes no file (e.g. a null sink).
    pub no_file: bool,
    /// Encoders must put codec headers in the container header.
    pub global_header: bool,
    pub default_video_codec: Option<String>,
    pub default_audio_codec: Option<String>,
    /// Time base the container imposes on every stream, if any.
    pub stream_time_base: Option<Rational>,
    /// Private options of this format, when the backend lists them statically.
    pub options: OptionTable,
}

/**
    An encoder the backend can open.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderDescriptor {
    pub name: String,
    pub medium: Medium,
    /// Frame rates the encoder accepts. Empty means any.
    pub supported_frame_rates: Vec<Rational>,
    /// Pixel formats the encoder accepts. Empty means any.
    pub pixel_formats: Vec<PixelFormat>,
    /// Sample formats the encoder accepts. Empty means any.
    pub sample_formats: Vec<SampleFormat>,
    /// Samples per encoded audio frame. `None` for PCM-like encoders that
    /// take any amount.
    pub frame_size: Option<usize>,
    /// The encoder may hold frames back and emit them out of order.
    pub reorders_frames: bool,
    /// Private options of this encoder, when the backend lists them statically.
    pub options: OptionTable,
}

impl EncoderDescriptor {
    pub fn supports_pixel_format(&self, format: PixelFormat) -> bool {
        self.pixel_formats.is_empty() || self.pixel_formats.contains(&format)
    }

    pub fn supports_sample_format(&self, format: SampleFormat) -> bool {
        self.sample_formats.is_empty() || self.sample_formats.contains(&format)
    }
}

/**
    What an option is set on: the container or the encoder of a stream.
*/
#[derive(Clone, Copy, Debug)]
pub enum OptionScope<'a> {
    Format(&'a OutputFormat),
    Encoder(&'a EncoderDescriptor),
}

impl OptionScope<'_> {
    /**
        Look `key` up in the private table, then the generic one.
    */
    pub fn find_static(&self, key: &str) -> Option<OptionKind> {
        match self {
            Self::Format(format) => find_in_tables(&[&format.options, &FORMAT_OPTIONS], key),
            Self::Encoder(encoder) => find_in_tables(&[&encoder.options, &CODEC_OPTIONS], key),
        }
    }
}

/**
    Raw input parameters for opening an encoder.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamParams {
    Video(VideoStreamInfo),
    Audio(AudioStreamInfo),
}

impl StreamParams {
    pub fn medium(&self) -> Medium {
        match self {
            Self::Video(_) => Medium::Video,
            Self::Audio(_) => Medium::Audio,
        }
    }
}

/**
    Everything needed to open the encoder of a stream.
*/
#[derive(Clone, Debug)]
pub struct EncoderSetup {
    pub params: StreamParams,
    /// Time base of the timestamps handed to the encoder.
    pub time_base: Rational,
    /// Statistics from a previous pass, for second-pass encoding. Opaque
    /// to everything but the encoder.
    pub stats_in: Option<Vec<u8>>,
}

/**
    Capabilities of an encoding and muxing library.

    Every stream is identified by its [`Medium`]; a session holds at most one
    stream per medium. Encoders return packets with timestamps in the
    encoder time base given at open; the session rescales them before
    calling [`Backend::write_packet`].
*/
pub trait Backend {
    /**
        Find a container by name, falling back to the file extension.
    */
    fn guess_format(&mut self, name: Option<&str>, file: &str) -> Option<OutputFormat>;

    /**
        Find an encoder by name, or the format's default for `medium`.
    */
    fn find_encoder(
        &mut self,
        name: Option<&str>,
        format: &OutputFormat,
        medium: Medium,
    ) -> Option<EncoderDescriptor>;

    /**
        Value type of option `key` in `scope`, or `None` if the library does
        not know it.
    */
    fn find_option(&self, scope: OptionScope<'_>, key: &str) -> Option<OptionKind> {
        scope.find_static(key)
    }

    /**
        Add a stream to the container.
    */
    fn new_stream(&mut self, encoder: &EncoderDescriptor) -> Result<()>;

    /**
        Open the encoder of a stream, consuming the options it understands
        from `options`.
    */
    fn open_encoder(
        &mut self,
        medium: Medium,
        setup: &EncoderSetup,
        options: &mut Dictionary,
    ) -> Result<()>;

    /**
        Encode one image, or drain buffered output when `frame` is `None`.

        Returns at most one packet per call; `Ok(None)` while draining means
        the encoder is empty.
    */
    fn encode_video(&mut self, frame: Option<&VideoFrame>) -> Result<Option<Packet>>;

    /**
        Encode one block of samples, or drain buffered output when `frame`
        is `None`.
    */
    fn encode_audio(&mut self, frame: Option<&AudioFrame>) -> Result<Option<Packet>>;

    /**
        First-pass statistics produced since the last call, if any.
    */
    fn stats_out(&mut self, medium: Medium) -> Option<String>;

    /**
        Samples per frame the open audio encoder requires, when it only knows
        after opening. Defaults to the descriptor's value.
    */
    fn audio_frame_size(&self) -> Option<usize> {
        None
    }

    /**
        Time base the container chose for a stream. Only final once the
        header is written.
    */
    fn stream_time_base(&self, medium: Medium) -> Option<Rational>;

    fn open_sink(&mut self, file: &str) -> Result<()>;

    /**
        Write the container header, consuming the options it understands.
    */
    fn write_header(&mut self, options: &mut Dictionary) -> Result<()>;

    /**
        Interleave and write one packet, already in the stream time base.
    */
    fn write_packet(&mut self, packet: Packet) -> Result<()>;

    fn write_trailer(&mut self) -> Result<()>;

    fn close_encoder(&mut self, medium: Medium);

    /**
        Bytes written to the output sink so far, if one is open.
    */
    fn sink_position(&self) -> Option<u64>;

    fn close_sink(&mut self) -> Result<()>;
}
