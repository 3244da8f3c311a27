/*!
    Encode session: timestamp synchronization and output lifecycle for
    writing one video and one audio stream into a container.

    The session sits between a playback loop and an encode/mux library. It
    allocates streams, keeps a monotonic timestamp sequence across the
    independently clocked audio and video inputs, repeats or drops video
    frames to fit the output frame rate, cuts audio into encoder-sized
    frames, and handles two-pass statistics files. Compression and container
    writing are left to a [`Backend`].

    # Basic Usage

    ```ignore
    use encode_sink::{EncodeSession, MemoryBackend, OutputTarget};

    let target = OutputTarget::new("out.mkv")
        .with_fps(25.0)
        .with_video_option("crf=20");

    let Some(mut session) = EncodeSession::init(target, MemoryBackend::new())? else {
        return Ok(()); // no output file, encoding disabled
    };

    session.configure_video(VideoStreamInfo::new(1280, 720, PixelFormat::Yuv420p))?;
    let audio = session.configure_audio(audio_info)?;

    for (image, time) in decoded_video {
        session.submit_video(&image, Some(time))?;
    }
    session.submit_audio(&samples, Some(time))?;

    // Drain encoders and write the trailer (critical!)
    session.finish();
    ```

    # Timestamps

    Video is timestamped on the audio clock: the audio side reports the
    skew between the samples it has encoded and the input presentation
    time, and the video side adds it to each frame's time. Setting
    `copyts` disables this and passes input times through.

    # Features

    - `ffmpeg`: [`FfmpegBackend`], writing real files through libavformat
*/

pub use encode_types::{
    AudioFrame, AudioStreamInfo, ChannelLayout, MediaDuration, Medium, Packet, PipelineSignal,
    PixelFormat, Pts, Rational, SampleFormat, VideoFrame, VideoStreamInfo,
};

mod audio;
mod backend;
mod config;
mod context;
mod error;
mod mux;
mod options;
mod presets;
mod session;
mod status;
mod sync;
mod twopass;
mod video;

pub use audio::{PCM_FRAME_SIZE, channel_layout, negotiate_format};
pub use backend::{
    Backend, EncoderDescriptor, EncoderSetup, FailurePoint, MemoryBackend, OptionScope,
    OutputFormat, StreamParams,
};
pub use config::OutputTarget;
pub use context::FALLBACK_FRAME_RATE;
pub use error::{Error, Result};
pub use mux::{MuxCounters, MuxState};
pub use options::{
    CODEC_OPTIONS, Dictionary, FORMAT_OPTIONS, OptionKind, OptionSpec, OptionStatus, OptionTable,
    apply_option, apply_option_with, value_has_flag,
};
pub use presets::{PresetCategory, PresetSelection};
pub use session::{EncodeSession, available};
pub use status::format_status;
pub use sync::{SyncState, TimestampSync};
pub use twopass::{TwoPassLog, log_path};
pub use video::CadenceBase;

#[cfg(feature = "ffmpeg")]
pub use backend::FfmpegBackend;
