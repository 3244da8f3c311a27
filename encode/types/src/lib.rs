/*!
    Vocabulary shared by encode sessions and their backends.

    Raw images and sample blocks go in, compressed [`Packet`]s come out,
    and every timestamp is an integer counted in some [`Rational`] time
    base. Nothing here links against a codec library.

    - [`Rational`], [`Pts`], [`MediaDuration`]: time bases and timestamps
    - [`VideoFrame`], [`AudioFrame`]: raw input
    - [`VideoStreamInfo`], [`AudioStreamInfo`]: what an encoder is opened with
    - [`PixelFormat`], [`SampleFormat`], [`ChannelLayout`]
    - [`Packet`], [`Medium`]: encoder output and the stream it belongs to
    - [`PipelineSignal`]: seek and end-of-stream events
    - [`Error`]: backend failures
*/

mod error;
mod format;
mod frame;
mod packet;
mod rational;
mod signal;
mod stream;
mod timestamp;

pub use error::{Error, Result};
pub use format::{ChannelLayout, PixelFormat, SampleFormat};
pub use frame::{AudioFrame, VideoFrame};
pub use packet::{Medium, Packet};
pub use rational::Rational;
pub use signal::PipelineSignal;
pub use stream::{AudioStreamInfo, VideoStreamInfo};
pub use timestamp::{MediaDuration, Pts};
