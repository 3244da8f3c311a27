/*!
    The public encode session.
*/

use std::time::Duration;

use tracing::{error, info};

use encode_types::{
    AudioStreamInfo, Medium, Packet, PipelineSignal, PixelFormat, Rational, VideoFrame,
    VideoStreamInfo,
};

use crate::audio::{AudioAdapter, negotiate_format};
use crate::backend::{Backend, OutputFormat, StreamParams};
use crate::config::OutputTarget;
use crate::context::EncodeContext;
use crate::error::{Error, Result};
use crate::mux::{MuxCounters, MuxState};
use crate::status::format_status;
use crate::sync::SyncState;
use crate::video::VideoAdapter;

/**
    Returns true if `session` exists and can still take input.
*/
pub fn available<B: Backend>(session: Option<&EncodeSession<B>>) -> bool {
    session.is_some_and(|s| !s.is_finished())
}

/**
    An output file being encoded from one video and/or one audio input.

    Streams are allocated and configured before the first submission; the
    first submission writes the container header, after which no stream can
    be added. [`EncodeSession::finish`] drains the encoders and finalizes the
    file. Dropping a session without finishing it leaves the output
    unfinalized.

    All methods run to completion on the calling thread.
*/
pub struct EncodeSession<B: Backend> {
    ctx: EncodeContext<B>,
    video: Option<VideoAdapter>,
    audio: Option<AudioAdapter>,
}

impl<B: Backend> EncodeSession<B> {
    /**
        Create a session for `target`. Returns `Ok(None)` if the target has
        no output file, which disables encoding.
    */
    pub fn init(target: OutputTarget, backend: B) -> Result<Option<Self>> {
        Ok(EncodeContext::new(target, backend)?.map(|ctx| Self {
            ctx,
            video: None,
            audio: None,
        }))
    }

    pub fn target(&self) -> &OutputTarget {
        &self.ctx.target
    }

    pub fn format(&self) -> &OutputFormat {
        self.ctx.format()
    }

    pub fn backend(&self) -> &B {
        &self.ctx.backend
    }

    pub fn into_backend(self) -> B {
        self.ctx.backend
    }

    /**
        Shared time base of the session, once a stream was allocated.
    */
    pub fn time_base(&self) -> Option<Rational> {
        self.ctx.time_base()
    }

    pub fn counters(&self) -> MuxCounters {
        self.ctx.mux.counters
    }

    pub fn mux_state(&self) -> MuxState {
        self.ctx.mux.state
    }

    pub fn sync_state(&self) -> SyncState {
        self.ctx.sync.state()
    }

    /**
        Parameters the video encoder was opened with.
    */
    pub fn video_info(&self) -> Option<&VideoStreamInfo> {
        self.video.as_ref().map(|v| v.info())
    }

    /**
        Parameters the audio encoder was opened with.
    */
    pub fn audio_info(&self) -> Option<&AudioStreamInfo> {
        self.audio.as_ref().map(|a| a.info())
    }

    pub fn is_finished(&self) -> bool {
        self.ctx.mux.state == MuxState::Finished
    }

    /**
        Frame rate detected from the display, used when the target enables
        `autofps` and sets no explicit rate. Only effective before the first
        stream is allocated.
    */
    pub fn set_detected_fps(&mut self, fps: f64) {
        self.ctx.set_detected_fps(fps);
    }

    /**
        Returns true if the video encoder accepts `format` as input.
    */
    pub fn supports_pixel_format(&self, format: PixelFormat) -> bool {
        self.ctx
            .encoder(Medium::Video)
            .is_some_and(|e| e.supports_pixel_format(format))
    }

    /**
        Add the stream for `medium`. At most one per medium, and only before
        the header is written.
    */
    pub fn alloc_stream(&mut self, medium: Medium) -> Result<()> {
        self.ctx.alloc_stream(medium)
    }

    /**
        Open the video encoder for images of the given geometry. Allocates the
        video stream if needed. Calling again with the same size is accepted;
        a different size is rejected.
    */
    pub fn configure_video(&mut self, info: VideoStreamInfo) -> Result<()> {
        self.ctx.ensure_active()?;
        if let Some(video) = &self.video {
            return video.reconfigure(&info);
        }
        if !self.ctx.has_stream(Medium::Video) {
            self.ctx.alloc_stream(Medium::Video)?;
        }
        let mut info = info;
        info.time_base = self.ctx.codec_time_base(Medium::Video);
        self.ctx.open_stream(StreamParams::Video(info))?;
        info!(
            width = info.width,
            height = info.height,
            format = ?info.pixel_format,
            time_base = %info.time_base,
            "video configured"
        );
        self.video = Some(VideoAdapter::new(info, &self.ctx.target));
        Ok(())
    }

    /**
        Open the audio encoder. Allocates the audio stream if needed. Returns
        the layout actually encoded, which callers must deliver.
    */
    pub fn configure_audio(&mut self, info: AudioStreamInfo) -> Result<AudioStreamInfo> {
        self.ctx.ensure_active()?;
        if self.audio.is_some() {
            error!("rejecting audio reinitialization");
            return Err(Error::DuplicateStream(Medium::Audio));
        }
        if !self.ctx.has_stream(Medium::Audio) {
            self.ctx.alloc_stream(Medium::Audio)?;
        }
        let Some(encoder) = self.ctx.stream(Medium::Audio).map(|s| s.encoder.clone()) else {
            return Err(Error::NoStream(Medium::Audio));
        };
        let info = negotiate_format(info, &encoder);
        self.ctx.open_stream(StreamParams::Audio(info))?;
        let frame_size = self.ctx.backend.audio_frame_size().or(encoder.frame_size);
        let adapter = AudioAdapter::new(info, frame_size, &self.ctx.target);
        info!(
            rate = info.sample_rate,
            channels = info.channels.channels(),
            format = ?info.sample_format,
            frame_size = adapter.frame_size(),
            "audio configured"
        );
        self.audio = Some(adapter);
        Ok(info)
    }

    /**
        Write the container header. Called implicitly by the first submission.
    */
    pub fn start(&mut self) -> Result<()> {
        self.ctx.start()
    }

    /**
        Submit one image shown at `time` seconds. Without a time, the frame's
        own timestamp is used.
    */
    pub fn submit_video(&mut self, frame: &VideoFrame, time: Option<f64>) -> Result<()> {
        self.ctx.ensure_active()?;
        let Some(video) = self.video.as_mut() else {
            return Err(Error::NoStream(Medium::Video));
        };
        video.submit(&mut self.ctx, Some(frame), time)
    }

    /**
        Emit the held image and drain the video encoder.
    */
    pub fn flush_video(&mut self) -> Result<()> {
        self.ctx.ensure_active()?;
        let Some(video) = self.video.as_mut() else {
            return Err(Error::NoStream(Medium::Video));
        };
        video.submit(&mut self.ctx, None, None)
    }

    /**
        Submit interleaved samples whose first sample plays at `time` seconds.
        Returns the number of bytes consumed.
    */
    pub fn submit_audio(&mut self, data: &[u8], time: Option<f64>) -> Result<usize> {
        self.ctx.ensure_active()?;
        let Some(audio) = self.audio.as_mut() else {
            return Err(Error::NoStream(Medium::Audio));
        };
        audio.submit(&mut self.ctx, data, time)
    }

    /**
        Write an already encoded packet. The header must have been written.
    */
    pub fn write_packet(&mut self, packet: Packet) -> Result<()> {
        self.ctx.write_packet(packet)
    }

    /**
        Mark a discontinuity in the input (a seek). Video is held back until
        audio re-establishes the skew.
    */
    pub fn discontinuity(&mut self) {
        info!("input discontinuity");
        self.ctx.sync.invalidate();
        if let Some(video) = self.video.as_mut() {
            video.forget_input_time();
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.discard_buffer();
        }
    }

    /**
        React to a pipeline control signal.
    */
    pub fn signal(&mut self, signal: PipelineSignal) -> Result<()> {
        match signal {
            PipelineSignal::Flush => {
                self.ctx.ensure_active()?;
                self.discontinuity();
            }
            PipelineSignal::Eos => self.finish(),
        }
        Ok(())
    }

    /**
        Progress line for `relative_position` (0..1 of the input) and the
        input time reached, in seconds.
    */
    pub fn status(&self, relative_position: f32, playback_time: f32) -> String {
        let elapsed = self
            .ctx
            .mux
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);
        format_status(
            relative_position,
            playback_time,
            elapsed,
            self.ctx.mux.counters.video_frames,
            self.ctx.backend.sink_position().unwrap_or(0),
        )
    }

    /**
        Drain the encoders, write the trailer and close the output. Failures
        are logged; calling again does nothing.
    */
    pub fn finish(&mut self) {
        if self.is_finished() {
            return;
        }
        if self.ctx.mux.state.is_written() {
            if let Some(video) = self.video.as_mut().filter(|v| v.needs_flush()) {
                if let Err(e) = video.submit(&mut self.ctx, None, None) {
                    error!(error = %e, "could not flush video");
                }
            }
            if let Some(audio) = self.audio.as_mut() {
                if let Err(e) = audio.flush(&mut self.ctx) {
                    error!(error = %e, "could not flush audio");
                }
            }
        }
        self.ctx.finish();
    }
}
