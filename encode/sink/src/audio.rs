/*!
    Audio packetizer: cuts interleaved samples into encoder-sized frames,
    applies the start offset and keeps packet timestamps increasing.
*/

use tracing::{debug, error, warn};

use encode_types::{AudioFrame, AudioStreamInfo, ChannelLayout, Medium, Packet, Pts};

use crate::backend::{Backend, EncoderDescriptor};
use crate::config::OutputTarget;
use crate::context::EncodeContext;
use crate::error::Result;

/**
    Samples per frame for encoders that accept any amount (PCM).
*/
pub const PCM_FRAME_SIZE: usize = 16384;

/**
    Pick the sample format to encode in: the requested one when the encoder
    takes it, otherwise the encoder's first.
*/
pub fn negotiate_format(requested: AudioStreamInfo, encoder: &EncoderDescriptor) -> AudioStreamInfo {
    if encoder.supports_sample_format(requested.sample_format) {
        return requested;
    }
    match encoder.sample_formats.first() {
        Some(&format) => {
            warn!(
                encoder = %encoder.name,
                requested = ?requested.sample_format,
                chosen = ?format,
                "sample format not supported by encoder, converting"
            );
            AudioStreamInfo {
                sample_format: format,
                ..requested
            }
        }
        None => requested,
    }
}

/**
    Channel layout for a raw channel count. Counts without a conventional
    layout are logged and left to the caller to remap.
*/
pub fn channel_layout(channels: u16) -> Option<ChannelLayout> {
    let layout = ChannelLayout::from_channels(channels);
    if layout.is_none() {
        warn!(channels, "unknown channel layout");
    }
    layout
}

pub(crate) struct AudioAdapter {
    info: AudioStreamInfo,
    frame_size: usize,
    copyts: bool,
    offset_secs: f64,
    /// Samples still to pad (positive) or skip (negative) at the start.
    offset_left: i64,
    buffer: Vec<u8>,
    /// Input time of the first buffered sample.
    buffer_time: Option<f64>,
    frames_encoded: u64,
    /// Running estimate for the next packet lacking an encoder timestamp.
    saved_pts: Option<i64>,
    last_pts: Option<i64>,
}

impl AudioAdapter {
    pub fn new(info: AudioStreamInfo, frame_size: Option<usize>, target: &OutputTarget) -> Self {
        let frame_size = frame_size.filter(|&n| n > 0).unwrap_or(PCM_FRAME_SIZE);
        let offset = (info.sample_rate as f64 * target.audio_offset) as i64;
        debug!(frame_size, offset, "audio packetizer ready");
        Self {
            info,
            frame_size,
            copyts: target.copyts,
            offset_secs: target.audio_offset,
            offset_left: offset,
            buffer: Vec::new(),
            buffer_time: None,
            frames_encoded: 0,
            saved_pts: None,
            last_pts: None,
        }
    }

    pub fn info(&self) -> &AudioStreamInfo {
        &self.info
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn sample_bytes(&self) -> usize {
        self.info.bytes_per_sample_frame().max(1)
    }

    fn frame_bytes(&self) -> usize {
        self.frame_size * self.sample_bytes()
    }

    fn rate(&self) -> f64 {
        self.info.sample_rate.max(1) as f64
    }

    /**
        Drop buffered samples after a discontinuity.
    */
    pub fn discard_buffer(&mut self) {
        if !self.buffer.is_empty() {
            debug!(bytes = self.buffer.len(), "dropping buffered audio");
        }
        self.buffer.clear();
        self.buffer_time = None;
    }

    /**
        Take interleaved samples starting at input time `time` (seconds).
        Returns the number of bytes consumed, always whole samples.
    */
    pub fn submit<B: Backend>(
        &mut self,
        ctx: &mut EncodeContext<B>,
        data: &[u8],
        time: Option<f64>,
    ) -> Result<usize> {
        ctx.start()?;

        let sample_bytes = self.sample_bytes();
        let samples = data.len() / sample_bytes;
        let consumed = samples * sample_bytes;
        let mut data = &data[..consumed];
        let mut time = time;

        if !self.copyts {
            if self.offset_left < 0 {
                let skip = (-self.offset_left).min(samples as i64);
                self.offset_left += skip;
                if skip as usize == samples {
                    debug!(samples, left = -self.offset_left, "skipping audio for negative offset");
                    return Ok(consumed);
                }
                data = &data[skip as usize * sample_bytes..];
                time = time.map(|t| t + skip as f64 / self.rate());
            } else if self.offset_left > 0 && samples > 0 {
                let pad = self.offset_left as usize;
                debug!(samples = pad, "padding audio start with silence");
                let start = time.map(|t| t - pad as f64 / self.rate());
                self.append(&vec![self.info.sample_format.silence_byte(); pad * sample_bytes], start);
                self.offset_left = 0;
            }
        }

        self.append(data, time);

        let frame_bytes = self.frame_bytes();
        while self.buffer.len() >= frame_bytes {
            let frame: Vec<u8> = self.buffer.drain(..frame_bytes).collect();
            let apts = self.buffer_time.map(|t| t + self.offset_secs);
            self.encode_frame(ctx, Some(frame), apts)?;
            let frame_secs = self.frame_size as f64 / self.rate();
            self.buffer_time = self.buffer_time.map(|t| t + frame_secs);
        }

        Ok(consumed)
    }

    /**
        Encode the partial buffer padded with silence, then drain the encoder.
    */
    pub fn flush<B: Backend>(&mut self, ctx: &mut EncodeContext<B>) -> Result<()> {
        let frame_secs = self.frame_size as f64 / self.rate();
        let mut apts = self.buffer_time.map(|t| t + self.offset_secs);

        if !self.buffer.is_empty() {
            let mut frame = std::mem::take(&mut self.buffer);
            debug!(samples = frame.len() / self.sample_bytes(), "encoding final partial frame");
            frame.resize(self.frame_bytes(), self.info.sample_format.silence_byte());
            self.encode_frame(ctx, Some(frame), apts)?;
            apts = apts.map(|t| t + frame_secs);
        }
        self.buffer_time = None;

        while self.encode_frame(ctx, None, apts)? {
            apts = apts.map(|t| t + frame_secs);
        }
        Ok(())
    }

    fn append(&mut self, data: &[u8], time: Option<f64>) {
        if data.is_empty() {
            return;
        }
        if let Some(time) = time {
            let buffered = (self.buffer.len() / self.sample_bytes()) as f64;
            self.buffer_time = Some(time - buffered / self.rate());
        }
        self.buffer.extend_from_slice(data);
    }

    /**
        Run one encoder call. `apts` is the input time of `data` including the
        stream offset. Returns true if a packet was written.
    */
    fn encode_frame<B: Backend>(
        &mut self,
        ctx: &mut EncodeContext<B>,
        data: Option<Vec<u8>>,
        apts: Option<f64>,
    ) -> Result<bool> {
        let rate = self.rate();
        let codec_time_base = self.info.sample_time_base();
        let real_secs = self.frames_encoded as f64 * self.frame_size as f64 / rate;
        let has_input = data.is_some();

        let frame = data.map(|data| {
            AudioFrame::new(
                data,
                self.frame_size,
                self.info.sample_rate,
                self.info.channels,
                self.info.sample_format,
                Some(Pts((self.frames_encoded * self.frame_size as u64) as i64)),
                codec_time_base,
            )
        });
        self.frames_encoded += 1;

        let encoded = ctx.backend.encode_audio(frame.as_ref());
        ctx.flush_stats(Medium::Audio);

        if encoded.is_ok() && has_input {
            if let Some(apts) = apts {
                let dt = (self.frame_size as f64 / rate).min(1.0);
                ctx.sync.record_sample(real_secs - apts, dt);
            }
        }

        let stream_tb = ctx.stream_time_base(Medium::Audio);
        if self.saved_pts.is_none() {
            self.saved_pts = Some(Pts::from_secs_f64(real_secs, stream_tb).0);
        }

        let mut packet: Packet = match encoded {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(false),
            Err(e) => {
                error!(error = %e, "error encoding audio");
                return Ok(false);
            }
        };

        packet.is_keyframe = true;
        packet.rescale_to(stream_tb);

        let mut pts = packet.pts.map(|p| p.0).or(self.saved_pts);
        self.saved_pts = None;

        if self.copyts {
            if let (Some(p), Some(apts)) = (pts, apts) {
                let shift = (apts - real_secs) * stream_tb.den as f64 / stream_tb.num as f64;
                pts = Some((p as f64 + shift + 0.5).floor() as i64);
            }
        }

        if let Some(mut p) = pts {
            if let Some(last) = self.last_pts.filter(|&last| p <= last) {
                warn!(pts = p, last, "audio pts went backwards, autofixed");
                p = last + 1;
            }
            self.last_pts = Some(p);
            pts = Some(p);
        }

        packet.pts = pts.map(Pts);
        packet.dts = packet.pts;
        ctx.write_packet(packet)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use encode_types::SampleFormat;

    #[test]
    fn keeps_supported_format() {
        let mut backend = MemoryBackend::new();
        let format = backend.guess_format(None, "a.avi").unwrap();
        let pcm = backend.find_encoder(None, &format, Medium::Audio).unwrap();

        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::S16);
        assert_eq!(negotiate_format(info, &pcm), info);

        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::F32);
        assert_eq!(negotiate_format(info, &pcm).sample_format, SampleFormat::S16);
    }

    #[test]
    fn channel_counts() {
        assert_eq!(channel_layout(1), Some(ChannelLayout::Mono));
        assert_eq!(channel_layout(6), Some(ChannelLayout::Surround51));
        assert_eq!(channel_layout(3), None);
    }

    #[test]
    fn pcm_uses_fixed_frame_size() {
        let mut backend = MemoryBackend::new();
        let format = backend.guess_format(None, "a.avi").unwrap();
        let pcm = backend.find_encoder(None, &format, Medium::Audio).unwrap();
        let aac = backend.find_encoder(Some("aac"), &format, Medium::Audio).unwrap();

        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::S16);
        let target = OutputTarget::new("a.avi");
        assert_eq!(
            AudioAdapter::new(info, pcm.frame_size, &target).frame_size(),
            PCM_FRAME_SIZE
        );
        assert_eq!(AudioAdapter::new(info, aac.frame_size, &target).frame_size(), 1024);
        assert_eq!(AudioAdapter::new(info, Some(0), &target).frame_size(), PCM_FRAME_SIZE);
    }
}
