/*!
    Video cadence: turns timestamped images into a fixed time base
    sequence, repeating the held image across gaps and dropping images
    that arrive out of order.
*/

use std::cmp::Ordering;

use tracing::{debug, error, info, warn};

use encode_types::{MediaDuration, Medium, Packet, Pts, Rational, VideoFrame, VideoStreamInfo};

use crate::backend::Backend;
use crate::config::OutputTarget;
use crate::context::EncodeContext;
use crate::error::{Error, Result};

/**
    The coarser of the codec and stream time bases. Committed timestamps
    are counted in this base so conversions to either side round-trip.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CadenceBase {
    pub time_base: Rational,
    pub codec_time_base: Rational,
    pub stream_time_base: Rational,
}

impl CadenceBase {
    pub fn new(codec_time_base: Rational, stream_time_base: Rational) -> Self {
        let time_base = match codec_time_base.cmp_value(stream_time_base) {
            Ordering::Less => stream_time_base,
            Ordering::Equal | Ordering::Greater => codec_time_base,
        };
        Self {
            time_base,
            codec_time_base,
            stream_time_base,
        }
    }

    pub fn to_codec(&self, pts: i64) -> i64 {
        Rational::rescale(pts, self.time_base, self.codec_time_base)
    }

    pub fn to_stream(&self, pts: i64) -> i64 {
        Rational::rescale(pts, self.time_base, self.stream_time_base)
    }
}

pub(crate) struct VideoAdapter {
    info: VideoStreamInfo,
    offset: f64,
    harddup: bool,
    neverdrop: bool,
    copyts: bool,
    base: Option<CadenceBase>,
    /// Last timestamp handed to the encoder, in cadence units.
    last_pts: Option<i64>,
    /// Start of the held image, in cadence units.
    last_frame_pts: Option<i64>,
    held: VideoFrame,
    repeats: u32,
    wrote_first_packet: bool,
    last_input_time: Option<f64>,
}

impl VideoAdapter {
    pub fn new(info: VideoStreamInfo, target: &OutputTarget) -> Self {
        Self {
            info,
            offset: target.video_offset,
            harddup: target.harddup,
            neverdrop: target.neverdrop,
            copyts: target.copyts,
            base: None,
            last_pts: None,
            last_frame_pts: None,
            held: VideoFrame::blank(info.width, info.height, info.pixel_format),
            repeats: 0,
            wrote_first_packet: false,
            last_input_time: None,
        }
    }

    pub fn info(&self) -> &VideoStreamInfo {
        &self.info
    }

    /**
        Check a new configuration against the open stream. Only the aspect
        ratio may change, and that is ignored with a warning.
    */
    pub fn reconfigure(&self, info: &VideoStreamInfo) -> Result<()> {
        if info.width != self.info.width || info.height != self.info.height {
            error!(
                from = %format!("{}x{}", self.info.width, self.info.height),
                to = %format!("{}x{}", info.width, info.height),
                "resolution changes not supported"
            );
            return Err(Error::ResolutionChange {
                from_width: self.info.width,
                from_height: self.info.height,
                to_width: info.width,
                to_height: info.height,
            });
        }
        if info.sample_aspect_ratio != self.info.sample_aspect_ratio {
            warn!(
                from = %self.info.sample_aspect_ratio,
                to = %info.sample_aspect_ratio,
                "aspect ratio changes not supported, keeping the old one"
            );
        }
        Ok(())
    }

    /**
        True when a held image may still need to be emitted at teardown.
    */
    pub fn needs_flush(&self) -> bool {
        self.last_pts.is_some_and(|pts| pts >= 0)
    }

    pub fn forget_input_time(&mut self) {
        self.last_input_time = None;
    }

    /**
        Feed one image, or flush the encoder when `frame` is `None`.

        `time` is the presentation time in seconds; without one the frame's
        own timestamp is used, then the previous input time.
    */
    pub fn submit<B: Backend>(
        &mut self,
        ctx: &mut EncodeContext<B>,
        frame: Option<&VideoFrame>,
        time: Option<f64>,
    ) -> Result<()> {
        ctx.start()?;

        if let Some(frame) = frame {
            if frame.width != self.info.width || frame.height != self.info.height {
                return Err(Error::ResolutionChange {
                    from_width: self.info.width,
                    from_height: self.info.height,
                    to_width: frame.width,
                    to_height: frame.height,
                });
            }
        }

        if ctx.sync.has_failed() {
            error!("frame dropped entirely because time sync did not run yet");
            return Ok(());
        }

        let base = self.cadence_base(ctx);

        let mut target = match frame {
            Some(frame) => {
                let time = time
                    .or_else(|| frame.presentation_time())
                    .or(self.last_input_time)
                    .unwrap_or(0.0);
                self.last_input_time = Some(time);
                let skew = ctx.sync.query(-time);
                Pts::from_secs_f64(time + skew + self.offset, base.time_base).0
            }
            None => self.last_pts.map_or(0, |pts| pts + 1),
        };

        if self.neverdrop {
            if let Some(last) = self.last_pts.filter(|&last| target <= last) {
                info!(from = target, to = last + 1, "pts fixed");
                target = last + 1;
            }
        }

        if let Some(mut last) = self.last_pts {
            while last < target {
                let step = if self.harddup { 1 } else { target - last };
                self.held.pts = Some(Pts(base.to_codec(last)));
                self.held.time_base = base.codec_time_base;
                let encoded = ctx.backend.encode_video(Some(&self.held));
                self.handle_encoded(ctx, &base, last, encoded)?;
                last += step;
                self.repeats += 1;
            }
            self.last_pts = Some(last);
        }

        let Some(frame) = frame else {
            let last = self.last_pts.unwrap_or(0);
            loop {
                let encoded = ctx.backend.encode_video(None);
                if !self.handle_encoded(ctx, &base, last, encoded)? {
                    break;
                }
            }
            return Ok(());
        };

        if self.last_frame_pts.is_none_or(|start| target >= start) {
            if let Some(start) = self.last_frame_pts {
                if self.repeats != 1 {
                    info!(pts = start, times = self.repeats, "frame displayed repeatedly");
                }
            }
            self.held.copy_image_from(frame);
            self.last_frame_pts = Some(target);
            self.last_pts = Some(if self.copyts && target < 0 { -1 } else { target });
            self.repeats = 0;
        } else {
            info!(pts = target, "frame dropped entirely because pts went backwards");
        }
        Ok(())
    }

    fn cadence_base<B: Backend>(&mut self, ctx: &EncodeContext<B>) -> CadenceBase {
        if let Some(base) = self.base {
            return base;
        }
        let base = CadenceBase::new(
            ctx.codec_time_base(Medium::Video),
            ctx.stream_time_base(Medium::Video),
        );
        if base.time_base == base.codec_time_base {
            debug!(time_base = %base.time_base, "cadence uses the codec time base");
        } else {
            warn!(
                time_base = %base.time_base,
                codec = %base.codec_time_base,
                "container time base is coarser than the codec's, output may not be frame-exact"
            );
        }
        self.base = Some(base);
        base
    }

    /**
        Write what the encoder returned. Returns true if a packet was written.
    */
    fn handle_encoded<B: Backend>(
        &mut self,
        ctx: &mut EncodeContext<B>,
        base: &CadenceBase,
        committed: i64,
        encoded: encode_types::Result<Option<Packet>>,
    ) -> Result<bool> {
        ctx.flush_stats(Medium::Video);

        let mut packet = match encoded {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(false),
            Err(e) => {
                error!(error = %e, "error encoding video");
                return Ok(false);
            }
        };

        let missing_pts = packet.pts.is_none();
        packet.rescale_to(base.stream_time_base);
        if missing_pts {
            warn!(pts = committed, "encoder did not provide pts, using last committed");
            packet.pts = Some(Pts(base.to_stream(committed)));
        }

        let reorders = ctx
            .stream(Medium::Video)
            .is_some_and(|s| s.encoder.reorders_frames);
        let stream_tb = base.stream_time_base;
        if !self.wrote_first_packet && reorders && stream_tb.num as i64 * 1000 <= stream_tb.den as i64 {
            let duration = Rational::rescale(1, base.codec_time_base, stream_tb).max(1);
            packet.duration = MediaDuration(duration);
        }

        ctx.write_packet(packet)?;
        self.wrote_first_packet = true;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarser_base_wins() {
        let base = CadenceBase::new(Rational::new(1, 25), Rational::new(1, 90000));
        assert_eq!(base.time_base, Rational::new(1, 25));
        assert_eq!(base.to_stream(3), 10800);

        let base = CadenceBase::new(Rational::new(1, 90000), Rational::new(1, 1000));
        assert_eq!(base.time_base, Rational::new(1, 1000));
    }

    #[test]
    fn cadence_round_trips() {
        let base = CadenceBase::new(Rational::new(1001, 30000), Rational::new(1, 1000));
        for pts in [0i64, 1, 2, 29, 30, 1001, 65535, i32::MAX as i64, i32::MIN as i64] {
            let codec = base.to_codec(pts);
            assert_eq!(Rational::rescale(codec, base.codec_time_base, base.time_base), pts);
            let stream = base.to_stream(pts);
            assert_eq!(Rational::rescale(stream, base.stream_time_base, base.time_base), pts);
        }
    }

    #[test]
    fn reconfigure_rules() {
        let info = VideoStreamInfo::new(640, 480, encode_types::PixelFormat::Yuv420p);
        let adapter = VideoAdapter::new(info, &OutputTarget::new("x.mkv"));

        assert!(adapter.reconfigure(&info.with_display_size(854, 480)).is_ok());
        let bigger = VideoStreamInfo::new(1280, 720, encode_types::PixelFormat::Yuv420p);
        assert!(matches!(
            adapter.reconfigure(&bigger),
            Err(Error::ResolutionChange { to_width: 1280, .. })
        ));
    }
}
