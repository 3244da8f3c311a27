/*!
    Raw frame types handed to encoders.
*/

use crate::{ChannelLayout, PixelFormat, Pts, Rational, SampleFormat};

/**
    A raw video image.

    Planes are stored back to back and tightly packed, in the order given by
    [`PixelFormat::plane_layout`].
*/
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
}

impl VideoFrame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            pts,
            time_base,
        }
    }

    /**
        Create an untimed, zero-filled image of the given geometry.
    */
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        Self::new(
            vec![0u8; format.image_size(width, height)],
            width,
            height,
            format,
            None,
            Rational::new(1, 1),
        )
    }

    /**
        Seconds of the frame's own timestamp, used when the caller passes
        no presentation time.
    */
    pub fn presentation_time(&self) -> Option<f64> {
        self.pts.map(|pts| pts.as_secs_f64(self.time_base))
    }

    /**
        Copy the pixels (not the timing) of `other` into this frame,
        reusing the existing allocation where possible.
    */
    pub fn copy_image_from(&mut self, other: &VideoFrame) {
        self.data.clear();
        self.data.extend_from_slice(&other.data);
        self.width = other.width;
        self.height = other.height;
        self.format = other.format;
    }

    /**
        Returns true if the data length matches the declared geometry.
    */
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.format.image_size(self.width, self.height)
    }
}

/**
    A block of interleaved samples, one encoder frame long.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct AudioFrame {
    pub data: Vec<u8>,
    /// Per channel.
    pub samples: usize,
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub format: SampleFormat,
    pub pts: Option<Pts>,
    pub time_base: Rational,
}

impl AudioFrame {
    pub fn new(
        data: Vec<u8>,
        samples: usize,
        sample_rate: u32,
        channels: ChannelLayout,
        format: SampleFormat,
        pts: Option<Pts>,
        time_base: Rational,
    ) -> Self {
        Self {
            data,
            samples,
            sample_rate,
            channels,
            format,
            pts,
            time_base,
        }
    }

    pub fn bytes_per_sample_frame(&self) -> usize {
        self.channels.channels() as usize * self.format.bytes_per_sample()
    }

    /**
        Returns the expected data length in bytes.
    */
    pub fn expected_data_len(&self) -> usize {
        self.samples * self.bytes_per_sample_frame()
    }
}

static_assertions::assert_impl_all!(VideoFrame: Send, Sync);
static_assertions::assert_impl_all!(AudioFrame: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    const TB_1_1000: Rational = Rational { num: 1, den: 1000 };

    #[test]
    fn video_frame_presentation_time() {
        let frame = VideoFrame::new(
            vec![],
            100,
            100,
            PixelFormat::Bgra,
            Some(Pts(1500)),
            TB_1_1000,
        );
        assert_eq!(frame.presentation_time(), Some(1.5));

        let untimed = VideoFrame::new(vec![], 100, 100, PixelFormat::Bgra, None, TB_1_1000);
        assert_eq!(untimed.presentation_time(), None);
    }

    #[test]
    fn blank_frame_is_well_formed() {
        let frame = VideoFrame::blank(16, 8, PixelFormat::Yuv420p);
        assert_eq!(frame.data.len(), 16 * 8 * 3 / 2);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn copy_image_keeps_own_timing() {
        let mut kept = VideoFrame::blank(2, 2, PixelFormat::Rgba);
        kept.pts = Some(Pts(7));
        let mut source = VideoFrame::blank(4, 4, PixelFormat::Rgba);
        source.data.fill(9);
        source.pts = Some(Pts(100));

        kept.copy_image_from(&source);
        assert_eq!(kept.width, 4);
        assert_eq!(kept.data, source.data);
        assert_eq!(kept.pts, Some(Pts(7)));
    }

    #[test]
    fn audio_frame_sizes() {
        let frame = AudioFrame::new(
            vec![],
            1024,
            48000,
            ChannelLayout::Stereo,
            SampleFormat::S16,
            None,
            Rational::new(1, 48000),
        );
        assert_eq!(frame.bytes_per_sample_frame(), 4);
        assert_eq!(frame.expected_data_len(), 4096);
    }
}
