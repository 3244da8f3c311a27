/*!
    Raw input stream descriptions.
*/

use crate::{ChannelLayout, PixelFormat, Rational, SampleFormat};

/**
    Geometry and timing of the raw video handed to an encoder.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Time base the caller's frame timestamps are expressed in.
    pub time_base: Rational,
    /// Display aspect ratio divided by storage aspect ratio.
    pub sample_aspect_ratio: Rational,
}

impl VideoStreamInfo {
    /**
        Create a description with square pixels and a microsecond time base.
    */
    pub const fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
            time_base: Rational { num: 1, den: 1_000_000 },
            sample_aspect_ratio: Rational { num: 1, den: 1 },
        }
    }

    /**
        Set the sample aspect ratio from a requested display size.

        Matches the display aspect `display_width:display_height` for an image
        stored at `width:height`.
    */
    pub fn with_display_size(mut self, display_width: u32, display_height: u32) -> Self {
        let num = display_width as i64 * self.height as i64;
        let den = display_height as i64 * self.width as i64;
        if num > 0 && den > 0 {
            let ratio = num as f64 / den as f64;
            self.sample_aspect_ratio = Rational::from_f64(ratio, 255);
        }
        self
    }

    /**
        Returns the size in bytes of one tightly packed image.
    */
    pub fn image_size(&self) -> usize {
        self.pixel_format.image_size(self.width, self.height)
    }
}

/**
    Layout of the raw audio handed to an encoder.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub sample_format: SampleFormat,
}

impl AudioStreamInfo {
    pub const fn new(sample_rate: u32, channels: ChannelLayout, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /**
        Bytes per sample across all channels.
    */
    pub const fn bytes_per_sample_frame(&self) -> usize {
        self.channels.channels() as usize * self.sample_format.bytes_per_sample()
    }

    /**
        Time base of one sample, `1/sample_rate`.
    */
    pub fn sample_time_base(&self) -> Rational {
        Rational::new(1, self.sample_rate.max(1) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_size_sets_aspect() {
        let info = VideoStreamInfo::new(720, 576, PixelFormat::Yuv420p).with_display_size(1024, 576);
        assert_eq!(info.sample_aspect_ratio, Rational::new(64, 45));
    }

    #[test]
    fn square_display_keeps_unit_aspect() {
        let info = VideoStreamInfo::new(640, 480, PixelFormat::Yuv420p).with_display_size(640, 480);
        assert_eq!(info.sample_aspect_ratio, Rational::new(1, 1));
        assert_eq!(info.image_size(), 640 * 480 * 3 / 2);
    }

    #[test]
    fn audio_sample_frame_size() {
        let info = AudioStreamInfo::new(44100, ChannelLayout::Surround51, SampleFormat::S16);
        assert_eq!(info.bytes_per_sample_frame(), 12);
        assert_eq!(info.sample_time_base(), Rational::new(1, 44100));
    }
}
