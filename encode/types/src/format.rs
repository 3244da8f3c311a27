/*!
    Pixel and sample format types.
*/

/**
    Pixel formats an encoder may take as input.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    Yuv420p,
    Nv12,
    Bgra,
    Rgba,
    Rgb24,
    Bgr24,
    Yuv422p,
    Yuv444p,
    /// 10 bits stored in 16-bit little endian words.
    Yuv420p10,
}

impl PixelFormat {
    /**
        Returns the tightly packed layout of each plane as
        `(bytes_per_row, rows)`, in plane order.
    */
    pub fn plane_layout(self, width: u32, height: u32) -> Vec<(usize, usize)> {
        let w = width as usize;
        let h = height as usize;
        let half_w = w.div_ceil(2);
        let half_h = h.div_ceil(2);
        match self {
            Self::Yuv420p => vec![(w, h), (half_w, half_h), (half_w, half_h)],
            Self::Yuv420p10 => vec![(w * 2, h), (half_w * 2, half_h), (half_w * 2, half_h)],
            Self::Nv12 => vec![(w, h), (half_w * 2, half_h)],
            Self::Yuv422p => vec![(w, h), (half_w, h), (half_w, h)],
            Self::Yuv444p => vec![(w, h), (w, h), (w, h)],
            Self::Rgb24 | Self::Bgr24 => vec![(w * 3, h)],
            Self::Bgra | Self::Rgba => vec![(w * 4, h)],
        }
    }

    /**
        Returns the size in bytes of one tightly packed image.
    */
    pub fn image_size(self, width: u32, height: u32) -> usize {
        self.plane_layout(width, height)
            .iter()
            .map(|(row, rows)| row * rows)
            .sum()
    }
}

/**
    Interleaved sample formats.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    F32,
    F64,
    S16,
    S32,
    U8,
}

impl SampleFormat {
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /**
        Returns the byte value that encodes silence when repeated.

        Unsigned 8-bit audio is centered on 0x80, every other format on zero.
    */
    pub const fn silence_byte(self) -> u8 {
        match self {
            Self::U8 => 0x80,
            _ => 0x00,
        }
    }
}

/**
    Channel layouts with a conventional speaker order.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Surround50,
    Surround51,
    Surround71,
}

impl ChannelLayout {
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround50 => 5,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
        }
    }

    /**
        Returns the conventional layout for a channel count, if there is one.
    */
    pub const fn from_channels(channels: u16) -> Option<Self> {
        match channels {
            1 => Some(Self::Mono),
            2 => Some(Self::Stereo),
            5 => Some(Self::Surround50),
            6 => Some(Self::Surround51),
            8 => Some(Self::Surround71),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_format_bytes_per_sample() {
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::F32.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::F64.bytes_per_sample(), 8);
    }

    #[test]
    fn pixel_format_image_size() {
        assert_eq!(PixelFormat::Yuv420p.image_size(4, 4), 16 + 4 + 4);
        assert_eq!(PixelFormat::Yuv420p.image_size(3, 3), 9 + 4 + 4);
        assert_eq!(PixelFormat::Bgra.image_size(2, 2), 16);
        assert_eq!(PixelFormat::Nv12.plane_layout(4, 2), vec![(4, 2), (4, 1)]);
    }

    #[test]
    fn sample_format_silence() {
        assert_eq!(SampleFormat::U8.silence_byte(), 0x80);
        assert_eq!(SampleFormat::S16.silence_byte(), 0);
        assert_eq!(SampleFormat::F32.silence_byte(), 0);
    }

    #[test]
    fn channel_layout_channels() {
        assert_eq!(ChannelLayout::Mono.channels(), 1);
        assert_eq!(ChannelLayout::Stereo.channels(), 2);
        assert_eq!(ChannelLayout::Surround51.channels(), 6);
    }

    #[test]
    fn channel_layout_from_channels() {
        assert_eq!(ChannelLayout::from_channels(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_channels(8), Some(ChannelLayout::Surround71));
        assert_eq!(ChannelLayout::from_channels(3), None);
    }
}
