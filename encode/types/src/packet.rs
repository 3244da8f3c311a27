/*!
    Encoded packets and the medium of the stream they belong to.
*/

use std::fmt;

use crate::{MediaDuration, Pts, Rational};

/**
    Kind of media carried by a stream.

    An encode session holds at most one stream of each medium.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Medium {
    Video,
    Audio,
}

impl Medium {
    /**
        Both media, video first.
    */
    pub const ALL: [Medium; 2] = [Medium::Video, Medium::Audio];

    /**
        Lowercase name, as used in log lines.
    */
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
    One compressed packet leaving an encoder.

    Encoders produce packets in the codec time base. The session rescales
    them to the container stream time base right before muxing.
*/
#[derive(Clone, Debug)]
pub struct Packet {
    pub data: Vec<u8>,
    pub pts: Option<Pts>,
    /// Differs from `pts` when the encoder reorders frames.
    pub dts: Option<Pts>,
    pub duration: MediaDuration,
    /// Base that `pts`, `dts` and `duration` are counted in.
    pub time_base: Rational,
    pub is_keyframe: bool,
    pub medium: Medium,
}

impl Packet {
    pub fn new(
        data: Vec<u8>,
        pts: Option<Pts>,
        dts: Option<Pts>,
        duration: MediaDuration,
        time_base: Rational,
        is_keyframe: bool,
        medium: Medium,
    ) -> Self {
        Self {
            data,
            pts,
            dts,
            duration,
            time_base,
            is_keyframe,
            medium,
        }
    }

    /**
        Convert all timestamps and the duration into `time_base`,
        rounding to the nearest unit.
    */
    pub fn rescale_to(&mut self, time_base: Rational) {
        if self.time_base == time_base {
            return;
        }
        let from = self.time_base;
        self.pts = self.pts.map(|pts| pts.rescale(from, time_base));
        self.dts = self.dts.map(|dts| dts.rescale(from, time_base));
        self.duration = self.duration.rescale(from, time_base);
        self.time_base = time_base;
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

static_assertions::assert_impl_all!(Packet: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn video_packet(pts: i64, dts: i64) -> Packet {
        Packet::new(
            vec![1, 2, 3],
            Some(Pts(pts)),
            Some(Pts(dts)),
            MediaDuration(1),
            Rational::new(1, 25),
            false,
            Medium::Video,
        )
    }

    #[test]
    fn rescale_to_stream_base() {
        let mut packet = video_packet(3, 2);
        packet.rescale_to(Rational::new(1, 90000));

        assert_eq!(packet.pts, Some(Pts(10800)));
        assert_eq!(packet.dts, Some(Pts(7200)));
        assert_eq!(packet.duration, MediaDuration(3600));
        assert_eq!(packet.time_base, Rational::new(1, 90000));
        assert_eq!(packet.size(), 3);
    }

    #[test]
    fn rescale_to_coarser_base_rounds() {
        let mut packet = Packet::new(
            vec![],
            Some(Pts(1024)),
            None,
            MediaDuration(1024),
            Rational::new(1, 48000),
            true,
            Medium::Audio,
        );
        packet.rescale_to(Rational::new(1, 1000));

        assert_eq!(packet.pts, Some(Pts(21)));
        assert_eq!(packet.dts, None);
        assert_eq!(packet.duration, MediaDuration(21));
    }

    #[test]
    fn rescale_to_same_base_is_noop() {
        let mut packet = video_packet(7, 6);
        packet.rescale_to(Rational::new(1, 25));
        assert_eq!(packet.pts, Some(Pts(7)));
        assert_eq!(packet.dts, Some(Pts(6)));
    }

    #[test]
    fn medium_display() {
        assert_eq!(Medium::Video.to_string(), "video");
        assert_eq!(Medium::Audio.to_string(), "audio");
        assert_eq!(Medium::ALL, [Medium::Video, Medium::Audio]);
    }
}
