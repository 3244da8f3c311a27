/*!
    Integer timestamps counted in time base units.
*/

use crate::Rational;

/**
    Presentation timestamp in time_base units.

    Carries no time base of its own; whoever holds one also knows which
    base it is counted in. Negative values are valid and show up with
    offsets and copied input timestamps.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Timestamp of `seconds` in `time_base`, rounded half up to a tick.
    */
    #[inline]
    pub fn from_secs_f64(seconds: f64, time_base: Rational) -> Self {
        Self(secs_to_ticks(seconds, time_base))
    }

    #[inline]
    pub fn as_secs_f64(self, time_base: Rational) -> f64 {
        self.0 as f64 * time_base.to_f64()
    }

    /**
        Same instant counted in `to` instead of `from`.
    */
    #[inline]
    pub fn rescale(self, from: Rational, to: Rational) -> Self {
        Self(Rational::rescale(self.0, from, to))
    }
}

/**
    Length in time_base units, as carried by packets.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(pub i64);

impl MediaDuration {
    #[inline]
    pub fn rescale(self, from: Rational, to: Rational) -> Self {
        Self(Rational::rescale(self.0, from, to))
    }
}

fn secs_to_ticks(seconds: f64, time_base: Rational) -> i64 {
    (seconds * time_base.den as f64 / time_base.num as f64 + 0.5).floor() as i64
}
