/*!
    Audio/video clock offset tracking.

    Audio output time advances with the number of samples encoded, while
    video frames carry presentation timestamps from the decoder. The skew
    between the two lets video be timestamped on the audio clock, without
    a shared capture clock.
*/

use tracing::{debug, info};

/**
    Jumps larger than this (in seconds) are applied at once instead of
    being smoothed.
*/
pub const SNAP_THRESHOLD: f64 = 1.0;

/**
    How much the current skew can be trusted.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing known yet.
    Unknown,
    /// Guessed by the video side, waiting for the first audio sample.
    Tentative,
    /// Measured from audio.
    Locked,
    /// Invalidated by a discontinuity; video must wait for audio.
    ForcedInvalid,
}

/**
    Tracker for the audio-minus-video skew.

    Inactive when timestamps are copied through, or when the session has no
    audio stream; an inactive tracker always reports zero skew.
*/
#[derive(Clone, Debug)]
pub struct TimestampSync {
    enabled: bool,
    has_audio: bool,
    state: SyncState,
    skew: f64,
}

impl TimestampSync {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            has_audio: false,
            state: SyncState::Unknown,
            skew: 0.0,
        }
    }

    pub fn set_audio_present(&mut self, present: bool) {
        self.has_audio = present;
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.has_audio
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn skew(&self) -> f64 {
        self.skew
    }

    /**
        Feed one measured skew sample, with `dt` in `[0, 1]` as the
        smoothing weight of the new sample.
    */
    pub fn record_sample(&mut self, a_minus_v: f64, dt: f64) {
        if !self.is_active() {
            return;
        }
        let jump = a_minus_v - self.skew;
        if self.state != SyncState::Locked || jump.abs() > SNAP_THRESHOLD {
            let kind = match self.state {
                SyncState::Unknown | SyncState::Tentative => "initial",
                SyncState::ForcedInvalid => "discontinuity",
                SyncState::Locked => "forced",
            };
            info!(kind, skew = a_minus_v, jump, "a/v skew reset");
            self.skew = a_minus_v;
            self.state = SyncState::Locked;
            return;
        }
        let dt = dt.clamp(0.0, 1.0);
        self.skew = a_minus_v * dt + self.skew * (1.0 - dt);
    }

    /**
        Current skew. An unknown skew is initialized from `initial_guess`
        and stays tentative until audio reports.
    */
    pub fn query(&mut self, initial_guess: f64) -> f64 {
        if !self.is_active() {
            return 0.0;
        }
        match self.state {
            SyncState::Unknown => {
                debug!(skew = initial_guess, "a/v skew guessed");
                self.skew = initial_guess;
                self.state = SyncState::Tentative;
            }
            SyncState::ForcedInvalid => {
                self.skew = initial_guess;
                self.state = SyncState::Locked;
            }
            SyncState::Tentative | SyncState::Locked => {}
        }
        self.skew
    }

    /**
        Mark the skew stale after a discontinuity.
    */
    pub fn invalidate(&mut self) {
        if !self.is_active() {
            return;
        }
        self.state = match self.state {
            SyncState::Locked => SyncState::ForcedInvalid,
            SyncState::Tentative => SyncState::Unknown,
            other => other,
        };
    }

    /**
        True while video must not be timestamped.
    */
    pub fn has_failed(&self) -> bool {
        self.state == SyncState::ForcedInvalid
    }
}
