/*!
    Container lifecycle state and payload accounting.
*/

use std::time::Instant;

use encode_types::{Medium, Packet};

/**
    Where the container is in its lifecycle.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MuxState {
    #[default]
    NotStarted,
    /// Header write in progress.
    WritingHeader,
    /// Header written, packets may be written.
    Written,
    /// Opening the sink or writing the header failed. Terminal until finish.
    Failed,
    /// Trailer written and sink closed.
    Finished,
}

impl MuxState {
    /**
        Streams can only be added before any header write was attempted.
    */
    pub fn accepts_streams(self) -> bool {
        self == Self::NotStarted
    }

    pub fn is_written(self) -> bool {
        self == Self::Written
    }
}

/**
    Payload bytes and frames handed to the container.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MuxCounters {
    pub video_bytes: u64,
    pub audio_bytes: u64,
    pub video_frames: u64,
}

impl MuxCounters {
    pub fn record(&mut self, packet: &Packet) {
        let size = packet.size() as u64;
        match packet.medium {
            Medium::Video => {
                self.video_bytes += size;
                self.video_frames += 1;
            }
            Medium::Audio => self.audio_bytes += size,
        }
    }

    pub fn payload_bytes(&self) -> u64 {
        self.video_bytes + self.audio_bytes
    }

    /**
        Container bytes that are not payload, given the sink size.
    */
    pub fn overhead(&self, sink_bytes: u64) -> i64 {
        sink_bytes as i64 - self.payload_bytes() as i64
    }
}

/**
    Lifecycle state plus counters of one output container.
*/
#[derive(Clone, Debug, Default)]
pub struct Mux {
    pub state: MuxState,
    pub counters: MuxCounters,
    /// Set when the header write begins; the status line measures from here.
    pub started_at: Option<Instant>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use encode_types::{MediaDuration, Rational};

    fn packet(medium: Medium, size: usize) -> Packet {
        Packet::new(
            vec![0; size],
            None,
            None,
            MediaDuration(1),
            Rational::new(1, 25),
            true,
            medium,
        )
    }

    #[test]
    fn counters_split_by_medium() {
        let mut counters = MuxCounters::default();
        counters.record(&packet(Medium::Video, 100));
        counters.record(&packet(Medium::Video, 50));
        counters.record(&packet(Medium::Audio, 30));

        assert_eq!(counters.video_bytes, 150);
        assert_eq!(counters.video_frames, 2);
        assert_eq!(counters.audio_bytes, 30);
        assert_eq!(counters.overhead(200), 20);
    }

    #[test]
    fn only_fresh_mux_accepts_streams() {
        assert!(MuxState::NotStarted.accepts_streams());
        for state in [
            MuxState::WritingHeader,
            MuxState::Written,
            MuxState::Failed,
            MuxState::Finished,
        ] {
            assert!(!state.accepts_streams());
        }
    }
}
