/*!
    Human-readable progress line.
*/

use std::time::Duration;

/**
    Format the encode progress as `{P% Mmin Ffps SMB}`, or with a realtime
    factor `X.XXx` instead of the frame rate while no video was written.

    `relative_position` is the fraction of the input consumed, used to
    extrapolate remaining time and final size. `playback_time` is the input
    time reached, in seconds.
*/
pub fn format_status(
    relative_position: f32,
    playback_time: f32,
    elapsed: Duration,
    video_frames: u64,
    sink_bytes: u64,
) -> String {
    let f = relative_position.max(0.0001) as f64;
    let elapsed_secs = elapsed.as_secs_f64().max(0.001);

    let minutes = elapsed.as_millis() as f64 / 60_000.0 * (1.0 - f) / f;
    let megabytes = sink_bytes as f64 / 1_048_576.0 / f;
    let percent = relative_position as f64 * 100.0;

    if video_frames > 0 {
        let fps = video_frames as f64 / elapsed_secs;
        format!("{{{percent:.1}% {minutes:.1}min {fps:.1}fps {megabytes:.1}MB}}")
    } else {
        let speed = playback_time as f64 / elapsed_secs;
        format!("{{{percent:.1}% {minutes:.1}min {speed:.2}x {megabytes:.1}MB}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_video() {
        let s = format_status(0.5, 30.0, Duration::from_secs(60), 1500, 10 * 1_048_576);
        assert_eq!(s, "{50.0% 1.0min 25.0fps 20.0MB}");
    }

    #[test]
    fn audio_only_shows_speed() {
        let s = format_status(0.25, 120.0, Duration::from_secs(30), 0, 1_048_576);
        assert_eq!(s, "{25.0% 1.5min 4.00x 4.0MB}");
    }

    #[test]
    fn zero_position_does_not_divide_by_zero() {
        let s = format_status(0.0, 0.0, Duration::ZERO, 0, 0);
        assert!(s.starts_with("{0.0% 0.0min"));
        assert!(!s.contains("inf") && !s.contains("NaN"));
    }
}
