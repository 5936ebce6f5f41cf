// Progress parsing for both tools
//
// The extraction tool prints `[download]  42.3% of ~10.5MiB at 1.2MiB/s
// ETA 00:12` style lines; the transcoder announces a duration once and
// then per-line `time=HH:MM:SS.ff ... speed=1.3x` positions. Both are
// decoded incrementally into structured updates, with integer-percent
// coalescing so the UI sees at most one event per percentage point.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DL_PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%(?:\s+of\s+~?\s*[\d.]+\s*\w+)?(?:\s+at\s+([\d.]+\s*\w+/s))?(?:\s+ETA\s+(\S+))?"
    )
    .unwrap();
    static ref DL_DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref DL_MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
    static ref DL_DONE_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    static ref FF_DURATION_RE: Regex =
        Regex::new(r"Duration:\s*(\d{2,}):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap();
    static ref FF_TIME_RE: Regex =
        Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap();
    static ref FF_SPEED_RE: Regex = Regex::new(r"speed=\s*([\d.]+)x").unwrap();
}

/// One structured fact decoded from an extraction-tool output line.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorEvent {
    Progress {
        percent: f32,
        speed: Option<String>,
        eta: Option<String>,
    },
    /// Destination-file announcement
    Destination(String),
    Merging,
    /// The tool considers the file complete already
    AlreadyDone,
}

/// Stateless classification of one extraction-tool output line.
pub fn classify_extractor_line(line: &str) -> Option<ExtractorEvent> {
    if let Some(caps) = DL_PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let speed = caps.get(2).map(|m| m.as_str().to_string());
        let eta = caps.get(3).map(|m| m.as_str().to_string());
        return Some(ExtractorEvent::Progress {
            percent,
            speed,
            eta,
        });
    }
    if let Some(caps) = DL_DEST_RE.captures(line) {
        return Some(ExtractorEvent::Destination(caps.get(1)?.as_str().to_string()));
    }
    if DL_MERGE_RE.is_match(line) {
        return Some(ExtractorEvent::Merging);
    }
    if DL_DONE_RE.is_match(line) {
        return Some(ExtractorEvent::AlreadyDone);
    }
    None
}

/// Monotonic, coalescing percentage watermark. Emits only when the integer
/// percentage advances; 100% is emitted exactly once regardless of the
/// prior watermark.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last_emitted: Option<u32>,
    finished: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, percent: f32) -> Option<u32> {
        let pct = percent.clamp(0.0, 100.0) as u32;
        if pct >= 100 {
            if self.finished {
                return None;
            }
            self.finished = true;
            self.last_emitted = Some(100);
            return Some(100);
        }
        match self.last_emitted {
            Some(prev) if pct <= prev => None,
            _ => {
                self.last_emitted = Some(pct);
                Some(pct)
            }
        }
    }
}

/// Progress update computed from transcoder output.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeUpdate {
    pub percent: f32,
    pub eta_secs: Option<f64>,
    pub speed: Option<f32>,
}

/// Incremental transcoder progress decoder. Captures the duration
/// announcement once as the denominator, then derives fractional progress
/// from per-line positions. Malformed lines leave progress at the
/// last-known value.
#[derive(Debug, Default)]
pub struct FfmpegProgress {
    duration_secs: Option<f64>,
    position_secs: f64,
}

impl FfmpegProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, line: &str) -> Option<TranscodeUpdate> {
        if self.duration_secs.is_none() {
            if let Some(caps) = FF_DURATION_RE.captures(line) {
                self.duration_secs = parse_clock(&caps);
                return None;
            }
        }

        let duration = self.duration_secs?;
        let caps = FF_TIME_RE.captures(line)?;
        let position = parse_clock(&caps)?.min(duration);
        // positions never move backwards
        self.position_secs = self.position_secs.max(position);

        let speed = FF_SPEED_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f32>().ok());

        let percent = if duration > 0.0 {
            (self.position_secs / duration * 100.0) as f32
        } else {
            0.0
        };
        let eta_secs = speed.filter(|s| *s > 0.0).map(|s| {
            (duration - self.position_secs).max(0.0) / s as f64
        });

        Some(TranscodeUpdate {
            percent,
            eta_secs,
            speed,
        })
    }
}

/// `HH:MM:SS.ff` capture groups to floating-point seconds.
fn parse_clock(caps: &regex::Captures<'_>) -> Option<f64> {
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_full() {
        let line = "[download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32";
        match classify_extractor_line(line) {
            Some(ExtractorEvent::Progress {
                percent,
                speed,
                eta,
            }) => {
                assert!((percent - 6.2).abs() < 0.01);
                assert_eq!(speed.as_deref(), Some("420.30KiB/s"));
                assert_eq!(eta.as_deref(), Some("12:32"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_progress_line_without_eta() {
        let line = "[download]  55.0% of 10.00MiB at 1.00MiB/s";
        match classify_extractor_line(line) {
            Some(ExtractorEvent::Progress { percent, eta, .. }) => {
                assert!((percent - 55.0).abs() < 0.01);
                assert_eq!(eta, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_destination_line() {
        let line = "[download] Destination: /tmp/My Clip.mp4";
        assert_eq!(
            classify_extractor_line(line),
            Some(ExtractorEvent::Destination("/tmp/My Clip.mp4".to_string()))
        );
    }

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(classify_extractor_line("[info] Writing video metadata"), None);
        assert_eq!(classify_extractor_line(""), None);
    }

    #[test]
    fn test_tracker_coalesces_to_integer_points() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.update(0.4), Some(0));
        assert_eq!(tracker.update(0.9), None);
        assert_eq!(tracker.update(1.2), Some(1));
        assert_eq!(tracker.update(1.9), None);
        assert_eq!(tracker.update(5.0), Some(5));
    }

    #[test]
    fn test_tracker_is_strictly_increasing() {
        let mut tracker = ProgressTracker::new();
        let inputs = [10.0, 10.4, 10.9, 11.0, 11.0, 25.5, 25.6, 99.9];
        let emitted: Vec<u32> = inputs.iter().filter_map(|p| tracker.update(*p)).collect();
        assert_eq!(emitted, vec![10, 11, 25, 99]);
        for pair in emitted.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_tracker_emits_100_exactly_once() {
        let mut tracker = ProgressTracker::new();
        tracker.update(99.0);
        assert_eq!(tracker.update(100.0), Some(100));
        assert_eq!(tracker.update(100.0), None);

        // 100 emitted even when the watermark never advanced before it
        let mut fresh = ProgressTracker::new();
        assert_eq!(fresh.update(100.0), Some(100));
        assert_eq!(fresh.update(100.0), None);
    }

    #[test]
    fn test_ffmpeg_duration_then_position() {
        let mut progress = FfmpegProgress::new();
        assert_eq!(
            progress.observe("  Duration: 00:01:40.00, start: 0.000000, bitrate: 1200 kb/s"),
            None
        );
        let update = progress
            .observe("frame= 1234 fps= 50 size=  5120kB time=00:00:50.00 bitrate= 838.9kbits/s speed=2.00x")
            .unwrap();
        assert!((update.percent - 50.0).abs() < 0.01);
        assert_eq!(update.speed, Some(2.0));
        // 50s remaining at 2x
        assert!((update.eta_secs.unwrap() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_ffmpeg_position_without_duration_is_ignored() {
        let mut progress = FfmpegProgress::new();
        assert_eq!(progress.observe("time=00:00:10.00 speed=1.0x"), None);
    }

    #[test]
    fn test_ffmpeg_malformed_line_keeps_last_known() {
        let mut progress = FfmpegProgress::new();
        progress.observe("  Duration: 00:00:20.00");
        let first = progress.observe("time=00:00:10.00 speed=1.0x").unwrap();
        assert!((first.percent - 50.0).abs() < 0.01);
        assert_eq!(progress.observe("time=garbage"), None);
        // position survives the malformed line
        let next = progress.observe("time=00:00:05.00 speed=1.0x").unwrap();
        assert!(next.percent >= first.percent);
    }

    #[test]
    fn test_clock_parsing_converts_fractional_seconds() {
        let caps = FF_TIME_RE
            .captures("time=01:02:03.50 bitrate=1k")
            .unwrap();
        let secs = parse_clock(&caps).unwrap();
        assert!((secs - 3723.5).abs() < 0.001);
    }
}
