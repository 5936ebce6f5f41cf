// Platform classifier - pure URL heuristics
//
// No I/O, no state. The profile gates playlist mode for the extraction
// tool and decides whether the transcoder fallback needs browser-style
// HTTP headers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformCategory {
    Youtube,
    Vimeo,
    Dailymotion,
    Twitch,
    Social,
    DirectFile,
    LiveStream,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub category: PlatformCategory,
    pub supports_playlists: bool,
    pub label: &'static str,
}

impl PlatformProfile {
    /// Social and live-stream sources refuse anonymous transcoder reads,
    /// so the fallback sends a user-agent and referer for them.
    pub fn needs_browser_headers(&self) -> bool {
        matches!(
            self.category,
            PlatformCategory::Social | PlatformCategory::LiveStream
        )
    }
}

const MEDIA_FILE_SUFFIXES: &[&str] = &[
    ".mp4", ".mkv", ".webm", ".mov", ".avi", ".flv", ".mp3", ".m4a", ".ogg", ".wav", ".flac",
];

const SOCIAL_MARKERS: &[&str] = &[
    "tiktok.com",
    "instagram.com",
    "twitter.com",
    "x.com/",
    "facebook.com",
    "fb.watch",
    "reddit.com",
];

pub fn classify_url(url: &str) -> PlatformProfile {
    let lower = url.to_lowercase();
    let path = lower.split('?').next().unwrap_or(&lower);

    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        return PlatformProfile {
            category: PlatformCategory::Youtube,
            supports_playlists: true,
            label: "YouTube",
        };
    }
    if lower.contains("vimeo.com") {
        return PlatformProfile {
            category: PlatformCategory::Vimeo,
            supports_playlists: false,
            label: "Vimeo",
        };
    }
    if lower.contains("dailymotion.com") || lower.contains("dai.ly") {
        return PlatformProfile {
            category: PlatformCategory::Dailymotion,
            supports_playlists: true,
            label: "Dailymotion",
        };
    }
    if lower.contains("twitch.tv") {
        return PlatformProfile {
            category: PlatformCategory::Twitch,
            supports_playlists: false,
            label: "Twitch",
        };
    }
    if SOCIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return PlatformProfile {
            category: PlatformCategory::Social,
            supports_playlists: false,
            label: "Social media",
        };
    }
    if path.ends_with(".m3u8") || path.ends_with(".mpd") || lower.starts_with("rtmp://") {
        return PlatformProfile {
            category: PlatformCategory::LiveStream,
            supports_playlists: false,
            label: "Live stream",
        };
    }
    if MEDIA_FILE_SUFFIXES.iter().any(|s| path.ends_with(s)) {
        return PlatformProfile {
            category: PlatformCategory::DirectFile,
            supports_playlists: false,
            label: "Direct file",
        };
    }

    PlatformProfile {
        category: PlatformCategory::Other,
        supports_playlists: false,
        label: "Other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_detection() {
        let profile = classify_url("https://www.YouTube.com/watch?v=abc123");
        assert_eq!(profile.category, PlatformCategory::Youtube);
        assert!(profile.supports_playlists);

        let short = classify_url("https://youtu.be/abc123");
        assert_eq!(short.category, PlatformCategory::Youtube);
    }

    #[test]
    fn test_social_detection_needs_headers() {
        let profile = classify_url("https://www.tiktok.com/@user/video/1");
        assert_eq!(profile.category, PlatformCategory::Social);
        assert!(profile.needs_browser_headers());
        assert!(!profile.supports_playlists);
    }

    #[test]
    fn test_direct_file_detection() {
        let profile = classify_url("https://cdn.example.com/clip.MP4?token=x");
        assert_eq!(profile.category, PlatformCategory::DirectFile);
    }

    #[test]
    fn test_live_stream_detection() {
        let profile = classify_url("https://cdn.example.com/live/master.m3u8?sig=1");
        assert_eq!(profile.category, PlatformCategory::LiveStream);
        assert!(profile.needs_browser_headers());
    }

    #[test]
    fn test_unknown_site() {
        let profile = classify_url("https://example.org/article");
        assert_eq!(profile.category, PlatformCategory::Other);
        assert!(!profile.supports_playlists);
    }
}
