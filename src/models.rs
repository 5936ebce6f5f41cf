// Common data models for the download core

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::DownloadError;

/// Requested quality tier.
///
/// Parsed once from user input into a closed enum; only enum-derived text
/// is ever interpolated into tool argument vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    Best,
    Worst,
    /// Explicit target height in pixels, e.g. 1080
    Height(u32),
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "best" => Ok(Self::Best),
            "worst" => Ok(Self::Worst),
            other => {
                let digits = other.strip_suffix('p').unwrap_or(other);
                match digits.parse::<u32>() {
                    Ok(h) if h > 0 => Ok(Self::Height(h)),
                    _ => Err(format!("unrecognized quality tier: {}", s)),
                }
            }
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Best => write!(f, "best"),
            Self::Worst => write!(f, "worst"),
            Self::Height(h) => write!(f, "{}p", h),
        }
    }
}

impl TryFrom<String> for Quality {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        s.parse()
    }
}

impl From<Quality> for String {
    fn from(q: Quality) -> String {
        q.to_string()
    }
}

/// Video codec preference. A soft preference, never a hard requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecPreference {
    #[default]
    Auto,
    H264,
    H265,
    Vp9,
    Av1,
}

/// Target container for combined audio+video output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
    Webm,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
        }
    }
}

/// Target format for audio-only extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    M4a,
    Opus,
    Wav,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Opus => "opus",
            Self::Wav => "wav",
        }
    }
}

/// Optional trim window, in seconds from the start of the media.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

/// Immutable description of one download request.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub quality: Quality,
    pub container: Container,
    pub extract_audio: bool,
    pub audio_format: AudioFormat,
    /// Combine a separate video-only and audio-only stream when possible
    pub integrated_audio: bool,
    pub codec: CodecPreference,
    pub subtitles: bool,
    pub embed_thumbnail: bool,
    /// Write the per-run metadata sidecar next to the media file
    pub write_info_json: bool,
    pub time_range: Option<TimeRange>,
    /// Extra raw arguments, appended as discrete vector entries
    pub extra_args: Vec<String>,
    /// Used only for output folder naming
    pub title: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            quality: Quality::Best,
            container: Container::default(),
            extract_audio: false,
            audio_format: AudioFormat::default(),
            integrated_audio: true,
            codec: CodecPreference::default(),
            subtitles: false,
            embed_thumbnail: false,
            write_info_json: false,
            time_range: None,
            extra_args: Vec::new(),
            title: None,
        }
    }

    /// Request seeded from the settings store defaults.
    pub fn with_defaults(url: impl Into<String>, settings: &Settings) -> Self {
        let mut request = Self::new(url, settings.download_dir.clone());
        request.quality = settings.default_quality;
        request.container = settings.default_container;
        request.audio_format = settings.default_audio_format;
        request
    }
}

/// Derived stream kind of a format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Video,
    Audio,
    Combined,
}

/// One playable stream variant returned by a metadata fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatVariant {
    pub id: String,
    pub ext: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub fps: Option<f32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub tbr: Option<f32>,
    pub abr: Option<f32>,
    pub vbr: Option<f32>,
    pub filesize: Option<u64>,
    pub kind: FormatKind,
}

impl FormatVariant {
    /// Deduplication key: (id, ext, height-or-"audio", vcodec, acodec).
    pub fn dedup_key(&self) -> (String, String, String, String, String) {
        let height_part = match self.kind {
            FormatKind::Audio => "audio".to_string(),
            _ => self.height.map(|h| h.to_string()).unwrap_or_default(),
        };
        (
            self.id.clone(),
            self.ext.clone(),
            height_part,
            self.vcodec.clone().unwrap_or_default(),
            self.acodec.clone().unwrap_or_default(),
        )
    }
}

/// Terminal result of one download request, produced exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub file_path: PathBuf,
    pub file_size: u64,
    /// Whether an organized per-title subfolder was created
    pub organized_folder: bool,
    /// Whether the transcoder fallback pipeline produced the file
    pub used_fallback: bool,
    pub message: String,
}

/// Aggregated result of a sequential batch download.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<Result<DownloadOutcome, DownloadError>>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
