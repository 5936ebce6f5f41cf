// Metadata fetching via the extraction tool's dump-json mode
//
// Playlists emit one JSON object per stdout line, single videos one object
// total, so stdout is treated as newline-delimited JSON. Unparsable lines
// are skipped with a warning rather than failing the whole fetch.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{classify_tool_error, DownloadError};
use crate::models::{FormatKind, FormatVariant};
use crate::process::{ProcessRun, RunSpec, RunStatus, ToolRunner};

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Video variants below this height are noise, not playable quality.
const MIN_VIDEO_HEIGHT: u32 = 144;

#[derive(Debug, Clone, Serialize)]
pub struct VideoDetails {
    pub title: String,
    pub duration_secs: f64,
    pub thumbnail: String,
    pub uploader: String,
    pub webpage_url: String,
    pub formats: Vec<FormatVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoSummary {
    pub title: String,
    pub duration_secs: f64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistDetails {
    pub video_count: usize,
    pub total_duration_secs: f64,
    pub thumbnail: String,
    pub uploader: String,
    pub videos: Vec<VideoSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaInfo {
    Single(VideoDetails),
    Playlist(PlaylistDetails),
}

/// Fetch and parse metadata for a URL.
pub async fn fetch_info<R: ToolRunner>(
    runner: &R,
    extractor_command: &str,
    url: &str,
    playlist: bool,
) -> Result<MediaInfo, DownloadError> {
    let playlist_flag = if playlist {
        "--yes-playlist"
    } else {
        "--no-playlist"
    };
    let args = vec![
        "--dump-json".to_string(),
        playlist_flag.to_string(),
        "--no-warnings".to_string(),
        url.to_string(),
    ];

    let mut noop_out = |_: &str| {};
    let mut noop_err = |_: &str| {};
    let run = runner
        .run(
            RunSpec::new(extractor_command, args, METADATA_TIMEOUT),
            &mut noop_out,
            &mut noop_err,
        )
        .await;

    check_run(&run, extractor_command)?;
    parse_dump(&run.stdout, playlist)
}

fn check_run(run: &ProcessRun, command: &str) -> Result<(), DownloadError> {
    match &run.status {
        RunStatus::Exited(0) => Ok(()),
        RunStatus::Exited(_) => Err(classify_tool_error(&run.stderr).unwrap_or_else(|| {
            DownloadError::GenericToolError(format!("metadata fetch failed: {}", run.stderr.trim()))
        })),
        RunStatus::TimedOut => Err(DownloadError::Timeout(METADATA_TIMEOUT.as_secs())),
        RunStatus::SpawnError(reason) => Err(DownloadError::SpawnFailure {
            tool: command.to_string(),
            reason: reason.clone(),
        }),
        RunStatus::Running => Err(DownloadError::GenericToolError(
            "metadata fetch never resolved".to_string(),
        )),
    }
}

/// Parse newline-delimited JSON into the single or playlist shape.
pub fn parse_dump(stdout: &str, playlist_requested: bool) -> Result<MediaInfo, DownloadError> {
    let mut entries: Vec<Value> = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => entries.push(value),
            Err(e) => log::warn!("[Metadata] skipping unparsable line: {}", e),
        }
    }

    if entries.is_empty() {
        return Err(DownloadError::ParseError(
            "no JSON objects in metadata output".to_string(),
        ));
    }

    if entries.len() == 1 && !playlist_requested {
        return Ok(MediaInfo::Single(parse_video(&entries[0])));
    }

    let videos: Vec<VideoSummary> = entries
        .iter()
        .map(|v| VideoSummary {
            title: str_field(v, "title"),
            duration_secs: v["duration"].as_f64().unwrap_or(0.0),
            url: v["webpage_url"]
                .as_str()
                .or_else(|| v["url"].as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect();

    Ok(MediaInfo::Playlist(PlaylistDetails {
        video_count: videos.len(),
        total_duration_secs: videos.iter().map(|v| v.duration_secs).sum(),
        thumbnail: entries
            .first()
            .map(|v| str_field(v, "thumbnail"))
            .unwrap_or_default(),
        uploader: entries
            .first()
            .map(|v| str_field(v, "uploader"))
            .unwrap_or_default(),
        videos,
    }))
}

fn str_field(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

fn parse_video(json: &Value) -> VideoDetails {
    VideoDetails {
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        duration_secs: json["duration"].as_f64().unwrap_or(0.0),
        thumbnail: str_field(json, "thumbnail"),
        uploader: json["uploader"].as_str().unwrap_or("Unknown").to_string(),
        webpage_url: str_field(json, "webpage_url"),
        formats: dedupe_formats(parse_formats(json)),
    }
}

fn codec_field(value: &Value, key: &str) -> Option<String> {
    match value[key].as_str() {
        Some("") | Some("none") | None => None,
        Some(codec) => Some(codec.to_string()),
    }
}

/// Raw format array to variants, dropping entries that are not playable
/// streams: codec-less rows, storyboard/banner/preview artwork, and video
/// below the 144p floor.
pub fn parse_formats(json: &Value) -> Vec<FormatVariant> {
    let Some(raw) = json["formats"].as_array() else {
        return Vec::new();
    };

    let mut formats = Vec::new();
    for f in raw {
        let vcodec = codec_field(f, "vcodec");
        let acodec = codec_field(f, "acodec");
        if vcodec.is_none() && acodec.is_none() {
            continue;
        }

        let ext = f["ext"].as_str().unwrap_or_default().to_string();
        let note = f["format_note"].as_str().unwrap_or_default().to_lowercase();
        if ext == "mhtml"
            || note.contains("storyboard")
            || note.contains("banner")
            || note.contains("preview")
        {
            continue;
        }

        let kind = match (&vcodec, &acodec) {
            (Some(_), Some(_)) => FormatKind::Combined,
            (Some(_), None) => FormatKind::Video,
            (None, _) => FormatKind::Audio,
        };
        let height = f["height"].as_u64().map(|h| h as u32);
        if kind != FormatKind::Audio {
            if let Some(h) = height {
                if h < MIN_VIDEO_HEIGHT {
                    continue;
                }
            }
        }

        formats.push(FormatVariant {
            id: f["format_id"].as_str().unwrap_or_default().to_string(),
            ext,
            height,
            width: f["width"].as_u64().map(|w| w as u32),
            fps: f["fps"].as_f64().map(|v| v as f32),
            vcodec,
            acodec,
            tbr: f["tbr"].as_f64().map(|v| v as f32),
            abr: f["abr"].as_f64().map(|v| v as f32),
            vbr: f["vbr"].as_f64().map(|v| v as f32),
            filesize: f["filesize"]
                .as_u64()
                .or_else(|| f["filesize_approx"].as_u64()),
            kind,
        });
    }
    formats
}

/// Set-semantics deduplication on the (id, ext, height-or-audio, vcodec,
/// acodec) key. On collision the entry carrying a known file size wins.
pub fn dedupe_formats(formats: Vec<FormatVariant>) -> Vec<FormatVariant> {
    let mut seen: HashMap<_, usize> = HashMap::new();
    let mut result: Vec<FormatVariant> = Vec::new();

    for variant in formats {
        let key = variant.dedup_key();
        match seen.get(&key) {
            Some(&idx) => {
                if result[idx].filesize.is_none() && variant.filesize.is_some() {
                    result[idx] = variant;
                }
            }
            None => {
                seen.insert(key, result.len());
                result.push(variant);
            }
        }
    }
    result
}
