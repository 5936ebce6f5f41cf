// Fallback orchestrator
//
// One download request runs through an explicit state machine:
// probing -> primary-running -> verifying -> done, detouring through
// fallback-running when the extraction tool fails in a recoverable way.
// Neither tool's exit code is a trustworthy signal that a usable file
// exists, so every successful run still passes output verification.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{classify_tool_error, DownloadError};
use crate::events::{DownloadEvent, EventSink};
use crate::metadata::{self, MediaInfo};
use crate::models::{
    AudioFormat, BatchOutcome, CodecPreference, DownloadOutcome, DownloadRequest, Quality,
};
use crate::platform::{classify_url, PlatformProfile};
use crate::process::{ProcessRun, RunSpec, RunStatus, ToolRunner};
use crate::progress::{classify_extractor_line, ExtractorEvent, FfmpegProgress, ProgressTracker};
use crate::selector::build_selector;
use crate::tools::{self, Tool, ToolStatus};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DIRECT_URL_TIMEOUT: Duration = Duration::from_secs(15);
/// Large media files take a while; both download paths get a long leash.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "mov", "avi", "flv", "mp3", "m4a", "aac", "opus", "ogg", "wav", "flac",
];

const MAX_FOLDER_NAME_LEN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Probing,
    PrimaryRunning,
    FallbackRunning,
    Verifying,
}

pub struct Downloader<R: ToolRunner> {
    runner: R,
    extractor: ToolStatus,
    transcoder: ToolStatus,
}

impl<R: ToolRunner> Downloader<R> {
    /// Locate both tools on this machine and build a downloader around
    /// the given runner.
    pub fn new(runner: R) -> Self {
        Self {
            extractor: tools::locate(Tool::Extractor),
            transcoder: tools::locate(Tool::Transcoder),
            runner,
        }
    }

    /// Downloader with pre-resolved tool paths. Also the test seam.
    pub fn with_tools(runner: R, extractor: ToolStatus, transcoder: ToolStatus) -> Self {
        Self {
            runner,
            extractor,
            transcoder,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn extractor_status(&self) -> &ToolStatus {
        &self.extractor
    }

    pub fn transcoder_status(&self) -> &ToolStatus {
        &self.transcoder
    }

    /// Fetch metadata for a URL, requesting playlist mode when the
    /// platform supports it.
    pub async fn fetch_info(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        if !self.extractor.available {
            return Err(DownloadError::ToolNotFound(
                Tool::Extractor.binary_name().to_string(),
            ));
        }
        let profile = classify_url(url);
        metadata::fetch_info(
            &self.runner,
            &self.extractor.command(),
            url,
            profile.supports_playlists,
        )
        .await
    }

    /// Run one download request to its terminal outcome.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        sink: &dyn EventSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let profile = classify_url(&request.url);
        sink.emit(DownloadEvent::Info {
            message: format!("source: {}", profile.label),
        });

        let (out_dir, organized) = resolve_output_dir(request);
        std::fs::create_dir_all(&out_dir).map_err(|e| {
            DownloadError::GenericToolError(format!(
                "cannot create output directory {}: {}",
                out_dir.display(),
                e
            ))
        })?;

        let mut phase = Phase::Probing;
        log::info!("[Orchestrator] {:?} for {}", phase, request.url);

        let mut primary_error: Option<DownloadError> = None;
        if self.extractor.available && self.probe_extractor().await {
            phase = Phase::PrimaryRunning;
        } else {
            primary_error = Some(DownloadError::ToolNotFound(
                Tool::Extractor.binary_name().to_string(),
            ));
            sink.emit(DownloadEvent::Info {
                message: "extraction tool unavailable, going straight to fallback".to_string(),
            });
            phase = Phase::FallbackRunning;
        }

        if phase == Phase::PrimaryRunning {
            log::info!("[Orchestrator] {:?}", phase);
            match self.run_primary(request, &profile, &out_dir, sink).await {
                Ok(()) => phase = Phase::Verifying,
                Err(e) if e.is_recoverable() => {
                    log::warn!("[Orchestrator] primary tool failed: {}", e);
                    sink.emit(DownloadEvent::Error {
                        message: format!("primary tool failed, switching to fallback: {}", e),
                    });
                    primary_error = Some(e);
                    phase = Phase::FallbackRunning;
                }
                Err(e) => return Err(e),
            }
        }

        let mut used_fallback = false;
        if phase == Phase::FallbackRunning {
            log::info!("[Orchestrator] {:?}", phase);
            used_fallback = true;
            if !self.transcoder.available {
                let missing =
                    DownloadError::ToolNotFound(Tool::Transcoder.binary_name().to_string());
                return Err(combine(primary_error, missing));
            }
            match self.run_fallback(request, &profile, &out_dir, sink).await {
                Ok(()) => phase = Phase::Verifying,
                Err(e) => return Err(combine(primary_error, e)),
            }
        }

        debug_assert_eq!(phase, Phase::Verifying);
        log::info!("[Orchestrator] {:?}", phase);
        let (file_path, file_size) = verify_output(&out_dir)?;

        let message = match (used_fallback, &primary_error) {
            (true, Some(p)) => format!("downloaded via transcoder fallback (primary attempt: {})", p),
            (true, None) => "downloaded via transcoder fallback".to_string(),
            _ => "downloaded via extraction tool".to_string(),
        };
        let outcome = DownloadOutcome {
            file_path,
            file_size,
            organized_folder: organized,
            used_fallback,
            message,
        };
        sink.emit(DownloadEvent::Complete {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Sequential batch download. One video at a time keeps progress
    /// ordering and partial-failure accounting unambiguous.
    pub async fn download_batch(
        &self,
        requests: &[DownloadRequest],
        sink: &dyn EventSink,
    ) -> BatchOutcome {
        let mut results = Vec::with_capacity(requests.len());
        for (idx, request) in requests.iter().enumerate() {
            sink.emit(DownloadEvent::Info {
                message: format!("[{}/{}] starting {}", idx + 1, requests.len(), request.url),
            });
            results.push(self.download(request, sink).await);
        }
        BatchOutcome { results }
    }

    /// Cheap availability probe with its own short deadline, so a slow
    /// probe never stalls the pipeline decision.
    async fn probe_extractor(&self) -> bool {
        let mut noop_out = |_: &str| {};
        let mut noop_err = |_: &str| {};
        let run = self
            .runner
            .run(
                RunSpec::new(
                    self.extractor.command(),
                    vec!["--version".to_string()],
                    PROBE_TIMEOUT,
                ),
                &mut noop_out,
                &mut noop_err,
            )
            .await;
        run.success()
    }

    async fn run_primary(
        &self,
        request: &DownloadRequest,
        profile: &PlatformProfile,
        out_dir: &Path,
        sink: &dyn EventSink,
    ) -> Result<(), DownloadError> {
        let selector = build_selector(
            request.quality,
            request.integrated_audio,
            request.codec,
            request.extract_audio,
        );
        let args = build_primary_args(request, profile, out_dir, &selector);

        let mut tracker = ProgressTracker::new();
        let mut on_stdout = |line: &str| match classify_extractor_line(line) {
            Some(ExtractorEvent::Progress {
                percent,
                speed,
                eta,
            }) => {
                if let Some(pct) = tracker.update(percent) {
                    sink.emit(DownloadEvent::Progress {
                        percent: pct as f32,
                        speed,
                        eta,
                        message: format!("downloading: {}%", pct),
                    });
                }
            }
            Some(ExtractorEvent::Destination(path)) => sink.emit(DownloadEvent::Info {
                message: format!("saving to: {}", path),
            }),
            Some(ExtractorEvent::Merging) => sink.emit(DownloadEvent::Info {
                message: "merging video and audio".to_string(),
            }),
            Some(ExtractorEvent::AlreadyDone) => {
                if let Some(pct) = tracker.update(100.0) {
                    sink.emit(DownloadEvent::Progress {
                        percent: pct as f32,
                        speed: None,
                        eta: None,
                        message: "file already downloaded".to_string(),
                    });
                }
            }
            None => {}
        };
        // Non-fatal stderr chatter is forwarded, never acted on here; the
        // decision to fall back is made from the structured run result.
        let mut on_stderr = |line: &str| {
            let trimmed = line.trim();
            if trimmed.starts_with("ERROR:") {
                sink.emit(DownloadEvent::Error {
                    message: trimmed.to_string(),
                });
            } else if trimmed.starts_with("WARNING:") {
                sink.emit(DownloadEvent::Info {
                    message: trimmed.to_string(),
                });
            }
        };

        let run = self
            .runner
            .run(
                RunSpec::new(self.extractor.command(), args, DOWNLOAD_TIMEOUT),
                &mut on_stdout,
                &mut on_stderr,
            )
            .await;
        interpret_run(&run, DOWNLOAD_TIMEOUT)
    }

    /// Ask the extraction tool for a direct media-stream URL so the
    /// transcoder reads a real stream instead of an HTML page. Failing
    /// that, the transcoder gets the original URL unmodified.
    async fn resolve_direct_url(&self, url: &str) -> Option<String> {
        if !self.extractor.available {
            return None;
        }
        let mut noop_out = |_: &str| {};
        let mut noop_err = |_: &str| {};
        let run = self
            .runner
            .run(
                RunSpec::new(
                    self.extractor.command(),
                    vec![
                        "-g".to_string(),
                        "--no-warnings".to_string(),
                        url.to_string(),
                    ],
                    DIRECT_URL_TIMEOUT,
                ),
                &mut noop_out,
                &mut noop_err,
            )
            .await;
        if !run.success() {
            log::warn!("[Orchestrator] direct stream resolution failed for {}", url);
            return None;
        }
        run.stdout
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("http"))
            .map(|l| l.to_string())
    }

    async fn run_fallback(
        &self,
        request: &DownloadRequest,
        profile: &PlatformProfile,
        out_dir: &Path,
        sink: &dyn EventSink,
    ) -> Result<(), DownloadError> {
        let input = self
            .resolve_direct_url(&request.url)
            .await
            .unwrap_or_else(|| request.url.clone());
        let output = fallback_output_path(request, out_dir);
        let args = build_fallback_args(request, profile, &input, &output);

        sink.emit(DownloadEvent::Info {
            message: "starting transcoder fallback".to_string(),
        });

        let mut ffmpeg_progress = FfmpegProgress::new();
        let mut tracker = ProgressTracker::new();
        // ffmpeg writes all progress to stderr
        let mut on_stderr = |line: &str| {
            if let Some(update) = ffmpeg_progress.observe(line) {
                if let Some(pct) = tracker.update(update.percent) {
                    sink.emit(DownloadEvent::Progress {
                        percent: pct as f32,
                        speed: update.speed.map(|s| format!("{:.2}x", s)),
                        eta: update.eta_secs.map(|e| format!("{}s", e.round() as u64)),
                        message: format!("transcoding: {}%", pct),
                    });
                }
            }
        };
        let mut on_stdout = |_: &str| {};

        let run = self
            .runner
            .run(
                RunSpec::new(self.transcoder.command(), args, DOWNLOAD_TIMEOUT),
                &mut on_stdout,
                &mut on_stderr,
            )
            .await;
        interpret_run(&run, DOWNLOAD_TIMEOUT)
    }
}

fn interpret_run(run: &ProcessRun, timeout: Duration) -> Result<(), DownloadError> {
    match &run.status {
        RunStatus::Exited(0) => Ok(()),
        RunStatus::Exited(code) => Err(classify_tool_error(&run.stderr).unwrap_or_else(|| {
            let detail = run
                .stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("no output");
            DownloadError::GenericToolError(format!(
                "{} exited with code {}: {}",
                run.command, code, detail
            ))
        })),
        RunStatus::TimedOut => Err(DownloadError::Timeout(timeout.as_secs())),
        RunStatus::SpawnError(reason) => Err(DownloadError::SpawnFailure {
            tool: run.command.clone(),
            reason: reason.clone(),
        }),
        RunStatus::Running => Err(DownloadError::GenericToolError(
            "invocation never resolved".to_string(),
        )),
    }
}

fn combine(primary: Option<DownloadError>, fallback: DownloadError) -> DownloadError {
    match primary {
        Some(p) => fallback.annotate(&format!("primary attempt: {}", p)),
        None => fallback,
    }
}

/// Subtitles and embedded thumbnails produce sibling files, so those
/// requests get a per-title subfolder when a title is known.
fn resolve_output_dir(request: &DownloadRequest) -> (PathBuf, bool) {
    if request.subtitles || request.embed_thumbnail {
        if let Some(title) = &request.title {
            let name = sanitize_title(title);
            if !name.is_empty() {
                return (request.output_dir.join(name), true);
            }
        }
    }
    (request.output_dir.clone(), false)
}

pub(crate) fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| {
            !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control()
        })
        .collect();
    cleaned
        .trim()
        .trim_matches('.')
        .chars()
        .take(MAX_FOLDER_NAME_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

fn format_seconds(value: f64) -> String {
    if (value - value.trunc()).abs() < f64::EPSILON {
        format!("{}", value as u64)
    } else {
        format!("{:.2}", value)
    }
}

pub(crate) fn build_primary_args(
    request: &DownloadRequest,
    profile: &PlatformProfile,
    out_dir: &Path,
    selector: &str,
) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        selector.to_string(),
        "--newline".to_string(),
        if profile.supports_playlists {
            "--yes-playlist".to_string()
        } else {
            "--no-playlist".to_string()
        },
        "-P".to_string(),
        out_dir.to_string_lossy().to_string(),
        "-o".to_string(),
        "%(title)s.%(ext)s".to_string(),
    ];

    if request.extract_audio {
        args.push("-x".to_string());
        args.push("--audio-format".to_string());
        args.push(request.audio_format.as_str().to_string());
    } else {
        args.push("--merge-output-format".to_string());
        args.push(request.container.as_str().to_string());
    }
    if request.subtitles {
        args.push("--write-subs".to_string());
    }
    if request.embed_thumbnail {
        args.push("--embed-thumbnail".to_string());
    }
    if request.write_info_json {
        args.push("--write-info-json".to_string());
    }
    if let Some(range) = &request.time_range {
        let start = range.start.map(format_seconds).unwrap_or_else(|| "0".to_string());
        let end = range.end.map(format_seconds).unwrap_or_else(|| "inf".to_string());
        args.push("--download-sections".to_string());
        args.push(format!("*{}-{}", start, end));
    }
    args.extend(request.extra_args.iter().cloned());
    args.push(request.url.clone());
    args
}

/// Encoder preset and CRF by target height tier.
fn encoder_tier(height: u32) -> (&'static str, &'static str) {
    if height <= 720 {
        ("veryfast", "23")
    } else if height <= 1080 {
        ("medium", "21")
    } else if height <= 2160 {
        ("medium", "19")
    } else {
        ("slow", "18")
    }
}

fn video_encoder(codec: CodecPreference) -> &'static str {
    match codec {
        CodecPreference::Auto | CodecPreference::H264 => "libx264",
        CodecPreference::H265 => "libx265",
        CodecPreference::Vp9 => "libvpx-vp9",
        CodecPreference::Av1 => "libaom-av1",
    }
}

fn audio_encoder(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Mp3 => "libmp3lame",
        AudioFormat::M4a => "aac",
        AudioFormat::Opus => "libopus",
        AudioFormat::Wav => "pcm_s16le",
    }
}

fn origin_of(url: &str) -> Option<String> {
    let (scheme, rest) = url
        .strip_prefix("https://")
        .map(|r| ("https://", r))
        .or_else(|| url.strip_prefix("http://").map(|r| ("http://", r)))?;
    let host = rest.split('/').next().filter(|h| !h.is_empty())?;
    Some(format!("{}{}", scheme, host))
}

fn fallback_output_path(request: &DownloadRequest, out_dir: &Path) -> PathBuf {
    let stem = request
        .title
        .as_deref()
        .map(sanitize_title)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "download".to_string());
    let ext = if request.extract_audio {
        request.audio_format.as_str()
    } else {
        request.container.as_str()
    };
    out_dir.join(format!("{}.{}", stem, ext))
}

pub(crate) fn build_fallback_args(
    request: &DownloadRequest,
    profile: &PlatformProfile,
    input: &str,
    output: &Path,
) -> Vec<String> {
    let mut args = vec!["-hide_banner".to_string()];

    if profile.needs_browser_headers() {
        args.push("-user_agent".to_string());
        args.push(USER_AGENT.to_string());
        if let Some(origin) = origin_of(&request.url) {
            args.push("-headers".to_string());
            args.push(format!("Referer: {}\r\n", origin));
        }
    }

    args.push("-i".to_string());
    args.push(input.to_string());

    if let Some(range) = &request.time_range {
        if let Some(start) = range.start {
            args.push("-ss".to_string());
            args.push(format_seconds(start));
        }
        if let Some(end) = range.end {
            args.push("-to".to_string());
            args.push(format_seconds(end));
        }
    }

    if request.extract_audio {
        args.push("-vn".to_string());
        args.push("-acodec".to_string());
        args.push(audio_encoder(request.audio_format).to_string());
    } else {
        let target_height = match request.quality {
            Quality::Height(h) => Some(h),
            _ => None,
        };
        if let Some(h) = target_height {
            args.push("-vf".to_string());
            args.push(format!("scale=-2:{}", h));
        }
        let (preset, crf) = encoder_tier(target_height.unwrap_or(1080));
        let encoder = video_encoder(request.codec);
        args.push("-c:v".to_string());
        args.push(encoder.to_string());
        if matches!(encoder, "libx264" | "libx265") {
            args.push("-preset".to_string());
            args.push(preset.to_string());
        }
        args.push("-crf".to_string());
        args.push(crf.to_string());
        args.push("-c:a".to_string());
        args.push("aac".to_string());
    }

    args.push("-y".to_string());
    args.push(output.to_string_lossy().to_string());
    args
}

/// Tool exit codes lie; the only success signal trusted here is a
/// non-empty file with a known media extension in the output directory.
fn verify_output(dir: &Path) -> Result<(PathBuf, u64), DownloadError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        DownloadError::OutputVerificationFailed(format!("cannot list {}: {}", dir.display(), e))
    })?;

    let mut newest: Option<(PathBuf, u64, SystemTime)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_media = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| MEDIA_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_media {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest
            .as_ref()
            .map_or(true, |(_, _, when)| modified >= *when)
        {
            newest = Some((path, meta.len(), modified));
        }
    }

    match newest {
        Some((path, size, _)) if size > 0 => Ok((path, size)),
        Some((path, _, _)) => Err(DownloadError::OutputVerificationFailed(format!(
            "tool reported success but the output file is empty: {}",
            path.display()
        ))),
        None => Err(DownloadError::OutputVerificationFailed(format!(
            "tool reported success but no media file exists in {}",
            dir.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeRange;

    fn request(url: &str) -> DownloadRequest {
        DownloadRequest::new(url, "/tmp/out")
    }

    #[test]
    fn test_sanitize_title_strips_illegal_characters() {
        assert_eq!(sanitize_title("a/b\\c:d*e?f\"g<h>i|j"), "abcdefghij");
        assert_eq!(sanitize_title("  trimmed  "), "trimmed");
        let long = "x".repeat(200);
        assert_eq!(sanitize_title(&long).len(), MAX_FOLDER_NAME_LEN);
    }

    #[test]
    fn test_primary_args_for_playlist_platform() {
        let req = request("https://youtube.com/watch?v=1");
        let profile = classify_url(&req.url);
        let args = build_primary_args(&req, &profile, Path::new("/tmp/out"), "b");
        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert_eq!(args.last(), Some(&req.url));
        // quality/codec never reach the args as raw user text
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "b");
    }

    #[test]
    fn test_primary_args_audio_extraction() {
        let mut req = request("https://vimeo.com/1");
        req.extract_audio = true;
        let profile = classify_url(&req.url);
        let args = build_primary_args(&req, &profile, Path::new("/tmp/out"), "ba/b");
        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"mp3".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_primary_args_time_range() {
        let mut req = request("https://vimeo.com/1");
        req.time_range = Some(TimeRange {
            start: Some(10.0),
            end: None,
        });
        let profile = classify_url(&req.url);
        let args = build_primary_args(&req, &profile, Path::new("/tmp/out"), "b");
        let idx = args
            .iter()
            .position(|a| a == "--download-sections")
            .unwrap();
        assert_eq!(args[idx + 1], "*10-inf");
    }

    #[test]
    fn test_fallback_args_social_headers() {
        let req = request("https://www.tiktok.com/@user/video/9");
        let profile = classify_url(&req.url);
        let args = build_fallback_args(&req, &profile, "https://cdn/stream", Path::new("/tmp/o.mp4"));
        assert!(args.contains(&"-user_agent".to_string()));
        let headers_idx = args.iter().position(|a| a == "-headers").unwrap();
        assert!(args[headers_idx + 1].contains("https://www.tiktok.com"));
        assert_eq!(args.last().unwrap(), "/tmp/o.mp4");
        assert!(args.contains(&"-y".to_string()));
    }

    #[test]
    fn test_fallback_args_no_headers_for_youtube() {
        let req = request("https://youtube.com/watch?v=1");
        let profile = classify_url(&req.url);
        let args = build_fallback_args(&req, &profile, "in", Path::new("/tmp/o.mp4"));
        assert!(!args.contains(&"-user_agent".to_string()));
    }

    #[test]
    fn test_fallback_args_scale_and_tier() {
        let mut req = request("https://example.com/a");
        req.quality = Quality::Height(720);
        let profile = classify_url(&req.url);
        let args = build_fallback_args(&req, &profile, "in", Path::new("/tmp/o.mp4"));
        assert!(args.contains(&"scale=-2:720".to_string()));
        assert!(args.contains(&"veryfast".to_string()));
        assert!(args.contains(&"23".to_string()));
    }

    #[test]
    fn test_fallback_args_audio_only() {
        let mut req = request("https://example.com/a");
        req.extract_audio = true;
        req.audio_format = AudioFormat::Opus;
        let profile = classify_url(&req.url);
        let args = build_fallback_args(&req, &profile, "in", Path::new("/tmp/o.opus"));
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libopus".to_string()));
        assert!(!args.contains(&"-c:v".to_string()));
    }

    #[test]
    fn test_encoder_tiers() {
        assert_eq!(encoder_tier(480), ("veryfast", "23"));
        assert_eq!(encoder_tier(1080), ("medium", "21"));
        assert_eq!(encoder_tier(2160), ("medium", "19"));
        assert_eq!(encoder_tier(4320), ("slow", "18"));
    }

    #[test]
    fn test_origin_extraction() {
        assert_eq!(
            origin_of("https://www.tiktok.com/@u/video/1"),
            Some("https://www.tiktok.com".to_string())
        );
        assert_eq!(origin_of("ftp://weird"), None);
    }

    #[test]
    fn test_resolve_output_dir_organizes_on_subtitles() {
        let mut req = request("https://example.com/a");
        req.subtitles = true;
        req.title = Some("My: Video?".to_string());
        let (dir, organized) = resolve_output_dir(&req);
        assert!(organized);
        assert_eq!(dir, PathBuf::from("/tmp/out/My Video"));

        let plain = request("https://example.com/a");
        let (dir, organized) = resolve_output_dir(&plain);
        assert!(!organized);
        assert_eq!(dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_verify_output_picks_nonempty_media() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("clip.mp4"), vec![0u8; 1234]).unwrap();
        let (path, size) = verify_output(dir.path()).unwrap();
        assert!(path.ends_with("clip.mp4"));
        assert_eq!(size, 1234);
    }

    #[test]
    fn test_verify_output_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"").unwrap();
        assert!(matches!(
            verify_output(dir.path()),
            Err(DownloadError::OutputVerificationFailed(_))
        ));
    }

    #[test]
    fn test_verify_output_rejects_no_media() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), b"<html>").unwrap();
        assert!(matches!(
            verify_output(dir.path()),
            Err(DownloadError::OutputVerificationFailed(_))
        ));
    }
}
