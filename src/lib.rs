//! Download orchestration core.
//!
//! Drives two external tools: an extraction tool (yt-dlp) as the primary
//! download path and a transcoder (ffmpeg) as the fallback. The
//! [`orchestrator::Downloader`] owns the pipeline; everything else is a
//! focused support module: tool location, format selection, process
//! supervision, progress parsing, platform classification and metadata
//! fetching.

pub mod config;
pub mod error;
pub mod events;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod platform;
pub mod process;
pub mod progress;
pub mod selector;
pub mod tools;

pub use config::Settings;
pub use error::DownloadError;
pub use events::{CollectingSink, DownloadEvent, EventSink, NullSink};
pub use metadata::{MediaInfo, PlaylistDetails, VideoDetails, VideoSummary};
pub use models::{
    AudioFormat, BatchOutcome, CodecPreference, Container, DownloadOutcome, DownloadRequest,
    FormatKind, FormatVariant, Quality, TimeRange,
};
pub use orchestrator::Downloader;
pub use platform::{classify_url, PlatformCategory, PlatformProfile};
pub use process::{ProcessRun, ProcessSupervisor, RunSpec, RunStatus, ToolRunner};
pub use tools::{Tool, ToolSource, ToolStatus};
