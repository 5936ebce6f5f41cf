// Error taxonomy and stderr classification
//
// The external tools only speak free text, so every failure phrase family
// is mapped to one DownloadError kind in a single place. When upstream
// wording changes, this table is the only thing that needs updating.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// Neither a system nor a local copy of the tool exists
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The tool binary exists but the process could not be started
    #[error("failed to start {tool}: {reason}")]
    SpawnFailure { tool: String, reason: String },

    /// The supervised process exceeded its deadline and was terminated
    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("sign-in required: {0}")]
    SignInRequired(String),

    #[error("payment required: {0}")]
    PaymentRequired(String),

    #[error("requested format not available: {0}")]
    FormatUnavailable(String),

    #[error("signature extraction failed: {0}")]
    SignatureExtractionFailed(String),

    /// HTTP 403/404 class failures
    #[error("network error: {0}")]
    NetworkError(String),

    /// Tool reported success but the output file is missing or empty
    #[error("output verification failed: {0}")]
    OutputVerificationFailed(String),

    /// Malformed metadata JSON
    #[error("metadata parse error: {0}")]
    ParseError(String),

    /// Unclassified stderr text
    #[error("tool error: {0}")]
    GenericToolError(String),
}

impl DownloadError {
    /// Whether the fallback pipeline should be tried after this error.
    ///
    /// Everything qualifies except a timeout (the attempt is cut, no
    /// auto-retry), a verification failure (terminal at any stage) and a
    /// metadata parse error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Timeout(_) | Self::OutputVerificationFailed(_) | Self::ParseError(_)
        )
    }

    /// Append context to the error message without changing the kind.
    /// Used to carry the primary attempt's failure text alongside the
    /// fallback's, so the caller sees the full chain of what was tried.
    pub fn annotate(self, note: &str) -> Self {
        match self {
            Self::ToolNotFound(m) => Self::ToolNotFound(format!("{} ({})", m, note)),
            Self::SpawnFailure { tool, reason } => Self::SpawnFailure {
                tool,
                reason: format!("{} ({})", reason, note),
            },
            Self::Timeout(s) => Self::GenericToolError(format!("timed out after {}s ({})", s, note)),
            Self::UnsupportedUrl(m) => Self::UnsupportedUrl(format!("{} ({})", m, note)),
            Self::VideoUnavailable(m) => Self::VideoUnavailable(format!("{} ({})", m, note)),
            Self::SignInRequired(m) => Self::SignInRequired(format!("{} ({})", m, note)),
            Self::PaymentRequired(m) => Self::PaymentRequired(format!("{} ({})", m, note)),
            Self::FormatUnavailable(m) => Self::FormatUnavailable(format!("{} ({})", m, note)),
            Self::SignatureExtractionFailed(m) => {
                Self::SignatureExtractionFailed(format!("{} ({})", m, note))
            }
            Self::NetworkError(m) => Self::NetworkError(format!("{} ({})", m, note)),
            Self::OutputVerificationFailed(m) => {
                Self::OutputVerificationFailed(format!("{} ({})", m, note))
            }
            Self::ParseError(m) => Self::ParseError(format!("{} ({})", m, note)),
            Self::GenericToolError(m) => Self::GenericToolError(format!("{} ({})", m, note)),
        }
    }
}

/// Pick a short, useful snippet out of a stderr blob for error payloads.
fn error_snippet(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| l.to_lowercase().contains("error"))
        .or_else(|| text.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("no output");
    line.chars().take(200).collect()
}

/// Map tool stderr text onto the error taxonomy.
///
/// Checked in order of specificity; returns None for text that carries no
/// recognizable failure phrase at all.
pub fn classify_tool_error(text: &str) -> Option<DownloadError> {
    let lower = text.to_lowercase();
    let snippet = error_snippet(text);

    if lower.contains("unsupported url") || lower.contains("no suitable extractor") {
        return Some(DownloadError::UnsupportedUrl(snippet));
    }

    if lower.contains("signature extraction failed")
        || lower.contains("nsig extraction failed")
        || (lower.contains("signature") && lower.contains("unable to extract"))
    {
        return Some(DownloadError::SignatureExtractionFailed(snippet));
    }

    if lower.contains("payment required")
        || lower.contains("requires payment")
        || lower.contains("premium")
        || lower.contains("requires purchase")
        || lower.contains("rental")
    {
        return Some(DownloadError::PaymentRequired(snippet));
    }

    if lower.contains("sign in")
        || lower.contains("login required")
        || lower.contains("log in to")
        || lower.contains("authentication required")
    {
        return Some(DownloadError::SignInRequired(snippet));
    }

    if lower.contains("video unavailable")
        || lower.contains("content unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
        || lower.contains("private video")
    {
        return Some(DownloadError::VideoUnavailable(snippet));
    }

    if lower.contains("requested format is not available")
        || lower.contains("no video formats found")
        || lower.contains("format is not available")
    {
        return Some(DownloadError::FormatUnavailable(snippet));
    }

    if lower.contains("http error 403")
        || lower.contains("http error 404")
        || lower.contains("403")
        || lower.contains("404")
        || lower.contains("forbidden")
        || lower.contains("unable to download webpage")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(DownloadError::NetworkError(snippet));
    }

    if lower.contains("error:") || lower.contains("error ") {
        return Some(DownloadError::GenericToolError(snippet));
    }

    None
}
