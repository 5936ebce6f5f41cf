// Format selector expression builder
//
// Produces the prioritized, slash-separated chain of fallback criteria
// handed to the extraction tool as a single `-f` argument. Exact match
// first, progressively relaxed after, unfiltered catch-all last. The
// concrete filter syntax targets yt-dlp's format selection language.

use crate::models::{CodecPreference, Quality};

/// Minimum height any relaxed clause is allowed to fall to.
const MIN_HEIGHT_FLOOR: u32 = 240;

fn codec_filter(codec: CodecPreference) -> Option<&'static str> {
    match codec {
        CodecPreference::Auto => None,
        CodecPreference::H264 => Some("avc1"),
        CodecPreference::H265 => Some("hev"),
        CodecPreference::Vp9 => Some("vp9"),
        CodecPreference::Av1 => Some("av01"),
    }
}

/// Tolerance floor for an explicit height request: 80% of the requested
/// height, clamped to 240p, so a near match beats failing outright.
pub fn height_floor(height: u32) -> u32 {
    MIN_HEIGHT_FLOOR.max(height * 4 / 5)
}

pub fn build_selector(
    quality: Quality,
    integrated_audio: bool,
    codec: CodecPreference,
    extract_audio: bool,
) -> String {
    // Audio extraction ignores video entirely; prefer AAC-family streams
    // that survive remuxing into lossy-incompatible targets.
    if extract_audio {
        return "ba[acodec^=mp4a]/ba/b".to_string();
    }

    let audio_term = if integrated_audio { "+ba" } else { "" };
    let mut clauses: Vec<String> = Vec::new();

    match quality {
        Quality::Best => {
            clauses.push(format!("bv*[height>={}]{}", MIN_HEIGHT_FLOOR, audio_term));
        }
        Quality::Worst => {
            let worst_audio = if integrated_audio { "+wa" } else { "" };
            clauses.push(format!("wv*[height>={}]{}", MIN_HEIGHT_FLOOR, worst_audio));
            clauses.push("w".to_string());
            return finish(clauses, codec, "wv*", worst_audio);
        }
        Quality::Height(h) => {
            let floor = height_floor(h);
            clauses.push(format!("bv*[height={}]{}", h, audio_term));
            clauses.push(format!(
                "bv*[height<={}][height>={}]{}",
                h, floor, audio_term
            ));
        }
    }

    clauses.push("b".to_string());
    finish(clauses, codec, "bv*", audio_term)
}

/// Insert the soft codec preference as an extra clause ahead of the most
/// specific term, never replacing any of the existing chain.
fn finish(mut clauses: Vec<String>, codec: CodecPreference, base: &str, audio_term: &str) -> String {
    if let Some(tag) = codec_filter(codec) {
        let first = clauses[0].clone();
        let codec_clause = if let Some(rest) = first.strip_prefix(base) {
            format!("{}[vcodec^={}]{}", base, tag, rest)
        } else {
            format!("{}[vcodec^={}]{}", base, tag, audio_term)
        };
        clauses.insert(0, codec_clause);
    }
    clauses.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_height_clause_order() {
        let selector = build_selector(
            Quality::Height(1080),
            true,
            CodecPreference::Auto,
            false,
        );
        let clauses: Vec<&str> = selector.split('/').collect();
        assert_eq!(clauses[0], "bv*[height=1080]+ba");
        assert_eq!(clauses[1], "bv*[height<=1080][height>=864]+ba");
        assert_eq!(*clauses.last().unwrap(), "b");
    }

    #[test]
    fn test_height_floor_clamps_to_240() {
        assert_eq!(height_floor(1080), 864);
        assert_eq!(height_floor(360), 288);
        assert_eq!(height_floor(250), 240);
        assert_eq!(height_floor(144), 240);
    }

    #[test]
    fn test_best_with_integrated_audio() {
        let selector = build_selector(Quality::Best, true, CodecPreference::Auto, false);
        assert_eq!(selector, "bv*[height>=240]+ba/b");
    }

    #[test]
    fn test_best_without_integrated_audio_omits_audio_term() {
        let selector = build_selector(Quality::Best, false, CodecPreference::Auto, false);
        assert_eq!(selector, "bv*[height>=240]/b");
        assert!(!selector.contains("+ba"));
    }

    #[test]
    fn test_worst_quality() {
        let selector = build_selector(Quality::Worst, true, CodecPreference::Auto, false);
        assert_eq!(selector, "wv*[height>=240]+wa/w");
    }

    #[test]
    fn test_codec_preference_is_soft() {
        let selector = build_selector(
            Quality::Height(720),
            true,
            CodecPreference::H265,
            false,
        );
        let clauses: Vec<&str> = selector.split('/').collect();
        // codec clause added, nothing replaced
        assert_eq!(clauses[0], "bv*[vcodec^=hev][height=720]+ba");
        assert_eq!(clauses[1], "bv*[height=720]+ba");
        assert_eq!(*clauses.last().unwrap(), "b");
    }

    #[test]
    fn test_audio_extraction_ignores_video() {
        let selector = build_selector(Quality::Height(1080), true, CodecPreference::Vp9, true);
        assert_eq!(selector, "ba[acodec^=mp4a]/ba/b");
    }
}
