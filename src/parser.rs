/*!
 * Segment parser for RIPS flat files
 *
 * Splits raw file text into named record groups. Two independent strategies
 * sit behind one entry point:
 *
 * - **Marker strategy**: `ARCHIVO-RIPS-<CODE>` lines toggle the current
 *   segment. The first occurrence of a code opens the segment, the next
 *   occurrence of the same code closes it. A marker for a different code
 *   switches directly to the new segment without a close event; nested or
 *   interleaved markers are not supported.
 * - **Heuristic fallback**: engaged only when the marker pass produced zero
 *   segments. Classifies each line independently by column count and a
 *   control-record shape check. Approximate by design; it exists for
 *   graceful degradation on markerless files, not exact recovery.
 *
 * Neither strategy raises errors: unmatched or unclassifiable lines are
 * silently dropped.
 */

use crate::config::{global_config, HeuristicThresholds};
use crate::data_types::{SegmentCode, SegmentMap};
use crate::schema::{COMMENT_PREFIX, SEGMENT_MARKER};

/// Parse raw RIPS text into a segment map using the globally configured
/// heuristic thresholds
pub fn parse_segments(text: &str) -> SegmentMap {
    parse_segments_with(text, &global_config().heuristic)
}

/// Parse raw RIPS text into a segment map with explicit fallback thresholds
pub fn parse_segments_with(text: &str, thresholds: &HeuristicThresholds) -> SegmentMap {
    let lines: Vec<&str> = text.lines().collect();

    let segments = parse_with_markers(&lines);
    if !segments.is_empty() {
        return segments;
    }
    parse_heuristic(&lines, thresholds)
}

/// Extract the segment code from a marker line, if the line is one
fn marker_code(line: &str) -> Option<SegmentCode> {
    let start = line.find(SEGMENT_MARKER)? + SEGMENT_MARKER.len();
    let code: String = line[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if code.is_empty() {
        None
    } else {
        Some(SegmentCode::normalized(&code))
    }
}

/// Strip one trailing record delimiter, if present
fn strip_trailing_pipe(line: &str) -> &str {
    line.strip_suffix('|').unwrap_or(line)
}

/// Primary strategy: marker-delimited segment blocks
fn parse_with_markers(lines: &[&str]) -> SegmentMap {
    let mut segments = SegmentMap::new();
    let mut current: Option<SegmentCode> = None;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains(SEGMENT_MARKER) {
            if let Some(code) = marker_code(line) {
                if current.as_ref() == Some(&code) {
                    current = None;
                } else {
                    segments.open(code.clone());
                    current = Some(code);
                }
            }
            continue;
        }

        if let Some(code) = &current {
            if !line.starts_with(COMMENT_PREFIX) {
                segments.push_line(code.clone(), strip_trailing_pipe(line).to_string());
            }
        }
    }

    segments
}

/// Fallback strategy: per-line structural classification.
///
/// A control line has at least `control_min_columns` columns and a third
/// column starting with two letters; otherwise column count alone decides
/// between provider and user lines. Everything else is dropped.
fn parse_heuristic(lines: &[&str], thresholds: &HeuristicThresholds) -> SegmentMap {
    let mut segments = SegmentMap::new();

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let cols: Vec<&str> = line.split(',').collect();
        let code = if cols.len() >= thresholds.control_min_columns && looks_like_control(&cols) {
            crate::schema::CONTROL_SEGMENT
        } else if cols.len() >= thresholds.provider_min_columns {
            crate::schema::PROVIDER_SEGMENT
        } else if cols.len() >= thresholds.user_min_columns {
            crate::schema::USER_SEGMENT
        } else {
            continue;
        };

        segments.push_line(
            SegmentCode::normalized(code),
            strip_trailing_pipe(line).to_string(),
        );
    }

    segments
}

/// Control-record shape check: the third column starts with two letters
fn looks_like_control(cols: &[&str]) -> bool {
    cols.get(2)
        .map(|col| {
            let mut chars = col.trim().chars();
            matches!(
                (chars.next(), chars.next()),
                (Some(a), Some(b)) if a.is_ascii_alphabetic() && b.is_ascii_alphabetic()
            )
        })
        .unwrap_or(false)
}
