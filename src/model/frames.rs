//! Frame set notation used by task records.
//!
//! A frame set is either the sentinel `Unknown` (the task is not divisible by
//! frame) or a set of integer frame numbers written in a compact list/range
//! notation such as `1-10, 15, 20-40x5`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{QueueError, Result};

/// Sentinel written for tasks whose work cannot be subdivided by frame.
pub const UNKNOWN_FRAMES: &str = "Unknown";

/// Upper bound on the number of frames a single set may expand to.
pub const MAX_FRAMES: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSet {
    Unknown,
    Frames(BTreeSet<i64>),
}

impl FrameSet {
    /// Inclusive range `start..=end`.
    pub fn range(start: i64, end: i64) -> Self {
        FrameSet::Frames((start.min(end)..=start.max(end)).collect())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FrameSet::Unknown)
    }

    pub fn frames(&self) -> Option<&BTreeSet<i64>> {
        match self {
            FrameSet::Unknown => None,
            FrameSet::Frames(frames) => Some(frames),
        }
    }

    pub fn len(&self) -> usize {
        self.frames().map(BTreeSet::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First and last frame, if the set holds concrete frames.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let frames = self.frames()?;
        Some((*frames.first()?, *frames.last()?))
    }

    /// Returns the span if the frames form one gapless ascending run.
    pub fn contiguous_span(&self) -> Option<(i64, i64)> {
        let (start, end) = self.bounds()?;
        let span = end.checked_sub(start)?.checked_add(1)?;
        (usize::try_from(span).ok()? == self.len()).then_some((start, end))
    }

    /// Split the frames into `parts` runs of near-equal size, preserving order.
    ///
    /// Returns `None` for `Unknown` or when there are fewer frames than parts.
    pub fn chunks(&self, parts: usize) -> Option<Vec<FrameSet>> {
        let frames: Vec<i64> = self.frames()?.iter().copied().collect();
        if parts == 0 || frames.len() < parts {
            return None;
        }

        let base = frames.len() / parts;
        let extra = frames.len() % parts;
        let mut out = Vec::with_capacity(parts);
        let mut offset = 0;
        for i in 0..parts {
            let size = base + usize::from(i < extra);
            out.push(FrameSet::Frames(
                frames[offset..offset + size].iter().copied().collect(),
            ));
            offset += size;
        }
        Some(out)
    }
}

impl FromStr for FrameSet {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(UNKNOWN_FRAMES) {
            return Ok(FrameSet::Unknown);
        }

        let mut frames = BTreeSet::new();
        for item in trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|item| !item.is_empty())
        {
            parse_item(item, &mut frames)?;
        }

        if frames.is_empty() {
            return Err(QueueError::InvalidArgument(format!(
                "frame set '{}' contains no frames",
                s
            )));
        }
        Ok(FrameSet::Frames(frames))
    }
}

fn parse_item(item: &str, frames: &mut BTreeSet<i64>) -> Result<()> {
    let invalid = || QueueError::InvalidArgument(format!("invalid frame range '{}'", item));
    let number = |text: &str| text.parse::<i64>().map_err(|_| invalid());

    let (range, step) = match item.split_once(|c: char| c == 'x' || c == 'X') {
        Some((range, step)) => (range, Some(number(step)?)),
        None => (item, None),
    };

    // A separating dash always follows a digit; a leading dash is a sign.
    let bytes = range.as_bytes();
    let dash = (1..bytes.len()).find(|&i| bytes[i] == b'-' && bytes[i - 1].is_ascii_digit());

    let (start, end) = match dash {
        Some(i) => (number(&range[..i])?, number(&range[i + 1..])?),
        None if step.is_none() => {
            let frame = number(range)?;
            (frame, frame)
        }
        None => return Err(invalid()),
    };

    let step = step.unwrap_or(1);
    if step <= 0 || start > end {
        return Err(invalid());
    }
    if end.checked_sub(start).map_or(true, |span| span / step >= MAX_FRAMES as i64) {
        return Err(QueueError::InvalidArgument(format!(
            "frame range '{}' expands to more than {} frames",
            item, MAX_FRAMES
        )));
    }

    let mut frame = start;
    while frame <= end {
        frames.insert(frame);
        match frame.checked_add(step) {
            Some(next) => frame = next,
            None => break,
        }
    }
    Ok(())
}

impl fmt::Display for FrameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = match self {
            FrameSet::Unknown => return f.write_str(UNKNOWN_FRAMES),
            FrameSet::Frames(frames) => frames,
        };

        let mut runs: Vec<(i64, i64)> = Vec::new();
        for &frame in frames {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == frame => *end = frame,
                _ => runs.push((frame, frame)),
            }
        }

        for (i, (start, end)) in runs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(s: &str) -> FrameSet {
        s.parse().unwrap()
    }

    #[test]
    fn parses_unknown_sentinel() {
        assert_eq!(set("Unknown"), FrameSet::Unknown);
        assert_eq!(set(" unknown "), FrameSet::Unknown);
        assert_eq!(FrameSet::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn parses_ranges_lists_and_steps() {
        assert_eq!(set("1-5").len(), 5);
        assert_eq!(set("1, 3, 5").to_string(), "1, 3, 5");
        assert_eq!(set("1-10x3").to_string(), "1, 4, 7, 10");
        assert_eq!(set("1-3,4-6 9").to_string(), "1-6, 9");
    }

    #[test]
    fn parses_negative_frames() {
        assert_eq!(set("-5--3").to_string(), "-5--3");
        assert_eq!(set("-2-1").len(), 4);
        assert_eq!(set("-7").bounds(), Some((-7, -7)));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "abc", "5-1", "1-10x0", "1-", "3x2", "1-2-3"] {
            assert!(bad.parse::<FrameSet>().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn contiguous_span_detects_gaps() {
        assert_eq!(set("1-10").contiguous_span(), Some((1, 10)));
        assert_eq!(set("1-5, 8-10").contiguous_span(), None);
        assert_eq!(FrameSet::Unknown.contiguous_span(), None);
    }

    #[test]
    fn contiguous_span_handles_extreme_frames() {
        let extremes = set(&format!("{}, {}", i64::MIN, i64::MAX));
        assert_eq!(extremes.contiguous_span(), None);
        assert_eq!(set(&i64::MAX.to_string()).contiguous_span(), Some((i64::MAX, i64::MAX)));
        assert_eq!(extremes.to_string(), format!("{}, {}", i64::MIN, i64::MAX));
    }

    #[test]
    fn chunks_cover_all_frames_in_order() {
        let chunks = set("1-10").chunks(3).unwrap();
        let rendered: Vec<String> = chunks.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["1-4", "5-7", "8-10"]);

        assert!(set("1-2").chunks(3).is_none());
        assert!(FrameSet::Unknown.chunks(2).is_none());
    }
}
