//! TAP (Test Anything Protocol) line grammar.
//!
//! Only the subset needed to report per-test outcomes and to detect the end
//! of a run is modelled:
//!
//! ```text
//! 1..<total>
//! ok <n> <title>[ # SKIP-]
//! not ok <n> <title>[ - <detail>]
//! # tests <count>
//! # pass <count>
//! # fail <count>
//! ```

use std::fmt;

use crate::event::RunFailure;

const SKIP_SUFFIX: &str = " # SKIP-";
const DETAIL_SEPARATOR: &str = " - ";
const TESTS_MARKER: &str = "# tests ";
const PASS_MARKER: &str = "# pass ";
const FAIL_MARKER: &str = "# fail ";

/// A single TAP line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapLine {
    /// `1..<total>` plan line.
    Plan { total: u64 },
    /// Passing or skipped test.
    Ok {
        number: u64,
        title: String,
        skipped: bool,
    },
    /// Failing test, with an already framed detail.
    NotOk {
        number: u64,
        title: String,
        detail: Option<String>,
    },
    /// `# tests <count>` trailer line.
    Tests(u64),
    /// `# pass <count>` trailer line.
    Pass(u64),
    /// `# fail <count>` trailer line.
    Fail(u64),
}

impl TapLine {
    /// Passing test line. The title is sanitized.
    pub fn ok(number: u64, title: &str) -> Self {
        Self::Ok {
            number,
            title: sanitize_title(title),
            skipped: false,
        }
    }

    /// Skipped test line. The title is sanitized.
    pub fn skipped(number: u64, title: &str) -> Self {
        Self::Ok {
            number,
            title: sanitize_title(title),
            skipped: true,
        }
    }

    /// Failing test line. The title is sanitized and every line of the
    /// detail is indented so it cannot be mistaken for a TAP line.
    pub fn not_ok(number: u64, title: &str, detail: Option<&str>) -> Self {
        Self::NotOk {
            number,
            title: sanitize_title(title),
            detail: detail.filter(|d| !d.is_empty()).map(indent_detail),
        }
    }

    /// Parse a line. Returns `None` for anything that is not TAP.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix("not ok ") {
            let (number, rest) = split_number(rest)?;
            let (title, detail) = match rest.split_once(DETAIL_SEPARATOR) {
                Some((title, detail)) => (title, Some(detail.to_string())),
                None => (rest, None),
            };
            return Some(Self::NotOk {
                number,
                title: title.to_string(),
                detail,
            });
        }

        if let Some(rest) = line.strip_prefix("ok ") {
            let (number, rest) = split_number(rest)?;
            let (title, skipped) = match rest.strip_suffix(SKIP_SUFFIX) {
                Some(title) => (title, true),
                None => (rest, false),
            };
            return Some(Self::Ok {
                number,
                title: title.to_string(),
                skipped,
            });
        }

        if let Some(total) = line.strip_prefix("1..") {
            return total.parse().ok().map(|total| Self::Plan { total });
        }

        if let Some(count) = line.strip_prefix(TESTS_MARKER) {
            return count.parse().ok().map(Self::Tests);
        }
        if let Some(count) = line.strip_prefix(PASS_MARKER) {
            return count.parse().ok().map(Self::Pass);
        }
        if let Some(count) = line.strip_prefix(FAIL_MARKER) {
            return count.parse().ok().map(Self::Fail);
        }

        None
    }
}

impl fmt::Display for TapLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan { total } => write!(f, "1..{}", total),
            Self::Ok {
                number,
                title,
                skipped,
            } => {
                write!(f, "ok {} {}", number, title)?;
                if *skipped {
                    f.write_str(SKIP_SUFFIX)?;
                }
                Ok(())
            }
            Self::NotOk {
                number,
                title,
                detail,
            } => {
                write!(f, "not ok {} {}", number, title)?;
                if let Some(detail) = detail {
                    write!(f, "{}{}", DETAIL_SEPARATOR, detail)?;
                }
                Ok(())
            }
            Self::Tests(count) => write!(f, "{}{}", TESTS_MARKER, count),
            Self::Pass(count) => write!(f, "{}{}", PASS_MARKER, count),
            Self::Fail(count) => write!(f, "{}{}", FAIL_MARKER, count),
        }
    }
}

/// Split `<n> <rest>` into the number and the remainder.
fn split_number(s: &str) -> Option<(u64, &str)> {
    let (number, rest) = s.split_once(' ').unwrap_or((s, ""));
    Some((number.parse().ok()?, rest))
}

/// Strip the TAP comment marker from a test title.
pub fn sanitize_title(title: &str) -> String {
    title.replace('#', "")
}

/// Prefix every line of a failure detail with two spaces.
pub fn indent_detail(detail: &str) -> String {
    detail
        .split('\n')
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run outcome decided by a trailer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerVerdict {
    /// `# fail 0`.
    Passed,
    /// `# fail N` with N >= 1.
    Failed { failures: u64 },
    /// `# tests 0`: the harness discovered nothing to run.
    NoTests,
}

impl TrailerVerdict {
    /// Returns true if the run passed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Convert into the payload carried by `log.end`.
    pub fn into_outcome(self) -> Result<(), RunFailure> {
        match self {
            Self::Passed => Ok(()),
            Self::Failed { .. } | Self::NoTests => Err(RunFailure::tests_failed()),
        }
    }
}

/// Decide whether `line` ends the run.
///
/// Markers may appear anywhere in the line so that relays which prefix
/// output (logcat tags, console prefixes) are still recognised. Failing
/// forms take precedence over `# fail 0`.
pub fn scan_trailer(line: &str) -> Option<TrailerVerdict> {
    let failures = count_after(line, FAIL_MARKER);

    if let Some(failures) = failures.filter(|n| *n > 0) {
        return Some(TrailerVerdict::Failed { failures });
    }
    if count_after(line, TESTS_MARKER) == Some(0) {
        return Some(TrailerVerdict::NoTests);
    }
    if failures == Some(0) {
        return Some(TrailerVerdict::Passed);
    }
    None
}

/// Decimal count directly following the first occurrence of `marker`.
fn count_after(line: &str, marker: &str) -> Option<u64> {
    let start = line.find(marker)? + marker.len();
    let tail = &line[start..];
    let end = tail
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tail.len());
    let digits = &tail[..end];
    if digits.is_empty() {
        return None;
    }
    // Only a non-zero count can overflow.
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// Running tally of a TAP stream, for console summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapSummary {
    pub planned: Option<u64>,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub verdict: Option<TrailerVerdict>,
}

impl TapSummary {
    /// Account for one received line.
    pub fn observe(&mut self, line: &str) {
        match TapLine::parse(line) {
            Some(TapLine::Plan { total }) => self.planned = Some(total),
            Some(TapLine::Ok { skipped: true, .. }) => self.skipped += 1,
            Some(TapLine::Ok { .. }) => self.passed += 1,
            Some(TapLine::NotOk { .. }) => self.failed += 1,
            _ => {}
        }
        if self.verdict.is_none() {
            self.verdict = scan_trailer(line);
        }
    }
}

impl fmt::Display for TapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed, self.failed, self.skipped
        )?;
        if let Some(planned) = self.planned {
            write!(f, " ({} planned)", planned)?;
        }
        Ok(())
    }
}
