//! Daily rotation decision logic.
//!
//! Everything in this module is pure: given instants and directory listings
//! it decides whether to rotate, what the dated file for a period is called,
//! how to recover the active period after a restart and which historical
//! files to prune. All I/O lives in [`crate::writer`].

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime};
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Date format embedded in rotated file names.
pub const ROTATED_DATE_FORMAT: &str = "%Y-%m-%d";

/// A directory entry considered for rotation recovery or pruning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path of the file.
    pub path: PathBuf,

    /// Last-modified time of the file.
    pub modified: SystemTime,
}

impl FileEntry {
    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Returns the local start of day containing `instant`.
///
/// On the rare local timelines where midnight does not exist the instant
/// itself is returned, which only delays the next rotation by under a day.
#[must_use]
pub fn start_of_day(instant: DateTime<Local>) -> DateTime<Local> {
    local_midnight(instant.date_naive()).unwrap_or(instant)
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
}

/// Returns true when the active period is over and the writer must rotate.
#[must_use]
pub fn should_rotate(now: DateTime<Local>, period_start: DateTime<Local>) -> bool {
    now >= period_start + Duration::days(1)
}

/// Computes the dated file path for a period:
/// `<basename>-<yyyy-MM-dd>` under the base path's parent directory.
#[must_use]
pub fn period_file_name(period_start: DateTime<Local>, base_path: &Path) -> PathBuf {
    let dated = format!(
        "{}-{}",
        base_name(base_path),
        period_start.format(ROTATED_DATE_FORMAT)
    );
    base_path
        .parent()
        .map_or_else(|| PathBuf::from(&dated), |parent| parent.join(&dated))
}

/// Returns true if `file_name` is a rotated companion of `base_name`.
///
/// The accepted set is `<basename>-YYYY-MM-DD<anything>` minus names with a
/// trailing `lck` lock suffix. The source expressed the lock exclusion with a
/// lookbehind (`(?<!lck)$`), which the regex engine here does not support;
/// the explicit suffix check accepts exactly the same names.
#[must_use]
pub fn is_rotated_file(file_name: &str, base_name: &str) -> bool {
    !file_name.ends_with("lck") && rotated_matcher(base_name).is_match(file_name)
}

fn rotated_matcher(base_name: &str) -> Regex {
    Regex::new(&format!(
        "{}-[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}",
        regex::escape(base_name)
    ))
    .expect("escaped file name regex compiles")
}

/// Recovers the active period start from the files already on disk.
///
/// Among entries matching the rotated-file pattern for `base_path`, the one
/// with the latest last-modified time wins and its embedded date is taken as
/// local midnight. Without a match the period starts at the local midnight
/// of `now`. Ties on last-modified time are broken deterministically by the
/// lexicographically greater path.
#[must_use]
pub fn recover_period_start(
    entries: &[FileEntry],
    base_path: &Path,
    now: DateTime<Local>,
) -> DateTime<Local> {
    let base = base_name(base_path);
    let date_matcher =
        Regex::new("[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("date extraction regex compiles");

    let mut rotated: Vec<&FileEntry> = entries
        .iter()
        .filter(|entry| is_rotated_file(entry.file_name(), &base))
        .collect();
    rotated.sort_by(|a, b| newest_first(a, b));

    rotated
        .first()
        .and_then(|entry| date_matcher.find(entry.file_name()))
        .and_then(|found| NaiveDate::parse_from_str(found.as_str(), ROTATED_DATE_FORMAT).ok())
        .and_then(local_midnight)
        .unwrap_or_else(|| start_of_day(now))
}

/// Selects the files to delete after a rotation.
///
/// Entries must already be filtered to rotated companions of one base path.
/// The `retention` most recently modified files are kept; the rest are
/// returned for deletion, with the same tie-break as
/// [`recover_period_start`].
#[must_use]
pub fn files_to_prune(entries: &[FileEntry], retention: usize) -> Vec<PathBuf> {
    if entries.len() <= retention {
        return Vec::new();
    }
    let mut ordered: Vec<&FileEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| newest_first(a, b));
    ordered[retention..]
        .iter()
        .map(|entry| entry.path.clone())
        .collect()
}

fn newest_first(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.modified
        .cmp(&a.modified)
        .then_with(|| b.path.cmp(&a.path))
}

fn base_name(base_path: &Path) -> String {
    base_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}
