//! Run identifiers and the directory naming scheme they encode.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use ensemble_error::{StoreError, StoreErrorKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum length of the task-derived slug in a run id.
const MAX_SLUG_LEN: usize = 20;

/// Slug used when a task has no ASCII alphanumerics at all.
const FALLBACK_SLUG: &str = "task";

/// Opaque, filesystem-safe identifier of a run.
///
/// Generated ids have the shape `<YYYYMMDD>_<8 hex chars>_<slug>`: sortable by
/// day, unique within a day thanks to the random segment, and readable thanks
/// to the slug.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use ensemble_core::RunId;
///
/// let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
/// let id = RunId::generate(at, "Search the web for Rust news!");
///
/// assert!(id.as_str().starts_with("20250314_"));
/// assert!(id.as_str().ends_with("_search-the-web-for-r"));
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh id for a task created at `created_at`.
    pub fn generate(created_at: DateTime<Utc>, task: &str) -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}_{}",
            created_at.format("%Y%m%d"),
            &random[..8],
            slugify(task)
        ))
    }

    /// The id as a string slice (also its directory name).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Best-effort creation time encoded in the id.
    ///
    /// Reads the leading `YYYYMMDD` segment, plus an `HHMMSS` segment when one
    /// follows it (directories written by older front ends carry one).
    pub fn encoded_timestamp(&self) -> Option<DateTime<Utc>> {
        let mut segments = self.0.split('_');
        let date = NaiveDate::parse_from_str(segments.next()?, "%Y%m%d").ok()?;
        let time = segments
            .next()
            .filter(|s| s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| NaiveTime::parse_from_str(s, "%H%M%S").ok())
            .unwrap_or(NaiveTime::MIN);
        Some(Utc.from_utc_datetime(&date.and_time(time)))
    }

    /// Best-effort task text recovered from the slug segment.
    ///
    /// Dashes become spaces and the first letter is capitalised. The slug is
    /// lossy, so this is only used when no metadata was recorded.
    pub fn encoded_task(&self) -> Option<String> {
        let mut segments: Vec<&str> = self.0.split('_').collect();
        if segments.len() < 3 {
            return None;
        }
        // drop the date, an optional HHMMSS segment, then the random segment
        segments.remove(0);
        if segments.len() > 2 && segments[0].len() == 6 && segments[0].bytes().all(|b| b.is_ascii_digit()) {
            segments.remove(0);
        }
        segments.remove(0);
        let slug = segments.join("_").replace('-', " ");
        let mut chars = slug.chars();
        let first = chars.next()?;
        Some(first.to_uppercase().chain(chars).collect())
    }
}

impl FromStr for RunId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s != "."
            && !s.contains("..")
            && !s.contains(['/', '\\', '\0']);
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(StoreError::new(StoreErrorKind::InvalidRunId(s.to_string())))
        }
    }
}

impl TryFrom<String> for RunId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turn task text into a short, filesystem-safe slug.
///
/// Lowercases ASCII, collapses every run of other characters into a single
/// `-`, trims dashes at both ends and keeps at most 20 characters.
///
/// # Examples
///
/// ```
/// use ensemble_core::slugify;
///
/// assert_eq!(slugify("Analyze  the code in src/main.rs"), "analyze-the-code-in");
/// assert_eq!(slugify("¿¿¿"), "task");
/// ```
pub fn slugify(task: &str) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_LEN);
    let mut pending_dash = false;
    for c in task.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
                if slug.len() >= MAX_SLUG_LEN {
                    break;
                }
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}
