//! Core data types for scraped profile items.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel written for any statistic the page did not expose.
pub const UNAVAILABLE: &str = "N/A";

/// A single engagement statistic as displayed on the page ("12.3k", "870").
///
/// Values are kept as displayed text; abbreviated counts are not expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Stat {
    Value(String),
    #[default]
    Unavailable,
}

impl Stat {
    /// Wrap displayed text, treating blank text as unavailable.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Stat::Unavailable
        } else {
            Stat::Value(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Stat::Value(v) => v,
            Stat::Unavailable => UNAVAILABLE,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Stat> for String {
    fn from(stat: Stat) -> Self {
        match stat {
            Stat::Value(v) => v,
            Stat::Unavailable => UNAVAILABLE.to_string(),
        }
    }
}

impl From<String> for Stat {
    fn from(text: String) -> Self {
        if text == UNAVAILABLE {
            Stat::Unavailable
        } else {
            Stat::from_text(&text)
        }
    }
}

/// Which lookup produced an item's title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleSource {
    /// The description element of the current markup.
    Description,
    /// The caption element of the older markup.
    LegacyCaption,
    /// Nothing found; `"Item {n}"` was synthesized.
    #[default]
    Placeholder,
}

/// Which heuristic last assigned a statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatSource {
    /// No heuristic matched; the field holds the sentinel.
    #[default]
    Unresolved,
    /// Tier 1: classified by the icon markup preceding the count.
    IconSignature,
    /// Tier 1: a count with an unrecognized icon, assigned to views.
    UnclassifiedCount,
    /// Tier 2: positional emphasized text.
    EmphasisOrder,
}

/// Record of the strategy applied for every heuristic field of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldTrace {
    pub title: TitleSource,
    pub likes: StatSource,
    pub comments: StatSource,
    pub views: StatSource,
}

/// One content item scraped from the profile feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    #[serde(rename = "url")]
    pub resource_url: String,
    pub title: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    #[serde(rename = "likes")]
    pub like_count: Stat,
    #[serde(rename = "comments")]
    pub comment_count: Stat,
    #[serde(rename = "views")]
    pub view_count: Stat,
    #[serde(rename = "extractedAt", serialize_with = "iso8601::serialize")]
    pub extracted_at: DateTime<Utc>,
    #[serde(skip)]
    pub trace: FieldTrace,
}

/// The complete, ordered outcome of one extraction pass.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub profile_id: String,
    pub extracted_at: DateTime<Utc>,
    items: Vec<ItemRecord>,
}

impl ScrapeResult {
    pub fn new(profile_id: impl Into<String>, items: Vec<ItemRecord>) -> Self {
        Self {
            profile_id: profile_id.into(),
            extracted_at: Utc::now(),
            items,
        }
    }

    /// Items in the order they appeared in the page.
    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    /// Always equal to `items().len()`.
    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Format a timestamp as ISO-8601 UTC with millisecond precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }
}
