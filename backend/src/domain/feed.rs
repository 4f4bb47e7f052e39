//! Feed filter validation and result rows.
//!
//! A [`FeedFilter`] is validated once, at construction, so the query engine
//! can assume every bound is in range. Invalid pagination never reaches the
//! database.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use super::post::Post;

/// Largest page a caller may request.
pub const FEED_LIMIT_MAX: i64 = 20;
/// Maximum number of tags in one filter.
pub const FEED_TAGS_MAX: usize = 5;
/// Maximum search phrase length in characters.
pub const FEED_SEARCH_MAX: usize = 100;

/// Reasons a feed filter is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedFilterError {
    #[error("limit must be between 1 and {max}, got {got}")]
    LimitOutOfRange { got: i64, max: i64 },
    #[error("offset must not be negative, got {got}")]
    NegativeOffset { got: i64 },
    #[error("at most {max} tags may be supplied")]
    TooManyTags { max: usize },
    #[error("tags must not be blank")]
    BlankTag,
    #[error("search must be at most {max} characters")]
    SearchTooLong { max: usize },
    #[error("unknown sort direction `{value}`")]
    UnknownSort { value: String },
}

/// Creation-time ordering of feed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// SQL keyword for the direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = FeedFilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(FeedFilterError::UnknownSort {
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Validated feed filter.
///
/// ## Invariants
/// - `limit` is within `1..=FEED_LIMIT_MAX`; `offset` is non-negative.
/// - `tags` holds at most [`FEED_TAGS_MAX`] non-blank entries.
/// - `search` is `None` or a non-empty phrase of at most
///   [`FEED_SEARCH_MAX`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFilter {
    limit: i64,
    offset: i64,
    sort: SortDirection,
    tags: Vec<String>,
    search: Option<String>,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            limit: FEED_LIMIT_MAX,
            offset: 0,
            sort: SortDirection::default(),
            tags: Vec::new(),
            search: None,
            since: None,
            until: None,
        }
    }
}

impl FeedFilter {
    /// Start building a filter from the defaults.
    #[must_use]
    pub fn builder() -> FeedFilterBuilder {
        FeedFilterBuilder::default()
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn since(&self) -> Option<NaiveDate> {
        self.since
    }

    pub fn until(&self) -> Option<NaiveDate> {
        self.until
    }

    /// Inclusive lower creation-time bound: midnight UTC starting `since`.
    #[must_use]
    pub fn since_bound(&self) -> Option<DateTime<Utc>> {
        self.since.and_then(start_of_day)
    }

    /// Exclusive upper creation-time bound: midnight UTC after `until`.
    ///
    /// `None` when `until` is unset or is the last representable day.
    #[must_use]
    pub fn until_bound(&self) -> Option<DateTime<Utc>> {
        self.until
            .and_then(|day| day.succ_opt())
            .and_then(start_of_day)
    }
}

fn start_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Builder for [`FeedFilter`]; validation runs in [`FeedFilterBuilder::build`].
#[derive(Debug, Clone)]
pub struct FeedFilterBuilder {
    limit: i64,
    offset: i64,
    sort: SortDirection,
    tags: Vec<String>,
    search: Option<String>,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl Default for FeedFilterBuilder {
    fn default() -> Self {
        let FeedFilter {
            limit,
            offset,
            sort,
            tags,
            search,
            since,
            until,
        } = FeedFilter::default();
        Self {
            limit,
            offset,
            sort,
            tags,
            search,
            since,
            until,
        }
    }
}

impl FeedFilterBuilder {
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn since(mut self, day: NaiveDate) -> Self {
        self.since = Some(day);
        self
    }

    #[must_use]
    pub fn until(mut self, day: NaiveDate) -> Self {
        self.until = Some(day);
        self
    }

    /// Validate and produce the filter.
    ///
    /// `since` later than `until` is accepted; such a filter matches nothing.
    pub fn build(self) -> Result<FeedFilter, FeedFilterError> {
        if !(1..=FEED_LIMIT_MAX).contains(&self.limit) {
            return Err(FeedFilterError::LimitOutOfRange {
                got: self.limit,
                max: FEED_LIMIT_MAX,
            });
        }
        if self.offset < 0 {
            return Err(FeedFilterError::NegativeOffset { got: self.offset });
        }
        if self.tags.len() > FEED_TAGS_MAX {
            return Err(FeedFilterError::TooManyTags { max: FEED_TAGS_MAX });
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(FeedFilterError::BlankTag);
        }
        let search = match self.search {
            Some(phrase) if phrase.chars().count() > FEED_SEARCH_MAX => {
                return Err(FeedFilterError::SearchTooLong {
                    max: FEED_SEARCH_MAX,
                });
            }
            Some(phrase) if phrase.trim().is_empty() => None,
            other => other,
        };

        Ok(FeedFilter {
            limit: self.limit,
            offset: self.offset,
            sort: self.sort,
            tags: self.tags,
            search,
            since: self.since,
            until: self.until,
        })
    }
}

/// One feed row: the post, its author's username, and its comment count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub post: Post,
    pub author_username: String,
    pub comment_count: i64,
}
