//! Composition of the parameterised feed aggregate query.
//!
//! Every optional predicate is a [`FeedClause`] that contributes one SQL
//! fragment and exactly one bound argument. Active clauses are folded in a
//! fixed order, so placeholder numbering and the generated text are
//! deterministic for a given filter. Filter values only ever travel as bind
//! parameters.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::domain::{AccountId, FeedFilter};

const FEED_BASE: &str = "SELECT p.id, p.author_id, p.title, p.content, p.tags, \
p.created_at, p.updated_at, p.version, \
a.username AS author_username, COUNT(c.id) AS comment_count \
FROM posts p \
JOIN accounts a ON a.id = p.author_id \
LEFT JOIN follow_edges f ON f.followed_id = p.author_id AND f.follower_id = $1 \
LEFT JOIN comments c ON c.post_id = p.id \
WHERE (f.follower_id IS NOT NULL OR p.author_id = $1)";

/// A value bound to one positional placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FeedBind {
    BigInt(i64),
    Text(String),
    TextArray(Vec<String>),
    Timestamp(DateTime<Utc>),
}

/// Optional predicate contributed by an active filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedClause<'a> {
    Search(&'a str),
    Tags(&'a [String]),
    Since(DateTime<Utc>),
    Until(DateTime<Utc>),
}

impl FeedClause<'_> {
    /// Active clauses, always in search, tags, since, until order.
    fn collect(filter: &FeedFilter) -> Vec<FeedClause<'_>> {
        let mut clauses = Vec::with_capacity(4);
        if let Some(phrase) = filter.search() {
            clauses.push(FeedClause::Search(phrase));
        }
        if !filter.tags().is_empty() {
            clauses.push(FeedClause::Tags(filter.tags()));
        }
        if let Some(since) = filter.since_bound() {
            clauses.push(FeedClause::Since(since));
        }
        if let Some(until) = filter.until_bound() {
            clauses.push(FeedClause::Until(until));
        }
        clauses
    }

    fn fragment(self, placeholder: usize) -> String {
        match self {
            Self::Search(_) => format!(
                "to_tsvector('english', p.title || ' ' || p.content) \
                 @@ plainto_tsquery('english', ${placeholder})"
            ),
            Self::Tags(_) => format!("p.tags @> ${placeholder}"),
            Self::Since(_) => format!("p.created_at >= ${placeholder}"),
            Self::Until(_) => format!("p.created_at < ${placeholder}"),
        }
    }

    fn bind(self) -> FeedBind {
        match self {
            Self::Search(phrase) => FeedBind::Text(phrase.to_owned()),
            Self::Tags(tags) => FeedBind::TextArray(tags.to_vec()),
            Self::Since(at) | Self::Until(at) => FeedBind::Timestamp(at),
        }
    }
}

/// SQL text plus its ordered bind values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FeedQueryPlan {
    sql: String,
    binds: Vec<FeedBind>,
}

impl FeedQueryPlan {
    /// Compose the feed query for `viewer` under `filter`.
    pub(crate) fn compose(viewer: AccountId, filter: &FeedFilter) -> Self {
        let mut sql = String::from(FEED_BASE);
        let mut binds = vec![FeedBind::BigInt(viewer.get())];

        for clause in FeedClause::collect(filter) {
            let placeholder = binds.len() + 1;
            let _ = write!(sql, " AND {}", clause.fragment(placeholder));
            binds.push(clause.bind());
        }

        let direction = filter.sort().as_sql();
        let limit = binds.len() + 1;
        let offset = limit + 1;
        let _ = write!(
            sql,
            " GROUP BY p.id, a.username \
             ORDER BY p.created_at {direction}, p.id {direction} \
             LIMIT ${limit} OFFSET ${offset}"
        );
        binds.push(FeedBind::BigInt(filter.limit()));
        binds.push(FeedBind::BigInt(filter.offset()));

        Self { sql, binds }
    }

    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn into_binds(self) -> Vec<FeedBind> {
        self.binds
    }

    #[cfg(test)]
    fn binds(&self) -> &[FeedBind] {
        &self.binds
    }
}
