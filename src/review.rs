//! Review records fed to the batch processor.
//!
//! Scraper exports arrive as [`RawReview`]s; the item source keeps only the
//! low-rated ones and maps them into canonical [`Review`]s. Reading and writing
//! files is left to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::WithKey;
use crate::error::Result;

/// Ratings strictly below this are considered low
pub const LOW_RATING_THRESHOLD: f64 = 5.0;

/// Canonical product review
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Reviewer identifier
    #[serde(rename = "reviewerID")]
    pub reviewer_id: String,
    /// Product identifier
    pub asin: String,
    /// Reviewer display name
    #[serde(rename = "reviewerName")]
    pub reviewer_name: String,
    /// Review body
    #[serde(rename = "reviewText")]
    pub review_text: String,
    /// Star rating
    pub overall: f64,
    /// Review time as a unix timestamp (seconds)
    #[serde(rename = "unixReviewTime")]
    pub unix_review_time: i64,
    /// Review time as displayed by the source
    #[serde(rename = "reviewTime")]
    pub review_time: String,
}

impl Review {
    /// Stable key for logs and failure records: `<asin>/<reviewer_id>`
    pub fn key(&self) -> String {
        format!("{}/{}", self.asin, self.reviewer_id)
    }

    /// Review time as a UTC timestamp, if the unix time is in range
    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.unix_review_time, 0)
    }

    /// Whether the rating is below [`LOW_RATING_THRESHOLD`]
    pub fn is_low_rated(&self) -> bool {
        self.overall < LOW_RATING_THRESHOLD
    }
}

/// Review as exported by the scraping tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    /// Reviewer identifier
    pub id: String,
    /// Product identifier
    pub product_asin: String,
    /// Reviewer display name
    pub author_title: String,
    /// Review body
    pub body: String,
    /// Star rating
    pub rating: f64,
    /// Review time as a unix timestamp (seconds)
    pub review_timestamp: i64,
    /// Review time as displayed by the source
    pub date: String,
}

impl RawReview {
    /// Whether the rating is below [`LOW_RATING_THRESHOLD`]
    pub fn is_low_rated(&self) -> bool {
        self.rating < LOW_RATING_THRESHOLD
    }
}

impl From<RawReview> for Review {
    fn from(raw: RawReview) -> Self {
        Self {
            reviewer_id: raw.id,
            asin: raw.product_asin,
            reviewer_name: raw.author_title,
            review_text: raw.body,
            overall: raw.rating,
            unix_review_time: raw.review_timestamp,
            review_time: raw.date,
        }
    }
}

/// Keep low-rated reviews and map them into canonical form, preserving order
pub fn low_rated_reviews(raw: Vec<RawReview>) -> Vec<Review> {
    raw.into_iter()
        .filter(RawReview::is_low_rated)
        .map(Review::from)
        .collect()
}

/// Parse a JSON array of scraper-exported reviews
pub fn parse_raw_reviews(json: &str) -> Result<Vec<RawReview>> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON array of canonical reviews
pub fn parse_reviews(json: &str) -> Result<Vec<Review>> {
    Ok(serde_json::from_str(json)?)
}

/// Key a review classifier's failures and log lines by [`Review::key`]
pub fn keyed<C>(classifier: C) -> WithKey<C, fn(&Review) -> String> {
    WithKey::new(classifier, Review::key as fn(&Review) -> String)
}
