//! Review data types shared by the API client and the list controller.
//!
//! Field names serialize in camelCase to match the backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, ReviewResult};

/// Lowest valid star rating.
pub const MIN_RATING: u8 = 1;
/// Highest valid star rating.
pub const MAX_RATING: u8 = 5;

fn check_rating(rating: u8) -> ReviewResult<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ReviewError::InvalidReview(format!(
            "rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

// == Review ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUser {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A product review as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Star rating, 1 to 5
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_verified_purchase: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
    /// Never greater than `total_votes`
    #[serde(default)]
    pub helpful_votes: u32,
    #[serde(default)]
    pub total_votes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: ReviewUser,
}

impl Review {
    /// Overwrites the vote counters with server values.
    pub fn apply_votes(&mut self, votes: VoteCounts) {
        self.helpful_votes = votes.helpful_votes;
        self.total_votes = votes.total_votes;
    }
}

// == Stats ==
/// Aggregate figures for all reviews of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: u32,
    pub average_rating: f64,
    /// Review count per star rating
    #[serde(default)]
    pub rating_distribution: BTreeMap<u8, u32>,
    #[serde(default)]
    pub verified_purchase_percentage: f64,
    #[serde(default)]
    pub recommendation_percentage: f64,
}

impl ReviewStats {
    /// Number of reviews with the given star rating.
    pub fn count_for(&self, rating: u8) -> u32 {
        self.rating_distribution.get(&rating).copied().unwrap_or(0)
    }

    /// Folds one new review into the running total, average and distribution.
    ///
    /// Percentages are left alone until the next full load.
    pub fn record_added(&mut self, rating: u8) {
        let total = f64::from(self.total_reviews);
        self.average_rating = (self.average_rating * total + f64::from(rating)) / (total + 1.0);
        self.total_reviews += 1;
        *self.rating_distribution.entry(rating).or_insert(0) += 1;
    }

    /// Accounts for a deleted review. Only the total moves.
    pub fn record_deleted(&mut self) {
        self.total_reviews = self.total_reviews.saturating_sub(1);
    }
}

// == Filters ==
/// Sort order for review pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    Helpful,
    RatingHigh,
    RatingLow,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Newest => "newest",
            SortBy::Oldest => "oldest",
            SortBy::Helpful => "helpful",
            SortBy::RatingHigh => "rating_high",
            SortBy::RatingLow => "rating_low",
        }
    }
}

/// Which reviews to show and in what order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilters {
    /// Only this star rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_photos: Option<bool>,
    #[serde(default)]
    pub sort_by: SortBy,
}

impl ReviewFilters {
    pub fn sorted_by(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            ..Self::default()
        }
    }

    /// Query-string pairs for the backend. Unset filters are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("sortBy", self.sort_by.as_str().to_string())];
        if let Some(rating) = self.rating {
            pairs.push(("rating", rating.to_string()));
        }
        if let Some(verified) = self.verified_only {
            pairs.push(("verifiedOnly", verified.to_string()));
        }
        if let Some(photos) = self.with_photos {
            pairs.push(("withPhotos", photos.to_string()));
        }
        pairs
    }
}

// == Requests and Responses ==
/// Review submitted by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
}

impl NewReview {
    pub fn validate(&self) -> ReviewResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(ReviewError::InvalidReview("product id is required".to_string()));
        }
        check_rating(self.rating)
    }
}

/// Edit of an existing review. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> ReviewResult<()> {
        match self.rating {
            Some(rating) => check_rating(rating),
            None => Ok(()),
        }
    }
}

/// Authoritative vote counters returned after a vote change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounts {
    pub helpful_votes: u32,
    pub total_votes: u32,
}

/// One page of reviews plus product-wide stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub stats: ReviewStats,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_added_updates_average_and_bucket() {
        let mut stats = ReviewStats {
            total_reviews: 3,
            average_rating: 4.0,
            rating_distribution: BTreeMap::from([(3, 1), (4, 1), (5, 1)]),
            ..ReviewStats::default()
        };

        stats.record_added(2);

        assert_eq!(stats.total_reviews, 4);
        assert!((stats.average_rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(stats.count_for(2), 1);
        assert_eq!(stats.count_for(5), 1);
    }

    #[test]
    fn test_record_added_from_empty() {
        let mut stats = ReviewStats::default();
        stats.record_added(5);

        assert_eq!(stats.total_reviews, 1);
        assert_eq!(stats.average_rating, 5.0);
    }

    #[test]
    fn test_record_deleted_floors_at_zero() {
        let mut stats = ReviewStats {
            total_reviews: 1,
            average_rating: 4.0,
            rating_distribution: BTreeMap::from([(4, 1)]),
            ..ReviewStats::default()
        };

        stats.record_deleted();
        stats.record_deleted();

        assert_eq!(stats.total_reviews, 0);
        // Distribution and average are not recomputed on delete
        assert_eq!(stats.count_for(4), 1);
        assert_eq!(stats.average_rating, 4.0);
    }

    #[test]
    fn test_stats_deserialize_distribution() {
        let stats: ReviewStats = serde_json::from_value(json!({
            "totalReviews": 2,
            "averageRating": 4.5,
            "ratingDistribution": {"4": 1, "5": 1},
            "verifiedPurchasePercentage": 50.0,
            "recommendationPercentage": 100.0
        }))
        .unwrap();

        assert_eq!(stats.count_for(5), 1);
        assert_eq!(stats.count_for(1), 0);
    }

    #[test]
    fn test_filter_query_pairs() {
        let filters = ReviewFilters {
            rating: Some(5),
            with_photos: Some(true),
            sort_by: SortBy::RatingHigh,
            ..ReviewFilters::default()
        };

        assert_eq!(
            filters.query_pairs(),
            vec![
                ("sortBy", "rating_high".to_string()),
                ("rating", "5".to_string()),
                ("withPhotos", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_new_review_validation() {
        let mut review = NewReview {
            product_id: "p1".to_string(),
            rating: 5,
            ..NewReview::default()
        };
        assert!(review.validate().is_ok());

        review.rating = 0;
        assert!(matches!(review.validate(), Err(ReviewError::InvalidReview(_))));

        review.rating = 6;
        assert!(review.validate().is_err());
    }

    #[test]
    fn test_review_deserialize_defaults() {
        let review: Review = serde_json::from_value(json!({
            "id": "r1",
            "userId": "u1",
            "productId": "p1",
            "rating": 4,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z",
            "user": {"id": "u1", "name": "Ada"}
        }))
        .unwrap();

        assert!(review.images.is_empty());
        assert!(!review.is_verified_purchase);
        assert_eq!(review.helpful_votes, 0);
        assert!(review.user.avatar.is_none());
    }
}
