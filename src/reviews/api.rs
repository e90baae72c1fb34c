//! Review API collaborator interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, ReviewResult};
use crate::reviews::{NewReview, Review, ReviewFilters, ReviewPage, ReviewUpdate, VoteCounts};

// == Response Envelope ==
/// Uniform backend response: `{"success": bool, "data": .., "message": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Returns the payload of a successful envelope.
    ///
    /// `fallback` is the error message used when the backend gave none.
    pub fn into_data(self, fallback: &str) -> ReviewResult<T> {
        if !self.success {
            return Err(ReviewError::api(self.message, fallback));
        }
        self.data
            .ok_or_else(|| ReviewError::InvalidResponse(format!("{}: missing data", fallback)))
    }

    /// Checks success for calls whose payload is irrelevant.
    pub fn into_unit(self, fallback: &str) -> ReviewResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(ReviewError::api(self.message, fallback))
        }
    }
}

// == Review API Trait ==
/// Remote review operations. Every call is a single request with no retry.
#[async_trait]
pub trait ReviewApi: Send + Sync {
    /// Fetches one page (1-based) of a product's reviews.
    async fn get_product_reviews(
        &self,
        product_id: &str,
        page: u32,
        limit: u32,
        filters: &ReviewFilters,
    ) -> ReviewResult<ReviewPage>;

    /// Creates a review and returns the stored copy.
    async fn add_review(&self, data: &NewReview) -> ReviewResult<Review>;

    /// Edits a review and returns the stored copy.
    async fn update_review(&self, review_id: &str, data: &ReviewUpdate) -> ReviewResult<Review>;

    async fn delete_review(&self, review_id: &str) -> ReviewResult<()>;

    /// Casts or changes the caller's vote; returns the new counters.
    async fn vote_helpful(&self, review_id: &str, is_helpful: bool) -> ReviewResult<VoteCounts>;

    /// Withdraws the caller's vote; returns the new counters.
    async fn remove_vote(&self, review_id: &str) -> ReviewResult<VoteCounts>;

    async fn report_review(
        &self,
        review_id: &str,
        reason: &str,
        description: Option<&str>,
    ) -> ReviewResult<()>;
}
