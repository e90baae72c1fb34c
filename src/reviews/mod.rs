//! Reviews Module
//!
//! Review data types, the remote review API and the list controller that
//! keeps a product's reviews in memory.

mod api;
mod controller;
mod http;
mod models;

pub use api::{ApiEnvelope, ReviewApi};
pub use controller::{LoadState, PageCursor, ReviewListController, ReviewListState};
pub use http::HttpReviewApi;
pub use models::{
    NewReview, Review, ReviewFilters, ReviewPage, ReviewStats, ReviewUpdate, ReviewUser, SortBy,
    VoteCounts, MAX_RATING, MIN_RATING,
};
