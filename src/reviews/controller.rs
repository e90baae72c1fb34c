//! Review List Controller
//!
//! Owns the in-memory, paginated view of one product's reviews and applies
//! server-confirmed mutations to it.
//!
//! Page loads follow a small state machine (see [`LoadState`]). Mutations do
//! not touch the load state; they edit whatever list is current when the
//! server answers. Every list reset bumps a generation counter and page
//! results from an older generation are dropped, so results fetched for a
//! previous filter set or product never show up in the list.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ReviewError, ReviewResult};
use crate::reviews::{
    NewReview, Review, ReviewApi, ReviewFilters, ReviewPage, ReviewStats, ReviewUpdate, VoteCounts,
};

// == Load State ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    LoadingFirstPage,
    Ready,
    LoadingMore,
    Refreshing,
    Error,
}

/// Current page and whether the backend has more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub current_page: u32,
    pub has_more: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            current_page: 1,
            has_more: false,
        }
    }
}

// == List State ==
/// Observable state of the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListState {
    pub product_id: Option<String>,
    pub reviews: Vec<Review>,
    pub stats: Option<ReviewStats>,
    pub load_state: LoadState,
    /// Last page-load failure, cleared by the next load
    pub error: Option<String>,
    pub cursor: PageCursor,
    pub filters: ReviewFilters,
    #[serde(skip)]
    generation: u64,
}

impl ReviewListState {
    /// A first page or a further page is being fetched.
    pub fn loading(&self) -> bool {
        matches!(
            self.load_state,
            LoadState::LoadingFirstPage | LoadState::LoadingMore
        )
    }

    pub fn refreshing(&self) -> bool {
        self.load_state == LoadState::Refreshing
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more
    }

    /// A list has been loaded and may be mutated.
    fn accepts_mutations(&self) -> bool {
        matches!(
            self.load_state,
            LoadState::Ready | LoadState::LoadingMore | LoadState::Refreshing
        )
    }

    fn review_mut(&mut self, review_id: &str) -> Option<&mut Review> {
        self.reviews.iter_mut().find(|r| r.id == review_id)
    }
}

/// How a first-page load changes the state before fetching.
enum Reset {
    /// Initial load for the current product and filters
    Mount,
    /// New product; stats belong to the old one and are dropped
    Product(String),
    Filters(ReviewFilters),
    /// Keep the list visible while page 1 is refetched
    Refresh,
}

// == Review List Controller ==
/// Paginated, filterable review list for one product at a time.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ReviewListController {
    api: Arc<dyn ReviewApi>,
    page_size: u32,
    state: Arc<watch::Sender<ReviewListState>>,
}

impl ReviewListController {
    /// Creates an idle controller with no product selected.
    pub fn new(api: Arc<dyn ReviewApi>, page_size: u32) -> Self {
        let (state, _) = watch::channel(ReviewListState::default());
        Self {
            api,
            page_size: page_size.max(1),
            state: Arc::new(state),
        }
    }

    /// Creates a controller for `product_id` with `filters` and loads page 1.
    pub async fn mount(
        api: Arc<dyn ReviewApi>,
        page_size: u32,
        product_id: impl Into<String>,
        filters: ReviewFilters,
    ) -> ReviewResult<Self> {
        let controller = Self::new(api, page_size);
        let product_id = product_id.into();
        controller.state.send_modify(|s| {
            s.product_id = Some(product_id);
            s.filters = filters;
        });
        controller.load().await?;
        Ok(controller)
    }

    // == Observation ==
    /// Copy of the current state.
    pub fn snapshot(&self) -> ReviewListState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ReviewListState> {
        self.state.subscribe()
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.state.borrow().reviews.clone()
    }

    pub fn stats(&self) -> Option<ReviewStats> {
        self.state.borrow().stats.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.state.borrow().load_state
    }

    // == Page Loads ==
    /// Loads page 1 for the current product and filters, clearing the list first.
    pub async fn load(&self) -> ReviewResult<()> {
        self.load_first_page(Reset::Mount).await
    }

    /// Switches to another product and loads its first page.
    pub async fn set_product(&self, product_id: impl Into<String>) -> ReviewResult<()> {
        self.load_first_page(Reset::Product(product_id.into())).await
    }

    /// Replaces the filters, clears the list and restarts from page 1.
    pub async fn update_filters(&self, filters: ReviewFilters) -> ReviewResult<()> {
        self.load_first_page(Reset::Filters(filters)).await
    }

    /// Refetches page 1 and replaces the list and stats.
    ///
    /// Ignored while a first page or another refresh is in flight. From
    /// `Idle` this is the same as [`load`](Self::load).
    pub async fn refresh(&self) -> ReviewResult<()> {
        match self.load_state() {
            LoadState::LoadingFirstPage | LoadState::Refreshing => {
                debug!("Refresh ignored, a first page load is in flight");
                Ok(())
            }
            LoadState::Idle => self.load_first_page(Reset::Mount).await,
            LoadState::Ready | LoadState::LoadingMore | LoadState::Error => {
                self.load_first_page(Reset::Refresh).await
            }
        }
    }

    async fn load_first_page(&self, reset: Reset) -> ReviewResult<()> {
        let refreshing = matches!(reset, Reset::Refresh);
        let mut ticket = None;
        // State and cursor a failed refresh falls back to
        let mut fallback = None;

        self.state.send_modify(|s| {
            match reset {
                Reset::Mount | Reset::Refresh => {}
                Reset::Product(product_id) => {
                    s.product_id = Some(product_id);
                    s.stats = None;
                }
                Reset::Filters(filters) => s.filters = filters,
            }

            if refreshing {
                let state = match s.load_state {
                    LoadState::Error => LoadState::Error,
                    _ => LoadState::Ready,
                };
                fallback = Some((state, s.cursor));
            }

            s.generation += 1;
            s.cursor = PageCursor::default();
            s.error = None;
            if refreshing {
                s.load_state = LoadState::Refreshing;
            } else {
                s.reviews.clear();
                s.load_state = LoadState::LoadingFirstPage;
            }

            if let Some(product_id) = &s.product_id {
                ticket = Some((product_id.clone(), s.filters.clone(), s.generation));
            } else {
                s.load_state = LoadState::Idle;
            }
        });

        let Some((product_id, filters, generation)) = ticket else {
            return Err(ReviewError::MissingProduct);
        };

        info!(
            "Loading reviews for {} sorted by {}",
            product_id,
            filters.sort_by.as_str()
        );
        let result = self
            .api
            .get_product_reviews(&product_id, 1, self.page_size, &filters)
            .await;

        let mut outcome = Ok(());
        self.state.send_modify(|s| {
            if s.generation != generation {
                debug!("Discarding stale first page for {}", product_id);
                return;
            }
            match result {
                Ok(page) => {
                    s.cursor = PageCursor {
                        current_page: 1,
                        has_more: page.has_more,
                    };
                    s.reviews = page.reviews;
                    s.stats = Some(page.stats);
                    s.load_state = LoadState::Ready;
                }
                Err(e) => {
                    warn!("Failed to load reviews for {}: {}", product_id, e);
                    s.error = Some(e.to_string());
                    // A failed refresh keeps the list it was refreshing
                    match fallback {
                        Some((state, cursor)) => {
                            s.load_state = state;
                            s.cursor = cursor;
                        }
                        None => s.load_state = LoadState::Error,
                    }
                    outcome = Err(e);
                }
            }
        });
        outcome
    }

    /// Fetches the next page and appends it.
    ///
    /// A no-op unless the list is `Ready` and the backend reported more pages.
    pub async fn load_more(&self) -> ReviewResult<()> {
        let mut ticket = None;
        self.state.send_if_modified(|s| {
            if s.load_state != LoadState::Ready || !s.cursor.has_more {
                return false;
            }
            let Some(product_id) = s.product_id.clone() else {
                return false;
            };
            s.load_state = LoadState::LoadingMore;
            ticket = Some((
                product_id,
                s.filters.clone(),
                s.cursor.current_page + 1,
                s.generation,
            ));
            true
        });

        let Some((product_id, filters, page, generation)) = ticket else {
            debug!("load_more ignored");
            return Ok(());
        };

        let result = self
            .api
            .get_product_reviews(&product_id, page, self.page_size, &filters)
            .await;

        let mut outcome = Ok(());
        self.state.send_modify(|s| {
            if s.generation != generation {
                debug!("Discarding stale page {} for {}", page, product_id);
                return;
            }
            s.load_state = LoadState::Ready;
            match result {
                Ok(ReviewPage {
                    reviews, has_more, ..
                }) => {
                    append_unique(&mut s.reviews, reviews);
                    s.cursor = PageCursor {
                        current_page: page,
                        has_more,
                    };
                }
                Err(e) => {
                    warn!("Failed to load page {} for {}: {}", page, product_id, e);
                    s.error = Some(e.to_string());
                    outcome = Err(e);
                }
            }
        });
        outcome
    }

    // == Mutations ==
    /// Returns the current product if a list is loaded.
    fn mutation_target(&self) -> ReviewResult<Option<String>> {
        let state = self.state.borrow();
        if state.accepts_mutations() {
            Ok(state.product_id.clone())
        } else {
            Err(ReviewError::NotReady)
        }
    }

    /// Submits a review and puts the server's copy at the head of the list.
    pub async fn add_review(&self, data: NewReview) -> ReviewResult<Review> {
        let product_id = self.mutation_target()?;
        data.validate()?;
        if product_id.as_deref() != Some(data.product_id.as_str()) {
            return Err(ReviewError::InvalidReview(format!(
                "review is for product {}, list shows {}",
                data.product_id,
                product_id.as_deref().unwrap_or("none")
            )));
        }

        let review = self.api.add_review(&data).await.map_err(|e| {
            warn!("Failed to add review: {}", e);
            e
        })?;

        self.state.send_modify(|s| {
            if s.product_id != product_id {
                debug!("Product changed while adding review {}", review.id);
                return;
            }
            s.reviews.insert(0, review.clone());
            if let Some(stats) = s.stats.as_mut() {
                stats.record_added(review.rating);
            }
        });
        info!("Added review {}", review.id);
        Ok(review)
    }

    /// Edits a review and replaces the listed copy with the server's.
    ///
    /// Stats are not recomputed for edits.
    pub async fn update_review(&self, review_id: &str, data: ReviewUpdate) -> ReviewResult<Review> {
        self.mutation_target()?;
        data.validate()?;

        let review = self
            .api
            .update_review(review_id, &data)
            .await
            .map_err(|e| {
                warn!("Failed to update review {}: {}", review_id, e);
                e
            })?;

        self.state.send_modify(|s| {
            if let Some(listed) = s.review_mut(review_id) {
                *listed = review.clone();
            }
        });
        Ok(review)
    }

    /// Deletes a review, drops it from the list and decrements the total.
    pub async fn delete_review(&self, review_id: &str) -> ReviewResult<()> {
        self.mutation_target()?;

        self.api.delete_review(review_id).await.map_err(|e| {
            warn!("Failed to delete review {}: {}", review_id, e);
            e
        })?;

        self.state.send_modify(|s| {
            s.reviews.retain(|r| r.id != review_id);
            if let Some(stats) = s.stats.as_mut() {
                stats.record_deleted();
            }
        });
        info!("Deleted review {}", review_id);
        Ok(())
    }

    /// Votes on a review and stores the server's counters.
    pub async fn vote_helpful(&self, review_id: &str, is_helpful: bool) -> ReviewResult<VoteCounts> {
        self.mutation_target()?;

        let votes = self
            .api
            .vote_helpful(review_id, is_helpful)
            .await
            .map_err(|e| {
                warn!("Failed to vote on review {}: {}", review_id, e);
                e
            })?;
        self.apply_votes(review_id, votes);
        Ok(votes)
    }

    /// Withdraws a vote and stores the server's counters.
    pub async fn remove_vote(&self, review_id: &str) -> ReviewResult<VoteCounts> {
        self.mutation_target()?;

        let votes = self.api.remove_vote(review_id).await.map_err(|e| {
            warn!("Failed to remove vote on review {}: {}", review_id, e);
            e
        })?;
        self.apply_votes(review_id, votes);
        Ok(votes)
    }

    fn apply_votes(&self, review_id: &str, votes: VoteCounts) {
        self.state.send_modify(|s| {
            if let Some(review) = s.review_mut(review_id) {
                review.apply_votes(votes);
            }
        });
    }

    /// Reports a review to moderation. The list is not changed.
    pub async fn report_review(
        &self,
        review_id: &str,
        reason: &str,
        description: Option<&str>,
    ) -> ReviewResult<()> {
        self.api
            .report_review(review_id, reason, description)
            .await
            .map_err(|e| {
                warn!("Failed to report review {}: {}", review_id, e);
                e
            })?;
        info!("Reported review {} ({})", review_id, reason);
        Ok(())
    }
}

/// Appends `page`, skipping reviews already listed.
fn append_unique(list: &mut Vec<Review>, page: Vec<Review>) {
    for review in page {
        if !list.iter().any(|r| r.id == review.id) {
            list.push(review);
        }
    }
}
