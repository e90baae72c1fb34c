//! HTTP client for the review backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{ReviewError, ReviewResult};
use crate::reviews::{
    ApiEnvelope, NewReview, Review, ReviewApi, ReviewFilters, ReviewPage, ReviewUpdate,
    VoteCounts,
};

/// Longest response body snippet kept in error messages.
const MAX_BODY_SNIPPET: usize = 200;

/// REST client for the review endpoints.
///
/// Every response body is expected to be an [`ApiEnvelope`], including error
/// responses. A body that is not an envelope becomes `Request` for non-2xx
/// statuses and `InvalidResponse` otherwise.
#[derive(Debug, Clone)]
pub struct HttpReviewApi {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpReviewApi {
    /// Creates a client for `base_url` with the given request timeout.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> ReviewResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ReviewError::Request(format!("invalid base URL {}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ReviewError::Request(format!("invalid base URL {}", base_url)));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parsed,
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> ReviewResult<Self> {
        Self::new(
            &config.api_base_url,
            config.api_key.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> ReviewResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ReviewError::Request(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ReviewResult<ApiEnvelope<T>> {
        let resp = self.authorize(request).send().await.map_err(|e| {
            error!("Review request failed: {}", e);
            ReviewError::from(e)
        })?;

        let status = resp.status();
        let body = resp.text().await?;

        serde_json::from_str::<ApiEnvelope<T>>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            if status.is_success() {
                error!("Failed to parse review response: {} | body: {}", e, snippet);
                ReviewError::InvalidResponse(e.to_string())
            } else {
                error!("Review request failed with status {}: {}", status, snippet);
                ReviewError::Request(format!("HTTP {}: {}", status.as_u16(), snippet))
            }
        })
    }

    /// Connectivity probe against `GET /health`.
    pub async fn health(&self) -> ReviewResult<()> {
        let resp = self.client.get(self.url(&["health"])?).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ReviewError::Request(format!(
                "health check returned {}",
                resp.status().as_u16()
            )))
        }
    }
}

#[async_trait]
impl ReviewApi for HttpReviewApi {
    async fn get_product_reviews(
        &self,
        product_id: &str,
        page: u32,
        limit: u32,
        filters: &ReviewFilters,
    ) -> ReviewResult<ReviewPage> {
        debug!("Fetching reviews for {} page {} (limit {})", product_id, page, limit);
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        query.extend(filters.query_pairs());

        let request = self
            .client
            .get(self.url(&["reviews", "product", product_id])?)
            .query(&query);
        self.send(request).await?.into_data("Failed to load reviews")
    }

    async fn add_review(&self, data: &NewReview) -> ReviewResult<Review> {
        let request = self.client.post(self.url(&["reviews"])?).json(data);
        self.send(request).await?.into_data("Failed to add review")
    }

    async fn update_review(&self, review_id: &str, data: &ReviewUpdate) -> ReviewResult<Review> {
        let request = self
            .client
            .put(self.url(&["reviews", review_id])?)
            .json(data);
        self.send(request).await?.into_data("Failed to update review")
    }

    async fn delete_review(&self, review_id: &str) -> ReviewResult<()> {
        let request = self.client.delete(self.url(&["reviews", review_id])?);
        self.send::<Value>(request)
            .await?
            .into_unit("Failed to delete review")
    }

    async fn vote_helpful(&self, review_id: &str, is_helpful: bool) -> ReviewResult<VoteCounts> {
        let request = self
            .client
            .post(self.url(&["reviews", review_id, "vote"])?)
            .json(&json!({ "isHelpful": is_helpful }));
        self.send(request).await?.into_data("Failed to vote")
    }

    async fn remove_vote(&self, review_id: &str) -> ReviewResult<VoteCounts> {
        let request = self.client.delete(self.url(&["reviews", review_id, "vote"])?);
        self.send(request).await?.into_data("Failed to remove vote")
    }

    async fn report_review(
        &self,
        review_id: &str,
        reason: &str,
        description: Option<&str>,
    ) -> ReviewResult<()> {
        let request = self
            .client
            .post(self.url(&["reviews", review_id, "report"])?)
            .json(&json!({ "reason": reason, "description": description }));
        self.send::<Value>(request)
            .await?
            .into_unit("Failed to report review")
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_SNIPPET) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
