//! Integration Tests for the HTTP Review API client
//!
//! Runs the client against a stub backend served by axum on a random port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use storefront_core::bootstrap::ConnectivityProbe;
use storefront_core::error::ReviewError;
use storefront_core::reviews::{
    HttpReviewApi, NewReview, ReviewApi, ReviewFilters, ReviewUpdate, SortBy,
};

// == Stub Backend ==

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

fn review_json(id: &str, rating: u8) -> Value {
    json!({
        "id": id,
        "userId": "u1",
        "productId": "p1",
        "rating": rating,
        "title": "Crunchy apples",
        "images": [],
        "isVerifiedPurchase": true,
        "helpfulVotes": 2,
        "totalVotes": 3,
        "createdAt": "2024-06-01T12:00:00Z",
        "updatedAt": "2024-06-01T12:00:00Z",
        "user": {"id": "u1", "name": "Ada"}
    })
}

async fn product_reviews(
    State(rec): State<Recorded>,
    Path(product_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    rec.queries.lock().unwrap().push(query);
    rec.auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );

    if product_id == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if product_id == "garbled" {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }

    Json(json!({
        "success": true,
        "data": {
            "reviews": [review_json("r1", 5), review_json("r2", 4)],
            "stats": {
                "totalReviews": 2,
                "averageRating": 4.5,
                "ratingDistribution": {"4": 1, "5": 1},
                "verifiedPurchasePercentage": 100.0,
                "recommendationPercentage": 100.0
            },
            "hasMore": true
        }
    }))
    .into_response()
}

async fn create_review(
    State(rec): State<Recorded>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    rec.bodies.lock().unwrap().push(body.clone());
    if body["comment"] == "spam" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"success": false, "message": "Review rejected by moderation"})),
        );
    }
    let rating = body["rating"].as_u64().unwrap_or(0) as u8;
    (
        StatusCode::CREATED,
        Json(json!({"success": true, "data": review_json("r-new", rating)})),
    )
}

async fn edit_review(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    let rating = body["rating"].as_u64().unwrap_or(3) as u8;
    Json(json!({"success": true, "data": review_json(&id, rating)}))
}

async fn remove_review(Path(id): Path<String>) -> Json<Value> {
    if id == "someone-elses" {
        return Json(json!({"success": false, "message": "Not your review"}));
    }
    Json(json!({"success": true, "message": "Review deleted"}))
}

async fn vote(
    State(rec): State<Recorded>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.bodies.lock().unwrap().push(body);
    Json(json!({"success": true, "data": {"helpfulVotes": 7, "totalVotes": 9}}))
}

async fn unvote(Path(_id): Path<String>) -> Json<Value> {
    Json(json!({"success": true, "data": {"helpfulVotes": 6, "totalVotes": 8}}))
}

async fn report(
    State(rec): State<Recorded>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.bodies.lock().unwrap().push(body);
    Json(json!({"success": true}))
}

async fn spawn_backend() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/reviews", post(create_review))
        .route("/reviews/product/:product_id", get(product_reviews))
        .route("/reviews/:id", put(edit_review).delete(remove_review))
        .route("/reviews/:id/vote", post(vote).delete(unvote))
        .route("/reviews/:id/report", post(report))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

fn client(base_url: &str, api_key: Option<&str>) -> HttpReviewApi {
    HttpReviewApi::new(
        base_url,
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

// == Page Fetch ==

#[tokio::test]
async fn test_get_product_reviews_sends_query_and_parses_page() {
    let (url, recorded) = spawn_backend().await;
    let api = client(&url, Some("secret-token"));
    let filters = ReviewFilters {
        rating: Some(5),
        verified_only: Some(true),
        sort_by: SortBy::Helpful,
        ..ReviewFilters::default()
    };

    let page = api.get_product_reviews("p1", 2, 20, &filters).await.unwrap();

    assert_eq!(page.reviews.len(), 2);
    assert_eq!(page.reviews[0].id, "r1");
    assert!(page.has_more);
    assert_eq!(page.stats.total_reviews, 2);
    assert_eq!(page.stats.count_for(5), 1);

    let query = recorded.queries.lock().unwrap()[0].clone();
    assert_eq!(query.get("page").map(String::as_str), Some("2"));
    assert_eq!(query.get("limit").map(String::as_str), Some("20"));
    assert_eq!(query.get("rating").map(String::as_str), Some("5"));
    assert_eq!(query.get("verifiedOnly").map(String::as_str), Some("true"));
    assert_eq!(query.get("sortBy").map(String::as_str), Some("helpful"));
    assert!(!query.contains_key("withPhotos"));

    let auth = recorded.auth.lock().unwrap()[0].clone();
    assert_eq!(auth.as_deref(), Some("Bearer secret-token"));
}

#[tokio::test]
async fn test_non_envelope_error_status_is_request_error() {
    let (url, _) = spawn_backend().await;
    let api = client(&url, None);

    let result = api
        .get_product_reviews("broken", 1, 20, &ReviewFilters::default())
        .await;

    match result {
        Err(ReviewError::Request(msg)) => assert!(msg.contains("500"), "got {}", msg),
        other => panic!("expected request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_envelope_success_is_invalid_response() {
    let (url, _) = spawn_backend().await;
    let api = client(&url, None);

    let result = api
        .get_product_reviews("garbled", 1, 20, &ReviewFilters::default())
        .await;
    assert!(matches!(result, Err(ReviewError::InvalidResponse(_))));
}

// == Mutations ==

#[tokio::test]
async fn test_add_review_posts_camel_case_body() {
    let (url, recorded) = spawn_backend().await;
    let api = client(&url, None);
    let data = NewReview {
        product_id: "p1".to_string(),
        rating: 4,
        comment: Some("Very fresh".to_string()),
        is_recommended: Some(true),
        ..NewReview::default()
    };

    let review = api.add_review(&data).await.unwrap();

    assert_eq!(review.id, "r-new");
    assert_eq!(review.rating, 4);
    let body = recorded.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["productId"], "p1");
    assert_eq!(body["isRecommended"], true);
    assert!(body.get("orderId").is_none());
}

#[tokio::test]
async fn test_add_review_rejection_carries_backend_message() {
    let (url, _) = spawn_backend().await;
    let api = client(&url, None);
    let data = NewReview {
        product_id: "p1".to_string(),
        rating: 1,
        comment: Some("spam".to_string()),
        ..NewReview::default()
    };

    assert_eq!(
        api.add_review(&data).await,
        Err(ReviewError::Api {
            message: "Review rejected by moderation".to_string()
        })
    );
}

#[tokio::test]
async fn test_update_and_delete_review() {
    let (url, _) = spawn_backend().await;
    let api = client(&url, None);

    let update = ReviewUpdate {
        rating: Some(2),
        ..ReviewUpdate::default()
    };
    let review = api.update_review("r7", &update).await.unwrap();
    assert_eq!(review.id, "r7");
    assert_eq!(review.rating, 2);

    // Reserved characters in an id stay inside one path segment
    let review = api.update_review("r7/vote?x#y", &update).await.unwrap();
    assert_eq!(review.id, "r7/vote?x#y");

    assert!(api.delete_review("r7").await.is_ok());
    assert_eq!(
        api.delete_review("someone-elses").await,
        Err(ReviewError::Api {
            message: "Not your review".to_string()
        })
    );
}

#[tokio::test]
async fn test_votes_and_report() {
    let (url, recorded) = spawn_backend().await;
    let api = client(&url, None);

    let votes = api.vote_helpful("r1", false).await.unwrap();
    assert_eq!((votes.helpful_votes, votes.total_votes), (7, 9));

    let votes = api.remove_vote("r1").await.unwrap();
    assert_eq!((votes.helpful_votes, votes.total_votes), (6, 8));

    api.report_review("r1", "offensive", None).await.unwrap();

    let bodies = recorded.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0], json!({"isHelpful": false}));
    assert_eq!(bodies[1]["reason"], "offensive");
}

// == Connectivity ==

#[tokio::test]
async fn test_connectivity_probe() {
    let (url, _) = spawn_backend().await;
    assert!(client(&url, None).is_online().await);

    // Nothing listens on port 9 of the discard range here
    let offline = HttpReviewApi::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
    assert!(!offline.is_online().await);
}
