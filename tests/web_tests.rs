//! Integration tests for the HTTP matching service
//!
//! These tests drive the router directly with `oneshot`, without binding a socket.
//! Rate limiting is disabled because it needs the peer address.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use nub_matcher::catalog::handle::{IndexHandle, IndexReloader};
use nub_matcher::catalog::snapshot::SnapshotFile;
use nub_matcher::core::classification::{Classification, HigherRank};
use nub_matcher::core::types::{Rank, TaxonomicStatus, UsageKey};
use nub_matcher::web::server::{create_router, AppState};
use nub_matcher::{CandidateIndex, CandidateUsage};

fn usages() -> Vec<CandidateUsage> {
    vec![
        CandidateUsage::new(UsageKey(1), "Abies alba", Rank::Species, TaxonomicStatus::Accepted)
            .with_authorship("Mill."),
        CandidateUsage::new(UsageKey(10), "Oenanthe", Rank::Genus, TaxonomicStatus::Accepted)
            .with_authorship("L.")
            .with_classification(Classification::new().with(HigherRank::Kingdom, "Plantae")),
        CandidateUsage::new(UsageKey(11), "Oenanthe", Rank::Genus, TaxonomicStatus::Accepted)
            .with_authorship("Vieillot")
            .with_classification(Classification::new().with(HigherRank::Kingdom, "Animalia")),
    ]
}

fn test_app() -> Router {
    let handle = IndexHandle::from_index(CandidateIndex::build(usages()).unwrap());
    create_router(AppState::new(handle), false)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(test_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["index_loaded"], true);
}

#[tokio::test]
async fn test_match_exact() {
    let (status, body) = get_json(test_app(), "/api/match?name=Abies%20alba%20Mill.").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["outcome"], "match");
    assert_eq!(body["outcome"]["detail"]["usage"]["key"], 1);
    assert_eq!(body["match_type"], "exact");
}

#[tokio::test]
async fn test_match_single_case_name() {
    for name in ["ABIES%20ALBA", "abies%20alba"] {
        let (status, body) = get_json(test_app(), &format!("/api/match?name={name}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["detail"]["usage"]["key"], 1);
        assert_eq!(body["notes"][0]["type"], "single_case");
    }
}

#[tokio::test]
async fn test_match_higher_rank() {
    let (_, body) = get_json(test_app(), "/api/match?name=Xus%20yus&kingdom=Animalia").await;
    assert_eq!(body["outcome"]["outcome"], "no_match");

    let (_, body) = get_json(test_app(), "/api/match?name=Xus&genus=Oenanthe&kingdom=Animalia").await;
    assert_eq!(body["match_type"], "higher");
    assert_eq!(body["outcome"]["detail"]["usage"]["key"], 11);
}

#[tokio::test]
async fn test_match_homonyms() {
    let (_, body) = get_json(test_app(), "/api/match?name=Oenanthe").await;
    assert_eq!(body["outcome"]["outcome"], "ambiguous");
    assert_eq!(body["outcome"]["detail"].as_array().unwrap().len(), 2);

    let (_, body) = get_json(test_app(), "/api/match?name=Oenanthe&kingdom=Animalia").await;
    assert_eq!(body["outcome"]["outcome"], "match");
    assert_eq!(body["outcome"]["detail"]["usage"]["key"], 11);
}

#[tokio::test]
async fn test_match_rejects_bad_input() {
    let (status, body) = get_json(test_app(), "/api/match?name=Abies&rank=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_rank");

    let long = "a".repeat(2000);
    let (status, body) = get_json(test_app(), &format!("/api/match?name=A{long}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_query");
}

#[tokio::test]
async fn test_match_without_index() {
    let app = create_router(AppState::new(IndexHandle::new()), false);
    let (status, body) = get_json(app, "/api/match?name=Abies").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "index_unavailable");
}

#[tokio::test]
async fn test_usage_and_index() {
    let (status, body) = get_json(test_app(), "/api/usage/10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canonical_name"], "Oenanthe");

    let (status, _) = get_json(test_app(), "/api/usage/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get_json(test_app(), "/api/index").await;
    assert_eq!(body["usages"], 3);
    assert_eq!(body["names"], 2);
    assert_eq!(body["homonyms"], 1);
}

#[tokio::test]
async fn test_similarity() {
    let (status, body) = get_json(test_app(), "/api/similarity?a=Abies%20alba&b=Abies%20alta").await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["similarity"].as_f64().unwrap() - 95.0).abs() < 0.001);

    let (_, body) = get_json(test_app(), "/api/similarity?a=abc&b=abc&metric=jaro-winkler").await;
    assert!((body["similarity"].as_f64().unwrap() - 100.0).abs() < 0.001);
}

#[tokio::test]
async fn test_nosniff_header() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_reload_swaps_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backbone.json");
    std::fs::write(&path, CandidateIndex::build(usages()).unwrap().to_json().unwrap()).unwrap();

    let snapshot = SnapshotFile::new(&path).unwrap();
    let handle = IndexHandle::from_index(snapshot.load_index().unwrap());
    let mut state = AppState::new(handle.clone());
    state.reloader = Some(Arc::new(IndexReloader::new(handle.clone(), snapshot)));
    let app = create_router(state, false);

    let mut more = usages();
    more.push(CandidateUsage::new(
        UsageKey(20),
        "Pinus nigra",
        Rank::Species,
        TaxonomicStatus::Accepted,
    ));
    std::fs::write(&path, CandidateIndex::build(more).unwrap().to_json().unwrap()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(handle.current().unwrap().len(), 4);
}

#[tokio::test]
async fn test_reload_without_source() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}
