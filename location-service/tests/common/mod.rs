//! Shared setup for location-service router tests.
//!
//! Builds the full router over the in-memory store and cache.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use location_service::{
    config::LocationConfig,
    services::{InMemoryCache, InMemoryLocationStore},
    startup::{build_router, AppState},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;

/// TCP peer attached to requests that do not name one.
pub const DEFAULT_PEER: &str = "10.0.0.1";

/// Adds the connection address the server would attach for `peer`.
pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr = SocketAddr::new(peer.parse().expect("peer is an IP"), 40000);
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryLocationStore>,
    pub cache: Arc<InMemoryCache>,
    pub config: LocationConfig,
}

impl TestApp {
    /// Router with rate limits high enough to stay out of the way.
    pub fn new() -> Self {
        let mut config = LocationConfig::default();
        config.rate_limit.global_limit = 10_000;
        config.rate_limit.ip_limit = 10_000;
        Self::with_config(config)
    }

    pub fn with_config(config: LocationConfig) -> Self {
        let store = Arc::new(InMemoryLocationStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let state = AppState::new(&config, store.clone(), cache.clone());

        Self {
            router: build_router(state),
            store,
            cache,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.get_via(uri, DEFAULT_PEER, None).await
    }

    /// GET from a given TCP peer, optionally carrying `X-Forwarded-For`.
    pub async fn get_via(
        &self,
        uri: &str,
        peer: &str,
        forwarded: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        self.send(from_peer(builder.body(Body::empty()).unwrap(), peer))
            .await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.raw(method, uri, body.to_string()).await
    }

    pub async fn raw(&self, method: &str, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .unwrap();
        self.send(from_peer(request, DEFAULT_PEER)).await
    }

    /// Creates a location through the API and returns its id.
    pub async fn create(&self, name: &str, latitude: f64, longitude: f64, color: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/location",
                serde_json::json!({
                    "name": name,
                    "latitude": latitude,
                    "longitude": longitude,
                    "marker_color": color,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body["id"].as_str().expect("id in response").to_string()
    }
}
