#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tower::ServiceExt;

use countryfx_server::{app_router, build_state, ServerConfig};

/// One canned upstream answer.
#[derive(Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Canned {
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: value.to_string(),
            delay: None,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: json!({ "message": "upstream failure" }).to_string(),
            delay: None,
        }
    }

    pub fn raw(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: None,
        }
    }
}

#[derive(Clone)]
struct Upstream {
    countries: Arc<RwLock<Canned>>,
    rates: Arc<RwLock<Canned>>,
}

async fn answer(canned: Canned) -> Response {
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
        .into_response()
}

/// Country and rate providers served from a local port.
pub struct StubSources {
    pub addr: SocketAddr,
    countries: Arc<RwLock<Canned>>,
    rates: Arc<RwLock<Canned>>,
}

impl StubSources {
    pub async fn start() -> Self {
        let upstream = Upstream {
            countries: Arc::new(RwLock::new(Canned::json(default_countries()))),
            rates: Arc::new(RwLock::new(Canned::json(default_rates()))),
        };

        let router = Router::new()
            .route(
                "/v2/all",
                get(|State(u): State<Upstream>| async move {
                    let canned = u.countries.read().clone();
                    answer(canned).await
                }),
            )
            .route(
                "/v6/latest/USD",
                get(|State(u): State<Upstream>| async move {
                    let canned = u.rates.read().clone();
                    answer(canned).await
                }),
            )
            .with_state(upstream.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            countries: upstream.countries,
            rates: upstream.rates,
        }
    }

    pub fn countries_url(&self) -> String {
        format!("http://{}/v2/all", self.addr)
    }

    pub fn rates_url(&self) -> String {
        format!("http://{}/v6/latest/USD", self.addr)
    }

    pub fn set_countries(&self, canned: Canned) {
        *self.countries.write() = canned;
    }

    pub fn set_rates(&self, canned: Canned) {
        *self.rates.write() = canned;
    }
}

pub fn default_countries() -> Value {
    json!([
        {
            "name": "Testland",
            "capital": "Test City",
            "region": "Testregion",
            "population": 1000,
            "flag": "https://flags.example/tst.svg",
            "currencies": [{ "code": "TST", "name": "Test dollar", "symbol": "T$" }]
        },
        {
            "name": "Nocashia",
            "region": "Testregion",
            "population": 50,
            "flag": "https://flags.example/noc.svg"
        },
        {
            "name": "Oddland",
            "capital": "Odd",
            "region": "Elsewhere",
            "population": 200,
            "flag": "https://flags.example/odd.svg",
            "currencies": [{ "code": "ODD" }, { "code": "TST" }]
        }
    ])
}

pub fn default_rates() -> Value {
    json!({
        "result": "success",
        "base_code": "USD",
        "rates": { "USD": 1, "TST": 10 }
    })
}

/// Configuration pointing at the stubs, with a short fetch timeout.
pub fn config(stubs: &StubSources, cache_dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.sources.countries_url = stubs.countries_url();
    config.sources.rates_url = stubs.rates_url();
    config.sources.request_timeout = Duration::from_secs(1);
    config.storage.cache_dir = cache_dir.to_path_buf();
    config.gdp_factor_seed = Some(7);
    config
}

pub async fn app(config: &ServerConfig) -> Router {
    let state = build_state(config).await.unwrap();
    app_router(state)
}

pub async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec(), content_type)
}

pub async fn send_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, method, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
