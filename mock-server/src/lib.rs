use std::{collections::BTreeMap, collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub server: String,
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Hit counters for `/flaky`, keyed by the caller-chosen key.
pub type Hits = Arc<RwLock<HashMap<String, u32>>>;

#[derive(Clone)]
pub struct AppState {
    name: Arc<str>,
    hits: Hits,
}

pub fn app() -> Router {
    app_named("mock")
}

/// A router whose `/echo` and `/whoami` answers carry `name`, so tests can
/// tell several instances apart.
pub fn app_named(name: &str) -> Router {
    let state = AppState {
        name: Arc::from(name),
        hits: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/whoami", get(whoami))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/redirect/{hops}", get(redirect))
        .route("/status/{code}", any(status))
        .route("/flaky/{key}/{fails}", any(flaky))
        .route("/slow/{millis}", get(slow))
        .route("/cookies", get(cookies))
        .route("/cookies/set/{name}/{value}", get(set_cookie))
        .route("/latin1", get(latin1))
        .route("/lines/{count}", get(lines))
        .route("/bytes/{count}", get(bytes))
        .with_state(state)
}

pub async fn run_named(listener: TcpListener, name: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_named(name)).await
}

async fn whoami(State(state): State<AppState>) -> String {
    state.name.to_string()
}

async fn echo(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    Json(Echo {
        server: state.name.to_string(),
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn redirect(Path(hops): Path<u32>) -> axum::response::Response {
    if hops == 0 {
        return "arrived".into_response();
    }
    Redirect::to(&format!("/redirect/{}", hops - 1)).into_response()
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Fails with 503 for the first `fails` hits on `key`, then answers 200
/// with the total hit count.
async fn flaky(
    State(state): State<AppState>,
    Path((key, fails)): Path<(String, u32)>,
) -> (StatusCode, String) {
    let mut hits = state.hits.write().await;
    let count = hits.entry(key).or_insert(0);
    *count += 1;
    if *count <= fails {
        (StatusCode::SERVICE_UNAVAILABLE, format!("hit {count}"))
    } else {
        (StatusCode::OK, format!("hit {count}"))
    }
}

async fn slow(Path(millis): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "finally"
}

async fn cookies(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let jar = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect();
    Json(jar)
}

async fn set_cookie(Path((name, value)): Path<(String, String)>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, format!("{name}={value}; Path=/; HttpOnly"))],
        "set",
    )
}

async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        vec![b'c', b'a', b'f', 0xE9],
    )
}

async fn lines(Path(count): Path<usize>) -> String {
    (1..=count).map(|n| format!("line {n}\n")).collect()
}

/// `count` bytes of `x`.
async fn bytes(Path(count): Path<usize>) -> Vec<u8> {
    vec![b'x'; count]
}
