//! Axum-based HTTP gateway for the product catalog.
//!
//! - Server-rendered pages at `/`, `/register`, `/login`, `/logout`, `/products`
//! - JSON API under `/api/auth/*` and `/api/products`
//! - One `SessionContext` per browser, found by the `storegate_sid` cookie
//! - Request body size limit (64KB) and request timeout (30s)

pub mod pages;

use crate::auth::{AuthError, Registration, SessionContext};
use crate::catalog::{parse_price, NewProduct};
use crate::config::Config;
use crate::gate::{Gate, Outcome};
use crate::store::Database;
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use pages::Notice;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "storegate_sid";

// ══════════════════════════════════════════════════════════════════════════════
// SESSIONS
// ══════════════════════════════════════════════════════════════════════════════

/// Per-browser session contexts keyed by cookie id.
///
/// Only authenticated contexts are kept. An id that is not in the map is an
/// unauthenticated session; a fresh id is issued on every successful login
/// so a pre-set cookie cannot be carried into an authenticated session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionContext>>,
}

/// The session for one request, checked out of the registry.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: String,
    pub context: SessionContext,
    /// The browser does not hold this id yet; the response must set it.
    pub issue_cookie: bool,
}

impl ClientSession {
    /// Replace the id after a privilege change.
    fn rotate(&mut self) {
        self.id = crate::auth::hashing::generate_token();
        self.issue_cookie = true;
    }

    fn cookie_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.id
        ))
        .ok()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkout(&self, headers: &HeaderMap) -> ClientSession {
        match session_id_from_headers(headers) {
            Some(id) => {
                let context = self.sessions.lock().get(&id).cloned().unwrap_or_default();
                ClientSession {
                    id,
                    context,
                    issue_cookie: false,
                }
            }
            None => ClientSession {
                id: crate::auth::hashing::generate_token(),
                context: SessionContext::new(),
                issue_cookie: true,
            },
        }
    }

    /// Write the context back; unauthenticated contexts are dropped.
    pub fn checkin(&self, client: &ClientSession) {
        let mut sessions = self.sessions.lock();
        if client.context.is_authenticated() {
            sessions.insert(client.id.clone(), client.context.clone());
        } else {
            sessions.remove(&client.id);
        }
    }

    /// Forget a session id (after rotation).
    fn forget(&self, id: &str) {
        self.sessions.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Attach the session cookie to a response when the browser needs it.
fn with_session(client: &ClientSession, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if client.issue_cookie {
        if let Some(cookie) = client.cookie_header() {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}

// ══════════════════════════════════════════════════════════════════════════════
// SERVER
// ══════════════════════════════════════════════════════════════════════════════

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(gate: Gate) -> Self {
        Self {
            gate: Arc::new(gate),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }
}

/// Build the router with middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(handle_health))
        .route("/", get(handle_index))
        .route("/register", get(handle_register_page))
        .route("/register", post(handle_register_submit))
        .route("/login", post(handle_login_submit))
        .route("/logout", post(handle_logout_submit))
        .route("/products", post(handle_product_submit))
        .route("/api/auth/register", post(handle_api_register))
        .route("/api/auth/login", post(handle_api_login))
        .route("/api/auth/logout", post(handle_api_logout))
        .route("/api/auth/me", get(handle_api_me))
        .route("/api/products", get(handle_api_products_list))
        .route("/api/products", post(handle_api_products_add))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP gateway until Ctrl+C.
pub async fn run_gateway(host: &str, port: u16, config: &Config) -> Result<()> {
    let db = Database::open(&config.store.path).with_context(|| {
        format!("Failed to open store at {}", config.store.path.display())
    })?;
    let state = AppState::new(Gate::new(db, config.auth.allow_registration));
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        address = %addr,
        db = %config.store.path.display(),
        "Gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::DuplicateEmail(_) => StatusCode::CONFLICT,
        AuthError::InvalidCredentials | AuthError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// PAGE HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// Form data for the login submission.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Form data for the add-product submission. Price arrives as text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub category: String,
    pub price: String,
}

/// Page shown for a store failure.
fn store_failure_page(err: &AuthError) -> Response {
    tracing::error!("Store failure: {err}");
    (status_for(err), Html(pages::render_error(&err.to_string()))).into_response()
}

/// Status code for a failed outcome; `200` when it succeeded.
fn outcome_status(outcome: &Outcome) -> StatusCode {
    outcome.cause.as_ref().map_or(StatusCode::OK, status_for)
}

/// Render `/` for the given session: dashboard or login page.
fn render_home(state: &AppState, client: &ClientSession, notice: Option<Notice<'_>>) -> Response {
    if !client.context.is_authenticated() {
        return Html(pages::render_login(notice)).into_response();
    }
    match state.gate.products(&client.context) {
        Ok(products) => Html(pages::render_dashboard(
            &client.context.status(),
            &products,
            notice,
        ))
        .into_response(),
        Err(e) => store_failure_page(&e),
    }
}

/// GET /health: always public
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /: dashboard when logged in, login form otherwise.
async fn handle_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let client = state.sessions.checkout(&headers);
    let response = render_home(&state, &client, None);
    with_session(&client, response)
}

/// GET /register
async fn handle_register_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let client = state.sessions.checkout(&headers);
    with_session(&client, Html(pages::render_register(None)))
}

/// POST /register: create an account, then show the login form.
async fn handle_register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<Registration>,
) -> Response {
    let client = state.sessions.checkout(&headers);
    let outcome = state.gate.register_outcome(&form);
    let response = match &outcome.cause {
        None => Html(pages::render_login(Some(Notice::Success(&outcome.message)))).into_response(),
        Some(e) if outcome.is_fatal() => store_failure_page(e),
        Some(_) => (
            outcome_status(&outcome),
            Html(pages::render_register(Some(Notice::Error(&outcome.message)))),
        )
            .into_response(),
    };
    with_session(&client, response)
}

/// POST /login: on success redirect to `/` so the page re-renders.
async fn handle_login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut client = state.sessions.checkout(&headers);
    let outcome = state
        .gate
        .login_outcome(&mut client.context, &form.email, &form.password);
    let response = match &outcome.cause {
        None => {
            state.sessions.forget(&client.id);
            client.rotate();
            state.sessions.checkin(&client);
            Redirect::to("/").into_response()
        }
        Some(e) if outcome.is_fatal() => store_failure_page(e),
        Some(_) => (
            outcome_status(&outcome),
            Html(pages::render_login(Some(Notice::Error(&outcome.message)))),
        )
            .into_response(),
    };
    with_session(&client, response)
}

/// POST /logout
async fn handle_logout_submit(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut client = state.sessions.checkout(&headers);
    state.gate.logout_outcome(&mut client.context);
    state.sessions.checkin(&client);
    with_session(&client, Redirect::to("/"))
}

/// POST /products: add a product and redraw the dashboard.
async fn handle_product_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Response {
    let client = state.sessions.checkout(&headers);
    let outcome: Outcome = if client.context.is_authenticated() {
        match parse_price(&form.price) {
            Ok(price) => state.gate.add_product_outcome(
                &client.context,
                &NewProduct {
                    name: form.name,
                    category: form.category,
                    price,
                },
            ),
            Err(e) => e.into(),
        }
    } else {
        AuthError::NotAuthenticated.into()
    };

    let response = match &outcome.cause {
        None => render_home(&state, &client, Some(Notice::Success(&outcome.message))),
        Some(e) if outcome.is_fatal() => store_failure_page(e),
        Some(_) => {
            let mut response = render_home(&state, &client, Some(Notice::Error(&outcome.message)));
            if response.status().is_success() {
                *response.status_mut() = outcome_status(&outcome);
            }
            response
        }
    };
    with_session(&client, response)
}

// ══════════════════════════════════════════════════════════════════════════════
// JSON API HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

fn api_error(err: &AuthError) -> (StatusCode, Json<serde_json::Value>) {
    if !err.is_recoverable() {
        tracing::error!("Store failure: {err}");
    }
    (
        status_for(err),
        Json(serde_json::json!({ "error": err.to_string(), "kind": err.kind() })),
    )
}

fn bad_request(rejection: &JsonRejection) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": format!("Invalid request: {rejection}") })),
    )
}

/// POST /api/auth/register
async fn handle_api_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Registration>, JsonRejection>,
) -> Response {
    let client = state.sessions.checkout(&headers);
    let response = match body {
        Err(rejection) => bad_request(&rejection).into_response(),
        Ok(Json(form)) => match state.gate.register(&form) {
            Ok(user) => (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "status": "registered",
                    "user": user,
                })),
            )
                .into_response(),
            Err(e) => api_error(&e).into_response(),
        },
    };
    with_session(&client, response)
}

/// POST /api/auth/login
async fn handle_api_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LoginForm>, JsonRejection>,
) -> Response {
    let mut client = state.sessions.checkout(&headers);
    let response = match body {
        Err(rejection) => bad_request(&rejection).into_response(),
        Ok(Json(form)) => match state.gate.login(&mut client.context, &form.email, &form.password) {
            Ok(user) => {
                state.sessions.forget(&client.id);
                client.rotate();
                state.sessions.checkin(&client);
                Json(serde_json::json!({
                    "status": "authenticated",
                    "refresh": true,
                    "user": user,
                }))
                .into_response()
            }
            Err(e) => api_error(&e).into_response(),
        },
    };
    with_session(&client, response)
}

/// POST /api/auth/logout: always succeeds.
async fn handle_api_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut client = state.sessions.checkout(&headers);
    let outcome = state.gate.logout_outcome(&mut client.context);
    state.sessions.checkin(&client);
    with_session(&client, Json(outcome))
}

/// GET /api/auth/me
async fn handle_api_me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let client = state.sessions.checkout(&headers);
    let status = state.gate.is_authenticated(&client.context);
    with_session(&client, Json(status))
}

/// GET /api/products
async fn handle_api_products_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let client = state.sessions.checkout(&headers);
    let response = match state.gate.products(&client.context) {
        Ok(products) => Json(serde_json::json!({ "products": products })).into_response(),
        Err(e) => api_error(&e).into_response(),
    };
    with_session(&client, response)
}

/// POST /api/products
async fn handle_api_products_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Response {
    let client = state.sessions.checkout(&headers);
    let response = match body {
        Err(rejection) => bad_request(&rejection).into_response(),
        Ok(Json(product)) => match state.gate.add_product(&client.context, &product) {
            Ok(added) => (StatusCode::CREATED, Json(added)).into_response(),
            Err(e) => api_error(&e).into_response(),
        },
    };
    with_session(&client, response)
}
