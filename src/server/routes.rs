//! HTTP routes for the registry session

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nine_s_core::namespace::Namespace;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::errors::{ErrorKind, SessionError};
use crate::ledger::Connector;
use crate::namespaces::RegistryNamespace;
use crate::session::SessionManager;
use crate::wallet::Wallet;

pub struct AppState<W, C: Connector> {
    pub session: Arc<SessionManager<W, C>>,
    pub namespace: Arc<RegistryNamespace>,
    pub app_name: String,
}

impl<W, C: Connector> Clone for AppState<W, C> {
    fn clone(&self) -> Self {
        Self { session: self.session.clone(), namespace: self.namespace.clone(), app_name: self.app_name.clone() }
    }
}

impl<W: Wallet, C: Connector> AppState<W, C> {
    pub fn new(session: Arc<SessionManager<W, C>>, app_name: impl Into<String>) -> Self {
        let namespace = Arc::new(RegistryNamespace::new(session.subscribe()));
        Self { session, namespace, app_name: app_name.into() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    owner_name: String,
    car_model: String,
}

#[derive(Serialize)]
pub struct ListResponse { paths: Vec<String>, count: usize }

/// Session errors as JSON with a status code per kind.
pub struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self { Self(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::UserRejected => StatusCode::FORBIDDEN,
            ErrorKind::WalletUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::NotConnected
            | ErrorKind::NetworkMismatch
            | ErrorKind::Superseded
            | ErrorKind::ReloadRequired => StatusCode::CONFLICT,
            ErrorKind::NetworkRegistrationFailed
            | ErrorKind::ConnectionFailed
            | ErrorKind::TransactionReverted
            | ErrorKind::SubmissionFailed
            | ErrorKind::ReadFailed => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({"error": self.0.kind(), "message": self.0.to_string()}))).into_response()
    }
}

pub fn create_router<W, C>(session: Arc<SessionManager<W, C>>) -> Router
where
    W: Wallet + 'static,
    C: Connector + 'static,
{
    create_router_with_name(session, "vehreg")
}

pub fn create_router_with_name<W, C>(session: Arc<SessionManager<W, C>>, app_name: &str) -> Router
where
    W: Wallet + 'static,
    C: Connector + 'static,
{
    Router::new()
        .route("/health", get(health::<W, C>))
        .route("/state", get(state::<W, C>))
        .route("/connect", post(connect::<W, C>))
        .route("/entries", get(entries::<W, C>).post(submit::<W, C>))
        .route("/refresh", post(refresh::<W, C>))
        .route("/scrolls", get(list_scrolls::<W, C>))
        .route("/scroll/*path", get(read_scroll::<W, C>))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(session, app_name))
}

async fn health<W: Wallet, C: Connector>(State(s): State<AppState<W, C>>) -> impl IntoResponse {
    Json(json!({"status": "ok", "service": s.app_name, "wallet": s.session.has_wallet()}))
}

async fn state<W: Wallet, C: Connector>(State(s): State<AppState<W, C>>) -> impl IntoResponse {
    Json(s.session.snapshot())
}

async fn entries<W: Wallet, C: Connector>(State(s): State<AppState<W, C>>) -> impl IntoResponse {
    Json(s.session.snapshot().entries)
}

async fn connect<W: Wallet, C: Connector>(State(s): State<AppState<W, C>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(s.session.establish_binding().await?))
}

async fn submit<W: Wallet, C: Connector>(
    State(s): State<AppState<W, C>>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = s.session.submit_entry(&req.owner_name, &req.car_model).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn refresh<W: Wallet, C: Connector>(State(s): State<AppState<W, C>>) -> Result<impl IntoResponse, ApiError> {
    let count = s.session.refresh().await?;
    Ok(Json(json!({"count": count})))
}

async fn list_scrolls<W: Wallet, C: Connector>(
    State(s): State<AppState<W, C>>,
) -> Result<Json<ListResponse>, (StatusCode, String)> {
    let paths = s.namespace.list("/").map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(ListResponse { count: paths.len(), paths }))
}

async fn read_scroll<W: Wallet, C: Connector>(
    State(s): State<AppState<W, C>>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = format!("/{}", path.trim_start_matches('/'));
    match s.namespace.read(&path) {
        Ok(Some(scroll)) => Ok(Json(scroll)),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("Not found: {}", path))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
