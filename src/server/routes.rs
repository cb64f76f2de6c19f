use super::error::ApiError;
use crate::progress::EventBusError;
use crate::service::{
    AnalysisService, CloneRequest, CloneResponse, ResultsResponse, ServiceError, StatusResponse,
};
use crate::session::SessionStatus;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type AppState = Arc<AnalysisService>;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisAccepted {
    pub session_id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub session_id: Option<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

pub async fn clone_repository(
    State(service): State<AppState>,
    payload: Result<Json<CloneRequest>, JsonRejection>,
) -> Result<Json<CloneResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ServiceError::InvalidUrl(rejection.body_text()))?;
    Ok(Json(service.clone_repository(request).await?))
}

pub async fn start_analysis(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<AnalysisAccepted>), ApiError> {
    service.start_analysis(&session_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisAccepted {
            session_id,
            status: SessionStatus::Analyzing,
        }),
    ))
}

pub async fn list_sessions(State(service): State<AppState>) -> Json<Vec<StatusResponse>> {
    Json(service.list().await)
}

pub async fn session_status(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(service.status(&session_id).await?))
}

pub async fn session_results(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResultsResponse>, ApiError> {
    Ok(Json(service.results(&session_id).await?))
}

pub async fn session_file(
    State(service): State<AppState>,
    Path((session_id, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let artifact = service.artifact(&session_id, &name).await?;
    Ok((
        [(header::CONTENT_TYPE, artifact.content_type)],
        artifact.content,
    )
        .into_response())
}

pub async fn delete_session(
    State(service): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.cleanup(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Relays progress updates as server-sent events, optionally for one session
pub async fn events(
    State(service): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = service.subscribe(query.session_id.as_deref());

    let stream = stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            Ok(update) => {
                let event = Event::default().event("progress").json_data(&update);
                Some((event, receiver))
            }
            Err(EventBusError::Lagged(skipped)) => {
                let event = Event::default().event("lagged").data(skipped.to_string());
                Some((Ok(event), receiver))
            }
            Err(EventBusError::Closed) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
