use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use borderpaint_engine::diagnostics::TopologyReport;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TOPOLOGY_CACHE_CONTROL;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let topology = &state.topology;
    Json(serde_json::json!({
        "status": "ok",
        "topology_bytes": topology.json.len(),
        "regions": topology.report.region_count,
        "clean": topology.report.is_clean(),
    }))
}

#[derive(Serialize)]
struct ReportBody<'a> {
    loaded_at: DateTime<Utc>,
    etag: &'a str,
    bytes: usize,
    #[serde(flatten)]
    report: &'a TopologyReport,
}

pub async fn topology_report(State(state): State<AppState>) -> Response {
    let topology = &state.topology;
    let body = ReportBody {
        loaded_at: topology.loaded_at,
        etag: &topology.etag,
        bytes: topology.json.len(),
        report: &topology.report,
    };
    match serde_json::to_vec(&body) {
        Ok(json) => json_bytes_response(Bytes::from(json), "no-cache", None),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize topology report");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve the artifact straight from memory; clients revalidate with `If-None-Match`.
pub async fn topology(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let topology = &state.topology;
    if if_none_match_matches(&headers, &topology.etag) {
        return not_modified_response(TOPOLOGY_CACHE_CONTROL, Some(&topology.etag));
    }
    json_bytes_response(
        topology.json.clone(),
        TOPOLOGY_CACHE_CONTROL,
        Some(&topology.etag),
    )
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
