use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::config::{DATA_CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL};
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .nest_service("/data", ServeDir::new(state.data_dir.as_path()))
        .fallback_service(
            ServeDir::new(state.static_dir.as_path())
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let app = Router::new()
        .route(
            "/data/topology.json",
            axum::routing::get(routes::api::topology),
        )
        .route(
            "/api/topology/report",
            axum::routing::get(routes::api::topology_report),
        )
        .route("/api/health", axum::routing::get(routes::api::health));

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_hashed_bundle_asset(path) {
        return Some(IMMUTABLE_CACHE_CONTROL);
    }

    if path.starts_with("/data/") {
        return Some(DATA_CACHE_CONTROL);
    }

    None
}

fn is_hashed_bundle_asset(path: &str) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }

    let Some(filename) = Path::new(path).file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    filename
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use bytes::Bytes;
    use tower::ServiceExt;

    use crate::state::TopologyArtifact;

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "arcs": [[[0, 0], [1, 0], [1, 1], [0, 0]]],
        "objects": {
            "political": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "arcs": [[0]], "properties": {"id": "R1", "cntr_code": "AA"}}
                ]
            }
        }
    }"#;

    fn test_state() -> AppState {
        let missing = PathBuf::from("/nonexistent/borderpaint-test");
        AppState::new(
            TopologyArtifact::from_bytes(Bytes::from_static(TOPOLOGY.as_bytes())),
            missing.clone(),
            missing,
        )
    }

    fn get(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    }

    #[test]
    fn immutable_cache_for_hashed_bundle_assets() {
        assert_eq!(
            cache_control_for_path("/borderpaint-client-71578f6b278221f3_bg.wasm"),
            Some(IMMUTABLE_CACHE_CONTROL)
        );
        assert_eq!(
            cache_control_for_path("/input-a93762ff3bf6d63a.css"),
            Some(IMMUTABLE_CACHE_CONTROL)
        );
    }

    #[test]
    fn short_cache_for_data_tables() {
        assert_eq!(
            cache_control_for_path("/data/locales.json"),
            Some(DATA_CACHE_CONTROL)
        );
        assert_eq!(
            cache_control_for_path("/data/hierarchy.json"),
            Some(DATA_CACHE_CONTROL)
        );
    }

    #[test]
    fn no_cache_header_override_for_html() {
        assert_eq!(cache_control_for_path("/"), None);
        assert_eq!(cache_control_for_path("/index.html"), None);
        assert_eq!(cache_control_for_path("/app.js"), None);
    }

    #[tokio::test]
    async fn topology_is_served_with_etag() {
        let response = build_app(test_state())
            .oneshot(get("/data/topology.json"))
            .await
            .expect("infallible");

        assert_eq!(response.status(), StatusCode::OK);
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .expect("etag header");
        assert!(etag.starts_with("\"topology-"));
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        assert_eq!(body.as_ref(), TOPOLOGY.as_bytes());
    }

    #[tokio::test]
    async fn matching_etag_yields_not_modified() {
        let state = test_state();
        let etag = state.topology.etag.clone();
        let request = Request::builder()
            .uri("/data/topology.json")
            .header(header::IF_NONE_MATCH, format!("W/{etag}"))
            .body(Body::empty())
            .expect("request builds");

        let response = build_app(state).oneshot(request).await.expect("infallible");

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn report_includes_inspection_and_load_time() {
        let response = build_app(test_state())
            .oneshot(get("/api/topology/report"))
            .await
            .expect("infallible");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["region_count"], 1);
        assert_eq!(value["arc_count"], 1);
        assert!(value["loaded_at"].is_string());
        assert!(value["problems"].as_array().is_some_and(Vec::is_empty));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = build_app(test_state())
            .oneshot(get("/api/health"))
            .await
            .expect("infallible");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["regions"], 1);
    }

    #[tokio::test]
    async fn missing_static_file_is_not_found() {
        let response = build_app(test_state())
            .oneshot(get("/data/locales.json"))
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
