use std::path::PathBuf;
use std::sync::Arc;

use borderpaint_engine::LayerNames;
use borderpaint_engine::Topology;
use borderpaint_engine::diagnostics::{TopologyReport, inspect};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// The topology artifact as read from disk, kept verbatim for serving.
#[derive(Debug)]
pub struct TopologyArtifact {
    pub json: Bytes,
    pub etag: String,
    pub report: TopologyReport,
    pub loaded_at: DateTime<Utc>,
}

impl TopologyArtifact {
    /// Hash, parse and inspect raw artifact bytes. A document that fails to
    /// parse is still served; the failure lands in the report's problems.
    pub fn from_bytes(json: Bytes) -> Self {
        let etag = topology_etag(&json);
        let report = match std::str::from_utf8(&json)
            .map_err(|e| e.to_string())
            .and_then(|text| Topology::from_json(text).map_err(|e| e.to_string()))
        {
            Ok(topology) => inspect(&topology, &LayerNames::default()),
            Err(e) => {
                warn!(error = %e, "topology artifact does not parse");
                TopologyReport {
                    problems: vec![format!("parse failure: {e}")],
                    ..TopologyReport::default()
                }
            }
        };
        info!(
            bytes = json.len(),
            regions = report.region_count,
            arcs = report.arc_count,
            clean = report.is_clean(),
            "topology loaded"
        );
        for artifact in &report.giant_artifacts {
            warn!(
                id = artifact.id.as_deref().unwrap_or("<no id>"),
                ratio = artifact.area_ratio,
                "region bbox covers most of the map"
            );
        }
        Self {
            json,
            etag,
            report,
            loaded_at: Utc::now(),
        }
    }
}

fn topology_etag(json: &[u8]) -> String {
    format!("\"topology-{:08x}-{}\"", crc32fast::hash(json), json.len())
}

#[derive(Clone)]
pub struct AppState {
    pub topology: Arc<TopologyArtifact>,
    pub data_dir: Arc<PathBuf>,
    pub static_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(topology: TopologyArtifact, data_dir: PathBuf, static_dir: PathBuf) -> Self {
        Self {
            topology: Arc::new(topology),
            data_dir: Arc::new(data_dir),
            static_dir: Arc::new(static_dir),
        }
    }
}
