use thiserror::Error;

/// Failures while reading the topology artifact or one of the optional tables.
///
/// None of these escape `MapEngine::load`; they are logged and kept on the
/// engine so the caller can surface them.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("mandatory layer `{0}` is missing from the topology")]
    MissingLayer(String),

    #[error("feature #{index} in layer `{layer}` has no id")]
    MissingId { layer: String, index: usize },

    #[error("layer `{layer}` contains unsupported geometry: {detail}")]
    UnsupportedGeometry { layer: String, detail: String },

    #[error("arc reference {index} is out of range ({arc_count} arcs)")]
    ArcOutOfRange { index: i64, arc_count: usize },
}
