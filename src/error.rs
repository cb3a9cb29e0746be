use thiserror::Error;

/// Error type for all breakend graph operations
///
/// Invariant violations indicate a logic error in the graph engine itself and are not
/// recoverable, clients are expected to abort on these. The io/encode/decode variants surface
/// graph file problems to the caller.
///
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("breakend graph invariant violation: {msg}")]
    InvariantViolation { msg: String },

    #[error("breakend graph file io failure")]
    Io(#[from] std::io::Error),

    #[error("breakend graph file encoding failure")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("breakend graph file decoding failure")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("unsupported breakend graph file format version {0}")]
    UnsupportedFormatVersion(u32),

    #[error("chromosome list mismatch between breakend graphs (source: '{graph_source}')")]
    HeaderMismatch { graph_source: String },

    #[error("failed to merge cluster {cluster_index} from graph source '{graph_source}'")]
    MergeFailure {
        graph_source: String,
        cluster_index: usize,
        #[source]
        inner: Box<GraphError>,
    },
}

impl GraphError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation { msg: msg.into() }
    }
}
