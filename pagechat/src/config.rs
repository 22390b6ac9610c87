//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the engine pipeline.
///
/// All fields have workable defaults; construct with struct-update syntax
/// when only a few need to change:
///
/// ```
/// use pagechat::config::EngineConfig;
///
/// let config = EngineConfig {
///     top_k: 8,
///     ..EngineConfig::default()
/// };
/// assert_eq!(config.max_chunk_len, 500);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum chunk length in bytes of source text.
    pub max_chunk_len: usize,
    /// Trailing bytes of one chunk repeated at the start of the next, so
    /// retrieval does not lose context that straddles a boundary.
    pub chunk_overlap: usize,
    /// Minimum extracted-text length for a page to count as readable.
    pub min_page_len: usize,
    /// Number of chunks retrieved as grounding context per query.
    pub top_k: usize,
    /// Maximum conversation turns kept per session; older turns are dropped
    /// oldest-first.
    pub history_cap: usize,
    /// Maximum number of live sessions before the least-recently-used idle
    /// session is evicted.
    pub max_sessions: usize,
    /// Maximum texts per embedding-provider call.
    pub embed_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: 500,
            chunk_overlap: 50,
            min_page_len: 80,
            top_k: 4,
            history_cap: 20,
            max_sessions: 32,
            embed_batch_size: 64,
        }
    }
}
