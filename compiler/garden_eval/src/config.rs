//! Engine configuration.

/// Tunables for an [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Passes an unreachable node's cache entry survives before eviction.
    pub retention_passes: u64,
    /// Most names listed in a cyclic dependency error.
    pub max_cycle_report: usize,
    /// Drop nodes that are neither reachable nor pinned by a live entry
    /// after each pass.
    pub collect_nodes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            retention_passes: 2,
            max_cycle_report: 16,
            collect_nodes: true,
        }
    }
}
