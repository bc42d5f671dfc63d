//! Resource limits for container launches

use serde::{Deserialize, Serialize};

/// Default memory cap
pub const DEFAULT_MEMORY_LIMIT: &str = "2g";
/// Default CPU cap
pub const DEFAULT_CPU_LIMIT: &str = "2";
/// Default process-count cap
pub const DEFAULT_PIDS_LIMIT: &str = "100";

/// Resource limits applied to every container launch
///
/// Values are kept as strings in the form `docker run` accepts them
/// (`512m`, `1.5`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Memory cap (`--memory`)
    pub memory: String,
    /// CPU cap (`--cpus`)
    pub cpus: String,
    /// Maximum number of processes (`--pids-limit`)
    pub pids_limit: String,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory: DEFAULT_MEMORY_LIMIT.to_string(),  // 2 GiB
            cpus: DEFAULT_CPU_LIMIT.to_string(),       // 2 cores
            pids_limit: DEFAULT_PIDS_LIMIT.to_string(), // 100 processes
        }
    }
}

impl ResourceLimits {
    /// Render as `docker run` flag/value tokens.
    pub fn to_flags(&self) -> Vec<String> {
        vec![
            "--memory".to_string(),
            self.memory.clone(),
            "--cpus".to_string(),
            self.cpus.clone(),
            "--pids-limit".to_string(),
            self.pids_limit.clone(),
        ]
    }
}
