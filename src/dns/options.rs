use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsOptions {
    /// Étage outil système (`dig +short`).
    #[serde(default = "default_true")]
    pub use_tool: bool,
    #[serde(default = "default_tool_program")]
    pub tool_program: String,
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,
    /// Étage résolveur embarqué (trust-dns).
    #[serde(default = "default_true")]
    pub use_library: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

const fn default_true() -> bool {
    true
}

fn default_tool_program() -> String {
    "dig".to_string()
}

const fn default_tool_timeout_ms() -> u64 {
    1200
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            use_tool: true,
            tool_program: default_tool_program(),
            tool_timeout_ms: default_tool_timeout_ms(),
            use_library: true,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl DnsOptions {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
