use serde::{Deserialize, Serialize};

/// Rewrite behaviour toggles, fixed at startup and threaded into the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewriteConfig {
    pub music: bool,
    pub books: bool,
    pub audiobooks: bool,
    pub best_effort: bool,
    pub debug_attrs: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            music: true,
            books: true,
            audiobooks: true,
            best_effort: true,
            debug_attrs: false,
        }
    }
}
