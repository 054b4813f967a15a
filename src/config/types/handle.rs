//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads; request handlers call `cfg()` instead
//! of threading the config through every layer.

use crate::config::TallyConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<TallyConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(TallyConfig::default()));

#[inline]
pub fn cfg() -> Arc<TallyConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: TallyConfig) -> Arc<TallyConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
