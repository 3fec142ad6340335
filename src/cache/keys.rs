//! Cache key scheme.

use crate::domain::reactions::Target;

pub const STATS_KEY_PREFIX: &str = "reactions:stats";

/// Key of the aggregate snapshot of one target. Readers and writers share this function.
pub fn stats_key(target: Target) -> String {
    format!("{STATS_KEY_PREFIX}:{}:{}", target.kind, target.id)
}
