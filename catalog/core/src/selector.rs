//! Pool Selection
//!
//! Weighted random placement over a snapshot of the pool registry:
//!
//! 1. Restrict the snapshot to the [`PlacementTarget`]
//! 2. Drop pools with weight 0 and, with capacity accounting on, pools whose
//!    recorded usage has reached `max_capacity`
//! 3. Draw one pool with probability `weight / total weight`
//!
//! The selector holds no state besides its configuration. Randomness is passed
//! in so callers can seed it.

use std::fmt;

use dashmap::DashMap;
use rand::Rng;

use crate::config::SelectionConfig;
use crate::pools::Pool;

// ============================================================================
// Placement Targets
// ============================================================================

/// Which pools a placement may draw from
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlacementTarget {
    /// Every registered pool
    Any,
    /// Pools carrying this group
    Group(String),
    /// Exactly this pool
    Pool(String),
}

impl PlacementTarget {
    /// Whether `pool` belongs to this target
    #[must_use]
    pub fn admits(&self, pool: &Pool) -> bool {
        match self {
            Self::Any => true,
            Self::Group(group) => pool.in_group(group),
            Self::Pool(id) => pool.id == *id,
        }
    }
}

impl fmt::Display for PlacementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any pool"),
            Self::Group(group) => write!(f, "pool group {group}"),
            Self::Pool(id) => write!(f, "pool {id}"),
        }
    }
}

// ============================================================================
// Usage Accounting
// ============================================================================

/// Source of recorded per-pool usage (queues placed)
pub trait UsageSource: Send + Sync {
    /// Recorded usage for `pool_id`; unknown pools report 0
    fn usage(&self, pool_id: &str) -> u64;
}

/// Concurrent per-pool usage counters
///
/// Fed by operators or a stats collector; the selector only reads it.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: DashMap<String, u64>,
}

impl UsageTracker {
    /// Create a tracker with no recorded usage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the usage of a pool
    pub fn set(&self, pool_id: &str, value: u64) {
        self.usage.insert(pool_id.to_string(), value);
    }

    /// Add to the usage of a pool
    pub fn add(&self, pool_id: &str, delta: u64) {
        let mut entry = self.usage.entry(pool_id.to_string()).or_insert(0);
        *entry = entry.saturating_add(delta);
    }

    /// Subtract from the usage of a pool, stopping at zero
    pub fn sub(&self, pool_id: &str, delta: u64) {
        if let Some(mut entry) = self.usage.get_mut(pool_id) {
            *entry = entry.saturating_sub(delta);
        }
    }

    /// Forget a pool
    pub fn clear(&self, pool_id: &str) {
        self.usage.remove(pool_id);
    }
}

impl UsageSource for UsageTracker {
    fn usage(&self, pool_id: &str) -> u64 {
        self.usage.get(pool_id).map_or(0, |v| *v)
    }
}

// ============================================================================
// Selector
// ============================================================================

/// Weighted random pool picker
#[derive(Clone, Debug, Default)]
pub struct PoolSelector {
    capacity_accounting: bool,
}

impl PoolSelector {
    /// Create a selector from the selection config
    #[must_use]
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            capacity_accounting: config.capacity_accounting,
        }
    }

    /// Pools in `target` eligible for a new placement
    pub fn candidates<'a>(
        &self,
        target: &PlacementTarget,
        pools: &'a [Pool],
        usage: &dyn UsageSource,
    ) -> Vec<&'a Pool> {
        pools
            .iter()
            .filter(|pool| target.admits(pool) && pool.is_placeable())
            .filter(|pool| !self.capacity_accounting || pool.has_room_for(usage.usage(&pool.id)))
            .collect()
    }

    /// Draw one pool, or `None` when no pool is eligible
    pub fn select<'a, R>(
        &self,
        target: &PlacementTarget,
        pools: &'a [Pool],
        usage: &dyn UsageSource,
        rng: &mut R,
    ) -> Option<&'a Pool>
    where
        R: Rng + ?Sized,
    {
        let candidates = self.candidates(target, pools, usage);
        let total_weight: u64 = candidates.iter().map(|p| u64::from(p.weight)).sum();
        if total_weight == 0 {
            return None;
        }

        let roll = rng.gen_range(0..total_weight);
        let mut cumulative = 0u64;
        for &pool in &candidates {
            cumulative += u64::from(pool.weight);
            if roll < cumulative {
                return Some(pool);
            }
        }
        candidates.last().copied()
    }
}
