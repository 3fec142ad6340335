use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::reactions::Target;

/// In-process keyed mutex serializing toggles per target.
///
/// Slots are created on demand and dropped again once no task holds or awaits them.
#[derive(Clone, Default)]
pub struct TargetLocks {
    slots: Arc<DashMap<Target, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, target: Target) -> TargetGuard {
        let slot = self.slots.entry(target).or_default().clone();
        let guard = slot.clone().lock_owned().await;
        TargetGuard {
            locks: self.clone(),
            target,
            slot,
            guard: Some(guard),
        }
    }

    /// Number of targets with a live slot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub struct TargetGuard {
    locks: TargetLocks,
    target: Target,
    slot: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        self.guard.take();
        // map + this guard's handle; anything above that is a waiter
        self.locks.slots.remove_if(&self.target, |_, slot| {
            Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::reactions::TargetId;

    fn target(id: i64) -> Target {
        Target::sound(TargetId::new(id).unwrap())
    }

    #[tokio::test]
    async fn slot_is_released_after_last_guard() {
        let locks = TargetLocks::new();
        {
            let _guard = locks.acquire(target(1)).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn second_acquire_waits_for_first() {
        let locks = TargetLocks::new();
        let guard = locks.acquire(target(7)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(target(7)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender finishes");
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn distinct_targets_do_not_block() {
        let locks = TargetLocks::new();
        let _first = locks.acquire(target(1)).await;
        let _second = locks.acquire(target(2)).await;
        assert_eq!(locks.len(), 2);
    }
}
