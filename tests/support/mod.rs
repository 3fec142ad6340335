//! In-memory stores and cache doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tally::application::cache::{CacheError, CacheLookup, Epoch, SnapshotCache};
use tally::application::reactions::{ReactionOptions, ReactionService};
use tally::application::repos::{AggregatesRepo, HealthCheck, ParticipantsRepo, RepoError};
use tally::cache::{CacheConfig, SnapshotStore};
use tally::domain::reactions::{
    ReactionKind, ReactionStats, Target, TargetId, TargetKind, UserId,
};

pub fn sound(id: i64) -> Target {
    Target::sound(TargetId::new(id).expect("positive target id"))
}

pub fn comment(id: i64) -> Target {
    Target::comment(TargetId::new(id).expect("positive target id"))
}

pub fn user(id: i64) -> UserId {
    UserId::new(id).expect("positive user id")
}

pub fn ids(raw: &[i64]) -> Vec<TargetId> {
    raw.iter()
        .map(|id| TargetId::new(*id).expect("positive target id"))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Unavailable,
    Timeout,
}

impl Fault {
    fn error(self, op: &str) -> RepoError {
        match self {
            Fault::Unavailable => RepoError::unavailable(format!("{op}: connection refused")),
            Fault::Timeout => RepoError::Timeout,
        }
    }
}

/// Both stores in memory, with per-operation fault injection and a call log.
#[derive(Default)]
pub struct MemoryRepos {
    participants: Mutex<HashMap<(Target, UserId), ReactionKind>>,
    aggregates: Mutex<HashMap<Target, ReactionStats>>,
    calls: Mutex<Vec<&'static str>>,
    faults: Mutex<HashMap<&'static str, Fault>>,
    stalls: Mutex<HashMap<&'static str, Duration>>,
    lags: Mutex<HashMap<&'static str, Duration>>,
}

impl MemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later call of `op` fail.
    pub async fn fail(&self, op: &'static str, fault: Fault) {
        self.faults.lock().await.insert(op, fault);
    }

    /// Sleep before `op` touches the data.
    pub async fn stall(&self, op: &'static str, delay: Duration) {
        self.stalls.lock().await.insert(op, delay);
    }

    /// Sleep after `op` has read or written the data.
    pub async fn lag(&self, op: &'static str, delay: Duration) {
        self.lags.lock().await.insert(op, delay);
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, op: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| **c == op).count()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Write a participation row directly, bypassing the call log and counters.
    pub async fn seed_reaction(&self, user: UserId, target: Target, kind: ReactionKind) {
        self.participants.lock().await.insert((target, user), kind);
    }

    pub async fn stored_stats(&self, target: Target) -> ReactionStats {
        self.aggregates
            .lock()
            .await
            .get(&target)
            .copied()
            .unwrap_or_default()
    }

    pub async fn stored_reaction(&self, user: UserId, target: Target) -> Option<ReactionKind> {
        self.participants
            .lock()
            .await
            .get(&(target, user))
            .copied()
    }

    async fn enter(&self, op: &'static str) -> Result<(), RepoError> {
        self.calls.lock().await.push(op);
        let stall = self.stalls.lock().await.get(op).copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        tokio::task::yield_now().await;
        match self.faults.lock().await.get(op) {
            Some(fault) => Err(fault.error(op)),
            None => Ok(()),
        }
    }

    async fn leave(&self, op: &'static str) {
        let lag = self.lags.lock().await.get(op).copied();
        if let Some(delay) = lag {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ParticipantsRepo for MemoryRepos {
    async fn find_reaction(
        &self,
        user: UserId,
        target: Target,
    ) -> Result<Option<ReactionKind>, RepoError> {
        self.enter("participants.find").await?;
        let found = self.participants.lock().await.get(&(target, user)).copied();
        self.leave("participants.find").await;
        Ok(found)
    }

    async fn upsert_reaction(
        &self,
        user: UserId,
        target: Target,
        kind: ReactionKind,
    ) -> Result<(), RepoError> {
        self.enter("participants.upsert").await?;
        self.participants.lock().await.insert((target, user), kind);
        self.leave("participants.upsert").await;
        Ok(())
    }

    async fn remove_reaction(&self, user: UserId, target: Target) -> Result<(), RepoError> {
        self.enter("participants.remove").await?;
        self.participants.lock().await.remove(&(target, user));
        self.leave("participants.remove").await;
        Ok(())
    }

    async fn find_reactions_batch(
        &self,
        user: UserId,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<HashMap<TargetId, ReactionKind>, RepoError> {
        self.enter("participants.find_batch").await?;
        let participants = self.participants.lock().await;
        let found = ids
            .iter()
            .filter_map(|id| {
                participants
                    .get(&(Target::new(kind, *id), user))
                    .map(|reaction| (*id, *reaction))
            })
            .collect();
        drop(participants);
        self.leave("participants.find_batch").await;
        Ok(found)
    }
}

#[async_trait]
impl AggregatesRepo for MemoryRepos {
    async fn increment_or_create(
        &self,
        target: Target,
        kind: ReactionKind,
    ) -> Result<(), RepoError> {
        self.enter("aggregates.increment").await?;
        {
            let mut aggregates = self.aggregates.lock().await;
            let stats = aggregates.entry(target).or_default();
            match kind {
                ReactionKind::Like => stats.likes += 1,
                ReactionKind::Dislike => stats.dislikes += 1,
            }
        }
        self.leave("aggregates.increment").await;
        Ok(())
    }

    async fn decrement(&self, target: Target, kind: ReactionKind) -> Result<bool, RepoError> {
        self.enter("aggregates.decrement").await?;
        let changed = {
            let mut aggregates = self.aggregates.lock().await;
            match aggregates.get_mut(&target) {
                Some(stats) => {
                    let counter = match kind {
                        ReactionKind::Like => &mut stats.likes,
                        ReactionKind::Dislike => &mut stats.dislikes,
                    };
                    if *counter > 0 {
                        *counter -= 1;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        self.leave("aggregates.decrement").await;
        Ok(changed)
    }

    async fn stats(&self, target: Target) -> Result<ReactionStats, RepoError> {
        self.enter("aggregates.stats").await?;
        let stats = self
            .aggregates
            .lock()
            .await
            .get(&target)
            .copied()
            .unwrap_or_default();
        self.leave("aggregates.stats").await;
        Ok(stats)
    }

    async fn stats_batch(
        &self,
        kind: TargetKind,
        ids: &[TargetId],
    ) -> Result<HashMap<TargetId, ReactionStats>, RepoError> {
        self.enter("aggregates.stats_batch").await?;
        let aggregates = self.aggregates.lock().await;
        let stats = ids
            .iter()
            .map(|id| {
                let stats = aggregates
                    .get(&Target::new(kind, *id))
                    .copied()
                    .unwrap_or_default();
                (*id, stats)
            })
            .collect();
        drop(aggregates);
        self.leave("aggregates.stats_batch").await;
        Ok(stats)
    }
}

#[async_trait]
impl HealthCheck for MemoryRepos {
    async fn health_check(&self) -> Result<(), RepoError> {
        self.enter("health").await
    }
}

/// Real snapshot store that can be switched into a failing or slow mode.
pub struct FlakyCache {
    inner: SnapshotStore,
    broken: AtomicBool,
    delete_delay_ms: AtomicU64,
}

impl FlakyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SnapshotStore::new(&CacheConfig::default()),
            broken: AtomicBool::new(false),
            delete_delay_ms: AtomicU64::new(0),
        })
    }

    /// Make every later delete sleep before it reaches the store.
    pub fn slow_deletes(&self, delay: Duration) {
        self.delete_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn break_down(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SnapshotCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        observed: Epoch,
    ) -> Result<bool, CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl, observed).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        let delay = self.delete_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }
}

pub fn service_with(
    repos: &Arc<MemoryRepos>,
    cache: Arc<dyn SnapshotCache>,
    options: ReactionOptions,
) -> ReactionService {
    let participants: Arc<dyn ParticipantsRepo> = repos.clone();
    let aggregates: Arc<dyn AggregatesRepo> = repos.clone();
    ReactionService::new(participants, aggregates, cache, options)
}

pub fn service(repos: &Arc<MemoryRepos>, cache: Arc<dyn SnapshotCache>) -> ReactionService {
    service_with(repos, cache, ReactionOptions::default())
}
