//! Priority queue of embedding precompute tasks, executed by an at-most-one
//! background processor.
//!
//! The singleton guard follows the same `AtomicBool::swap` pattern used for the
//! migration engine's background phase runner: a second `process_queue` call while
//! one is already active observes `true` from the swap and returns immediately
//! without spawning a competing loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::core::CacheCoreHandle;
use super::error::CacheError;
use super::types::{WarmingStatus, WarmingTask};
use crate::constants::{DEFAULT_WARMING_BATCH_SIZE, DEFAULT_WARMING_TASK_RETENTION_DAYS};
use crate::provider::ProviderRegistry;

/// Admin-surface cap on a single warming request's text count.
const MAX_WARMING_TEXTS: usize = 1000;

struct SchedulerState {
    tasks: HashMap<String, WarmingTask>,
    queue: Vec<String>,
}

/// Schedules and executes embedding precompute tasks against a shared
/// [`CacheCoreHandle`] and [`ProviderRegistry`].
pub struct WarmingScheduler {
    cache: CacheCoreHandle,
    registry: ProviderRegistry,
    batch_size: usize,
    state: RwLock<SchedulerState>,
    processing: AtomicBool,
}

impl WarmingScheduler {
    /// Builds a scheduler over a cache and provider registry, using the default
    /// warming batch size.
    pub fn new(cache: CacheCoreHandle, registry: ProviderRegistry) -> Self {
        Self {
            cache,
            registry,
            batch_size: DEFAULT_WARMING_BATCH_SIZE,
            state: RwLock::new(SchedulerState { tasks: HashMap::new(), queue: Vec::new() }),
            processing: AtomicBool::new(false),
        }
    }

    /// Queues a precompute task and returns its id. Rejects out-of-range priority,
    /// oversized batches, or an unregistered provider without queuing anything.
    pub fn schedule(
        &self,
        texts: Vec<String>,
        provider: &str,
        model: &str,
        priority: u8,
    ) -> Result<String, CacheError> {
        if !(1..=10).contains(&priority) {
            return Err(CacheError::InvalidPriority { priority });
        }
        if texts.len() > MAX_WARMING_TEXTS {
            return Err(CacheError::TooManyTexts { count: texts.len(), max: MAX_WARMING_TEXTS });
        }
        self.registry.get(provider)?;

        self.sweep_expired();

        let id = Uuid::new_v4().to_string();
        let task = WarmingTask {
            id: id.clone(),
            texts,
            provider: provider.to_string(),
            model: model.to_string(),
            priority,
            status: WarmingStatus::Pending,
            progress: 0.0,
            error: None,
            created_at: Utc::now(),
            terminal_at: None,
        };

        let mut state = self.state.write();
        state.tasks.insert(id.clone(), task);
        state.queue.push(id.clone());
        let SchedulerState { tasks, queue } = &mut *state;
        queue.sort_by_key(|task_id| std::cmp::Reverse(tasks.get(task_id).map(|t| t.priority).unwrap_or(0)));
        Ok(id)
    }

    /// Looks up a task's current state.
    pub fn status(&self, task_id: &str) -> Result<WarmingTask, CacheError> {
        self.sweep_expired();
        self.state
            .read()
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| CacheError::TaskNotFound { task_id: task_id.to_string() })
    }

    /// Cancels a still-pending task. Returns `false` for a task that's already
    /// running or terminal, or doesn't exist.
    pub fn cancel(&self, task_id: &str) -> bool {
        let mut state = self.state.write();
        match state.tasks.get_mut(task_id) {
            Some(task) if task.status == WarmingStatus::Pending => {
                task.status = WarmingStatus::Cancelled;
                task.terminal_at = Some(Utc::now());
                state.queue.retain(|id| id != task_id);
                true
            }
            _ => false,
        }
    }

    /// Starts the background processor if none is already running; a no-op
    /// otherwise. Drains the queue highest-priority-first until empty, then exits.
    pub fn process_queue(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        // AcqRel: swap needs both load and store semantics so exactly one caller
        // observes `false` and starts the loop.
        if self.processing.swap(true, Ordering::AcqRel) {
            return tokio::spawn(async {});
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let next_id = {
                    let state = scheduler.state.read();
                    state.queue.first().cloned()
                };
                let Some(task_id) = next_id else { break };
                scheduler.run_task(&task_id).await;
                scheduler.state.write().queue.retain(|id| id != &task_id);
            }
            // Release: publishes the completed run before the next process_queue
            // call's Acquire swap can observe `false` and start a new loop.
            scheduler.processing.store(false, Ordering::Release);
        })
    }

    async fn run_task(&self, task_id: &str) {
        let Some(mut task) = self.state.read().tasks.get(task_id).cloned() else { return };
        if task.status != WarmingStatus::Pending {
            return;
        }
        task.status = WarmingStatus::Running;
        self.save_task(task.clone());

        let provider = match self.registry.get(&task.provider) {
            Ok(provider) => provider,
            Err(err) => {
                self.fail_task(task, err.to_string());
                return;
            }
        };
        if provider.requires_credential() {
            // The scheduler isn't tenant-scoped and has no credential to offer; a
            // missing credential is treated as the unrecoverable case.
            let reason = format!("provider '{}' requires a credential warming has none to supply", task.provider);
            self.fail_task(task, reason);
            return;
        }

        let total = task.texts.len().max(1);
        let mut processed = 0usize;
        let texts = task.texts.clone();
        for batch in texts.chunks(self.batch_size) {
            let (_, missing_idx) = self.cache.get_batch(batch, &task.provider, &task.model);
            if !missing_idx.is_empty() {
                let missing_texts: Vec<String> = missing_idx.iter().map(|&i| batch[i].clone()).collect();
                match provider.embed(&missing_texts, &task.model, None).await {
                    Ok(vectors) => {
                        let items: Vec<(String, Vec<f32>)> = missing_texts.into_iter().zip(vectors).collect();
                        self.cache.put_batch(&items, &task.provider, &task.model, None);
                    }
                    Err(err) => {
                        tracing::warn!(task_id = %task.id, error = %err, "warming batch failed, continuing");
                    }
                }
            }
            processed += batch.len();
            task.progress = (processed as f64 / total as f64).min(1.0);
            self.save_task(task.clone());
        }

        task.status = WarmingStatus::Completed;
        task.progress = 1.0;
        task.terminal_at = Some(Utc::now());
        self.save_task(task);
    }

    fn fail_task(&self, mut task: WarmingTask, reason: String) {
        task.status = WarmingStatus::Failed;
        task.error = Some(reason);
        task.terminal_at = Some(Utc::now());
        self.save_task(task);
    }

    fn save_task(&self, task: WarmingTask) {
        self.state.write().tasks.insert(task.id.clone(), task);
    }

    fn sweep_expired(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(DEFAULT_WARMING_TASK_RETENTION_DAYS);
        self.state.write().tasks.retain(|_, task| task.terminal_at.is_none_or(|at| at >= cutoff));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;

    fn build_scheduler() -> Arc<WarmingScheduler> {
        let registry = ProviderRegistry::new().with_provider(Arc::new(MockProvider::new("mock", 4)));
        Arc::new(WarmingScheduler::new(CacheCoreHandle::new(), registry))
    }

    #[test]
    fn schedule_rejects_out_of_range_priority() {
        let scheduler = build_scheduler();
        let result = scheduler.schedule(vec!["a".to_string()], "mock", "m1", 0);
        assert!(matches!(result, Err(CacheError::InvalidPriority { priority: 0 })));
    }

    #[test]
    fn schedule_rejects_unregistered_provider() {
        let scheduler = build_scheduler();
        let result = scheduler.schedule(vec!["a".to_string()], "nope", "m1", 5);
        assert!(matches!(result, Err(CacheError::Provider(_))));
    }

    #[test]
    fn higher_priority_task_dequeues_first() {
        let scheduler = build_scheduler();
        let low = scheduler.schedule(vec!["a".to_string()], "mock", "m1", 1).unwrap();
        let high = scheduler.schedule(vec!["b".to_string()], "mock", "m1", 9).unwrap();
        let state = scheduler.state.read();
        assert_eq!(state.queue.first(), Some(&high));
        assert_eq!(state.queue.last(), Some(&low));
    }

    #[tokio::test]
    async fn cancelling_a_pending_task_removes_it_from_the_queue() {
        let scheduler = build_scheduler();
        let id = scheduler.schedule(vec!["a".to_string()], "mock", "m1", 5).unwrap();
        assert!(scheduler.cancel(&id));
        assert_eq!(scheduler.status(&id).unwrap().status, WarmingStatus::Cancelled);
        assert!(!scheduler.cancel(&id));
    }

    #[tokio::test]
    async fn processing_a_task_warms_the_cache() {
        let scheduler = build_scheduler();
        let id = scheduler.schedule(vec!["a".to_string(), "b".to_string()], "mock", "m1", 5).unwrap();
        scheduler.process_queue().await.unwrap();
        let task = scheduler.status(&id).unwrap();
        assert_eq!(task.status, WarmingStatus::Completed);
        assert_eq!(scheduler.cache.get("a", "mock", "m1").map(|v| v.len()), Some(4));
    }

    #[tokio::test]
    async fn a_second_processor_started_while_one_runs_is_a_no_op() {
        let scheduler = build_scheduler();
        scheduler.schedule(vec!["a".to_string()], "mock", "m1", 5).unwrap();
        let first = scheduler.process_queue();
        let second = scheduler.process_queue();
        first.await.unwrap();
        second.await.unwrap();
    }

    #[tokio::test]
    async fn missing_credential_provider_fails_the_task_without_a_provider_call() {
        let registry = ProviderRegistry::new().with_provider(Arc::new(MockProvider::new("mock", 4).with_credential("secret")));
        let scheduler = Arc::new(WarmingScheduler::new(CacheCoreHandle::new(), registry));
        let id = scheduler.schedule(vec!["a".to_string()], "mock", "m1", 5).unwrap();
        scheduler.process_queue().await.unwrap();
        let task = scheduler.status(&id).unwrap();
        assert_eq!(task.status, WarmingStatus::Failed);
    }
}
