//! Job lifecycle: Ingest -> Map dispatch -> Map barrier -> Reduce
//! planning -> Reduce dispatch -> Finalize.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord::ring;
use crate::chord_proto::{RunMapRequest, RunReduceRequest};
use crate::config::Config;
use crate::dht::router;
use crate::dht::store::Store;
use crate::error::{CoreError, CoreResult};
use crate::job::kernel::KernelRegistry;
use crate::job::types::{JobId, JobPhaseSummary, JobStatus, Phase, TaskDescriptor, TaskState};
use crate::job::worker::ChunkItem;
use crate::node::NodeRef;

pub struct JobCoordinator {
    pub job_id: JobId,
    node: Arc<ChordNode>,
    store: Arc<Store>,
    config: Arc<Config>,
    registry: Arc<KernelRegistry>,

    map_tasks: Mutex<Vec<TaskDescriptor>>,
    reduce_tasks: Mutex<Vec<TaskDescriptor>>,
    reduce_out_keys: Mutex<Vec<String>>,

    workers: Mutex<Vec<NodeRef>>,
    round_robin: AtomicU32,

    notify: tokio::sync::Notify,
    result: Mutex<Option<CoreResult<HashMap<String, String>>>>,
}

impl JobCoordinator {
    /// Ingest: chunk the input, write chunks and the kernel handles into
    /// the DHT under well-known keys, then kick off the background
    /// lifecycle and return immediately. `submit` does not block on the
    /// job completing.
    pub async fn submit(
        node: Arc<ChordNode>,
        store: Arc<Store>,
        config: Arc<Config>,
        registry: Arc<KernelRegistry>,
        job_id: JobId,
        input: Vec<(String, String)>,
        map_kernel: String,
        reduce_kernel: String,
        kernel_args: serde_json::Value,
    ) -> CoreResult<Arc<JobCoordinator>> {
        let kernel_args_json = kernel_args.to_string();

        let chunks: Vec<Vec<ChunkItem>> = input
            .into_iter()
            .map(|(in_key, in_value)| ChunkItem { in_key, in_value })
            .collect::<Vec<_>>()
            .chunks(config.items_per_chunk.max(1))
            .map(|c| c.to_vec())
            .collect();

        let map_tasks: Vec<TaskDescriptor> = (0..chunks.len() as u32)
            .map(|i| TaskDescriptor::pending(job_id.clone(), Phase::Map, i, job_id.chunk_key(i)))
            .collect();

        for (i, chunk) in chunks.iter().enumerate() {
            let bytes = serde_json::to_vec(chunk)
                .map_err(|e| CoreError::Internal(format!("failed to encode chunk {}: {}", i, e)))?;
            router::put(
                node.clone(),
                store.clone(),
                config.clone(),
                job_id.chunk_key(i as u32).into_bytes(),
                bytes,
            )
            .await?;
        }

        router::put(
            node.clone(),
            store.clone(),
            config.clone(),
            job_id.map_fn_key().into_bytes(),
            format!("{}\n{}", map_kernel, kernel_args_json).into_bytes(),
        )
        .await?;
        router::put(
            node.clone(),
            store.clone(),
            config.clone(),
            job_id.reduce_fn_key().into_bytes(),
            format!("{}\n{}", reduce_kernel, kernel_args_json).into_bytes(),
        )
        .await?;

        let coordinator = Arc::new(JobCoordinator {
            job_id,
            node,
            store,
            config,
            registry,
            map_tasks: Mutex::new(map_tasks),
            reduce_tasks: Mutex::new(Vec::new()),
            reduce_out_keys: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
            round_robin: AtomicU32::new(0),
            notify: tokio::sync::Notify::new(),
            result: Mutex::new(None),
        });

        let handle = coordinator.clone();
        tokio::spawn(async move {
            handle.run_to_completion().await;
        });

        Ok(coordinator)
    }

    async fn run_to_completion(self: Arc<Self>) {
        info!("job {} starting map phase", self.job_id);
        self.refresh_workers().await;

        let map_count = self.map_tasks.lock().unwrap().len() as u32;
        self.dispatch_phase(Phase::Map, map_count).await;

        if self.is_failed() {
            self.complete_with(self.take_failure());
            return;
        }

        info!("job {} map phase done, planning reduce", self.job_id);
        if let Err(e) = self.plan_reduce().await {
            self.complete_with(Err(e));
            return;
        }

        let reduce_count = self.reduce_tasks.lock().unwrap().len() as u32;
        self.dispatch_phase(Phase::Reduce, reduce_count).await;

        if self.is_failed() {
            self.complete_with(self.take_failure());
            return;
        }

        info!("job {} reduce phase done, finalizing", self.job_id);
        let outcome = self.finalize().await;
        self.complete_with(outcome);
    }

    /// Reduce planning: scatter-gather the intermediate prefix, recover
    /// each emission's exact `out_key` (the DHT key bucket is only
    /// `id(out_key)`) and build one reduce task per distinct key.
    async fn plan_reduce(&self) -> CoreResult<()> {
        let keys = router::keys_scatter_gather(
            &self.node,
            &self.store,
            &self.config,
            self.job_id.inter_key_prefix().as_bytes(),
        )
        .await;

        let mut distinct_out_keys: BTreeSet<String> = BTreeSet::new();
        for key in keys {
            let bytes = match router::get(&self.node, &self.store, &self.config, key).await {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            if let Ok(pair) = serde_json::from_slice::<crate::job::worker::InterPair>(&bytes) {
                distinct_out_keys.insert(pair.out_key);
            }
        }

        let out_keys: Vec<String> = distinct_out_keys.into_iter().collect();
        let reduce_tasks = out_keys
            .iter()
            .enumerate()
            .map(|(i, out_key)| {
                TaskDescriptor::pending(
                    self.job_id.clone(),
                    Phase::Reduce,
                    i as u32,
                    self.job_id.out_key(out_key),
                )
            })
            .collect();

        *self.reduce_out_keys.lock().unwrap() = out_keys;
        *self.reduce_tasks.lock().unwrap() = reduce_tasks;
        self.refresh_workers().await;
        Ok(())
    }

    async fn refresh_workers(&self) {
        let snapshot = ring::snapshot_live_ring(&self.node, &self.config, usize::MAX).await;
        *self.workers.lock().unwrap() = snapshot;
    }

    /// Dispatches every task of `phase` concurrently, each with its own
    /// retry loop, and waits for the whole phase to settle before
    /// returning (the map/reduce barrier).
    async fn dispatch_phase(self: &Arc<Self>, phase: Phase, count: u32) {
        let mut handles = Vec::new();
        for index in 0..count {
            let this = self.clone();
            handles.push(tokio::spawn(async move {
                this.run_task_with_retries(phase, index).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn run_task_with_retries(self: &Arc<Self>, phase: Phase, index: u32) {
        loop {
            if self.is_failed() {
                return;
            }

            let worker = match self.pick_worker().await {
                Some(w) => w,
                None => {
                    self.fail_job("no live worker available in the ring".to_string());
                    return;
                }
            };

            self.set_task_state(phase, index, TaskState::InFlight, Some(worker.address.clone()));

            let outcome = tokio::time::timeout(
                self.config.max_task_timeout,
                self.dispatch_one(phase, index, &worker),
            )
            .await;

            match outcome {
                Ok(Ok(())) => {
                    self.mark_task_done(phase, index);
                    return;
                }
                Ok(Err(e)) => warn!("task {}/{:?}/{} failed: {}", self.job_id, phase, index, e),
                Err(_) => warn!("task {}/{:?}/{} timed out", self.job_id, phase, index),
            }

            let attempt = self.bump_attempt(phase, index);
            if attempt > self.config.max_task_attempts {
                self.set_task_state(phase, index, TaskState::Failed, None);
                self.fail_job(format!("task {:?}/{} exceeded the retry cap", phase, index));
                return;
            }
            self.set_task_state(phase, index, TaskState::Pending, None);
        }
    }

    async fn dispatch_one(&self, phase: Phase, index: u32, worker: &NodeRef) -> CoreResult<()> {
        let mut client = connect_with_retry(&worker.address, &self.config).await?;
        match phase {
            Phase::Map => {
                let chunk_key = self.job_id.chunk_key(index);
                let request = RunMapRequest {
                    job_id: self.job_id.0.clone(),
                    task_index: index,
                    chunk_key,
                    kernel_key: self.job_id.map_fn_key(),
                };
                client.run_map(Request::new(request)).await.map_err(CoreError::from)?;
            }
            Phase::Reduce => {
                let out_key = self.reduce_out_keys.lock().unwrap()[index as usize].clone();
                let request = RunReduceRequest {
                    job_id: self.job_id.0.clone(),
                    task_index: index,
                    out_key,
                    kernel_key: self.job_id.reduce_fn_key(),
                };
                client.run_reduce(Request::new(request)).await.map_err(CoreError::from)?;
            }
        }
        Ok(())
    }

    /// Round-robin over the worker snapshot taken at phase start,
    /// re-fetched on churn, skipping unreachable candidates.
    async fn pick_worker(&self) -> Option<NodeRef> {
        let snapshot = { self.workers.lock().unwrap().clone() };
        if snapshot.is_empty() {
            return None;
        }
        for _ in 0..snapshot.len() {
            let i = self.round_robin.fetch_add(1, Ordering::Relaxed) as usize % snapshot.len();
            let candidate = &snapshot[i];
            if ring::is_alive(candidate, &self.config).await {
                return Some(candidate.clone());
            }
        }
        None
    }

    fn set_task_state(&self, phase: Phase, index: u32, state: TaskState, assignee: Option<String>) {
        let mut tasks = self.table_for(phase).lock().unwrap();
        if let Some(task) = tasks.get_mut(index as usize) {
            // Done is monotonic: never resurrect a completed task.
            if task.state == TaskState::Done {
                return;
            }
            task.state = state;
            if let Some(addr) = assignee {
                task.assignee = Some(addr);
            }
        }
        self.notify.notify_waiters();
    }

    fn mark_task_done(&self, phase: Phase, index: u32) {
        let mut tasks = self.table_for(phase).lock().unwrap();
        if let Some(task) = tasks.get_mut(index as usize) {
            task.state = TaskState::Done;
        }
        self.notify.notify_waiters();
    }

    fn bump_attempt(&self, phase: Phase, index: u32) -> u32 {
        let mut tasks = self.table_for(phase).lock().unwrap();
        if let Some(task) = tasks.get_mut(index as usize) {
            task.attempt += 1;
            task.attempt
        } else {
            u32::MAX
        }
    }

    fn table_for(&self, phase: Phase) -> &Mutex<Vec<TaskDescriptor>> {
        match phase {
            Phase::Map => &self.map_tasks,
            Phase::Reduce => &self.reduce_tasks,
        }
    }

    /// Looks up one task's state for the `TaskStatus` RPC.
    pub fn task_state(&self, phase: Phase, index: u32) -> Option<TaskState> {
        self.table_for(phase).lock().unwrap().get(index as usize).map(|t| t.state)
    }

    fn fail_job(&self, reason: String) {
        let mut result = self.result.lock().unwrap();
        if result.is_none() {
            *result = Some(Err(CoreError::JobFailed {
                job_id: self.job_id.0.clone(),
                reason,
            }));
        }
        drop(result);
        self.notify.notify_waiters();
    }

    fn is_failed(&self) -> bool {
        matches!(*self.result.lock().unwrap(), Some(Err(_)))
    }

    fn take_failure(&self) -> CoreResult<HashMap<String, String>> {
        self.result.lock().unwrap().clone().unwrap_or(Err(CoreError::Internal(
            "job marked failed with no recorded reason".to_string(),
        )))
    }

    fn complete_with(&self, outcome: CoreResult<HashMap<String, String>>) {
        let mut result = self.result.lock().unwrap();
        if result.is_none() {
            *result = Some(outcome);
        }
        drop(result);
        self.notify.notify_waiters();
    }

    /// Finalize: read every `out_key` result and delete all
    /// `job/<id>/*` keys from the ring.
    async fn finalize(&self) -> CoreResult<HashMap<String, String>> {
        let out_keys = self.reduce_out_keys.lock().unwrap().clone();
        let mut results = HashMap::new();
        for out_key in &out_keys {
            let bytes =
                router::get(&self.node, &self.store, &self.config, self.job_id.out_key(out_key).into_bytes())
                    .await?;
            results.insert(out_key.clone(), String::from_utf8_lossy(&bytes).to_string());
        }

        let all_job_keys = router::keys_scatter_gather(
            &self.node,
            &self.store,
            &self.config,
            self.job_id.dht_prefix().as_bytes(),
        )
        .await;
        for key in all_job_keys {
            let _ = router::delete(self.node.clone(), self.store.clone(), self.config.clone(), key).await;
        }

        Ok(results)
    }

    /// Blocks the caller until the job reaches Done or Failed.
    pub async fn await_results(&self) -> CoreResult<HashMap<String, String>> {
        loop {
            if let Some(result) = self.result.lock().unwrap().clone() {
                return result;
            }
            self.notify.notified().await;
        }
    }

    /// Current progress snapshot for the `GetJobStatus` RPC.
    pub fn status(&self) -> JobStatus {
        let map_tasks = self.map_tasks.lock().unwrap();
        let reduce_tasks = self.reduce_tasks.lock().unwrap();

        let tasks_total = (map_tasks.len() + reduce_tasks.len()) as u32;
        let tasks_done = map_tasks.iter().chain(reduce_tasks.iter()).filter(|t| t.is_terminal_success()).count() as u32;
        let tasks_failed = map_tasks
            .iter()
            .chain(reduce_tasks.iter())
            .filter(|t| t.state == TaskState::Failed)
            .count() as u32;

        let phase = match &*self.result.lock().unwrap() {
            Some(Ok(_)) => JobPhaseSummary::Done,
            Some(Err(_)) => JobPhaseSummary::Failed,
            None if !reduce_tasks.is_empty() => JobPhaseSummary::Reducing,
            None => JobPhaseSummary::Mapping,
        };

        JobStatus {
            phase,
            tasks_total,
            tasks_done,
            tasks_failed,
        }
    }
}
