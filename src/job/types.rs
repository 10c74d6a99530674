use std::time::Instant;

use crate::node::Address;

/// Opaque token unique per submission.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> JobId {
        JobId(raw.into())
    }

    pub fn dht_prefix(&self) -> String {
        format!("job/{}/", self.0)
    }

    pub fn chunk_key(&self, index: u32) -> String {
        format!("job/{}/chunk/{}", self.0, index)
    }

    pub fn inter_key_prefix(&self) -> String {
        format!("job/{}/inter/", self.0)
    }

    pub fn map_fn_key(&self) -> String {
        format!("job/{}/map_fn", self.0)
    }

    pub fn reduce_fn_key(&self) -> String {
        format!("job/{}/reduce_fn", self.0)
    }

    /// `task_index` (unique per map task in this job) combined with `seq`
    /// (unique per emission within that task) guarantees distinct keys,
    /// including across two different chunks that emit the same `out_key`
    /// on the same worker.
    pub fn inter_key(&self, out_key_id_hex: &str, task_index: u32, seq: u64) -> String {
        format!(
            "job/{}/inter/{}/{}/{}",
            self.0, out_key_id_hex, task_index, seq
        )
    }

    pub fn out_key(&self, out_key: &str) -> String {
        format!("job/{}/out/{}", self.0, out_key)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

/// {Pending, InFlight, Done, Failed}, monotonic except Failed -> Pending
/// on retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    InFlight,
    Done,
    Failed,
}

#[derive(Clone, Debug)]
pub struct TaskDescriptor {
    pub job_id: JobId,
    pub phase: Phase,
    pub index: u32,
    /// DHT key of this task's input (a chunk key for Map, an out_key for
    /// Reduce).
    pub input_key: String,
    pub assignee: Option<Address>,
    pub state: TaskState,
    pub attempt: u32,
    pub deadline: Option<Instant>,
}

impl TaskDescriptor {
    pub fn pending(job_id: JobId, phase: Phase, index: u32, input_key: String) -> TaskDescriptor {
        TaskDescriptor {
            job_id,
            phase,
            index,
            input_key,
            assignee: None,
            state: TaskState::Pending,
            attempt: 0,
            deadline: None,
        }
    }

    pub fn is_terminal_success(&self) -> bool {
        self.state == TaskState::Done
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhaseSummary {
    Mapping,
    Reducing,
    Done,
    Failed,
}

#[derive(Clone, Debug)]
pub struct JobStatus {
    pub phase: JobPhaseSummary,
    pub tasks_total: u32,
    pub tasks_done: u32,
    pub tasks_failed: u32,
}
