//! Error taxonomy. Internal code works with [`CoreError`]; only the RPC
//! boundary translates to/from `tonic::Status`.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("rpc to {peer} timed out")]
    RpcTimeout { peer: String },

    #[error("rpc to {peer} unreachable: {message}")]
    RpcUnreachable { peer: String, message: String },

    #[error("key not found")]
    KeyNotFound,

    #[error("no replica answered for key")]
    Unavailable,

    #[error("write rejected: version {attempted} is not newer than stored version {current}")]
    VersionConflict { attempted: u64, current: u64 },

    #[error("task {job_id}/{phase:?}/{index} exceeded MAX_TASK_TIMEOUT")]
    TaskTimeout {
        job_id: String,
        phase: crate::job::types::Phase,
        index: u32,
    },

    #[error("task {job_id}/{phase:?}/{index} exceeded the retry cap")]
    TaskAborted {
        job_id: String,
        phase: crate::job::types::Phase,
        index: u32,
    },

    #[error("job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("ring capacity exceeded for job {job_id}: {used} bytes over {limit} byte cap")]
    CapacityExceeded {
        job_id: String,
        used: u64,
        limit: u64,
    },

    #[error("no reachable node in the ring")]
    RingEmpty,

    #[error("unknown kernel id: {0}")]
    UnknownKernel(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for tonic::Status {
    fn from(err: CoreError) -> tonic::Status {
        match err {
            CoreError::KeyNotFound => tonic::Status::not_found(err.to_string()),
            CoreError::Unavailable => tonic::Status::unavailable(err.to_string()),
            CoreError::RpcTimeout { .. } => tonic::Status::deadline_exceeded(err.to_string()),
            CoreError::RpcUnreachable { .. } | CoreError::RingEmpty => {
                tonic::Status::unavailable(err.to_string())
            }
            CoreError::VersionConflict { .. } => tonic::Status::already_exists(err.to_string()),
            CoreError::UnknownKernel(_) => tonic::Status::invalid_argument(err.to_string()),
            CoreError::TaskTimeout { .. }
            | CoreError::TaskAborted { .. }
            | CoreError::JobFailed { .. }
            | CoreError::CapacityExceeded { .. } => tonic::Status::aborted(err.to_string()),
            CoreError::Internal(_) => tonic::Status::internal(err.to_string()),
        }
    }
}

impl From<tonic::Status> for CoreError {
    fn from(status: tonic::Status) -> CoreError {
        match status.code() {
            tonic::Code::DeadlineExceeded => CoreError::RpcTimeout {
                peer: String::new(),
            },
            tonic::Code::NotFound => CoreError::KeyNotFound,
            tonic::Code::Unavailable => CoreError::RpcUnreachable {
                peer: String::new(),
                message: status.message().to_string(),
            },
            _ => CoreError::Internal(status.message().to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
