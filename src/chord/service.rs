//! The single tonic service implementing every RPC a node exposes: ring
//! maintenance, DHT storage, and job worker dispatch. Each handler is a
//! thin adapter onto the free functions in `chord::{lookup,maintenance}`,
//! `dht::{router,store}` and `job::worker` that do the actual work, so the
//! logic stays testable without a running server.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::chord::node::ChordNode;
use crate::chord_proto::chord_server::Chord;
use crate::chord_proto::{
    AwaitJobRequest, AwaitJobResponse, DhtDeleteRequest, DhtGetRequest, DhtGetResponse, DhtGetStatus,
    DhtLocalKeysRequest, DhtLocalKeysResponse, DhtPutRequest, Empty, FingerEntryDebugMsg, GetPredecessorResponse,
    HashPosMsg, JobPhaseSummary as JobPhaseSummaryMsg, JobStatusRequest, JobStatusResponse, KeyValue, NodeRefMsg,
    NodeSummaryMsg, NotifyRequest, RunMapRequest, RunReduceRequest, SubmitJobRequest, SubmitJobResponse,
    SuccessorListMsg, TaskPhase, TaskState as TaskStateMsg, TaskStatusRequest, TaskStatusResponse,
};
use crate::config::Config;
use crate::dht::store::{Entry, Store};
use crate::job::kernel::KernelRegistry;
use crate::job::types::JobId;
use crate::job::JobCoordinator;
use crate::node::NodeRef;

/// Bundles the node's running state with the handles a request handler
/// needs to reach the DHT store and (when a job was submitted locally)
/// the job coordinator tracking it.
pub struct ChordGrpcService {
    pub node: Arc<ChordNode>,
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub registry: Arc<KernelRegistry>,
    pub jobs: std::sync::Mutex<std::collections::HashMap<String, Arc<JobCoordinator>>>,
}

impl ChordGrpcService {
    pub fn new(node: Arc<ChordNode>, store: Arc<Store>, config: Arc<Config>, registry: Arc<KernelRegistry>) -> ChordGrpcService {
        ChordGrpcService {
            node,
            store,
            config,
            registry,
            jobs: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    pub fn track_job(&self, coordinator: Arc<JobCoordinator>) {
        self.jobs.lock().unwrap().insert(coordinator.job_id.0.clone(), coordinator);
    }
}

#[tonic::async_trait]
impl Chord for ChordGrpcService {
    async fn find_successor(&self, request: Request<HashPosMsg>) -> Result<Response<NodeRefMsg>, Status> {
        let target = request.into_inner().into();
        let resolved = crate::chord::lookup::find_successor(&self.node, &self.config, target).await?;
        Ok(Response::new((&resolved).into()))
    }

    async fn get_predecessor(&self, _request: Request<Empty>) -> Result<Response<GetPredecessorResponse>, Status> {
        Ok(Response::new(GetPredecessorResponse {
            predecessor: self.node.predecessor().map(|p| (&p).into()),
        }))
    }

    async fn get_successor_list(&self, _request: Request<Empty>) -> Result<Response<SuccessorListMsg>, Status> {
        let successors = self.node.successor_snapshot().iter().map(NodeRefMsg::from).collect();
        Ok(Response::new(SuccessorListMsg { successors }))
    }

    async fn notify(&self, request: Request<NotifyRequest>) -> Result<Response<Empty>, Status> {
        let candidate: NodeRef = request
            .into_inner()
            .candidate
            .ok_or_else(|| Status::invalid_argument("missing candidate"))?
            .into();
        crate::chord::maintenance::notify(&self.node, candidate);
        Ok(Response::new(Empty {}))
    }

    async fn ping(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(Response::new(Empty {}))
    }

    async fn fix_fingers(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        crate::chord::maintenance::fix_fingers_tick(&self.node, &self.config).await;
        Ok(Response::new(Empty {}))
    }

    async fn stabilize(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        crate::chord::maintenance::stabilize_tick(&self.node, &self.store, &self.config).await;
        Ok(Response::new(Empty {}))
    }

    async fn dht_put(&self, request: Request<DhtPutRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        if req.version == 0 {
            self.store.put_local(req.key, req.value, self.node.id());
        } else {
            let originator = bytes_to_node_id(&req.originator)?;
            self.store.put_if_newer(
                req.key,
                Entry {
                    value: req.value,
                    version: req.version,
                    originator,
                },
            );
        }
        Ok(Response::new(Empty {}))
    }

    async fn dht_get(&self, request: Request<DhtGetRequest>) -> Result<Response<DhtGetResponse>, Status> {
        let key = request.into_inner().key;
        match self.store.get(&key) {
            Some(entry) => Ok(Response::new(DhtGetResponse {
                value: entry.value,
                version: entry.version,
                status: DhtGetStatus::DhtGetOk as i32,
            })),
            None => Ok(Response::new(DhtGetResponse {
                value: Vec::new(),
                version: 0,
                status: DhtGetStatus::DhtGetNotFound as i32,
            })),
        }
    }

    async fn dht_delete(&self, request: Request<DhtDeleteRequest>) -> Result<Response<Empty>, Status> {
        self.store.delete(&request.into_inner().key);
        Ok(Response::new(Empty {}))
    }

    async fn dht_local_keys(&self, request: Request<DhtLocalKeysRequest>) -> Result<Response<DhtLocalKeysResponse>, Status> {
        let prefix = request.into_inner().prefix;
        let keys = self.store.keys_with_prefix(prefix.as_bytes());
        Ok(Response::new(DhtLocalKeysResponse { keys }))
    }

    async fn submit_job(&self, request: Request<SubmitJobRequest>) -> Result<Response<SubmitJobResponse>, Status> {
        let req = request.into_inner();
        let job_id = JobId::new(req.job_id);
        let args: serde_json::Value = serde_json::from_str(&req.kernel_args_json).unwrap_or(serde_json::Value::Null);
        let items = req.items.into_iter().map(|kv| (kv.key, kv.value)).collect();

        let coordinator = JobCoordinator::submit(
            self.node.clone(),
            self.store.clone(),
            self.config.clone(),
            self.registry.clone(),
            job_id.clone(),
            items,
            req.map_kernel_id,
            req.reduce_kernel_id,
            args,
        )
        .await?;
        self.track_job(coordinator);

        Ok(Response::new(SubmitJobResponse { job_id: job_id.0 }))
    }

    async fn await_job_result(&self, request: Request<AwaitJobRequest>) -> Result<Response<AwaitJobResponse>, Status> {
        let job_id = request.into_inner().job_id;
        let coordinator = {
            let jobs = self.jobs.lock().unwrap();
            jobs.get(&job_id).cloned().ok_or_else(|| Status::not_found("unknown job id"))?
        };

        match coordinator.await_results().await {
            Ok(results) => Ok(Response::new(AwaitJobResponse {
                results: results.into_iter().map(|(key, value)| KeyValue { key, value }).collect(),
                failed: false,
                error: String::new(),
            })),
            Err(e) => Ok(Response::new(AwaitJobResponse {
                results: Vec::new(),
                failed: true,
                error: e.to_string(),
            })),
        }
    }

    async fn get_job_status(&self, request: Request<JobStatusRequest>) -> Result<Response<JobStatusResponse>, Status> {
        let job_id = request.into_inner().job_id;
        let coordinator = {
            let jobs = self.jobs.lock().unwrap();
            jobs.get(&job_id).cloned().ok_or_else(|| Status::not_found("unknown job id"))?
        };
        let status = coordinator.status();
        let phase = match status.phase {
            crate::job::types::JobPhaseSummary::Mapping => JobPhaseSummaryMsg::JobMapping,
            crate::job::types::JobPhaseSummary::Reducing => JobPhaseSummaryMsg::JobReducing,
            crate::job::types::JobPhaseSummary::Done => JobPhaseSummaryMsg::JobDone,
            crate::job::types::JobPhaseSummary::Failed => JobPhaseSummaryMsg::JobFailed,
        };
        Ok(Response::new(JobStatusResponse {
            phase: phase as i32,
            tasks_total: status.tasks_total,
            tasks_done: status.tasks_done,
            tasks_failed: status.tasks_failed,
        }))
    }

    async fn run_map(&self, request: Request<RunMapRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        crate::job::worker::run_map(
            self.node.clone(),
            self.store.clone(),
            self.config.clone(),
            &self.registry,
            JobId::new(req.job_id),
            req.task_index,
            req.chunk_key,
            req.kernel_key,
        )
        .await?;
        Ok(Response::new(Empty {}))
    }

    async fn run_reduce(&self, request: Request<RunReduceRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        crate::job::worker::run_reduce(
            self.node.clone(),
            self.store.clone(),
            self.config.clone(),
            &self.registry,
            JobId::new(req.job_id),
            req.task_index,
            req.out_key,
            req.kernel_key,
        )
        .await?;
        Ok(Response::new(Empty {}))
    }

    async fn task_status(&self, request: Request<TaskStatusRequest>) -> Result<Response<TaskStatusResponse>, Status> {
        let req = request.into_inner();
        let coordinator = {
            let jobs = self.jobs.lock().unwrap();
            jobs.get(&req.job_id).cloned().ok_or_else(|| Status::not_found("unknown job id"))?
        };
        let phase = match TaskPhase::from_i32(req.phase) {
            Some(TaskPhase::Map) => crate::job::types::Phase::Map,
            Some(TaskPhase::Reduce) => crate::job::types::Phase::Reduce,
            None => return Err(Status::invalid_argument("unknown task phase")),
        };
        let state = coordinator
            .task_state(phase, req.task_index)
            .ok_or_else(|| Status::not_found("unknown task index"))?;
        let state_msg = match state {
            crate::job::types::TaskState::Pending => TaskStateMsg::Pending,
            crate::job::types::TaskState::InFlight => TaskStateMsg::InFlight,
            crate::job::types::TaskState::Done => TaskStateMsg::Done,
            crate::job::types::TaskState::Failed => TaskStateMsg::Failed,
        };
        Ok(Response::new(TaskStatusResponse { state: state_msg as i32 }))
    }

    async fn get_node_summary(&self, _request: Request<Empty>) -> Result<Response<NodeSummaryMsg>, Status> {
        if !self.config.dev_mode {
            return Err(Status::permission_denied("dev_mode is disabled"));
        }
        let predecessor = self.node.predecessor().map(|p| (&p).into());
        let finger_entries: Vec<FingerEntryDebugMsg> = {
            let table = self.node.finger_table.lock().unwrap();
            table.fingers.iter().map(FingerEntryDebugMsg::from).collect()
        };
        let successor_list = SuccessorListMsg {
            successors: self.node.successor_snapshot().iter().map(NodeRefMsg::from).collect(),
        };
        Ok(Response::new(NodeSummaryMsg {
            url: self.node.self_ref.address.clone(),
            pos: self.node.id().to_string(),
            predecessor,
            finger_entries,
            successor_list: Some(successor_list),
        }))
    }
}

fn bytes_to_node_id(bytes: &[u8]) -> Result<crate::identity::NodeId, Status> {
    if bytes.len() != 20 {
        return Err(Status::invalid_argument("malformed originator id"));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    Ok(crate::identity::NodeId::from_be_bytes(out))
}
