//! Node and job configuration, assembled from defaults, an optional ini
//! file (`rust-ini`) and CLI flags (`clap`).

use std::time::Duration;

use ini::Ini;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Upper bound on any individual peer RPC.
    pub request_timeout: Duration,
    /// Upper bound on a single map/reduce task attempt.
    pub max_task_timeout: Duration,
    /// Map fan-out granularity.
    pub items_per_chunk: usize,
    /// Primary + R-1 secondaries.
    pub dht_replication_size: usize,
    /// Chord resilience; must be >= dht_replication_size.
    pub successor_list_len: usize,
    /// Ring maintenance period.
    pub stabilize_period: Duration,
    /// Finger table maintenance period.
    pub fix_fingers_period: Duration,
    /// Predecessor liveness check period.
    pub check_predecessor_period: Duration,
    /// Recommended attempt cap before a task is aborted.
    pub max_task_attempts: u32,
    /// Per-job ring memory cap, enforced on every DHT put made on a job's
    /// behalf.
    pub max_job_bytes: u64,
    /// Enables debug-only RPCs (GetNodeSummary, etc).
    pub dev_mode: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            request_timeout: Duration::from_millis(500),
            max_task_timeout: Duration::from_secs(300),
            items_per_chunk: 16,
            dht_replication_size: 5,
            successor_list_len: 5,
            stabilize_period: Duration::from_millis(500),
            fix_fingers_period: Duration::from_millis(100),
            check_predecessor_period: Duration::from_secs(1),
            max_task_attempts: 5,
            max_job_bytes: 256 * 1024 * 1024,
            dev_mode: false,
        }
    }
}

impl Config {
    /// Loads overrides from an ini file on top of the defaults. Missing
    /// keys keep their default; the file itself is optional.
    pub fn with_ini_overrides(mut self, path: &str) -> Config {
        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(_) => return self,
        };
        let section = ini.section(Some("chord"));
        if let Some(section) = section {
            if let Some(v) = section.get("items_per_chunk").and_then(|v| v.parse().ok()) {
                self.items_per_chunk = v;
            }
            if let Some(v) = section
                .get("dht_replication_size")
                .and_then(|v| v.parse().ok())
            {
                self.dht_replication_size = v;
            }
            if let Some(v) = section
                .get("successor_list_len")
                .and_then(|v| v.parse().ok())
            {
                self.successor_list_len = v;
            }
            if let Some(v) = section
                .get("max_task_attempts")
                .and_then(|v| v.parse().ok())
            {
                self.max_task_attempts = v;
            }
            if let Some(v) = section.get("max_job_bytes").and_then(|v| v.parse().ok()) {
                self.max_job_bytes = v;
            }
            if let Some(v) = section.get("dev_mode").and_then(|v| v.parse().ok()) {
                self.dev_mode = v;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.successor_list_len < self.dht_replication_size {
            return Err(format!(
                "successor_list_len ({}) must be >= dht_replication_size ({})",
                self.successor_list_len, self.dht_replication_size
            ));
        }
        Ok(())
    }
}
