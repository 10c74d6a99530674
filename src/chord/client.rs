//! Peer connection helpers: every outbound RPC goes through one of these
//! so retry/timeout policy lives in one place.

use std::time::Duration;

use log::warn;
use tonic::transport::{Channel, Endpoint};

use crate::chord_proto::chord_client::ChordClient;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::node::{Address, NodeRef};

const MAX_CONNECT_RETRIES: u32 = 15;
const CONNECT_RETRY_SLEEP: Duration = Duration::from_millis(100);

pub async fn connect(address: &Address, request_timeout: Duration) -> Result<ChordClient<Channel>, tonic::transport::Error> {
    let endpoint = Endpoint::from_shared(format!("http://{}", address))?
        .timeout(request_timeout)
        .connect_timeout(request_timeout);
    let channel = endpoint.connect().await?;
    Ok(ChordClient::new(channel))
}

pub async fn connect_with_retry(address: &Address, config: &Config) -> CoreResult<ChordClient<Channel>> {
    let mut retries = 0;
    loop {
        match connect(address, config.request_timeout).await {
            Ok(client) => return Ok(client),
            Err(e) => {
                retries += 1;
                if retries > MAX_CONNECT_RETRIES {
                    return Err(CoreError::RpcUnreachable {
                        peer: address.clone(),
                        message: e.to_string(),
                    });
                }
                warn!("failed to connect to {}: {}, retrying", address, e);
                tokio::time::sleep(CONNECT_RETRY_SLEEP).await;
            }
        }
    }
}

/// Tries each candidate in order, returning the first reachable client.
/// Used to pick a live head of the successor list when the direct
/// successor RPC has failed.
pub async fn connect_to_first_reachable(
    candidates: &[NodeRef],
    config: &Config,
) -> Option<(ChordClient<Channel>, NodeRef)> {
    for node in candidates {
        if let Ok(client) = connect(&node.address, config.request_timeout).await {
            return Some((client, node.clone()));
        }
    }
    None
}
