//! HTTP Peer Messenger
//!
//! Outbound half of the transport adapter: turns the seven messenger
//! operations into JSON POSTs against the peer's internal endpoints.
//!
//! Runs on the blocking side of the node (engine calls happen on worker
//! threads, never on the async runtime), so a blocking HTTP client is the
//! right tool. Idempotent traffic (fetch, update, remove) retries with
//! exponential backoff and jitter; lock traffic is **never** retried, since
//! a duplicated `lock_acquire` would take the remote lock twice.

use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;

use super::messenger::PeerMessenger;
use super::protocol::{
    ENDPOINT_DSM_CACHE_REMOVE, ENDPOINT_DSM_CACHE_UPDATE, ENDPOINT_DSM_FETCH, ENDPOINT_DSM_REMOVE,
    ENDPOINT_DSM_WRITE, ENDPOINT_LOCK_ACQUIRE, ENDPOINT_LOCK_RELEASE, FetchReply, FetchRequest,
    LockRequest, RemoveMsg, UpdateMsg,
};
use crate::cluster::config::ClusterConfig;
use crate::cluster::types::NodeId;
use crate::dsm::error::DsmError;
use crate::dsm::object_id::ObjectId;

const RPC_TIMEOUT: Duration = Duration::from_secs(2);
const RPC_ATTEMPTS: usize = 3;

pub struct HttpMessenger {
    my_id: NodeId,
    /// Base URL per peer, e.g. `http://10.0.0.7:6002`.
    peers: HashMap<NodeId, String>,
    client: reqwest::blocking::Client,
}

impl HttpMessenger {
    pub fn new(my_id: NodeId, config: &ClusterConfig) -> Result<Self> {
        let peers = config
            .nodes
            .values()
            .filter(|info| info.id != my_id)
            .map(|info| (info.id, format!("http://{}", info.address())))
            .collect();

        // No client-wide timeout: lock acquisition legitimately blocks for
        // as long as the remote holder keeps the lock. Bounded operations
        // set per-request timeouts instead.
        let client = reqwest::blocking::Client::builder().build()?;

        Ok(Self {
            my_id,
            peers,
            client,
        })
    }

    fn url(&self, peer: NodeId, endpoint: &str) -> Result<String, DsmError> {
        self.peers
            .get(&peer)
            .map(|base| format!("{}{}", base, endpoint))
            .ok_or_else(|| DsmError::transport(peer, "peer not in cluster config"))
    }

    /// POST with retry for idempotent RPCs: exponential backoff with
    /// jitter, transport-level failures only (an HTTP error status is
    /// returned to the caller, not retried).
    fn post_with_retry<P: serde::Serialize>(
        &self,
        peer: NodeId,
        endpoint: &str,
        payload: &P,
    ) -> Result<reqwest::blocking::Response, DsmError> {
        let url = self.url(peer, endpoint)?;
        let mut delay_ms = 150u64;

        for attempt in 0..RPC_ATTEMPTS {
            let response = self
                .client
                .post(&url)
                .json(payload)
                .timeout(RPC_TIMEOUT)
                .send();

            match response {
                Ok(resp) => return self.check_status(peer, resp),
                Err(e) => {
                    if attempt + 1 == RPC_ATTEMPTS {
                        return Err(DsmError::transport(peer, e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    std::thread::sleep(Duration::from_millis(delay_ms + jitter));
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(DsmError::transport(peer, "retry attempts exhausted"))
    }

    /// Single POST for lock traffic. `timeout` is `None` for acquisition,
    /// which may block until the remote lock is granted.
    fn post_once<P: serde::Serialize>(
        &self,
        peer: NodeId,
        endpoint: &str,
        payload: &P,
        timeout: Option<Duration>,
    ) -> Result<reqwest::blocking::Response, DsmError> {
        let url = self.url(peer, endpoint)?;
        let mut request = self.client.post(&url).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().map_err(|e| DsmError::transport(peer, e))?;
        self.check_status(peer, response)
    }

    fn check_status(
        &self,
        peer: NodeId,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, DsmError> {
        if !response.status().is_success() {
            return Err(DsmError::transport(
                peer,
                format!("peer answered {}", response.status()),
            ));
        }
        Ok(response)
    }
}

impl PeerMessenger for HttpMessenger {
    fn fetch_from_home(&self, peer: NodeId, id: &ObjectId) -> Result<Vec<u8>, DsmError> {
        let payload = FetchRequest {
            object_name: id.as_str().to_string(),
            requester_node_id: self.my_id.0,
        };
        let response = self.post_with_retry(peer, ENDPOINT_DSM_FETCH, &payload)?;
        let reply: FetchReply = response.json().map_err(|e| DsmError::transport(peer, e))?;
        Ok(if reply.found { reply.data } else { Vec::new() })
    }

    fn write_to_home(&self, peer: NodeId, id: &ObjectId, bytes: &[u8]) -> Result<(), DsmError> {
        let payload = UpdateMsg {
            object_name: id.as_str().to_string(),
            data: bytes.to_vec(),
            sender_node_id: self.my_id.0,
        };
        self.post_with_retry(peer, ENDPOINT_DSM_WRITE, &payload)?;
        Ok(())
    }

    fn cache_update(&self, peer: NodeId, id: &ObjectId, bytes: &[u8]) -> Result<(), DsmError> {
        let payload = UpdateMsg {
            object_name: id.as_str().to_string(),
            data: bytes.to_vec(),
            sender_node_id: self.my_id.0,
        };
        self.post_with_retry(peer, ENDPOINT_DSM_CACHE_UPDATE, &payload)?;
        Ok(())
    }

    fn remove_to_home(&self, peer: NodeId, id: &ObjectId) -> Result<(), DsmError> {
        let payload = RemoveMsg {
            object_name: id.as_str().to_string(),
            sender_node_id: self.my_id.0,
        };
        self.post_with_retry(peer, ENDPOINT_DSM_REMOVE, &payload)?;
        Ok(())
    }

    fn cache_remove(&self, peer: NodeId, id: &ObjectId) -> Result<(), DsmError> {
        let payload = RemoveMsg {
            object_name: id.as_str().to_string(),
            sender_node_id: self.my_id.0,
        };
        self.post_with_retry(peer, ENDPOINT_DSM_CACHE_REMOVE, &payload)?;
        Ok(())
    }

    fn lock_acquire(&self, peer: NodeId, id: &ObjectId, is_write: bool) -> Result<(), DsmError> {
        let payload = LockRequest {
            client_id: self.my_id.0,
            object_id: id.as_str().to_string(),
            is_write_lock: is_write,
        };
        self.post_once(peer, ENDPOINT_LOCK_ACQUIRE, &payload, None)?;
        Ok(())
    }

    fn lock_release(&self, peer: NodeId, id: &ObjectId, is_write: bool) -> Result<(), DsmError> {
        let payload = LockRequest {
            client_id: self.my_id.0,
            object_id: id.as_str().to_string(),
            is_write_lock: is_write,
        };
        self.post_once(peer, ENDPOINT_LOCK_RELEASE, &payload, Some(RPC_TIMEOUT))?;
        Ok(())
    }
}
