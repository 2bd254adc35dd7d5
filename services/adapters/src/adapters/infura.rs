//! Infura raw `eth_getLogs` adapter: the deep fallback for holders. Has no
//! holder index at all, so it always takes the replay-and-reduce path
//! (spec §4.1 [FULL]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use types::{GovError, Protocol, ProposalRef, SourceId};

use crate::http::{map_transport_error, with_deadline};
use crate::provider::{not_supported, Deadline, ProviderAdapter};
use crate::raw::{HolderPage, RawDelegation, RawProposal, RawVote};
use crate::transfer_replay::{replay_transfers, TransferLog};

const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub struct InfuraAdapter {
    client: Client,
    rpc_url: String,
    api_key: Option<String>,
}

impl InfuraAdapter {
    pub fn new(rpc_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
            api_key,
        }
    }

    fn source_id() -> SourceId {
        SourceId::new("infura")
    }
}

#[async_trait]
impl ProviderAdapter for InfuraAdapter {
    fn source(&self) -> SourceId {
        Self::source_id()
    }

    async fn fetch_holders(
        &self,
        protocol: &Protocol,
        limit: usize,
        _cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<HolderPage, GovError> {
        let source = Self::source_id();
        let key = self.api_key.as_deref().ok_or_else(|| GovError::AuthMissing {
            source: source.clone(),
        })?;
        let url = format!("{}/{}", self.rpc_url, key);

        #[derive(Deserialize)]
        struct LogEntry {
            data: String,
            topics: Vec<String>,
        }
        #[derive(Deserialize)]
        struct RpcEnvelope {
            result: Option<Vec<LogEntry>>,
            error: Option<RpcError>,
        }
        #[derive(Deserialize)]
        struct RpcError {
            message: String,
        }

        let params = json!([{
            "address": protocol.contract.to_string(),
            "topics": [TRANSFER_TOPIC],
            "fromBlock": "earliest",
            "toBlock": "latest",
        }]);

        let entries = with_deadline(&source, deadline, async {
            let resp = self
                .client
                .post(&url)
                .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "eth_getLogs", "params": params }))
                .send()
                .await
                .map_err(|e| map_transport_error(&source, e))?;
            let envelope: RpcEnvelope = resp.json().await.map_err(|e| map_transport_error(&source, e))?;
            if let Some(err) = envelope.error {
                return Err(GovError::PermanentSchema {
                    source: source.clone(),
                    call: "eth_getLogs".to_string(),
                    fingerprint: err.message,
                });
            }
            Ok(envelope.result.unwrap_or_default())
        })
        .await?;

        let logs: Vec<TransferLog> = entries
            .into_iter()
            .filter_map(|e| {
                let from = e.topics.get(1)?.clone();
                let to = e.topics.get(2)?.clone();
                let value = u128::from_str_radix(e.data.trim_start_matches("0x"), 16)
                    .unwrap_or(0)
                    .to_string();
                Some(TransferLog { from, to, value })
            })
            .collect();
        Ok(replay_transfers(&logs, limit))
    }

    async fn fetch_proposals(
        &self,
        _protocol: &Protocol,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
        _deadline: Deadline,
    ) -> Result<Vec<RawProposal>, GovError> {
        Err(not_supported(&Self::source_id(), "fetch_proposals"))
    }

    async fn fetch_votes(&self, _proposal: &ProposalRef, _deadline: Deadline) -> Result<Vec<RawVote>, GovError> {
        Err(not_supported(&Self::source_id(), "fetch_votes"))
    }

    async fn fetch_delegations(
        &self,
        _protocol: &Protocol,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
        _deadline: Deadline,
    ) -> Result<Vec<RawDelegation>, GovError> {
        Err(not_supported(&Self::source_id(), "fetch_delegations"))
    }
}
