//! Etherscan-style REST+API-key adapter: holder lists and transfer-event
//! replay (spec §4.1 [FULL]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use types::{GovError, Protocol, ProposalRef, SourceId};

use crate::http::{map_transport_error, with_deadline};
use crate::provider::{not_supported, Deadline, ProviderAdapter};
use crate::raw::{HolderPage, RawDelegation, RawHolder, RawProposal, RawVote};
use crate::transfer_replay::{replay_transfers, TransferLog};

pub struct EtherscanAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EtherscanAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn source_id() -> SourceId {
        SourceId::new("etherscan")
    }

    fn require_key(&self) -> Result<&str, GovError> {
        self.api_key.as_deref().ok_or_else(|| GovError::AuthMissing {
            source: Self::source_id(),
        })
    }

    /// The token-holder-list endpoint, when the token is large enough to have
    /// one indexed. Falls back to transfer replay on `None`.
    async fn token_holder_list(
        &self,
        protocol: &Protocol,
        limit: usize,
        cursor: Option<&str>,
        deadline: Deadline,
    ) -> Result<Option<HolderPage>, GovError> {
        let source = Self::source_id();
        let key = self.require_key()?;
        let page = cursor.and_then(|c| c.parse::<u32>().ok()).unwrap_or(1);
        let url = format!(
            "{}?module=token&action=tokenholderlist&contractaddress={}&page={}&offset={}&apikey={}",
            self.base_url, protocol.contract, page, limit, key
        );

        #[derive(Deserialize)]
        struct Entry {
            #[serde(rename = "TokenHolderAddress")]
            address: String,
            #[serde(rename = "TokenHolderQuantity")]
            balance: String,
        }
        #[derive(Deserialize)]
        struct Envelope {
            status: String,
            result: serde_json::Value,
        }

        let body = with_deadline(&source, deadline, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| map_transport_error(&source, e))?;
            let envelope: Envelope = resp.json().await.map_err(|e| map_transport_error(&source, e))?;
            Ok(envelope)
        })
        .await?;

        if body.status != "1" {
            return Ok(None);
        }
        let entries: Vec<Entry> = serde_json::from_value(body.result).map_err(GovError::from)?;
        let holders = entries
            .into_iter()
            .map(|e| RawHolder {
                address: e.address,
                balance: e.balance,
            })
            .collect();
        Ok(Some(HolderPage {
            holders,
            next_cursor: Some((page + 1).to_string()),
        }))
    }

    async fn replay_transfer_logs(
        &self,
        protocol: &Protocol,
        limit: usize,
        deadline: Deadline,
    ) -> Result<HolderPage, GovError> {
        let source = Self::source_id();
        let key = self.require_key()?;
        let url = format!(
            "{}?module=logs&action=getLogs&address={}&topic0=0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef&apikey={}",
            self.base_url, protocol.contract, key
        );

        #[derive(Deserialize)]
        struct LogEntry {
            data: String,
            topics: Vec<String>,
        }
        #[derive(Deserialize)]
        struct Envelope {
            status: String,
            result: serde_json::Value,
        }

        let body = with_deadline(&source, deadline, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| map_transport_error(&source, e))?;
            let envelope: Envelope = resp.json().await.map_err(|e| map_transport_error(&source, e))?;
            Ok(envelope)
        })
        .await?;

        if body.status != "1" {
            return Ok(HolderPage {
                holders: Vec::new(),
                next_cursor: None,
            });
        }
        let entries: Vec<LogEntry> = serde_json::from_value(body.result).map_err(GovError::from)?;
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
}

#[async_trait]
impl ProviderAdapter for EtherscanAdapter {
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
        if let Some(page) = self.token_holder_list(protocol, limit, cursor, deadline).await? {
            return Ok(page);
        }
        self.replay_transfer_logs(protocol, limit, deadline).await
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_auth_missing() {
        let adapter = EtherscanAdapter::new("https://api.etherscan.io/api", None);
        let protocol = Protocol::new(
            "lending-a",
            "Lending A",
            18,
            1_000_000,
            types::Address::ZERO,
        );
        let err = adapter
            .fetch_holders(&protocol, 10, None, std::time::Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::AuthMissing { .. }));
    }

    #[tokio::test]
    async fn governance_calls_are_not_supported() {
        let adapter = EtherscanAdapter::new("https://api.etherscan.io/api", Some("key".into()));
        let protocol = Protocol::new(
            "lending-a",
            "Lending A",
            18,
            1_000_000,
            types::Address::ZERO,
        );
        let now = Utc::now();
        let err = adapter
            .fetch_proposals(&protocol, now, now, std::time::Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::NotSupported { .. }));
    }
}
