//! Ethplorer REST adapter: holder lists under a simpler request budget than
//! Etherscan; no governance-data surface at all (spec §4.1 [FULL]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use types::{GovError, Protocol, ProposalRef, SourceId};

use crate::http::{map_transport_error, with_deadline};
use crate::provider::{not_supported, Deadline, ProviderAdapter};
use crate::raw::{HolderPage, RawDelegation, RawHolder, RawProposal, RawVote};

pub struct EthplorerAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EthplorerAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn source_id() -> SourceId {
        SourceId::new("ethplorer")
    }
}

#[async_trait]
impl ProviderAdapter for EthplorerAdapter {
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
        let source = Self::source_id();
        let key = self.api_key.as_deref().unwrap_or("freekey");
        let offset = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let url = format!(
            "{}/getTopTokenHolders/{}?apiKey={}&limit={}&offset={}",
            self.base_url, protocol.contract, key, limit, offset
        );

        #[derive(Deserialize)]
        struct Entry {
            address: String,
            balance: f64,
        }
        #[derive(Deserialize)]
        struct Envelope {
            holders: Vec<Entry>,
        }

        let envelope: Envelope = with_deadline(&source, deadline, async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| map_transport_error(&source, e))?;
            resp.json().await.map_err(|e| map_transport_error(&source, e))
        })
        .await?;

        let holders = envelope
            .holders
            .into_iter()
            .map(|e| RawHolder {
                address: e.address,
                balance: (e.balance as u128).to_string(),
            })
            .collect();
        Ok(HolderPage {
            holders,
            next_cursor: Some((offset + limit).to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn governance_calls_are_not_supported() {
        let adapter = EthplorerAdapter::new("https://api.ethplorer.io", None);
        let proposal = ProposalRef {
            protocol: types::ProtocolId::new("lending-a"),
            proposal_id: "1".to_string(),
        };
        let err = adapter
            .fetch_votes(&proposal, std::time::Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::NotSupported { .. }));

        let protocol = Protocol::new("lending-a", "Lending A", 18, 1_000_000, types::Address::ZERO);
        let now = Utc::now();
        let err = adapter
            .fetch_delegations(&protocol, now, now, std::time::Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GovError::NotSupported { .. }));
    }
}
