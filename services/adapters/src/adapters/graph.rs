//! TheGraph-style GraphQL subgraph adapter: proposals, votes, and delegations
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

pub struct GraphAdapter {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GraphAdapter {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    fn source_id() -> SourceId {
        SourceId::new("graph")
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
        deadline: Deadline,
    ) -> Result<T, GovError> {
        let source = Self::source_id();
        let key = self.api_key.as_deref().ok_or_else(|| GovError::AuthMissing {
            source: source.clone(),
        })?;

        #[derive(Deserialize)]
        struct GraphQlEnvelope<T> {
            data: Option<T>,
            #[serde(default)]
            errors: Vec<GraphQlError>,
        }
        #[derive(Deserialize)]
        struct GraphQlError {
            message: String,
        }

        with_deadline(&source, deadline, async {
            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(key)
                .json(&json!({ "query": query, "variables": variables }))
                .send()
                .await
                .map_err(|e| map_transport_error(&source, e))?;
            let envelope: GraphQlEnvelope<T> =
                resp.json().await.map_err(|e| map_transport_error(&source, e))?;
            if let Some(first) = envelope.errors.first() {
                return Err(GovError::PermanentSchema {
                    source: source.clone(),
                    call: "graphql".to_string(),
                    fingerprint: first.message.clone(),
                });
            }
            envelope.data.ok_or_else(|| GovError::PermanentSchema {
                source: source.clone(),
                call: "graphql".to_string(),
                fingerprint: "empty data field".to_string(),
            })
        })
        .await
    }
}

#[async_trait]
impl ProviderAdapter for GraphAdapter {
    fn source(&self) -> SourceId {
        Self::source_id()
    }

    async fn fetch_holders(
        &self,
        _protocol: &Protocol,
        _limit: usize,
        _cursor: Option<&str>,
        _deadline: Deadline,
    ) -> Result<HolderPage, GovError> {
        Err(not_supported(&Self::source_id(), "fetch_holders"))
    }

    async fn fetch_proposals(
        &self,
        protocol: &Protocol,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<Vec<RawProposal>, GovError> {
        #[derive(Deserialize)]
        struct Data {
            proposals: Vec<RawProposal>,
        }
        const QUERY: &str = r#"
            query Proposals($contract: String!, $since: Int!, $until: Int!) {
                proposals(where: { contract: $contract, createdAt_gte: $since, createdAt_lte: $until }) {
                    proposalId proposer createdAt votingStart votingEnd status
                    quorum forVotes againstVotes abstainVotes metadata
                }
            }
        "#;
        let data: Data = self
            .query(
                QUERY,
                json!({
                    "contract": protocol.contract.to_string(),
                    "since": since.timestamp(),
                    "until": until.timestamp(),
                }),
                deadline,
            )
            .await?;
        Ok(data.proposals)
    }

    async fn fetch_votes(&self, proposal: &ProposalRef, deadline: Deadline) -> Result<Vec<RawVote>, GovError> {
        #[derive(Deserialize)]
        struct Data {
            votes: Vec<RawVote>,
        }
        const QUERY: &str = r#"
            query Votes($proposalId: String!) {
                votes(where: { proposalId: $proposalId }) { proposalId voter choice power castAt }
            }
        "#;
        let data: Data = self
            .query(QUERY, json!({ "proposalId": proposal.proposal_id }), deadline)
            .await?;
        Ok(data.votes)
    }

    async fn fetch_delegations(
        &self,
        protocol: &Protocol,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        deadline: Deadline,
    ) -> Result<Vec<RawDelegation>, GovError> {
        #[derive(Deserialize)]
        struct Data {
            delegations: Vec<RawDelegation>,
        }
        const QUERY: &str = r#"
            query Delegations($contract: String!, $since: Int!, $until: Int!) {
                delegations(where: { contract: $contract, effectiveFrom_gte: $since, effectiveFrom_lte: $until }) {
                    delegator delegatee effectiveFrom amount
                }
            }
        "#;
        let data: Data = self
            .query(
                QUERY,
                json!({
                    "contract": protocol.contract.to_string(),
                    "since": since.timestamp(),
                    "until": until.timestamp(),
                }),
                deadline,
            )
            .await?;
        Ok(data.delegations)
    }
}
