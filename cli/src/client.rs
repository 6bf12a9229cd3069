//! HTTP client for a Cipher Scribe node

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use scribe_fhe::{CiphertextHandle, DecryptAuthorization, DisclosurePurpose};
use scribe_paper::{Paper, PaperId, PaperMetadata, Principal};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({code}, HTTP {status})")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

#[derive(Debug, Deserialize)]
pub struct Health {
    pub healthy: bool,
    pub version: String,
    pub protocol_id: u32,
    pub uptime_secs: u64,
    pub paper_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct PaperView {
    #[serde(flatten)]
    pub paper: Paper,
    pub review_status: String,
}

#[derive(Debug, Deserialize)]
struct PaperList {
    papers: Vec<PaperView>,
}

#[derive(Debug, Deserialize)]
struct PaperIdList {
    ids: Vec<PaperId>,
}

#[derive(Debug, Deserialize)]
pub struct Receipt {
    pub paper_id: PaperId,
    pub reviewer: Principal,
    pub review_count: u64,
    pub timestamp: u64,
    pub receipt: String,
}

#[derive(Debug, Deserialize)]
pub struct DisclosureView {
    pub paper_id: PaperId,
    pub purpose: DisclosurePurpose,
    pub handle: CiphertextHandle,
    pub authorization: DecryptAuthorization,
    pub review_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct Encrypted {
    pub handle: String,
    pub proof: String,
}

#[derive(Debug, Deserialize)]
struct Decrypted {
    value: u32,
}

#[derive(Debug, Deserialize)]
struct Submitted {
    submitted: bool,
}

#[derive(Debug, Deserialize)]
struct OwnerView {
    owner: Option<Principal>,
}

pub struct NodeClient {
    http: reqwest::Client,
    base: String,
}

impl NodeClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            base: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => Err(ClientError::Rejected {
                status: status.as_u16(),
                code: err.code,
                message: err.error,
            }),
            Err(_) => Err(ClientError::Rejected {
                status: status.as_u16(),
                code: "HTTP".into(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            }),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        self.get("/health").await
    }

    pub async fn list_papers(&self, sort: Option<&str>) -> Result<Vec<PaperView>, ClientError> {
        let path = match sort {
            Some(sort) => format!("/papers?sort={}", sort),
            None => "/papers".to_string(),
        };
        let list: PaperList = self.get(&path).await?;
        Ok(list.papers)
    }

    /// Ids in registration order
    pub async fn paper_ids(&self) -> Result<Vec<PaperId>, ClientError> {
        let list: PaperIdList = self.get("/papers/ids").await?;
        Ok(list.ids)
    }

    pub async fn get_paper(&self, id: &PaperId) -> Result<PaperView, ClientError> {
        self.post("/paper", &json!({ "paper_id": id.to_hex() }))
            .await
    }

    pub async fn register_paper(
        &self,
        caller: &Principal,
        id: &PaperId,
        metadata: &PaperMetadata,
    ) -> Result<PaperView, ClientError> {
        self.post("/papers/register", &metadata_body(caller, id, metadata))
            .await
    }

    pub async fn update_paper(
        &self,
        caller: &Principal,
        id: &PaperId,
        metadata: &PaperMetadata,
    ) -> Result<PaperView, ClientError> {
        self.post("/papers/update", &metadata_body(caller, id, metadata))
            .await
    }

    pub async fn encrypt(&self, value: u32, submitter: &Principal) -> Result<Encrypted, ClientError> {
        self.post(
            "/relayer/encrypt",
            &json!({ "value": value, "submitter": submitter.to_hex() }),
        )
        .await
    }

    pub async fn decrypt(
        &self,
        authorization: &DecryptAuthorization,
        requester: &Principal,
    ) -> Result<u32, ClientError> {
        let decrypted: Decrypted = self
            .post(
                "/relayer/decrypt",
                &json!({ "authorization": authorization, "requester": requester.to_hex() }),
            )
            .await?;
        Ok(decrypted.value)
    }

    pub async fn submit_score(
        &self,
        reviewer: &Principal,
        id: &PaperId,
        encrypted: &Encrypted,
    ) -> Result<Receipt, ClientError> {
        self.post(
            "/scores/submit",
            &json!({
                "reviewer": reviewer.to_hex(),
                "paper_id": id.to_hex(),
                "handle": encrypted.handle,
                "proof": encrypted.proof,
            }),
        )
        .await
    }

    pub async fn has_submitted(
        &self,
        reviewer: &Principal,
        id: &PaperId,
    ) -> Result<bool, ClientError> {
        let submitted: Submitted = self
            .post(
                "/scores/has_submitted",
                &json!({ "reviewer": reviewer.to_hex(), "paper_id": id.to_hex() }),
            )
            .await?;
        Ok(submitted.submitted)
    }

    pub async fn final_score(
        &self,
        requester: &Principal,
        id: &PaperId,
    ) -> Result<DisclosureView, ClientError> {
        self.post("/disclosure/final_score", &disclosure_body(requester, id))
            .await
    }

    pub async fn share_total(
        &self,
        requester: &Principal,
        id: &PaperId,
    ) -> Result<DisclosureView, ClientError> {
        self.post("/disclosure/share_total", &disclosure_body(requester, id))
            .await
    }

    pub async fn owner(&self) -> Result<Option<Principal>, ClientError> {
        let view: OwnerView = self.get("/owner").await?;
        Ok(view.owner)
    }

    pub async fn transfer_owner(
        &self,
        caller: &Principal,
        new_owner: &Principal,
    ) -> Result<Option<Principal>, ClientError> {
        let view: OwnerView = self
            .post(
                "/owner/transfer",
                &json!({ "caller": caller.to_hex(), "new_owner": new_owner.to_hex() }),
            )
            .await?;
        Ok(view.owner)
    }

    /// Irreversible. Registration and updates are disabled afterwards.
    pub async fn renounce_owner(
        &self,
        caller: &Principal,
    ) -> Result<Option<Principal>, ClientError> {
        let view: OwnerView = self
            .post("/owner/renounce", &json!({ "caller": caller.to_hex() }))
            .await?;
        Ok(view.owner)
    }
}

fn metadata_body(caller: &Principal, id: &PaperId, metadata: &PaperMetadata) -> serde_json::Value {
    json!({
        "caller": caller.to_hex(),
        "paper_id": id.to_hex(),
        "title": metadata.title,
        "track": metadata.track,
        "author_hash": metadata.author_hash,
    })
}

fn disclosure_body(requester: &Principal, id: &PaperId) -> serde_json::Value {
    json!({ "requester": requester.to_hex(), "paper_id": id.to_hex() })
}
