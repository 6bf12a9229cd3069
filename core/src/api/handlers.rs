//! API Handlers
//!
//! Request handlers for the HTTP API. Mutations go through the
//! [`LedgerService`]; reads hit the ledger directly.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use log::{error, info, warn};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use super::types::*;
use crate::ledger::{LedgerError, LedgerService};
use scribe_fhe::{CiphertextHandle, EncryptedValueService, FheError, InputProof};
use scribe_paper::{
    DEFAULT_MIN_REVIEWS, MAX_SCORE, MIN_SCORE, PROTOCOL_ID, PaperId, PaperMetadata, Principal,
    SortOrder, sort_papers,
};

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<LedgerService>,
    pub fhe: Arc<dyn EncryptedValueService>,
    pub dev_mode: bool,
    pub start_time: std::time::Instant,
}

// ============================================================================
// Helpers
// ============================================================================

fn bad_request(msg: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(msg)),
    )
        .into_response()
}

fn parse_paper_id(s: &str) -> Result<PaperId, Response> {
    PaperId::from_hex(s).map_err(|e| bad_request(format!("Invalid paper ID: {}", e)))
}

fn parse_principal(s: &str) -> Result<Principal, Response> {
    let s = s.trim();
    if s.is_empty() {
        return Err(bad_request("Missing principal"));
    }
    Ok(Principal::resolve(s))
}

pub fn ledger_status(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExists(_)
        | LedgerError::AlreadySubmitted { .. }
        | LedgerError::NoScoresYet(_) => StatusCode::CONFLICT,
        LedgerError::InvalidMetadata(_) | LedgerError::InvalidProof(_) => StatusCode::BAD_REQUEST,
        LedgerError::NotOwner(_) => StatusCode::FORBIDDEN,
        LedgerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Fhe(_) | LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ledger_error_response(e: LedgerError) -> Response {
    let status = ledger_status(&e);
    if status.is_server_error() {
        error!("Ledger failure: {}", e);
    }
    (status, Json(ErrorResponse::new(e.to_string(), e.code()))).into_response()
}

fn fhe_error_response(e: FheError) -> Response {
    match e {
        FheError::Unauthorized(msg) => {
            warn!("Decrypt refused: {}", msg);
            (StatusCode::FORBIDDEN, Json(ErrorResponse::forbidden(msg))).into_response()
        }
        FheError::InvalidEncoding(msg) | FheError::UnknownHandle(msg) => bad_request(msg),
        other => {
            error!("Coprocessor failure: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal(other.to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Health & Status
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let paper_count = state.service.ledger().registry.count().unwrap_or(0);

    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_id: PROTOCOL_ID,
        uptime_secs: state.start_time.elapsed().as_secs(),
        paper_count,
    })
}

pub async fn bounds() -> impl IntoResponse {
    Json(BoundsResponse {
        min_score: MIN_SCORE,
        max_score: MAX_SCORE,
        min_reviews: DEFAULT_MIN_REVIEWS,
    })
}

// ============================================================================
// Papers
// ============================================================================

/// List papers, in registration order unless `sort` says otherwise
pub async fn list_papers(
    State(state): State<ApiState>,
    Query(query): Query<ListPapersQuery>,
) -> Response {
    let order = match query.sort.as_deref() {
        Some(s) => match s.parse::<SortOrder>() {
            Ok(order) => order,
            Err(e) => return bad_request(e),
        },
        None => SortOrder::default(),
    };

    match state.service.ledger().registry.list() {
        Ok(mut papers) => {
            sort_papers(&mut papers, order);
            let papers: Vec<PaperResponse> = papers.into_iter().map(Into::into).collect();
            Json(PapersResponse {
                count: papers.len(),
                papers,
            })
            .into_response()
        }
        Err(e) => ledger_error_response(e),
    }
}

/// Paper ids in registration order
pub async fn list_paper_ids(State(state): State<ApiState>) -> Response {
    match state.service.ledger().registry.ids() {
        Ok(ids) => Json(PaperIdsResponse {
            count: ids.len(),
            ids,
        })
        .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

pub async fn get_paper(
    State(state): State<ApiState>,
    Json(req): Json<GetPaperRequest>,
) -> Response {
    let id = match parse_paper_id(&req.paper_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.ledger().registry.get(&id) {
        Ok(paper) => Json(PaperResponse::from(paper)).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

pub async fn register_paper(
    State(state): State<ApiState>,
    Json(req): Json<PaperMetadataRequest>,
) -> Response {
    let (caller, id) = match (parse_principal(&req.caller), parse_paper_id(&req.paper_id)) {
        (Ok(caller), Ok(id)) => (caller, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let metadata = PaperMetadata::new(req.title, req.track, req.author_hash);

    match state.service.register(caller, id, metadata).await {
        Ok(paper) => {
            info!("Registered paper {} via API", paper.id);
            (StatusCode::CREATED, Json(PaperResponse::from(paper))).into_response()
        }
        Err(e) => ledger_error_response(e),
    }
}

pub async fn update_paper(
    State(state): State<ApiState>,
    Json(req): Json<PaperMetadataRequest>,
) -> Response {
    let (caller, id) = match (parse_principal(&req.caller), parse_paper_id(&req.paper_id)) {
        (Ok(caller), Ok(id)) => (caller, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let metadata = PaperMetadata::new(req.title, req.track, req.author_hash);

    match state.service.update(caller, id, metadata).await {
        Ok(paper) => Json(PaperResponse::from(paper)).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

// ============================================================================
// Scores
// ============================================================================

pub async fn submit_score(
    State(state): State<ApiState>,
    Json(req): Json<SubmitScoreRequest>,
) -> Response {
    let (reviewer, id) = match (parse_principal(&req.reviewer), parse_paper_id(&req.paper_id)) {
        (Ok(reviewer), Ok(id)) => (reviewer, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let handle = match CiphertextHandle::from_hex(&req.handle) {
        Ok(h) => h,
        Err(e) => return bad_request(format!("Invalid handle: {}", e)),
    };
    let proof = match InputProof::from_hex(&req.proof) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("Invalid proof encoding: {}", e)),
    };

    match state.service.submit(reviewer, id, handle, proof).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

pub async fn has_submitted(
    State(state): State<ApiState>,
    Json(req): Json<HasSubmittedRequest>,
) -> Response {
    let (reviewer, id) = match (parse_principal(&req.reviewer), parse_paper_id(&req.paper_id)) {
        (Ok(reviewer), Ok(id)) => (reviewer, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match state.service.ledger().scores.has_submitted(&id, &reviewer) {
        Ok(submitted) => Json(HasSubmittedResponse {
            paper_id: id,
            reviewer,
            submitted,
        })
        .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

// ============================================================================
// Disclosure
// ============================================================================

pub async fn final_score(
    State(state): State<ApiState>,
    Json(req): Json<DisclosureRequest>,
) -> Response {
    let (requester, id) = match (parse_principal(&req.requester), parse_paper_id(&req.paper_id)) {
        (Ok(requester), Ok(id)) => (requester, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match state.service.prepare_average(requester, id).await {
        Ok(disclosure) => Json(DisclosureResponse::from(disclosure)).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

pub async fn share_total(
    State(state): State<ApiState>,
    Json(req): Json<DisclosureRequest>,
) -> Response {
    let (requester, id) = match (parse_principal(&req.requester), parse_paper_id(&req.paper_id)) {
        (Ok(requester), Ok(id)) => (requester, id),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match state.service.share_total(requester, id).await {
        Ok(disclosure) => Json(DisclosureResponse::from(disclosure)).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

// ============================================================================
// Ownership
// ============================================================================

pub async fn get_owner(State(state): State<ApiState>) -> Response {
    match state.service.ledger().registry.owner() {
        Ok(owner) => Json(OwnerResponse { owner }).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

pub async fn transfer_owner(
    State(state): State<ApiState>,
    Json(req): Json<TransferOwnerRequest>,
) -> Response {
    let (caller, new_owner) = match (parse_principal(&req.caller), parse_principal(&req.new_owner))
    {
        (Ok(caller), Ok(new_owner)) => (caller, new_owner),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match state.service.transfer_ownership(caller, new_owner).await {
        Ok(()) => Json(OwnerResponse {
            owner: Some(new_owner),
        })
        .into_response(),
        Err(e) => ledger_error_response(e),
    }
}

pub async fn renounce_owner(
    State(state): State<ApiState>,
    Json(req): Json<RenounceOwnerRequest>,
) -> Response {
    let caller = match parse_principal(&req.caller) {
        Ok(caller) => caller,
        Err(resp) => return resp,
    };

    match state.service.renounce_ownership(caller).await {
        Ok(()) => Json(OwnerResponse { owner: None }).into_response(),
        Err(e) => ledger_error_response(e),
    }
}

// ============================================================================
// Relayer
// ============================================================================

/// Encrypt a score on behalf of a submitter
pub async fn relayer_encrypt(
    State(state): State<ApiState>,
    Json(req): Json<EncryptRequest>,
) -> Response {
    let submitter = match parse_principal(&req.submitter) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.fhe.encrypt(req.value, &submitter) {
        Ok(input) => Json(EncryptResponse {
            handle: input.handle.to_hex(),
            proof: input.proof.to_hex(),
        })
        .into_response(),
        Err(e) => fhe_error_response(e),
    }
}

/// Redeem a decryption authorization
pub async fn relayer_decrypt(
    State(state): State<ApiState>,
    Json(req): Json<DecryptRequest>,
) -> Response {
    let requester = match parse_principal(&req.requester) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.fhe.decrypt(&req.authorization, &requester) {
        Ok(value) => Json(DecryptResponse { value }).into_response(),
        Err(e) => fhe_error_response(e),
    }
}

// ============================================================================
// Events
// ============================================================================

/// Server-sent stream of ledger events. Lagging subscribers skip dropped events.
pub async fn events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.service.ledger().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(event) => Event::default()
            .event(event.name())
            .json_data(&event)
            .ok()
            .map(Ok),
        Err(e) => {
            warn!("Event subscriber lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============================================================================
// Dev Mode
// ============================================================================

/// Plaintext total of a paper. Only routed when dev_mode is enabled.
pub async fn dev_plain_sum(
    State(state): State<ApiState>,
    Json(req): Json<GetPaperRequest>,
) -> Response {
    if !state.dev_mode {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::forbidden("Dev mode not enabled")),
        )
            .into_response();
    }

    let id = match parse_paper_id(&req.paper_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let ledger = state.service.ledger();
    let review_count = match ledger.registry.get(&id) {
        Ok(paper) => paper.review_count,
        Err(e) => return ledger_error_response(e),
    };

    match ledger.scores.plain_sum(&id) {
        Ok(sum) => {
            warn!("DEV: revealed plaintext total of {}", id);
            Json(PlainSumResponse {
                paper_id: id,
                sum,
                review_count,
            })
            .into_response()
        }
        Err(e) => ledger_error_response(e),
    }
}
