//! RPC request/response types and handlers.
//!
//! Handlers are thin: they parse the request, call one
//! [`ProtocolContext`] operation and render the result. Amounts travel as
//! decimal strings and content hashes as hex, both through the types' own
//! serde impls.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use daiv_escrow::Stake;
use daiv_governance::{
    Proposal, ProposalAction, ProposalDraft, ProposalFilter, ProposalStatus, ScheduledExecution,
    VoteChoice,
};
use daiv_ledger::{Account, RewardRecord};
use daiv_node::{ExecutionReceipt, ProtocolContext};
use daiv_registry::{DatasetFilter, DatasetMetadata, DatasetRecord, Submission};
use daiv_types::{
    AccountId, ContentHash, DatasetId, DatasetStatus, ProposalId, ProtocolParams, Timestamp,
    TokenAmount,
};

use crate::error::RpcError;
use crate::pagination::{Page, PaginationParams};

pub type Ctx = State<Arc<ProtocolContext>>;
pub type ApiResult<T> = Result<Json<T>, RpcError>;

fn dataset_id(path: Result<Path<u64>, PathRejection>) -> Result<DatasetId, RpcError> {
    Ok(DatasetId::new(path?.0))
}

fn proposal_id(path: Result<Path<u64>, PathRejection>) -> Result<ProposalId, RpcError> {
    Ok(ProposalId::new(path?.0))
}

// ── Health & node ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub now: Timestamp,
}

pub async fn health(State(ctx): Ctx) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        now: ctx.now(),
    })
}

pub async fn metrics(State(ctx): Ctx) -> Result<Response, RpcError> {
    let body = ctx
        .metrics()
        .encode()
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

pub async fn params(State(ctx): Ctx) -> Json<ProtocolParams> {
    Json(ctx.params())
}

#[derive(Serialize)]
pub struct SupplyResponse {
    pub total_supply: TokenAmount,
    pub total_minted: TokenAmount,
    pub escrowed: TokenAmount,
}

pub async fn supply(State(ctx): Ctx) -> Json<SupplyResponse> {
    let s = ctx.supply();
    Json(SupplyResponse {
        total_supply: s.total_supply,
        total_minted: s.total_minted,
        escrowed: s.escrowed,
    })
}

// ── Accounts ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub account: Account,
    pub effective_voting_power: u64,
}

pub async fn account(
    State(ctx): Ctx,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<AccountResponse> {
    let id = AccountId::new(path?.0);
    let account = ctx.get_account(&id)?;
    Ok(Json(AccountResponse {
        effective_voting_power: ctx.voting_power(&id),
        account,
    }))
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub account: AccountId,
    pub balance: TokenAmount,
}

pub async fn account_balance(
    State(ctx): Ctx,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<BalanceResponse> {
    let account = AccountId::new(path?.0);
    Ok(Json(BalanceResponse {
        balance: ctx.get_account_balance(&account),
        account,
    }))
}

#[derive(Deserialize)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: TokenAmount,
}

pub async fn transfer(
    State(ctx): Ctx,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<StatusCode, RpcError> {
    let Json(req) = body?;
    ctx.transfer(req.from, req.to, req.amount)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct DelegateRequest {
    pub from: AccountId,
    pub to: AccountId,
}

pub async fn delegate(
    State(ctx): Ctx,
    body: Result<Json<DelegateRequest>, JsonRejection>,
) -> Result<StatusCode, RpcError> {
    let Json(req) = body?;
    ctx.delegate(req.from, req.to)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn undelegate(
    State(ctx): Ctx,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, RpcError> {
    ctx.undelegate(AccountId::new(path?.0))?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Datasets ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitDatasetRequest {
    pub contributor: AccountId,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    /// Used when `metadata` is absent.
    #[serde(default)]
    pub metadata_fields_filled: u32,
    /// When present, the filled-field count is derived from it.
    #[serde(default)]
    pub metadata: Option<DatasetMetadata>,
    pub stake: TokenAmount,
}

impl SubmitDatasetRequest {
    fn into_submission(self) -> Submission {
        match self.metadata {
            Some(metadata) => Submission::with_metadata(
                self.contributor,
                self.content_hash,
                self.size_bytes,
                metadata,
                self.stake,
            ),
            None => Submission::new(
                self.contributor,
                self.content_hash,
                self.size_bytes,
                self.metadata_fields_filled,
                self.stake,
            ),
        }
    }
}

pub async fn submit_dataset(
    State(ctx): Ctx,
    body: Result<Json<SubmitDatasetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DatasetRecord>), RpcError> {
    let Json(req) = body?;
    let id = ctx.submit_dataset(req.into_submission())?;
    Ok((StatusCode::CREATED, Json(ctx.get_dataset(id)?)))
}

/// `GET /datasets?status=&category=&tag=&contributor=&cursor=&count=`
pub async fn list_datasets(
    State(ctx): Ctx,
    query: Result<Query<PaginationParams>, QueryRejection>,
    filter: Result<Query<DatasetFilter>, QueryRejection>,
) -> ApiResult<Page<DatasetRecord>> {
    let Query(page) = query?;
    let Query(filter) = filter?;
    let offset = page.decode_offset();
    let count = page.effective_count();
    let items = ctx.list_datasets(
        &filter,
        usize::try_from(offset).unwrap_or(usize::MAX),
        count as usize,
    );
    Ok(Json(Page::new(items, offset, count)))
}

pub async fn get_dataset(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<DatasetRecord> {
    Ok(Json(ctx.get_dataset(dataset_id(path)?)?))
}

#[derive(Serialize)]
pub struct DatasetStatusResponse {
    pub dataset_id: DatasetId,
    pub status: DatasetStatus,
}

pub async fn dataset_status(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<DatasetStatusResponse> {
    let dataset_id = dataset_id(path)?;
    Ok(Json(DatasetStatusResponse {
        dataset_id,
        status: ctx.get_dataset_status(dataset_id)?,
    }))
}

pub async fn dataset_stake(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Stake> {
    Ok(Json(ctx.get_stake(dataset_id(path)?)?))
}

#[derive(Deserialize)]
pub struct OpenForVoteRequest {
    pub proposer: AccountId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub async fn open_for_vote(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<OpenForVoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Proposal>), RpcError> {
    let dataset = dataset_id(path)?;
    let Json(req) = body?;
    let id = ctx.open_for_vote(dataset, req.proposer, req.title, req.description)?;
    Ok((StatusCode::CREATED, Json(ctx.get_proposal(id)?)))
}

#[derive(Deserialize)]
pub struct UsageRequest {
    pub cumulative_downloads: u64,
}

#[derive(Serialize)]
pub struct UsageResponse {
    /// Absent when the downloads since the last payout earn nothing yet.
    pub reward: Option<RewardRecord>,
    pub usage_baseline: u64,
}

pub async fn record_usage(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<UsageRequest>, JsonRejection>,
) -> ApiResult<UsageResponse> {
    let dataset = dataset_id(path)?;
    let Json(req) = body?;
    let reward = ctx.record_usage(dataset, req.cumulative_downloads)?;
    Ok(Json(UsageResponse {
        reward,
        usage_baseline: ctx.get_dataset(dataset)?.usage_baseline,
    }))
}

// ── Proposals ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OpenProposalRequest {
    pub proposer: AccountId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub action: ProposalAction,
}

pub async fn open_proposal(
    State(ctx): Ctx,
    body: Result<Json<OpenProposalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Proposal>), RpcError> {
    let Json(req) = body?;
    let id = ctx.open_proposal(ProposalDraft {
        proposer: req.proposer,
        title: req.title,
        description: req.description,
        action: req.action,
    })?;
    Ok((StatusCode::CREATED, Json(ctx.get_proposal(id)?)))
}

/// `GET /proposals?status=&kind=&cursor=&count=`
pub async fn list_proposals(
    State(ctx): Ctx,
    query: Result<Query<PaginationParams>, QueryRejection>,
    filter: Result<Query<ProposalFilter>, QueryRejection>,
) -> ApiResult<Page<Proposal>> {
    let Query(page) = query?;
    let Query(filter) = filter?;
    let offset = page.decode_offset();
    let count = page.effective_count();
    let items = ctx.list_proposals(
        &filter,
        usize::try_from(offset).unwrap_or(usize::MAX),
        count as usize,
    );
    Ok(Json(Page::new(items, offset, count)))
}

pub async fn get_proposal(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Proposal> {
    Ok(Json(ctx.get_proposal(proposal_id(path)?)?))
}

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub voter: AccountId,
    pub choice: VoteChoice,
}

pub async fn cast_vote(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> ApiResult<Proposal> {
    let id = proposal_id(path)?;
    let Json(req) = body?;
    Ok(Json(ctx.cast_vote(id, req.voter, req.choice)?))
}

#[derive(Serialize)]
pub struct TallyResponse {
    pub proposal_id: ProposalId,
    pub outcome: ProposalStatus,
}

pub async fn tally_proposal(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<TallyResponse> {
    let proposal_id = proposal_id(path)?;
    Ok(Json(TallyResponse {
        proposal_id,
        outcome: ctx.tally_proposal(proposal_id)?,
    }))
}

pub async fn queue_proposal(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<ScheduledExecution> {
    Ok(Json(ctx.queue_proposal(proposal_id(path)?)?))
}

pub async fn get_schedule(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<ScheduledExecution> {
    Ok(Json(ctx.get_schedule(proposal_id(path)?)?))
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: AccountId,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    pub proposal_id: ProposalId,
    pub action: ProposalAction,
    pub executed_at: Timestamp,
    pub minted: Option<RewardRecord>,
}

impl From<ExecutionReceipt> for ExecuteResponse {
    fn from(r: ExecutionReceipt) -> Self {
        Self {
            proposal_id: r.proposal_id,
            action: r.action,
            executed_at: r.executed_at,
            minted: r.minted,
        }
    }
}

pub async fn execute_proposal(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<CallerRequest>, JsonRejection>,
) -> ApiResult<ExecuteResponse> {
    let id = proposal_id(path)?;
    let Json(req) = body?;
    Ok(Json(ctx.execute_proposal(id, req.caller)?.into()))
}

pub async fn cancel_proposal(
    State(ctx): Ctx,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<CallerRequest>, JsonRejection>,
) -> ApiResult<Proposal> {
    let id = proposal_id(path)?;
    let Json(req) = body?;
    ctx.cancel_proposal(id, req.caller)?;
    Ok(Json(ctx.get_proposal(id)?))
}
