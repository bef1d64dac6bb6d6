//! Proposal and negotiation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::Proposal;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::proposal::{
    AcceptedProposal, CounterOfferInput, ProposalListQuery, ProposalView, SubmitProposalInput,
};
use crate::services::ProposalService;
use crate::AppState;

/// Submit a proposal against a requirement
pub async fn submit_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bid_id): Path<Uuid>,
    Json(body): Json<SubmitProposalInput>,
) -> AppResult<(StatusCode, Json<Proposal>)> {
    let service = ProposalService::new(state.db.clone());
    let proposal = service.submit_proposal(&user, bid_id, body).await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

/// Proposals on a requirement
pub async fn list_bid_proposals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(bid_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProposalView>>> {
    let service = ProposalService::new(state.db.clone());
    Ok(Json(service.list_for_bid(&user, bid_id).await?))
}

/// The caller's own proposals
pub async fn list_my_proposals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ProposalListQuery>,
) -> AppResult<Json<Vec<ProposalView>>> {
    let service = ProposalService::new(state.db.clone());
    Ok(Json(service.list_mine(&user, query).await?))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<Json<ProposalView>> {
    let service = ProposalService::new(state.db.clone());
    Ok(Json(service.get_proposal(&user, proposal_id).await?))
}

/// Counter the current offer
pub async fn counter_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
    Json(body): Json<CounterOfferInput>,
) -> AppResult<Json<Proposal>> {
    let service = ProposalService::new(state.db.clone());
    Ok(Json(service.counter_offer(&user, proposal_id, body).await?))
}

/// Accept the current offer and place the order
pub async fn accept_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<AcceptedProposal>)> {
    let service = ProposalService::new(state.db.clone());
    let accepted = service.accept_proposal(&user, proposal_id).await?;
    Ok((StatusCode::CREATED, Json(accepted)))
}

/// Reject or withdraw a proposal
pub async fn reject_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<Json<Proposal>> {
    let service = ProposalService::new(state.db.clone());
    Ok(Json(service.reject_proposal(&user, proposal_id).await?))
}
