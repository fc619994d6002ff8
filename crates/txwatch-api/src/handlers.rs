//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use txwatch_core::parser::Parser;

use crate::error::ApiError;
use crate::types::{AddressRequest, ApiResponse, CurrentBlock, Empty, Liveness, TransactionList};
use crate::validation::validate_address;
use crate::ApiState;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

fn parse_body(body: Result<Json<AddressRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request payload");
        ApiError::MalformedRequest
    })?;
    validate_address(&req.address)
}

// ─── Block ───────────────────────────────────────────────────────────────────

pub async fn current_block(State(state): State<ApiState>) -> ApiResponse<CurrentBlock> {
    ApiResponse::ok(CurrentBlock {
        last_indexed_block: state.parser.current_block_number(),
    })
}

// ─── Address ─────────────────────────────────────────────────────────────────

pub async fn subscribe(
    State(state): State<ApiState>,
    body: Result<Json<AddressRequest>, JsonRejection>,
) -> ApiResult<Empty> {
    let address = parse_body(body)?;
    state.parser.try_subscribe(&address)?;
    Ok(ApiResponse::ok(Empty {}))
}

pub async fn unsubscribe(
    State(state): State<ApiState>,
    body: Result<Json<AddressRequest>, JsonRejection>,
) -> ApiResult<Empty> {
    let address = parse_body(body)?;
    state.parser.try_unsubscribe(&address)?;
    Ok(ApiResponse::ok(Empty {}))
}

pub async fn transactions(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<TransactionList> {
    let address = validate_address(&address)?;
    let transactions = state
        .parser
        .transactions(&address)
        .ok_or(ApiError::AddressNotSubscribed)?;
    Ok(ApiResponse::ok(TransactionList { transactions }))
}

// ─── Health ──────────────────────────────────────────────────────────────────

pub async fn ready(State(state): State<ApiState>) -> ApiResult<Empty> {
    if !state.parser.is_ready() {
        return Err(ApiError::NotReady);
    }
    Ok(ApiResponse::ok(Empty {}))
}

pub async fn live(State(state): State<ApiState>) -> ApiResponse<Liveness> {
    ApiResponse::ok(Liveness {
        state: state.parser.state(),
        ready: state.parser.is_ready(),
        last_indexed_block: state.parser.current_block_number(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
