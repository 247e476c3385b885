//! HTTP Routes for Inventory
//!
//! All paths below are relative to `/api/items` and already authenticated:
//! - GET    /                      - List items
//! - POST   /                      - Create an item
//! - GET    /low-stock             - Items at or below the low-stock threshold
//! - GET    /{id}                  - Fetch one item
//! - PUT    /{id}                  - Partial update
//! - DELETE /{id}                  - Delete
//! - POST   /{id}/restock          - Rate-limited restock
//! - GET    /{id}/restock-history  - Restock ledger, newest first

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error_response, json_response, method_not_allowed_response, not_found_response,
    parse_json_body, result_response, MessageResponse, ResponseBody,
};
use crate::server::AppState;
use crate::types::{ItemPatch, NewItem, StockItem, StorehouseError};

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct RestockResponse {
    pub message: &'static str,
    pub item: StockItem,
    pub restocks: u64,
}

/// Sub-resource addressed by the path under `/api/items`
#[derive(Debug, PartialEq, Eq)]
enum ItemRoute<'a> {
    Collection,
    LowStock,
    Item(&'a str),
    Restock(&'a str),
    RestockHistory(&'a str),
}

fn parse_route(rest: &str) -> Option<ItemRoute<'_>> {
    let rest = rest.trim_start_matches('/');
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some(ItemRoute::Collection);
    }

    let mut segments = rest.split('/');
    let first = segments.next()?;
    let second = segments.next();
    if segments.next().is_some() {
        return None;
    }

    match (first, second) {
        ("low-stock", None) => Some(ItemRoute::LowStock),
        (id, None) => Some(ItemRoute::Item(id)),
        (id, Some("restock")) => Some(ItemRoute::Restock(id)),
        (id, Some("restock-history")) => Some(ItemRoute::RestockHistory(id)),
        _ => None,
    }
}

fn parse_item_id(raw: &str) -> Result<Uuid, StorehouseError> {
    Uuid::parse_str(raw).map_err(|_| StorehouseError::Validation("invalid item ID".into()))
}

/// Dispatch an authenticated `/api/items` request
pub async fn handle_items_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    rest: &str,
) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let Some(route) = parse_route(rest) else {
        return not_found_response();
    };
    let method = req.method().clone();

    match route {
        ItemRoute::Collection => match method {
            Method::GET => result_response(StatusCode::OK, state.items.list().await),
            Method::POST => handle_create(req, &state).await,
            _ => method_not_allowed_response(),
        },
        ItemRoute::LowStock => match method {
            Method::GET => result_response(StatusCode::OK, state.items.low_stock().await),
            _ => method_not_allowed_response(),
        },
        ItemRoute::Item(raw_id) => {
            if !matches!(method, Method::GET | Method::PUT | Method::DELETE) {
                return method_not_allowed_response();
            }
            let id = match parse_item_id(raw_id) {
                Ok(id) => id,
                Err(e) => return error_response(&e),
            };
            match method {
                Method::GET => result_response(StatusCode::OK, state.items.get(id).await),
                Method::PUT => handle_update(req, &state, id).await,
                _ => match state.items.delete(id).await {
                    Ok(()) => json_response(
                        StatusCode::OK,
                        &MessageResponse {
                            message: "item deleted successfully",
                        },
                    ),
                    Err(e) => error_response(&e),
                },
            }
        }
        ItemRoute::Restock(raw_id) => {
            if method != Method::POST {
                return method_not_allowed_response();
            }
            match parse_item_id(raw_id) {
                Ok(id) => handle_restock(req, &state, id).await,
                Err(e) => error_response(&e),
            }
        }
        ItemRoute::RestockHistory(raw_id) => {
            if method != Method::GET {
                return method_not_allowed_response();
            }
            match parse_item_id(raw_id) {
                Ok(id) => result_response(StatusCode::OK, state.restock.history(id).await),
                Err(e) => error_response(&e),
            }
        }
    }
}

async fn handle_create<B>(req: Request<B>, state: &AppState) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: NewItem = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };
    result_response(StatusCode::CREATED, state.items.create(body).await)
}

async fn handle_update<B>(req: Request<B>, state: &AppState, id: Uuid) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let patch: ItemPatch = match parse_json_body(req).await {
        Ok(patch) => patch,
        Err(e) => return error_response(&e),
    };
    result_response(StatusCode::OK, state.items.update(id, patch).await)
}

async fn handle_restock<B>(req: Request<B>, state: &AppState, id: Uuid) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body: RestockRequest = match parse_json_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    match state.restock.restock(id, body.amount).await {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &RestockResponse {
                message: "item restocked successfully",
                item: outcome.item,
                restocks: outcome.restocks,
            },
        ),
        Err(e) => error_response(&e),
    }
}
