// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Which business a request acts for.
//!
//! Regular callers act for the business in their [`Claims`]. Super admins
//! (business id 0) name the business per request: a `business_id` query
//! parameter, or a `business_id` or `order_uuid` field in the JSON body.
//! The body is buffered to look, then handed on intact.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use conecta_core::{ConectaError, Storage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

/// Largest body buffered while resolving a super admin's business.
pub const MAX_PEEK_BYTES: usize = 1024 * 1024;

pub const BUSINESS_ID_HEADER: &str = "x-business-id";
pub const SUPER_ADMIN_HEADER: &str = "x-super-admin";

/// Identity established by the authenticating layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub business_id: i64,
    #[serde(default)]
    pub super_admin: bool,
}

impl Claims {
    pub fn is_super_admin(&self) -> bool {
        self.super_admin || self.business_id == 0
    }
}

/// The business a request was resolved to.
///
/// `None` only for super admins that did not name a business; such
/// requests may read across businesses but cannot create anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessScope(Option<i64>);

impl BusinessScope {
    pub fn business(business_id: i64) -> Self {
        Self(Some(business_id))
    }

    pub fn unscoped() -> Self {
        Self(None)
    }

    pub fn business_id(&self) -> Option<i64> {
        self.0
    }

    pub fn require(&self) -> Result<i64, ConectaError> {
        self.0.ok_or(ConectaError::SuperAdminBusinessRequired)
    }
}

/// Builds [`Claims`] from headers set by a trusted proxy, unless an
/// earlier layer already inserted them.
pub async fn claims_from_headers(mut request: Request, next: Next) -> Response {
    if request.extensions().get::<Claims>().is_none() {
        let headers = request.headers();
        let business_id = headers
            .get(BUSINESS_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok());
        let super_admin = headers
            .get(SUPER_ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let Some(business_id) = business_id else {
            return StatusCode::UNAUTHORIZED.into_response();
        };
        request.extensions_mut().insert(Claims {
            business_id,
            super_admin,
        });
    }
    next.run(request).await
}

/// Resolves the [`BusinessScope`] and stores it as a request extension.
pub async fn business_scope(
    State(storage): State<Arc<dyn Storage>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(claims) = request.extensions().get::<Claims>().copied() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !claims.is_super_admin() {
        let mut request = request;
        request
            .extensions_mut()
            .insert(BusinessScope::business(claims.business_id));
        return next.run(request).await;
    }

    match resolve_super_admin(storage.as_ref(), request).await {
        Ok((mut request, scope)) => {
            debug!(business_id = ?scope.business_id(), path = %request.uri().path(), "super admin scope resolved");
            request.extensions_mut().insert(scope);
            next.run(request).await
        }
        Err(response) => response,
    }
}

async fn resolve_super_admin(
    storage: &dyn Storage,
    request: Request,
) -> Result<(Request, BusinessScope), Response> {
    if let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(request.uri()) {
        if let Some(id) = params.get("business_id").and_then(|v| v.parse::<i64>().ok()) {
            if id > 0 {
                return Ok((request, BusinessScope::business(id)));
            }
        }
    }

    let (parts, body) = request.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, MAX_PEEK_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE.into_response())?;

    let scope = match business_from_body(storage, &bytes).await {
        Ok(Some(id)) => BusinessScope::business(id),
        Ok(None) => BusinessScope::unscoped(),
        Err(e) => return Err(ApiError(e).into_response()),
    };
    Ok((Request::from_parts(parts, Body::from(bytes)), scope))
}

/// `business_id` wins over `order_uuid`; bodies that are not JSON objects
/// name no business.
async fn business_from_body(storage: &dyn Storage, bytes: &[u8]) -> Result<Option<i64>, ConectaError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(bytes) else {
        return Ok(None);
    };
    if let Some(id) = body.get("business_id").and_then(Value::as_i64) {
        if id > 0 {
            return Ok(Some(id));
        }
    }
    match body.get("order_uuid").and_then(Value::as_str) {
        Some(order_id) => {
            let order = storage
                .get_order(order_id)
                .await?
                .ok_or_else(|| ConectaError::not_found("order", order_id))?;
            Ok(Some(order.business_id))
        }
        None => Ok(None),
    }
}
