// Copyright (C) 2025 Matías Salinas (support@fenden.com)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::cache::CACHE_STORE;
use crate::config::CONFIG;
use crate::errors::ProxyError;
use crate::fingerprint::fingerprint;
use crate::singleflight::{self, Decision};
use crate::telemetry;
use crate::translate::translate_search;
use crate::upstream;

const NAMESPACE: &str = "geocode";

/// `GET /search?q=` (or `?text=`) — geocoding, translated to a
/// Nominatim-like array on success.
pub async fn get_search(Query(params): Query<HashMap<String, String>>) -> Response {
    let q = params.get("q").or_else(|| params.get("text"));
    let q = match q {
        Some(q) if !q.trim().is_empty() => q.clone(),
        _ => {
            return ProxyError::Parse("Параметр q (или text) обязателен".into()).into_response()
        }
    };

    match handle(q).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

async fn handle(q: String) -> Result<Response, ProxyError> {
    let descriptor = json!({"q": q});
    let fp = fingerprint(NAMESPACE, descriptor);
    let store = CACHE_STORE.get().expect("CACHE_STORE must be initialized").as_ref();

    if let Some(body) = singleflight::lookup(store, &fp).await {
        telemetry::record_cache_hit(NAMESPACE);
        return Ok(json_response(StatusCode::OK, body));
    }
    telemetry::record_cache_miss(NAMESPACE);

    match singleflight::acquire_or_wait(store, &fp).await {
        Decision::CacheHit(body) => {
            telemetry::record_singleflight_wait_hit(NAMESPACE);
            Ok(json_response(StatusCode::OK, body))
        }
        Decision::CallUpstream => {
            telemetry::record_singleflight_leader(NAMESPACE);
            let result = call_upstream_and_publish(store, &fp, &q).await;
            singleflight::release(store, &fp).await;
            result
        }
    }
}

async fn call_upstream_and_publish(
    store: &dyn crate::cache::CacheStore,
    fp: &str,
    q: &str,
) -> Result<Response, ProxyError> {
    telemetry::record_upstream_call(NAMESPACE);
    let resp = match upstream::fetch_geocode(q).await {
        Ok(resp) => resp,
        Err(e) => {
            telemetry::record_upstream_error(NAMESPACE);
            return Err(e);
        }
    };

    if !resp.is_success() {
        telemetry::record_upstream_error(NAMESPACE);
        return Ok((
            StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY),
            [("content-type", resp.content_type.clone())],
            resp.body,
        )
            .into_response());
    }

    let translated = translate_search(&resp.body);
    let ttl = CONFIG.get().expect("CONFIG must be initialized").cache_ttl_sec;
    singleflight::publish(store, fp, &translated, ttl).await;
    Ok(json_response(StatusCode::OK, translated))
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [("content-type", "application/json")], body).into_response()
}
