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

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::cache::CACHE_STORE;
use crate::config::CONFIG;
use crate::errors::ProxyError;
use crate::fingerprint::fingerprint;
use crate::points::{parse_locations, LocationList};
use crate::singleflight::{self, Decision};
use crate::telemetry;
use crate::translate::{map_osrm_profile, translate_route_v1};
use crate::upstream;

const NAMESPACE: &str = "route_v1";

/// `GET /route/v1/<profile>/<coords>` — OSRM-compatible routing path.
pub async fn get_route_v1(Path((profile, coords)): Path<(String, String)>) -> Response {
    match handle(profile, coords).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

async fn handle(profile: String, coords: String) -> Result<Response, ProxyError> {
    let locations = parse_locations(&coords)?;
    let ors_profile = map_osrm_profile(&profile);

    let coordinates: Vec<[f64; 2]> = locations.as_slice().iter().map(|p| p.as_pair()).collect();
    let descriptor = json!({"profile": ors_profile, "locations": coordinates});
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
            let result = call_upstream_and_publish(store, &fp, &ors_profile, &locations).await;
            singleflight::release(store, &fp).await;
            result
        }
    }
}

async fn call_upstream_and_publish(
    store: &dyn crate::cache::CacheStore,
    fp: &str,
    ors_profile: &str,
    locations: &LocationList,
) -> Result<Response, ProxyError> {
    telemetry::record_upstream_call(NAMESPACE);
    let resp = match upstream::fetch_route_directions(ors_profile, locations).await {
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

    let translated = match resp.json() {
        Some(upstream_json) => translate_route_v1(&upstream_json, locations),
        None => resp.body,
    };

    let ttl = CONFIG.get().expect("CONFIG must be initialized").cache_ttl_sec;
    singleflight::publish(store, fp, &translated, ttl).await;
    Ok(json_response(StatusCode::OK, translated))
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [("content-type", "application/json")], body).into_response()
}
