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

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use crate::cache::CACHE_STORE;
use crate::config::CONFIG;
use crate::errors::ProxyError;
use crate::fingerprint::fingerprint;
use crate::points::{parse_locations, LocationList, Point};
use crate::singleflight::{self, Decision};
use crate::telemetry;
use crate::upstream;

const NAMESPACE: &str = "table";

/// `GET /table?profile=&metrics=&locations=` — `locations` is a
/// `lon,lat;...` string, same grammar as every other endpoint.
pub async fn get_table(Query(params): Query<HashMap<String, String>>) -> Response {
    let raw = match params.get("locations") {
        Some(raw) => raw,
        None => return ProxyError::Parse("Параметр locations обязателен".into()).into_response(),
    };
    let locations = match parse_locations(raw) {
        Ok(locations) => locations,
        Err(e) => return e.into_response(),
    };

    let (profile, metrics) = parse_common(&params);
    match handle(profile, metrics, locations).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

/// `POST /table` — `locations` is a JSON array of `[lon, lat]` pairs in the
/// body; `profile`/`metrics` still come from the query string, matching the
/// original's mixed query+body shape.
pub async fn post_table(Query(params): Query<HashMap<String, String>>, body: Bytes) -> Response {
    // Mirrors the original's `request.get_json(silent=True) or {}`: a
    // missing or malformed body is treated as an empty object rather than
    // rejected outright, so the "locations" check below produces the
    // localized parse error instead of a generic deserialization failure.
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let locations = match parse_locations_body(&body) {
        Some(locations) => locations,
        None => {
            return ProxyError::Parse("Не удалось разобрать список координат".into())
                .into_response()
        }
    };

    let (profile, metrics) = parse_common(&params);
    match handle(profile, metrics, locations).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

fn parse_common(params: &HashMap<String, String>) -> (String, Vec<String>) {
    let profile = params.get("profile").cloned().unwrap_or_else(|| "driving-car".to_string());
    let metrics_raw = params.get("metrics").cloned().unwrap_or_else(|| "distance,duration".to_string());
    let metrics: Vec<String> = metrics_raw
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    (profile, metrics)
}

fn parse_locations_body(body: &Value) -> Option<LocationList> {
    let array = body.get("locations")?.as_array()?;
    let mut points = Vec::with_capacity(array.len());
    for entry in array {
        let pair = entry.as_array()?;
        if pair.len() != 2 {
            return None;
        }
        let lon = pair[0].as_f64()?;
        let lat = pair[1].as_f64()?;
        points.push(Point { lon, lat });
    }
    if points.len() < 2 {
        return None;
    }
    Some(LocationList(points))
}

async fn handle(
    profile: String,
    metrics: Vec<String>,
    locations: LocationList,
) -> Result<Response, ProxyError> {
    let coordinates: Vec<[f64; 2]> = locations.as_slice().iter().map(|p| p.as_pair()).collect();
    let descriptor = json!({"profile": profile, "metrics": metrics, "locations": coordinates});
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
            let result = call_upstream_and_publish(store, &fp, &profile, &locations, &metrics).await;
            singleflight::release(store, &fp).await;
            result
        }
    }
}

async fn call_upstream_and_publish(
    store: &dyn crate::cache::CacheStore,
    fp: &str,
    profile: &str,
    locations: &LocationList,
    metrics: &[String],
) -> Result<Response, ProxyError> {
    telemetry::record_upstream_call(NAMESPACE);
    let resp = match upstream::fetch_matrix(profile, locations, metrics).await {
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

    let ttl = CONFIG.get().expect("CONFIG must be initialized").cache_ttl_sec;
    singleflight::publish(store, fp, &resp.body, ttl).await;
    Ok(json_response(StatusCode::OK, resp.body))
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [("content-type", "application/json")], body).into_response()
}
