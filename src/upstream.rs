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

use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::warn;

use crate::config::CONFIG;
use crate::errors::ProxyError;
use crate::points::LocationList;

const ROUTE_TIMEOUT: Duration = Duration::from_secs(30);
const DIRECTIONS_TIMEOUT: Duration = Duration::from_secs(60);
const MATRIX_TIMEOUT: Duration = Duration::from_secs(60);
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(30);

const ROUTING_UNAVAILABLE: &str = "Сервис маршрутизации недоступен";
const MATRIX_UNAVAILABLE: &str = "Сервис построения матрицы недоступен";
const GEOCODE_UNAVAILABLE: &str = "Сервис геокодирования недоступен";

/// Shared, reusable HTTP connection pool for all outbound upstream calls,
/// mirroring the teacher's process-wide static `HTTP_CLIENT`.
static HTTP_CLIENT: Lazy<reqwest::Client> =
    Lazy::new(|| reqwest::Client::builder().build().expect("failed to build HTTP client"));

/// A raw upstream response: status, body, and content type, kept together
/// so non-2xx responses can be forwarded verbatim without reinterpretation.
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

fn api_key() -> String {
    CONFIG.get().expect("CONFIG must be initialized").ors_api_key.clone()
}

fn base_url() -> String {
    CONFIG.get().expect("CONFIG must be initialized").ors_base_url.clone()
}

async fn to_upstream_response(
    resp: reqwest::Response,
) -> Result<UpstreamResponse, reqwest::Error> {
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let body = resp.text().await?;
    Ok(UpstreamResponse {
        status,
        body,
        content_type,
    })
}

/// GET `<base>/v2/directions/<profile>?start=..&end=..`, 30s timeout.
pub async fn fetch_route_simple(
    profile: &str,
    start_raw: &str,
    end_raw: &str,
) -> Result<UpstreamResponse, ProxyError> {
    let url = format!("{}/v2/directions/{}", base_url(), profile);
    let result = HTTP_CLIENT
        .get(&url)
        .query(&[("start", start_raw), ("end", end_raw)])
        .header("Authorization", api_key())
        .timeout(ROUTE_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(resp) => to_upstream_response(resp)
            .await
            .map_err(|e| transport_error(&url, e, ROUTING_UNAVAILABLE)),
        Err(e) => Err(transport_error(&url, e, ROUTING_UNAVAILABLE)),
    }
}

/// POST `<base>/v2/directions/<ors_profile>` with a coordinate list, 60s timeout.
pub async fn fetch_route_directions(
    ors_profile: &str,
    locations: &LocationList,
) -> Result<UpstreamResponse, ProxyError> {
    let url = format!("{}/v2/directions/{}", base_url(), ors_profile);
    let coordinates: Vec<[f64; 2]> = locations.as_slice().iter().map(|p| p.as_pair()).collect();
    let payload = serde_json::json!({
        "coordinates": coordinates,
        "instructions": true,
        "units": "m",
    });

    let result = HTTP_CLIENT
        .post(&url)
        .header("Authorization", api_key())
        .json(&payload)
        .timeout(DIRECTIONS_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(resp) => to_upstream_response(resp)
            .await
            .map_err(|e| transport_error(&url, e, ROUTING_UNAVAILABLE)),
        Err(e) => Err(transport_error(&url, e, ROUTING_UNAVAILABLE)),
    }
}

/// POST `<base>/v2/matrix/<profile>` with locations and metrics, 60s timeout.
pub async fn fetch_matrix(
    profile: &str,
    locations: &LocationList,
    metrics: &[String],
) -> Result<UpstreamResponse, ProxyError> {
    let url = format!("{}/v2/matrix/{}", base_url(), profile);
    let locs: Vec<[f64; 2]> = locations.as_slice().iter().map(|p| p.as_pair()).collect();
    let payload = serde_json::json!({
        "locations": locs,
        "metrics": metrics,
    });

    let result = HTTP_CLIENT
        .post(&url)
        .header("Authorization", api_key())
        .json(&payload)
        .timeout(MATRIX_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(resp) => to_upstream_response(resp)
            .await
            .map_err(|e| transport_error(&url, e, MATRIX_UNAVAILABLE)),
        Err(e) => Err(transport_error(&url, e, MATRIX_UNAVAILABLE)),
    }
}

/// GET `<base>/geocode/search?text=<q>&size=1`, 30s timeout.
pub async fn fetch_geocode(q: &str) -> Result<UpstreamResponse, ProxyError> {
    let url = format!("{}/geocode/search", base_url());
    let result = HTTP_CLIENT
        .get(&url)
        .query(&[("text", q), ("size", "1")])
        .header("Authorization", api_key())
        .timeout(GEOCODE_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(resp) => to_upstream_response(resp)
            .await
            .map_err(|e| transport_error(&url, e, GEOCODE_UNAVAILABLE)),
        Err(e) => Err(transport_error(&url, e, GEOCODE_UNAVAILABLE)),
    }
}

fn transport_error(url: &str, e: reqwest::Error, message: &str) -> ProxyError {
    warn!("upstream request to '{url}' failed: {e}");
    ProxyError::Upstream(message.to_string())
}
