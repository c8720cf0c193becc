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

use metrics::counter;

/// Records a cache lookup outcome for `endpoint` (one of
/// `route`/`route_v1`/`table`/`geocode`).
pub fn record_cache_hit(endpoint: &str) {
    counter!("geoproxy_cache_hits_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_cache_miss(endpoint: &str) {
    counter!("geoproxy_cache_misses_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Records that a caller became the single-flight leader and must call
/// upstream itself.
pub fn record_singleflight_leader(endpoint: &str) {
    counter!("geoproxy_singleflight_leader_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Records that a caller waited on a peer and observed the published result.
pub fn record_singleflight_wait_hit(endpoint: &str) {
    counter!("geoproxy_singleflight_wait_hit_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Records that a caller's wait for a peer's result exceeded
/// `LOCK_MAX_WAIT_SEC` and it fell through to an independent upstream call.
pub fn record_singleflight_timeout(endpoint: &str) {
    counter!("geoproxy_singleflight_timeout_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_upstream_call(endpoint: &str) {
    counter!("geoproxy_upstream_calls_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_upstream_error(endpoint: &str) {
    counter!("geoproxy_upstream_errors_total", "endpoint" => endpoint.to_string()).increment(1);
}
