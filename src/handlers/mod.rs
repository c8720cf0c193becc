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

pub mod health;
pub mod route;
pub mod route_v1;
pub mod search;
pub mod table;

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::auth::require_token;

/// Builds the full router: `/health` and `/metrics` are open; every proxy
/// endpoint sits behind the `X-Proxy-Token` gate.
pub fn router() -> Router {
    let protected = Router::new()
        .route("/route", get(route::get_route))
        .route("/route/v1/:profile/:coords", get(route_v1::get_route_v1))
        .route("/table", get(table::get_table).post(table::post_table))
        .route("/search", get(search::get_search))
        .layer(middleware::from_fn(require_token));

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
}
