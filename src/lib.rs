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

// ----------------------
//  Module declarations
// ----------------------
// Internal modules for request parsing, fingerprinting, cache coordination,
// upstream dispatch, response translation, and the HTTP surface itself.
pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod handlers;
pub mod points;
pub mod singleflight;
pub mod telemetry;
pub mod translate;
pub mod upstream;

pub fn build_router() -> axum::Router {
    handlers::router()
}
