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

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::CONFIG;
use crate::errors::ProxyError;

const TOKEN_HEADER: &str = "X-Proxy-Token";

/// Rejects the request before it reaches any handler unless `X-Proxy-Token`
/// matches the configured `PROXY_TOKEN` exactly. Applied to every route
/// except `/health` and `/metrics`.
pub async fn require_token<B>(request: Request<B>, next: Next<B>) -> Response {
    let expected = &CONFIG.get().expect("CONFIG must be initialized").proxy_token;

    let presented = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if token == expected => next.run(request).await,
        _ => ProxyError::Auth.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use std::env;
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn ensure_config() {
        if CONFIG.get().is_none() {
            env::set_var("ORS_API_KEY", "key");
            env::set_var("REDIS_URL", "redis://localhost");
            env::set_var("PROXY_TOKEN", "correct-token");
            let _ = CONFIG.set(crate::config::Config::from_env().unwrap());
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_token))
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        ensure_config();
        let resp = app()
            .oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        ensure_config();
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("X-Proxy-Token", "nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn correct_token_is_admitted() {
        let _guard = ENV_LOCK.lock().unwrap();
        ensure_config();
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header("X-Proxy-Token", "correct-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
