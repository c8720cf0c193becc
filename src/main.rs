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

use std::net::SocketAddr;
use std::process::exit;
use std::sync::Arc;

use axum::routing::get;
use hyper::Server;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use geoproxy::cache::{CacheStore, RedisStore, CACHE_STORE};
use geoproxy::config::{Config, CONFIG};

/// Initializes structured logging using the `LOG_LEVEL` environment
/// variable, falling back to "info" if unset.
fn init_logging() {
    let filter = EnvFilter::try_new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("logging initialized");
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            exit(1);
        }
    };

    init_logging();

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let redis_url = config.redis_url.clone();
    let port = config.port;

    CONFIG.set(config).expect("CONFIG was already initialized");

    let store = match RedisStore::connect(&redis_url).await {
        Ok(store) => store,
        Err(e) => {
            error!("failed to connect to Redis: {e}");
            exit(1);
        }
    };
    CACHE_STORE
        .set(Arc::new(store) as Arc<dyn CacheStore>)
        .map_err(|_| ())
        .expect("CACHE_STORE was already initialized");

    let app = geoproxy::build_router().route("/metrics", get(move || async move { handle.render() }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("geoproxy listening at http://{}", addr);

    if let Err(e) = Server::bind(&addr).serve(app.into_make_service()).await {
        error!("server exited with error: {e}");
        exit(1);
    }
}
