use std::{env, net::SocketAddr};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fintrack::{AppState, build_router, graceful_shutdown};

/// A secret used when the `JWT_SECRET` environment variable is not set.
///
/// Anyone can forge tokens signed with this value, so it is only suitable
/// for local development.
const INSECURE_DEFAULT_SECRET: &str = "insecure-dev-secret";

/// The REST API server for fintrack.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let secret = match env::var("JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            tracing::warn!(
                "The environment variable 'JWT_SECRET' is not set, \
                 falling back to an insecure default. \
                 Do not run a production server like this."
            );
            INSECURE_DEFAULT_SECRET.to_string()
        }
    };

    let connection =
        Connection::open(&args.db_path).expect("Could not open the application database.");
    let state = AppState::new(connection, &secret).expect("Could not initialize the app state.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Could not start the server.");
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fintrack=debug,tower_http=debug,info")),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // 5xx responses are already logged where the error is mapped to a
        // response, so the layer's own failure logging is switched off.
        .on_failure(());

    router.layer(tracing_layer)
}
