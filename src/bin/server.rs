use std::{
    env,
    fs::OpenOptions,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use rusqlite::Connection;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use spendwise::{
    AppState, HttpMailer, ReceiptScanner, build_router, graceful_shutdown, initialize_db,
    logging_middleware, run_budget_alert_job, run_recurring_processor, run_recurring_trigger_job,
};

/// How often the budget alert job runs.
const BUDGET_ALERT_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);
/// How often the recurring transaction trigger runs.
const RECURRING_TRIGGER_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
/// How many queued recurring events the processor will buffer.
const RECURRING_QUEUE_SIZE: usize = 256;

/// The web server for spendwise.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// File path to an SSL certificate `cert.pem` and key `key.pem`.
    #[arg(long)]
    cert_path: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let tls_config = RustlsConfig::from_pem_file(
        PathBuf::from(&args.cert_path).join("cert.pem"),
        PathBuf::from(&args.cert_path).join("key.pem"),
    )
    .await
    .expect("Could not open TLS certificates.");

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");
    let email_api_key =
        env::var("EMAIL_API_KEY").expect("The environment variable 'EMAIL_API_KEY' must be set");
    let email_sender = env::var("EMAIL_SENDER")
        .unwrap_or_else(|_| "Spendwise <alerts@spendwise.example>".to_owned());
    let scan_api_key =
        env::var("SCAN_API_KEY").expect("The environment variable 'SCAN_API_KEY' must be set");

    let conn = Connection::open(&args.db_path).expect("Could not open the database");
    initialize_db(&conn).expect("Could not initialize the database");
    let conn = Arc::new(Mutex::new(conn));

    let state = AppState::new(
        conn.clone(),
        &secret,
        &args.timezone,
        ReceiptScanner::new(scan_api_key),
    );

    let mailer = HttpMailer::new(email_api_key, email_sender);
    tokio::spawn(run_budget_alert_job(
        conn.clone(),
        mailer,
        args.timezone.clone(),
        BUDGET_ALERT_PERIOD,
    ));

    let (event_sender, event_receiver) = mpsc::channel(RECURRING_QUEUE_SIZE);
    tokio::spawn(run_recurring_trigger_job(
        conn.clone(),
        args.timezone.clone(),
        RECURRING_TRIGGER_PERIOD,
        event_sender,
    ));
    tokio::spawn(run_recurring_processor(
        conn.clone(),
        args.timezone.clone(),
        event_receiver,
    ));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    tracing::info!("HTTPS server listening on {}", addr);
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
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
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
