//! warden-worker — standalone process hosting only the scheduled expiration
//! and lookahead-notification jobs (§4.7).
//!
//! Run this alongside (or instead of embedding the worker inside) the main
//! `warden` binary when a deployment wants the scheduled jobs on their own
//! process/restart lifecycle, separate from whatever serves live `check`
//! traffic.
//!
//! Usage:
//!   warden-worker --mongodb-uri mongodb://localhost:27017 --mongodb-db warden

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use warden::audit::{AuditLog, AuditStore, MongoAuditStore};
use warden::cache::{Cache, NullCache};
use warden::db::mongo::MongoClient;
use warden::store::mongo::MongoGrantStore;
use warden::store::GrantStore;
use warden::worker::ExpirationWorker;

#[derive(Parser, Debug)]
#[command(name = "warden-worker")]
#[command(about = "Scheduled grant expiration and notification worker")]
#[command(version)]
struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "warden")]
    mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// How often the expiration job checks for expired grants, in seconds
    #[arg(long, env = "EXPIRY_CHECK_PERIOD_SECONDS", default_value = "3600")]
    expiry_check_period_seconds: u64,

    /// UTC hour (0-23) the daily and monthly lookahead notification jobs fire at
    #[arg(long, env = "NOTIFICATION_HOUR_UTC", default_value = "9")]
    notification_hour_utc: u32,

    /// Lookahead window in days for the daily notification job
    #[arg(long, env = "NOTIFICATION_LOOKAHEAD_DAYS", default_value = "7")]
    notification_lookahead_days: i64,

    /// Per-call timeout for grant/audit store operations against MongoDB, in seconds
    #[arg(long, env = "STORE_TIMEOUT_SECONDS", default_value = "5")]
    store_timeout_seconds: u64,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    warden::logging::init(&args.log_level);

    info!("starting warden-worker (mongodb: {})", args.mongodb_uri);

    let mongo = match MongoClient::new(
        &args.mongodb_uri,
        &args.mongodb_db,
        std::time::Duration::from_secs(args.store_timeout_seconds),
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let grant_store: Arc<dyn GrantStore> = match MongoGrantStore::new(&mongo).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to open grant collection: {}", e);
            std::process::exit(1);
        }
    };
    let audit_store: Arc<dyn AuditStore> = match MongoAuditStore::new(&mongo).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to open audit collection: {}", e);
            std::process::exit(1);
        }
    };
    // The worker never reads decisions, only invalidates them after a harvest,
    // so it has no need for a persistent cache of its own — a null cache
    // keeps its invalidation calls cheap no-ops alongside whichever process
    // actually owns the live cache instance.
    let cache: Arc<dyn Cache> = Arc::new(NullCache);
    let audit = Arc::new(AuditLog::new(audit_store));

    let worker = Arc::new(ExpirationWorker::new(
        grant_store,
        cache,
        audit,
        std::time::Duration::from_secs(args.expiry_check_period_seconds),
        args.notification_hour_utc,
        args.notification_lookahead_days,
    ));
    let handles = worker.spawn();

    info!("warden-worker running: hourly expire, daily 7-day notify, monthly 30-day notify");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    for handle in handles {
        handle.abort();
    }
    info!("warden-worker shut down");
}
