//! warden — grant-based ACL evaluation engine.
//!
//! Wires up every collaborator described in SPEC_FULL.md §2: the grant,
//! user, and audit stores, the in-process TTL cache, the decision engine,
//! the lifecycle and introspection facades, and the bootstrap superuser
//! seed, then spawns the scheduled expiration worker in-process. The HTTP
//! surface itself is a Non-goal (§1) — this binary hosts the engine so
//! whatever transport embeds it has a running process to call into.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use warden::audit::{AuditLog, AuditStore, InMemoryAuditStore, MongoAuditStore};
use warden::bootstrap;
use warden::cache::{spawn_cleanup_task, Cache, NullCache, TtlCache};
use warden::config::Args;
use warden::db::mongo::MongoClient;
use warden::decision::DecisionEngine;
use warden::hierarchy::{MongoResourceGraph, NullResourceGraph, ResourceGraph};
use warden::introspection::Introspection;
use warden::lifecycle::GrantLifecycle;
use warden::membership::MembershipResolver;
use warden::store::mongo::MongoGrantStore;
use warden::store::users::{InMemoryUserStore, MongoUserStore, UserStore};
use warden::store::{GrantStore, InMemoryGrantStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    warden::logging::init(&args.log_level);

    if let Err(e) = args.validate() {
        error!("configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  warden - grant-based ACL evaluation engine");
    info!("  build {} ({})", env!("GIT_COMMIT_SHORT"), env!("BUILD_TIMESTAMP"));
    info!("======================================");
    info!("mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("mongodb: {}", args.mongodb_uri);
    info!(
        "cache: enabled={} ttl(decision={}s ancestor={}s membership={}s) sweep={}s",
        args.cache_enabled,
        args.decision_cache_ttl_seconds,
        args.ancestor_cache_ttl_seconds,
        args.membership_cache_ttl_seconds,
        args.cache_sweep_interval_seconds
    );
    info!("======================================");

    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db, args.store_timeout()).await {
        Ok(client) => {
            info!("MongoDB connected");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, falling back to in-memory stores): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let grant_store: Arc<dyn GrantStore> = match &mongo {
        Some(client) => Arc::new(MongoGrantStore::new(client).await?),
        None => Arc::new(InMemoryGrantStore::new()),
    };
    let user_store: Arc<dyn UserStore> = match &mongo {
        Some(client) => Arc::new(MongoUserStore::new(client).await?),
        None => Arc::new(InMemoryUserStore::new()),
    };
    let audit_store: Arc<dyn AuditStore> = match &mongo {
        Some(client) => Arc::new(MongoAuditStore::new(client).await?),
        None => Arc::new(InMemoryAuditStore::new()),
    };
    let graph: Arc<dyn ResourceGraph> = match &mongo {
        Some(client) => Arc::new(MongoResourceGraph::new(client)),
        None => Arc::new(NullResourceGraph),
    };

    let cache: Arc<dyn Cache> = if args.cache_enabled {
        let ttl_cache = Arc::new(TtlCache::new());
        spawn_cleanup_task(ttl_cache.clone(), args.cache_sweep_interval());
        ttl_cache
    } else {
        info!("cache disabled, every check recomputes against the grant store");
        Arc::new(NullCache)
    };

    let membership = Arc::new(MembershipResolver::new(grant_store.clone(), cache.clone(), args.membership_cache_ttl()));
    let engine = Arc::new(DecisionEngine::new(
        grant_store.clone(),
        cache.clone(),
        graph.clone(),
        membership.clone(),
        args.decision_cache_ttl(),
        args.ancestor_cache_ttl(),
    ));
    let audit = Arc::new(AuditLog::new(audit_store));
    let lifecycle = Arc::new(GrantLifecycle::new(grant_store.clone(), cache.clone(), audit.clone(), args.ancestor_cache_ttl()));
    let introspection = Arc::new(Introspection::new(grant_store.clone(), graph, engine.clone(), membership));

    bootstrap::ensure_superuser(
        user_store.as_ref(),
        &args.bootstrap_superuser_username,
        &args.bootstrap_superuser_password(),
    )
    .await?;

    let worker_handles = if args.scheduler_enabled {
        let worker = Arc::new(warden::worker::ExpirationWorker::new(
            grant_store,
            cache,
            audit,
            args.expiry_check_period(),
            args.notification_hour_utc,
            args.notification_lookahead_days,
        ));
        worker.spawn()
    } else {
        info!("scheduler disabled, expiration and notification jobs will not run");
        Vec::new()
    };

    // `engine`/`lifecycle`/`introspection` are the crate's public API surface;
    // a deployment embeds them behind whatever transport it brings (gRPC,
    // HTTP, an in-process library call) — none of which is in scope here.
    let _engine = engine;
    let _lifecycle = lifecycle;
    let _introspection = introspection;
    let _user_store = user_store;

    info!("warden ready, awaiting shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping background workers");

    for handle in worker_handles {
        handle.abort();
    }

    Ok(())
}
