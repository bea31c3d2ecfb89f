//! Scheduled grant expiration and lookahead notification jobs.
//!
//! Three jobs, each guarded so a slow run never overlaps with the next tick
//! (single-instance + coalescing, matching the source scheduler's
//! `coalesce=True, max_instances=1` job defaults): a configurable-interval
//! harvest of already-expired grants, a daily lookahead notification pass
//! (configurable window, default 7 days) firing at a configured UTC hour,
//! and a monthly pass on the 1st at the same hour with a fixed 30-day
//! lookahead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::cache::Cache;
use crate::domain::{AuditEventKind, Grant};
use crate::error::Result;
use crate::store::GrantStore;

/// The monthly lookahead job's window is a fixed, coarser view of the same
/// mechanism as the daily job (§4.7) — not independently configurable.
const NOTIFY_30_DAY_LOOKAHEAD: i64 = 30;

pub struct ExpirationWorker {
    store: Arc<dyn GrantStore>,
    cache: Arc<dyn Cache>,
    audit: Arc<AuditLog>,
    expire_interval: Duration,
    notification_hour_utc: u32,
    notification_lookahead_days: i64,
    expire_running: Arc<AtomicBool>,
    notify_daily_running: Arc<AtomicBool>,
    notify_monthly_running: Arc<AtomicBool>,
}

impl ExpirationWorker {
    pub fn new(
        store: Arc<dyn GrantStore>,
        cache: Arc<dyn Cache>,
        audit: Arc<AuditLog>,
        expire_interval: Duration,
        notification_hour_utc: u32,
        notification_lookahead_days: i64,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
            expire_interval,
            notification_hour_utc,
            notification_lookahead_days,
            expire_running: Arc::new(AtomicBool::new(false)),
            notify_daily_running: Arc::new(AtomicBool::new(false)),
            notify_monthly_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn all three scheduled jobs. The expire job ticks on a plain
    /// elapsed-time interval; the two notification jobs wake at the next
    /// occurrence of the configured UTC hour (daily, and on the 1st of the
    /// month respectively), coalescing rather than queueing if the prior run
    /// of that same job hasn't finished yet.
    pub fn spawn(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let worker = self.clone();
        let expire_interval = self.expire_interval;
        handles.push(tokio::spawn(async move {
            run_on_interval(expire_interval, worker.expire_running.clone(), move || {
                let worker = worker.clone();
                async move { worker.expire_once().await }
            })
            .await;
        }));

        let worker = self.clone();
        let hour = self.notification_hour_utc;
        let lookahead = self.notification_lookahead_days;
        handles.push(tokio::spawn(async move {
            run_daily_at_hour(hour, worker.notify_daily_running.clone(), move || {
                let worker = worker.clone();
                async move { worker.notify_once(chrono::Duration::days(lookahead)).await }
            })
            .await;
        }));

        let worker = self.clone();
        let hour = self.notification_hour_utc;
        handles.push(tokio::spawn(async move {
            run_monthly_at_hour(hour, worker.notify_monthly_running.clone(), move || {
                let worker = worker.clone();
                async move { worker.notify_once(chrono::Duration::days(NOTIFY_30_DAY_LOOKAHEAD)).await }
            })
            .await;
        }));

        handles
    }

    /// Harvest grants whose `expires_at` has passed: audit-log each as
    /// `Expired`, delete it, and invalidate the cache entries it could have
    /// populated. Per-grant failures are logged and skipped rather than
    /// aborting the batch — one bad row shouldn't block the rest.
    pub async fn expire_once(&self) -> Result<usize> {
        let now = Utc::now();
        let expired = self.store.expired(now).await?;
        let mut harvested = 0;

        for grant in expired {
            if let Err(e) = self.harvest(&grant).await {
                warn!(grant_id = %grant.id, error = %e, "failed to harvest expired grant, will retry next tick");
                continue;
            }
            harvested += 1;
        }

        if harvested > 0 {
            info!(harvested, "expired grants harvested");
        } else {
            debug!("no expired grants this tick");
        }
        Ok(harvested)
    }

    async fn harvest(&self, grant: &Grant) -> Result<()> {
        self.audit
            .log(
                AuditEventKind::Expired,
                None,
                target_user(grant),
                target_group(grant),
                Some(grant.resource.clone()),
                Some(grant.permission),
            )
            .await?;
        self.store.delete(&grant.id).await?;
        self.cache.invalidate_user(&grant.grantee.id).await;
        self.cache.invalidate_resource(&grant.resource).await;
        Ok(())
    }

    /// Log every grant expiring within `within` of now, grouped by grantee.
    /// A real deployment would hand this batch to a notification service;
    /// none is in scope here, so the batch is only surfaced via structured
    /// logging for an operator or downstream log shipper to pick up.
    async fn notify_once(&self, within: chrono::Duration) -> Result<usize> {
        let now = Utc::now();
        let expiring = self.store.expiring(now, within).await?;
        if expiring.is_empty() {
            debug!(days = within.num_days(), "no grants expiring in this lookahead window");
            return Ok(0);
        }

        info!(
            count = expiring.len(),
            days = within.num_days(),
            "grants expiring within lookahead window"
        );
        for grant in &expiring {
            debug!(
                grantee = %grant.grantee,
                resource = %grant.resource,
                permission = %grant.permission,
                expires_at = %grant.expires_at.expect("expiring() only returns grants with expires_at set"),
                "grant expiring soon"
            );
        }
        Ok(expiring.len())
    }
}

fn target_user(grant: &Grant) -> Option<String> {
    (grant.grantee.kind == crate::domain::GranteeKind::User).then(|| grant.grantee.id.clone())
}

fn target_group(grant: &Grant) -> Option<String> {
    (grant.grantee.kind == crate::domain::GranteeKind::Group).then(|| grant.grantee.id.clone())
}

async fn run_on_interval<F, Fut>(interval: Duration, running: Arc<AtomicBool>, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<usize>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        run_guarded(&running, &mut job).await;
    }
}

async fn run_guarded<F, Fut>(running: &Arc<AtomicBool>, job: &mut F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<usize>>,
{
    if running.swap(true, Ordering::SeqCst) {
        debug!("previous run still in flight, coalescing this tick");
        return;
    }

    let result = job().await;
    running.store(false, Ordering::SeqCst);

    if let Err(e) = result {
        warn!(error = %e, "scheduled job failed");
    }
}

/// The next instant the clock reads `hour_utc:00:00` UTC, today if still
/// ahead, tomorrow otherwise.
fn next_daily_fire(hour_utc: u32, now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    let today = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour_utc, 0, 0)
        .single()
        .expect("notification_hour_utc is validated to 0-23");
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// The next instant the clock reads the 1st of a month at `hour_utc:00:00`
/// UTC, this month if still ahead, next month otherwise.
fn next_monthly_fire(hour_utc: u32, now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    let this_month = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, hour_utc, 0, 0)
        .single()
        .expect("notification_hour_utc is validated to 0-23");
    if this_month > now {
        return this_month;
    }
    let (year, month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
    Utc.with_ymd_and_hms(year, month, 1, hour_utc, 0, 0).single().expect("notification_hour_utc is validated to 0-23")
}

async fn run_daily_at_hour<F, Fut>(hour_utc: u32, running: Arc<AtomicBool>, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<usize>>,
{
    loop {
        let delay = (next_daily_fire(hour_utc, Utc::now()) - Utc::now()).to_std().unwrap_or(Duration::from_secs(0));
        tokio::time::sleep(delay).await;
        run_guarded(&running, &mut job).await;
    }
}

async fn run_monthly_at_hour<F, Fut>(hour_utc: u32, running: Arc<AtomicBool>, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<usize>>,
{
    loop {
        let delay = (next_monthly_fire(hour_utc, Utc::now()) - Utc::now()).to_std().unwrap_or(Duration::from_secs(0));
        tokio::time::sleep(delay).await;
        run_guarded(&running, &mut job).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLog, InMemoryAuditStore};
    use crate::cache::TtlCache;
    use crate::domain::{Effect, GranteeRef, Permission, ResourceKind, ResourceRef};
    use crate::store::InMemoryGrantStore;

    fn worker() -> (ExpirationWorker, Arc<InMemoryGrantStore>) {
        let store = Arc::new(InMemoryGrantStore::new());
        let cache = Arc::new(TtlCache::new());
        let audit = Arc::new(AuditLog::new(Arc::new(InMemoryAuditStore::new())));
        let worker = ExpirationWorker::new(store.clone(), cache, audit, Duration::from_secs(3600), 9, 7);
        (worker, store)
    }

    #[test]
    fn next_daily_fire_rolls_to_tomorrow_when_hour_has_passed() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap();
        let fire = next_daily_fire(9, now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2026, 1, 16, 9, 0, 0).unwrap());
    }

    #[test]
    fn next_daily_fire_stays_today_when_hour_is_still_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap();
        let fire = next_daily_fire(9, now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap());
    }

    #[test]
    fn next_monthly_fire_rolls_to_next_month_across_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 12, 15, 14, 0, 0).unwrap();
        let fire = next_monthly_fire(9, now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2027, 1, 1, 9, 0, 0).unwrap());
    }

    fn expired_grant(user: &str) -> Grant {
        Grant {
            id: uuid::Uuid::new_v4().to_string(),
            grantee: GranteeRef::user(user),
            resource: ResourceRef::new(ResourceKind::Sensor, "s1"),
            permission: Permission::Read,
            effect: Effect::Allow,
            inherit: true,
            fields: None,
            expires_at: Some(Utc::now() - chrono::Duration::seconds(1)),
            granted_by: None,
            granted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn expire_once_harvests_and_deletes() {
        let (worker, store) = worker();
        let grant = expired_grant("alice");
        let id = grant.id.clone();
        store.put(grant).await.unwrap();

        let harvested = worker.expire_once().await.unwrap();
        assert_eq!(harvested, 1);
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expire_once_is_idempotent_on_empty_store() {
        let (worker, _store) = worker();
        assert_eq!(worker.expire_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn notify_once_finds_grants_in_window_but_does_not_delete() {
        let (worker, store) = worker();
        let mut grant = expired_grant("alice");
        grant.expires_at = Some(Utc::now() + chrono::Duration::days(3));
        let id = grant.id.clone();
        store.put(grant).await.unwrap();

        let count = worker.notify_once(chrono::Duration::days(7)).await.unwrap();
        assert_eq!(count, 1);
        assert!(store.get(&id).await.unwrap().is_some());
    }
}
