use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::core::metrics;
use crate::core::redis::RedisHandle;
use crate::services::errors::ServiceError;
use crate::services::identifiers::generate_id;

/// Which mutation a lease guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FlightAction {
    Submit,
    Grade,
}

impl FlightAction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Grade => "grade",
        }
    }
}

/// One mutation per submission per caller at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FlightKey {
    pub(crate) action: FlightAction,
    pub(crate) actor_id: String,
    pub(crate) submission_id: String,
}

impl FlightKey {
    pub(crate) fn new(action: FlightAction, actor_id: &str, submission_id: &str) -> Self {
        Self { action, actor_id: actor_id.to_string(), submission_id: submission_id.to_string() }
    }

    fn redis_key(&self) -> String {
        format!("gradeflow:flight:{}:{}:{}", self.action.as_str(), self.actor_id, self.submission_id)
    }
}

#[derive(Debug, Clone)]
struct Lease {
    token: String,
    expires_at: Instant,
}

type LeaseTable = Arc<Mutex<HashMap<FlightKey, Lease>>>;

fn lock_table(leases: &LeaseTable) -> MutexGuard<'_, HashMap<FlightKey, Lease>> {
    leases.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Held leases. Local state is authoritative for this process; when Redis is
/// connected the lease is mirrored there so other instances see it too.
#[derive(Clone)]
pub(crate) struct FlightRegistry {
    leases: LeaseTable,
    redis: RedisHandle,
    ttl: Duration,
}

/// Releases its lease when dropped, including when the request holding it is cancelled.
struct LeaseGuard {
    leases: LeaseTable,
    redis: RedisHandle,
    key: FlightKey,
    token: String,
    remote: bool,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        {
            let mut leases = lock_table(&self.leases);
            if leases.get(&self.key).is_some_and(|lease| lease.token == self.token) {
                leases.remove(&self.key);
            }
        }

        if !self.remote {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            return;
        };

        let redis = self.redis.clone();
        let key = self.key.redis_key();
        let token = std::mem::take(&mut self.token);
        let action = self.key.action.as_str();
        runtime.spawn(async move {
            if let Err(err) = redis.release_lease(&key, &token).await {
                tracing::warn!(error = %err, action, "Failed to release Redis lease; it will expire");
            }
        });
    }
}

impl FlightRegistry {
    pub(crate) fn new(redis: RedisHandle, ttl: Duration) -> Self {
        Self { leases: Arc::new(Mutex::new(HashMap::new())), redis, ttl }
    }

    /// Runs `work` while holding the lease for `key`. A second caller with the same
    /// key is rejected with `InFlight` instead of waiting.
    pub(crate) async fn run_exclusive<T, F, Fut>(
        &self,
        key: FlightKey,
        work: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let _lease = self.acquire(key).await?;
        work().await
    }

    async fn acquire(&self, key: FlightKey) -> Result<LeaseGuard, ServiceError> {
        let token = generate_id();
        let now = Instant::now();

        {
            let mut leases = lock_table(&self.leases);
            if leases.get(&key).is_some_and(|lease| lease.expires_at > now) {
                return Err(self.reject(&key));
            }
            leases.insert(key.clone(), Lease { token: token.clone(), expires_at: now + self.ttl });
        }

        // From here on the guard owns the lease; a cancelled acquire still frees it.
        let mut guard = LeaseGuard {
            leases: self.leases.clone(),
            redis: self.redis.clone(),
            key,
            token,
            remote: true,
        };

        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        let redis_key = guard.key.redis_key();
        let acquired = self.redis.try_acquire_lease(&redis_key, &guard.token, ttl_ms).await;
        match acquired {
            Ok(Some(true)) => {}
            Ok(Some(false)) => {
                guard.remote = false;
                return Err(self.reject(&guard.key));
            }
            Ok(None) => guard.remote = false,
            Err(err) => {
                guard.remote = false;
                tracing::warn!(
                    error = %err,
                    action = guard.key.action.as_str(),
                    "Redis lease unavailable; holding local lease only"
                );
            }
        }

        Ok(guard)
    }

    fn reject(&self, key: &FlightKey) -> ServiceError {
        tracing::info!(
            action = key.action.as_str(),
            actor_id = %key.actor_id,
            submission_id = %key.submission_id,
            "Rejected mutation already in flight"
        );
        metrics::mutation_rejected_in_flight(key.action.as_str());
        ServiceError::InFlight { action: key.action.as_str() }
    }

    /// Drops leases whose holder outlived the TTL, e.g. a request stuck on the store.
    pub(crate) fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut leases = lock_table(&self.leases);
        let before = leases.len();
        leases.retain(|_, lease| lease.expires_at > now);
        before - leases.len()
    }

    #[cfg(test)]
    pub(crate) fn held(&self) -> usize {
        lock_table(&self.leases).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn registry(ttl: Duration) -> FlightRegistry {
        FlightRegistry::new(RedisHandle::new("redis://127.0.0.1:1".to_string()), ttl)
    }

    fn grade_key() -> FlightKey {
        FlightKey::new(FlightAction::Grade, "instructor", "submission")
    }

    #[tokio::test]
    async fn second_caller_is_rejected_while_first_is_in_flight() {
        let flights = registry(Duration::from_secs(30));
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (finish_tx, finish_rx) = oneshot::channel::<()>();

        let first = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .run_exclusive(grade_key(), || async move {
                        let _ = started_tx.send(());
                        let _ = finish_rx.await;
                        Ok::<_, ServiceError>(1)
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        let second = flights.run_exclusive(grade_key(), || async { Ok(2) }).await;
        assert!(matches!(second, Err(ServiceError::InFlight { action: "grade" })));

        finish_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), 1);

        let third = flights.run_exclusive(grade_key(), || async { Ok(3) }).await;
        assert_eq!(third.unwrap(), 3);
        assert_eq!(flights.held(), 0);
    }

    #[tokio::test]
    async fn keys_are_independent_per_action_and_actor() {
        let flights = registry(Duration::from_secs(30));
        let held = flights.acquire(grade_key()).await.unwrap();

        let submit = FlightKey::new(FlightAction::Submit, "instructor", "submission");
        let other_actor = FlightKey::new(FlightAction::Grade, "someone-else", "submission");
        assert!(flights.run_exclusive(submit, || async { Ok(()) }).await.is_ok());
        assert!(flights.run_exclusive(other_actor, || async { Ok(()) }).await.is_ok());
        assert_eq!(flights.held(), 1);

        drop(held);
        assert_eq!(flights.held(), 0);
    }

    #[tokio::test]
    async fn failed_work_still_releases_the_lease() {
        let flights = registry(Duration::from_secs(30));

        let result: Result<(), _> = flights
            .run_exclusive(grade_key(), || async { Err(ServiceError::NotFound("submission")) })
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound("submission"))));
        assert_eq!(flights.held(), 0);
    }

    #[tokio::test]
    async fn aborted_request_releases_the_lease_for_a_retry() {
        let flights = registry(Duration::from_secs(30));
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let request = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .run_exclusive(grade_key(), || async move {
                        let _ = started_tx.send(());
                        std::future::pending::<Result<(), ServiceError>>().await
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        assert_eq!(flights.held(), 1);

        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());
        assert_eq!(flights.held(), 0);

        let retry = flights.run_exclusive(grade_key(), || async { Ok(7) }).await;
        assert_eq!(retry.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_leases_are_swept_and_no_longer_block() {
        let flights = registry(Duration::from_secs(5));
        let stuck = flights.acquire(grade_key()).await.unwrap();

        assert_eq!(flights.sweep_expired(), 0);
        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(flights.run_exclusive(grade_key(), || async { Ok(()) }).await.is_ok());
        assert_eq!(flights.held(), 0);

        let stuck_again = flights.acquire(grade_key()).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(flights.sweep_expired(), 1);
        assert_eq!(flights.held(), 0);

        // Late guards never evict a lease they no longer own.
        let current = flights.acquire(grade_key()).await.unwrap();
        drop(stuck);
        drop(stuck_again);
        assert_eq!(flights.held(), 1);
        drop(current);
        assert_eq!(flights.held(), 0);
    }
}
