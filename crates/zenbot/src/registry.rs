//! Session registry
//!
//! Owns every live [`Session`]. The collection sits behind one `RwLock`;
//! each public method takes the lock once and finishes its whole decision
//! under it, so no caller can act on state that changed between a check
//! and the write that follows it. Lookups share a read lock, everything
//! that mutates takes the write lock.
//!
//! The guards are never held across an `.await`: callers copy what they
//! need out of the registry and send notifications afterwards.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::session::{Session, SessionId};

/// Outcome of a successful [`SessionRegistry::try_enforce`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The enforced session, with its cooldown already advanced
    pub session: Session,
    pub at: DateTime<Utc>,
}

/// Thread-safe store of active zen sessions, kept in creation order
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<Vec<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the Vec consistent, so a poisoned lock
    // still guards valid data.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a fully built session
    pub fn create(&self, session: Session) {
        self.write().push(session);
    }

    /// Earliest-created session of `user_id`, if any.
    ///
    /// Expired sessions still count until the sweeper removes them, same as
    /// in [`try_enforce`](Self::try_enforce).
    pub fn find_active(&self, user_id: &str) -> Option<Session> {
        self.read().iter().find(|s| s.user_id == user_id).cloned()
    }

    /// Copy of every live session, oldest first
    pub fn snapshot(&self) -> Vec<Session> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove and return the user's sessions whose reason matches
    /// `reason_filter` case-insensitively. `None` or an empty filter removes
    /// all of the user's sessions.
    pub fn cancel(&self, user_id: &str, reason_filter: Option<&str>) -> Vec<Session> {
        let filter = reason_filter.unwrap_or("");
        self.remove_where(|s| s.user_id == user_id && s.reason_matches(filter))
    }

    /// Remove and return every session with `ends_at <= now`
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Session> {
        self.remove_where(|s| s.is_expired(now))
    }

    /// Push a session's cooldown forward.
    ///
    /// Returns `false` when the session is already gone. The cooldown never
    /// moves backwards.
    pub fn update_cooldown(&self, id: SessionId, until: DateTime<Utc>) -> bool {
        let mut sessions = self.write();
        match sessions.iter_mut().find(|s| s.id == id) {
            Some(session) => {
                session.cooldown_until = session.cooldown_until.max(until);
                true
            }
            None => false,
        }
    }

    /// Check-and-set for enforcement.
    ///
    /// Looks at the user's earliest session; if it exists and is out of its
    /// cooldown window, advances `cooldown_until` to `now + cooldown` and
    /// returns the violation. Concurrent callers for the same window
    /// serialize on the write lock, so only the first one gets `Some`.
    ///
    /// A session past `ends_at` but not yet swept is still enforced, as in
    /// [`find_active`](Self::find_active).
    pub fn try_enforce(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        cooldown: TimeDelta,
    ) -> Option<Violation> {
        let mut sessions = self.write();
        let session = sessions.iter_mut().find(|s| s.user_id == user_id)?;

        if session.is_cooling_down(now) {
            return None;
        }

        let until = now.checked_add_signed(cooldown).unwrap_or(DateTime::<Utc>::MAX_UTC);
        session.cooldown_until = session.cooldown_until.max(until);

        Some(Violation {
            session: session.clone(),
            at: now,
        })
    }

    fn remove_where(&self, mut pred: impl FnMut(&Session) -> bool) -> Vec<Session> {
        let mut sessions = self.write();
        let (removed, kept): (Vec<Session>, Vec<Session>) =
            std::mem::take(&mut *sessions).into_iter().partition(|s| pred(s));
        *sessions = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn zen(user: &str, reason: &str, minutes: i64) -> Session {
        Session::new(
            user,
            format!("name-{}", user),
            "C1",
            reason,
            t0(),
            t0() + TimeDelta::minutes(minutes),
            t0(),
        )
    }

    #[test]
    fn test_find_active_returns_earliest() {
        let registry = SessionRegistry::new();
        let first = zen("U1", "first", 60);
        let second = zen("U1", "second", 30);
        registry.create(first.clone());
        registry.create(second);
        registry.create(zen("U2", "other", 10));

        assert_eq!(registry.find_active("U1"), Some(first));
        assert!(registry.find_active("U3").is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_same_user_may_hold_many_sessions() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "focus", 60));
        registry.create(zen("U1", "focus", 60));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cancel_matches_reason_ignoring_case() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "focus", 60));
        registry.create(zen("U1", "lunch", 60));

        let removed = registry.cancel("U1", Some("FOCUS"));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].reason, "focus");

        let left = registry.snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].reason, "lunch");
    }

    #[test]
    fn test_cancel_without_filter_removes_all_of_user() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "focus", 60));
        registry.create(zen("U1", "lunch", 60));
        registry.create(zen("U2", "focus", 60));

        assert_eq!(registry.cancel("U1", None).len(), 2);
        assert_eq!(registry.len(), 1);

        registry.create(zen("U1", "again", 60));
        assert_eq!(registry.cancel("U1", Some("")).len(), 1);
        assert_eq!(registry.find_active("U2").map(|s| s.user_id), Some("U2".to_string()));
    }

    #[test]
    fn test_cancel_with_no_match_is_empty() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "focus", 60));

        assert!(registry.cancel("U1", Some("lunch")).is_empty());
        assert!(registry.cancel("U2", None).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sweep_removes_expired_once() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "short", 1));
        registry.create(zen("U2", "long", 60));

        let now = t0() + TimeDelta::minutes(1);
        let expired = registry.sweep_expired(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].reason, "short");

        assert!(registry.sweep_expired(now).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sweep_keeps_creation_order() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "a", 60));
        registry.create(zen("U1", "gone", 1));
        registry.create(zen("U1", "b", 60));

        registry.sweep_expired(t0() + TimeDelta::minutes(5));
        let reasons: Vec<_> = registry.snapshot().into_iter().map(|s| s.reason).collect();
        assert_eq!(reasons, vec!["a", "b"]);
    }

    #[test]
    fn test_update_cooldown_is_monotonic() {
        let registry = SessionRegistry::new();
        let session = zen("U1", "focus", 60);
        let id = session.id;
        registry.create(session);

        assert!(registry.update_cooldown(id, t0() + TimeDelta::seconds(30)));
        assert!(registry.update_cooldown(id, t0() + TimeDelta::seconds(10)));
        assert_eq!(
            registry.find_active("U1").unwrap().cooldown_until,
            t0() + TimeDelta::seconds(30)
        );
    }

    #[test]
    fn test_update_cooldown_on_removed_session_is_noop() {
        let registry = SessionRegistry::new();
        let session = zen("U1", "focus", 1);
        let id = session.id;
        registry.create(session);
        registry.sweep_expired(t0() + TimeDelta::minutes(2));

        assert!(!registry.update_cooldown(id, t0() + TimeDelta::seconds(30)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_try_enforce_respects_cooldown() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "focus", 60));
        let cooldown = TimeDelta::seconds(10);
        let fired_at = t0() + TimeDelta::seconds(5);

        let violation = registry.try_enforce("U1", fired_at, cooldown).unwrap();
        assert_eq!(violation.session.cooldown_until, fired_at + cooldown);
        assert_eq!(violation.at, fired_at);

        let almost = fired_at + cooldown - TimeDelta::milliseconds(1);
        assert!(registry.try_enforce("U1", almost, cooldown).is_none());

        let after = fired_at + cooldown + TimeDelta::milliseconds(1);
        assert!(registry.try_enforce("U1", after, cooldown).is_some());
    }

    #[test]
    fn test_try_enforce_only_touches_earliest_session() {
        let registry = SessionRegistry::new();
        let first = zen("U1", "first", 60);
        let second = zen("U1", "second", 60);
        let second_id = second.id;
        registry.create(first);
        registry.create(second);

        let violation = registry
            .try_enforce("U1", t0(), TimeDelta::seconds(10))
            .unwrap();
        assert_eq!(violation.session.reason, "first");

        let untouched = registry
            .snapshot()
            .into_iter()
            .find(|s| s.id == second_id)
            .unwrap();
        assert_eq!(untouched.cooldown_until, t0());
    }

    #[test]
    fn test_unswept_expired_session_still_seen() {
        let registry = SessionRegistry::new();
        registry.create(zen("U1", "short", 1));
        let late = t0() + TimeDelta::minutes(1) + TimeDelta::milliseconds(500);

        assert!(registry.find_active("U1").is_some());
        assert!(registry
            .try_enforce("U1", late, TimeDelta::seconds(10))
            .is_some());

        assert_eq!(registry.sweep_expired(late).len(), 1);
        assert!(registry.find_active("U1").is_none());
        assert!(registry
            .try_enforce("U1", late, TimeDelta::seconds(10))
            .is_none());
    }

    #[test]
    fn test_try_enforce_without_session() {
        let registry = SessionRegistry::new();
        assert!(registry
            .try_enforce("U1", t0(), TimeDelta::seconds(10))
            .is_none());
    }

    #[test]
    fn test_concurrent_enforce_fires_once() {
        let registry = Arc::new(SessionRegistry::new());
        registry.create(zen("U1", "focus", 60));
        let now = t0() + TimeDelta::seconds(1);

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .try_enforce("U1", now, TimeDelta::seconds(10))
                        .is_some()
                })
            })
            .collect();

        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_concurrent_create_loses_nothing() {
        let registry = Arc::new(SessionRegistry::new());

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.create(zen(&format!("U{}", i), "focus", 60)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.len(), 64);
    }

    #[test]
    fn test_sweep_and_cancel_remove_exactly_once() {
        for _ in 0..50 {
            let registry = Arc::new(SessionRegistry::new());
            registry.create(zen("U1", "focus", 1));
            let now = t0() + TimeDelta::minutes(5);

            let sweeper = {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.sweep_expired(now).len())
            };
            let canceller = {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.cancel("U1", Some("focus")).len())
            };

            let total = sweeper.join().unwrap() + canceller.join().unwrap();
            assert_eq!(total, 1);
            assert!(registry.is_empty());
        }
    }
}
