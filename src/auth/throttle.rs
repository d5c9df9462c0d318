use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::clock::ClockState;
use crate::error::AppError;

/// Failure bookkeeping for one login identifier.
#[derive(Debug, Clone, Copy, Default)]
struct AttemptRecord {
    failure_count: u32,
    blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}

/// LoginThrottle
///
/// Per-identifier failure counter with a timed lockout. State is memory-resident and is
/// lost on restart.
///
/// Every read-modify-write on a record happens while holding the map's shard lock for that
/// key (`DashMap::entry`), so concurrent failures for the same identifier can never corrupt
/// the counter.
pub struct LoginThrottle {
    attempts: DashMap<String, AttemptRecord>,
    max_failures: u32,
    lockout: Duration,
    clock: ClockState,
}

impl std::fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("tracked", &self.attempts.len())
            .field("max_failures", &self.max_failures)
            .field("lockout", &self.lockout)
            .finish()
    }
}

/// Lowercased, trimmed login identifier used as the throttle key.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

impl LoginThrottle {
    pub fn new(max_failures: u32, lockout_minutes: i64, clock: ClockState) -> Self {
        Self {
            attempts: DashMap::new(),
            max_failures: max_failures.max(1),
            lockout: Duration::try_minutes(lockout_minutes).unwrap_or(Duration::MAX),
            clock,
        }
    }

    /// True iff a lockout is currently active for the identifier.
    pub fn is_blocked(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        self.attempts
            .get(&normalize_identifier(identifier))
            .is_some_and(|record| record.is_blocked_at(now))
    }

    /// on_failure
    ///
    /// Counts one failed attempt. Blocked records are frozen: failures during a lockout do
    /// not extend it. Reaching the threshold starts a lockout and resets the counter to 0.
    pub fn on_failure(&self, identifier: &str) {
        let key = normalize_identifier(identifier);
        let now = self.clock.now();

        let mut record = self.attempts.entry(key).or_default();
        if record.is_blocked_at(now) {
            return;
        }

        record.blocked_until = None;
        record.failure_count += 1;
        if record.failure_count >= self.max_failures {
            let until = now
                .checked_add_signed(self.lockout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            record.blocked_until = Some(until);
            record.failure_count = 0;
            tracing::warn!(identifier = %record.key(), blocked_until = %until, "login lockout applied");
        }
    }

    /// Forgets the identifier entirely.
    pub fn on_success(&self, identifier: &str) {
        self.attempts.remove(&normalize_identifier(identifier));
    }

    /// Current consecutive failure count (0 when untracked).
    pub fn failure_count(&self, identifier: &str) -> u32 {
        self.attempts
            .get(&normalize_identifier(identifier))
            .map_or(0, |record| record.failure_count)
    }

    /// begin
    ///
    /// Starts an accounted login attempt. Fails with `TooManyAttempts` while locked out.
    /// The returned guard records a failure when dropped, unless `succeed` was called, so
    /// an error, an early return or a panic in the credential check still counts.
    pub fn begin(&self, identifier: &str) -> Result<LoginAttempt<'_>, AppError> {
        let key = normalize_identifier(identifier);
        if self.is_blocked(&key) {
            tracing::info!(identifier = %key, "login refused: identifier locked out");
            return Err(AppError::TooManyAttempts);
        }
        Ok(LoginAttempt {
            throttle: self,
            key,
            settled: false,
        })
    }

    /// Drops records that carry no information any more (no failures, lockout elapsed).
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let before = self.attempts.len();
        self.attempts
            .retain(|_, record| record.failure_count > 0 || record.is_blocked_at(now));
        before.saturating_sub(self.attempts.len())
    }
}

/// LoginAttempt
///
/// Guard returned by `LoginThrottle::begin`.
#[must_use = "dropping the attempt records a failed login"]
pub struct LoginAttempt<'a> {
    throttle: &'a LoginThrottle,
    key: String,
    settled: bool,
}

impl LoginAttempt<'_> {
    /// Marks the attempt as successful and clears the identifier's record.
    pub fn succeed(mut self) {
        self.settled = true;
        self.throttle.on_success(&self.key);
    }
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.throttle.on_failure(&self.key);
        }
    }
}
