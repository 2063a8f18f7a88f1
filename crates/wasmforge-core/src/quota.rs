//! Quota Gate (C5): per-tier, per-action admission over a `UserRef` snapshot.
//!
//! `QuotaGate::admit` is pure and read-only — it never mutates anything.
//! When it detects the 30-day reset window has elapsed it tells the caller
//! the counter that should be zeroed and persisted back (the write itself
//! belongs to whichever store owns `UsageCounter` rows, see
//! `wasmforge-db::UsageCounterRepo`).

use chrono::{DateTime, Duration, Utc};

use crate::user::{Tier, UsageCounter, UserRef};

const RESET_WINDOW_DAYS: i64 = 30;

/// Action being admitted, used to pick the right counter off `UserRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaAction {
    Compile,
    Deploy,
    FunctionTest,
}

/// Abstraction over "now", so quota logic is testable without real time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of an `Admit` call (spec §4.5, §8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitDecision {
    pub admitted: bool,
    /// Present iff rejected.
    pub current: Option<i64>,
    pub limit: Option<i64>,
    /// If the 30-day window elapsed during this check, the counter's new
    /// zeroed state the caller should persist, tagged by action.
    pub reset: Option<(QuotaAction, UsageCounter)>,
}

/// Stateless tier-limit evaluator. Holds no storage of its own.
pub struct QuotaGate<C: Clock = SystemClock> {
    clock: C,
}

impl Default for QuotaGate<SystemClock> {
    fn default() -> Self {
        Self {
            clock: SystemClock,
        }
    }
}

impl<C: Clock> QuotaGate<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Tier limit for an action, per the table in §4.5. `-1` = unbounded.
    fn limit_for(tier: Tier, action: QuotaAction) -> i64 {
        match (tier, action) {
            (_, QuotaAction::Compile) => -1,
            (Tier::Free, QuotaAction::Deploy) => 5,
            (Tier::TierMid, QuotaAction::Deploy) => -1,
            (Tier::TierTop, QuotaAction::Deploy) => -1,
            (Tier::Free, QuotaAction::FunctionTest) => 2,
            (Tier::TierMid, QuotaAction::FunctionTest) => 5,
            (Tier::TierTop, QuotaAction::FunctionTest) => -1,
        }
    }

    fn counter_for<'a>(user: &'a UserRef, action: QuotaAction) -> Option<&'a UsageCounter> {
        match action {
            QuotaAction::Compile => None,
            QuotaAction::Deploy => Some(&user.deploy_counter),
            QuotaAction::FunctionTest => Some(&user.function_test_counter),
        }
    }

    /// Evaluate admission for `action` against `user`'s current snapshot.
    pub fn admit(&self, user: &UserRef, action: QuotaAction) -> AdmitDecision {
        let limit = Self::limit_for(user.tier, action);

        // Compile is always unbounded and has no tracked counter.
        let Some(counter) = Self::counter_for(user, action) else {
            return AdmitDecision {
                admitted: true,
                current: None,
                limit: None,
                reset: None,
            };
        };

        let now = self.clock.now();
        let elapsed = now.signed_duration_since(counter.reset_at);
        let (effective_count, reset) = if elapsed >= Duration::days(RESET_WINDOW_DAYS) {
            let reset_counter = UsageCounter {
                count: 0,
                limit: counter.limit,
                reset_at: now,
            };
            (0, Some((action, reset_counter)))
        } else {
            (counter.count, None)
        };

        if limit == -1 {
            return AdmitDecision {
                admitted: true,
                current: Some(effective_count),
                limit: Some(limit),
                reset,
            };
        }

        if effective_count < limit {
            AdmitDecision {
                admitted: true,
                current: Some(effective_count),
                limit: Some(limit),
                reset,
            }
        } else {
            AdmitDecision {
                admitted: false,
                current: Some(effective_count),
                limit: Some(limit),
                reset,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ResourceId;

    struct FixedClock(DateTime<Utc>);
    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn user_with(tier: Tier, deploy_count: i64, deploy_limit: i64, reset_at: DateTime<Utc>) -> UserRef {
        UserRef {
            id: ResourceId::new(),
            tier,
            deploy_counter: UsageCounter {
                count: deploy_count,
                limit: deploy_limit,
                reset_at,
            },
            function_test_counter: UsageCounter {
                count: 0,
                limit: 2,
                reset_at,
            },
        }
    }

    #[test]
    fn compile_is_always_unbounded() {
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let user = user_with(Tier::Free, 9999, 5, now);
        let decision = gate.admit(&user, QuotaAction::Compile);
        assert!(decision.admitted);
        assert_eq!(decision.limit, None);
    }

    #[test]
    fn free_tier_deploy_blocks_at_limit() {
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let user = user_with(Tier::Free, 5, 5, now);
        let decision = gate.admit(&user, QuotaAction::Deploy);
        assert!(!decision.admitted);
        assert_eq!(decision.current, Some(5));
        assert_eq!(decision.limit, Some(5));
    }

    #[test]
    fn free_tier_deploy_admits_under_limit() {
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let user = user_with(Tier::Free, 4, 5, now);
        let decision = gate.admit(&user, QuotaAction::Deploy);
        assert!(decision.admitted);
    }

    #[test]
    fn tier_mid_and_top_deploy_are_unbounded() {
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let mid = user_with(Tier::TierMid, 1000, 5, now);
        let top = user_with(Tier::TierTop, 1000, 5, now);
        assert!(gate.admit(&mid, QuotaAction::Deploy).admitted);
        assert!(gate.admit(&top, QuotaAction::Deploy).admitted);
    }

    #[test]
    fn thirty_day_window_resets_counter() {
        let reset_at = Utc::now() - Duration::days(31);
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let user = user_with(Tier::Free, 5, 5, reset_at);
        let decision = gate.admit(&user, QuotaAction::Deploy);
        assert!(decision.admitted, "count should have reset to 0");
        assert_eq!(decision.current, Some(0));
        assert!(decision.reset.is_some());
    }

    #[test]
    fn under_thirty_days_no_reset() {
        let reset_at = Utc::now() - Duration::days(10);
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let user = user_with(Tier::Free, 5, 5, reset_at);
        let decision = gate.admit(&user, QuotaAction::Deploy);
        assert!(decision.reset.is_none());
        assert!(!decision.admitted);
    }

    #[test]
    fn function_test_tier_top_unbounded() {
        let now = Utc::now();
        let gate = QuotaGate::new(FixedClock(now));
        let mut user = user_with(Tier::TierTop, 0, 5, now);
        user.function_test_counter.count = 9999;
        assert!(gate.admit(&user, QuotaAction::FunctionTest).admitted);
    }
}
