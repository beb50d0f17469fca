//! Bearer-token session resolution with sliding expiry. This is the single
//! authentication gate for every protected endpoint.

use chrono::{DateTime, Duration, Utc};

use crate::api::AppState;
use crate::constants::{
    SESSION_EXTEND_THRESHOLD_DAYS, SESSION_TOUCH_INTERVAL_SECS, SESSION_TTL_DAYS,
};
use crate::error::{AppError, Result};

/// The one ledger patch a resolve may produce. `None` means the session row
/// is left untouched this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPatch {
    pub last_seen_at: DateTime<Utc>,
    pub extend_to: Option<DateTime<Utc>>,
}

/// Touch at most once per 60s window; extend only when remaining life drops
/// below 7 days. Keeps active sessions alive indefinitely without writing on
/// every request.
pub fn sliding_update(
    now: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Option<SessionPatch> {
    let should_touch = now - last_seen_at > Duration::seconds(SESSION_TOUCH_INTERVAL_SECS);
    let should_extend = expires_at - now < Duration::days(SESSION_EXTEND_THRESHOLD_DAYS);

    if !should_touch && !should_extend {
        return None;
    }

    Some(SessionPatch {
        last_seen_at: now,
        extend_to: should_extend.then(|| now + Duration::days(SESSION_TTL_DAYS)),
    })
}

/// Resolves a bearer token to its wallet, sliding expiry as a side effect.
pub async fn resolve(state: &AppState, token: &str) -> Result<String> {
    let row = state
        .ledger
        .get_session(token)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid session token".into()))?;

    let now = Utc::now();
    if row.expires_at <= now {
        return Err(AppError::Auth("Session expired".into()));
    }

    if let Some(patch) = sliding_update(now, row.last_seen_at, row.expires_at) {
        state
            .ledger
            .touch_session(token, patch.last_seen_at, patch.extend_to)
            .await?;
    }

    Ok(row.wallet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: i64) -> Duration {
        Duration::days(n)
    }

    #[test]
    fn fresh_session_is_not_written() {
        let now = Utc::now();
        // seen 5s ago, 29 days of life left
        assert_eq!(
            sliding_update(now, now - Duration::seconds(5), now + days(29)),
            None
        );
    }

    #[test]
    fn stale_last_seen_triggers_touch_without_extend() {
        let now = Utc::now();
        let patch = sliding_update(now, now - Duration::seconds(61), now + days(29)).unwrap();
        assert_eq!(patch.last_seen_at, now);
        assert_eq!(patch.extend_to, None);
    }

    #[test]
    fn touch_coalesces_inside_sixty_second_window() {
        let now = Utc::now();
        // requests fired every second stay below the threshold
        assert!(sliding_update(now, now - Duration::seconds(59), now + days(29)).is_none());
        assert!(sliding_update(now, now - Duration::seconds(60), now + days(29)).is_none());
        assert!(sliding_update(now, now - Duration::seconds(61), now + days(29)).is_some());
    }

    #[test]
    fn low_remaining_life_extends_to_full_ttl() {
        let now = Utc::now();
        let patch = sliding_update(now, now - Duration::seconds(5), now + days(6)).unwrap();
        assert_eq!(patch.extend_to, Some(now + days(SESSION_TTL_DAYS)));
    }

    #[test]
    fn expiry_only_advances_below_seven_day_threshold() {
        let now = Utc::now();
        let above = sliding_update(now, now - Duration::seconds(61), now + days(8)).unwrap();
        assert_eq!(above.extend_to, None);

        let below = sliding_update(now, now - Duration::seconds(61), now + days(6)).unwrap();
        assert!(below.extend_to.is_some());
    }
}
