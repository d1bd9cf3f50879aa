//! Last-Write-Wins conflict resolution for pulls.
//!
//! A remote record replaces the local copy of the same id only when its
//! `updated_at` is strictly greater. Equal timestamps keep the local copy, so
//! pulling data that was just pushed is a no-op.

use chrono::NaiveDateTime;

/// Determine whether a remote record should overwrite the local one.
///
/// Returns `true` if:
/// - the remote timestamp is strictly greater than the local one, or
/// - the local record has no timestamp but the remote one does.
///
/// A remote record without a timestamp never wins.
pub fn should_apply(remote: Option<NaiveDateTime>, local: Option<NaiveDateTime>) -> bool {
    match (remote, local) {
        (Some(remote), Some(local)) => remote > local,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Reward claims resolve ties in favour of the remote side (`>=`).
///
/// Only two recorded claims are compared. A missing claim on either side is
/// left to the record-level rule.
pub fn claim_wins(remote: Option<NaiveDateTime>, local: Option<NaiveDateTime>) -> bool {
    match (remote, local) {
        (Some(remote), Some(local)) => remote >= local,
        _ => false,
    }
}
