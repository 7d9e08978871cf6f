//! Nickname lock enforcement.
//!
//! Keeps a user's platform-visible display name equal to its locked value
//! whenever a lock exists. Display-name-changed notifications are not
//! reliably delivered by the platform, so the primary enforcement path is
//! passive: every message from a locked user is checked. Reactive (rename
//! notification) and entry (membership join) corrections cover the rest.
//!
//! Corrections are idempotent (reapplying the same rename is harmless), so
//! overlapping corrections for the same (group, user) pair need no
//! coordination. A failed corrective call is logged and dropped; the next
//! trigger converges.

use crate::event::{MessageEvent, NoticeEvent};
use crate::gateway::GroupActions;
use crate::normalize::normalize_name;
use crate::policy::{NicknameLock, PolicyStore};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay before the post-join corrective rename, to avoid racing the
/// platform's own post-join processing.
pub const ENTRY_DELAY: Duration = Duration::from_millis(1500);

/// Passive correction: on every message from a locked user, re-assert the
/// locked name if the platform-reported display name differs.
pub async fn passive_check(store: &PolicyStore, actions: &GroupActions, ev: &MessageEvent) {
    let Some(lock) = store.read(|doc| doc.lock_for(&ev.group_id, &ev.user_id).cloned()) else {
        return;
    };
    correct(actions, &ev.group_id, &ev.user_id, &lock, &ev.sender.card, "passive").await;
}

/// Reactive correction: the platform delivered a rename notification.
pub async fn reactive_check(store: &PolicyStore, actions: &GroupActions, notice: &NoticeEvent) {
    let (Some(group_id), Some(user_id)) = (&notice.group_id, &notice.user_id) else {
        return;
    };
    let Some(lock) = store.read(|doc| doc.lock_for(group_id, user_id).cloned()) else {
        return;
    };
    let new_card = notice.card_new.as_deref().unwrap_or_default();
    correct(actions, group_id, user_id, &lock, new_card, "reactive").await;
}

/// Entry correction: a locked user joined the group. Schedules a deferred
/// corrective rename; the lock is re-read at fire time since it may have
/// been cleared during the delay.
pub fn schedule_entry_check(
    store: PolicyStore,
    actions: GroupActions,
    group_id: String,
    user_id: String,
) {
    tokio::spawn(async move {
        tokio::time::sleep(ENTRY_DELAY).await;
        let Some(lock) = store.read(|doc| doc.lock_for(&group_id, &user_id).cloned()) else {
            return;
        };
        info!(group = %group_id, user = %user_id, "applying nickname lock for new member");
        if let Err(e) = actions.set_group_card(&group_id, &user_id, &lock.nickname).await {
            warn!(group = %group_id, user = %user_id, error = %e, "entry rename failed");
        }
    });
}

/// Issue a corrective rename if the current name diverges from the lock.
///
/// Comparison is over normalized forms on both sides so transport encoding
/// cannot produce a correction loop. Failures are logged and dropped.
async fn correct(
    actions: &GroupActions,
    group_id: &str,
    user_id: &str,
    lock: &NicknameLock,
    current_card: &str,
    trigger: &str,
) {
    let wanted = normalize_name(&lock.nickname);
    if normalize_name(current_card) == wanted {
        return;
    }

    debug!(
        group = %group_id,
        user = %user_id,
        current = %current_card,
        locked = %lock.nickname,
        trigger = %trigger,
        "display name diverged from lock, correcting"
    );
    if let Err(e) = actions.set_group_card(group_id, user_id, &lock.nickname).await {
        warn!(group = %group_id, user = %user_id, error = %e, "corrective rename failed");
    }
}

/// Write a lock after a successful rename. The stored value is the
/// normalized name so later comparisons are stable.
pub async fn apply_lock(
    store: &PolicyStore,
    group_id: &str,
    user_id: &str,
    nickname: &str,
    locked_by_admin: bool,
) -> Result<(), crate::error::StoreError> {
    let lock = NicknameLock { nickname: nickname.to_string(), locked_by_admin };
    store.mutate(|doc| doc.set_lock(group_id, user_id, lock)).await
}

/// Remove a lock entry. Returns whether one existed.
pub async fn clear_lock(
    store: &PolicyStore,
    group_id: &str,
    user_id: &str,
) -> Result<bool, crate::error::StoreError> {
    store.mutate(|doc| doc.remove_lock(group_id, user_id)).await
}
