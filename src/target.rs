//! Targeted-user suppression.
//!
//! A targeted user's messages are deleted immediately, independent of
//! content; no later stage runs for that message. This stage never inspects
//! message text.

use crate::Flow;
use crate::error::StoreError;
use crate::event::MessageEvent;
use crate::gateway::GroupActions;
use crate::policy::{PolicyStore, TargetRecord};
use tracing::{debug, warn};

/// Offer a message to the target filter.
///
/// Administrators are exempt from suppression. Delete failures are swallowed;
/// the message is still consumed so a transient transport error cannot leak a
/// targeted user's message into later stages.
pub async fn enforce(
    store: &PolicyStore,
    actions: &GroupActions,
    ev: &MessageEvent,
    is_admin: bool,
) -> Flow {
    if is_admin || !store.read(|doc| doc.is_targeted(&ev.group_id, &ev.user_id)) {
        return Flow::Continue;
    }

    debug!(group = %ev.group_id, user = %ev.user_id, "suppressing targeted user's message");
    if let Err(e) = actions.delete_msg(&ev.message_id).await {
        warn!(message_id = %ev.message_id, error = %e, "targeted delete failed");
    }
    Flow::Stop
}

/// Flag a user as targeted, recording who added the entry and when.
pub async fn add(
    store: &PolicyStore,
    group_id: &str,
    user_id: &str,
    added_by: &str,
) -> Result<(), StoreError> {
    store
        .mutate(|doc| doc.add_target(group_id, user_id, TargetRecord::added_now_by(added_by)))
        .await
}

/// Remove a target entry. Returns whether one existed.
pub async fn remove(store: &PolicyStore, group_id: &str, user_id: &str) -> Result<bool, StoreError> {
    store.mutate(|doc| doc.remove_target(group_id, user_id)).await
}

/// List the targeted users of a group as `(user_id, record)` pairs.
pub fn list(store: &PolicyStore, group_id: &str) -> Vec<(String, TargetRecord)> {
    store.read(|doc| {
        doc.targets_in(group_id)
            .into_iter()
            .map(|(id, rec)| (id.to_string(), rec.clone()))
            .collect()
    })
}
