//! Group-level allow/deny evaluation.
//!
//! A denial is a silent no-op: the group is simply not managed. This check
//! runs before every other stage for both message and notice events.

use crate::policy::{ListMode, PolicyDocument};

/// Whether the engine manages this group under the current list-mode policy.
pub fn allowed(doc: &PolicyDocument, group_id: &str) -> bool {
    match doc.group_list_mode {
        ListMode::Disabled => true,
        ListMode::Blacklist => !doc.group_list().contains(group_id),
        ListMode::Whitelist => doc.group_list().contains(group_id),
    }
}
