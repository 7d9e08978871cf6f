//! Forbidden-term filter.
//!
//! Scans message text against the configured keyword list and escalates to
//! the configured punishment. Filtering runs on every message and must never
//! crash the pipeline or surface as a command error, so every action failure
//! here is swallowed.

use crate::Flow;
use crate::event::MessageEvent;
use crate::gateway::GroupActions;
use crate::policy::{PolicyDocument, Punishment};
use tracing::{info, warn};

/// Mute duration applied for the `mute` punishment, in seconds.
pub const MUTE_SECS: u64 = 60;

/// Test message text for a forbidden term.
///
/// Literal, case-sensitive substring containment over the `|`-split list;
/// no word boundaries, no normalization. Returns the first matching term.
pub fn scan<'a>(doc: &'a PolicyDocument, text: &str) -> Option<&'a str> {
    if !doc.filter_enable {
        return None;
    }
    doc.keywords().find(|k| text.contains(k))
}

/// Offer a message to the keyword filter.
///
/// Administrators are exempt. On a hit the message is deleted and at most
/// one punishment action follows; the pipeline stops after a hit regardless
/// of punishment outcome.
pub async fn enforce(
    doc: &PolicyDocument,
    actions: &GroupActions,
    ev: &MessageEvent,
    is_admin: bool,
) -> Flow {
    if is_admin {
        return Flow::Continue;
    }
    let Some(term) = scan(doc, ev.raw_message.trim()) else {
        return Flow::Continue;
    };

    info!(
        group = %ev.group_id,
        user = %ev.user_id,
        term = %term,
        punish = ?doc.filter_punish,
        "forbidden term matched"
    );

    if let Err(e) = actions.delete_msg(&ev.message_id).await {
        warn!(message_id = %ev.message_id, error = %e, "keyword delete failed");
        return Flow::Stop;
    }

    let punish = match doc.filter_punish {
        Punishment::None => Ok(()),
        Punishment::Mute => actions.set_group_ban(&ev.group_id, &ev.user_id, MUTE_SECS).await,
        Punishment::Kick => actions.kick_members(&ev.group_id, &[&ev.user_id]).await,
    };
    if let Err(e) = punish {
        warn!(group = %ev.group_id, user = %ev.user_id, error = %e, "keyword punishment failed");
    }

    Flow::Stop
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(enabled: bool, keywords: &str) -> PolicyDocument {
        PolicyDocument {
            filter_enable: enabled,
            filter_keywords: keywords.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn scan_is_case_sensitive_substring() {
        let d = doc(true, "加群|兼职|SPAM");
        assert_eq!(scan(&d, "快来加群啊"), Some("加群"));
        assert_eq!(scan(&d, "找兼职"), Some("兼职"));
        assert_eq!(scan(&d, "this is SPAMMY"), Some("SPAM"));
        assert_eq!(scan(&d, "this is spam"), None);
        assert_eq!(scan(&d, "clean"), None);
    }

    #[test]
    fn disabled_filter_never_matches() {
        let d = doc(false, "加群");
        assert_eq!(scan(&d, "加群"), None);
    }

    #[test]
    fn empty_terms_are_skipped() {
        // "a||b" must not let the empty string match everything.
        let d = doc(true, "a||b");
        assert_eq!(scan(&d, "zzz"), None);
        assert_eq!(scan(&d, "zbz"), Some("b"));
    }
}
