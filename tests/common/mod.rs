//! Shared test harness: a recording action gateway and event builders.

use async_trait::async_trait;
use groupwarden::error::ActionError;
use groupwarden::event::{MessageEvent, NoticeEvent};
use groupwarden::gateway::ActionGateway;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Gateway double that records every invocation in order and can be
/// scripted to fail specific actions.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<(String, Value)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future invocation of `action` fail with a transport error.
    pub fn fail_action(&self, action: &str) {
        self.failing.lock().insert(action.to_string());
    }

    /// Recorded `(action, params)` pairs, in invocation order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Recorded action names, in invocation order.
    pub fn action_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Texts of recorded `send_group_msg` calls with a plain-string body.
    #[allow(dead_code)]
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == "send_group_msg")
            .filter_map(|(_, params)| params["message"].as_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ActionGateway for RecordingGateway {
    async fn invoke(&self, action: &str, params: Value) -> Result<Value, ActionError> {
        self.calls.lock().push((action.to_string(), params));
        if self.failing.lock().contains(action) {
            return Err(ActionError::Transport {
                action: action.to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(json!({ "status": "ok" }))
    }
}

/// Build a plain member message.
pub fn member_message(group: &str, user: &str, text: &str) -> MessageEvent {
    message_with(group, user, text, "member", "", &[])
}

/// Build an admin message.
pub fn admin_message(group: &str, user: &str, text: &str) -> MessageEvent {
    message_with(group, user, text, "admin", "", &[])
}

/// Build a message with full control over role, card, and mentions.
pub fn message_with(
    group: &str,
    user: &str,
    text: &str,
    role: &str,
    card: &str,
    mentions: &[&str],
) -> MessageEvent {
    let mut segments: Vec<Value> = mentions
        .iter()
        .map(|qq| json!({ "type": "at", "data": { "qq": qq } }))
        .collect();
    segments.push(json!({ "type": "text", "data": { "text": text } }));

    serde_json::from_value(json!({
        "message_type": "group",
        "group_id": group,
        "user_id": user,
        "raw_message": text,
        "sender": { "role": role, "card": card },
        "message": segments,
        "message_id": 424242
    }))
    .expect("test message event")
}

/// Build a membership-join notice.
#[allow(dead_code)]
pub fn join_notice(group: &str, user: &str) -> NoticeEvent {
    serde_json::from_value(json!({
        "post_type": "notice",
        "notice_type": "group_increase",
        "group_id": group,
        "user_id": user
    }))
    .expect("test join notice")
}

/// Build a display-name change notice.
#[allow(dead_code)]
pub fn card_notice(group: &str, user: &str, card_new: &str) -> NoticeEvent {
    serde_json::from_value(json!({
        "post_type": "notice",
        "notice_type": "group_card",
        "group_id": group,
        "user_id": user,
        "card_new": card_new
    }))
    .expect("test card notice")
}
