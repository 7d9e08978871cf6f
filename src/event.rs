//! Inbound event shapes consumed from the chat-platform host.
//!
//! The host delivers two event families: message events (group chat lines)
//! and notice events (membership joins, display-name changes). Identifier
//! fields arrive as either JSON numbers or strings depending on the
//! transport build, so they are decoded through a tolerant deserializer and
//! handled as strings everywhere past this boundary.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Group identifier, stringly-typed at the engine boundary.
pub type GroupId = String;
/// User identifier, stringly-typed at the engine boundary.
pub type UserId = String;

/// Platform-reported membership role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Member,
    Unknown,
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Unknown role strings must not fail the whole event.
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            "member" => Role::Member,
            _ => Role::Unknown,
        })
    }
}

impl Role {
    /// Whether the platform reports this role as elevated.
    ///
    /// Note this is not the full administrator test; the owner-identifier
    /// override in the policy document also grants elevation.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Sender block attached to a message event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub role: Role,
    /// Current display name in the group; empty string means unset.
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub nickname: String,
}

/// One segment of a structured message body.
///
/// Only mention (`at`) segments are interpreted by the engine; everything
/// else is carried opaquely.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Segment {
    /// The mentioned user id, if this is a mention segment.
    pub fn mention_target(&self) -> Option<UserId> {
        if self.kind != "at" {
            return None;
        }
        id_from_value(self.data.get("qq")?)
    }
}

/// A group message event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub message_type: String,
    #[serde(deserialize_with = "de_id")]
    pub group_id: GroupId,
    #[serde(deserialize_with = "de_id")]
    pub user_id: UserId,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub message: Vec<Segment>,
    #[serde(deserialize_with = "de_id", default)]
    pub message_id: String,
}

impl MessageEvent {
    /// First mention in the message body, if any.
    ///
    /// Takes precedence over literal identifier arguments in command text.
    pub fn first_mention(&self) -> Option<UserId> {
        self.message.iter().find_map(Segment::mention_target)
    }

    /// Whether this event came from a group conversation.
    pub fn is_group(&self) -> bool {
        self.message_type == "group"
    }
}

/// A notice event (membership/card change notifications).
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeEvent {
    pub post_type: String,
    #[serde(default)]
    pub notice_type: String,
    #[serde(deserialize_with = "de_opt_id", default)]
    pub group_id: Option<GroupId>,
    #[serde(deserialize_with = "de_opt_id", default)]
    pub user_id: Option<UserId>,
    /// New display name for card-change notices.
    #[serde(default)]
    pub card_new: Option<String>,
}

impl NoticeEvent {
    /// Whether this notice is a membership-join notification.
    pub fn is_member_join(&self) -> bool {
        self.post_type == "notice" && self.notice_type == "group_increase"
    }

    /// Whether this notice is a display-name change notification.
    pub fn is_card_change(&self) -> bool {
        self.post_type == "notice" && self.notice_type == "group_card"
    }
}

fn id_from_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept identifiers as JSON numbers or strings.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    id_from_value(&v).ok_or_else(|| serde::de::Error::custom("expected number or string id"))
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.as_ref().and_then(id_from_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_event_decodes_numeric_ids() {
        let ev: MessageEvent = serde_json::from_value(json!({
            "message_type": "group",
            "group_id": 12345,
            "user_id": "67890",
            "raw_message": "/kick",
            "sender": { "role": "admin", "card": "op" },
            "message": [
                { "type": "text", "data": { "text": "/kick " } },
                { "type": "at", "data": { "qq": 11111 } }
            ],
            "message_id": -642351
        }))
        .unwrap();

        assert!(ev.is_group());
        assert_eq!(ev.group_id, "12345");
        assert_eq!(ev.user_id, "67890");
        assert_eq!(ev.message_id, "-642351");
        assert_eq!(ev.first_mention().as_deref(), Some("11111"));
        assert!(ev.sender.role.is_elevated());
    }

    #[test]
    fn unknown_roles_and_segments_are_tolerated() {
        let ev: MessageEvent = serde_json::from_value(json!({
            "message_type": "group",
            "group_id": 1,
            "user_id": 2,
            "raw_message": "hi",
            "sender": { "role": "bot" },
            "message": [ { "type": "face", "data": { "id": 3 } } ],
            "message_id": 9
        }))
        .unwrap();

        assert_eq!(ev.sender.role, Role::Unknown);
        assert!(!ev.sender.role.is_elevated());
        assert!(ev.first_mention().is_none());
    }

    #[test]
    fn notice_event_kinds() {
        let join: NoticeEvent = serde_json::from_value(json!({
            "post_type": "notice",
            "notice_type": "group_increase",
            "group_id": 77,
            "user_id": 88
        }))
        .unwrap();
        assert!(join.is_member_join());
        assert_eq!(join.group_id.as_deref(), Some("77"));

        let card: NoticeEvent = serde_json::from_value(json!({
            "post_type": "notice",
            "notice_type": "group_card",
            "group_id": 77,
            "user_id": 88,
            "card_new": "newname"
        }))
        .unwrap();
        assert!(card.is_card_change());
        assert_eq!(card.card_new.as_deref(), Some("newname"));
    }
}
