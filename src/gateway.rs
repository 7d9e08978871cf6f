//! Action-invocation interface to the chat platform.
//!
//! The engine never talks to the network itself; it invokes named actions
//! through a host-provided [`ActionGateway`] and interprets the results.
//! [`GroupActions`] wraps the raw gateway with typed calls for the handful
//! of actions the engine depends on.

use crate::error::ActionError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

/// Host-provided action invocation seam.
///
/// `invoke` sends a named command with JSON parameters and returns the
/// result payload, or an [`ActionError`] on failure.
#[async_trait]
pub trait ActionGateway: Send + Sync {
    async fn invoke(&self, action: &str, params: Value) -> Result<Value, ActionError>;
}

/// Typed wrappers over the gateway for the actions the engine uses.
#[derive(Clone)]
pub struct GroupActions {
    gateway: Arc<dyn ActionGateway>,
}

impl GroupActions {
    pub fn new(gateway: Arc<dyn ActionGateway>) -> Self {
        Self { gateway }
    }

    /// Invoke an action, recovering the known-benign "no data returned"
    /// transport quirk as a successful empty result.
    async fn call(&self, action: &str, params: Value) -> Result<Value, ActionError> {
        match self.gateway.invoke(action, params).await {
            Ok(v) => Ok(v),
            Err(e) if e.is_no_data() => Ok(Value::Null),
            Err(e) => {
                error!(action = %action, error = %e, "action invocation failed");
                Err(e)
            }
        }
    }

    /// Recall a message.
    pub async fn delete_msg(&self, message_id: &str) -> Result<(), ActionError> {
        self.call("delete_msg", json!({ "message_id": message_id })).await?;
        Ok(())
    }

    /// Mute a member for `duration` seconds; 0 lifts the mute.
    pub async fn set_group_ban(
        &self,
        group_id: &str,
        user_id: &str,
        duration: u64,
    ) -> Result<(), ActionError> {
        self.call(
            "set_group_ban",
            json!({ "group_id": group_id, "user_id": user_id, "duration": duration }),
        )
        .await?;
        Ok(())
    }

    /// Toggle the group-wide mute.
    pub async fn set_group_whole_ban(&self, group_id: &str, enable: bool) -> Result<(), ActionError> {
        self.call("set_group_whole_ban", json!({ "group_id": group_id, "enable": enable }))
            .await?;
        Ok(())
    }

    /// Remove members from the group without blocking re-invitation.
    pub async fn kick_members(&self, group_id: &str, user_ids: &[&str]) -> Result<(), ActionError> {
        self.call(
            "set_group_kick_members",
            json!({ "group_id": group_id, "user_id": user_ids, "reject_add_request": false }),
        )
        .await?;
        Ok(())
    }

    /// Set a member's display name in the group.
    pub async fn set_group_card(
        &self,
        group_id: &str,
        user_id: &str,
        card: &str,
    ) -> Result<(), ActionError> {
        self.call(
            "set_group_card",
            json!({ "group_id": group_id, "user_id": user_id, "card": card }),
        )
        .await?;
        Ok(())
    }

    /// Fetch fresh member info, bypassing the host cache.
    pub async fn get_group_member_info(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Value, ActionError> {
        self.call(
            "get_group_member_info",
            json!({ "group_id": group_id, "user_id": user_id, "no_cache": true }),
        )
        .await
    }

    /// Send a plain text message to the group.
    pub async fn send_text(&self, group_id: &str, text: &str) -> Result<(), ActionError> {
        self.call("send_group_msg", json!({ "group_id": group_id, "message": text })).await?;
        Ok(())
    }

    /// Send a structured (segmented) message to the group.
    pub async fn send_segments(&self, group_id: &str, segments: Value) -> Result<(), ActionError> {
        self.call("send_group_msg", json!({ "group_id": group_id, "message": segments })).await?;
        Ok(())
    }

    /// Best-effort text reply: failures are logged and swallowed.
    ///
    /// Used for failure notices whose own failure must not propagate.
    pub async fn send_text_best_effort(&self, group_id: &str, text: &str) {
        if let Err(e) = self.send_text(group_id, text).await {
            error!(group = %group_id, error = %e, "failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct QuirkGateway {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionGateway for QuirkGateway {
        async fn invoke(&self, action: &str, _params: Value) -> Result<Value, ActionError> {
            self.calls.lock().push(action.to_string());
            Err(ActionError::Transport {
                action: action.to_string(),
                message: "No data returned by the adapter".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn no_data_quirk_is_a_successful_noop() {
        let gw = Arc::new(QuirkGateway { calls: Mutex::new(Vec::new()) });
        let actions = GroupActions::new(gw.clone());

        actions.set_group_whole_ban("1", true).await.unwrap();
        actions.delete_msg("42").await.unwrap();

        assert_eq!(*gw.calls.lock(), vec!["set_group_whole_ban", "delete_msg"]);
    }

    struct FailingGateway;

    #[async_trait]
    impl ActionGateway for FailingGateway {
        async fn invoke(&self, action: &str, _params: Value) -> Result<Value, ActionError> {
            Err(ActionError::Transport {
                action: action.to_string(),
                message: "connection reset".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn real_transport_errors_propagate() {
        let actions = GroupActions::new(Arc::new(FailingGateway));
        assert!(actions.delete_msg("42").await.is_err());
        // ...but best-effort sends swallow them.
        actions.send_text_best_effort("1", "指令执行出错").await;
    }
}
