//! Administrative and self-service command handling.
//!
//! This module contains the `CommandHandler` trait and the command registry
//! for dispatching parsed chat commands to handlers. Commands are tokenized
//! on whitespace; the first mention in the message body (if any) becomes the
//! command's target identifier, taking precedence over a literal identifier
//! argument. Unknown commands are ignored.

mod moderation;
mod nickname;
mod targeting;

pub use moderation::{BanHandler, KickHandler, UnbanHandler, WholeMuteHandler};
pub use nickname::{LockNameHandler, UnlockNameHandler};
pub use targeting::{TargetAddHandler, TargetListHandler, TargetRemoveHandler};

use crate::error::CommandResult;
use crate::event::{MessageEvent, UserId};
use crate::gateway::GroupActions;
use crate::policy::PolicyStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::error;

/// Reply sent when an admin-only command comes from a non-administrator.
pub const DENIED_REPLY: &str = "权限不足";
/// Generic reply for unexpected command-execution failures.
pub const FAILURE_REPLY: &str = "指令执行出错";

/// Permission level a command declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any member may invoke; the handler applies finer-grained rules.
    Member,
    /// Administrators only, enforced before the handler runs.
    Admin,
}

/// Handler context for one parsed command.
pub struct Context<'a> {
    pub store: &'a PolicyStore,
    pub actions: &'a GroupActions,
    pub group_id: &'a str,
    pub sender_id: &'a str,
    /// Administrator status of the sender (platform role or owner override).
    pub is_admin: bool,
    /// Target from the first mention segment, if any.
    pub mention: Option<UserId>,
    /// Whitespace-delimited tokens after the command word.
    pub args: Vec<&'a str>,
    /// Raw text after the command word, leading whitespace stripped.
    /// Internal whitespace is preserved for free-text arguments.
    pub tail: &'a str,
}

impl Context<'_> {
    /// The command's target: the first mention, or a literal identifier
    /// argument as fallback.
    pub fn target(&self) -> Option<&str> {
        self.mention.as_deref().or_else(|| {
            self.args
                .first()
                .copied()
                .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
        })
    }

    /// The tail with its first `skip` tokens removed; used to capture
    /// free-text arguments that follow target-selection tokens.
    pub fn tail_after(&self, skip: usize) -> &str {
        tail_after_tokens(self.tail, skip)
    }
}

/// Skip `n` whitespace-delimited tokens and return the trimmed remainder.
fn tail_after_tokens(text: &str, n: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..n {
        match rest.find(char::is_whitespace) {
            Some(pos) => rest = rest[pos..].trim_start(),
            None => return "",
        }
    }
    rest
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Permission level enforced by the registry before `handle` runs.
    fn access(&self) -> Access;

    /// Execute the command.
    async fn handle(&self, ctx: &Context<'_>) -> CommandResult;
}

/// Registry of command handlers, keyed by the leading command word.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn CommandHandler>> = HashMap::new();

        // Moderation
        handlers.insert("/kick", Box::new(KickHandler));
        handlers.insert("/ban", Box::new(BanHandler));
        handlers.insert("/unban", Box::new(UnbanHandler));
        handlers.insert("/muteall", Box::new(WholeMuteHandler::muteall()));
        handlers.insert("/unmuteall", Box::new(WholeMuteHandler::unmuteall()));

        // Nickname locks
        handlers.insert("/lockname", Box::new(LockNameHandler));
        handlers.insert("/unlockname", Box::new(UnlockNameHandler));

        // Targeted users
        handlers.insert("针对", Box::new(TargetAddHandler));
        handlers.insert("取消针对", Box::new(TargetRemoveHandler));
        handlers.insert("针对列表", Box::new(TargetListHandler));

        Self { handlers }
    }

    /// Parse and dispatch a message's command, if it carries one.
    ///
    /// Permission and validation failures surface as chat replies; any other
    /// handler failure is logged and reported as a generic failure message.
    /// Nothing propagates to the event pipeline.
    pub async fn dispatch(
        &self,
        store: &PolicyStore,
        actions: &GroupActions,
        ev: &MessageEvent,
        is_admin: bool,
    ) {
        let text = ev.raw_message.trim();
        let Some(word) = text.split_whitespace().next() else {
            return;
        };
        let Some(handler) = self.handlers.get(word) else {
            // Unknown commands and plain chatter are not errors.
            return;
        };

        if handler.access() == Access::Admin && !is_admin {
            actions.send_text_best_effort(&ev.group_id, DENIED_REPLY).await;
            return;
        }

        let tail = tail_after_tokens(text, 1);
        let ctx = Context {
            store,
            actions,
            group_id: &ev.group_id,
            sender_id: &ev.user_id,
            is_admin,
            mention: ev.first_mention(),
            args: tail.split_whitespace().collect(),
            tail,
        };

        if let Err(e) = handler.handle(&ctx).await {
            match e.reply_text() {
                Some(reply) => actions.send_text_best_effort(&ev.group_id, reply).await,
                None => {
                    error!(
                        command = %word,
                        group = %ev.group_id,
                        user = %ev.user_id,
                        code = e.error_code(),
                        error = %e,
                        "command execution failed"
                    );
                    actions.send_text_best_effort(&ev.group_id, FAILURE_REPLY).await;
                }
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_skipping_preserves_interior_whitespace() {
        assert_eq!(tail_after_tokens("/lockname 夜  猫", 1), "夜  猫");
        assert_eq!(tail_after_tokens("[CQ:at,qq=1] 夜  猫", 1), "夜  猫");
        assert_eq!(tail_after_tokens("one", 1), "");
        assert_eq!(tail_after_tokens("", 1), "");
        assert_eq!(tail_after_tokens("a b c", 0), "a b c");
    }

    #[test]
    fn registry_knows_the_full_command_table() {
        let registry = Registry::new();
        for cmd in [
            "/kick",
            "/ban",
            "/unban",
            "/muteall",
            "/unmuteall",
            "/lockname",
            "/unlockname",
            "针对",
            "取消针对",
            "针对列表",
        ] {
            assert!(registry.handlers.contains_key(cmd), "missing {cmd}");
        }
    }

    #[test]
    fn admin_only_commands_declare_it() {
        let registry = Registry::new();
        for cmd in
            ["/kick", "/ban", "/unban", "/muteall", "/unmuteall", "针对", "取消针对", "针对列表"]
        {
            assert_eq!(registry.handlers[cmd].access(), Access::Admin, "{cmd}");
        }
        for cmd in ["/lockname", "/unlockname"] {
            assert_eq!(registry.handlers[cmd].access(), Access::Member, "{cmd}");
        }
    }
}
