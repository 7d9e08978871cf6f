//! Nickname lock commands.
//!
//! `/lockname [@target] <name>` and `/unlockname [@target]` drive the
//! per-(group, user) lock state machine. Locking or unlocking another user
//! requires an administrator; self-service is allowed unless an
//! administrator placed the lock, in which case only an administrator may
//! remove or change it.
//!
//! The nickname is free text: everything after the target-selection tokens,
//! interior whitespace included, normalized before storage.

use super::{Access, CommandHandler, Context};
use crate::error::{CommandError, CommandResult};
use crate::guard;
use crate::normalize::normalize_name;
use async_trait::async_trait;

/// `/lockname [@target] <name>`: set a nickname lock.
pub struct LockNameHandler;

#[async_trait]
impl CommandHandler for LockNameHandler {
    fn access(&self) -> Access {
        Access::Member
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let is_self = ctx.mention.is_none();
        let target = ctx.mention.clone().unwrap_or_else(|| ctx.sender_id.to_string());

        // The name is the remainder after the mention token (if any).
        let raw_name = if is_self { ctx.tail } else { ctx.tail_after(1) };
        let nickname = normalize_name(raw_name);
        if nickname.is_empty() {
            return Err(CommandError::Invalid("请指定要锁定的昵称".into()));
        }

        if is_self {
            let admin_locked = ctx.store.read(|doc| {
                doc.lock_for(ctx.group_id, ctx.sender_id)
                    .is_some_and(|lock| lock.locked_by_admin)
            });
            if admin_locked && !ctx.is_admin {
                return Err(CommandError::Denied("您的昵称已被管理员锁定，无法自行修改".into()));
            }
        } else if !ctx.is_admin {
            return Err(CommandError::Denied("权限不足，无法锁定他人昵称".into()));
        }

        ctx.actions.set_group_card(ctx.group_id, &target, &nickname).await?;
        guard::apply_lock(ctx.store, ctx.group_id, &target, &nickname, !is_self).await?;

        let operator = if is_self { "自己" } else { "管理员" };
        ctx.actions
            .send_text(ctx.group_id, &format!("已{operator}锁定 {target} 的昵称为: {nickname}"))
            .await?;
        Ok(())
    }
}

/// `/unlockname [@target]`: clear a nickname lock.
pub struct UnlockNameHandler;

#[async_trait]
impl CommandHandler for UnlockNameHandler {
    fn access(&self) -> Access {
        Access::Member
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let is_self = ctx.mention.is_none();
        let target = ctx.mention.clone().unwrap_or_else(|| ctx.sender_id.to_string());

        if is_self {
            let admin_locked = ctx.store.read(|doc| {
                doc.lock_for(ctx.group_id, ctx.sender_id)
                    .is_some_and(|lock| lock.locked_by_admin)
            });
            if admin_locked && !ctx.is_admin {
                return Err(CommandError::Denied("您的昵称由管理员锁定，请联系管理员解锁".into()));
            }
        } else if !ctx.is_admin {
            return Err(CommandError::Denied("权限不足".into()));
        }

        if guard::clear_lock(ctx.store, ctx.group_id, &target).await? {
            ctx.actions
                .send_text(ctx.group_id, &format!("已解除 {target} 的昵称锁定"))
                .await?;
        } else {
            ctx.actions.send_text(ctx.group_id, "该用户未被锁定昵称").await?;
        }
        Ok(())
    }
}
