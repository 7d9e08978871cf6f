//! Targeted-user management commands: `针对`, `取消针对`, `针对列表`.

use super::{Access, CommandHandler, Context};
use crate::error::{CommandError, CommandResult};
use crate::target;
use async_trait::async_trait;

const MISSING_TARGET: &str = "请指定要针对的成员";

/// `针对 <@target|id>`: flag a user for automatic message suppression.
pub struct TargetAddHandler;

#[async_trait]
impl CommandHandler for TargetAddHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let user = ctx.target().ok_or_else(|| CommandError::Invalid(MISSING_TARGET.into()))?;
        let user = user.to_string();
        target::add(ctx.store, ctx.group_id, &user, ctx.sender_id).await?;
        ctx.actions
            .send_text(ctx.group_id, &format!("已将 {user} 加入针对名单"))
            .await?;
        Ok(())
    }
}

/// `取消针对 <@target|id>`: clear the flag.
pub struct TargetRemoveHandler;

#[async_trait]
impl CommandHandler for TargetRemoveHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let user = ctx.target().ok_or_else(|| CommandError::Invalid(MISSING_TARGET.into()))?;
        let user = user.to_string();
        if target::remove(ctx.store, ctx.group_id, &user).await? {
            ctx.actions
                .send_text(ctx.group_id, &format!("已取消对 {user} 的针对"))
                .await?;
        } else {
            ctx.actions.send_text(ctx.group_id, "该用户不在针对名单中").await?;
        }
        Ok(())
    }
}

/// `针对列表`: list the group's targeted users.
pub struct TargetListHandler;

#[async_trait]
impl CommandHandler for TargetListHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let entries = target::list(ctx.store, ctx.group_id);
        if entries.is_empty() {
            ctx.actions.send_text(ctx.group_id, "当前没有针对中的成员").await?;
            return Ok(());
        }

        let mut reply = String::from("针对名单:");
        for (user, record) in entries {
            reply.push_str(&format!("\n{user} (由 {} 添加)", record.added_by));
        }
        ctx.actions.send_text(ctx.group_id, &reply).await?;
        Ok(())
    }
}
