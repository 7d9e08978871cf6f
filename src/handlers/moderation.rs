//! Moderation commands: kick, timed mute, group-wide mute.

use super::{Access, CommandHandler, Context};
use crate::error::{CommandError, CommandResult};
use async_trait::async_trait;

/// Default `/ban` duration in seconds.
pub const DEFAULT_BAN_SECS: u64 = 600;

const MISSING_TARGET: &str = "请指定目标成员";

/// `/kick <@target>`: remove the target from the group.
pub struct KickHandler;

#[async_trait]
impl CommandHandler for KickHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let target = ctx.target().ok_or_else(|| CommandError::Invalid(MISSING_TARGET.into()))?;
        let target = target.to_string();
        ctx.actions.kick_members(ctx.group_id, &[&target]).await?;
        ctx.actions.send_text(ctx.group_id, &format!("已踢出成员 {target}")).await?;
        Ok(())
    }
}

/// `/ban <@target> [seconds]`: timed mute, default 600 s.
pub struct BanHandler;

#[async_trait]
impl CommandHandler for BanHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let target = ctx.target().ok_or_else(|| CommandError::Invalid(MISSING_TARGET.into()))?;
        let target = target.to_string();
        // The duration follows the target token. Zero would be an unban;
        // treated as "no duration given" like the historical parser did.
        let duration = ctx
            .args
            .get(1)
            .and_then(|tok| tok.parse::<u64>().ok())
            .filter(|&secs| secs != 0)
            .unwrap_or(DEFAULT_BAN_SECS);

        ctx.actions.set_group_ban(ctx.group_id, &target, duration).await?;
        ctx.actions
            .send_text(ctx.group_id, &format!("已禁言 {target} {duration}秒"))
            .await?;
        Ok(())
    }
}

/// `/unban <@target>`: clear a timed mute.
pub struct UnbanHandler;

#[async_trait]
impl CommandHandler for UnbanHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        let target = ctx.target().ok_or_else(|| CommandError::Invalid(MISSING_TARGET.into()))?;
        let target = target.to_string();
        ctx.actions.set_group_ban(ctx.group_id, &target, 0).await?;
        ctx.actions.send_text(ctx.group_id, &format!("已解除 {target} 禁言")).await?;
        Ok(())
    }
}

/// `/muteall` / `/unmuteall`: toggle the group-wide mute.
pub struct WholeMuteHandler {
    enable: bool,
}

impl WholeMuteHandler {
    pub fn muteall() -> Self {
        Self { enable: true }
    }

    pub fn unmuteall() -> Self {
        Self { enable: false }
    }
}

#[async_trait]
impl CommandHandler for WholeMuteHandler {
    fn access(&self) -> Access {
        Access::Admin
    }

    async fn handle(&self, ctx: &Context<'_>) -> CommandResult {
        ctx.actions.set_group_whole_ban(ctx.group_id, self.enable).await?;
        Ok(())
    }
}
