use tracing::debug;

use crate::commands::lottery::manager::LotteryRequest;
use crate::commands::lottery::models::DEFAULT_PARTICIPANTS_LIMIT;
use crate::commands::Context;
use crate::error::Result;

#[poise::command(
    slash_command,
    prefix_command,
    subcommands("new", "join", "list", "delete")
)]
pub async fn lottery(ctx: Context<'_>) -> Result<()> {
    ctx.say("Available subcommands: new, join, list, delete")
        .await?;
    Ok(())
}

/// Create a new lottery in the current scene
#[poise::command(slash_command, prefix_command)]
pub async fn new(
    ctx: Context<'_>,
    #[description = "Keyword identifying the lottery"] keyword: String,
    #[description = "Maximum number of participants"] number: Option<u32>,
    #[description = "Start time, YYYY-MM-DD/HH:MM:SS"] start: Option<String>,
    #[description = "End time, YYYY-MM-DD/HH:MM:SS"] end: Option<String>,
) -> Result<()> {
    let scene = ctx.channel_id().get();
    let creator = ctx.author().id.get();
    debug!(
        "Trying to create a new lottery in scene {} by user {}",
        scene, creator,
    );

    let request = LotteryRequest {
        scene,
        creator,
        bot_id: ctx.framework().bot_id.get(),
        keyword,
        participants_limit: number.unwrap_or(DEFAULT_PARTICIPANTS_LIMIT as u32) as usize,
        start,
        end,
    };
    let http = ctx.serenity_context().http.clone();

    let reply = match ctx.data().manager.create(request, http) {
        Ok(lottery) => format!(
            "Lottery: {} created with start time [{}], end time [{}], \
             maximum {} participants by {}",
            lottery.keyword,
            lottery.start_time,
            lottery.end_time,
            lottery.participants_limit,
            lottery.creator,
        ),
        Err(err) => err.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Join the lottery with the given keyword
#[poise::command(slash_command, prefix_command)]
pub async fn join(
    ctx: Context<'_>,
    #[description = "Keyword identifying the lottery"] keyword: String,
) -> Result<()> {
    let scene = ctx.channel_id().get();
    let user = ctx.author().id.get();

    let reply = match ctx.data().manager.join(scene, user, &keyword) {
        Ok(lottery) => format!("Joined lottery {} successfully", lottery.keyword),
        Err(err) => err.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Get a list of lotteries running in the current scene
#[poise::command(slash_command, prefix_command)]
pub async fn list(ctx: Context<'_>) -> Result<()> {
    let scene = ctx.channel_id().get();

    let reply = match ctx.data().manager.list(scene) {
        Ok(lotteries) => lotteries
            .iter()
            .map(|lottery| lottery.pretty_print())
            .collect::<Vec<String>>()
            .join("\n"),
        Err(err) => err.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Delete the lottery with the given keyword
#[poise::command(slash_command, prefix_command)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Keyword identifying the lottery"] keyword: String,
) -> Result<()> {
    let scene = ctx.channel_id().get();
    let user = ctx.author().id.get();

    let reply = match ctx.data().manager.delete(scene, user, &keyword) {
        Ok(()) => format!("Lottery with keyword '{}' deleted successfully", keyword),
        Err(err) => err.to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}
