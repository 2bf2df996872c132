use anyhow::{Context as _, Result};
use console::style;

use recap_core::DiscordClient;
use recap_store::Secret;

use super::Context;
use crate::ui;

pub async fn guilds(ctx: &Context) -> Result<()> {
    let token = ctx.token(Secret::ChatToken)?;
    let client = DiscordClient::new(&ctx.config.discord)?;

    let spinner = ui::spinner("Fetching servers...");
    let listed = client.list_guilds(&token).await;
    spinner.finish_and_clear();
    let guilds = listed.context("failed to list servers")?;

    if guilds.is_empty() {
        ui::info("This account is not in any servers.");
        return Ok(());
    }
    println!();
    for guild in &guilds {
        println!("  {}  {}", style(guild.id).dim(), guild.name);
    }
    println!();
    ui::info("List channels with: recap channels <GUILD_ID>");
    Ok(())
}

pub async fn channels(ctx: &Context, guild_id: &str) -> Result<()> {
    let token = ctx.token(Secret::ChatToken)?;
    let client = DiscordClient::new(&ctx.config.discord)?;

    let spinner = ui::spinner("Fetching channels...");
    let listed = client.list_guild_channels(guild_id, &token).await;
    spinner.finish_and_clear();
    let channels = listed.with_context(|| format!("failed to list channels of {}", guild_id))?;

    let text: Vec<_> = channels.iter().filter(|c| c.is_text()).collect();
    if text.is_empty() {
        ui::info("No readable text channels.");
        return Ok(());
    }
    println!();
    for channel in text {
        println!(
            "  {}  #{}",
            style(channel.id).dim(),
            channel.name.as_deref().unwrap_or("unnamed")
        );
    }
    println!();
    Ok(())
}
