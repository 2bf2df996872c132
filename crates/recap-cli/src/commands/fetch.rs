use anyhow::{Context as _, Result};
use chrono::Local;
use console::style;
use serde_json::json;

use recap_core::{collect_window, emit_result, DiscordClient};
use recap_store::Secret;

use super::{Context, WindowArgs};
use crate::ui;

pub async fn run(ctx: &Context, args: WindowArgs, json: bool) -> Result<()> {
    let window = args.window()?;
    let channel_id = ctx.channel_id(args.channel.clone())?;
    let token = ctx.token(Secret::ChatToken)?;

    let config = ctx.discord_config(args.max_pages);
    let client = DiscordClient::new(&config)?;

    let status = ctx.status("fetch", "Fetching messages...");
    let fetched = collect_window(
        &client,
        &channel_id,
        &token,
        window,
        &status,
        &config.collect_options(),
    )
    .await;
    status.finish();
    let messages = fetched.context("failed to fetch messages")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else {
        for message in &messages {
            let Some((username, text)) = message.speaker_and_text() else {
                continue;
            };
            let when = message.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
            println!(
                "{} {}: {}",
                style(when).dim(),
                style(username).bold(),
                text.trim()
            );
        }
        println!();
        ui::success(&format!("{} messages", messages.len()));
    }

    if ctx.progress_json {
        emit_result(
            "messages",
            "complete",
            json!({ "channel_id": channel_id, "count": messages.len() }),
        );
    }

    Ok(())
}
