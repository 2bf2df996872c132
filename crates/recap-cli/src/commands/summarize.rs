use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};

use recap_core::{
    emit_result, DiscordClient, SearchRecord, SearchRequest, Session, SummaryClient,
};
use recap_store::Secret;

use super::{Context, WindowArgs};
use crate::ui;

pub async fn run(ctx: &Context, args: WindowArgs, timeout_secs: Option<u64>) -> Result<()> {
    let window = args.window()?;
    let request = SearchRequest {
        channel_id: ctx.channel_id(args.channel.clone())?,
        chat_token: ctx.token(Secret::ChatToken)?,
        summary_token: ctx.token(Secret::SummaryToken)?,
        from: window.from,
        to: window.to,
        timezone: chrono::Local::now().offset().to_string(),
    };

    let discord_config = ctx.discord_config(args.max_pages);
    let discord = DiscordClient::new(&discord_config)?;
    let summarizer = SummaryClient::new(&ctx.config.summarizer)?;
    let session = Session::new(&discord, &discord, &summarizer, &ctx.store)
        .with_options(discord_config.collect_options());

    let status = ctx.status("summarize", "Starting...");
    let search = session.run(&request, &status);
    let outcome = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), search)
            .await
            .map_err(|_| anyhow!("gave up after {}s", secs)),
        None => Ok(search.await),
    };
    status.finish();
    let record = outcome?.context("summarization failed")?;

    if ctx.progress_json {
        emit_result("summary", "complete", serde_json::to_value(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

pub fn print_record(record: &SearchRecord) {
    ui::header(&format!("#{} · {}", record.channel_name, record.server_name));
    println!("{}", record.summary);
    println!();

    let range = match (record.from_date, record.to_date) {
        (Some(from), Some(to)) => format!(
            "{} to {}",
            from.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            to.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        ),
        _ => "no messages".to_string(),
    };
    ui::detail(&format!("{} messages, {}", record.message_count, range));
    if !record.timezone.is_empty() {
        ui::detail(&format!("Window entered in UTC{}", record.timezone));
    }
    ui::detail(&format!(
        "{} tokens ({} prompt, {} completion), ${:.4}",
        record.usage.total_tokens,
        record.usage.prompt_tokens,
        record.usage.completion_tokens,
        record.usage.cost_usd
    ));
}
