use anyhow::{bail, Result};

use recap_core::{DiscordClient, RecapError};
use recap_store::Secret;

use super::Context;
use crate::ui;

pub async fn run(ctx: &Context) -> Result<()> {
    ui::header("Connect recap");
    ui::detail("Tokens are kept in the recap data directory, base64-encoded.");
    println!();

    let chat_token = ui::prompt_password("Discord token")?;
    let summary_token = ui::prompt_password("OpenRouter API key")?;
    let chat_token = chat_token.trim();
    let summary_token = summary_token.trim();

    if chat_token.is_empty() || summary_token.is_empty() {
        bail!("Both tokens are required.");
    }

    let spinner = ui::spinner("Checking Discord token...");
    let client = DiscordClient::new(&ctx.config.discord)?;
    let checked = client.list_guilds(chat_token).await;
    spinner.finish_and_clear();

    match checked {
        Ok(guilds) => ui::success(&format!("Discord token works ({} servers).", guilds.len())),
        Err(RecapError::Auth) => {
            ui::error("Discord rejected that token.");
            bail!("invalid Discord token");
        }
        Err(e) => ui::info(&format!("Could not verify the Discord token: {}", e)),
    }

    let vault = ctx.vault();
    vault.set_secret(Secret::ChatToken, chat_token)?;
    vault.set_secret(Secret::SummaryToken, summary_token)?;

    ui::success("Tokens saved.");
    Ok(())
}
