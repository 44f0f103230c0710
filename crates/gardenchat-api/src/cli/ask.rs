//! One-shot question: send a single message and print the answer.

use std::io::Write;
use std::path::PathBuf;

use console::style;

use gardenchat_core::chat::session::{ChatSession, UserTurn};

use crate::cli::SettingsArgs;
use crate::cli::attachment::read_attachment;
use crate::cli::chat::renderer::{ChatRenderer, accent_for, print_token, thinking_spinner};
use crate::state::AppState;

/// Send `text` (plus any images) to a fresh session.
///
/// Streams tokens unless `no_stream` or `json` is set; in those cases the
/// full reply is fetched first and then rendered (or printed as JSON).
pub async fn ask(
    state: &AppState,
    text: String,
    images: &[PathBuf],
    no_stream: bool,
    settings: &SettingsArgs,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = ChatSession::start(state.context.clone(), &settings.patch())?;

    let mut turn = UserTurn::text(text);
    for path in images {
        turn = turn.with_attachment(read_attachment(path).await?);
    }

    let renderer = ChatRenderer::new(Some(accent_for(session.profile().provider)));

    if no_stream || json {
        let spinner = (!json).then(thinking_spinner);
        let result = session.complete_message(turn).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let reply = result?;

        if json {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        } else {
            println!("{}", renderer.render_final(&reply.content).trim_end());
            renderer.print_stats_footer(reply.usage, reply.response_ms, &reply.model);
        }
        return Ok(());
    }

    let spinner = thinking_spinner();
    let token_spinner = spinner.clone();
    let mut first_token = true;
    let result = session
        .send_message(turn, move |token| {
            if first_token {
                first_token = false;
                token_spinner.finish_and_clear();
            }
            print_token(token);
        })
        .await;
    spinner.finish_and_clear();
    let reply = result?;

    println!();
    let _ = std::io::stdout().flush();
    if reply.stop_reason.as_deref() == Some("content_filter") {
        eprintln!(
            "  {} The reply was stopped by the safety filter.",
            style("!").yellow().bold()
        );
    }
    renderer.print_stats_footer(reply.usage, reply.response_ms, &reply.model);
    Ok(())
}
