//! Main chat loop orchestration.
//!
//! Picks a profile, starts a session, shows the banner, then reads input
//! until exit: slash commands adjust the session, anything else is sent as
//! a message and the reply streams to the terminal.

use std::io::Write;

use console::style;
use tracing::{debug, info};

use gardenchat_core::chat::session::{ChatSession, UserTurn};
use gardenchat_types::attachment::Attachment;
use gardenchat_types::chat::SettingsPatch;
use gardenchat_types::llm::{ContentPart, MessageRole};

use crate::cli::SettingsArgs;
use crate::cli::attachment::read_attachment;
use crate::state::AppState;

use super::banner::{print_settings_line, print_welcome_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::picker::pick_profile;
use super::renderer::{ChatRenderer, accent_for, print_token, thinking_spinner};

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState, args: &SettingsArgs) -> anyhow::Result<()> {
    let mut patch = args.patch();
    if patch.profile.is_none() && console::user_attended() && state.config.profiles.len() > 1 {
        patch.profile = pick_profile(&state.config.profiles)?;
    }

    let mut session = ChatSession::start(state.context.clone(), &patch)?;
    let session_id = session.id().to_string();
    info!(session_id = %session_id, profile = %session.profile().id, "chat session started");

    print_welcome_banner(session.profile(), session.settings(), &session_id);
    let mut renderer = ChatRenderer::new(Some(accent_for(session.profile().provider)));

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    let mut staged = StagedAttachments::default();

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => {
                    println!("\n  {}", style("Session ended.").dim());
                    break;
                }
                ChatCommand::Settings => {
                    println!();
                    println!("  {}  {}", style("Profile:").bold(), session.profile().name);
                    print_settings_line(session.settings());
                    println!();
                }
                ChatCommand::SetTemperature(value) => apply(
                    &mut session,
                    SettingsPatch {
                        temperature: Some(value),
                        ..Default::default()
                    },
                ),
                ChatCommand::SetMaxTokens(value) => apply(
                    &mut session,
                    SettingsPatch {
                        max_output_tokens: Some(value),
                        ..Default::default()
                    },
                ),
                ChatCommand::Profile(id) => {
                    apply(
                        &mut session,
                        SettingsPatch {
                            profile: Some(id),
                            ..Default::default()
                        },
                    );
                    renderer = ChatRenderer::new(Some(accent_for(session.profile().provider)));
                }
                ChatCommand::Attach(path) => match read_attachment(&path).await {
                    Ok(attachment) => {
                        println!(
                            "\n  {} Attached {} ({} bytes), sent with your next message.\n",
                            style("+").cyan().bold(),
                            style(&attachment.filename).dim(),
                            attachment.data.len()
                        );
                        staged.push(attachment);
                    }
                    Err(e) => println!("\n  {} {e:#}\n", style("!").red().bold()),
                },
                ChatCommand::History => print_history(&session),
                ChatCommand::Reset => {
                    session.reset();
                    staged.clear();
                    println!("\n  {} Conversation cleared.\n", style("*").cyan().bold());
                }
                ChatCommand::Invalid(message) => {
                    println!("\n  {} {message}\n", style("!").yellow().bold());
                }
                ChatCommand::Unknown(name) => {
                    println!(
                        "\n  {} Unknown command: {}. Type /help for available commands.\n",
                        style("?").yellow().bold(),
                        style(name).dim()
                    );
                }
            }
            continue;
        }

        let mut turn = UserTurn::text(text);
        turn.attachments = staged.for_turn();

        let spinner = thinking_spinner();
        let token_spinner = spinner.clone();
        let label = session.profile().name.clone();
        let mut first_token = true;

        let result = session
            .send_message(turn, move |token| {
                if first_token {
                    first_token = false;
                    token_spinner.finish_and_clear();
                    print!("\n  {} ", style(&label).cyan().bold());
                    let _ = std::io::stdout().flush();
                }
                print_token(token);
            })
            .await;
        spinner.finish_and_clear();

        match result {
            Ok(reply) => {
                println!();
                if reply.stop_reason.as_deref() == Some("content_filter") {
                    println!(
                        "\n  {} The reply was stopped by the safety filter.",
                        style("!").yellow().bold()
                    );
                }
                renderer.print_stats_footer(reply.usage, reply.response_ms, &reply.model);
                println!();
                staged.clear();
                debug!(turns = session.turn_count(), "turn complete");
            }
            Err(e) => {
                eprintln!("\n  {} {e}", style("!").red().bold());
                if !staged.is_empty() {
                    eprintln!(
                        "  {}",
                        style(format!("{} attachment(s) kept for your next message.", staged.len())).dim()
                    );
                }
                eprintln!("  {}", style("Type a message to retry, /exit to quit.").dim());
            }
        }
    }

    chat_input.flush();
    let usage = session.usage();
    info!(
        session_id = %session_id,
        turns = session.turn_count(),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "chat session ended"
    );
    Ok(())
}

/// Images queued with `/attach`.
///
/// They ride along with every message until one is answered successfully.
#[derive(Debug, Default)]
struct StagedAttachments {
    items: Vec<Attachment>,
}

impl StagedAttachments {
    fn push(&mut self, attachment: Attachment) {
        self.items.push(attachment);
    }

    fn for_turn(&self) -> Vec<Attachment> {
        self.items.clone()
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn apply(session: &mut ChatSession, patch: SettingsPatch) {
    match session.update_settings(&patch) {
        Ok(settings) => {
            println!();
            print_settings_line(settings);
            println!();
        }
        Err(e) => println!("\n  {} {e}\n", style("!").red().bold()),
    }
}

fn print_history(session: &ChatSession) {
    println!();
    if session.history().is_empty() {
        println!("  {}", style("No messages yet.").dim());
    }
    for msg in session.history() {
        let role_label = match msg.role {
            MessageRole::User => style("You".to_string()).green(),
            MessageRole::Assistant => style(session.profile().name.clone()).cyan(),
        };
        let mut text = String::new();
        let mut images = 0;
        for part in &msg.content {
            match part {
                ContentPart::Text { text: t } => text.push_str(t),
                _ => images += 1,
            }
        }
        let preview = if text.chars().count() > 100 {
            format!("{}...", text.chars().take(97).collect::<String>())
        } else {
            text
        };
        if images > 0 {
            println!("  {} [{images} image(s)] {}", role_label.bold(), preview);
        } else {
            println!("  {} {}", role_label.bold(), preview);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> Attachment {
        Attachment::new(name, Some("image/png".to_string()), b"\x89PNG\r\n\x1a\n".to_vec())
    }

    #[test]
    fn test_staged_attachments_survive_failed_turn() {
        let mut staged = StagedAttachments::default();
        staged.push(png("a.png"));
        staged.push(png("b.png"));

        let first_try = staged.for_turn();
        assert_eq!(first_try.len(), 2);
        // Send failed, so the staging area is untouched.
        assert_eq!(staged.len(), 2);

        let retry = staged.for_turn();
        assert_eq!(retry, first_try);
        staged.clear();
        assert!(staged.for_turn().is_empty());
    }
}
