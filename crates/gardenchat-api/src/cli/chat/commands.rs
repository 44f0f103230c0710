//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and change settings, manage attachments, or
//! inspect and reset the conversation.

use std::path::PathBuf;

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat session.
    Exit,
    /// Show the current settings.
    Settings,
    SetTemperature(f64),
    SetMaxTokens(u32),
    /// Switch to another chat profile.
    Profile(String),
    /// Queue an image for the next message.
    Attach(PathBuf),
    /// Show conversation history for this session.
    History,
    /// Forget the conversation, keep the settings.
    Reset,
    /// Recognized command with a bad argument.
    Invalid(String),
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts
        .get(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/settings" => ChatCommand::Settings,
        "/history" => ChatCommand::History,
        "/reset" | "/new" => ChatCommand::Reset,
        "/set" => parse_set(arg.as_deref()),
        "/model" | "/profile" => match arg {
            Some(id) => ChatCommand::Profile(id),
            None => ChatCommand::Invalid("/model requires a profile id".to_string()),
        },
        "/attach" | "/image" => match arg {
            Some(path) => ChatCommand::Attach(PathBuf::from(path)),
            None => ChatCommand::Invalid("/attach requires a file path".to_string()),
        },
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

fn parse_set(arg: Option<&str>) -> ChatCommand {
    let usage = || ChatCommand::Invalid("usage: /set temperature <0.0-1.0> | /set max_tokens <n>".to_string());
    let Some(arg) = arg else {
        return usage();
    };
    let mut words = arg.split_whitespace();
    let (Some(key), Some(value)) = (words.next(), words.next()) else {
        return usage();
    };

    match key.to_lowercase().as_str() {
        "temperature" | "temp" => value
            .parse::<f64>()
            .map(ChatCommand::SetTemperature)
            .unwrap_or_else(|_| ChatCommand::Invalid(format!("not a number: {value}"))),
        "max_tokens" | "max-tokens" | "tokens" => value
            .parse::<u32>()
            .map(ChatCommand::SetMaxTokens)
            .unwrap_or_else(|_| ChatCommand::Invalid(format!("not a whole number: {value}"))),
        _ => usage(),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/settings", "Show the current settings"),
        ("/set temperature <v>", "Set sampling temperature (0.0-1.0)"),
        ("/set max_tokens <n>", "Set maximum output tokens"),
        ("/model <id>", "Switch chat profile"),
        ("/attach <path>", "Attach an image to the next message"),
        ("/history", "Show conversation history"),
        ("/reset", "Start over with the same settings"),
        ("/clear", "Clear the screen"),
        ("/exit", "End the chat session"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (command, help) in rows {
        println!("  {:<22} {}", style(command).cyan(), help);
    }
    println!();
    println!("  {}", style("Ctrl+D to exit, Ctrl+C clears the line").dim());
    println!();
}
