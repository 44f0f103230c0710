//! Welcome banner display for chat sessions.

use console::style;

use gardenchat_types::chat::{ChatProfile, ChatSettings};

/// Print the welcome banner at the start of a chat session.
pub fn print_welcome_banner(profile: &ChatProfile, settings: &ChatSettings, session_id: &str) {
    let icon = profile.icon.as_deref().unwrap_or("*");

    println!();
    println!("  {} {}", icon, style(&profile.name).cyan().bold());
    if !profile.description.is_empty() {
        println!("  {}", style(&profile.description).dim());
    }
    println!();
    println!("  {}  {}", style("Model:").bold(), style(&profile.model).dim());
    print_settings_line(settings);
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(&session_id[..8.min(session_id.len())]).dim()
    );
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}

/// One-line summary of the current settings.
pub fn print_settings_line(settings: &ChatSettings) {
    println!(
        "  {}  temperature {} {} max tokens {}",
        style("Settings:").bold(),
        style(format!("{:.1}", settings.temperature)).dim(),
        style("\u{00b7}").dim(),
        style(settings.max_output_tokens).dim(),
    );
}
