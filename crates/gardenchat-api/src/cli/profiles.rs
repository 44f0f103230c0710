//! `gchat profiles`: list the configured chat profiles.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use gardenchat_types::chat::ChatProfile;
use gardenchat_types::llm::ProviderType;

/// Print the profiles as a table, or as JSON.
pub fn list_profiles(profiles: &[ChatProfile], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profiles)?);
        return Ok(());
    }

    println!();
    println!("{}", profiles_table(profiles));
    println!();
    println!(
        "  {} profile{} {} pick one with {}",
        style(profiles.len()).bold(),
        if profiles.len() == 1 { "" } else { "s" },
        style("·").dim(),
        style("gchat chat --profile <id>").cyan(),
    );
    println!();

    Ok(())
}

fn profiles_table(profiles: &[ChatProfile]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Provider").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for profile in profiles {
        let id = if profile.default {
            format!("{} (default)", profile.id)
        } else {
            profile.id.clone()
        };
        let provider_cell = match profile.provider {
            ProviderType::Anthropic => Cell::new("anthropic").fg(Color::Magenta),
            ProviderType::Gemini => Cell::new("gemini").fg(Color::Blue),
        };

        table.add_row(vec![
            Cell::new(id).fg(Color::Cyan),
            Cell::new(&profile.name),
            provider_cell,
            Cell::new(&profile.model).fg(Color::DarkGrey),
            Cell::new(&profile.description),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenchat_types::chat::default_profiles;

    #[test]
    fn test_table_lists_every_profile() {
        let profiles = default_profiles();
        let table = profiles_table(&profiles);
        assert_eq!(table.row_iter().count(), profiles.len());

        let rendered = table.to_string();
        let default = profiles.iter().find(|p| p.default).unwrap();
        assert!(rendered.contains(&format!("{} (default)", default.id)));
    }
}
