//! Interactive profile selection.

use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;

use gardenchat_types::chat::ChatProfile;

/// Ask the user to pick a profile. Returns the chosen profile id, or `None`
/// if the prompt was dismissed.
pub fn pick_profile(profiles: &[ChatProfile]) -> anyhow::Result<Option<String>> {
    let items: Vec<String> = profiles
        .iter()
        .map(|p| {
            let icon = p.icon.as_deref().unwrap_or(" ");
            format!("{icon} {} ({})", p.name, p.model)
        })
        .collect();
    let default = profiles.iter().position(|p| p.default).unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose a chat profile")
        .items(&items)
        .default(default)
        .interact_opt()?;

    Ok(selection.map(|i| profiles[i].id.clone()))
}
