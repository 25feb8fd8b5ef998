use super::ui;
use crate::core::{SettingsEntry, SettingsRepository};
use anyhow::{Context, Result, bail};

/// Stores `value` under `key`, keeping any existing description and category.
pub async fn set_setting(settings: &dyn SettingsRepository, key: &str, value: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        bail!("Setting key must not be empty");
    }

    let existing = settings
        .get_setting(key)
        .await
        .with_context(|| format!("Failed to read setting {key}"))?;
    let entry = match existing {
        Some(entry) => SettingsEntry {
            value: value.trim().to_string(),
            ..entry
        },
        None => SettingsEntry {
            key: key.to_string(),
            value: value.trim().to_string(),
            description: None,
            category: Some("Endpoints".to_string()),
        },
    };
    settings
        .put_setting(entry)
        .await
        .with_context(|| format!("Failed to write setting {key}"))?;

    println!(
        "{} {} = {}",
        ui::style_text("Saved", ui::StyleType::Success),
        key,
        ui::style_text(value.trim(), ui::StyleType::Subtle)
    );
    Ok(())
}
