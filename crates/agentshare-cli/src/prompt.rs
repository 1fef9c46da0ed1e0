//! Overwrite confirmation for conflicting deploy targets.
//!
//! Uses dialoguer for terminal prompts.

use std::path::Path;

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

/// Decides, per conflicting target, whether to overwrite.
pub struct ConflictPrompt {
    theme: ColorfulTheme,
    assume_yes: bool,
}

impl ConflictPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            theme: ColorfulTheme::default(),
            assume_yes,
        }
    }

    /// Ask whether the existing deployment of `id` on `platform` should be
    /// replaced. `--yes` answers for the user.
    pub fn confirm_overwrite(&self, id: &str, platform: &str, location: &Path) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt(format!(
                "'{}' already exists on {} ({}). Overwrite?",
                id,
                style(platform).cyan(),
                location.display()
            ))
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}
