//! Prompt library command handlers
//!
//! Implements the `prompts list|save|remove` CLI commands against the
//! persisted prompt library.

use crate::cli::PromptCommand;
use crate::config::Config;
use crate::error::Result;
use crate::store::derive_title;
use colored::Colorize;
use prettytable::{format, Table};
use uuid::Uuid;

/// Handle prompt library commands
pub fn handle_prompts(config: &Config, command: PromptCommand) -> Result<()> {
    let (_store, library) = super::build_state(config)?;

    match command {
        PromptCommand::List => {
            let prompts = library.prompts();

            if prompts.is_empty() {
                println!("{}", "No saved prompts.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Prompt".bold(),
                "Saved".bold()
            ]);

            for prompt in &prompts {
                let id = prompt.id.to_string();
                let label = prompt
                    .title
                    .clone()
                    .unwrap_or_else(|| derive_title(&prompt.text));
                let preview = truncate_text(&prompt.text, 60);
                let saved = prompt.timestamp.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![id[..8].cyan(), label, preview, saved]);
            }

            println!("\nSaved Prompts:");
            table.printstd();
            println!();
        }
        PromptCommand::Save { text, title } => {
            if library.save(&text, title.as_deref()) {
                println!("{}", "Saved prompt to library".green());
            } else if text.trim().is_empty() {
                println!("{}", "Cannot save an empty prompt".yellow());
            } else {
                println!("{}", "Prompt is already in the library".yellow());
            }
        }
        PromptCommand::Remove { target } => {
            let needle = target.trim().to_lowercase();
            let matched: Vec<Uuid> = library
                .prompts()
                .iter()
                .map(|p| p.id)
                .filter(|id| id.to_string().starts_with(&needle))
                .collect();

            if needle.len() >= 8 && matched.len() == 1 {
                library.delete(matched[0]);
                println!(
                    "{}",
                    format!("Removed prompt {}", &matched[0].to_string()[..8]).green()
                );
            } else if library.is_saved(&target) {
                library.remove_by_text(&target);
                println!("{}", "Removed prompt from library".green());
            } else {
                println!(
                    "{}",
                    format!("No saved prompt matches '{}'", target.trim()).yellow()
                );
            }
        }
    }

    Ok(())
}

/// Shorten prompt text to at most `max` characters for table display
fn truncate_text(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max {
        let prefix: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", prefix)
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_flattens_newlines() {
        assert_eq!(truncate_text("line one\nline two", 60), "line one line two");
    }

    #[test]
    fn test_truncate_text_long_gets_ellipsis() {
        let long = "word ".repeat(30);
        let shortened = truncate_text(&long, 60);
        assert_eq!(shortened.chars().count(), 60);
        assert!(shortened.ends_with("..."));
    }
}
