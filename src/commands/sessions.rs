//! Session management command handlers
//!
//! Implements the `sessions list|delete|rename` CLI commands against the
//! persisted session collection.

use crate::cli::SessionCommand;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle session management commands
pub fn handle_sessions(config: &Config, command: SessionCommand) -> Result<()> {
    let (store, _library) = super::build_state(config)?;

    match command {
        SessionCommand::List => {
            let sessions = store.sessions();

            if sessions.is_empty() {
                println!("{}", "No sessions found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            let active = store.active_session_id();
            for session in &sessions {
                let id = session.id.to_string();
                let id_short = if Some(session.id) == active {
                    format!("{} *", &id[..8])
                } else {
                    id[..8].to_string()
                };
                let title = truncate_title(&session.title, 40);
                let updated = session.updated_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    title,
                    session.messages.len(),
                    updated
                ]);
            }

            println!("\nStored Sessions:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume a session.",
                "chatvault chat --session <ID>".cyan()
            );
            println!();
        }
        SessionCommand::Delete { id } => {
            let session_id = super::resolve_session_id(&store, &id)?;
            store.delete_session(session_id);
            println!(
                "{}",
                format!("Deleted session {}", &session_id.to_string()[..8]).green()
            );
        }
        SessionCommand::Rename { id, title } => {
            let session_id = super::resolve_session_id(&store, &id)?;
            store.rename_session(session_id, &title);
            println!(
                "{}",
                format!(
                    "Renamed session {} to '{}'",
                    &session_id.to_string()[..8],
                    title.trim()
                )
                .green()
            );
        }
    }

    Ok(())
}

/// Shorten a title to at most `max` characters for table display
fn truncate_title(title: &str, max: usize) -> String {
    if title.chars().count() > max {
        let prefix: String = title.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", prefix)
    } else {
        title.to_string()
    }
}
