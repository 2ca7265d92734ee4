/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`     - Interactive chat mode
- `sessions` - Manage stored sessions
- `prompts`  - Manage the saved prompt library

These handlers are intentionally small and use the library components:
the conversation store, the prompt library, and the HTTP transport.
*/

use crate::config::Config;
use crate::error::Result;
use crate::storage::StateVault;
use crate::store::{ConversationStore, PromptLibrary, StoreOptions};
use crate::transport::HttpCompletionClient;
use std::sync::Arc;
use uuid::Uuid;

// Prompt library command handlers
pub mod prompts;

// Session management command handlers
pub mod sessions;

// Special commands parser for interactive chat
pub mod special_commands;

/// Build the conversation store and prompt library from configuration
///
/// Both components share one state vault handle so they persist into the
/// same database.
pub(crate) fn build_state(config: &Config) -> Result<(ConversationStore, PromptLibrary)> {
    let vault = match &config.storage.path {
        Some(path) => StateVault::open(path)?,
        None => StateVault::open_default()?,
    };

    let transport = Arc::new(HttpCompletionClient::from_config(&config.api)?);
    let options = StoreOptions {
        stream: config.api.stream,
        auto_create_session: config.chat.auto_create_session,
    };

    let store = ConversationStore::new(vault.clone(), transport, options);
    let library = PromptLibrary::new(vault);

    Ok((store, library))
}

/// Resolve a session reference to a full session id
///
/// Accepts a full UUID or a unique prefix of at least eight characters,
/// matched case-insensitively against the stored sessions.
pub(crate) fn resolve_session_id(store: &ConversationStore, target: &str) -> Result<Uuid> {
    let needle = target.trim().to_lowercase();
    if needle.len() < 8 {
        return Err(anyhow::anyhow!(
            "Session id '{}' is too short, use at least 8 characters",
            target.trim()
        ));
    }

    let matched: Vec<Uuid> = store
        .sessions()
        .iter()
        .map(|s| s.id)
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();

    match matched.as_slice() {
        [] => Err(anyhow::anyhow!("No session matches '{}'", target.trim())),
        [id] => Ok(*id),
        many => Err(anyhow::anyhow!(
            "Session id '{}' is ambiguous ({} matches)",
            target.trim(),
            many.len()
        )),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Builds the conversation store and prompt library, then runs a
    //! readline-based interactive loop that submits user input to the
    //! completion service and renders the assistant response as it
    //! arrives.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::store::{derive_title, Role, StoreSnapshot};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::io::Write;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Optional session to resume, as a full id or unique prefix
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::commands::chat;
    /// use chatvault::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default(), None).await?;
    /// ```
    pub async fn run_chat(config: Config, session: Option<String>) -> Result<()> {
        let (store, library) = build_state(&config)?;
        let store = Arc::new(store);

        // Resolve the starting session: an explicit reference must exist,
        // otherwise reuse the restored active session or start fresh.
        if let Some(target) = session {
            let id = resolve_session_id(&store, &target)?;
            store.select_session(id);
        } else if store.active_session_id().is_none() {
            store.create_session();
        }

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(&store);

        let mut last_prompt: Option<String> = None;

        loop {
            let prompt = format_colored_prompt(&store);
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    // Check for special commands first
                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::NewSession) => {
                            store.create_session();
                            println!("{}", "Started a new chat".green());
                            continue;
                        }
                        Ok(SpecialCommand::ListSessions) => {
                            print_session_list(&store);
                            continue;
                        }
                        Ok(SpecialCommand::SwitchSession(target)) => {
                            handle_switch(&store, &target);
                            continue;
                        }
                        Ok(SpecialCommand::RenameSession(title)) => {
                            match store.active_session_id() {
                                Some(id) => {
                                    store.rename_session(id, &title);
                                    println!(
                                        "{}",
                                        format!("Renamed session to '{}'", title.trim()).green()
                                    );
                                }
                                None => println!("{}", "No active session to rename".yellow()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::DeleteSession) => {
                            match store.active_session_id() {
                                Some(id) => {
                                    store.delete_session(id);
                                    println!(
                                        "{}",
                                        format!("Deleted session {}", &id.to_string()[..8])
                                            .green()
                                    );
                                }
                                None => println!("{}", "No active session to delete".yellow()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::SavePrompt(text)) => {
                            match text.or_else(|| last_prompt.clone()) {
                                Some(text) => toggle_saved_prompt(&library, &text),
                                None => println!(
                                    "{}",
                                    "Nothing to save yet, send a prompt first".yellow()
                                ),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::ListPrompts) => {
                            print_prompt_list(&library);
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {
                            // Regular prompt for the completion service
                        }
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    }

                    // Add to history
                    rl.add_history_entry(trimmed)?;
                    last_prompt = Some(trimmed.to_string());

                    send_and_render(&store, trimmed).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Send a prompt and print the assistant response as it arrives
    ///
    /// The send runs on a background task while this function follows
    /// store snapshots, printing each newly arrived suffix of the
    /// assistant message. On transport failure the partial content stays
    /// visible and the recorded error is shown after it.
    async fn send_and_render(store: &Arc<ConversationStore>, prompt: &str) {
        let mut rx = store.subscribe();
        let send_store = Arc::clone(store);
        let text = prompt.to_string();
        // Target the active session; with none selected the store creates
        // one and selects it.
        let target = store.active_session_id();
        let mut send_task = tokio::spawn(async move { send_store.send(target, &text).await });

        print!("{} ", "assistant:".cyan().bold());
        let _ = std::io::stdout().flush();

        let mut printed = 0usize;
        let outcome = loop {
            tokio::select! {
                res = &mut send_task => break res,
                changed = rx.changed() => match changed {
                    Ok(()) => {
                        let suffix = {
                            let snapshot = rx.borrow();
                            next_suffix(&snapshot, printed)
                        };
                        if !suffix.is_empty() {
                            print!("{}", suffix);
                            let _ = std::io::stdout().flush();
                            printed += suffix.len();
                        }
                    }
                    Err(_) => break (&mut send_task).await,
                },
            }
        };

        match outcome {
            Ok(Ok(Some(session_id))) => {
                let snapshot = store.snapshot();
                let content = snapshot
                    .session(session_id)
                    .and_then(|s| s.messages.last())
                    .filter(|m| m.role == Role::Assistant)
                    .map(|m| m.content.as_str())
                    .unwrap_or("");
                if content.len() > printed {
                    print!("{}", &content[printed..]);
                }
                println!();
                if let Some(error) = snapshot.last_error {
                    eprintln!("{}", format!("Error: {}", error).red());
                }
            }
            Ok(Ok(None)) => println!(),
            Ok(Err(e)) => {
                println!();
                eprintln!("{}", format!("Error: {}", e).red());
            }
            Err(e) => {
                println!();
                tracing::error!("Send task failed: {}", e);
            }
        }
    }

    /// The not-yet-printed tail of the assistant message being streamed
    fn next_suffix(snapshot: &StoreSnapshot, printed: usize) -> String {
        let responding = match snapshot.responding.keys().next() {
            Some(id) => *id,
            None => return String::new(),
        };

        let content = snapshot
            .session(responding)
            .and_then(|s| s.messages.last())
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if content.len() > printed {
            content[printed..].to_string()
        } else {
            String::new()
        }
    }

    /// Display welcome banner at the start of interactive chat mode
    ///
    /// Shows a formatted banner with the application name, the active
    /// session, and basic instructions.
    fn print_welcome_banner(store: &Arc<ConversationStore>) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║            ChatVault Interactive Chat - Welcome!             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        if let Some(session) = store.active_session() {
            println!(
                "Session: {} {}",
                format!("[{}]", &session.id.to_string()[..8]).cyan(),
                session.title
            );
            if !session.messages.is_empty() {
                println!("History: {} messages restored", session.messages.len());
            }
        }

        println!("\nType '/help' for available commands, 'exit' to quit\n");
    }

    /// Readline prompt tagged with the active session title
    fn format_colored_prompt(store: &Arc<ConversationStore>) -> String {
        match store.active_session() {
            Some(session) => {
                let tag = truncate_tag(&session.title, 24);
                format!("{} >> ", format!("[{}]", tag).green())
            }
            None => format!("{} >> ", "[no session]".yellow()),
        }
    }

    /// Shorten a session title for use in the prompt tag
    fn truncate_tag(title: &str, max: usize) -> String {
        if title.chars().count() > max {
            let prefix: String = title.chars().take(max.saturating_sub(3)).collect();
            format!("{}...", prefix)
        } else {
            title.to_string()
        }
    }

    /// Print the numbered session list used by `/switch <n>`
    fn print_session_list(store: &Arc<ConversationStore>) {
        let snapshot = store.snapshot();
        if snapshot.sessions.is_empty() {
            println!("{}", "No sessions yet, type /new to start one".yellow());
            return;
        }

        println!();
        for (index, session) in snapshot.sessions.iter().enumerate() {
            let marker = if Some(session.id) == snapshot.active_session_id {
                "*"
            } else {
                " "
            };
            println!(
                "{} {:>2}. {} {} ({} messages)",
                marker,
                index + 1,
                format!("[{}]", &session.id.to_string()[..8]).cyan(),
                session.title,
                session.messages.len()
            );
        }
        println!();
    }

    /// Switch the active session by list number or id prefix
    fn handle_switch(store: &Arc<ConversationStore>, target: &str) {
        let resolved = match target.parse::<usize>() {
            Ok(number) => {
                let sessions = store.sessions();
                if number >= 1 && number <= sessions.len() {
                    Ok(sessions[number - 1].id)
                } else {
                    Err(anyhow::anyhow!(
                        "No session at position {}, see /list",
                        number
                    ))
                }
            }
            Err(_) => resolve_session_id(store, target),
        };

        match resolved {
            Ok(id) => {
                store.select_session(id);
                if let Some(session) = store.active_session() {
                    println!("{}", format!("Switched to '{}'", session.title).green());
                }
            }
            Err(e) => eprintln!("{}", e.to_string().red()),
        }
    }

    /// Save a prompt to the library, or remove it when already saved
    fn toggle_saved_prompt(library: &PromptLibrary, text: &str) {
        if library.is_saved(text) {
            library.remove_by_text(text);
            println!("{}", "Removed prompt from library".yellow());
        } else if library.save(text, None) {
            println!("{}", "Saved prompt to library".green());
        } else {
            println!("{}", "Nothing to save".yellow());
        }
    }

    /// Print the saved prompt list
    fn print_prompt_list(library: &PromptLibrary) {
        let prompts = library.prompts();
        if prompts.is_empty() {
            println!("{}", "No saved prompts, use /save to keep one".yellow());
            return;
        }

        println!();
        for (index, prompt) in prompts.iter().enumerate() {
            let label = prompt
                .title
                .clone()
                .unwrap_or_else(|| derive_title(&prompt.text));
            let preview: String = prompt.text.chars().take(60).collect();
            println!("{:>2}. {} {}", index + 1, label.bold(), preview.dimmed());
        }
        println!();
    }
}
