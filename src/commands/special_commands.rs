//! Special commands parser for interactive chat mode
//!
//! This module parses and handles special commands that can be entered during
//! interactive chat sessions. Special commands allow users to:
//! - Create, list, switch, rename, and delete sessions
//! - Save and list reusable prompts
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/` and the command word is case-insensitive.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands modify session or library state or display
/// information, rather than being sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new empty session and make it active
    NewSession,

    /// List stored sessions with their list numbers
    ListSessions,

    /// Switch the active session
    ///
    /// Accepts a list number from `/list` or a session id prefix of at
    /// least eight characters.
    SwitchSession(String),

    /// Rename the active session
    RenameSession(String),

    /// Delete the active session
    ///
    /// The most recently created remaining session becomes active.
    DeleteSession,

    /// Toggle a prompt in the saved prompt library
    ///
    /// With no argument the most recently sent prompt is used. Saving a
    /// prompt that is already in the library removes it instead.
    SavePrompt(Option<String>),

    /// List saved prompts
    ListPrompts,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the completion service as a prompt.
    None,
}

/// Parse a user input string into a special command
///
/// The command word is matched case-insensitively; arguments keep their
/// original casing so titles and prompt text survive intact.
///
/// # Arguments
///
/// * `input` - The user input string to parse
///
/// # Returns
///
/// Returns Ok(SpecialCommand) for valid commands or SpecialCommand::None
/// for regular prompts.
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not
/// a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an
/// argument it does not take.
/// Returns CommandError::MissingArgument if a command requires an argument
/// but none was provided.
///
/// # Examples
///
/// ```
/// use chatvault::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/new").unwrap();
/// assert_eq!(cmd, SpecialCommand::NewSession);
///
/// let cmd = parse_special_command("/rename Weekend plans").unwrap();
/// assert_eq!(cmd, SpecialCommand::RenameSession("Weekend plans".to_string()));
///
/// let cmd = parse_special_command("hello assistant").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// // Invalid command returns error
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower, ""),
    };

    match word.as_str() {
        "/new" => {
            if rest.is_empty() {
                Ok(SpecialCommand::NewSession)
            } else {
                Err(CommandError::UnsupportedArgument {
                    command: "/new".to_string(),
                    arg: rest.to_string(),
                })
            }
        }

        "/list" | "/sessions" => {
            if rest.is_empty() {
                Ok(SpecialCommand::ListSessions)
            } else {
                Err(CommandError::UnsupportedArgument {
                    command: word,
                    arg: rest.to_string(),
                })
            }
        }

        "/switch" => {
            if rest.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/switch".to_string(),
                    usage: "/switch <number|id>".to_string(),
                })
            } else {
                Ok(SpecialCommand::SwitchSession(rest.to_string()))
            }
        }

        "/rename" => {
            if rest.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/rename".to_string(),
                    usage: "/rename <title>".to_string(),
                })
            } else {
                Ok(SpecialCommand::RenameSession(rest.to_string()))
            }
        }

        "/delete" => {
            if rest.is_empty() {
                Ok(SpecialCommand::DeleteSession)
            } else {
                Err(CommandError::UnsupportedArgument {
                    command: "/delete".to_string(),
                    arg: rest.to_string(),
                })
            }
        }

        "/save" => {
            if rest.is_empty() {
                Ok(SpecialCommand::SavePrompt(None))
            } else {
                Ok(SpecialCommand::SavePrompt(Some(rest.to_string())))
            }
        }

        "/prompts" => {
            if rest.is_empty() {
                Ok(SpecialCommand::ListPrompts)
            } else {
                Err(CommandError::UnsupportedArgument {
                    command: "/prompts".to_string(),
                    arg: rest.to_string(),
                })
            }
        }

        // Status and help
        "/help" | "/?" => Ok(SpecialCommand::Help),

        // Exit commands
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        // Unknown command starting with "/"
        _ if word.starts_with('/') => Err(CommandError::UnknownCommand(word)),

        // Not a special command
        _ => Ok(SpecialCommand::None),
    }
}

/// Display help text for special commands
///
/// Shows all available special commands with their descriptions
/// and usage examples.
///
/// # Examples
///
/// ```
/// use chatvault::commands::special_commands::print_help;
///
/// print_help();
/// ```
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSION MANAGEMENT:
  /new             - Start a new chat session
  /list            - List stored sessions
  /switch <n|id>   - Switch to a session by list number or id prefix
  /rename <title>  - Rename the active session
  /delete          - Delete the active session

PROMPT LIBRARY:
  /save            - Save your last prompt to the library (again to remove)
  /save <text>     - Save the given text to the library
  /prompts         - List saved prompts

SESSION INFORMATION:
  /help            - Show this help message
  /?               - Same as /help

SESSION CONTROL:
  exit             - Exit interactive mode
  quit             - Same as exit

NOTES:
  - Command words are case-insensitive; arguments keep their casing
  - Regular text (not starting with /) is sent to the assistant
  - Responses stream in as they arrive; partial output is kept on errors
  - Session ids can be abbreviated to any unique prefix of 8+ characters
"#
    );
}
