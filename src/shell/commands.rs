use crate::domain::auth::OAuthProvider;
use crate::domain::board::{SortDirection, SortKey};
use crate::domain::profile::ProfileField;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    disable_version_flag = true,
    help_template = "{subcommands}"
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Sign in with email and password
    #[command(name = "signin", alias = "login")]
    SignIn { email: String, password: String },
    /// Create an account; a verification email is sent
    #[command(name = "signup")]
    SignUp {
        email: String,
        password: String,
        confirm_password: String,
    },
    /// Print the URL that starts an OAuth sign-in
    #[command(name = "oauth")]
    OAuth { provider: OAuthProvider },
    #[command(name = "signout", alias = "logout")]
    SignOut,
    /// Show who the backend thinks is signed in
    #[command(name = "whoami")]
    WhoAmI,
    /// Fetch tasks, categories and the profile again
    #[command(name = "refresh", alias = "load")]
    Refresh,
    /// Show the task list
    #[command(name = "list", alias = "ls")]
    List,
    /// Show task counts and categories
    #[command(name = "sidebar")]
    Sidebar,
    /// Add a task. The category goes before the text, which may itself start with '-'.
    #[command(name = "add")]
    Add {
        /// Category id or id prefix
        #[arg(short, long)]
        category: Option<String>,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Flip a task between active and completed
    #[command(name = "toggle")]
    Toggle { task: String },
    #[command(name = "done")]
    Done { task: String },
    #[command(name = "edit")]
    Edit {
        task: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        text: Vec<String>,
    },
    #[command(name = "rm", alias = "delete")]
    Delete { task: String },
    /// Put a task in a category, or take it out of one when no category is given
    #[command(name = "assign")]
    Assign {
        task: String,
        category: Option<String>,
    },
    /// Show all tasks, uncategorized ones ("none") or one category's
    #[command(name = "filter")]
    Filter { category: String },
    /// Search task text; no words clears the search
    #[command(name = "search")]
    Search {
        #[arg(allow_hyphen_values = true)]
        words: Vec<String>,
    },
    #[command(name = "sort")]
    Sort {
        key: SortKey,
        #[arg(default_value_t = SortDirection::Asc)]
        direction: SortDirection,
    },
    #[command(name = "category", alias = "cat", subcommand)]
    Category(CategoryCommand),
    #[command(name = "profile", subcommand)]
    Profile(ProfileCommand),
    #[command(name = "quit", alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CategoryCommand {
    #[command(name = "list", alias = "ls")]
    List,
    #[command(name = "add")]
    Add {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
        #[arg(short, long)]
        color: Option<String>,
    },
    #[command(name = "edit")]
    Edit {
        category: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
    },
    #[command(name = "rm", alias = "delete")]
    Delete { category: String },
    /// Show the colors a category may use
    #[command(name = "colors")]
    Colors,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ProfileCommand {
    #[command(name = "show")]
    Show,
    /// Start editing a copy of the profile
    #[command(name = "edit")]
    Edit,
    /// Change one field of the profile being edited; no value blanks it
    #[command(name = "set")]
    Set {
        field: ProfileField,
        value: Vec<String>,
    },
    #[command(name = "save")]
    Save,
    #[command(name = "discard", alias = "cancel")]
    Discard,
    /// Upload an image file as the avatar
    #[command(name = "avatar")]
    Avatar { file: PathBuf },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("nothing follows the trailing backslash")]
    DanglingEscape,
}

/// Splits a line into words on whitespace. Single or double quotes group words, and a backslash
/// outside single quotes takes the next character literally.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(next) = chars.next() {
        match (quote, next) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), other) => current.push(other),
            (_, '\\') => {
                let escaped = chars.next().ok_or(TokenizeError::DanglingEscape)?;
                current.push(escaped);
                in_word = true;
            }
            (Some('"'), '"') => quote = None,
            (Some(_), other) => current.push(other),
            (None, '"' | '\'') => {
                quote = Some(next);
                in_word = true;
            }
            (None, space) if space.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, other) => {
                current.push(other);
                in_word = true;
            }
        }
    }

    if let Some(open) = quote {
        return Err(TokenizeError::UnterminatedQuote(open));
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}
