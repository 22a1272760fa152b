//! The interactive front end. Each line is parsed into a [Command], run against the domain
//! services, and answered with text.

pub mod commands;
pub mod render;

use crate::backend::auth_driven_ports::RestAuthProvider;
use crate::backend::rest_category_driven_ports::{RestCategoryReader, RestCategoryWriter};
use crate::backend::rest_profile_driven_ports::{RestProfileReader, RestProfileWriter};
use crate::backend::rest_todo_driven_ports::{RestTodoReader, RestTodoWriter};
use crate::backend::storage_driven_ports::StorageAvatarStore;
use crate::domain::NotSignedIn;
use crate::domain::auth::driven_ports::AuthProvider;
use crate::domain::auth::driving_ports::AuthPort;
use crate::domain::auth::{AuthService, SignUpOutcome, SignUpRequest};
use crate::domain::board::driving_ports::BoardPort;
use crate::domain::board::{BoardService, CategoryFilter, TaskBoard};
use crate::domain::category::CategoryService;
use crate::domain::category::driven_ports::{CategoryReader, CategoryWriter};
use crate::domain::category::driving_ports::CategoryPort;
use crate::domain::profile::driven_ports::{AvatarStore, ProfileReader, ProfileWriter};
use crate::domain::profile::driving_ports::ProfilePort;
use crate::domain::profile::{Clock, ProfileDraft, ProfileService, SystemClock};
use crate::domain::todo::TaskService;
use crate::domain::todo::driven_ports::{TodoReader, TodoWriter};
use crate::domain::todo::driving_ports::TaskPort;
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use clap::Parser;
use commands::{CategoryCommand, Command, ProfileCommand, ShellLine};
use tracing::{info, warn};

/// The driven port implementations the shell runs commands against
pub trait DrivenAdapters {
    fn auth(&self) -> &impl AuthProvider;
    fn todo_read(&self) -> &impl TodoReader;
    fn todo_write(&self) -> &impl TodoWriter;
    fn category_read(&self) -> &impl CategoryReader;
    fn category_write(&self) -> &impl CategoryWriter;
    fn profile_read(&self) -> &impl ProfileReader;
    fn profile_write(&self) -> &impl ProfileWriter;
    fn avatar_store(&self) -> &impl AvatarStore;
    fn clock(&self) -> &impl Clock;
}

/// Adapters that talk to the real backend
pub struct RestAdapters;

impl DrivenAdapters for RestAdapters {
    fn auth(&self) -> &impl AuthProvider {
        &RestAuthProvider
    }

    fn todo_read(&self) -> &impl TodoReader {
        &RestTodoReader
    }

    fn todo_write(&self) -> &impl TodoWriter {
        &RestTodoWriter
    }

    fn category_read(&self) -> &impl CategoryReader {
        &RestCategoryReader
    }

    fn category_write(&self) -> &impl CategoryWriter {
        &RestCategoryWriter
    }

    fn profile_read(&self) -> &impl ProfileReader {
        &RestProfileReader
    }

    fn profile_write(&self) -> &impl ProfileWriter {
        &RestProfileWriter
    }

    fn avatar_store(&self) -> &impl AvatarStore {
        &StorageAvatarStore
    }

    fn clock(&self) -> &impl Clock {
        &SystemClock
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit(String),
}

pub struct Shell<Cxn, Adapters> {
    ext_cxn: Cxn,
    adapters: Adapters,
    board: Option<TaskBoard>,
    draft: Option<ProfileDraft>,
}

fn loaded(board: &mut Option<TaskBoard>) -> Result<&mut TaskBoard, NotSignedIn> {
    board.as_mut().ok_or(NotSignedIn)
}

fn joined(words: Vec<String>) -> String {
    words.join(" ")
}

/// Resolves what the user typed after "filter"
fn parse_filter(board: &TaskBoard, wanted: &str) -> Result<CategoryFilter, anyhow::Error> {
    match wanted.to_lowercase().as_str() {
        "all" => Ok(CategoryFilter::All),
        "none" | "uncategorized" => Ok(CategoryFilter::Uncategorized),
        _ => Ok(CategoryFilter::Category(board.resolve_category(wanted)?)),
    }
}

impl<Cxn, Adapters> Shell<Cxn, Adapters>
where
    Cxn: ExternalConnectivity,
    Adapters: DrivenAdapters,
{
    pub fn new(ext_cxn: Cxn, adapters: Adapters) -> Self {
        Shell {
            ext_cxn,
            adapters,
            board: None,
            draft: None,
        }
    }

    pub fn board(&self) -> Option<&TaskBoard> {
        self.board.as_ref()
    }

    pub fn ext_cxn(&self) -> &Cxn {
        &self.ext_cxn
    }

    pub fn prompt(&self) -> String {
        match (&self.board, &self.draft) {
            (Some(_), Some(_)) => "todo (editing profile)> ".to_owned(),
            (Some(board), None) => format!("todo [{}]> ", board.user().email),
            (None, _) => "todo> ".to_owned(),
        }
    }

    /// Runs one input line
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        let words = match commands::tokenize(line) {
            Ok(words) => words,
            Err(tokenize_err) => return Reply::Output(format!("{tokenize_err}\n")),
        };
        if words.is_empty() {
            return Reply::Output(String::new());
        }

        let command = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(parse_err) => return Reply::Output(parse_err.render().to_string()),
        };
        if command == Command::Quit {
            return Reply::Quit("Bye!\n".to_owned());
        }

        match self.run(command).await {
            Ok(output) => Reply::Output(output),
            Err(command_err) => Reply::Output(format!("Error: {command_err:#}\n")),
        }
    }

    async fn run(&mut self, command: Command) -> Result<String, anyhow::Error> {
        match command {
            Command::SignIn { email, password } => self.sign_in(&email, &password).await,
            Command::SignUp {
                email,
                password,
                confirm_password,
            } => {
                let request = SignUpRequest {
                    email,
                    password,
                    confirm_password,
                };
                let SignUpOutcome::EmailSent { email } = AuthService
                    .sign_up(&request, &self.ext_cxn, self.adapters.auth())
                    .await?;

                Ok(format!(
                    "We sent a verification link to {email}. Follow it to verify your account, then sign in.\n"
                ))
            }
            Command::OAuth { provider } => {
                let url = AuthService.oauth_sign_in_url(provider, &self.ext_cxn, self.adapters.auth());
                Ok(format!("Open this URL in a browser to continue with {provider}:\n{url}\n"))
            }
            Command::SignOut => {
                let sign_out_result = AuthService
                    .sign_out(&mut self.ext_cxn, self.adapters.auth())
                    .await;
                self.board = None;
                self.draft = None;

                match sign_out_result {
                    Ok(()) => Ok("Signed out.\n".to_owned()),
                    Err(port_err) => Ok(format!(
                        "Signed out here, but the backend could not be told: {}\n",
                        port_err.user_message()
                    )),
                }
            }
            Command::WhoAmI => {
                let user = AuthService
                    .current_user(&self.ext_cxn, self.adapters.auth())
                    .await?;
                Ok(format!("{} ({})\n", user.email, user.id))
            }
            Command::Refresh => {
                self.load_board().await?;
                Ok(self.overview())
            }
            Command::List => Ok(render::task_list(loaded(&mut self.board)?)),
            Command::Sidebar => Ok(render::sidebar(loaded(&mut self.board)?)),
            Command::Add { text, category } => {
                let board = loaded(&mut self.board)?;
                let category_id = category
                    .map(|prefix| board.resolve_category(&prefix))
                    .transpose()?;
                let added = TaskService
                    .add_task(
                        board,
                        &joined(text),
                        category_id,
                        &self.ext_cxn,
                        self.adapters.todo_write(),
                    )
                    .await?;

                Ok(format!(
                    "Added {}  {}\n{}",
                    render::short_id(added.id),
                    added.text,
                    render::task_list(board)
                ))
            }
            Command::Toggle { task } => {
                let board = loaded(&mut self.board)?;
                let todo_id = board.resolve_todo(&task)?;
                TaskService
                    .toggle_task(board, todo_id, &self.ext_cxn, self.adapters.todo_write())
                    .await?;
                Ok(render::task_list(board))
            }
            Command::Done { task } => {
                let board = loaded(&mut self.board)?;
                let todo_id = board.resolve_todo(&task)?;
                TaskService
                    .mark_done(board, todo_id, &self.ext_cxn, self.adapters.todo_write())
                    .await?;
                Ok(render::task_list(board))
            }
            Command::Edit { task, text } => {
                let board = loaded(&mut self.board)?;
                let todo_id = board.resolve_todo(&task)?;
                TaskService
                    .edit_task(
                        board,
                        todo_id,
                        &joined(text),
                        &self.ext_cxn,
                        self.adapters.todo_write(),
                    )
                    .await?;
                Ok(render::task_list(board))
            }
            Command::Delete { task } => {
                let board = loaded(&mut self.board)?;
                let todo_id = board.resolve_todo(&task)?;
                TaskService
                    .delete_task(board, todo_id, &self.ext_cxn, self.adapters.todo_write())
                    .await?;
                Ok(render::task_list(board))
            }
            Command::Assign { task, category } => {
                let board = loaded(&mut self.board)?;
                let todo_id = board.resolve_todo(&task)?;
                let category_id = category
                    .map(|prefix| board.resolve_category(&prefix))
                    .transpose()?;
                TaskService
                    .assign_category(
                        board,
                        todo_id,
                        category_id,
                        &self.ext_cxn,
                        self.adapters.todo_write(),
                    )
                    .await?;
                Ok(render::task_list(board))
            }
            Command::Filter { category } => {
                let board = loaded(&mut self.board)?;
                let filter = parse_filter(board, &category)?;
                board.set_filter(filter);
                Ok(render::task_list(board))
            }
            Command::Search { words } => {
                let board = loaded(&mut self.board)?;
                board.set_search(joined(words));
                Ok(render::task_list(board))
            }
            Command::Sort { key, direction } => {
                let board = loaded(&mut self.board)?;
                board.set_sort(key, direction);
                Ok(render::task_list(board))
            }
            Command::Category(category_command) => self.run_category(category_command).await,
            Command::Profile(profile_command) => self.run_profile(profile_command).await,
            Command::Quit => Ok(String::new()),
        }
    }

    async fn sign_in(&mut self, email: &str, password: &str) -> Result<String, anyhow::Error> {
        AuthService
            .sign_in(email, password, &mut self.ext_cxn, self.adapters.auth())
            .await?;
        self.draft = None;
        self.load_board().await?;

        Ok(format!("Signed in as {email}.\n{}", self.overview()))
    }

    async fn load_board(&mut self) -> Result<(), anyhow::Error> {
        let board = BoardService
            .load_board(
                &self.ext_cxn,
                self.adapters.todo_read(),
                self.adapters.category_read(),
                self.adapters.profile_read(),
            )
            .await?;
        info!(todos = board.todos().len(), "board ready");
        self.board = Some(board);

        Ok(())
    }

    fn overview(&self) -> String {
        match &self.board {
            Some(board) => format!("{}\n{}", render::sidebar(board), render::task_list(board)),
            None => String::new(),
        }
    }

    async fn run_category(&mut self, command: CategoryCommand) -> Result<String, anyhow::Error> {
        if command == CategoryCommand::Colors {
            return Ok(render::palette());
        }

        let board = loaded(&mut self.board)?;
        match command {
            CategoryCommand::List => Ok(render::categories(board.categories())),
            CategoryCommand::Add { name, color } => {
                let created = CategoryService
                    .create_category(
                        board,
                        &joined(name),
                        color.as_deref(),
                        &self.ext_cxn,
                        self.adapters.category_write(),
                    )
                    .await?;
                Ok(format!(
                    "Created {} {}\n",
                    render::short_id(created.id),
                    created.name
                ))
            }
            CategoryCommand::Edit {
                category,
                name,
                color,
            } => {
                let category_id = board.resolve_category(&category)?;
                CategoryService
                    .edit_category(
                        board,
                        category_id,
                        name.as_deref(),
                        color.as_deref(),
                        &self.ext_cxn,
                        self.adapters.category_write(),
                    )
                    .await?;
                Ok(render::categories(board.categories()))
            }
            CategoryCommand::Delete { category } => {
                let category_id = board.resolve_category(&category)?;
                CategoryService
                    .delete_category(
                        board,
                        category_id,
                        &self.ext_cxn,
                        self.adapters.category_write(),
                    )
                    .await?;
                Ok(render::sidebar(board))
            }
            CategoryCommand::Colors => Ok(render::palette()),
        }
    }

    async fn run_profile(&mut self, command: ProfileCommand) -> Result<String, anyhow::Error> {
        let board = loaded(&mut self.board)?;
        match command {
            ProfileCommand::Show => match &self.draft {
                Some(draft) => Ok(render::draft(draft)),
                None => Ok(render::profile_card(board.profile(), &board.user().email)),
            },
            ProfileCommand::Edit => {
                let draft = self
                    .draft
                    .get_or_insert_with(|| ProfileDraft::from_profile(board.profile()));
                Ok(render::draft(draft))
            }
            ProfileCommand::Set { field, value } => {
                let draft = self
                    .draft
                    .as_mut()
                    .ok_or_else(|| anyhow!("start editing with \"profile edit\" first"))?;
                draft.set(field, joined(value));
                Ok(render::draft(draft))
            }
            ProfileCommand::Save => {
                let Some(draft) = self.draft.as_ref() else {
                    return Err(anyhow!("there are no profile edits to save"));
                };
                ProfileService
                    .save_profile(
                        board,
                        draft,
                        &self.ext_cxn,
                        self.adapters.clock(),
                        self.adapters.profile_write(),
                    )
                    .await?;
                self.draft = None;
                Ok(render::profile_card(board.profile(), &board.user().email))
            }
            ProfileCommand::Discard => {
                self.draft = None;
                Ok(render::profile_card(board.profile(), &board.user().email))
            }
            ProfileCommand::Avatar { file } => {
                let file_name = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let bytes = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("reading {}", file.display()))?;

                let avatar_result = ProfileService
                    .upload_avatar(
                        board,
                        &file_name,
                        bytes,
                        &self.ext_cxn,
                        self.adapters.avatar_store(),
                        self.adapters.profile_write(),
                    )
                    .await;
                if let Err(ref avatar_err) = avatar_result {
                    warn!("Avatar upload did not complete: {avatar_err}");
                }

                let url = avatar_result?;
                Ok(format!("Avatar updated: {url}\n"))
            }
        }
    }
}
