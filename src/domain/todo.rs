use crate::domain;
use crate::domain::NotSignedIn;
use crate::domain::board::{BoardEvent, TaskBoard};
use crate::domain::todo::driven_ports::TodoWriter;
use crate::domain::todo::driving_ports::TaskError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub category_id: Option<Uuid>,
}

/// A task about to be inserted. The backend fills in the id, completion flag and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTodo {
    pub user_id: Uuid,
    pub text: String,
    pub category_id: Option<Uuid>,
}

/// The single column a task update touches
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoUpdate {
    Completed(bool),
    Text(String),
    Category(Option<Uuid>),
}

pub mod driven_ports {
    use super::*;

    pub trait TodoReader {
        /// Every task the session can see, oldest first
        async fn todos(&self, ext_cxn: &impl ExternalConnectivity)
        -> Result<Vec<Todo>, anyhow::Error>;
    }

    pub trait TodoWriter {
        async fn create_todo(
            &self,
            new_todo: &NewTodo,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Todo, anyhow::Error>;

        async fn update_todo(
            &self,
            todo_id: Uuid,
            update: &TodoUpdate,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        async fn delete_todo(
            &self,
            todo_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("task text can't be empty")]
        EmptyText,
        #[error("there is no task with id {0}")]
        UnknownTask(Uuid),
        #[error("there is no category with id {0}")]
        UnknownCategory(Uuid),
        #[error(transparent)]
        NotSignedIn(#[from] NotSignedIn),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    /// Task operations. Each one makes at most one backend call and only changes [TaskBoard]
    /// once that call succeeds.
    pub trait TaskPort {
        async fn add_task(
            &self,
            board: &mut TaskBoard,
            text: &str,
            category_id: Option<Uuid>,
            ext_cxn: &impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<Todo, TaskError>;
        /// Flips the completion flag, returning the new value
        async fn toggle_task(
            &self,
            board: &mut TaskBoard,
            todo_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<bool, TaskError>;
        async fn mark_done(
            &self,
            board: &mut TaskBoard,
            todo_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<(), TaskError>;
        async fn edit_task(
            &self,
            board: &mut TaskBoard,
            todo_id: Uuid,
            text: &str,
            ext_cxn: &impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<(), TaskError>;
        async fn assign_category(
            &self,
            board: &mut TaskBoard,
            todo_id: Uuid,
            category_id: Option<Uuid>,
            ext_cxn: &impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<(), TaskError>;
        async fn delete_task(
            &self,
            board: &mut TaskBoard,
            todo_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            todo_write: &impl driven_ports::TodoWriter,
        ) -> Result<(), TaskError>;
    }
}

fn known_task(board: &TaskBoard, todo_id: Uuid) -> Result<&Todo, TaskError> {
    board.todo(todo_id).ok_or(TaskError::UnknownTask(todo_id))
}

fn known_category(board: &TaskBoard, category_id: Option<Uuid>) -> Result<(), TaskError> {
    match category_id {
        Some(id) if board.category(id).is_none() => Err(TaskError::UnknownCategory(id)),
        _ => Ok(()),
    }
}

/// Sends one update and, if the backend accepts it, applies [event] to the board
async fn update_then_apply(
    board: &mut TaskBoard,
    todo_id: Uuid,
    update: TodoUpdate,
    event: BoardEvent,
    ext_cxn: &impl ExternalConnectivity,
    todo_write: &impl TodoWriter,
) -> Result<(), TaskError> {
    let update_result = todo_write
        .update_todo(todo_id, &update, ext_cxn)
        .await
        .context("updating a task");
    if let Err(ref port_err) = update_result {
        error!("Error updating task {todo_id}: {port_err:#}");
    }
    update_result?;

    board.apply(event);
    Ok(())
}

pub struct TaskService;

impl driving_ports::TaskPort for TaskService {
    #[tracing::instrument(skip_all)]
    async fn add_task(
        &self,
        board: &mut TaskBoard,
        text: &str,
        category_id: Option<Uuid>,
        ext_cxn: &impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<Todo, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }
        known_category(board, category_id)?;
        let user = domain::require_user(ext_cxn)?;

        let new_todo = NewTodo {
            user_id: user.id,
            text: text.to_owned(),
            category_id,
        };
        let created = todo_write
            .create_todo(&new_todo, ext_cxn)
            .await
            .context("adding a task")
            .inspect_err(|port_err| error!("Error adding task: {port_err:#}"))?;

        info!(todo_id = %created.id, "task added");
        board.apply(BoardEvent::TodoAdded(created.clone()));
        Ok(created)
    }

    async fn toggle_task(
        &self,
        board: &mut TaskBoard,
        todo_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<bool, TaskError> {
        let completed = !known_task(board, todo_id)?.completed;

        update_then_apply(
            board,
            todo_id,
            TodoUpdate::Completed(completed),
            BoardEvent::TodoCompletionSet {
                id: todo_id,
                completed,
            },
            ext_cxn,
            todo_write,
        )
        .await?;
        Ok(completed)
    }

    async fn mark_done(
        &self,
        board: &mut TaskBoard,
        todo_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<(), TaskError> {
        known_task(board, todo_id)?;

        update_then_apply(
            board,
            todo_id,
            TodoUpdate::Completed(true),
            BoardEvent::TodoCompletionSet {
                id: todo_id,
                completed: true,
            },
            ext_cxn,
            todo_write,
        )
        .await
    }

    async fn edit_task(
        &self,
        board: &mut TaskBoard,
        todo_id: Uuid,
        text: &str,
        ext_cxn: &impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<(), TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }
        known_task(board, todo_id)?;

        update_then_apply(
            board,
            todo_id,
            TodoUpdate::Text(text.to_owned()),
            BoardEvent::TodoTextChanged {
                id: todo_id,
                text: text.to_owned(),
            },
            ext_cxn,
            todo_write,
        )
        .await
    }

    async fn assign_category(
        &self,
        board: &mut TaskBoard,
        todo_id: Uuid,
        category_id: Option<Uuid>,
        ext_cxn: &impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<(), TaskError> {
        known_task(board, todo_id)?;
        known_category(board, category_id)?;

        update_then_apply(
            board,
            todo_id,
            TodoUpdate::Category(category_id),
            BoardEvent::TodoCategorySet {
                id: todo_id,
                category_id,
            },
            ext_cxn,
            todo_write,
        )
        .await
    }

    async fn delete_task(
        &self,
        board: &mut TaskBoard,
        todo_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<(), TaskError> {
        known_task(board, todo_id)?;

        todo_write
            .delete_todo(todo_id, ext_cxn)
            .await
            .context("deleting a task")
            .inspect_err(|port_err| error!("Error deleting task {todo_id}: {port_err:#}"))?;

        board.apply(BoardEvent::TodoDeleted(todo_id));
        Ok(())
    }
}
