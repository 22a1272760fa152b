use crate::domain::todo::driven_ports::{TodoReader, TodoWriter};
use crate::domain::todo::{NewTodo, Todo, TodoUpdate};
use crate::entity::{TodoInsert, TodoPatch, TodoRow};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use uuid::Uuid;

const TODOS_PATH: &str = "/rest/v1/todos";

pub struct RestTodoReader;

impl TodoReader for RestTodoReader {
    async fn todos(&self, ext_cxn: &impl ExternalConnectivity) -> Result<Vec<Todo>, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .get(super::url(ext_cxn, TODOS_PATH))
            .query(&[("select", "*"), ("order", "created_at.asc")]);

        let rows: Vec<TodoRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to fetch todos")?;

        Ok(rows.into_iter().map(Todo::from).collect())
    }
}

pub struct RestTodoWriter;

impl TodoWriter for RestTodoWriter {
    async fn create_todo(
        &self,
        new_todo: &NewTodo,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Todo, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, TODOS_PATH))
            .header("Prefer", "return=representation")
            .json(&[TodoInsert::from(new_todo)]);

        let rows: Vec<TodoRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to insert a todo")?;

        rows.into_iter()
            .next()
            .map(Todo::from)
            .ok_or_else(|| anyhow!("the backend returned no row for the inserted todo"))
    }

    async fn update_todo(
        &self,
        todo_id: Uuid,
        update: &TodoUpdate,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .patch(super::url(ext_cxn, TODOS_PATH))
            .query(&[("id", format!("eq.{todo_id}"))])
            .json(&TodoPatch::from(update));

        super::send(super::authorized(request, ext_cxn))
            .await
            .context("trying to update a todo")?;

        Ok(())
    }

    async fn delete_todo(
        &self,
        todo_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .delete(super::url(ext_cxn, TODOS_PATH))
            .query(&[("id", format!("eq.{todo_id}"))]);

        super::send(super::authorized(request, ext_cxn))
            .await
            .context("trying to delete a todo")?;

        Ok(())
    }
}
