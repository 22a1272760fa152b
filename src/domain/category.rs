use crate::domain;
use crate::domain::NotSignedIn;
use crate::domain::board::{BoardEvent, TaskBoard};
use crate::domain::category::driven_ports::CategoryWriter;
use crate::domain::category::driving_ports::CategoryError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

/// Colors a category may take. The first one is the default.
pub const PALETTE: [&str; 8] = [
    "#667eea", "#764ba2", "#f093fb", "#2ecc71", "#e17055", "#00b894", "#fdcb6e", "#6c5ce7",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCategory {
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
}

pub mod driven_ports {
    use super::*;

    pub trait CategoryReader {
        /// Every category the session can see, oldest first
        async fn categories(
            &self,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Vec<Category>, anyhow::Error>;
    }

    pub trait CategoryWriter {
        async fn create_category(
            &self,
            new_category: &NewCategory,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Category, anyhow::Error>;

        async fn update_category(
            &self,
            category_id: Uuid,
            name: &str,
            color: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Deletes a category. The backend detaches the category's tasks.
        async fn delete_category(
            &self,
            category_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum CategoryError {
        #[error("category name can't be empty")]
        EmptyName,
        #[error("{0} is not one of the category colors")]
        NotInPalette(String),
        #[error("there is no category with id {0}")]
        UnknownCategory(Uuid),
        #[error(transparent)]
        NotSignedIn(#[from] NotSignedIn),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    pub trait CategoryPort {
        /// Creates a category, using the first palette color when [color] is None
        async fn create_category(
            &self,
            board: &mut TaskBoard,
            name: &str,
            color: Option<&str>,
            ext_cxn: &impl ExternalConnectivity,
            category_write: &impl driven_ports::CategoryWriter,
        ) -> Result<Category, CategoryError>;
        /// Renames and/or recolors a category. Whatever is None keeps its current value.
        async fn edit_category(
            &self,
            board: &mut TaskBoard,
            category_id: Uuid,
            name: Option<&str>,
            color: Option<&str>,
            ext_cxn: &impl ExternalConnectivity,
            category_write: &impl driven_ports::CategoryWriter,
        ) -> Result<(), CategoryError>;
        async fn delete_category(
            &self,
            board: &mut TaskBoard,
            category_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
            category_write: &impl driven_ports::CategoryWriter,
        ) -> Result<(), CategoryError>;
    }
}

fn checked_name(name: &str) -> Result<String, CategoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryError::EmptyName);
    }

    Ok(name.to_owned())
}

fn checked_color(color: &str) -> Result<String, CategoryError> {
    let color = color.trim().to_lowercase();
    if !PALETTE.contains(&color.as_str()) {
        return Err(CategoryError::NotInPalette(color));
    }

    Ok(color)
}

pub struct CategoryService;

impl driving_ports::CategoryPort for CategoryService {
    #[tracing::instrument(skip_all)]
    async fn create_category(
        &self,
        board: &mut TaskBoard,
        name: &str,
        color: Option<&str>,
        ext_cxn: &impl ExternalConnectivity,
        category_write: &impl CategoryWriter,
    ) -> Result<Category, CategoryError> {
        let name = checked_name(name)?;
        let color = checked_color(color.unwrap_or(PALETTE[0]))?;
        let user = domain::require_user(ext_cxn)?;

        let new_category = NewCategory {
            user_id: user.id,
            name,
            color,
        };
        let created = category_write
            .create_category(&new_category, ext_cxn)
            .await
            .context("creating a category")
            .inspect_err(|port_err| error!("Error creating category: {port_err:#}"))?;

        info!(category_id = %created.id, "category created");
        board.apply(BoardEvent::CategoryAdded(created.clone()));
        Ok(created)
    }

    async fn edit_category(
        &self,
        board: &mut TaskBoard,
        category_id: Uuid,
        name: Option<&str>,
        color: Option<&str>,
        ext_cxn: &impl ExternalConnectivity,
        category_write: &impl CategoryWriter,
    ) -> Result<(), CategoryError> {
        let current = board
            .category(category_id)
            .ok_or(CategoryError::UnknownCategory(category_id))?;
        let name = match name {
            Some(name) => checked_name(name)?,
            None => current.name.clone(),
        };
        let color = match color {
            Some(color) => checked_color(color)?,
            None => current.color.clone(),
        };

        category_write
            .update_category(category_id, &name, &color, ext_cxn)
            .await
            .context("updating a category")
            .inspect_err(|port_err| error!("Error updating category {category_id}: {port_err:#}"))?;

        board.apply(BoardEvent::CategoryChanged {
            id: category_id,
            name,
            color,
        });
        Ok(())
    }

    async fn delete_category(
        &self,
        board: &mut TaskBoard,
        category_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
        category_write: &impl CategoryWriter,
    ) -> Result<(), CategoryError> {
        if board.category(category_id).is_none() {
            return Err(CategoryError::UnknownCategory(category_id));
        }

        category_write
            .delete_category(category_id, ext_cxn)
            .await
            .context("deleting a category")
            .inspect_err(|port_err| error!("Error deleting category {category_id}: {port_err:#}"))?;

        info!(%category_id, "category deleted");
        board.apply(BoardEvent::CategoryDeleted(category_id));
        Ok(())
    }
}
