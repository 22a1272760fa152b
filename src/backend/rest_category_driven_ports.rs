use crate::domain::category::driven_ports::{CategoryReader, CategoryWriter};
use crate::domain::category::{Category, NewCategory};
use crate::entity::{CategoryInsert, CategoryPatch, CategoryRow};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use uuid::Uuid;

const CATEGORIES_PATH: &str = "/rest/v1/categories";

pub struct RestCategoryReader;

impl CategoryReader for RestCategoryReader {
    async fn categories(
        &self,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Vec<Category>, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .get(super::url(ext_cxn, CATEGORIES_PATH))
            .query(&[("select", "*"), ("order", "created_at.asc")]);

        let rows: Vec<CategoryRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to fetch categories")?;

        Ok(rows.into_iter().map(Category::from).collect())
    }
}

pub struct RestCategoryWriter;

impl CategoryWriter for RestCategoryWriter {
    async fn create_category(
        &self,
        new_category: &NewCategory,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Category, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, CATEGORIES_PATH))
            .header("Prefer", "return=representation")
            .json(&[CategoryInsert::from(new_category)]);

        let rows: Vec<CategoryRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to insert a category")?;

        rows.into_iter()
            .next()
            .map(Category::from)
            .ok_or_else(|| anyhow!("the backend returned no row for the inserted category"))
    }

    async fn update_category(
        &self,
        category_id: Uuid,
        name: &str,
        color: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .patch(super::url(ext_cxn, CATEGORIES_PATH))
            .query(&[("id", format!("eq.{category_id}"))])
            .json(&CategoryPatch { name, color });

        super::send(super::authorized(request, ext_cxn))
            .await
            .context("trying to update a category")?;

        Ok(())
    }

    async fn delete_category(
        &self,
        category_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .delete(super::url(ext_cxn, CATEGORIES_PATH))
            .query(&[("id", format!("eq.{category_id}"))]);

        super::send(super::authorized(request, ext_cxn))
            .await
            .context("trying to delete a category")?;

        Ok(())
    }
}
