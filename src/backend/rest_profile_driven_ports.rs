use crate::domain::profile::Profile;
use crate::domain::profile::driven_ports::{ProfileReader, ProfileWriter};
use crate::entity::{AvatarPatch, ProfileRow};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, anyhow};
use uuid::Uuid;

const PROFILES_PATH: &str = "/rest/v1/profiles";

pub struct RestProfileReader;

impl ProfileReader for RestProfileReader {
    async fn profile(
        &self,
        user_id: Uuid,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Option<Profile>, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .get(super::url(ext_cxn, PROFILES_PATH))
            .query(&[("select", "*".to_owned()), ("id", format!("eq.{user_id}"))]);

        let rows: Vec<ProfileRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to fetch a profile")?;

        Ok(rows.into_iter().next().map(Profile::from))
    }
}

pub struct RestProfileWriter;

impl ProfileWriter for RestProfileWriter {
    async fn upsert_profile(
        &self,
        profile: &Profile,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Profile, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, PROFILES_PATH))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[ProfileRow::from(profile)]);

        let rows: Vec<ProfileRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to upsert a profile")?;

        rows.into_iter()
            .next()
            .map(Profile::from)
            .ok_or_else(|| anyhow!("the backend returned no row for the saved profile"))
    }

    async fn set_avatar_url(
        &self,
        user_id: Uuid,
        avatar_url: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Option<Profile>, anyhow::Error> {
        let request = ext_cxn
            .http_client()
            .patch(super::url(ext_cxn, PROFILES_PATH))
            .query(&[("id", format!("eq.{user_id}"))])
            .header("Prefer", "return=representation")
            .json(&AvatarPatch { avatar_url });

        // A filter matching no row still succeeds, returning an empty array
        let rows: Vec<ProfileRow> = super::send_for_json(super::authorized(request, ext_cxn))
            .await
            .context("trying to update a profile's avatar")?;

        Ok(rows.into_iter().next().map(Profile::from))
    }
}
