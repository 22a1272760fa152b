use crate::domain::profile::driven_ports::AvatarStore;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;

/// Avatars kept in the backend's object storage
pub struct StorageAvatarStore;

fn object_path(bucket: &str, path: &str) -> String {
    format!("/storage/v1/object/{bucket}/{}", path.trim_start_matches('/'))
}

fn public_object_path(bucket: &str, path: &str) -> String {
    format!(
        "/storage/v1/object/public/{bucket}/{}",
        path.trim_start_matches('/')
    )
}

impl AvatarStore for StorageAvatarStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let bucket = &ext_cxn.endpoint().avatar_bucket;
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, &object_path(bucket, path)))
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        super::send(super::authorized(request, ext_cxn))
            .await
            .with_context(|| format!("trying to upload {path} to the {bucket} bucket"))?;

        Ok(())
    }

    fn public_url(&self, path: &str, ext_cxn: &impl ExternalConnectivity) -> String {
        super::url(
            ext_cxn,
            &public_object_path(&ext_cxn.endpoint().avatar_bucket, path),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_connections::test_util::FakeExternalConnectivity;

    #[test]
    fn public_url_points_into_bucket() {
        let ext_cxn = FakeExternalConnectivity::new();

        assert_eq!(
            "http://localhost:54321/storage/v1/object/public/avatars/u1/avatar.png",
            StorageAvatarStore.public_url("u1/avatar.png", &ext_cxn)
        );
        assert_eq!(
            "/storage/v1/object/avatars/u1/avatar.png",
            object_path("avatars", "/u1/avatar.png")
        );
    }
}
