use crate::domain;
use crate::domain::NotSignedIn;
use crate::domain::board::{BoardEvent, TaskBoard};
use crate::domain::profile::driven_ports::{AvatarStore, ProfileWriter};
use crate::domain::profile::driving_ports::{AvatarError, ProfileError};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A user's public profile. Its id is the owning user's id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub about: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SocialNetwork {
    #[display("X")]
    X,
    #[display("Facebook")]
    Facebook,
    #[display("Instagram")]
    Instagram,
    #[display("LinkedIn")]
    LinkedIn,
}

impl SocialNetwork {
    pub fn url_prefix(&self) -> &'static str {
        match self {
            Self::X => "https://x.com/",
            Self::Facebook => "https://facebook.com/",
            Self::Instagram => "https://instagram.com/",
            Self::LinkedIn => "https://linkedin.com/in/",
        }
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl Profile {
    /// The profile's name, or [email] when no name is set
    pub fn display_name<'a>(&'a self, email: &'a str) -> &'a str {
        filled(&self.name).unwrap_or(email)
    }

    /// City and country joined with ", ", skipping whichever is missing
    pub fn location(&self) -> Option<String> {
        let parts: Vec<&str> = [filled(&self.city), filled(&self.country)]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    /// Links for every social handle that is set
    pub fn social_links(&self) -> Vec<(SocialNetwork, String)> {
        [
            (SocialNetwork::X, &self.twitter),
            (SocialNetwork::Facebook, &self.facebook),
            (SocialNetwork::Instagram, &self.instagram),
            (SocialNetwork::LinkedIn, &self.linkedin),
        ]
        .into_iter()
        .filter_map(|(network, handle)| {
            filled(handle).map(|handle| (network, format!("{}{handle}", network.url_prefix())))
        })
        .collect()
    }

    /// True when none of the editable fields hold anything
    pub fn is_empty(&self) -> bool {
        ProfileField::ALL
            .iter()
            .all(|field| filled(field.of(self)).is_none())
    }
}

/// An editable profile field, named the way the shell refers to it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, clap::ValueEnum)]
pub enum ProfileField {
    #[display("name")]
    Name,
    #[display("tagline")]
    Tagline,
    #[display("about")]
    About,
    #[display("city")]
    City,
    #[display("country")]
    Country,
    #[display("twitter")]
    Twitter,
    #[display("facebook")]
    Facebook,
    #[display("instagram")]
    Instagram,
    #[display("linkedin")]
    Linkedin,
}

impl ProfileField {
    pub const ALL: [ProfileField; 9] = [
        Self::Name,
        Self::Tagline,
        Self::About,
        Self::City,
        Self::Country,
        Self::Twitter,
        Self::Facebook,
        Self::Instagram,
        Self::Linkedin,
    ];

    fn of<'a>(&self, profile: &'a Profile) -> &'a Option<String> {
        match self {
            Self::Name => &profile.name,
            Self::Tagline => &profile.tagline,
            Self::About => &profile.about,
            Self::City => &profile.city,
            Self::Country => &profile.country,
            Self::Twitter => &profile.twitter,
            Self::Facebook => &profile.facebook,
            Self::Instagram => &profile.instagram,
            Self::Linkedin => &profile.linkedin,
        }
    }

    fn of_mut<'a>(&self, profile: &'a mut Profile) -> &'a mut Option<String> {
        match self {
            Self::Name => &mut profile.name,
            Self::Tagline => &mut profile.tagline,
            Self::About => &mut profile.about,
            Self::City => &mut profile.city,
            Self::Country => &mut profile.country,
            Self::Twitter => &mut profile.twitter,
            Self::Facebook => &mut profile.facebook,
            Self::Instagram => &mut profile.instagram,
            Self::Linkedin => &mut profile.linkedin,
        }
    }
}

/// Profile edits staged locally until they are saved or discarded. Every field starts from the
/// current profile, with missing values as empty text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileDraft {
    values: Vec<(ProfileField, String)>,
}

impl ProfileDraft {
    pub fn from_profile(profile: Option<&Profile>) -> Self {
        let values = ProfileField::ALL
            .iter()
            .map(|field| {
                let current = profile
                    .and_then(|profile| field.of(profile).clone())
                    .unwrap_or_default();
                (*field, current)
            })
            .collect();

        ProfileDraft { values }
    }

    pub fn get(&self, field: ProfileField) -> &str {
        self.values
            .iter()
            .find(|(draft_field, _)| *draft_field == field)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }

    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(draft_field, _)| *draft_field == field) {
            Some((_, current)) => *current = value,
            None => self.values.push((field, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.values
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
    }

    /// The row to upsert for [user_id]. Blank fields become null.
    pub fn to_profile(
        &self,
        user_id: Uuid,
        avatar_url: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Profile {
        let mut profile = Profile {
            id: user_id,
            avatar_url,
            updated_at: Some(updated_at),
            ..Profile::default()
        };
        for (field, value) in self.fields() {
            let value = value.trim();
            *field.of_mut(&mut profile) = (!value.is_empty()).then(|| value.to_owned());
        }

        profile
    }
}

/// Source of the current time, swapped out in tests
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

const IMAGE_TYPES: [(&str, &str); 6] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
];

/// Where a user's avatar lives in the bucket, and the content type to upload it with
pub fn avatar_object(user_id: Uuid, file_name: &str) -> Result<(String, &'static str), AvatarError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
        .unwrap_or_default();
    let content_type = IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, content_type)| *content_type)
        .ok_or_else(|| AvatarError::NotAnImage(file_name.to_owned()))?;

    Ok((format!("{user_id}/avatar.{extension}"), content_type))
}

pub mod driven_ports {
    use super::*;

    pub trait ProfileReader {
        /// The user's profile row, if one has ever been saved
        async fn profile(
            &self,
            user_id: Uuid,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Profile>, anyhow::Error>;
    }

    pub trait ProfileWriter {
        /// Inserts or replaces the whole row, returning what the backend stored
        async fn upsert_profile(
            &self,
            profile: &Profile,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Profile, anyhow::Error>;

        /// Points an existing row at a new avatar, returning the updated row. None means the user
        /// has no profile row yet.
        async fn set_avatar_url(
            &self,
            user_id: Uuid,
            avatar_url: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Profile>, anyhow::Error>;
    }

    pub trait AvatarStore {
        /// Stores [bytes] at [path], replacing anything already there
        async fn upload(
            &self,
            path: &str,
            bytes: Vec<u8>,
            content_type: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        fn public_url(&self, path: &str, ext_cxn: &impl ExternalConnectivity) -> String;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ProfileError {
        #[error(transparent)]
        NotSignedIn(#[from] NotSignedIn),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[derive(Debug, Error)]
    pub enum AvatarError {
        #[error("{0} is not an image file")]
        NotAnImage(String),
        #[error(transparent)]
        NotSignedIn(#[from] NotSignedIn),
        #[error("avatar upload failed: {0:#}")]
        UploadFailed(anyhow::Error),
        /// The image is stored but the profile still points at the old one
        #[error("avatar uploaded to {url} but the profile could not be updated: {source:#}")]
        ProfileNotUpdated { url: String, source: anyhow::Error },
    }

    pub trait ProfilePort {
        /// Upserts every draft field along with a fresh `updated_at`
        async fn save_profile(
            &self,
            board: &mut TaskBoard,
            draft: &ProfileDraft,
            ext_cxn: &impl ExternalConnectivity,
            clock: &impl Clock,
            profile_write: &impl driven_ports::ProfileWriter,
        ) -> Result<Profile, ProfileError>;
        /// Uploads an image as the user's avatar and points the profile at it, returning the
        /// avatar's public URL. A user without a profile row gets one holding just the avatar.
        async fn upload_avatar(
            &self,
            board: &mut TaskBoard,
            file_name: &str,
            bytes: Vec<u8>,
            ext_cxn: &impl ExternalConnectivity,
            avatar_store: &impl driven_ports::AvatarStore,
            profile_write: &impl driven_ports::ProfileWriter,
        ) -> Result<String, AvatarError>;
    }
}

pub struct ProfileService;

impl driving_ports::ProfilePort for ProfileService {
    #[tracing::instrument(skip_all)]
    async fn save_profile(
        &self,
        board: &mut TaskBoard,
        draft: &ProfileDraft,
        ext_cxn: &impl ExternalConnectivity,
        clock: &impl Clock,
        profile_write: &impl ProfileWriter,
    ) -> Result<Profile, ProfileError> {
        let user = domain::require_user(ext_cxn)?;
        let avatar_url = board.profile().and_then(|profile| profile.avatar_url.clone());
        let profile = draft.to_profile(user.id, avatar_url, clock.now());

        let saved = profile_write
            .upsert_profile(&profile, ext_cxn)
            .await
            .context("saving the profile")
            .inspect_err(|port_err| error!("Error saving profile: {port_err:#}"))?;

        info!("profile saved");
        board.apply(BoardEvent::ProfileSaved(saved.clone()));
        Ok(saved)
    }

    #[tracing::instrument(skip_all, fields(file_name = %file_name))]
    async fn upload_avatar(
        &self,
        board: &mut TaskBoard,
        file_name: &str,
        bytes: Vec<u8>,
        ext_cxn: &impl ExternalConnectivity,
        avatar_store: &impl AvatarStore,
        profile_write: &impl ProfileWriter,
    ) -> Result<String, AvatarError> {
        let user = domain::require_user(ext_cxn)?;
        let (path, content_type) = avatar_object(user.id, file_name)?;

        avatar_store
            .upload(&path, bytes, content_type, ext_cxn)
            .await
            .inspect_err(|port_err| error!("Error uploading avatar: {port_err:#}"))
            .map_err(AvatarError::UploadFailed)?;

        let url = avatar_store.public_url(&path, ext_cxn);
        let stored = match profile_write.set_avatar_url(user.id, &url, ext_cxn).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => {
                info!("no profile row yet, creating one for the avatar");
                let first_profile = Profile {
                    id: user.id,
                    avatar_url: Some(url.clone()),
                    ..Profile::default()
                };
                profile_write.upsert_profile(&first_profile, ext_cxn).await
            }
            Err(port_err) => Err(port_err),
        };
        let profile = match stored {
            Ok(profile) => profile,
            Err(port_err) => {
                warn!("Avatar stored at {url} but profile update failed: {port_err:#}");
                return Err(AvatarError::ProfileNotUpdated {
                    url,
                    source: port_err,
                });
            }
        };

        info!(%url, "avatar updated");
        board.apply(BoardEvent::ProfileSaved(profile));
        Ok(url)
    }
}


#[cfg(test)]
pub mod test_util {
    use super::*;
    use crate::domain::test_util::{Connectivity, FakeImplementation};
    use std::sync::{Mutex, RwLock};

    /// Stands in for the backend's `profiles` table
    pub struct InMemoryProfilePersistence {
        pub profiles: Vec<Profile>,
        pub connected: Connectivity,
    }

    impl InMemoryProfilePersistence {
        pub fn new() -> InMemoryProfilePersistence {
            InMemoryProfilePersistence {
                profiles: Vec::new(),
                connected: Connectivity::Connected,
            }
        }

        pub fn new_with_profiles(profiles: &[Profile]) -> InMemoryProfilePersistence {
            InMemoryProfilePersistence {
                profiles: profiles.to_vec(),
                connected: Connectivity::Connected,
            }
        }

        pub fn new_locked() -> RwLock<InMemoryProfilePersistence> {
            RwLock::new(Self::new())
        }
    }

    impl driven_ports::ProfileReader for RwLock<InMemoryProfilePersistence> {
        async fn profile(
            &self,
            user_id: Uuid,
            _ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Profile>, anyhow::Error> {
            let persistence = self.read().expect("profile persist rw lock poisoned");
            persistence.connected.blow_up_if_disconnected()?;

            Ok(persistence
                .profiles
                .iter()
                .find(|profile| profile.id == user_id)
                .cloned())
        }
    }

    impl driven_ports::ProfileWriter for RwLock<InMemoryProfilePersistence> {
        async fn upsert_profile(
            &self,
            profile: &Profile,
            _ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Profile, anyhow::Error> {
            let mut persistence = self.write().expect("profile persist rw lock poisoned");
            persistence.connected.blow_up_if_disconnected()?;

            persistence.profiles.retain(|existing| existing.id != profile.id);
            persistence.profiles.push(profile.clone());
            Ok(profile.clone())
        }

        async fn set_avatar_url(
            &self,
            user_id: Uuid,
            avatar_url: &str,
            _ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Option<Profile>, anyhow::Error> {
            let mut persistence = self.write().expect("profile persist rw lock poisoned");
            persistence.connected.blow_up_if_disconnected()?;

            let updated = persistence
                .profiles
                .iter_mut()
                .find(|profile| profile.id == user_id)
                .map(|profile| {
                    profile.avatar_url = Some(avatar_url.to_owned());
                    profile.clone()
                });

            Ok(updated)
        }
    }

    pub struct MockAvatarStore {
        pub upload_result: FakeImplementation<(String, Vec<u8>, String), anyhow::Result<()>>,
    }

    impl MockAvatarStore {
        pub fn new() -> MockAvatarStore {
            MockAvatarStore {
                upload_result: FakeImplementation::new(),
            }
        }

        pub fn new_locked() -> Mutex<MockAvatarStore> {
            Mutex::new(Self::new())
        }
    }

    impl driven_ports::AvatarStore for Mutex<MockAvatarStore> {
        async fn upload(
            &self,
            path: &str,
            bytes: Vec<u8>,
            content_type: &str,
            _ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error> {
            let mut locked_self = self.lock().expect("avatar store mock mutex poisoned");
            locked_self
                .upload_result
                .save_arguments((path.to_owned(), bytes, content_type.to_owned()));

            locked_self.upload_result.return_value_anyhow()
        }

        fn public_url(&self, path: &str, ext_cxn: &impl ExternalConnectivity) -> String {
            format!("public://{}/{path}", ext_cxn.endpoint().avatar_bucket)
        }
    }
}
