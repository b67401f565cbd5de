use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::profiles::repo_types::{Profile, ProfilePatch};
use crate::store::{EntityStore, UpdateOutcome};

pub(crate) fn validate(attrs: &ProfilePatch) -> AppResult<()> {
    if attrs.username.trim().is_empty() {
        return Err(AppError::invalid("username is required"));
    }
    if attrs.full_name.trim().is_empty() {
        return Err(AppError::invalid("full_name is required"));
    }
    for (name, value) in [
        ("height", attrs.height),
        ("weight", attrs.weight),
        ("age", attrs.age),
    ] {
        if value <= 0 {
            return Err(AppError::invalid(format!("{name} must be greater than zero")));
        }
    }
    Ok(())
}

pub async fn create_profile(
    store: &dyn EntityStore<Profile>,
    attrs: ProfilePatch,
) -> AppResult<Profile> {
    validate(&attrs)?;
    let profile = store.create(Profile::new(Uuid::new_v4(), attrs)).await?;
    info!(profile_id = %profile.id, username = %profile.username, "profile created");
    Ok(profile)
}

/// Replaces the profile attributes and returns the stored profile. An update
/// that changes nothing still succeeds; only a missing profile is `NotFound`.
pub async fn update_profile(
    store: &dyn EntityStore<Profile>,
    id: Uuid,
    attrs: ProfilePatch,
) -> AppResult<Profile> {
    validate(&attrs)?;
    match store.update_fields(id, &attrs).await?.outcome() {
        UpdateOutcome::NotFound => {
            warn!(profile_id = %id, "update of missing profile");
            Err(AppError::NotFound)
        }
        UpdateOutcome::Unchanged => store.read(id).await,
        UpdateOutcome::Updated => {
            info!(profile_id = %id, "profile updated");
            store.read(id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn attrs() -> ProfilePatch {
        ProfilePatch {
            username: "jkowalski".into(),
            full_name: "Jan Kowalski".into(),
            sex: true,
            height: 180,
            weight: 80,
            age: 30,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_persists() {
        let store = MemoryStore::<Profile>::default();
        let p = create_profile(&store, attrs()).await.unwrap();
        let read = store.read(p.id).await.unwrap();
        assert_eq!(read.username, "jkowalski");
        assert_eq!(read.height, 180);
    }

    #[tokio::test]
    async fn invalid_attributes_are_rejected() {
        let store = MemoryStore::<Profile>::default();
        let mut bad = attrs();
        bad.weight = 0;
        assert!(matches!(
            create_profile(&store, bad).await,
            Err(AppError::InvalidInput(msg)) if msg.contains("weight")
        ));

        let mut blank = attrs();
        blank.full_name = "".into();
        assert!(matches!(
            create_profile(&store, blank).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_op_update_is_not_confused_with_missing() {
        let store = MemoryStore::<Profile>::default();
        let p = create_profile(&store, attrs()).await.unwrap();

        let same = update_profile(&store, p.id, attrs()).await.unwrap();
        assert_eq!(same.id, p.id);
        assert_eq!(same.audit.updated_at, p.audit.updated_at);

        assert!(matches!(
            update_profile(&store, Uuid::new_v4(), attrs()).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn update_replaces_attributes() {
        let store = MemoryStore::<Profile>::default();
        let p = create_profile(&store, attrs()).await.unwrap();
        let mut next = attrs();
        next.weight = 76;
        next.age = 31;

        let updated = update_profile(&store, p.id, next).await.unwrap();
        assert_eq!(updated.weight, 76);
        assert_eq!(updated.age, 31);
        assert_eq!(updated.audit.created_at, p.audit.created_at);
    }

    #[tokio::test]
    async fn deleted_profile_cannot_be_updated() {
        let store = MemoryStore::<Profile>::default();
        let p = create_profile(&store, attrs()).await.unwrap();
        assert_eq!(store.soft_delete(p.id).await.unwrap(), 1);
        assert!(matches!(
            update_profile(&store, p.id, attrs()).await,
            Err(AppError::NotFound)
        ));
    }
}
