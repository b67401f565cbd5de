use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{Audit, PgQueryAs, Record};

/// Person profile, stored in `users`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    #[sqlx(rename = "user_username")]
    pub username: String,
    #[sqlx(rename = "user_full_name")]
    pub full_name: String,
    /// true = male, false = female
    #[sqlx(rename = "user_sex")]
    pub sex: bool,
    #[sqlx(rename = "user_height")]
    pub height: i32, // cm
    #[sqlx(rename = "user_weight")]
    pub weight: i32, // kg
    #[sqlx(rename = "user_age")]
    pub age: i32,
}

/// Every mutable profile attribute; an update replaces all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePatch {
    pub username: String,
    pub full_name: String,
    pub sex: bool,
    pub height: i32,
    pub weight: i32,
    pub age: i32,
}

impl Profile {
    pub fn new(id: Uuid, attrs: ProfilePatch) -> Self {
        Self {
            id,
            audit: Audit::pending(),
            username: attrs.username,
            full_name: attrs.full_name,
            sex: attrs.sex,
            height: attrs.height,
            weight: attrs.weight,
            age: attrs.age,
        }
    }

    fn attrs(&self) -> ProfilePatch {
        ProfilePatch {
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            sex: self.sex,
            height: self.height,
            weight: self.weight,
            age: self.age,
        }
    }
}

impl Record for Profile {
    type Patch = ProfilePatch;

    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "user_username",
        "user_full_name",
        "user_sex",
        "user_height",
        "user_weight",
        "user_age",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = Self::COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn bind_fields<'q, O>(&'q self, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        q.bind(&self.username)
            .bind(&self.full_name)
            .bind(self.sex)
            .bind(self.height)
            .bind(self.weight)
            .bind(self.age)
    }

    fn bind_patch<'q, O>(patch: &'q ProfilePatch, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        q.bind(&patch.username)
            .bind(&patch.full_name)
            .bind(patch.sex)
            .bind(patch.height)
            .bind(patch.weight)
            .bind(patch.age)
    }

    fn apply_patch(&mut self, patch: &ProfilePatch) -> bool {
        if self.attrs() == *patch {
            return false;
        }
        *self = Profile {
            id: self.id,
            audit: self.audit.clone(),
            ..Profile::new(self.id, patch.clone())
        };
        true
    }
}
