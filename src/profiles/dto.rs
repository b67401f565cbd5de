use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::profiles::repo_types::{Profile, ProfilePatch};

/// Request body for create and update.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub full_name: String,
    pub sex: Option<bool>, // required; Option tells a missing field from `false`
    pub height: i32,
    pub weight: i32,
    pub age: i32,
}

impl ProfileForm {
    pub fn into_patch(self) -> AppResult<ProfilePatch> {
        let sex = self.sex.ok_or_else(|| AppError::invalid("sex is required"))?;
        Ok(ProfilePatch {
            username: self.username,
            full_name: self.full_name,
            sex,
            height: self.height,
            weight: self.weight,
            age: self.age,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub sex: &'static str,
    pub height: i32,
    pub weight: i32,
    pub age: i32,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            username: p.username,
            full_name: p.full_name,
            sex: if p.sex { "male" } else { "female" },
            height: p.height,
            weight: p.weight,
            age: p.age,
        }
    }
}
