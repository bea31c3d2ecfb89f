//! User document schema.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::User;

pub const USER_COLLECTION: &str = "users";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl From<&User> for UserDoc {
    fn from(u: &User) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id: u.id.clone(),
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            email: u.email.clone(),
            given_name: u.given_name.clone(),
            family_name: u.family_name.clone(),
            password_hash: u.password_hash.clone(),
            is_admin: u.is_admin,
            disabled: u.disabled,
        }
    }
}

impl UserDoc {
    pub fn into_user(self) -> User {
        User {
            id: self.user_id,
            username: self.username,
            display_name: self.display_name,
            email: self.email,
            given_name: self.given_name,
            family_name: self.family_name,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
            disabled: self.disabled,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(IndexOptions::builder().unique(true).name("user_id_unique".to_string()).build()),
            ),
            (
                doc! { "username": 1 },
                Some(IndexOptions::builder().unique(true).name("username_unique".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
