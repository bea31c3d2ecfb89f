//! User account persistence: a thin directory alongside the grant store,
//! needed for bootstrap seeding, self-service edits, and introspection
//! display names. Out of scope for the grant graph itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::mongo::MongoCollection;
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::domain::User;
use crate::error::{Result, WardenError};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> Result<User>;
    async fn get(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update(&self, user: User) -> Result<User>;
    async fn any_admin_exists(&self) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: User) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.username == user.username) {
            return Err(WardenError::Conflict(format!("username {} already taken", user.username)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().values().find(|u| u.username == username).cloned())
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(WardenError::NotFound(format!("user {} not found", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn any_admin_exists(&self) -> Result<bool> {
        Ok(self.users.lock().unwrap().values().any(|u| u.is_admin))
    }
}

pub struct MongoUserStore {
    collection: MongoCollection<UserDoc>,
}

impl MongoUserStore {
    pub async fn new(client: &crate::db::mongo::MongoClient) -> Result<Self> {
        let collection = client.collection::<UserDoc>(USER_COLLECTION).await?;
        Ok(Self { collection })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn create(&self, user: User) -> Result<User> {
        let doc = UserDoc::from(&user);
        self.collection.insert_one(doc).await?;
        Ok(user)
    }

    async fn get(&self, id: &str) -> Result<Option<User>> {
        use bson::doc;
        let filter = doc! { "user_id": id };
        Ok(self.collection.find_one(filter).await?.map(UserDoc::into_user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        use bson::doc;
        let filter = doc! { "username": username };
        Ok(self.collection.find_one(filter).await?.map(UserDoc::into_user))
    }

    async fn update(&self, user: User) -> Result<User> {
        use bson::doc;
        let filter = doc! { "user_id": &user.id };
        let update = doc! {
            "$set": {
                "display_name": &user.display_name,
                "email": &user.email,
                "given_name": &user.given_name,
                "family_name": &user.family_name,
                "password_hash": &user.password_hash,
                "is_admin": user.is_admin,
                "disabled": user.disabled,
            }
        };
        self.collection.update_one(filter, update).await?;
        Ok(user)
    }

    async fn any_admin_exists(&self) -> Result<bool> {
        use bson::doc;
        let filter = doc! { "is_admin": true };
        Ok(self.collection.find_one(filter).await?.is_some())
    }
}
