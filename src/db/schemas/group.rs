//! Group document schema.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::Group;

pub const GROUP_COLLECTION: &str = "groups";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GroupDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub group_id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<&Group> for GroupDoc {
    fn from(g: &Group) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            group_id: g.id.clone(),
            name: g.name.clone(),
            description: g.description.clone(),
        }
    }
}

impl GroupDoc {
    pub fn into_group(self) -> Group {
        Group { id: self.group_id, name: self.name, description: self.description }
    }
}

impl IntoIndexes for GroupDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "group_id": 1 },
                Some(IndexOptions::builder().unique(true).name("group_id_unique".to_string()).build()),
            ),
            (
                doc! { "name": 1 },
                Some(IndexOptions::builder().unique(true).name("name_unique".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for GroupDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
