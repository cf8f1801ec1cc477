use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    // Owner linkage is internal and never serialized.
    #[serde(skip_serializing)]
    pub owner_kind: String,
    #[serde(skip_serializing)]
    pub owner_id: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub tag: Option<String>,
    #[sea_orm(unique)]
    pub storage_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}
