use crate::entities::{attachments, prelude::*};
use crate::models::{OwnerRef, TypeFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

/// Columns written when an attachment is first stored.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub id: String,
    pub owner: OwnerRef,
    pub tag: Option<String>,
    pub storage_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Columns rewritten when a slot is reassigned.
#[derive(Debug, Clone)]
pub struct AttachmentChanges {
    pub storage_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Persistence boundary for attachment rows. Every write touches a single
/// row; calls share no transaction. Errors surface as `DbErr`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: NewAttachment) -> Result<attachments::Model, DbErr>;
    async fn update(
        &self,
        id: &str,
        changes: AttachmentChanges,
    ) -> Result<attachments::Model, DbErr>;
    /// Removes the row and returns it as it was when deleted, or `None` when
    /// no row with `id` existed.
    async fn delete(&self, id: &str) -> Result<Option<attachments::Model>, DbErr>;
    async fn find_by_id(&self, id: &str) -> Result<Option<attachments::Model>, DbErr>;
    /// Newest first by `created_at`.
    async fn find_by_owner(
        &self,
        owner: &OwnerRef,
        filter: &TypeFilter,
    ) -> Result<Vec<attachments::Model>, DbErr>;
    async fn find_by_path(&self, storage_path: &str) -> Result<Option<attachments::Model>, DbErr>;
}

pub struct SeaOrmRecordStore {
    db: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

pub(crate) fn type_condition(filter: &TypeFilter) -> Condition {
    match filter {
        TypeFilter::Any => Condition::all(),
        TypeFilter::Untyped => Condition::all().add(attachments::Column::Tag.is_null()),
        TypeFilter::Tags(tags) => {
            Condition::all().add(attachments::Column::Tag.is_in(tags.iter().cloned()))
        }
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn insert(&self, record: NewAttachment) -> Result<attachments::Model, DbErr> {
        let model = attachments::ActiveModel {
            id: Set(record.id),
            owner_kind: Set(record.owner.kind),
            owner_id: Set(record.owner.id),
            tag: Set(record.tag),
            storage_path: Set(record.storage_path),
            original_name: Set(record.original_name),
            mime_type: Set(record.mime_type),
            size_bytes: Set(record.size_bytes),
            created_at: Set(record.created_at),
            updated_at: Set(record.created_at),
        };

        model.insert(&self.db).await
    }

    async fn update(
        &self,
        id: &str,
        changes: AttachmentChanges,
    ) -> Result<attachments::Model, DbErr> {
        let existing = Attachments::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("attachment {}", id)))?;

        let mut active: attachments::ActiveModel = existing.into();
        active.storage_path = Set(changes.storage_path);
        active.original_name = Set(changes.original_name);
        active.mime_type = Set(changes.mime_type);
        active.size_bytes = Set(changes.size_bytes);
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await
    }

    async fn delete(&self, id: &str) -> Result<Option<attachments::Model>, DbErr> {
        loop {
            let Some(existing) = Attachments::find_by_id(id).one(&self.db).await? else {
                return Ok(None);
            };

            let res = Attachments::delete_many()
                .filter(attachments::Column::Id.eq(id))
                .filter(attachments::Column::StoragePath.eq(&existing.storage_path))
                .exec(&self.db)
                .await?;

            if res.rows_affected > 0 {
                return Ok(Some(existing));
            }
            // Repointed or removed between the read and the delete.
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<attachments::Model>, DbErr> {
        Attachments::find_by_id(id).one(&self.db).await
    }

    async fn find_by_owner(
        &self,
        owner: &OwnerRef,
        filter: &TypeFilter,
    ) -> Result<Vec<attachments::Model>, DbErr> {
        Attachments::find()
            .filter(attachments::Column::OwnerKind.eq(&owner.kind))
            .filter(attachments::Column::OwnerId.eq(&owner.id))
            .filter(type_condition(filter))
            .order_by_desc(attachments::Column::CreatedAt)
            .order_by_desc(attachments::Column::Id)
            .all(&self.db)
            .await
    }

    async fn find_by_path(&self, storage_path: &str) -> Result<Option<attachments::Model>, DbErr> {
        Attachments::find()
            .filter(attachments::Column::StoragePath.eq(storage_path))
            .one(&self.db)
            .await
    }
}
