use crate::entities::attachments;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(db_url);
    opt.connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    // Every pooled connection to an in-memory sqlite url opens its own database.
    if db_url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(20)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800));
    }

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    let stmt = schema
        .create_table_from_entity(attachments::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&stmt)).await?;
    info!("   - Table 'attachments' checked/created");

    // Slot lookups filter by owner and type and order by created_at.
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_attachments_owner ON attachments(owner_kind, owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_attachments_owner_type ON attachments(owner_kind, owner_id, type)",
        "CREATE INDEX IF NOT EXISTS idx_attachments_created_at ON attachments(created_at)",
    ];

    for query in indexes {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => info!("   - Executed schema update: {}", query),
            Err(e) => tracing::warn!("   - Schema update warning: {} -> {}", query, e),
        }
    }

    Ok(())
}
