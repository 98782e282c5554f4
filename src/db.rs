use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
    Statement,
};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{casbin_rule, forum, group, message, topic};

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    info!(
        "Connecting to database: {}:{}/{}",
        config.host, config.port, config.name
    );
    connect(&config.connection_url()).await
}

/// Connect to the given database URL and auto-migrate tables
///
/// Also used by the integration tests with an in-memory sqlite URL.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    if database_url.starts_with("sqlite") {
        // An in-memory sqlite database exists per connection; the pool
        // must not fan out.
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(100).min_connections(5);
    }
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Auto-migrate database tables
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    create_table_if_not_exists(db, backend, schema.create_table_from_entity(group::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(forum::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(topic::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(message::Entity))
        .await?;
    create_table_if_not_exists(
        db,
        backend,
        schema.create_table_from_entity(casbin_rule::Entity),
    )
    .await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();

    let sql = backend.build(&stmt);

    db.execute(Statement::from_string(backend, sql.to_string()))
        .await?;

    Ok(())
}
