//! Drop-and-recreate of the target database

use pg_escape::quote_identifier;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use super::Schema;
use crate::config::DatabaseSettings;
use crate::error::Result;

/// Rebuilds the target database from a [`Schema`]
///
/// Destructive: whatever database carries the target name is dropped first.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    schema: Schema,
}

impl SchemaManager {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Drop and create the database, create every type, table and index,
    /// and return a connection scoped to the fresh database
    pub async fn rebuild(&self, settings: &DatabaseSettings) -> Result<PgConnection> {
        self.schema.validate()?;

        let database = quote_identifier(&settings.name);
        debug!(
            host = %settings.host,
            port = settings.port,
            maintenance_db = %settings.maintenance_db,
            "Connecting to database server"
        );
        let mut server = PgConnection::connect_with(&settings.server_options()).await?;

        info!(database = %settings.name, "Dropping database");
        sqlx::raw_sql(&format!("DROP DATABASE IF EXISTS {}", database))
            .execute(&mut server)
            .await?;

        info!(database = %settings.name, "Creating database");
        sqlx::raw_sql(&format!("CREATE DATABASE {}", database))
            .execute(&mut server)
            .await?;
        server.close().await?;

        let mut conn = PgConnection::connect_with(&settings.database_options()).await?;
        let statements = self.schema.statements();
        for statement in &statements {
            debug!(statement = %statement, "Executing DDL");
            sqlx::raw_sql(statement).execute(&mut conn).await?;
        }

        info!(
            database = %settings.name,
            version = self.schema.version,
            tables = self.schema.tables.len(),
            "Schema created"
        );
        Ok(conn)
    }
}
