//! PostgreSQL backend over the synchronous `postgres` client.

use postgres::{Client, NoTls};

use super::{Backend, BackendError};
use crate::catalog::{Catalog, CatalogFunction, CatalogTrigger, PlannedUnit, TriggerBinding};

const FUNCTIONS_QUERY: &str = "\
SELECT p.proname::text,
       pg_get_function_identity_arguments(p.oid),
       pg_get_function_result(p.oid),
       p.prosrc
FROM pg_proc p
JOIN pg_language l ON l.oid = p.prolang
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE l.lanname = $1
  AND n.nspname = ANY(current_schemas(false))";

const TRIGGERS_QUERY: &str = "\
SELECT t.tgname::text,
       c.relname::text,
       p.proname::text,
       t.tgtype::int2
FROM pg_trigger t
JOIN pg_class c ON c.oid = t.tgrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
JOIN pg_proc p ON p.oid = t.tgfoid
WHERE NOT t.tgisinternal
  AND n.nspname = ANY(current_schemas(false))";

pub struct PostgresBackend {
    client: Client,
}

impl PostgresBackend {
    /// Connects using a `postgres://` URL or a key/value connection string.
    pub fn connect(url: &str) -> Result<Self, BackendError> {
        let client = Client::connect(url, NoTls).map_err(|e| BackendError::Connect(describe(&e)))?;
        tracing::debug!("connected to database");
        Ok(Self { client })
    }
}

impl Backend for PostgresBackend {
    fn fetch_catalog(&mut self, language: &str) -> Result<Catalog, BackendError> {
        let catalog_err = |e: postgres::Error| BackendError::Catalog(describe(&e));
        let mut catalog = Catalog::new();

        for row in self.client.query(FUNCTIONS_QUERY, &[&language]).map_err(catalog_err)? {
            catalog.functions.push(CatalogFunction {
                name: row.try_get(0).map_err(catalog_err)?,
                arguments: row.try_get(1).map_err(catalog_err)?,
                result: row.try_get(2).map_err(catalog_err)?,
                source: row.try_get(3).map_err(catalog_err)?,
            });
        }

        for row in self.client.query(TRIGGERS_QUERY, &[]).map_err(catalog_err)? {
            let tgtype: i16 = row.try_get(3).map_err(catalog_err)?;
            catalog.triggers.push(CatalogTrigger {
                name: row.try_get(0).map_err(catalog_err)?,
                table: row.try_get(1).map_err(catalog_err)?,
                function: row.try_get(2).map_err(catalog_err)?,
                binding: TriggerBinding::from_tgtype(tgtype),
            });
        }

        tracing::debug!(
            functions = catalog.functions.len(),
            triggers = catalog.triggers.len(),
            "fetched catalog"
        );
        Ok(catalog)
    }

    fn execute(&mut self, planned: &PlannedUnit) -> Result<(), BackendError> {
        let statements = planned.statements();
        if let Err(e) = self.client.batch_execute(&statements) {
            // Trigger units open their own transaction; leave the session usable
            if let Err(rollback) = self.client.batch_execute("ROLLBACK") {
                tracing::debug!(error = %rollback, "rollback after failed unit");
            }
            return Err(BackendError::Execute {
                unit: planned.unit.name.clone(),
                message: describe(&e),
            });
        }
        Ok(())
    }

    fn query_text(&mut self, sql: &str) -> Result<String, BackendError> {
        let row = self
            .client
            .query_one(sql, &[])
            .map_err(|e| BackendError::Query(describe(&e)))?;
        row.try_get(0).map_err(|e| BackendError::Query(describe(&e)))
    }
}

/// Prefers the server's message over the client's wrapper text.
fn describe(error: &postgres::Error) -> String {
    match error.as_db_error() {
        Some(db) => db.message().to_string(),
        None => error.to_string(),
    }
}
