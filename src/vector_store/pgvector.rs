//! Postgres + pgvector backed store.
//!
//! The rest of the crate is synchronous, so the store owns a current-thread
//! Tokio runtime and drives `tokio-postgres` through `block_on`. The
//! connection task is spawned onto that runtime and makes progress whenever
//! a query is being awaited.

use std::error::Error as _;

use pgvector::Vector;
use serde_json::{Map, Value};
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::Json;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    batch_dimension, batch_model, check_model, SearchResult, StoredEntry, TableName, VectorStore,
    EMBEDDING_MODEL_KEY,
};
use crate::error::StoreError;

/// Vector store persisting entries in a pgvector table.
pub struct PgVectorStore {
    runtime: Runtime,
    client: Client,
    table: TableName,
    dimension: Option<usize>,
    model: Option<String>,
    prepared: bool,
}

impl PgVectorStore {
    /// Connects to `database_url`. The table is created on the first upsert.
    pub fn connect(database_url: &str, table: TableName) -> Result<Self, StoreError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| StoreError::Connection(format!("failed to start runtime: {err}")))?;
        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(database_url, NoTls))
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        runtime.spawn(async move {
            if let Err(err) = connection.await {
                warn!("postgres connection error: {err}");
            }
        });
        let dimension = runtime.block_on(stored_dimension(&client, &table))?;
        let model = runtime.block_on(stored_model(&client, &table))?;
        info!(
            "connected to vector store {} (dimension: {:?}, model: {:?})",
            table.qualified(),
            dimension,
            model
        );
        Ok(Self {
            runtime,
            client,
            table,
            dimension,
            model,
            prepared: false,
        })
    }

    /// Table this store reads and writes.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    fn prepare(&mut self, dims: usize) -> Result<(), StoreError> {
        if self.prepared {
            return Ok(());
        }
        let client = &self.client;
        let table = &self.table;
        self.runtime.block_on(async {
            ensure_vector_extension(client).await?;
            ensure_table(client, table, dims).await?;
            ensure_index(client, table).await
        })?;
        if self.dimension.is_none() {
            self.dimension = self.runtime.block_on(column_dimension(client, table))?;
        }
        if self.model.is_none() {
            self.model = self.runtime.block_on(column_model(client, table))?;
        }
        self.prepared = true;
        Ok(())
    }
}

impl VectorStore for PgVectorStore {
    fn upsert(&mut self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let Some(dims) = batch_dimension(entries)? else {
            return Ok(());
        };
        let model = batch_model(entries)?;
        self.prepare(dims)?;
        if let Some(expected) = self.dimension {
            if expected != dims {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: dims,
                });
            }
        }
        check_model(self.model.as_deref(), model)?;
        let sql = insert_sql(&self.table);
        let client = &mut self.client;
        self.runtime.block_on(insert_batch(client, &sql, entries))?;
        self.dimension = Some(dims);
        if self.model.is_none() {
            self.model = model.map(str::to_string);
        }
        debug!("upserted {} entries into {}", entries.len(), self.table.qualified());
        Ok(())
    }

    fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidK);
        }
        let dimension = match self.dimension {
            Some(dims) => Some(dims),
            None => self
                .runtime
                .block_on(stored_dimension(&self.client, &self.table))?,
        };
        let Some(expected) = dimension else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        let limit = i64::try_from(k).map_err(|_| StoreError::InvalidK)?;
        let vector = Vector::from(query.to_vec());
        let sql = select_sql(&self.table);
        let rows = self
            .runtime
            .block_on(self.client.query(sql.as_str(), &[&vector, &limit]))
            .map_err(|err| store_err("similarity search failed", err))?;
        let ranked = rows
            .iter()
            .map(ranked_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(order_ranked(ranked))
    }

    fn count(&self) -> Result<usize, StoreError> {
        let client = &self.client;
        let table = &self.table;
        self.runtime.block_on(async {
            if !table_exists(client, table).await? {
                return Ok(0);
            }
            let row = client
                .query_one(count_sql(table).as_str(), &[])
                .await
                .map_err(|err| store_err("failed to count entries", err))?;
            let total: i64 = row.get(0);
            Ok(usize::try_from(total).unwrap_or_default())
        })
    }

    fn embedding_model(&self) -> Result<Option<String>, StoreError> {
        if let Some(model) = &self.model {
            return Ok(Some(model.clone()));
        }
        self.runtime.block_on(stored_model(&self.client, &self.table))
    }

    fn remove_stale(&mut self, source: &str, keep: &[Uuid]) -> Result<usize, StoreError> {
        let client = &self.client;
        let table = &self.table;
        let removed = self.runtime.block_on(async {
            if !table_exists(client, table).await? {
                return Ok(0);
            }
            client
                .execute(delete_stale_sql(table).as_str(), &[&source, &keep])
                .await
                .map_err(|err| store_err("failed to remove stale entries", err))
        })?;
        if removed > 0 {
            debug!("removed {removed} stale entries of {source} from {}", table.qualified());
        }
        Ok(usize::try_from(removed).unwrap_or_default())
    }
}

/// Maps a driver error, telling a lost server apart from a failing statement.
fn store_err(context: &str, err: tokio_postgres::Error) -> StoreError {
    let io_failure = err
        .source()
        .is_some_and(|source| source.downcast_ref::<std::io::Error>().is_some());
    if err.is_closed() || io_failure {
        StoreError::Connection(format!("{context}: {err}"))
    } else {
        StoreError::Query(format!("{context}: {err}"))
    }
}

async fn ensure_vector_extension(client: &Client) -> Result<(), StoreError> {
    client
        .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
        .await
        .map_err(|err| store_err("failed to ensure pgvector extension", err))?;
    Ok(())
}

async fn ensure_table(client: &Client, table: &TableName, dims: usize) -> Result<(), StoreError> {
    client
        .execute(create_table_sql(table, dims).as_str(), &[])
        .await
        .map_err(|err| store_err("failed to create pgvector table", err))?;
    Ok(())
}

async fn ensure_index(client: &Client, table: &TableName) -> Result<(), StoreError> {
    client
        .execute(create_index_sql(table).as_str(), &[])
        .await
        .map_err(|err| store_err("failed to ensure embedding index", err))?;
    Ok(())
}

async fn table_exists(client: &Client, table: &TableName) -> Result<bool, StoreError> {
    let row = client
        .query_one(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )",
            &[&table.schema(), &table.table()],
        )
        .await
        .map_err(|err| store_err("failed to look up table", err))?;
    Ok(row.get(0))
}

/// Dimension of stored vectors, or `None` when the table is missing or empty.
async fn stored_dimension(client: &Client, table: &TableName) -> Result<Option<usize>, StoreError> {
    if !table_exists(client, table).await? {
        return Ok(None);
    }
    column_dimension(client, table).await
}

async fn column_dimension(client: &Client, table: &TableName) -> Result<Option<usize>, StoreError> {
    let sql = format!(
        "SELECT vector_dims(embedding) FROM {} LIMIT 1",
        table.qualified()
    );
    let row = client
        .query_opt(sql.as_str(), &[])
        .await
        .map_err(|err| store_err("failed to read embedding dimension", err))?;
    Ok(row
        .map(|row| row.get::<_, i32>(0))
        .and_then(|dims| usize::try_from(dims).ok()))
}

/// Embedding model recorded in the metadata, or `None` when unknown.
async fn stored_model(client: &Client, table: &TableName) -> Result<Option<String>, StoreError> {
    if !table_exists(client, table).await? {
        return Ok(None);
    }
    column_model(client, table).await
}

async fn column_model(client: &Client, table: &TableName) -> Result<Option<String>, StoreError> {
    let row = client
        .query_opt(model_sql(table).as_str(), &[])
        .await
        .map_err(|err| store_err("failed to read embedding model", err))?;
    Ok(row.map(|row| row.get::<_, String>(0)))
}

async fn insert_batch(
    client: &mut Client,
    sql: &str,
    entries: &[StoredEntry],
) -> Result<(), StoreError> {
    let transaction = client
        .transaction()
        .await
        .map_err(|err| store_err("failed to begin upsert", err))?;
    let statement = transaction
        .prepare(sql)
        .await
        .map_err(|err| store_err("failed to prepare upsert", err))?;
    for entry in entries {
        let vector = Vector::from(entry.embedding.clone());
        let metadata = Json(&entry.metadata);
        transaction
            .execute(
                &statement,
                &[&entry.id, &vector, &entry.document, &metadata],
            )
            .await
            .map_err(|err| store_err(&format!("failed to upsert entry {}", entry.id), err))?;
    }
    transaction
        .commit()
        .await
        .map_err(|err| store_err("failed to commit upsert", err))?;
    Ok(())
}

/// A fetched row with the keys that order it.
struct RankedRow {
    distance: f64,
    seq: i64,
    result: SearchResult,
}

/// Orders rows by distance, then by insertion sequence.
fn order_ranked(mut rows: Vec<RankedRow>) -> Vec<SearchResult> {
    rows.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.seq.cmp(&b.seq)));
    rows.into_iter().map(|row| row.result).collect()
}

fn ranked_from_row(row: &Row) -> Result<RankedRow, StoreError> {
    let column_err = |err: tokio_postgres::Error| store_err("invalid result row", err);
    let id: Uuid = row.try_get("id").map_err(column_err)?;
    let seq: i64 = row.try_get("seq").map_err(column_err)?;
    let embedding: Vector = row.try_get("embedding").map_err(column_err)?;
    let document: String = row.try_get("document").map_err(column_err)?;
    let metadata: Option<Json<Map<String, Value>>> =
        row.try_get("metadata").map_err(column_err)?;
    let distance: f64 = row.try_get("distance").map_err(column_err)?;
    Ok(RankedRow {
        distance,
        seq,
        result: SearchResult {
            entry: StoredEntry {
                id,
                embedding: embedding.to_vec(),
                document,
                metadata: metadata.map(|Json(map)| map).unwrap_or_default(),
            },
            score: distance as f32,
        },
    })
}

fn create_table_sql(table: &TableName, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL,
            embedding VECTOR({dims}) NOT NULL,
            document TEXT NOT NULL,
            metadata JSONB
        )",
        table.qualified()
    )
}

fn create_index_sql(table: &TableName) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} USING hnsw (embedding vector_cosine_ops)",
        table.embedding_index_name(),
        table.qualified()
    )
}

fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (id, embedding, document, metadata) \
            VALUES ($1, $2, $3, $4) \
            ON CONFLICT (id) DO UPDATE SET \
                embedding = EXCLUDED.embedding, \
                document = EXCLUDED.document, \
                metadata = EXCLUDED.metadata",
        table.qualified()
    )
}

fn select_sql(table: &TableName) -> String {
    format!(
        "SELECT \
            id, \
            seq, \
            embedding, \
            document, \
            metadata, \
            embedding <=> $1 AS distance \
        FROM {} \
        ORDER BY embedding <=> $1 \
        LIMIT $2",
        table.qualified()
    )
}

fn count_sql(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {}", table.qualified())
}

fn model_sql(table: &TableName) -> String {
    format!(
        "SELECT metadata->>'{key}' FROM {} WHERE metadata->>'{key}' IS NOT NULL LIMIT 1",
        table.qualified(),
        key = EMBEDDING_MODEL_KEY
    )
}

fn delete_stale_sql(table: &TableName) -> String {
    format!(
        "DELETE FROM {} WHERE metadata->>'source' = $1 AND NOT (id = ANY($2))",
        table.qualified()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn table() -> TableName {
        TableName::new("public", "pdf_chunks").unwrap()
    }

    #[test]
    fn create_table_uses_dimension_and_sequence() {
        let sql = create_table_sql(&table(), 1536);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"pdf_chunks\""));
        assert!(sql.contains("embedding VECTOR(1536) NOT NULL"));
        assert!(sql.contains("seq BIGSERIAL"));
        assert!(sql.contains("id UUID PRIMARY KEY"));
    }

    #[test]
    fn index_uses_cosine_ops() {
        let sql = create_index_sql(&table());
        assert_eq!(
            sql,
            "CREATE INDEX IF NOT EXISTS public_pdf_chunks_embedding_cos_idx ON \"public\".\"pdf_chunks\" USING hnsw (embedding vector_cosine_ops)"
        );
    }

    #[test]
    fn insert_replaces_on_conflict() {
        let sql = insert_sql(&table());
        assert!(sql.contains("VALUES ($1, $2, $3, $4)"));
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET"));
        assert!(sql.contains("document = EXCLUDED.document"));
    }

    #[test]
    fn select_orders_by_distance_alone() {
        let sql = select_sql(&table());
        assert!(sql.contains("embedding <=> $1 AS distance"));
        assert!(sql.contains("seq, "));
        // A secondary sort key would keep the HNSW index from serving the scan.
        assert!(sql.contains("ORDER BY embedding <=> $1 LIMIT $2"));
        assert!(!sql.contains("seq ASC"));
    }

    fn ranked(document: &str, distance: f64, seq: i64) -> RankedRow {
        RankedRow {
            distance,
            seq,
            result: SearchResult {
                entry: StoredEntry {
                    id: Uuid::new_v5(&Uuid::NAMESPACE_OID, document.as_bytes()),
                    embedding: vec![1.0, 0.0],
                    document: document.to_string(),
                    metadata: Map::new(),
                },
                score: distance as f32,
            },
        }
    }

    #[test]
    fn fetched_ties_fall_back_to_insertion_order() {
        let rows = vec![
            ranked("late-tie", 0.25, 9),
            ranked("closest", 0.1, 5),
            ranked("early-tie", 0.25, 2),
            ranked("farthest", 0.9, 1),
        ];
        let docs: Vec<String> = order_ranked(rows)
            .into_iter()
            .map(|result| result.entry.document)
            .collect();
        assert_eq!(docs, vec!["closest", "early-tie", "late-tie", "farthest"]);
    }

    #[test]
    fn stale_delete_is_scoped_to_one_source() {
        let sql = delete_stale_sql(&table());
        assert_eq!(
            sql,
            "DELETE FROM \"public\".\"pdf_chunks\" WHERE metadata->>'source' = $1 AND NOT (id = ANY($2))"
        );
    }

    #[test]
    fn model_lookup_reads_metadata_key() {
        let sql = model_sql(&table());
        assert!(sql.starts_with("SELECT metadata->>'embedding_model' FROM"));
        assert!(sql.ends_with("IS NOT NULL LIMIT 1"));
    }

    #[test]
    fn unreachable_database_is_a_connection_error() {
        let result = PgVectorStore::connect("postgres://pdfrag@127.0.0.1:1/pdfrag", table());
        assert!(matches!(result.err(), Some(StoreError::Connection(_))));
    }

    #[test]
    fn server_hangup_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            drop(socket);
        });

        let runtime = Builder::new_current_thread().enable_all().build().unwrap();
        let url = format!("postgres://pdfrag@127.0.0.1:{port}/pdfrag");
        let err = runtime
            .block_on(tokio_postgres::connect(&url, NoTls))
            .err()
            .unwrap();
        server.join().unwrap();

        let mapped = store_err("failed to count entries", err);
        assert!(matches!(mapped, StoreError::Connection(_)), "{mapped}");
        assert!(mapped.to_string().contains("failed to count entries"));
    }
}
