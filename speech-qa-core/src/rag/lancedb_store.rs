//! LanceDB vector database storage implementation.
//!
//! This module provides integration with LanceDB for embedded, in-process
//! vector storage. A collection is a LanceDB table inside the index directory.

use super::store::{Result, StoreError, VectorStore};
use super::types::{Chunk, Metadata, Record, SearchResult};
use anyhow::{anyhow, Context};
use arrow_array::{
    array::{ArrayRef, FixedSizeListArray, Float32Array, StringArray},
    Array, RecordBatch, RecordBatchIterator,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use lancedb::arrow::arrow_schema::{DataType, Field, Schema};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// LanceDB-based vector store for embedded deployment.
///
/// Provides zero-setup, directory-backed vector storage using LanceDB.
pub struct LanceDbStore {
    conn: Connection,
    table: Table,
    dimension: usize,
}

#[async_trait]
impl VectorStore for LanceDbStore {
    async fn add(&self, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let batch = self.to_record_batch(records)?;
        let schema_ref = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema_ref);

        self.table
            .add(reader)
            .execute()
            .await
            .context("Failed to add records to LanceDB")?;

        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if query_embedding.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: query_embedding.len(),
                found: self.dimension,
            });
        }

        let results = self
            .table
            .query()
            .nearest_to(query_embedding)
            .context("Invalid query vector")?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .context("Failed to execute LanceDB query")?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .context("Failed to collect query results")?;

        let mut search_results = Vec::new();

        for batch in batches {
            let content_array = string_column(&batch, "content")?;
            let metadata_array = string_column(&batch, "metadata")?;
            let distance_array = batch
                .column_by_name("_distance")
                .context("Missing '_distance' column")?
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("Failed to cast '_distance' to Float32Array")?;

            for i in 0..batch.num_rows() {
                let metadata: Metadata = serde_json::from_str(metadata_array.value(i))
                    .context("Failed to decode record metadata")?;

                search_results.push(SearchResult {
                    chunk: Chunk {
                        content: content_array.value(i).to_string(),
                        metadata,
                    },
                    score: 1.0 - distance_array.value(i),
                });
            }
        }

        search_results.sort_by(|a, b| b.score.total_cmp(&a.score));
        search_results.truncate(top_k);
        debug!(results = search_results.len(), top_k, "LanceDB search finished");

        Ok(search_results)
    }

    async fn count(&self) -> Result<usize> {
        let count = self
            .table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        self.table
            .delete("true")
            .await
            .context("Failed to clear table")?;
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl LanceDbStore {
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("metadata", DataType::Utf8, false),
        ]))
    }

    /// Creates an empty collection, dropping any existing one of that name.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LanceDB should store data
    /// * `collection_name` - Name of the table to use
    /// * `dimension` - Width of the embedding vectors
    pub async fn create(path: &Path, collection_name: &str, dimension: usize) -> Result<Self> {
        let conn = Self::connect(path).await?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;

        if table_names.iter().any(|name| name == collection_name) {
            debug!(collection = collection_name, "Dropping existing collection");
            conn.drop_table(collection_name, &[])
                .await
                .context("Failed to drop table")?;
        }

        let table = conn
            .create_empty_table(collection_name, Self::create_schema(dimension))
            .execute()
            .await
            .context("Failed to create LanceDB table")?;

        Ok(Self {
            conn,
            table,
            dimension,
        })
    }

    /// Opens an existing collection without modifying it.
    ///
    /// Fails with [`StoreError::CollectionNotFound`] if the collection is
    /// missing and with [`StoreError::DimensionMismatch`] if it was built for
    /// vectors of another width.
    pub async fn open(path: &Path, collection_name: &str, dimension: usize) -> Result<Self> {
        let conn = Self::connect(path).await?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;

        if !table_names.iter().any(|name| name == collection_name) {
            return Err(StoreError::CollectionNotFound {
                collection: collection_name.to_string(),
                path: path.to_path_buf(),
            });
        }

        let table = conn
            .open_table(collection_name)
            .execute()
            .await
            .context("Failed to open LanceDB table")?;

        let schema = table.schema().await.context("Failed to read table schema")?;
        let found = match schema.field_with_name("vector").map(|f| f.data_type()) {
            Ok(DataType::FixedSizeList(_, width)) => *width as usize,
            _ => return Err(anyhow!("Table '{}' has no vector column", collection_name).into()),
        };

        if found != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                found,
            });
        }

        Ok(Self {
            conn,
            table,
            dimension,
        })
    }

    async fn connect(path: &Path) -> Result<Connection> {
        let uri = path.to_string_lossy();
        let conn = connect(&uri)
            .execute()
            .await
            .with_context(|| format!("Failed to connect to LanceDB at {}", uri))?;
        Ok(conn)
    }

    fn to_record_batch(&self, records: Vec<Record>) -> Result<RecordBatch> {
        let mut ids = Vec::with_capacity(records.len());
        let mut contents = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        let mut values = Vec::with_capacity(records.len() * self.dimension);

        for record in records {
            if record.vector.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    found: record.vector.len(),
                });
            }
            metadata.push(
                serde_json::to_string(&record.metadata).context("Failed to encode metadata")?,
            );
            ids.push(record.id);
            contents.push(record.content);
            values.extend(record.vector);
        }

        let vector_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.dimension as i32,
            Arc::new(Float32Array::from(values)),
            None,
        )
        .context("Failed to build vector column")?;

        let batch = RecordBatch::try_new(
            Self::create_schema(self.dimension),
            vec![
                Arc::new(StringArray::from(ids)) as ArrayRef,
                Arc::new(StringArray::from(contents)) as ArrayRef,
                Arc::new(vector_array) as ArrayRef,
                Arc::new(StringArray::from(metadata)) as ArrayRef,
            ],
        )
        .context("Failed to create record batch")?;

        Ok(batch)
    }

    /// Name of the underlying LanceDB table.
    pub fn collection_name(&self) -> &str {
        self.table.name()
    }

    pub async fn collections(&self) -> Result<Vec<String>> {
        let names = self
            .conn
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;
        Ok(names)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let array = batch
        .column_by_name(name)
        .with_context(|| format!("Missing '{}' column", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("Failed to cast '{}' to StringArray", name))?;
    Ok(array)
}
