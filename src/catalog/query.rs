//! # Catalog query execution and chunked iteration
//!
//! [`CatalogSource`] binds a registered [`CatalogObjectType`] to an open
//! database connection and executes column-projected, filtered queries over
//! its table. Each physical column expression is aliased back to its logical
//! name, the primary key is always selected first, and spatial filters from
//! [`ObservationMetadata`] plus an optional free-text constraint are ANDed
//! into the `WHERE` clause through the
//! [`predicate`](crate::predicate) expression tree.
//!
//! Two execution modes:
//!
//! - **Eager** ([`CatalogSource::query_columns`]): one fetch, all matching
//!   rows as a [`ResultSet`]. Row order is cursor order; no ordering is
//!   guaranteed beyond what the database itself provides.
//! - **Chunked** ([`CatalogSource::query_columns_chunked`]): a lazy,
//!   single-pass, forward-only stream of row batches of exactly
//!   `chunk_size` rows (the last batch may be smaller). The prepared
//!   statement and its cursor stay open for the lifetime of the
//!   [`ChunkedQuery`] and are released on drop. The stream is not
//!   restartable and not safe for concurrent consumption.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{params_from_iter, Connection, Rows, Statement};
use tracing::debug;

use crate::bounds::ObservationMetadata;
use crate::catalog::registry::CatalogRegistry;
use crate::catalog::{CatalogObjectType, ScalarType};
use crate::predicate::{metadata_predicate, Predicate};
use crate::skycat_errors::SkycatError;

/// One typed cell of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl CatalogValue {
    /// The cell as `f64`, if it holds a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CatalogValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The cell as `i64`, if it holds an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CatalogValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// An eagerly fetched, fixed-schema query result.
///
/// `columns` holds the logical column names in projection order (primary key
/// first); every row is a parallel vector of [`CatalogValue`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CatalogValue>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a logical column in the projection, if present.
    pub fn column_index(&self, logical: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == logical)
    }
}

/// Projection schema: logical label and declared type per selected column.
type SelectSchema = Vec<(String, ScalarType)>;

/// A catalog object type bound to an open database connection.
#[derive(Debug)]
pub struct CatalogSource {
    conn: Connection,
    def: Arc<CatalogObjectType>,
}

impl CatalogSource {
    /// Open the catalog source for a registered type id.
    ///
    /// The definition is validated up front: an unregistered id resolves to
    /// the generic placeholder definition, which fails validation here with a
    /// configuration error instead of failing later inside a query.
    pub fn from_objid<P: AsRef<Path>>(
        db_path: P,
        objid: &str,
        registry: &CatalogRegistry,
    ) -> Result<Self, SkycatError> {
        let def = registry.lookup(objid);
        Self::with_connection(Connection::open(db_path)?, def)
    }

    /// Bind an already open connection to a catalog type definition.
    pub fn with_connection(
        conn: Connection,
        def: Arc<CatalogObjectType>,
    ) -> Result<Self, SkycatError> {
        def.validate()?;
        Ok(CatalogSource { conn, def })
    }

    /// The catalog type definition backing this source.
    pub fn object_type(&self) -> &CatalogObjectType {
        &self.def
    }

    /// Execute a column query eagerly and return all matching rows.
    ///
    /// Arguments
    /// -----------------
    /// * `colnames`: Logical columns to select; `None` selects every
    ///   registered column. Any name absent from the column map is an
    ///   [`SkycatError::UnknownColumn`] error.
    /// * `obs_metadata`: Optional spatial/time filters for the pointing.
    /// * `constraint`: Optional free-text SQL predicate over physical
    ///   columns, ANDed after the spatial filter.
    pub fn query_columns(
        &self,
        colnames: Option<&[&str]>,
        obs_metadata: Option<&ObservationMetadata>,
        constraint: Option<&str>,
    ) -> Result<ResultSet, SkycatError> {
        let (sql, params, schema) = self.select_plan(colnames, obs_metadata, constraint)?;
        debug!(%sql, "executing eager catalog query");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut fetched = Vec::new();
        while let Some(row) = rows.next()? {
            fetched.push(read_row(row, &schema)?);
        }
        Ok(ResultSet {
            columns: schema.into_iter().map(|(name, _)| name).collect(),
            rows: fetched,
        })
    }

    /// Execute a column query lazily, yielding fixed-size row batches.
    ///
    /// The returned [`ChunkedQuery`] holds the prepared statement open; call
    /// [`ChunkedQuery::chunks`] to start the single-pass batch stream.
    pub fn query_columns_chunked(
        &self,
        colnames: Option<&[&str]>,
        chunk_size: usize,
        obs_metadata: Option<&ObservationMetadata>,
        constraint: Option<&str>,
    ) -> Result<ChunkedQuery<'_>, SkycatError> {
        if chunk_size == 0 {
            return Err(SkycatError::Configuration(
                "chunk size must be non-zero".into(),
            ));
        }
        let (sql, params, schema) = self.select_plan(colnames, obs_metadata, constraint)?;
        debug!(%sql, chunk_size, "preparing chunked catalog query");

        let stmt = self.conn.prepare(&sql)?;
        Ok(ChunkedQuery {
            stmt,
            params,
            schema,
            chunk_size,
            consumed: false,
        })
    }

    /// Build the SELECT statement, its bound parameters, and the projection
    /// schema for a column query.
    ///
    /// The primary-key expression is always selected first. When the caller's
    /// column list covers it, it is labeled with its logical key; otherwise
    /// it keeps its physical name. Requested columns whose physical
    /// expression matches the primary key are not selected twice.
    fn select_plan(
        &self,
        colnames: Option<&[&str]>,
        obs_metadata: Option<&ObservationMetadata>,
        constraint: Option<&str>,
    ) -> Result<(String, Vec<f64>, SelectSchema), SkycatError> {
        let def = &self.def;
        let requested: Vec<&str> = match colnames {
            Some(names) => names.to_vec(),
            None => def.columns.iter().map(|spec| spec.logical.as_str()).collect(),
        };

        let mut resolved = Vec::with_capacity(requested.len());
        for name in &requested {
            let spec = def
                .column(name)
                .ok_or_else(|| SkycatError::UnknownColumn((*name).to_owned()))?;
            resolved.push(spec);
        }

        let id_spec = def.column(&def.id_col_key).ok_or_else(|| {
            SkycatError::Configuration(format!(
                "catalog type '{}': id column '{}' is not in the column map",
                def.objid, def.id_col_key
            ))
        })?;
        let id_physical = id_spec.physical_expr();
        let id_requested = resolved
            .iter()
            .any(|spec| spec.physical_expr() == id_physical);
        let id_label: &str = if id_requested {
            &def.id_col_key
        } else {
            id_physical
        };

        let mut select_parts = vec![format!("{id_physical} AS {id_label}")];
        let mut schema: SelectSchema = vec![(id_label.to_owned(), id_spec.scalar_type)];
        for spec in &resolved {
            if spec.physical_expr() == id_physical {
                continue;
            }
            select_parts.push(format!("{} AS {}", spec.physical_expr(), spec.logical));
            schema.push((spec.logical.clone(), spec.scalar_type));
        }

        let mut filters = Vec::new();
        if let Some(obs) = obs_metadata {
            if let Some(pred) = metadata_predicate(obs, &def.ra_col_name, &def.dec_col_name)? {
                filters.push(pred);
            }
        }
        if let Some(text) = constraint {
            filters.push(Predicate::Raw(text.to_owned()));
        }

        let mut sql = format!("SELECT {} FROM {}", select_parts.join(", "), def.tableid);
        let mut params = Vec::new();
        if !filters.is_empty() {
            let combined = if filters.len() == 1 {
                filters.remove(0)
            } else {
                Predicate::All(filters)
            };
            let (where_sql, where_params) = combined.render();
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params = where_params;
        }

        Ok((sql, params, schema))
    }
}

/// A prepared chunked query holding its statement open.
///
/// Dropping the value closes the statement and releases the cursor, whether
/// or not the stream was exhausted.
#[derive(Debug)]
pub struct ChunkedQuery<'conn> {
    stmt: Statement<'conn>,
    params: Vec<f64>,
    schema: SelectSchema,
    chunk_size: usize,
    consumed: bool,
}

impl<'conn> ChunkedQuery<'conn> {
    /// Logical column names of the projection, primary key first.
    pub fn columns(&self) -> Vec<String> {
        self.schema.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Start the batch stream.
    ///
    /// The stream is single-pass and forward-only; starting it a second time
    /// is a precondition error.
    pub fn chunks(&mut self) -> Result<ChunkIterator<'_>, SkycatError> {
        if self.consumed {
            return Err(SkycatError::Precondition(
                "chunked query is single-pass and has already been consumed".into(),
            ));
        }
        self.consumed = true;
        let rows = self.stmt.query(params_from_iter(self.params.iter()))?;
        Ok(ChunkIterator {
            rows,
            schema: &self.schema,
            chunk_size: self.chunk_size,
            done: false,
        })
    }
}

/// Forward-only iterator over fixed-size row batches.
///
/// Yields batches of exactly `chunk_size` rows; the final batch may be
/// smaller. An empty fetch terminates the stream.
pub struct ChunkIterator<'stmt> {
    rows: Rows<'stmt>,
    schema: &'stmt [(String, ScalarType)],
    chunk_size: usize,
    done: bool,
}

impl std::fmt::Debug for ChunkIterator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkIterator")
            .field("schema", &self.schema)
            .field("chunk_size", &self.chunk_size)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Iterator for ChunkIterator<'_> {
    type Item = Result<Vec<Vec<CatalogValue>>, SkycatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = Vec::with_capacity(self.chunk_size);
        while chunk.len() < self.chunk_size {
            match self.rows.next() {
                Ok(Some(row)) => match read_row(row, self.schema) {
                    Ok(values) => chunk.push(values),
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err.into()));
                    }
                },
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}

/// Convert one database row into typed cells following the declared schema.
fn read_row(
    row: &rusqlite::Row<'_>,
    schema: &[(String, ScalarType)],
) -> Result<Vec<CatalogValue>, rusqlite::Error> {
    let mut values = Vec::with_capacity(schema.len());
    for (idx, (_, scalar_type)) in schema.iter().enumerate() {
        let value = match scalar_type {
            ScalarType::BigInt | ScalarType::Int => row
                .get::<_, Option<i64>>(idx)?
                .map_or(CatalogValue::Null, CatalogValue::Int),
            ScalarType::Float => row
                .get::<_, Option<f64>>(idx)?
                .map_or(CatalogValue::Null, CatalogValue::Float),
            ScalarType::Text => row
                .get::<_, Option<String>>(idx)?
                .map_or(CatalogValue::Null, CatalogValue::Text),
        };
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSpec;
    use crate::constants::RADEG;

    fn sample_source() -> CatalogSource {
        let conn = Connection::open_in_memory().expect("in-memory database");
        conn.execute_batch(
            "CREATE TABLE test (id INTEGER, ra REAL, dec REAL, mag REAL);
             INSERT INTO test VALUES (1, 10.0, 5.0, 12.5);
             INSERT INTO test VALUES (2, 200.0, -45.0, 9.0);
             INSERT INTO test VALUES (3, 359.0, 5.0, NULL);",
        )
        .expect("fixture schema");

        let def = CatalogObjectType {
            objid: "testpoints".into(),
            tableid: "test".into(),
            id_col_key: "pointId".into(),
            ra_col_name: "ra".into(),
            dec_col_name: "dec".into(),
            mjd_col_name: None,
            append_int: Some(1),
            spatial_model: Some("POINT".into()),
            columns: vec![
                ColumnSpec::int("pointId", Some("id")),
                ColumnSpec::float_expr("raJ2000", &format!("ra*{RADEG}")),
                ColumnSpec::float_expr("decJ2000", &format!("dec*{RADEG}")),
                ColumnSpec::float("mag"),
            ],
        };
        CatalogSource::with_connection(conn, Arc::new(def)).expect("valid definition")
    }

    #[test]
    fn default_projection_selects_all_columns_id_first() {
        let source = sample_source();
        let result = source.query_columns(None, None, None).unwrap();
        assert_eq!(
            result.columns,
            vec!["pointId", "raJ2000", "decJ2000", "mag"]
        );
        assert_eq!(result.len(), 3);
        assert_eq!(result.rows[0][0], CatalogValue::Int(1));
        assert!(
            (result.rows[0][1].as_f64().unwrap() - 10.0 * RADEG).abs() < 1e-12,
            "raJ2000 must come back in radians"
        );
    }

    #[test]
    fn id_is_prepended_when_not_requested() {
        let source = sample_source();
        let result = source
            .query_columns(Some(&["mag"]), None, None)
            .unwrap();
        // Not requested by logical key: the physical name labels it.
        assert_eq!(result.columns, vec!["id", "mag"]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let source = sample_source();
        let err = source
            .query_columns(Some(&["nope"]), None, None)
            .unwrap_err();
        assert!(matches!(err, SkycatError::UnknownColumn(name) if name == "nope"));
    }

    #[test]
    fn null_cells_survive_typed_extraction() {
        let source = sample_source();
        let result = source
            .query_columns(Some(&["pointId", "mag"]), None, None)
            .unwrap();
        assert_eq!(result.rows[2][1], CatalogValue::Null);
    }

    #[test]
    fn free_text_constraint_composes_with_bounds() {
        let source = sample_source();
        let obs = crate::bounds::ObservationMetadata::with_box(0.0, 300.0, -90.0, 90.0);
        let result = source
            .query_columns(Some(&["pointId", "mag"]), Some(&obs), Some("mag > 10.0"))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows[0][0], CatalogValue::Int(1));
    }

    #[test]
    fn chunk_stream_is_single_pass() {
        let source = sample_source();
        let mut query = source
            .query_columns_chunked(None, 2, None, None)
            .unwrap();
        let n_rows: usize = query
            .chunks()
            .unwrap()
            .map(|chunk| chunk.unwrap().len())
            .sum();
        assert_eq!(n_rows, 3);

        assert!(matches!(
            query.chunks().unwrap_err(),
            SkycatError::Precondition(_)
        ));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let source = sample_source();
        assert!(matches!(
            source.query_columns_chunked(None, 0, None, None).unwrap_err(),
            SkycatError::Configuration(_)
        ));
    }
}
