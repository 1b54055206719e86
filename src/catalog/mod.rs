//! # Catalog object types and column mapping
//!
//! A **catalog object type** describes how one logical class of sources
//! (stars, galaxies, pointing metadata, …) maps onto a physical database
//! table: the table name, the primary-key column, the RA/Dec column
//! expressions used by the spatial constraint builder, and an ordered list of
//! [`ColumnSpec`]s mapping logical column names to physical SQL expressions
//! and scalar types.
//!
//! Type definitions are plain configuration structs collected in an explicit
//! [`CatalogRegistry`](crate::catalog::registry::CatalogRegistry) populated at
//! process start; there is no implicit registration side channel. The structs
//! derive `serde` so definitions can also be loaded from configuration files.
//!
//! ## Column mapping
//!
//! Each [`ColumnSpec`] pairs a logical name with an optional physical
//! expression (falling back to the logical name itself) and a scalar type
//! (defaulting to double precision). The physical expression is an arbitrary
//! SQL scalar expression, e.g. `ra*0.017453292519943295` to serve radians
//! from a table storing degrees; the query layer aliases it back to the
//! logical name in every projection.

pub mod query;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::skycat_errors::SkycatError;

/// Scalar type of a catalog column, as declared in the column mapping.
///
/// `Text` columns may carry a fixed length on their [`ColumnSpec`]; numeric
/// types ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    BigInt,
    Int,
    Float,
    Text,
}

/// One logical column of a catalog object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Logical column name exposed to query callers.
    pub logical: String,
    /// Physical SQL expression; `None` means the logical name is also the
    /// physical column name.
    pub physical: Option<String>,
    /// Declared scalar type of the column.
    pub scalar_type: ScalarType,
    /// Fixed length for `Text` columns, when the downstream schema needs one.
    pub length: Option<u32>,
}

impl ColumnSpec {
    /// A double-precision column mapped straight through by name.
    pub fn float(logical: &str) -> Self {
        ColumnSpec {
            logical: logical.to_owned(),
            physical: None,
            scalar_type: ScalarType::Float,
            length: None,
        }
    }

    /// A double-precision column served by an arbitrary SQL expression.
    pub fn float_expr(logical: &str, physical: &str) -> Self {
        ColumnSpec {
            logical: logical.to_owned(),
            physical: Some(physical.to_owned()),
            scalar_type: ScalarType::Float,
            length: None,
        }
    }

    /// An integer column.
    pub fn int(logical: &str, physical: Option<&str>) -> Self {
        ColumnSpec {
            logical: logical.to_owned(),
            physical: physical.map(str::to_owned),
            scalar_type: ScalarType::Int,
            length: None,
        }
    }

    /// A fixed-length text column.
    pub fn text(logical: &str, physical: Option<&str>, length: u32) -> Self {
        ColumnSpec {
            logical: logical.to_owned(),
            physical: physical.map(str::to_owned),
            scalar_type: ScalarType::Text,
            length: Some(length),
        }
    }

    /// Physical expression of this column, falling back to the logical name.
    pub fn physical_expr(&self) -> &str {
        self.physical.as_deref().unwrap_or(&self.logical)
    }
}

/// Configuration of one catalog object type: the mapping from a logical type
/// id to a physical table and its column set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObjectType {
    /// Unique type id, the registry key.
    pub objid: String,
    /// Physical table name.
    pub tableid: String,
    /// Logical name of the primary-key column; must appear in `columns`.
    pub id_col_key: String,
    /// Physical SQL expression serving RA for spatial constraints, degrees.
    pub ra_col_name: String,
    /// Physical SQL expression serving Dec for spatial constraints, degrees.
    pub dec_col_name: String,
    /// Physical MJD column, for catalogs that carry one.
    pub mjd_col_name: Option<String>,
    /// Object-type tag appended to downstream simulation ids.
    pub append_int: Option<i32>,
    /// Spatial model tag for downstream simulation input (e.g. `POINT`).
    pub spatial_model: Option<String>,
    /// Ordered column mapping.
    pub columns: Vec<ColumnSpec>,
}

impl CatalogObjectType {
    /// A placeholder definition returned by registry lookups for unknown ids.
    ///
    /// It fails [`validate`](Self::validate), so using it to open a catalog
    /// source surfaces a configuration error, mirroring the behavior of an
    /// abstract base definition.
    pub fn generic(objid: &str) -> Self {
        CatalogObjectType {
            objid: objid.to_owned(),
            tableid: String::new(),
            id_col_key: String::new(),
            ra_col_name: "ra".to_owned(),
            dec_col_name: "dec".to_owned(),
            mjd_col_name: None,
            append_int: None,
            spatial_model: None,
            columns: Vec::new(),
        }
    }

    /// Ordered `(logical, physical)` pairs, with the physical expression
    /// falling back to the logical name.
    pub fn column_map(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|spec| (spec.logical.as_str(), spec.physical_expr()))
    }

    /// Ordered `(logical, scalar type)` pairs.
    pub fn type_map(&self) -> impl Iterator<Item = (&str, ScalarType)> {
        self.columns
            .iter()
            .map(|spec| (spec.logical.as_str(), spec.scalar_type))
    }

    /// Look up one column spec by logical name.
    pub fn column(&self, logical: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.logical == logical)
    }

    /// Check that the definition is complete enough to build queries.
    ///
    /// Missing table id, primary-key column, or column specs is a
    /// configuration error. A missing `append_int` or `spatial_model` only
    /// warns: such types cannot feed the simulation output formats but remain
    /// queryable.
    pub fn validate(&self) -> Result<(), SkycatError> {
        if self.tableid.is_empty() {
            return Err(SkycatError::Configuration(format!(
                "catalog type '{}' does not define a table id",
                self.objid
            )));
        }
        if self.columns.is_empty() {
            return Err(SkycatError::Configuration(format!(
                "catalog type '{}' does not define any columns",
                self.objid
            )));
        }
        if self.column(&self.id_col_key).is_none() {
            return Err(SkycatError::Configuration(format!(
                "catalog type '{}': id column '{}' is not in the column map",
                self.objid, self.id_col_key
            )));
        }
        if self.append_int.is_none() || self.spatial_model.is_none() {
            tracing::warn!(
                objid = %self.objid,
                "append_int or spatial_model is unset; simulation input files are not possible"
            );
        }
        Ok(())
    }
}
