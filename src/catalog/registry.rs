//! # Catalog type registry
//!
//! Explicit id → definition table mapping logical catalog type names to their
//! [`CatalogObjectType`] configuration. The registry is populated once at
//! process start and treated as read-only afterwards; definitions are shared
//! out behind [`Arc`] so catalog sources can hold them without copying the
//! column maps.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::catalog::{CatalogObjectType, ColumnSpec};
use crate::constants::RADEG;

/// Registry of catalog object types, keyed by type id.
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    types: HashMap<String, Arc<CatalogObjectType>>,
}

impl CatalogRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in catalog types
    /// ([`star_object_type`] and [`pointing_metadata_type`]).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(star_object_type());
        registry.register(pointing_metadata_type());
        registry
    }

    /// Register a catalog type definition.
    ///
    /// A duplicate id is a warning, not an error: the previous definition is
    /// overwritten and the registry keeps going.
    pub fn register(&mut self, def: CatalogObjectType) {
        let objid = def.objid.clone();
        if self.types.insert(objid.clone(), Arc::new(def)).is_some() {
            warn!(objid = %objid, "duplicate catalog object id; overwriting previous definition");
        }
    }

    /// Look up a definition by type id.
    ///
    /// Unknown ids yield a generic placeholder definition; it fails
    /// validation when used to open a catalog source, so the mistake
    /// surfaces at construction time rather than mid-query.
    pub fn lookup(&self, objid: &str) -> Arc<CatalogObjectType> {
        self.types
            .get(objid)
            .cloned()
            .unwrap_or_else(|| Arc::new(CatalogObjectType::generic(objid)))
    }

    /// Whether an id is registered.
    pub fn contains(&self, objid: &str) -> bool {
        self.types.contains_key(objid)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Built-in main-sequence star catalog type.
///
/// RA/Dec are stored in degrees in the table; the `raJ2000`/`decJ2000`
/// logical columns serve them converted to radians.
pub fn star_object_type() -> CatalogObjectType {
    CatalogObjectType {
        objid: "msstars".into(),
        tableid: "stars".into(),
        id_col_key: "id".into(),
        ra_col_name: "ra".into(),
        dec_col_name: "decl".into(),
        mjd_col_name: None,
        append_int: Some(4),
        spatial_model: Some("POINT".into()),
        columns: vec![
            ColumnSpec::int("id", Some("simobjid")),
            ColumnSpec::float("umag"),
            ColumnSpec::float("gmag"),
            ColumnSpec::float("rmag"),
            ColumnSpec::float("imag"),
            ColumnSpec::float("zmag"),
            ColumnSpec::float_expr("raJ2000", &format!("ra*{RADEG}")),
            ColumnSpec::float_expr("decJ2000", &format!("decl*{RADEG}")),
            ColumnSpec::text("sedFilename", Some("sedfilename"), 40),
        ],
    }
}

/// Built-in pointing metadata catalog type (per-visit observing conditions).
///
/// `fieldra`/`fielddec` are stored in degrees; `ra_col_name`/`dec_col_name`
/// serve them multiplied into radians, while spatial-bound parameters are
/// degrees. A degree-valued bound therefore will not match this type as
/// configured; pointing lookups go through the logical `fieldra`/`fielddec`
/// columns instead (see
/// [`ObservationMetadata::from_obshistid`](crate::bounds::ObservationMetadata::from_obshistid)).
pub fn pointing_metadata_type() -> CatalogObjectType {
    CatalogObjectType {
        objid: "pointings".into(),
        tableid: "output_pointings".into(),
        id_col_key: "obshistid".into(),
        ra_col_name: format!("fieldra*{RADEG}"),
        dec_col_name: format!("fielddec*{RADEG}"),
        mjd_col_name: Some("expmjd".into()),
        append_int: None,
        spatial_model: None,
        columns: vec![
            ColumnSpec {
                logical: "obshistid".into(),
                physical: None,
                scalar_type: crate::catalog::ScalarType::BigInt,
                length: None,
            },
            ColumnSpec::int("seed", Some("expdate")),
            ColumnSpec::float("fieldra"),
            ColumnSpec::float("fielddec"),
            ColumnSpec::float("rotskypos"),
            ColumnSpec::text("filter", None, 1),
            ColumnSpec::float("rawseeing"),
            ColumnSpec::float("expmjd"),
            ColumnSpec::float("altitude"),
            ColumnSpec::float("azimuth"),
        ],
    }
}
