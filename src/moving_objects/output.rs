//! # List-of-lists output formats
//!
//! Downstream consumers (image-simulation trim catalogs, difference-imaging
//! source catalogs) take moving-object ephemerides as a header of column
//! names plus one row of scalars per object. [`ListOutput`] carries that
//! shape; the builders below extract one format each from a
//! [`MovingObjectSet`] at a single epoch.

use crate::catalog::query::CatalogValue;
use crate::constants::MJD;
use crate::moving_objects::batch::MovingObjectSet;
use crate::moving_objects::epoch_key;
use crate::skycat_errors::SkycatError;

/// Column names plus one row per object, in set order.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOutput {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<CatalogValue>>,
}

impl ListOutput {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the image-simulation input rows for one epoch.
///
/// Columns: `objid`, `ra`, `decl`, `distance`, `flux_scale`, `sedname`,
/// `dradt`, `ddecdt`. The `flux_scale` cell carries the simulator
/// magnitude, which the consumer converts to a flux normalization itself.
///
/// Errors
/// ----------
/// * [`SkycatError::Precondition`] when any object lacks an ephemeris at the
///   epoch, a simulator magnitude, or an SED name.
pub fn simulation_input(
    set: &MovingObjectSet,
    mjd_tai: MJD,
) -> Result<ListOutput, SkycatError> {
    let mut rows = Vec::with_capacity(set.len());
    for obj in set.iter() {
        let eph = obj.require_ephemeris(mjd_tai)?;
        let mag_imsim = eph.mag_imsim.ok_or_else(|| {
            SkycatError::Precondition(format!(
                "object {} has no simulator magnitude at MJD {}",
                obj.objid,
                epoch_key(mjd_tai)
            ))
        })?;
        let sed_name = obj.sed_name.clone().ok_or_else(|| {
            SkycatError::Precondition(format!("object {} has no SED name", obj.objid))
        })?;
        rows.push(vec![
            CatalogValue::Int(obj.objid),
            CatalogValue::Float(eph.ra),
            CatalogValue::Float(eph.dec),
            CatalogValue::Float(eph.distance),
            CatalogValue::Float(mag_imsim),
            CatalogValue::Text(sed_name),
            CatalogValue::Float(eph.dradt),
            CatalogValue::Float(eph.ddecdt),
        ]);
    }
    Ok(ListOutput {
        columns: vec![
            "objid",
            "ra",
            "decl",
            "distance",
            "flux_scale",
            "sedname",
            "dradt",
            "ddecdt",
        ],
        rows,
    })
}

/// Build the difference-imaging source rows for one epoch.
///
/// Columns: `objid`, `ra`, `decl`, `raError`, `declError`, `magFilter`,
/// `magError`. The single astrometric error feeds both positional error
/// columns. Error cells left unassigned come out [`CatalogValue::Null`].
///
/// Errors
/// ----------
/// * [`SkycatError::Precondition`] when any object lacks an ephemeris or a
///   filter magnitude at the epoch.
pub fn diasource(set: &MovingObjectSet, mjd_tai: MJD) -> Result<ListOutput, SkycatError> {
    let mut rows = Vec::with_capacity(set.len());
    for obj in set.iter() {
        let eph = obj.require_ephemeris(mjd_tai)?;
        let mag_filter = eph.mag_filter.ok_or_else(|| {
            SkycatError::Precondition(format!(
                "object {} has no filter magnitude at MJD {}",
                obj.objid,
                epoch_key(mjd_tai)
            ))
        })?;
        let ast_err = eph
            .ast_err
            .map(CatalogValue::Float)
            .unwrap_or(CatalogValue::Null);
        let mag_err = eph
            .mag_err
            .map(CatalogValue::Float)
            .unwrap_or(CatalogValue::Null);
        rows.push(vec![
            CatalogValue::Int(obj.objid),
            CatalogValue::Float(eph.ra),
            CatalogValue::Float(eph.dec),
            ast_err.clone(),
            ast_err,
            CatalogValue::Float(mag_filter),
            mag_err,
        ]);
    }
    Ok(ListOutput {
        columns: vec![
            "objid",
            "ra",
            "decl",
            "raError",
            "declError",
            "magFilter",
            "magError",
        ],
        rows,
    })
}
