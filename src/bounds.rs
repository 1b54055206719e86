//! # Sky-region bounds and observation metadata
//!
//! This module defines the spatial filters attached to a catalog query:
//!
//! - [`CircularBound`] — a cone on the sky (center RA/Dec and radius).
//! - [`BoxBound`] — a rectangular RA/Dec window.
//! - [`SpatialBound`] — exactly one of the two; a query carries at most one
//!   spatial filter, and the enum makes circular and rectangular bounds
//!   mutually exclusive by construction.
//! - [`ObservationMetadata`] — the per-pointing filter bundle (spatial bound
//!   plus an optional list of MJD values). Besides the direct constructors it
//!   can be built from a recorded telescope pointing
//!   ([`ObservationMetadata::from_obshistid`]): the pointing's field center
//!   becomes the center of a circular bound of caller-chosen radius. Only the
//!   circular form exists; the box form is unsupported.
//!
//! ## Circle-to-box conversion
//!
//! [`BoxBound::from_circle`] derives the rectangular window that the SQL
//! constraint builder actually uses:
//!
//! ```text
//! ra_min  = ra − radius / cos(dec)     dec_min = dec − radius
//! ra_max  = ra + radius / cos(dec)     dec_max = dec + radius
//! ```
//!
//! This is a **planar approximation**, not a true spherical-cap bound. The
//! RA half-width `radius / cos(dec)` under-covers the cap by a few percent at
//! mid declinations and the division blows up as `|dec| → 90°`. This is a
//! known, documented limitation of the derivation; callers working near the
//! poles should supply an explicit [`BoxBound`] instead.
//!
//! ## Units
//!
//! All bound fields are **degrees**. [`angular_separation`] works in
//! **radians**, matching how catalog tables store `ra*PI()/180.` expressions.

use serde::{Deserialize, Serialize};

use crate::catalog::query::CatalogSource;
use crate::constants::{Degree, Radian, MJD, RADEG};
use crate::skycat_errors::SkycatError;

/// A circular sky region: center and angular radius, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularBound {
    pub ra: Degree,
    pub dec: Degree,
    pub radius: Degree,
}

/// A rectangular RA/Dec window, in degrees.
///
/// `ra_min`/`ra_max` may leave `[0, 360]` when derived from a circle close to
/// the RA wrap; the constraint builder is responsible for folding the excess
/// back onto the circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxBound {
    pub ra_min: Degree,
    pub ra_max: Degree,
    pub dec_min: Degree,
    pub dec_max: Degree,
}

impl BoxBound {
    /// Derive the rectangular window equivalent to a circular bound.
    ///
    /// Planar approximation: the RA half-width is stretched by
    /// `1 / cos(dec)` so the window keeps roughly constant sky area as the
    /// center moves off the equator. Degrades near the poles (see module
    /// docs); not valid for `|dec| = 90°`.
    pub fn from_circle(circle: &CircularBound) -> Self {
        let ra_half_width = circle.radius / (circle.dec * RADEG).cos();
        BoxBound {
            ra_min: circle.ra - ra_half_width,
            ra_max: circle.ra + ra_half_width,
            dec_min: circle.dec - circle.radius,
            dec_max: circle.dec + circle.radius,
        }
    }
}

/// The spatial filter of a query: either a circle or a box, never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpatialBound {
    Circle(CircularBound),
    Box(BoxBound),
}

/// Metadata for a query associated with a particular telescope pointing:
/// an optional spatial bound and an optional list of observation MJDs.
///
/// MJD filtering is declared for interface completeness but is not supported
/// by the constraint builder; supplying `mjd` makes the query fail with
/// [`SkycatError::UnsupportedFeature`](crate::skycat_errors::SkycatError::UnsupportedFeature)
/// rather than being silently ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationMetadata {
    pub bound: Option<SpatialBound>,
    pub mjd: Option<Vec<MJD>>,
}

impl ObservationMetadata {
    /// Metadata with no filters at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying a circular bound.
    pub fn with_circle(ra: Degree, dec: Degree, radius: Degree) -> Self {
        ObservationMetadata {
            bound: Some(SpatialBound::Circle(CircularBound { ra, dec, radius })),
            mjd: None,
        }
    }

    /// Metadata carrying a rectangular bound.
    pub fn with_box(ra_min: Degree, ra_max: Degree, dec_min: Degree, dec_max: Degree) -> Self {
        ObservationMetadata {
            bound: Some(SpatialBound::Box(BoxBound {
                ra_min,
                ra_max,
                dec_min,
                dec_max,
            })),
            mjd: None,
        }
    }

    /// Attach a list of observation MJDs.
    pub fn with_mjd(mut self, mjd: Vec<MJD>) -> Self {
        self.mjd = Some(mjd);
        self
    }

    /// Build circular-bound metadata from a recorded telescope pointing.
    ///
    /// Looks the pointing up by `obshistid` in a pointing-metadata catalog
    /// source (the `pointings` built-in type, or any type serving `fieldra`/
    /// `fielddec` in degrees) and centers a circle of the given radius on its
    /// field center. Identical observations can share an `obshistid`; the
    /// first matching row wins.
    ///
    /// Errors
    /// ----------
    /// * [`SkycatError::Precondition`] when no pointing carries that id or
    ///   the field center is NULL.
    pub fn from_obshistid(
        source: &CatalogSource,
        obshistid: i64,
        radius: Degree,
    ) -> Result<Self, SkycatError> {
        let def = source.object_type();
        let id_expr = def
            .column(&def.id_col_key)
            .map(|spec| spec.physical_expr().to_owned())
            .unwrap_or_else(|| def.id_col_key.clone());
        let constraint = format!("{id_expr} = {obshistid}");
        let result =
            source.query_columns(Some(&["fieldra", "fielddec"]), None, Some(&constraint))?;
        if result.is_empty() {
            return Err(SkycatError::Precondition(format!(
                "no pointing with obshistid {obshistid}"
            )));
        }
        let center = |logical: &str| -> Result<Degree, SkycatError> {
            let idx = result.column_index(logical).ok_or_else(|| {
                SkycatError::UnknownColumn(logical.to_owned())
            })?;
            result.rows[0][idx].as_f64().ok_or_else(|| {
                SkycatError::Precondition(format!(
                    "pointing {obshistid} has no {logical} value"
                ))
            })
        };
        Ok(Self::with_circle(center("fieldra")?, center("fielddec")?, radius))
    }

    /// Box-bound construction from a pointing is not implemented; only the
    /// circular form ([`from_obshistid`](Self::from_obshistid)) exists.
    pub fn from_obshistid_box(
        _source: &CatalogSource,
        _obshistid: i64,
    ) -> Result<Self, SkycatError> {
        Err(SkycatError::UnsupportedFeature(
            "box bound construction from a pointing is not implemented".into(),
        ))
    }
}

/// Great-circle angular separation between two sky positions, in radians.
///
/// Haversine formulation, numerically stable for small separations.
pub fn angular_separation(ra1: Radian, dec1: Radian, ra2: Radian, dec2: Radian) -> Radian {
    let sin_half_dra = ((ra2 - ra1) / 2.0).sin();
    let sin_half_ddec = ((dec2 - dec1) / 2.0).sin();
    let h = sin_half_ddec.powi(2) + dec1.cos() * dec2.cos() * sin_half_dra.powi(2);
    2.0 * h.sqrt().asin()
}
