//! # SQL constraint builder
//!
//! This module turns the sky-region bounds of [`crate::bounds`] into SQL
//! `WHERE` fragments. Constraints are built as an explicit expression tree
//! ([`Predicate`]) and rendered to a fragment with numbered placeholders plus
//! an ordered parameter vector, so bound values never travel through string
//! interpolation and composed constraints always carry explicit `AND`/`OR`
//! grouping.
//!
//! ## RA wraparound
//!
//! A box derived from a circle near RA 0°/360° overflows the `[0, 360]`
//! range on one side. The overflowing window is folded back onto the circle
//! as a **union of two in-range windows**:
//!
//! ```text
//! ra_min = −5, ra_max = 15   →   (ra BETWEEN 355 AND 360 OR ra BETWEEN 0 AND 15)
//! ```
//!
//! When the window overflows on *both* sides the RA constraint degenerates to
//! the full circle and only the Dec window remains.
//!
//! ## Supported filters
//!
//! - Circular bounds (converted through [`BoxBound::from_circle`] first).
//! - Rectangular bounds.
//! - Caller-supplied free-text constraints ([`Predicate::Raw`]), always
//!   parenthesized before composition.
//! - MJD bounds are declared on [`ObservationMetadata`] but **not
//!   supported**: [`metadata_predicate`] fails with `UnsupportedFeature`
//!   instead of silently dropping them.

use itertools::Itertools;

use crate::bounds::{BoxBound, ObservationMetadata, SpatialBound};
use crate::constants::RA_CIRCLE;
use crate::skycat_errors::SkycatError;

/// A composable SQL predicate.
///
/// Rendering produces a fragment with `?N` placeholders; numeric bound values
/// are returned separately, in placeholder order, for parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column BETWEEN low AND high`, bounds passed as parameters.
    Between {
        column: String,
        low: f64,
        high: f64,
    },
    /// A caller-supplied SQL fragment, parenthesized verbatim.
    Raw(String),
    /// Conjunction of sub-predicates.
    All(Vec<Predicate>),
    /// Disjunction of sub-predicates.
    Any(Vec<Predicate>),
}

impl Predicate {
    /// `column BETWEEN low AND high` on a named column.
    pub fn between(column: &str, low: f64, high: f64) -> Self {
        Predicate::Between {
            column: column.to_owned(),
            low,
            high,
        }
    }

    /// Render to a SQL fragment and its ordered parameter vector.
    pub fn render(&self) -> (String, Vec<f64>) {
        let mut params = Vec::new();
        let sql = self.render_into(&mut params);
        (sql, params)
    }

    fn render_into(&self, params: &mut Vec<f64>) -> String {
        match self {
            Predicate::Between { column, low, high } => {
                params.push(*low);
                let lo = params.len();
                params.push(*high);
                let hi = params.len();
                format!("{column} BETWEEN ?{lo} AND ?{hi}")
            }
            Predicate::Raw(text) => format!("({text})"),
            Predicate::All(children) => children
                .iter()
                .map(|child| child.render_grouped(params))
                .join(" AND "),
            Predicate::Any(children) => children
                .iter()
                .map(|child| child.render_grouped(params))
                .join(" OR "),
        }
    }

    /// Render a child, parenthesizing composite sub-trees so that nested
    /// `AND`/`OR` keep their intended precedence.
    fn render_grouped(&self, params: &mut Vec<f64>) -> String {
        match self {
            Predicate::All(children) | Predicate::Any(children) if children.len() > 1 => {
                format!("({})", self.render_into(params))
            }
            _ => self.render_into(params),
        }
    }
}

/// Build the spatial predicate for a bound over the given RA/Dec column
/// expressions.
///
/// Circular bounds are first converted to a box via
/// [`BoxBound::from_circle`], then folded through the same RA-wraparound
/// logic as explicit boxes.
pub fn spatial_predicate(bound: &SpatialBound, ra_col: &str, dec_col: &str) -> Predicate {
    let bb = match bound {
        SpatialBound::Circle(circle) => BoxBound::from_circle(circle),
        SpatialBound::Box(bb) => *bb,
    };
    box_predicate(&bb, ra_col, dec_col)
}

/// RA/Dec window constraint with wraparound folding.
///
/// The Dec window is always a single `BETWEEN`. The RA window is:
/// - absent when the box overflows `[0, 360]` on both sides (full circle),
/// - a union of two in-range windows when it overflows on one side,
/// - a single `BETWEEN` otherwise.
pub fn box_predicate(bb: &BoxBound, ra_col: &str, dec_col: &str) -> Predicate {
    let dec_window = Predicate::between(dec_col, bb.dec_min, bb.dec_max);

    if bb.ra_min < 0.0 && bb.ra_max > RA_CIRCLE {
        // Box spans the whole RA circle: Dec-only constraint.
        return dec_window;
    }

    let ra_window = if bb.ra_min < 0.0 {
        Predicate::Any(vec![
            Predicate::between(ra_col, bb.ra_min.rem_euclid(RA_CIRCLE), RA_CIRCLE),
            Predicate::between(ra_col, 0.0, bb.ra_max),
        ])
    } else if bb.ra_max > RA_CIRCLE {
        Predicate::Any(vec![
            Predicate::between(ra_col, bb.ra_min, RA_CIRCLE),
            Predicate::between(ra_col, 0.0, bb.ra_max.rem_euclid(RA_CIRCLE)),
        ])
    } else {
        Predicate::between(ra_col, bb.ra_min, bb.ra_max)
    };

    Predicate::All(vec![ra_window, dec_window])
}

/// Derive the filter predicate implied by a pointing's metadata.
///
/// Returns `Ok(None)` when the metadata carries no filters.
///
/// Errors
/// ----------
/// * [`SkycatError::UnsupportedFeature`] when `mjd` is set; time filtering is
///   surfaced as unsupported rather than silently ignored.
pub fn metadata_predicate(
    obs: &ObservationMetadata,
    ra_col: &str,
    dec_col: &str,
) -> Result<Option<Predicate>, SkycatError> {
    if obs.mjd.is_some() {
        return Err(SkycatError::UnsupportedFeature(
            "MJD bound filtering is not implemented".into(),
        ));
    }
    Ok(obs
        .bound
        .as_ref()
        .map(|bound| spatial_predicate(bound, ra_col, dec_col)))
}
