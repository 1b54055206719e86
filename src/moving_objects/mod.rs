//! # Moving solar-system objects and their ephemerides
//!
//! This module tree holds the batch ephemeris processor:
//!
//! - [`MovingObject`] — one orbit plus the ephemerides computed for it so
//!   far, keyed by a canonical epoch string. Ephemerides accumulate over the
//!   object's lifetime; entries are only ever added or overwritten, never
//!   removed.
//! - [`Ephemeris`] — a computed apparent position (RA/Dec, distance,
//!   magnitude, sky rates) at one epoch, with optional per-filter magnitudes
//!   and error terms attached later by the caller's photometry.
//! - [`engine`](crate::moving_objects::engine) — the trait boundary to the
//!   external orbit-propagation library and the flat array marshalling it
//!   expects.
//! - [`batch`](crate::moving_objects::batch) — [`MovingObjectSet`], the
//!   aggregate that computes ephemerides for many orbits in **one** external
//!   batch call and filters the set by field of view or signal-to-noise.
//! - [`output`](crate::moving_objects::output) — flat list-of-lists exports
//!   for downstream simulation and difference-imaging consumers.
//!
//! ## Epochs and timescales
//!
//! Ephemeris epochs are MJD(TAI) throughout. User-facing epochs are
//! [`EpochSpec`]s carrying an explicit [`Timescale`]; UTC/TT inputs are
//! converted to TAI (via `hifitime`) before the batch is marshalled, and the
//! canonical dictionary key is the TAI value printed at fixed precision.

pub mod batch;
pub mod engine;
pub mod output;

use std::collections::HashMap;

use hifitime::{Epoch, TimeScale};
use serde::{Deserialize, Serialize};

use crate::bounds::angular_separation;
use crate::constants::{Degree, Magnitude, MJD, RADEG};
use crate::skycat_errors::SkycatError;

/// Decimal places of the canonical epoch key (≈ 10 ms of time).
const EPOCH_KEY_PRECISION: usize = 6;

/// Canonical dictionary key for an ephemeris epoch.
///
/// All lookups into [`MovingObject::ephemerides`] go through this, so float
/// noise below the key precision cannot split one epoch into two entries.
pub fn epoch_key(mjd_tai: MJD) -> String {
    format!("{mjd_tai:.prec$}", prec = EPOCH_KEY_PRECISION)
}

/// Timescale codes understood by the ephemeris engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timescale {
    Utc,
    Ut1,
    Tt,
    Tai,
}

impl Timescale {
    /// Numeric code used in the flat epoch matrix.
    pub fn code(self) -> f64 {
        match self {
            Timescale::Utc => 1.0,
            Timescale::Ut1 => 2.0,
            Timescale::Tt => 3.0,
            Timescale::Tai => 4.0,
        }
    }

    /// Decode an engine timescale code.
    pub fn from_code(code: i32) -> Result<Self, SkycatError> {
        match code {
            1 => Ok(Timescale::Utc),
            2 => Ok(Timescale::Ut1),
            3 => Ok(Timescale::Tt),
            4 => Ok(Timescale::Tai),
            other => Err(SkycatError::InvalidTimescale(other)),
        }
    }
}

/// An epoch in an explicit timescale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSpec {
    pub mjd: MJD,
    pub scale: Timescale,
}

impl EpochSpec {
    /// An epoch already expressed in TAI.
    pub fn tai(mjd: MJD) -> Self {
        EpochSpec {
            mjd,
            scale: Timescale::Tai,
        }
    }

    /// An epoch in UTC.
    pub fn utc(mjd: MJD) -> Self {
        EpochSpec {
            mjd,
            scale: Timescale::Utc,
        }
    }

    /// Convert to MJD(TAI).
    ///
    /// UT1 conversion needs an external Earth-orientation provider and is
    /// surfaced as unsupported; pass UT1 epochs to an engine that handles
    /// them natively instead.
    pub fn to_mjd_tai(&self) -> Result<MJD, SkycatError> {
        match self.scale {
            Timescale::Tai => Ok(self.mjd),
            Timescale::Utc => Ok(Epoch::from_mjd_utc(self.mjd).to_mjd_tai_days()),
            Timescale::Tt => {
                Ok(Epoch::from_mjd_in_time_scale(self.mjd, TimeScale::TT).to_mjd_tai_days())
            }
            Timescale::Ut1 => Err(SkycatError::UnsupportedFeature(
                "UT1 epoch conversion requires an Earth-orientation provider".into(),
            )),
        }
    }
}

/// Cometary orbital elements at a reference epoch.
///
/// Units
/// -----
/// * `q`: perihelion distance, AU.
/// * `e`: eccentricity, unitless.
/// * `incl`, `node`, `arg_peri`: **degrees** (converted to radians at the
///   engine boundary).
/// * `t_peri`, `epoch`: MJD in `timescale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CometaryElements {
    pub q: f64,
    pub e: f64,
    pub incl: Degree,
    pub node: Degree,
    pub arg_peri: Degree,
    pub t_peri: MJD,
    pub epoch: MJD,
    pub timescale: Timescale,
}

/// A computed apparent position of a moving object at one epoch.
///
/// `ra`/`dec` are degrees, `distance` AU, `dradt`/`ddecdt` degrees per day.
/// `dradt` is the **true** RA rate (sky rate divided by `cos(dec)`).
/// The magnitude/error fields beyond `mag_v` are filled in later by the
/// caller's photometry and stay `None` until then.
#[derive(Debug, Clone, PartialEq)]
pub struct Ephemeris {
    pub mjd_tai: MJD,
    pub ra: Degree,
    pub dec: Degree,
    pub mag_v: Magnitude,
    pub distance: f64,
    pub dradt: f64,
    pub ddecdt: f64,
    pub mag_filter: Option<Magnitude>,
    pub mag_imsim: Option<Magnitude>,
    pub ast_err: Option<f64>,
    pub mag_err: Option<f64>,
}

impl Ephemeris {
    pub fn new(
        mjd_tai: MJD,
        ra: Degree,
        dec: Degree,
        mag_v: Magnitude,
        distance: f64,
        dradt: f64,
        ddecdt: f64,
    ) -> Self {
        Ephemeris {
            mjd_tai,
            ra,
            dec,
            mag_v,
            distance,
            dradt,
            ddecdt,
            mag_filter: None,
            mag_imsim: None,
            ast_err: None,
            mag_err: None,
        }
    }

    /// Whether this position falls inside a circular field of view.
    ///
    /// The boundary is closed, so a degenerate zero-radius field still
    /// contains an exactly coincident ephemeris.
    pub fn is_in_field_of_view(&self, ra: Degree, dec: Degree, radius: Degree) -> bool {
        let separation = angular_separation(
            self.ra * RADEG,
            self.dec * RADEG,
            ra * RADEG,
            dec * RADEG,
        );
        separation <= radius * RADEG
    }
}

/// One moving solar-system object: orbit, photometric parameters, and the
/// ephemerides computed for it so far.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingObject {
    pub objid: i64,
    pub orbit: CometaryElements,
    /// Absolute magnitude H (V band).
    pub mag_hv: Magnitude,
    /// Phase slope parameter G.
    pub phase_gv: f64,
    /// SED file name for downstream simulation input, when known.
    pub sed_name: Option<String>,
    /// Epoch key → computed ephemeris. Entries are added or overwritten,
    /// never removed.
    pub ephemerides: HashMap<String, Ephemeris>,
}

impl MovingObject {
    pub fn new(objid: i64, orbit: CometaryElements, mag_hv: Magnitude, phase_gv: f64) -> Self {
        MovingObject {
            objid,
            orbit,
            mag_hv,
            phase_gv,
            sed_name: None,
            ephemerides: HashMap::new(),
        }
    }

    pub fn with_sed_name(mut self, sed_name: &str) -> Self {
        self.sed_name = Some(sed_name.to_owned());
        self
    }

    /// The stored ephemeris at an MJD(TAI) epoch, if one has been computed.
    pub fn ephemeris_at(&self, mjd_tai: MJD) -> Option<&Ephemeris> {
        self.ephemerides.get(&epoch_key(mjd_tai))
    }

    /// The stored ephemeris at an epoch, or a precondition error naming the
    /// object and epoch.
    pub fn require_ephemeris(&self, mjd_tai: MJD) -> Result<&Ephemeris, SkycatError> {
        self.ephemeris_at(mjd_tai).ok_or_else(|| {
            SkycatError::Precondition(format!(
                "object {} has no ephemeris at MJD {}",
                self.objid,
                epoch_key(mjd_tai)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn orbit() -> CometaryElements {
        CometaryElements {
            q: 2.5,
            e: 0.1,
            incl: 5.0,
            node: 100.0,
            arg_peri: 40.0,
            t_peri: 51500.0,
            epoch: 52000.0,
            timescale: Timescale::Tai,
        }
    }

    #[test]
    fn epoch_key_is_stable_under_float_noise() {
        assert_eq!(epoch_key(52000.0), "52000.000000");
        assert_eq!(epoch_key(52000.0 + 1e-7), epoch_key(52000.0));
        assert_ne!(epoch_key(52000.0 + 1e-5), epoch_key(52000.0));
    }

    #[test]
    fn timescale_codes_round_trip() {
        for scale in [Timescale::Utc, Timescale::Ut1, Timescale::Tt, Timescale::Tai] {
            assert_eq!(Timescale::from_code(scale.code() as i32).unwrap(), scale);
        }
        assert!(matches!(
            Timescale::from_code(7),
            Err(SkycatError::InvalidTimescale(7))
        ));
    }

    #[test]
    fn utc_epoch_converts_through_leap_seconds() {
        // TAI leads UTC by 37 s from 2017 onwards.
        let tai = EpochSpec::utc(59000.0).to_mjd_tai().unwrap();
        assert_relative_eq!((tai - 59000.0) * 86400.0, 37.0, epsilon = 1e-6);
    }

    #[test]
    fn ut1_epoch_conversion_is_unsupported() {
        let spec = EpochSpec {
            mjd: 59000.0,
            scale: Timescale::Ut1,
        };
        assert!(matches!(
            spec.to_mjd_tai(),
            Err(SkycatError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn zero_radius_field_of_view_contains_exact_position() {
        let eph = Ephemeris::new(52000.0, 30.0, 10.0, 20.0, 1.5, 0.0, 0.0);
        assert!(eph.is_in_field_of_view(30.0, 10.0, 0.0));
        assert!(!eph.is_in_field_of_view(210.0, -10.0, 20.0));
    }

    #[test]
    fn ephemeris_lookup_goes_through_canonical_key() {
        let mut obj = MovingObject::new(7, orbit(), 12.0, 0.15);
        obj.ephemerides.insert(
            epoch_key(52000.0),
            Ephemeris::new(52000.0, 30.0, 10.0, 20.0, 1.5, 0.0, 0.0),
        );
        assert!(obj.ephemeris_at(52000.0 + 1e-8).is_some());
        assert!(matches!(
            obj.require_ephemeris(52010.0),
            Err(SkycatError::Precondition(_))
        ));
    }
}
