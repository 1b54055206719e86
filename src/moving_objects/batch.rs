//! # Batch ephemeris generation and set-level filters
//!
//! [`MovingObjectSet`] aggregates moving objects so that ephemerides for the
//! whole set can be computed with **one** call into the external engine,
//! instead of one call per orbit. The set also hosts the operations that are
//! better expressed over the aggregate than over individual objects:
//! field-of-view membership and the signal-to-noise cut, both of which return
//! a new, independent set and leave the input membership untouched.

use tracing::warn;

use crate::constants::{Degree, Magnitude, MJD, RADEG};
use crate::moving_objects::engine::{
    build_epoch_matrix, build_orbit_matrix, ensure_initialized, EphemerisEngine,
};
use crate::moving_objects::{epoch_key, Ephemeris, EpochSpec, MovingObject};
use crate::skycat_errors::SkycatError;

/// Per-epoch magnitudes and errors produced by the caller's photometry.
///
/// See [`MovingObjectSet::assign_magnitudes`]. The filter and simulation
/// magnitudes are required by the downstream output formats; the error terms
/// only by the difference-imaging one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeAssignment {
    pub mag_filter: Magnitude,
    pub mag_imsim: Magnitude,
    pub ast_err: Option<f64>,
    pub mag_err: Option<f64>,
}

/// A collection of moving objects processed as one ephemeris batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovingObjectSet {
    objects: Vec<MovingObject>,
}

impl MovingObjectSet {
    pub fn new(objects: Vec<MovingObject>) -> Self {
        MovingObjectSet { objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[MovingObject] {
        &self.objects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MovingObject> {
        self.objects.iter()
    }

    /// Absorb another set's objects.
    pub fn extend(&mut self, other: MovingObjectSet) {
        self.objects.extend(other.objects);
    }

    pub fn into_inner(self) -> Vec<MovingObject> {
        self.objects
    }

    /// Compute ephemerides for every object at every epoch with a single
    /// external batch call.
    ///
    /// The orbits are flattened into one row-major matrix, the epochs
    /// (converted to MJD TAI) into a parallel matrix, and the engine is
    /// invoked exactly once per call. Each result cell is distributed back
    /// onto its object's ephemeris map under the canonical epoch key,
    /// overwriting any prior entry for that epoch. The reported RA sky rate
    /// is converted to the true RA rate by dividing through `cos(dec)`.
    ///
    /// Errors
    /// ----------
    /// * [`SkycatError::ExternalCall`] when the engine reports a non-zero
    ///   status; the whole batch is discarded and no object is modified.
    /// * [`SkycatError::Precondition`] when the returned grid does not match
    ///   the submitted shape.
    pub fn generate_ephemerides<E: EphemerisEngine + ?Sized>(
        &mut self,
        engine: &E,
        epochs: &[EpochSpec],
        obscode: u16,
    ) -> Result<(), SkycatError> {
        if self.objects.is_empty() || epochs.is_empty() {
            return Ok(());
        }
        ensure_initialized(engine)?;

        let orbits = build_orbit_matrix(&self.objects);
        let (epoch_matrix, tai) = build_epoch_matrix(epochs)?;
        let keys: Vec<String> = tai.iter().map(|mjd| epoch_key(*mjd)).collect();

        let grid = engine.batch_ephemerides(&orbits, obscode, &epoch_matrix)?;
        if grid.n_objects() != self.objects.len() || grid.n_epochs() != epochs.len() {
            return Err(SkycatError::Precondition(format!(
                "engine returned a {}x{} grid for a {}x{} batch",
                grid.n_objects(),
                grid.n_epochs(),
                self.objects.len(),
                epochs.len()
            )));
        }

        for (i, obj) in self.objects.iter_mut().enumerate() {
            for (j, key) in keys.iter().enumerate() {
                let eph = grid.at(i, j);
                let dec = eph[2];
                let dradt = eph[6] / (dec * RADEG).cos();
                obj.ephemerides.insert(
                    key.clone(),
                    Ephemeris::new(tai[j], eph[1], dec, eph[3], eph[0], dradt, eph[7]),
                );
            }
        }
        Ok(())
    }

    /// Keep the objects whose ephemeris at `mjd_tai` falls inside a circular
    /// field of view.
    ///
    /// Objects missing an ephemeris at that epoch get one computed on
    /// demand, one engine call per object; this is intentionally supported
    /// but warned about, because batching the whole set beforehand is much
    /// cheaper. Returns a new, independent set; the input membership is not
    /// mutated (on-demand ephemerides are stored, membership is not
    /// touched).
    pub fn in_field_of_view<E: EphemerisEngine + ?Sized>(
        &mut self,
        engine: &E,
        ra: Degree,
        dec: Degree,
        radius: Degree,
        mjd_tai: MJD,
        obscode: u16,
    ) -> Result<MovingObjectSet, SkycatError> {
        let key = epoch_key(mjd_tai);
        let mut kept = Vec::new();
        for obj in &mut self.objects {
            if !obj.ephemerides.contains_key(&key) {
                warn!(
                    objid = obj.objid,
                    mjd = %key,
                    "no ephemeris at this epoch; computing a single-object batch"
                );
                compute_single(obj, engine, mjd_tai, obscode)?;
            }
            let eph = obj.require_ephemeris(mjd_tai)?;
            if eph.is_in_field_of_view(ra, dec, radius) {
                kept.push(obj.clone());
            }
        }
        Ok(MovingObjectSet::new(kept))
    }

    /// Keep the objects brighter than a signal-to-noise threshold.
    ///
    /// The SNR cutoff converts to a magnitude threshold as
    /// `limiting_mag − 2.5·log10(snr_cutoff / 5)`; an object survives when
    /// its stored filter magnitude at `mjd_tai` is numerically smaller.
    ///
    /// Errors
    /// ----------
    /// * [`SkycatError::Precondition`] when any object lacks an ephemeris or
    ///   a filter magnitude at that epoch.
    pub fn cut_by_snr(
        &self,
        limiting_mag: Magnitude,
        snr_cutoff: f64,
        mjd_tai: MJD,
    ) -> Result<MovingObjectSet, SkycatError> {
        let mag_threshold = limiting_mag - 2.5 * (snr_cutoff / 5.0).log10();
        let mut kept = Vec::new();
        for obj in &self.objects {
            let eph = obj.require_ephemeris(mjd_tai)?;
            let mag_filter = eph.mag_filter.ok_or_else(|| {
                SkycatError::Precondition(format!(
                    "object {} has an ephemeris at MJD {} but no filter magnitude",
                    obj.objid,
                    epoch_key(mjd_tai)
                ))
            })?;
            if mag_filter < mag_threshold {
                kept.push(obj.clone());
            }
        }
        Ok(MovingObjectSet::new(kept))
    }

    /// Attach per-filter magnitudes and error terms to the stored
    /// ephemerides at one epoch.
    ///
    /// Photometry itself lives outside this crate; the closure receives each
    /// object and its ephemeris (for `mag_v`, distance, …) and returns the
    /// magnitudes to store. Fails when any object lacks an ephemeris at the
    /// epoch.
    pub fn assign_magnitudes<F>(&mut self, mjd_tai: MJD, photometry: F) -> Result<(), SkycatError>
    where
        F: Fn(&MovingObject, &Ephemeris) -> MagnitudeAssignment,
    {
        let key = epoch_key(mjd_tai);
        for obj in &mut self.objects {
            let snapshot = obj
                .ephemerides
                .get(&key)
                .cloned()
                .ok_or_else(|| {
                    SkycatError::Precondition(format!(
                        "object {} has no ephemeris at MJD {key}",
                        obj.objid
                    ))
                })?;
            let assignment = photometry(obj, &snapshot);
            if let Some(eph) = obj.ephemerides.get_mut(&key) {
                eph.mag_filter = Some(assignment.mag_filter);
                eph.mag_imsim = Some(assignment.mag_imsim);
                eph.ast_err = assignment.ast_err;
                eph.mag_err = assignment.mag_err;
            }
        }
        Ok(())
    }
}

impl From<Vec<MovingObject>> for MovingObjectSet {
    fn from(objects: Vec<MovingObject>) -> Self {
        MovingObjectSet::new(objects)
    }
}

impl IntoIterator for MovingObjectSet {
    type Item = MovingObject;
    type IntoIter = std::vec::IntoIter<MovingObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

/// One-object, one-epoch engine call backing the on-demand path of
/// [`MovingObjectSet::in_field_of_view`].
fn compute_single<E: EphemerisEngine + ?Sized>(
    obj: &mut MovingObject,
    engine: &E,
    mjd_tai: MJD,
    obscode: u16,
) -> Result<(), SkycatError> {
    ensure_initialized(engine)?;
    let orbits = build_orbit_matrix(std::slice::from_ref(obj));
    let (epoch_matrix, tai) = build_epoch_matrix(&[EpochSpec::tai(mjd_tai)])?;
    let grid = engine.batch_ephemerides(&orbits, obscode, &epoch_matrix)?;
    if grid.n_objects() != 1 || grid.n_epochs() != 1 {
        return Err(SkycatError::Precondition(format!(
            "engine returned a {}x{} grid for a single-object batch",
            grid.n_objects(),
            grid.n_epochs()
        )));
    }
    let eph = grid.at(0, 0);
    let dec = eph[2];
    let dradt = eph[6] / (dec * RADEG).cos();
    obj.ephemerides.insert(
        epoch_key(tai[0]),
        Ephemeris::new(tai[0], eph[1], dec, eph[3], eph[0], dradt, eph[7]),
    );
    Ok(())
}
