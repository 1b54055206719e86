//! # Ephemeris engine boundary and flat array marshalling
//!
//! The external orbit-propagation library is reached through the
//! [`EphemerisEngine`] trait: one process-wide initialization, then a single
//! batch request/response call per
//! [`MovingObjectSet::generate_ephemerides`](crate::moving_objects::batch::MovingObjectSet::generate_ephemerides)
//! invocation. The library works on flat numeric arrays, so this module owns
//! the layout contract:
//!
//! - **Orbit matrix** (`n_objects × 12`, row-major): object id, the six
//!   cometary elements with angles in **radians**, the element-type code
//!   (2 = cometary), the element epoch, its timescale code, and the H/G
//!   photometric parameters.
//! - **Epoch matrix** (`n_epochs × 2`): MJD(TAI) and the TAI timescale code.
//! - **Result grid** (`n_objects × n_epochs × 8`): distance, RA, Dec,
//!   magnitude, ephemeris MJD, its timescale code, and the two sky rates.
//!
//! A non-zero status from the library maps to
//! [`SkycatError::ExternalCall`]; the whole batch is discarded, there is no
//! partial-result recovery.

use nalgebra::DMatrix;
use once_cell::sync::OnceCell;

use crate::constants::RADEG;
use crate::moving_objects::{EpochSpec, MovingObject, Timescale};
use crate::skycat_errors::SkycatError;

/// Columns of one orbit row in the flat matrix.
pub const ORBIT_FIELDS: usize = 12;

/// Fields of one (object, epoch) cell in the result grid.
pub const EPHEM_FIELDS: usize = 8;

/// Element-type code for cometary elements in the orbit matrix.
pub const COMETARY_ELEMENT_TYPE: f64 = 2.0;

/// Boundary to the external batch ephemeris library.
///
/// Implementations wrap the actual propagator; the crate itself only
/// guarantees the marshalling contract above. `initialize` is routed through
/// [`ensure_initialized`] so it runs exactly once per process no matter how
/// many batches are submitted.
pub trait EphemerisEngine {
    /// One-time process-wide setup (e.g. loading planetary ephemerides).
    fn initialize(&self) -> Result<(), SkycatError>;

    /// One batch request: ephemerides for every orbit at every epoch.
    ///
    /// A non-zero library status must surface as
    /// [`SkycatError::ExternalCall`]; partial results are never returned.
    fn batch_ephemerides(
        &self,
        orbits: &DMatrix<f64>,
        obscode: u16,
        epochs: &DMatrix<f64>,
    ) -> Result<EphemerisGrid, SkycatError>;
}

static ENGINE_READY: OnceCell<()> = OnceCell::new();

/// Run the engine's one-time initialization, exactly once per process.
///
/// Initialization failure is not latched: a later call retries.
pub fn ensure_initialized<E: EphemerisEngine + ?Sized>(engine: &E) -> Result<(), SkycatError> {
    ENGINE_READY.get_or_try_init(|| engine.initialize())?;
    Ok(())
}

/// The `[object][epoch][field]` result of one batch call, stored flat.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisGrid {
    n_objects: usize,
    n_epochs: usize,
    data: Vec<f64>,
}

impl EphemerisGrid {
    /// Wrap a flat result buffer, checking its length against the declared
    /// shape.
    pub fn new(n_objects: usize, n_epochs: usize, data: Vec<f64>) -> Result<Self, SkycatError> {
        let expected = n_objects * n_epochs * EPHEM_FIELDS;
        if data.len() != expected {
            return Err(SkycatError::Precondition(format!(
                "ephemeris grid length {} does not match shape {}x{}x{}",
                data.len(),
                n_objects,
                n_epochs,
                EPHEM_FIELDS
            )));
        }
        Ok(EphemerisGrid {
            n_objects,
            n_epochs,
            data,
        })
    }

    pub fn n_objects(&self) -> usize {
        self.n_objects
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    /// The 8 ephemeris fields for one (object, epoch) pair.
    pub fn at(&self, object: usize, epoch: usize) -> &[f64] {
        let start = (object * self.n_epochs + epoch) * EPHEM_FIELDS;
        &self.data[start..start + EPHEM_FIELDS]
    }
}

/// Flatten the objects' orbits into the engine's row-major orbit matrix.
///
/// Angles convert from degrees to radians here; everything else passes
/// through unchanged.
pub fn build_orbit_matrix(objects: &[MovingObject]) -> DMatrix<f64> {
    let mut flat = Vec::with_capacity(objects.len() * ORBIT_FIELDS);
    for obj in objects {
        let elements = &obj.orbit;
        flat.extend_from_slice(&[
            obj.objid as f64,
            elements.q,
            elements.e,
            elements.incl * RADEG,
            elements.node * RADEG,
            elements.arg_peri * RADEG,
            elements.t_peri,
            COMETARY_ELEMENT_TYPE,
            elements.epoch,
            elements.timescale.code(),
            obj.mag_hv,
            obj.phase_gv,
        ]);
    }
    DMatrix::from_row_slice(objects.len(), ORBIT_FIELDS, &flat)
}

/// Flatten an epoch list into the engine's `(mjd, timescale code)` matrix.
///
/// Every epoch is converted to MJD(TAI) first; the returned TAI values are
/// also what the per-object ephemeris keys are derived from.
pub fn build_epoch_matrix(epochs: &[EpochSpec]) -> Result<(DMatrix<f64>, Vec<f64>), SkycatError> {
    let mut tai = Vec::with_capacity(epochs.len());
    for spec in epochs {
        tai.push(spec.to_mjd_tai()?);
    }
    let mut flat = Vec::with_capacity(epochs.len() * 2);
    for mjd in &tai {
        flat.push(*mjd);
        flat.push(Timescale::Tai.code());
    }
    Ok((DMatrix::from_row_slice(epochs.len(), 2, &flat), tai))
}
