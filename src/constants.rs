//! # Constants and type definitions for skycat
//!
//! This module centralizes the **unit conversions** and **common type aliases**
//! used throughout the `skycat` library.
//!
//! ## Overview
//!
//! - Angle conversions (degrees ↔ radians)
//! - Core type aliases used across the crate
//! - Default identifiers for the ephemeris boundary
//!
//! These definitions are used by the catalog query layer, the constraint
//! builder, and the moving-object batch processor.

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Full RA circle, in degrees
pub const RA_CIRCLE: f64 = 360.0;

// -------------------------------------------------------------------------------------------------
// Ephemeris boundary defaults
// -------------------------------------------------------------------------------------------------

/// Default MPC observatory code handed to the ephemeris engine
pub const DEFAULT_OBSCODE: u16 = 807;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;

/// Angle in radians
pub type Radian = f64;

/// Modified Julian Date
pub type MJD = f64;

/// Astronomical magnitude
pub type Magnitude = f64;
