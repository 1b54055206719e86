//! Shared fixtures for the integration tests: seeded random star tables and
//! registry/source helpers.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};

use skycat::bounds::{angular_separation, BoxBound, CircularBound};
use skycat::catalog::query::CatalogSource;
use skycat::catalog::registry::CatalogRegistry;
use skycat::constants::{Degree, RADEG};

/// One physical row of the `stars` fixture table.
#[derive(Debug, Clone, PartialEq)]
pub struct StarRow {
    pub simobjid: i64,
    pub ra: Degree,
    pub decl: Degree,
    pub umag: f64,
    pub gmag: f64,
    pub rmag: f64,
    pub imag: f64,
    pub zmag: f64,
    pub sedfilename: String,
}

/// Stars scattered uniformly over the sky with a fixed seed.
pub fn uniform_stars(n: usize, seed: u64) -> Vec<StarRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n as i64)
        .map(|simobjid| {
            // Uniform on the sphere: RA uniform, sin(Dec) uniform.
            let ra = rng.gen_range(0.0..360.0);
            let decl = rng.gen_range(-1.0f64..1.0).asin() / RADEG;
            StarRow {
                simobjid,
                ra,
                decl,
                umag: rng.gen_range(10.0..14.0),
                gmag: rng.gen_range(10.0..14.0),
                rmag: rng.gen_range(10.0..14.0),
                imag: rng.gen_range(10.0..14.0),
                zmag: rng.gen_range(10.0..14.0),
                sedfilename: format!("star_km10_{simobjid}.sed"),
            }
        })
        .collect()
}

/// Angular separation of a star row from a pointing center, in degrees.
pub fn separation_deg(row: &StarRow, ra: Degree, dec: Degree) -> Degree {
    angular_separation(row.ra * RADEG, row.decl * RADEG, ra * RADEG, dec * RADEG) / RADEG
}

/// Stars for exercising a circular bound, with the ambiguity band around the
/// bound's edge removed.
///
/// A circular bound is executed as its enclosing RA/Dec box, so stars close
/// to the nominal radius can land on either side depending on where the box
/// edge cuts the sky. The fixture keeps a star only when its membership is
/// unambiguous for both shapes: well inside the circle and inside the box,
/// or well outside the circle and outside the box.
pub fn circle_fixture(
    n: usize,
    seed: u64,
    center_ra: Degree,
    center_dec: Degree,
    radius: Degree,
) -> Vec<StarRow> {
    let bb = BoxBound::from_circle(&CircularBound {
        ra: center_ra,
        dec: center_dec,
        radius,
    });
    let inner = radius * 0.75;
    let outer = radius * 1.25;
    uniform_stars(n, seed)
        .into_iter()
        .filter(|row| {
            let in_box = row.ra >= bb.ra_min
                && row.ra <= bb.ra_max
                && row.decl >= bb.dec_min
                && row.decl <= bb.dec_max;
            let sep = separation_deg(row, center_ra, center_dec);
            (in_box && sep < inner) || (!in_box && sep > outer)
        })
        .collect()
}

/// Create the `stars` table and load the rows.
pub fn load_star_table(conn: &Connection, rows: &[StarRow]) {
    conn.execute_batch(
        "CREATE TABLE stars (
            simobjid INTEGER PRIMARY KEY,
            ra REAL NOT NULL,
            decl REAL NOT NULL,
            umag REAL,
            gmag REAL,
            rmag REAL,
            imag REAL,
            zmag REAL,
            sedfilename TEXT
        );",
    )
    .expect("create stars table");
    let tx = conn.unchecked_transaction().expect("begin transaction");
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO stars (simobjid, ra, decl, umag, gmag, rmag, imag, zmag, sedfilename)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .expect("prepare insert");
        for row in rows {
            insert
                .execute(params![
                    row.simobjid,
                    row.ra,
                    row.decl,
                    row.umag,
                    row.gmag,
                    row.rmag,
                    row.imag,
                    row.zmag,
                    row.sedfilename,
                ])
                .expect("insert star row");
        }
    }
    tx.commit().expect("commit fixture rows");
}

/// One physical row of the `output_pointings` fixture table. Observing
/// conditions beyond the field center are filled with fixed values.
#[derive(Debug, Clone, PartialEq)]
pub struct PointingRow {
    pub obshistid: i64,
    pub fieldra: Degree,
    pub fielddec: Degree,
    pub expmjd: f64,
}

/// Create the `output_pointings` table and load the rows.
pub fn load_pointing_table(conn: &Connection, rows: &[PointingRow]) {
    conn.execute_batch(
        "CREATE TABLE output_pointings (
            obshistid INTEGER,
            expdate INTEGER,
            fieldra REAL,
            fielddec REAL,
            rotskypos REAL,
            filter TEXT,
            rawseeing REAL,
            expmjd REAL,
            altitude REAL,
            azimuth REAL
        );",
    )
    .expect("create pointings table");
    let mut insert = conn
        .prepare(
            "INSERT INTO output_pointings
             VALUES (?1, ?2, ?3, ?4, 0.0, 'r', 0.7, ?5, 60.0, 120.0)",
        )
        .expect("prepare pointing insert");
    for row in rows {
        insert
            .execute(params![
                row.obshistid,
                row.obshistid / 100,
                row.fieldra,
                row.fielddec,
                row.expmjd,
            ])
            .expect("insert pointing row");
    }
}

/// An in-memory pointing-metadata source over the given rows.
pub fn pointing_source(rows: &[PointingRow]) -> CatalogSource {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    load_pointing_table(&conn, rows);
    let registry = CatalogRegistry::builtin();
    CatalogSource::with_connection(conn, registry.lookup("pointings"))
        .expect("pointing definition validates")
}

/// An in-memory star catalog source over the given rows.
pub fn star_source(rows: &[StarRow]) -> CatalogSource {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    load_star_table(&conn, rows);
    let registry = CatalogRegistry::builtin();
    CatalogSource::with_connection(conn, registry.lookup("msstars"))
        .expect("star definition validates")
}

/// The ids of a query result, read from its first column.
pub fn result_ids(rows: &[Vec<skycat::catalog::query::CatalogValue>]) -> Vec<i64> {
    rows.iter()
        .map(|row| row[0].as_i64().expect("integer id column"))
        .collect()
}
