//! ESRI ASCII grid reader and writer.
//!
//! # Format
//!
//! ```text
//! ncols         4
//! nrows         2
//! xllcorner     500000.0
//! yllcorner     4100000.0
//! cellsize      30.0
//! NODATA_value  -9999
//! 1.5 2 -9999 4
//! 5 6 7 8
//! ```
//!
//! Header keys are case-insensitive.  `xllcenter`/`yllcenter` are accepted
//! in place of the corner keys.  `NODATA_value` is optional on input and
//! always written on output: [`NODATA_VALUE`], or the next lower whole
//! number that no cell holds.  Rows run top to bottom.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sa_core::{GridSpec, Raster};

use crate::{StoreError, StoreResult};

/// Preferred no-data marker for output grids.
pub const NODATA_VALUE: f64 = -9999.0;

const WHAT: &str = "ASCII grid";

// ── Reading ───────────────────────────────────────────────────────────────────

pub fn read_asc(path: &Path) -> StoreResult<Raster> {
    read_asc_reader(BufReader::new(File::open(path)?))
}

/// Like [`read_asc`] but accepts any buffered source.
pub fn read_asc_reader<R: BufRead>(reader: R) -> StoreResult<Raster> {
    let mut ncols: Option<u32> = None;
    let mut nrows: Option<u32> = None;
    let mut x: Option<(f64, bool)> = None; // (value, is_center)
    let mut y: Option<(f64, bool)> = None;
    let mut cell_size: Option<f64> = None;
    let mut nodata: Option<f64> = None;
    let mut values: Vec<Option<f64>> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_whitespace().peekable();
        let Some(&first) = tokens.peek() else { continue };

        if values.is_empty() && first.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let key = first.to_ascii_lowercase();
            tokens.next();
            let raw = tokens
                .next()
                .ok_or_else(|| StoreError::format(WHAT, format!("header {first} has no value")))?;
            match key.as_str() {
                "ncols" => ncols = Some(parse_num(raw)?),
                "nrows" => nrows = Some(parse_num(raw)?),
                "xllcorner" => x = Some((parse_num(raw)?, false)),
                "xllcenter" => x = Some((parse_num(raw)?, true)),
                "yllcorner" => y = Some((parse_num(raw)?, false)),
                "yllcenter" => y = Some((parse_num(raw)?, true)),
                "cellsize" => cell_size = Some(parse_num(raw)?),
                "nodata_value" => nodata = Some(parse_num(raw)?),
                _ => return Err(StoreError::format(WHAT, format!("unknown header {first}"))),
            }
            continue;
        }

        for tok in tokens {
            let v: f64 = parse_num(tok)?;
            values.push(if Some(v) == nodata { None } else { Some(v) });
        }
    }

    let missing = |k: &str| StoreError::format(WHAT, format!("missing header {k}"));
    let ncols = ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing("nrows"))?;
    let cell_size = cell_size.ok_or_else(|| missing("cellsize"))?;
    let (x, x_center) = x.ok_or_else(|| missing("xllcorner"))?;
    let (y, y_center) = y.ok_or_else(|| missing("yllcorner"))?;
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(StoreError::format(WHAT, format!("cellsize must be positive, got {cell_size}")));
    }

    let half = cell_size / 2.0;
    let spec = GridSpec::new(
        ncols,
        nrows,
        if x_center { x - half } else { x },
        if y_center { y - half } else { y },
        cell_size,
    );
    if values.len() != spec.cell_count() {
        return Err(StoreError::format(
            WHAT,
            format!("expected {} values for {ncols}x{nrows}, found {}", spec.cell_count(), values.len()),
        ));
    }
    Ok(Raster::from_values(spec, values)?)
}

fn parse_num<T: std::str::FromStr>(raw: &str) -> StoreResult<T> {
    raw.parse::<T>()
        .map_err(|_| StoreError::format(WHAT, format!("invalid number {raw:?}")))
}

// ── Writing ───────────────────────────────────────────────────────────────────

pub fn write_asc(path: &Path, raster: &Raster) -> StoreResult<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_asc_writer(&mut w, raster)?;
    w.flush()?;
    Ok(())
}

/// Like [`write_asc`] but accepts any sink.
///
/// Values are written in Rust's shortest round-trip form, so reading the
/// grid back yields bit-identical cells.
pub fn write_asc_writer<W: Write>(w: &mut W, raster: &Raster) -> StoreResult<()> {
    let s = raster.spec();
    writeln!(w, "ncols         {}", s.ncols)?;
    writeln!(w, "nrows         {}", s.nrows)?;
    writeln!(w, "xllcorner     {}", s.xll)?;
    writeln!(w, "yllcorner     {}", s.yll)?;
    writeln!(w, "cellsize      {}", s.cell_size)?;
    let nodata = nodata_for(raster);
    writeln!(w, "NODATA_value  {nodata}")?;

    let ncols = s.ncols as usize;
    let mut line = String::new();
    for (i, v) in raster.values().enumerate() {
        if i % ncols != 0 {
            line.push(' ');
        }
        match v {
            Some(v) => line.push_str(&v.to_string()),
            None => line.push_str(&nodata.to_string()),
        }
        if (i + 1) % ncols == 0 {
            writeln!(w, "{line}")?;
            line.clear();
        }
    }
    Ok(())
}

/// A no-data marker that does not collide with any defined cell.
fn nodata_for(raster: &Raster) -> f64 {
    let mut nodata = NODATA_VALUE;
    while raster.values().flatten().any(|v| v == nodata) {
        nodata -= 1.0;
    }
    nodata
}
