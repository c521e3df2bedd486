//! CSV re-serialization for the presentation layer's download surface.

use crate::error::Result;
use polars::prelude::*;

/// Serialize any frame as UTF-8 CSV: comma-delimited, header row, no
/// index column.
pub fn to_csv(df: &DataFrame) -> Result<String> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df.clone())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
