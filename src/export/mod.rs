//! Post-processing of exported tables
//!
//! Signal files are tab-separated with a header row. The first two data rows
//! carry label/tag values in the frame column and are never converted.

pub mod rois;

use crate::core::error::ExportError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Column rewritten by [`frames_to_time`]
pub const FRAME_COLUMN: &str = "frame";

/// Replacement header for the converted column
pub const TIME_COLUMN: &str = "time";

/// Leading data rows whose frame value is a tag, not a number
pub const TAG_ROWS: usize = 2;

/// Fractional digits kept when writing converted times
///
/// `frame * seconds_per_frame` carries float noise (`3 * 1.28` is
/// `3.8400000000000003`), so times are rounded to this many decimals and
/// trailing zeros are dropped. Finer resolution than this is not preserved.
pub const TIME_DECIMALS: usize = 10;

/// Rewrite the `frame` column of a signal file as `time = frame * seconds_per_frame`
///
/// Only the header cell and the numeric rows are re-encoded. Tag rows (and
/// rows too short to have a frame cell) are copied byte for byte. The file
/// is replaced atomically. Returns the number of converted rows.
pub fn frames_to_time(path: &Path, seconds_per_frame: f64) -> Result<usize, ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let missing_column = || ExportError::MissingColumn {
        path: path.to_path_buf(),
        column: FRAME_COLUMN.to_string(),
    };

    let content = fs::read(path).map_err(io_error)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_slice());

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(missing_column());
    }
    let column = record
        .iter()
        .position(|name| name == FRAME_COLUMN)
        .ok_or_else(missing_column)?;
    let header = replace_field(&record, column, TIME_COLUMN);

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    let file = temp.as_file();
    let mut raw_out = file;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(file);
    writer.write_record(&header)?;

    let mut converted = 0usize;
    let mut row = 0usize;
    loop {
        let start = reader.position().byte() as usize;
        if !reader.read_record(&mut record)? {
            break;
        }
        let end = reader.position().byte() as usize;

        if row < TAG_ROWS || record.get(column).is_none() {
            writer.flush().map_err(io_error)?;
            let raw = &content[start..end.min(content.len())];
            raw_out.write_all(raw).map_err(io_error)?;
            if !raw.ends_with(b"\n") {
                raw_out.write_all(b"\n").map_err(io_error)?;
            }
            row += 1;
            continue;
        }

        let raw = record.get(column).unwrap_or_default().trim();
        let frame: f64 = raw.parse().map_err(|_| ExportError::NotNumeric {
            row,
            value: raw.to_string(),
        })?;
        let time = format_time(frame * seconds_per_frame);
        writer.write_record(&replace_field(&record, column, &time))?;
        converted += 1;
        row += 1;
    }

    writer.flush().map_err(io_error)?;
    drop(writer);
    temp.persist(path).map_err(|e| io_error(e.error))?;

    debug!("Converted {} frame values to time in {}", converted, path.display());
    Ok(converted)
}

fn replace_field(record: &csv::StringRecord, index: usize, value: &str) -> csv::StringRecord {
    record
        .iter()
        .enumerate()
        .map(|(i, field)| if i == index { value } else { field })
        .collect()
}

/// Round to [`TIME_DECIMALS`] with trailing zeros trimmed, so 2.56 stays `2.56`
fn format_time(value: f64) -> String {
    let text = format!("{:.*}", TIME_DECIMALS, value);
    let text = text.trim_end_matches('0');
    text.strip_suffix('.').unwrap_or(text).to_string()
}
