use super::record::{AnnotationRecord, AnnotationSet};
use crate::shared::constants::ANNOTATION_COLUMNS;
use crate::shared::error::{Error, Result};
use crate::utils::file_utils;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads an annotation file. Unreadable files are `SourceUnavailable`;
/// malformed rows are `Validation` errors naming the line.
pub fn read_file(path: &Path) -> Result<AnnotationSet> {
    let file = File::open(path).map_err(|e| Error::source_unavailable(path, e))?;
    read_from(file).map_err(|e| match e {
        Error::Io(io) => Error::source_unavailable(path, io),
        other => other,
    })
}

pub fn read_from<R: Read>(reader: R) -> Result<AnnotationSet> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    for column in &ANNOTATION_COLUMNS[..3] {
        if !headers.iter().any(|h| h == *column) {
            return Err(Error::Validation(format!("missing column '{column}'")));
        }
    }

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<AnnotationRecord>() {
        let record = row.map_err(csv_error)?;
        record.validate()?;
        records.push(record);
    }

    Ok(AnnotationSet::from_records(records))
}

fn csv_error(e: csv::Error) -> Error {
    let line = e.position().map(|p| p.line());
    match e.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io(io),
        kind => {
            let detail = match kind {
                csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
                other => format!("{other:?}"),
            };
            match line {
                Some(line) => Error::Validation(format!("line {line}: {detail}")),
                None => Error::Validation(detail),
            }
        }
    }
}

/// Header row first, then one row per record in frame order. An empty set
/// still gets its header.
pub fn to_bytes(set: &AnnotationSet) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(ANNOTATION_COLUMNS).map_err(csv_error)?;
    for record in set.iter() {
        writer.serialize(record).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}

pub fn write_file(path: &Path, set: &AnnotationSet) -> Result<()> {
    let bytes = to_bytes(set)?;
    file_utils::write_atomic(path, &bytes)?;
    Ok(())
}
