//! Tab-separated record input for the CLI.
//!
//! Each file holds one record per line, `record_id<TAB>name`, after a header
//! row. A line without a name column yields a record with no name; an empty
//! column yields an empty name. Both are filtered by `unique_names`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ingest::RawNameRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input {0:?} is not of the form SOURCE=PATH")]
    BadSpec(String),

    #[error("failed to read {path}: {error}")]
    Read {
        path: String,
        #[source]
        error: csv::Error,
    },
}

/// One `--input SOURCE=PATH` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub source: String,
    pub path: PathBuf,
}

impl FromStr for InputSpec {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((source, path)) if !source.trim().is_empty() && !path.is_empty() => {
                Ok(InputSpec {
                    source: source.trim().to_string(),
                    path: PathBuf::from(path),
                })
            }
            _ => Err(InputError::BadSpec(s.to_string())),
        }
    }
}

impl InputSpec {
    pub fn read(&self) -> Result<Vec<RawNameRecord>, InputError> {
        let reader = tsv_builder()
            .from_path(&self.path)
            .map_err(|error| read_error(&self.path, error))?;
        collect_records(&self.source, reader, &self.path)
    }
}

/// Reads records for `source` from any reader.
pub fn read_records<R: Read>(source: &str, reader: R) -> Result<Vec<RawNameRecord>, InputError> {
    collect_records(source, tsv_builder().from_reader(reader), Path::new("<reader>"))
}

/// Reads every input in order.
pub fn read_inputs(inputs: &[InputSpec]) -> Result<Vec<RawNameRecord>, InputError> {
    let mut records = Vec::new();
    for input in inputs {
        records.extend(input.read()?);
    }
    Ok(records)
}

fn tsv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    // Names carry stray quotes ("ACME" INC); treat them as text.
    builder
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false);
    builder
}

fn collect_records<R: Read>(
    source: &str,
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<RawNameRecord>, InputError> {
    let mut out = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|error| read_error(path, error))?;
        let record_id = row.get(0).unwrap_or_default();
        let record = match row.get(1) {
            Some(name) => RawNameRecord::new(source, record_id, name),
            None => RawNameRecord::without_name(source, record_id),
        };
        out.push(record);
    }
    Ok(out)
}

fn read_error(path: &Path, error: csv::Error) -> InputError {
    InputError::Read {
        path: path.display().to_string(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn spec_parses_source_and_path() {
        let spec: InputSpec = "vendors=/data/vendors.tsv".parse().unwrap();
        assert_eq!(spec.source, "vendors");
        assert_eq!(spec.path, PathBuf::from("/data/vendors.tsv"));
    }

    #[test]
    fn spec_keeps_equals_in_path() {
        let spec: InputSpec = "a=dir/x=y.tsv".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("dir/x=y.tsv"));
    }

    #[test]
    fn spec_rejects_missing_parts() {
        for bad in ["vendors", "=file.tsv", "vendors=", " =x"] {
            assert!(matches!(
                bad.parse::<InputSpec>(),
                Err(InputError::BadSpec(_))
            ));
        }
    }

    #[test]
    fn reads_rows_after_header() {
        let data = "record_id\tname\n1\tAcme Corp\n2\t\n3\n4\t\"Zenith\" LLC\n";
        let records = read_records("docs", data.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                RawNameRecord::new("docs", "1", "Acme Corp"),
                RawNameRecord::new("docs", "2", ""),
                RawNameRecord::without_name("docs", "3"),
                RawNameRecord::new("docs", "4", "\"Zenith\" LLC"),
            ]
        );
    }

    #[test]
    fn reads_inputs_in_order() {
        let mut a = NamedTempFile::new().unwrap();
        writeln!(a, "id\tname\n1\tAcme").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        writeln!(b, "id\tname\n1\tZenith").unwrap();

        let inputs = vec![
            InputSpec {
                source: "a".into(),
                path: a.path().to_path_buf(),
            },
            InputSpec {
                source: "b".into(),
                path: b.path().to_path_buf(),
            },
        ];
        let records = read_inputs(&inputs).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "a");
        assert_eq!(records[1].name.as_deref(), Some("Zenith"));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let spec: InputSpec = "a=/nonexistent/firmclust/input.tsv".parse().unwrap();
        let err = spec.read().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/firmclust/input.tsv"));
    }
}
