//! Reading instance records from delimited text.
//!
//! The input needs a header row naming five columns, in any order and with any capitalization:
//!
//! | column   | accepted headers                 | type              |
//! |----------|----------------------------------|-------------------|
//! | feature  | `Feature`, `FeatureType`, `Type` | text              |
//! | instance | `Instance`, `InstanceID`, `Id`   | integer           |
//! | x        | `LocX`, `X`                      | finite number     |
//! | y        | `LocY`, `Y`                      | finite number     |
//! | aux      | `Checkin`, `Aux`                 | integer           |
//!
//! Other columns are allowed and ignored. Every record becomes one instance, blank lines are
//! skipped, and the first problem found rejects the whole input.

use crate::error::DataError;
use crate::store::{InstanceStore, InstanceStoreBuilder};
use csv_core::{ReadFieldResult, ReaderBuilder};
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::{self, FromStr};
use tracing::debug;

struct Column {
    name: &'static str,
    headers: &'static [&'static str],
}

const FEATURE: Column = Column {
    name: "feature",
    headers: &["Feature", "FeatureType", "Type"],
};
const INSTANCE: Column = Column {
    name: "instance",
    headers: &["Instance", "InstanceID", "Id"],
};
const X: Column = Column {
    name: "x",
    headers: &["LocX", "X"],
};
const Y: Column = Column {
    name: "y",
    headers: &["LocY", "Y"],
};
const AUX: Column = Column {
    name: "aux",
    headers: &["Checkin", "Aux"],
};

/// Reads instance records from `input`, with fields separated by `delimiter`.
///
/// Line numbers in errors count records, starting with the header as line 1.
///
/// ```
/// use colocation::load::read_instances;
///
/// let csv = "Feature,Instance,LocX,LocY,Checkin\nA,1,0.5,2,10\nB,1,1,2,0\n";
/// let store = read_instances(csv.as_bytes(), b',').unwrap();
/// assert_eq!(store.len(), 2);
/// assert_eq!(store.get(0).aux, 10);
/// ```
pub fn read_instances<R: io::Read>(mut input: R, delimiter: u8) -> Result<InstanceStore, DataError> {
    let mut inputbuf = [0; 16384];
    let mut fieldbuf = [0; 1024];
    let mut fieldlen = 0;
    let mut record = Record::default();
    let mut line = 1;
    let mut columns: Option<Columns> = None;
    let mut builder = InstanceStore::builder();
    let mut reader = ReaderBuilder::new().delimiter(delimiter).build();

    loop {
        let read = input.read(&mut inputbuf)?;
        let mut bytes = &inputbuf[..read];
        loop {
            let (result, nin, nout) = reader.read_field(bytes, &mut fieldbuf[fieldlen..]);
            bytes = &bytes[nin..];
            fieldlen += nout;
            match result {
                ReadFieldResult::InputEmpty => break,
                ReadFieldResult::OutputFull => return Err(DataError::FieldTooLong { line }),
                ReadFieldResult::Field { record_end } => {
                    let field = str::from_utf8(&fieldbuf[..fieldlen])
                        .map_err(|_| DataError::Utf8 { line })?;
                    record.push(field);
                    fieldlen = 0;

                    if record_end {
                        if !record.is_blank() {
                            if let Some(columns) = &columns {
                                columns.add(&mut builder, &record, line)?;
                            } else {
                                columns = Some(Columns::from_header(&record)?);
                            }
                        }
                        record.clear();
                        line += 1;
                    }
                }
                ReadFieldResult::End => {
                    if columns.is_none() {
                        return Err(DataError::MissingHeader);
                    }
                    debug!(records = builder.len(), "read instance records");
                    return builder.build();
                }
            }
        }
    }
}

/// Opens `path` and reads it with [`read_instances`].
pub fn read_instances_from_path(
    path: impl AsRef<Path>,
    delimiter: u8,
) -> Result<InstanceStore, DataError> {
    let file = File::open(path)?;
    read_instances(io::BufReader::new(file), delimiter)
}

/// The fields of one record, stored back to back.
#[derive(Default)]
struct Record {
    text: String,
    ends: Vec<usize>,
}

impl Record {
    fn push(&mut self, field: &str) {
        self.text.push_str(field);
        self.ends.push(self.text.len());
    }

    fn len(&self) -> usize {
        self.ends.len()
    }

    fn get(&self, index: usize) -> &str {
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        &self.text[start..self.ends[index]]
    }

    fn is_blank(&self) -> bool {
        self.len() <= 1 && self.text.trim().is_empty()
    }

    fn clear(&mut self) {
        self.text.clear();
        self.ends.clear();
    }
}

/// Where each required column sits in a record.
struct Columns {
    width: usize,
    feature: usize,
    instance: usize,
    x: usize,
    y: usize,
    aux: usize,
}

impl Columns {
    fn from_header(header: &Record) -> Result<Self, DataError> {
        let find = |column: &Column| {
            (0..header.len())
                .find(|&i| {
                    // Spreadsheet exports sometimes start with a byte-order mark.
                    let name = header.get(i).trim_start_matches('\u{feff}').trim();
                    column.headers.iter().any(|h| h.eq_ignore_ascii_case(name))
                })
                .ok_or_else(|| DataError::MissingColumn {
                    column: column.name,
                    accepted: column.headers.join(", "),
                })
        };

        Ok(Columns {
            width: header.len(),
            feature: find(&FEATURE)?,
            instance: find(&INSTANCE)?,
            x: find(&X)?,
            y: find(&Y)?,
            aux: find(&AUX)?,
        })
    }

    fn add(
        &self,
        builder: &mut InstanceStoreBuilder,
        record: &Record,
        line: u64,
    ) -> Result<(), DataError> {
        if record.len() != self.width {
            return Err(DataError::FieldCount {
                line,
                expected: self.width,
                found: record.len(),
            });
        }

        let label = record.get(self.feature).trim();
        if label.is_empty() {
            return Err(DataError::Malformed {
                line,
                column: FEATURE.name,
                value: String::new(),
            });
        }

        let id = parse(record, self.instance, &INSTANCE, line)?;
        let x = coordinate(record, self.x, &X, line)?;
        let y = coordinate(record, self.y, &Y, line)?;
        let aux = parse(record, self.aux, &AUX, line)?;
        builder.add(label, id, x, y, aux);
        Ok(())
    }
}

fn parse<T: FromStr>(
    record: &Record,
    index: usize,
    column: &Column,
    line: u64,
) -> Result<T, DataError> {
    let value = record.get(index).trim();
    value.parse().map_err(|_| DataError::Malformed {
        line,
        column: column.name,
        value: value.to_string(),
    })
}

fn coordinate(record: &Record, index: usize, column: &Column, line: u64) -> Result<f64, DataError> {
    let value: f64 = parse(record, index, column, line)?;
    if !value.is_finite() {
        return Err(DataError::NonFinite {
            line,
            column: column.name,
        });
    }
    Ok(value)
}
