//! CSV and line-oriented record IO.
//!
//! Only the text column is rewritten; every other column of a cleaned row is
//! copied byte for byte.

use std::{
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use disaster_preprocessing::{BatchReport, DeadLetter, RawRecord};
use tracing::debug;

/// Rows of a CSV file plus the location of the id and text columns.
pub struct Dataset {
    headers: ByteRecord,
    rows: Vec<ByteRecord>,
    text_idx: usize,
    id_idx: Option<usize>,
}

fn column_index(headers: &ByteRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name.as_bytes())
}

impl Dataset {
    /// Read a CSV file. Cells are kept as bytes so encoding problems surface
    /// as per-record anomalies instead of read errors.
    pub fn from_path(path: &Path, text_column: &str, id_column: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let headers = reader.byte_headers()?.clone();
        let Some(text_idx) = column_index(&headers, text_column) else {
            bail!(
                "Text column `{text_column}` not found in {}",
                path.display()
            );
        };
        let id_idx = column_index(&headers, id_column);
        if id_idx.is_none() {
            debug!(id_column, "Id column not found, using row numbers");
        }

        let rows = reader
            .byte_records()
            .enumerate()
            .map(|(idx, row)| row.with_context(|| format!("Failed to read row {}", idx + 1)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            headers,
            rows,
            text_idx,
            id_idx,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// One record per row. A short row lacks the text cell and is reported as
    /// missing text.
    #[must_use]
    pub fn records(&self) -> Vec<RawRecord> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let id = self
                    .id_idx
                    .and_then(|i| row.get(i))
                    .map_or_else(
                        || (idx + 1).to_string(),
                        |id| String::from_utf8_lossy(id).into_owned(),
                    );
                match row.get(self.text_idx) {
                    Some(text) => RawRecord::new(id, text),
                    None => RawRecord::missing(id),
                }
            })
            .collect()
    }

    /// Write the header and every row that was not dead-lettered, with the text
    /// column replaced by its cleaned value. Passed-through rows keep their
    /// original text bytes.
    pub fn write_cleaned<W: Write>(&self, report: &BatchReport, out: W) -> Result<()> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(out);
        writer.write_byte_record(&self.headers)?;

        for cleaned in &report.cleaned {
            let Some(row) = self.rows.get(cleaned.index) else {
                bail!("Cleaned record {} has no source row", cleaned.index);
            };
            let text = match row.get(self.text_idx) {
                Some(original) if cleaned.passed_through => original,
                _ => cleaned.text.as_bytes(),
            };
            let mut updated = ByteRecord::with_capacity(row.as_slice().len(), row.len());
            for (idx, field) in row.iter().enumerate() {
                if idx == self.text_idx {
                    updated.push_field(text);
                } else {
                    updated.push_field(field);
                }
            }
            if row.len() <= self.text_idx {
                for _ in row.len()..self.text_idx {
                    updated.push_field(b"");
                }
                updated.push_field(text);
            }
            writer.write_byte_record(&updated)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Read a text file as one record per line, ids being 1-based line numbers.
pub fn read_lines(path: &Path) -> Result<Vec<RawRecord>> {
    let contents = std::fs::read(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    let mut records = contents
        .split(|&b| b == b'\n')
        .enumerate()
        .map(|(idx, line)| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            RawRecord::new((idx + 1).to_string(), line)
        })
        .collect::<Vec<_>>();
    // A trailing newline does not start another record.
    if contents.is_empty() || contents.ends_with(b"\n") {
        records.pop();
    }
    Ok(records)
}

/// Write dead letters as an `id,reason` CSV.
pub fn write_dead_letters<W: Write>(dead_letters: &[DeadLetter], out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(["id", "reason"])?;
    for letter in dead_letters {
        writer.write_record([letter.id.as_str(), letter.reason.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write to `path`, or to stdout when no path is given.
pub fn with_output<F>(path: Option<&Path>, write: F) -> Result<()>
where
    F: FnOnce(Box<dyn Write>) -> Result<()>,
{
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write(Box::new(io::BufWriter::new(file)))
        }
        None => write(Box::new(io::stdout().lock())),
    }
}
