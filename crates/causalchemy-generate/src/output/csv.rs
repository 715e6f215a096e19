use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::table::OutputTable;
use crate::value::Value;

/// Write a table as CSV with a header row, columns in output order. Nulls
/// are written as empty cells. Returns the number of bytes written.
pub fn write_table_csv(path: &Path, table: &OutputTable) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    write_csv(writer, table)
}

/// Same as [`write_table_csv`], into any writer.
pub fn write_csv<W: Write>(writer: W, table: &OutputTable) -> Result<u64, csv::Error> {
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(table.column_names())?;

    let columns: Vec<&[Value]> = table.columns().map(|(_, column)| column).collect();
    let mut record = Vec::with_capacity(columns.len());
    for row in 0..table.row_count() {
        record.clear();
        record.extend(columns.iter().map(|column| column[row].to_csv()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_empty_nulls() {
        let table = OutputTable::from_columns(
            vec![
                ("id".to_string(), vec![Value::Int(1), Value::Int(2)]),
                ("label".to_string(), vec![Value::from("a,b"), Value::Null]),
            ],
            2,
        );
        let mut buffer = Vec::new();
        let bytes = write_csv(&mut buffer, &table).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "id,label\n1,\"a,b\"\n2,\n");
        assert_eq!(bytes, text.len() as u64);
    }
}
