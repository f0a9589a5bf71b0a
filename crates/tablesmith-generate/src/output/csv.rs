use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::CountingWriter;
use crate::registry::Dataset;

/// Write a dataset as CSV: a header in declaration order, nulls as empty fields.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(&dataset.columns)?;

    for row in &dataset.rows {
        let record: Vec<String> = dataset
            .columns
            .iter()
            .map(|column| row.get(column).map(|value| value.to_csv()).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}
