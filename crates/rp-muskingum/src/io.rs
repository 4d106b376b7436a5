//! Single-column coefficient files, one value per reach in connectivity order.

use std::path::Path;

use rp_core::{PrepError, PrepResult};

use crate::builder::MuskingumParameters;

pub fn write_column_csv(values: &[f64], path: &Path) -> PrepResult<()> {
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    for v in values {
        out.write_record([v.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

pub fn read_column_csv(path: &Path) -> PrepResult<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(cell) = record.get(0).filter(|c| !c.is_empty()) else {
            continue;
        };
        let line = record.position().map_or(0, |p| p.line());
        let v = cell.parse::<f64>().map_err(|e| {
            PrepError::data(format!("{} line {line}: {e}", path.display()))
        })?;
        values.push(v);
    }
    Ok(values)
}

impl MuskingumParameters {
    /// Write `kfac`, `k` and `x` to their own files.
    pub fn write_files(&self, kfac: &Path, k: &Path, x: &Path) -> PrepResult<()> {
        write_column_csv(&self.kfac, kfac)?;
        write_column_csv(&self.k, k)?;
        write_column_csv(&self.x, x)?;
        tracing::info!(reaches = self.len(), kfac = %kfac.display(), "wrote muskingum files");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_file_rejects_extra_columns() {
        let path = std::env::temp_dir().join("rp_muskingum_two_columns.csv");
        std::fs::write(&path, "1.5\n2.5,3.5\n").unwrap();
        let err = read_column_csv(&path).unwrap_err();
        assert!(err.is_data_validation(), "{err}");
    }

    #[test]
    fn column_file_written_one_value_per_line() {
        let path = std::env::temp_dir().join("rp_muskingum_column.csv");
        write_column_csv(&[3600.0, 0.25], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3600\n0.25\n");
        assert_eq!(read_column_csv(&path).unwrap(), vec![3600.0, 0.25]);
    }
}
