use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use tablesmith_generate::GenerationReport;

use crate::{CliError, CliResult};

pub const REPORT_FILE: &str = "generation_report.json";

/// Write the run report next to the generated files.
pub fn write_report(output_dir: &Path, report: &GenerationReport) -> CliResult<PathBuf> {
    let path = output_dir.join(REPORT_FILE);
    write_json_atomic(&path, report)?;
    Ok(path)
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let data = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(&data)?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> CliResult<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::InvalidConfig("invalid path for report".to_string()))?;
    let tmp_name = format!("{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tablesmith_generate::GenerationContext;

    #[test]
    fn report_lands_in_output_dir() {
        let dir = std::env::temp_dir().join(format!("tablesmith_report_{}", uuid::Uuid::new_v4()));
        let ctx = GenerationContext {
            reference_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            ..GenerationContext::new(3)
        };
        let report = GenerationReport::new("run-1".to_string(), &ctx);

        let path = write_report(&dir, &report).unwrap();
        assert_eq!(path, dir.join(REPORT_FILE));
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["rows_per_table"], 3);
        assert_eq!(value["reference_date"], "2026-10-16");
        assert!(!dir.join("generation_report.json.tmp").exists());
    }
}
