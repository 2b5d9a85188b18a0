//! CSV file codec for constant records.
//!
//! Files are plain text with a fixed header line
//! (`PhysicalName,LogicalName,Value,Unit,Description`) and one record per row,
//! quoted RFC 4180 style.
//!
//! Loading is lenient: rows with the wrong field count or an invalid record are
//! skipped and reported through [`LoadReport::skipped`] and the log, never as
//! errors. Only an empty file, a bad header, or an I/O failure aborts a load.
//!
//! Saving always writes UTF-8 with a BOM and CRLF line endings, replacing the
//! target file.
//!
//! # Example
//!
//! ```rust,ignore
//! use constman::codec;
//!
//! let records = codec::load("constants.csv")?;
//! codec::save("copy.csv", &records)?;
//! ```

pub mod encoding;
pub mod format;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::logs::{log_error, log_info, log_success, log_warning, log_warning_indent};
use crate::models::ConstantRecord;

pub use encoding::{decode_auto, decode_content, detect_encoding, Encoding, UTF8_BOM};
pub use format::{escape_field, format_line, SkipReason, SkippedRow, HEADER, LINE_ENDING};

/// Result of a load with metadata.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Valid records in file order
    pub records: Vec<ConstantRecord>,
    /// Rows left out, in file order
    pub skipped: Vec<SkippedRow>,
    /// Encoding the file was read as
    pub encoding: Encoding,
}

/// Load records from a CSV file.
pub fn load<P: AsRef<Path>>(path: P) -> CsvResult<Vec<ConstantRecord>> {
    load_with_report(path).map(|report| report.records)
}

/// Load records from a CSV file, keeping track of skipped rows.
pub fn load_with_report<P: AsRef<Path>>(path: P) -> CsvResult<LoadReport> {
    let path = path.as_ref();
    log_info(format!("📖 Reading {}", path.display()));

    let report = match read_file(path).and_then(|bytes| parse_bytes(&bytes)) {
        Ok(report) => report,
        Err(e) => {
            log_error(format!("Load failed: {}", e));
            return Err(e);
        }
    };

    log_success(format!(
        "Loaded {} constants ({})",
        report.records.len(),
        report.encoding
    ));
    if !report.skipped.is_empty() {
        log_warning(format!("{} rows skipped", report.skipped.len()));
        for row in &report.skipped {
            log_warning_indent(format!("Line {}: {}", row.line, row.reason), 1);
        }
    }

    Ok(report)
}

/// Parse raw file bytes (BOM included).
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<LoadReport> {
    let (content, encoding) = decode_auto(bytes);
    parse_str(&content, encoding)
}

/// Parse already decoded file content.
pub fn parse_str(content: &str, encoding: Encoding) -> CsvResult<LoadReport> {
    let body = format::split_header(content)?;
    let (records, skipped) = format::parse_body(body, 2);
    Ok(LoadReport {
        records,
        skipped,
        encoding,
    })
}

fn read_file(path: &Path) -> CsvResult<Vec<u8>> {
    let read_err = |source| CsvError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;
    Ok(bytes)
}

/// Write records to a CSV file, replacing any existing content.
///
/// The file is opened with write, create and truncate. No file lock is taken,
/// so another process writing the same path at the same time is not excluded.
pub fn save<'a, P, I>(path: P, records: I) -> CsvResult<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a ConstantRecord>,
{
    let path = path.as_ref();
    match write_file(path, records) {
        Ok(count) => {
            log_success(format!("💾 Saved {} constants to {}", count, path.display()));
            Ok(count)
        }
        Err(e) => {
            log_error(format!("Save failed: {}", e));
            Err(e)
        }
    }
}

fn write_file<'a, I>(path: &Path, records: I) -> CsvResult<usize>
where
    I: IntoIterator<Item = &'a ConstantRecord>,
{
    let write_err = |source| CsvError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(write_err)?;
    let mut writer = BufWriter::new(file);

    let count = write_records(&mut writer, records).map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    Ok(count)
}

/// Serialize records (BOM, header, rows) into any writer.
pub fn write_records<'a, W, I>(writer: &mut W, records: I) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a ConstantRecord>,
{
    writer.write_all(&UTF8_BOM)?;
    writer.write_all(HEADER.as_bytes())?;
    writer.write_all(LINE_ENDING.as_bytes())?;

    let mut count = 0;
    for record in records {
        writer.write_all(format_line(record).as_bytes())?;
        writer.write_all(LINE_ENDING.as_bytes())?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str, logical: &str, value: &str, unit: &str, description: &str) -> ConstantRecord {
        ConstantRecord::new(name, logical, value, unit, description).unwrap()
    }

    #[test]
    fn test_load_basic_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("basic.csv");
        std::fs::write(
            &path,
            "PhysicalName,LogicalName,Value,Unit,Description\nENGINE_TEMP,エンジン温度,120,℃,エンジンの最大許容温度\n",
        )
        .unwrap();

        let records = load(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].physical_name(), "ENGINE_TEMP");
        assert_eq!(records[0].value(), "120");
        assert!(!records[0].is_modified());
    }

    #[test]
    fn test_save_writes_bom_header_and_crlf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![record("MAX_SPEED", "最高速度", "100", "km/h", "")];

        assert_eq!(save(&path, &records).unwrap(), 1);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&UTF8_BOM));
        let text = std::str::from_utf8(&bytes[3..]).unwrap();
        assert_eq!(
            text,
            "PhysicalName,LogicalName,Value,Unit,Description\r\nMAX_SPEED,最高速度,100,km/h,\r\n"
        );
    }

    #[test]
    fn test_save_empty_list_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        save(&path, &Vec::<ConstantRecord>::new()).unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.csv");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        save(&path, &vec![record("ONLY", "", "1", "", "")]).unwrap();
        let records = load(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].physical_name(), "ONLY");
    }

    #[test]
    fn test_round_trip_special_characters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("special.csv");
        let original = vec![
            record("SPECIAL_ITEM", "特殊文字\"テスト\"", "値1,値2", "unit", "改行\nテスト"),
            record("CRLF_NOTE", "a,b", "\"quoted\"", "", "one\r\ntwo,\"three\""),
            record("PLAIN", "plain", "0-100", "%", "nothing special"),
        ];

        save(&path, &original).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.len(), original.len());
        for (a, b) in original.iter().zip(&loaded) {
            assert_eq!(a.columns(), b.columns());
        }
    }

    #[test]
    fn test_comma_value_round_trip_is_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("comma.csv");
        let value = "0,100";
        save(&path, &vec![record("RANGE", "範囲", value, "", "")]).unwrap();
        assert_eq!(load(&path).unwrap()[0].value().as_bytes(), value.as_bytes());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load(dir.path().join("missing.csv")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_load_empty_file_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert!(load(&path).unwrap_err().is_format());

        std::fs::write(&path, UTF8_BOM).unwrap();
        assert!(load(&path).unwrap_err().is_format());
    }

    #[test]
    fn test_load_bad_header_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Name,Value\nA,1\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("E003"));
    }

    #[test]
    fn test_save_to_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.csv");
        let err = save(&path, &Vec::<ConstantRecord>::new()).unwrap_err();
        assert!(err.is_io());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_save_logs_error() {
        use crate::logs::{LogLevel, LOG_BROADCASTER};
        use tokio::sync::broadcast::error::TryRecvError;

        let mut rx = LOG_BROADCASTER.subscribe();
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("logged.csv");
        assert!(save(&path, &Vec::<ConstantRecord>::new()).is_err());

        let needle = path.display().to_string();
        let mut found = false;
        loop {
            match rx.try_recv() {
                Ok(entry) => {
                    if entry.level == LogLevel::Error && entry.message.contains(&needle) {
                        found = true;
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(found);
    }

    #[test]
    fn test_load_utf16le_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("utf16.csv");
        let text = "PhysicalName,LogicalName,Value,Unit,Description\r\nVOLUME,音量,50,%,\r\n";
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        let report = load_with_report(&path).unwrap();
        assert_eq!(report.encoding, Encoding::Utf16Le);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].logical_name(), "音量");
    }

    #[test]
    fn test_lenient_rows_reported() {
        let content = "PhysicalName,LogicalName,Value,Unit,Description\n\
                       GOOD,a,1,,\n\
                       FOUR,b,2,x\n\
                       lower,c,3,,\n\
                       ALSO_GOOD,d,4,,\n";
        let report = parse_bytes(content.as_bytes()).unwrap();
        assert_eq!(report.encoding, Encoding::Utf8);
        let names: Vec<_> = report.records.iter().map(|r| r.physical_name()).collect();
        assert_eq!(names, ["GOOD", "ALSO_GOOD"]);
        let lines: Vec<_> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, [3, 4]);
    }

    #[test]
    fn test_write_records_to_buffer() {
        let mut buf = Vec::new();
        let records = vec![record("A", "", "1", "", "")];
        assert_eq!(write_records(&mut buf, &records).unwrap(), 1);
        let (text, encoding) = decode_auto(&buf);
        assert_eq!(encoding, Encoding::Utf8Bom);
        assert!(text.ends_with("A,,1,,\r\n"));
    }
}
