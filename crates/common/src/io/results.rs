use std::io::Write;

use fragment_catalog::BatchResult;

use super::{OutputFormat, WriteOutputError};

/// Write one record per batch.
pub fn write_batch_results<W: Write>(
    mut writer: W,
    results: &[BatchResult],
    format: OutputFormat,
) -> Result<(), WriteOutputError> {
    match format {
        OutputFormat::JsonLines => {
            for result in results {
                serde_json::to_writer(&mut writer, result)?;
                writeln!(writer)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, results)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use fragment_catalog::{EntryIndex, FailureRecord};
    use serde_json::Value;

    use super::*;

    fn results() -> Vec<BatchResult> {
        let first = BatchResult {
            batch_label: "2020-01".to_owned(),
            files_read: 2,
            candidates_processed: 2,
            novel_count: 1,
            recurrence_count: 1,
            matches: vec![EntryIndex::new(0), EntryIndex::new(0)],
            novel_entries: vec![EntryIndex::new(0)],
            ..Default::default()
        };
        let second = BatchResult {
            batch_label: "2020-02".to_owned(),
            file_read_failures: 1,
            failures: vec![FailureRecord {
                path: "missing.txt".into(),
                message: "could not read missing.txt".to_owned(),
            }],
            ..Default::default()
        };
        vec![first, second]
    }

    #[test]
    fn json_lines_has_one_object_per_batch() {
        let mut out = vec![];
        write_batch_results(&mut out, &results(), OutputFormat::JsonLines).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text.lines().map(|line| serde_json::from_str(line).unwrap()).collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["batch_label"], "2020-01");
        assert_eq!(lines[0]["novel_count"], 1);
        assert_eq!(lines[0]["matches"], serde_json::json!([0, 0]));
        assert!(lines[0].get("failures").is_none());
        assert!(lines[1].get("matches").is_none());
        assert_eq!(lines[1]["failures"][0]["path"], "missing.txt");
    }

    #[test]
    fn json_is_an_array() {
        let mut out = vec![];
        write_batch_results(&mut out, &results(), OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[1]["file_read_failures"], 1);
    }
}
