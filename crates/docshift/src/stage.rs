//! Stager
//!
//! Serializes the reconciled record set to a comma-separated file with a
//! header row, then uploads that file unmodified to the object store.
//!
//! Field text is escaped for a loader running with `REMOVEQUOTES ESCAPE`:
//! backslashes are doubled, line breaks are prefixed with a backslash, and
//! quotes inside a quoted field are written as `\"`.

use async_trait::async_trait;
use csv::{QuoteStyle, WriterBuilder};
use serde_json::Value;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::Result;
use crate::record::RecordSet;

/// Local artifact produced by [`write_csv`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Column order of the header row
    pub columns: Vec<String>,
    pub rows: usize,
    pub bytes: u64,
    pub sha256: String,
}

/// Location of the uploaded artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub bucket: String,
    pub key: String,
}

impl StagedObject {
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Whole-file blob storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the file at `path` under `key`, replacing any existing object
    async fn upload_file(&self, path: &Path, key: &str) -> Result<StagedObject>;
}

/// Write `records` to `path` as CSV, overwriting any previous file
pub fn write_csv(records: &RecordSet, path: &Path) -> Result<StagedFile> {
    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote_style(QuoteStyle::Necessary)
        .double_quote(false)
        .escape(b'\\')
        .from_path(path)?;

    writer.write_record(
        records
            .columns()
            .iter()
            .map(|column| escape_field(column).into_owned()),
    )?;

    for row in records.rows() {
        writer.write_record(
            records
                .columns()
                .iter()
                .map(|column| render_field(row.get(column)).into_owned()),
        )?;
    }

    writer.flush()?;
    drop(writer);

    let digest = docshift_common::checksum::digest_file(path)?;

    Ok(StagedFile {
        path: path.to_path_buf(),
        columns: records.columns().to_vec(),
        rows: records.len(),
        bytes: digest.size,
        sha256: digest.sha256,
    })
}

/// Run the staging stage: write locally, then upload
#[instrument(skip(records, store), fields(rows = records.len()))]
pub async fn stage(
    records: &RecordSet,
    store: &dyn ObjectStore,
    local_path: &Path,
    key: &str,
) -> Result<(StagedFile, StagedObject)> {
    let file = write_csv(records, local_path)?;
    info!(
        path = %file.path.display(),
        bytes = file.bytes,
        sha256 = %file.sha256,
        "Wrote staging file"
    );

    let object = store.upload_file(&file.path, key).await?;
    info!(uri = %object.uri(), "Uploaded staging file");

    Ok((file, object))
}

/// Text of one CSV field; missing and null values become empty fields
pub fn render_field(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::Bool(b)) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(Value::String(s)) => escape_field(s),
        Some(other) => Cow::Owned(escape_field(&other.to_string()).into_owned()),
    }
}

fn escape_field(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\\', '\n', '\r']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        if matches!(ch, '\\' | '\n' | '\r') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::Row;
    use serde_json::json;

    fn records(rows: Vec<Value>) -> RecordSet {
        RecordSet::from_rows(
            rows.into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    _ => Row::new(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render_field(None), "");
        assert_eq!(render_field(Some(&Value::Null)), "");
        assert_eq!(render_field(Some(&json!(true))), "true");
        assert_eq!(render_field(Some(&json!(42))), "42");
        assert_eq!(render_field(Some(&json!(1.5))), "1.5");
        assert_eq!(render_field(Some(&json!("plain"))), "plain");
    }

    #[test]
    fn test_escape_backslash_and_newline() {
        assert_eq!(escape_field(r"C:\temp"), r"C:\\temp");
        assert_eq!(escape_field("a\nb"), "a\\\nb");
        assert!(matches!(escape_field("clean"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_write_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let set = records(vec![
            json!({"a": 1, "c": "x"}),
            json!({"c": "y, z"}),
            json!({"a": 3, "c": null}),
        ]);

        let staged = write_csv(&set, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert_eq!(content, "a,c\n1,x\n,\"y, z\"\n3,\n");
        assert_eq!(staged.rows, 3);
        assert_eq!(staged.columns, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(staged.bytes, content.len() as u64);
    }

    #[test]
    fn test_write_csv_escapes_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let set = records(vec![json!({"q": "say \"hi\""})]);

        write_csv(&set, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert_eq!(content, "q\n\"say \\\"hi\\\"\"\n");
    }

    #[test]
    fn test_write_csv_backslashes_survive_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let set = records(vec![
            json!({"v": r"C:\temp"}),
            json!({"v": r#"a"b\c"#}),
            json!({"v": r"x,y\"}),
            json!({"v": "line1\nline2"}),
        ]);

        write_csv(&set, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        let expected = concat!(
            "v\n",
            r#""C:\\temp""#, "\n",
            r#""a\"b\\c""#, "\n",
            r#""x,y\\""#, "\n",
            "\"line1\\\nline2\"\n",
        );
        assert_eq!(content, expected);
    }

    #[test]
    fn test_write_csv_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "stale content that is longer than the new file\n").unwrap();

        write_csv(&records(vec![json!({"a": 1})]), &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }

    #[test]
    fn test_write_csv_missing_directory() {
        let set = records(vec![json!({"a": 1})]);
        let result = write_csv(&set, Path::new("/nonexistent/docshift/data.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_object_uri() {
        let object = StagedObject {
            bucket: "bucket".to_string(),
            key: "data.csv".to_string(),
        };
        assert_eq!(object.uri(), "s3://bucket/data.csv");
    }
}
