//! One-JSON-object-per-line file primitives shared by mailboxes and control logs

use crate::error::{SquadError, SquadResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

/// Append one serialized record followed by a newline.
///
/// The parent directory must already exist: appends never recreate storage that
/// a shutdown has removed.
pub(crate) async fn append_line<T: Serialize>(path: &Path, record: &T) -> SquadResult<()> {
    let json = serde_json::to_string(record)
        .map_err(|e| SquadError::json(format!("Failed to serialize record: {}", e)))?;

    let mut json_line = String::with_capacity(json.len() + 1);
    json_line.push_str(&json);
    json_line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| SquadError::io_with_path(format!("Failed to open log: {}", e), path))?;

    file.write_all(json_line.as_bytes())
        .await
        .map_err(|e| SquadError::io_with_path(format!("Failed to append record: {}", e), path))?;
    file.flush()
        .await
        .map_err(|e| SquadError::io_with_path(format!("Failed to flush log: {}", e), path))?;

    Ok(())
}

/// Read every well-formed record. Malformed lines are skipped with a warning;
/// a missing file reads as empty.
pub(crate) async fn read_lines<T: DeserializeOwned>(path: &Path) -> SquadResult<Vec<T>> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(SquadError::io_with_path(
                format!("Failed to open log: {}", e),
                path,
            ));
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut records = Vec::new();
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| SquadError::io_with_path(format!("Failed to read line: {}", e), path))?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                let preview: String = line.chars().take(50).collect();
                warn!(
                    path = %path.display(),
                    line = line_no,
                    "Skipping malformed record: {} - line: {}",
                    e,
                    preview
                );
            }
        }
    }

    Ok(records)
}
