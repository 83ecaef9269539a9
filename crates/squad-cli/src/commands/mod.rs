//! CLI commands

pub mod aggregate;
pub mod partition;
pub mod poll;
pub mod post;
pub mod shutdown;
pub mod spawn;
pub mod status;
pub mod teams;

use squad_core::error::{ResultExt, SquadResult};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read a whole input file, `-` meaning stdin
pub(crate) async fn read_input(source: &str) -> SquadResult<String> {
    if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }

    tokio::fs::read_to_string(Path::new(source))
        .await
        .with_context(|| format!("Failed to read '{}'", source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_input_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("targets.txt");
        std::fs::write(&path, "codec\tproptest\n").unwrap();

        let content = read_input(path.to_str().unwrap()).await.unwrap();
        assert_eq!(content, "codec\tproptest\n");
    }

    #[tokio::test]
    async fn test_read_input_missing_file_names_path() {
        let err = read_input("/definitely/not/here.txt").await.unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}
