//! JSON Lines dataset output.
//!
//! One [`QuoteRecord`] per line. The file is written to a sibling temporary
//! path, flushed, and renamed over the target, so readers see either the old
//! file or the complete new one.
//!
//! # Output Structure
//!
//! ```text
//! {"id":"…","quote":"…","author":"…","tags":["…"],"likes":12,"source":"goodreads","source_url":"…","scraped_at":"…"}
//! {"id":"…","quote":"…","author":"Unknown","tags":[],"likes":0,"source":"famousquotes","source_url":"…","scraped_at":"…"}
//! ```

use crate::error::SinkError;
use crate::models::QuoteRecord;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, instrument};

/// Write `records` to `path` as JSON Lines.
///
/// Creates missing parent directories. Writes nothing, and creates no file,
/// when `records` is empty.
///
/// # Returns
///
/// The number of records written.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_jsonl(path: &Path, records: &[QuoteRecord]) -> Result<usize, SinkError> {
    if records.is_empty() {
        info!("No records; skipping dataset write");
        return Ok(0);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|source| {
            error!(dir = %parent.display(), error = %source, "Failed to create output dir");
            SinkError::Io {
                path: parent.to_path_buf(),
                source,
            }
        })?;
    }

    let tmp_path = temp_path(path);
    if let Err(e) = write_lines(&tmp_path, records).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    if let Err(source) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        error!(error = %source, "Failed to move dataset into place");
        return Err(SinkError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    info!("Wrote dataset");
    Ok(records.len())
}

async fn write_lines(tmp_path: &Path, records: &[QuoteRecord]) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: tmp_path.to_path_buf(),
        source,
    };

    let file = File::create(tmp_path).await.map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        writer.write_all(&line).await.map_err(io_err)?;
    }
    writer.flush().await.map_err(io_err)?;
    writer.get_mut().sync_all().await.map_err(io_err)?;
    Ok(())
}

/// `data.jsonl` → `.data.jsonl.tmp` in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
