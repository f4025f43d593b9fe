use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read one chunk of tool output, ending at `\n` or `\r` (inclusive) or EOF.
/// Returns the number of bytes appended to `buf`; zero means EOF.
pub async fn read_segment<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(total);
        }
        match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(i) => {
                buf.extend_from_slice(&available[..=i]);
                reader.consume(i + 1);
                return Ok(total + i + 1);
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
                total += len;
            }
        }
    }
}

/// Resolve `requested` and accept it only if it lies inside `root`.
///
/// Returns `Ok(None)` when the path escapes `root`; I/O errors (including a
/// missing file) are passed through.
pub async fn confine_to(root: &Path, requested: &Path) -> io::Result<Option<PathBuf>> {
    let root = tokio::fs::canonicalize(root).await?;
    let resolved = tokio::fs::canonicalize(requested).await?;
    if resolved.starts_with(&root) && resolved != root {
        Ok(Some(resolved))
    } else {
        Ok(None)
    }
}
