//! The converter seam: one implementation per conversion routine.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::ConversionError;

/// Converts one input file on disk into one output file on disk.
///
/// Implementations must only write to `output`; the dispatcher guarantees
/// the path is unique per file.
#[async_trait]
pub trait Converter: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Perform the conversion.
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError>;
}

/// Run a synchronous, CPU-bound conversion on the blocking pool.
///
/// A blocking thread cannot be cancelled. If the caller stops waiting
/// (per-file timeout, dropped batch) the thread runs to completion and then
/// deletes whatever it wrote to `output`.
pub(crate) async fn run_blocking<F>(
    input: &Path,
    output: &Path,
    convert: F,
) -> Result<(), ConversionError>
where
    F: FnOnce(&Path, &Path) -> Result<(), ConversionError> + Send + 'static,
{
    let input = input.to_path_buf();
    let output = output.to_path_buf();
    let abandoned = AbandonOnDrop(Arc::new(AtomicBool::new(false)));
    let flag = Arc::clone(&abandoned.0);

    tokio::task::spawn_blocking(move || {
        let result = convert(&input, &output);
        if flag.load(Ordering::Acquire) {
            discard_output(&output);
        }
        result
    })
    .await?
}

/// Raises the flag when the waiting future goes away.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn discard_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => {
            tracing::debug!(path = %output.display(), "Discarded output of abandoned conversion");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                path = %output.display(),
                error = %e,
                "Failed to discard output of abandoned conversion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn slow_copy(input: &Path, output: &Path) -> Result<(), ConversionError> {
        std::thread::sleep(Duration::from_millis(300));
        std::fs::copy(input, output)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_conversion_keeps_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, b"data").expect("write");

        run_blocking(&input, &output, slow_copy).await.expect("convert");
        assert_eq!(std::fs::read(&output).expect("output"), b"data");
    }

    #[tokio::test]
    async fn test_abandoned_conversion_discards_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        std::fs::write(&input, b"data").expect("write");

        let waited = tokio::time::timeout(
            Duration::from_millis(50),
            run_blocking(&input, &output, slow_copy),
        )
        .await;
        assert!(waited.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!output.exists());
    }
}
