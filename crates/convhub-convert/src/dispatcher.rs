//! Batch dispatcher: per-file extension validation, conversion under a
//! timeout, and the configured failure policy.
//!
//! Under [`FailurePolicy::Isolate`] every file gets its own result and
//! conversions run concurrently (bounded by `max_concurrency`); results
//! keep input order. Under [`FailurePolicy::Abort`] extensions are checked
//! up front and files are converted sequentially until the first failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, info, instrument, warn};
use uuid::Uuid;

use convhub_core::config::{ConversionConfig, FailurePolicy, StorageConfig};

use crate::error::ConversionError;
use crate::filesystem::{BatchWorkspace, FsUtils};
use crate::metrics::ConversionMetrics;
use crate::models::{
    Batch, ConversionRequest, ConversionResult, ConvertedFile, FailureKind, FileFailure,
    UploadedFile,
};
use crate::registry::{ConverterEntry, ConverterRegistry};

/// Dispatcher tunables, taken from storage and conversion config.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Root of per-batch upload directories.
    pub upload_dir: PathBuf,
    /// Root of per-batch output directories.
    pub converted_dir: PathBuf,
    /// Per-file conversion timeout.
    pub timeout: Duration,
    /// Maximum concurrent conversions within one batch.
    pub max_concurrency: usize,
    /// Per-file failure handling.
    pub failure_policy: FailurePolicy,
    /// Minimum output size for a conversion to count as successful.
    pub min_output_bytes: u64,
    /// Keep batch directories after the response is built.
    pub retain_files: bool,
}

impl DispatchSettings {
    /// Build settings from the loaded configuration.
    pub fn from_config(storage: &StorageConfig, conversion: &ConversionConfig) -> Self {
        Self {
            upload_dir: storage.upload_dir.clone(),
            converted_dir: storage.converted_dir.clone(),
            timeout: Duration::from_secs(conversion.timeout_seconds),
            max_concurrency: conversion.max_concurrency.max(1),
            failure_policy: conversion.failure_policy,
            min_output_bytes: conversion.min_output_bytes,
            retain_files: storage.retain_files,
        }
    }
}

/// An accepted upload saved to the batch upload directory.
#[derive(Debug)]
struct StagedFile {
    source_name: String,
    display_name: String,
    input_path: PathBuf,
    output_path: PathBuf,
    input_bytes: u64,
}

#[derive(Debug)]
enum Slot {
    Staged(StagedFile),
    Rejected(FileFailure),
}

/// Runs a conversion request against the registry.
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    registry: Arc<ConverterRegistry>,
    settings: DispatchSettings,
    metrics: Arc<ConversionMetrics>,
}

impl BatchDispatcher {
    /// Create a dispatcher.
    pub fn new(
        registry: Arc<ConverterRegistry>,
        settings: DispatchSettings,
        metrics: Arc<ConversionMetrics>,
    ) -> Self {
        Self {
            registry,
            settings,
            metrics,
        }
    }

    /// Convert every file of `request`, producing one result per file in
    /// input order.
    ///
    /// Nothing is written when the conversion type is unknown or, under the
    /// abort policy, when any extension is rejected.
    #[instrument(skip(self, request), fields(batch_id, conversion = %request.kind, files = request.files.len()))]
    pub async fn dispatch(&self, request: ConversionRequest) -> Result<Batch, ConversionError> {
        let entry = self.registry.lookup(request.kind)?.clone();

        if self.settings.failure_policy == FailurePolicy::Abort {
            if let Some(file) = request.files.iter().find(|f| !entry.accepts(&f.name)) {
                self.metrics.record_rejection();
                warn!(file = %file.name, "Rejecting batch: unsupported extension");
                return Err(entry.rejection(&file.name));
            }
        }

        let batch_id = Uuid::now_v7();
        tracing::Span::current().record("batch_id", tracing::field::display(batch_id));
        self.metrics.record_batch();

        let workspace = BatchWorkspace::create(
            &self.settings.upload_dir,
            &self.settings.converted_dir,
            batch_id,
        )
        .await?;
        // Any early return, or this future being dropped, removes the batch.
        let cleanup = (!self.settings.retain_files).then(|| workspace.guard());

        let slots = self.stage(&entry, &workspace, request.files).await?;
        let results = match self.settings.failure_policy {
            FailurePolicy::Isolate => self.convert_isolated(&entry, slots).await,
            FailurePolicy::Abort => self.convert_sequential(&entry, slots).await?,
        };

        let batch = Batch {
            id: batch_id,
            kind: request.kind,
            results,
            workspace,
            cleanup,
        };
        info!(
            converted = batch.converted_count(),
            failed = batch.failed_count(),
            "Batch completed"
        );
        Ok(batch)
    }

    /// Delete the batch's working directories unless configured to keep
    /// them. Call once the response no longer needs the files.
    pub async fn release(&self, batch: &Batch) {
        if !self.settings.retain_files {
            batch.workspace.remove().await;
        }
    }

    /// Dispatcher settings.
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Validate extensions and save accepted uploads.
    async fn stage(
        &self,
        entry: &ConverterEntry,
        workspace: &BatchWorkspace,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Slot>, ConversionError> {
        let mut slots = Vec::with_capacity(files.len());

        for file in files {
            if !entry.accepts(&file.name) {
                self.metrics.record_rejection();
                warn!(file = %file.name, "Unsupported extension");
                slots.push(Slot::Rejected(FileFailure {
                    source_name: file.name,
                    kind: FailureKind::UnsupportedExtension,
                    message: format!(
                        "unsupported extension, expected one of [{}]",
                        entry.accepted_extensions.join(", ")
                    ),
                }));
                continue;
            }

            let input_path = workspace.save_upload(&file.name, &file.data).await?;
            let display_name = entry.output_name(&file.name);
            let output_path = workspace.output_path_for(&display_name, entry.output_extension);

            slots.push(Slot::Staged(StagedFile {
                input_bytes: file.data.len() as u64,
                source_name: file.name,
                display_name,
                input_path,
                output_path,
            }));
        }

        Ok(slots)
    }

    /// Isolate policy: convert concurrently, one result per slot.
    async fn convert_isolated(
        &self,
        entry: &ConverterEntry,
        slots: Vec<Slot>,
    ) -> Vec<ConversionResult> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let mut results: Vec<Option<ConversionResult>> = Vec::with_capacity(slots.len());
        let mut pending: Vec<(usize, String)> = Vec::new();
        // Dropping the set aborts every conversion still in flight.
        let mut tasks = JoinSet::new();

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Slot::Rejected(failure) => results.push(Some(ConversionResult::Failed(failure))),
                Slot::Staged(staged) => {
                    results.push(None);
                    pending.push((index, staged.source_name.clone()));

                    let entry = entry.clone();
                    let semaphore = Arc::clone(&semaphore);
                    let metrics = Arc::clone(&self.metrics);
                    let timeout = self.settings.timeout;
                    let min_output_bytes = self.settings.min_output_bytes;

                    tasks.spawn(
                        async move {
                            let result = match semaphore.acquire().await {
                                Ok(_permit) => {
                                    convert_one(&entry, staged, timeout, min_output_bytes, &metrics)
                                        .await
                                }
                                Err(_) => failed(
                                    staged.source_name,
                                    FailureKind::ConversionFailed,
                                    "conversion slot unavailable".to_string(),
                                ),
                            };
                            (index, result)
                        }
                        .in_current_span(),
                    );
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => {
                    self.metrics.record_failure();
                    warn!(error = %e, "Conversion task failed");
                }
            }
        }

        // A panicked task leaves its slot empty.
        for (index, source_name) in pending {
            if results[index].is_none() {
                results[index] = Some(failed(
                    source_name,
                    FailureKind::ConversionFailed,
                    "conversion task failed".to_string(),
                ));
            }
        }

        results.into_iter().flatten().collect()
    }

    /// Abort policy: convert in order, stop at the first failure.
    async fn convert_sequential(
        &self,
        entry: &ConverterEntry,
        slots: Vec<Slot>,
    ) -> Result<Vec<ConversionResult>, ConversionError> {
        let mut results = Vec::with_capacity(slots.len());

        for slot in slots {
            let staged = match slot {
                Slot::Staged(staged) => staged,
                Slot::Rejected(failure) => return Err(entry.rejection(&failure.source_name)),
            };

            let result = convert_one(
                entry,
                staged,
                self.settings.timeout,
                self.settings.min_output_bytes,
                &self.metrics,
            )
            .await;

            if let ConversionResult::Failed(failure) = result {
                return Err(ConversionError::ConversionFailed {
                    file_name: failure.source_name,
                    message: failure.message,
                });
            }
            results.push(result);
        }

        Ok(results)
    }
}

fn failed(source_name: String, kind: FailureKind, message: String) -> ConversionResult {
    ConversionResult::Failed(FileFailure {
        source_name,
        kind,
        message,
    })
}

/// Convert one staged file under `timeout` and validate its output.
async fn convert_one(
    entry: &ConverterEntry,
    staged: StagedFile,
    timeout: Duration,
    min_output_bytes: u64,
    metrics: &ConversionMetrics,
) -> ConversionResult {
    metrics.record_started(staged.input_bytes);
    let start = Instant::now();

    let conversion = entry
        .converter
        .convert(&staged.input_path, &staged.output_path);

    let outcome = match tokio::time::timeout(timeout, conversion).await {
        Ok(Ok(())) => FsUtils::validate_output(&staged.output_path, min_output_bytes)
            .await
            .map_err(|e| (FailureKind::ConversionFailed, e.to_string())),
        Ok(Err(e @ ConversionError::TimedOut { .. })) => Err((FailureKind::TimedOut, e.to_string())),
        Ok(Err(e)) => Err((FailureKind::ConversionFailed, e.to_string())),
        Err(_) => Err((
            FailureKind::TimedOut,
            ConversionError::TimedOut {
                timeout_seconds: timeout.as_secs(),
            }
            .to_string(),
        )),
    };

    match outcome {
        Ok(size) => {
            let elapsed = start.elapsed();
            metrics.record_success(elapsed, size);
            info!(
                file = %staged.source_name,
                output = %staged.display_name,
                converter = entry.converter.name(),
                size,
                elapsed_ms = elapsed.as_millis() as u64,
                "File converted"
            );
            ConversionResult::Converted(ConvertedFile {
                source_name: staged.source_name,
                display_name: staged.display_name,
                path: staged.output_path,
                size,
            })
        }
        Err((kind, message)) => {
            if kind == FailureKind::TimedOut {
                metrics.record_timeout();
            } else {
                metrics.record_failure();
            }
            warn!(
                file = %staged.source_name,
                converter = entry.converter.name(),
                kind = %kind,
                error = %message,
                "File conversion failed"
            );
            FsUtils::remove_file_quietly(&staged.output_path).await;
            failed(staged.source_name, kind, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;

    use super::*;
    use crate::converter::Converter;
    use crate::kind::ConversionKind;

    fn settings(root: &Path, failure_policy: FailurePolicy) -> DispatchSettings {
        DispatchSettings {
            upload_dir: root.join("uploads"),
            converted_dir: root.join("converted"),
            timeout: Duration::from_secs(30),
            max_concurrency: 4,
            failure_policy,
            min_output_bytes: 1,
            retain_files: false,
        }
    }

    fn dispatcher(settings: DispatchSettings, registry: ConverterRegistry) -> BatchDispatcher {
        BatchDispatcher::new(
            Arc::new(registry),
            settings,
            Arc::new(ConversionMetrics::new()),
        )
    }

    fn text_request(files: &[(&str, &[u8])]) -> ConversionRequest {
        ConversionRequest {
            kind: ConversionKind::TextUppercase,
            files: files
                .iter()
                .map(|(name, data)| UploadedFile::new(*name, data.to_vec()))
                .collect(),
        }
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    /// Sleeps for the number of milliseconds written in the input, then
    /// copies it to the output.
    #[derive(Debug)]
    struct DelayConverter;

    #[async_trait]
    impl Converter for DelayConverter {
        fn name(&self) -> &'static str {
            "delay"
        }

        async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
            let content = tokio::fs::read_to_string(input).await?;
            let millis: u64 = content.trim().parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            tokio::fs::write(output, content).await?;
            Ok(())
        }
    }

    /// Reports the tool's own timeout, as the ffmpeg executor does.
    #[derive(Debug)]
    struct ToolTimeoutConverter;

    #[async_trait]
    impl Converter for ToolTimeoutConverter {
        fn name(&self) -> &'static str {
            "tool-timeout"
        }

        async fn convert(&self, _input: &Path, _output: &Path) -> Result<(), ConversionError> {
            Err(ConversionError::TimedOut { timeout_seconds: 1 })
        }
    }

    fn count_files(dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .filter_map(Result::ok)
            .map(|entry| {
                let path = entry.path();
                if path.is_dir() { count_files(&path) } else { 1 }
            })
            .sum()
    }

    fn registry_with(kind: ConversionKind, converter: Arc<dyn Converter>) -> ConverterRegistry {
        let mut registry = ConverterRegistry::with_tools(None, 30);
        registry.register(ConverterEntry::new(kind, converter));
        registry
    }

    #[tokio::test]
    async fn test_isolate_mixed_batch_keeps_order() {
        let root = tempfile::tempdir().expect("tempdir");
        let dispatcher = dispatcher(
            settings(root.path(), FailurePolicy::Isolate),
            ConverterRegistry::with_tools(None, 30),
        );

        let batch = dispatcher
            .dispatch(text_request(&[
                ("a.txt", b"first"),
                ("b.pdf", b"%PDF"),
                ("c.TXT", &[0xff, 0xfe]),
                ("d.txt", b"last"),
            ]))
            .await
            .expect("dispatch");

        let names: Vec<_> = batch.results.iter().map(|r| r.source_name()).collect();
        assert_eq!(names, vec!["a.txt", "b.pdf", "c.TXT", "d.txt"]);

        let failures: Vec<_> = batch.failures().collect();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].kind, FailureKind::UnsupportedExtension);
        assert_eq!(failures[1].kind, FailureKind::ConversionFailed);
        assert!(failures[1].message.contains("UTF-8"));

        let converted: Vec<_> = batch.converted().collect();
        assert_eq!(converted[0].display_name, "a_uppercase.txt");
        assert_eq!(
            std::fs::read_to_string(&converted[0].path).expect("read"),
            "FIRST"
        );
        assert_eq!(converted[1].display_name, "d_uppercase.txt");

        dispatcher.release(&batch).await;
        assert!(!batch.workspace.output_dir.exists());
    }

    #[tokio::test]
    async fn test_isolate_preserves_order_under_concurrency() {
        let root = tempfile::tempdir().expect("tempdir");
        let dispatcher = dispatcher(
            settings(root.path(), FailurePolicy::Isolate),
            registry_with(ConversionKind::TextUppercase, Arc::new(DelayConverter)),
        );

        let batch = dispatcher
            .dispatch(text_request(&[
                ("slow.txt", b"300"),
                ("medium.txt", b"150"),
                ("fast.txt", b"0"),
            ]))
            .await
            .expect("dispatch");

        let names: Vec<_> = batch.converted().map(|f| f.source_name.as_str()).collect();
        assert_eq!(names, vec!["slow.txt", "medium.txt", "fast.txt"]);
    }

    #[tokio::test]
    async fn test_timeout_is_per_file_failure() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(root.path(), FailurePolicy::Isolate);
        settings.timeout = Duration::from_millis(200);
        let dispatcher = dispatcher(
            settings,
            registry_with(ConversionKind::TextUppercase, Arc::new(DelayConverter)),
        );

        let batch = dispatcher
            .dispatch(text_request(&[("stuck.txt", b"10000"), ("quick.txt", b"0")]))
            .await
            .expect("dispatch");

        let failures: Vec<_> = batch.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source_name, "stuck.txt");
        assert_eq!(failures[0].kind, FailureKind::TimedOut);
        assert_eq!(batch.converted_count(), 1);
        assert_eq!(dispatcher.metrics.snapshot().conversions_timed_out, 1);
    }

    #[tokio::test]
    async fn test_abort_rejects_mismatch_before_writing() {
        let root = tempfile::tempdir().expect("tempdir");
        let settings = settings(root.path(), FailurePolicy::Abort);
        let converted_dir = settings.converted_dir.clone();
        let dispatcher = dispatcher(settings, ConverterRegistry::with_tools(None, 30));

        let err = dispatcher
            .dispatch(text_request(&[("a.txt", b"ok"), ("b.pdf", b"%PDF")]))
            .await
            .expect_err("abort");

        assert!(matches!(err, ConversionError::UnsupportedExtension { ref file_name, .. } if file_name == "b.pdf"));
        assert!(dir_is_empty(&converted_dir));
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_conversion_failure() {
        let root = tempfile::tempdir().expect("tempdir");
        let settings = settings(root.path(), FailurePolicy::Abort);
        let converted_dir = settings.converted_dir.clone();
        let dispatcher = dispatcher(settings, ConverterRegistry::with_tools(None, 30));

        let err = dispatcher
            .dispatch(text_request(&[
                ("good.txt", b"fine"),
                ("bad.txt", &[0xc3, 0x28]),
                ("never.txt", b"unreached"),
            ]))
            .await
            .expect_err("abort");

        assert!(matches!(err, ConversionError::ConversionFailed { ref file_name, .. } if file_name == "bad.txt"));
        assert!(dir_is_empty(&converted_dir));
        assert_eq!(dispatcher.metrics.snapshot().conversions_started, 2);
    }

    #[tokio::test]
    async fn test_disabled_type_writes_nothing() {
        let root = tempfile::tempdir().expect("tempdir");
        let settings = settings(root.path(), FailurePolicy::Isolate);
        let upload_dir = settings.upload_dir.clone();
        let mut registry = ConverterRegistry::with_tools(None, 30);
        registry.set_enabled(ConversionKind::TextUppercase, false);
        let dispatcher = dispatcher(settings, registry);

        let err = dispatcher
            .dispatch(text_request(&[("a.txt", b"x")]))
            .await
            .expect_err("disabled");
        assert!(matches!(err, ConversionError::UnknownConversion { .. }));
        assert!(!upload_dir.exists());
    }

    #[tokio::test]
    async fn test_retain_files_keeps_workspace() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut settings = settings(root.path(), FailurePolicy::Isolate);
        settings.retain_files = true;
        let dispatcher = dispatcher(settings, ConverterRegistry::with_tools(None, 30));

        let batch = dispatcher
            .dispatch(text_request(&[("a.txt", b"keep me")]))
            .await
            .expect("dispatch");
        dispatcher.release(&batch).await;
        assert!(batch.workspace.output_dir.exists());
        assert!(batch.workspace.upload_dir.exists());
    }

    #[tokio::test]
    async fn test_tool_timeout_counts_as_timeout() {
        let root = tempfile::tempdir().expect("tempdir");
        let dispatcher = dispatcher(
            settings(root.path(), FailurePolicy::Isolate),
            registry_with(ConversionKind::TextUppercase, Arc::new(ToolTimeoutConverter)),
        );

        let batch = dispatcher
            .dispatch(text_request(&[("a.txt", b"x")]))
            .await
            .expect("dispatch");

        let failures: Vec<_> = batch.failures().collect();
        assert_eq!(failures[0].kind, FailureKind::TimedOut);
        let snapshot = dispatcher.metrics.snapshot();
        assert_eq!(snapshot.conversions_timed_out, 1);
        assert_eq!(snapshot.conversions_failed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_leaves_nothing_behind() {
        for policy in [FailurePolicy::Isolate, FailurePolicy::Abort] {
            let root = tempfile::tempdir().expect("tempdir");
            let dispatcher = dispatcher(
                settings(root.path(), policy),
                registry_with(ConversionKind::TextUppercase, Arc::new(DelayConverter)),
            );

            let cancelled = tokio::time::timeout(
                Duration::from_millis(100),
                dispatcher.dispatch(text_request(&[("a.txt", b"500"), ("b.txt", b"500")])),
            )
            .await;
            assert!(cancelled.is_err(), "{policy}: dispatch should still be running");

            // Give any orphaned conversion time to finish writing.
            tokio::time::sleep(Duration::from_secs(1)).await;

            assert_eq!(count_files(root.path()), 0, "{policy}: batch files left behind");
            assert!(dir_is_empty(&root.path().join("uploads")), "{policy}");
            assert!(dir_is_empty(&root.path().join("converted")), "{policy}");
        }
    }

    #[tokio::test]
    async fn test_dropped_batch_removes_workspace() {
        let root = tempfile::tempdir().expect("tempdir");
        let dispatcher = dispatcher(
            settings(root.path(), FailurePolicy::Isolate),
            ConverterRegistry::with_tools(None, 30),
        );

        let batch = dispatcher
            .dispatch(text_request(&[("a.txt", b"x"), ("b.txt", b"y")]))
            .await
            .expect("dispatch");
        let workspace = batch.workspace.clone();
        drop(batch);

        assert!(!workspace.upload_dir.exists());
        assert!(!workspace.output_dir.exists());
    }
}
