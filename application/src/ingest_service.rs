use anyhow::Context;
use domain::ports::{DocumentIndex, Embedder};
use infrastructure::embedder::BatchEmbedder;
use infrastructure::file_scanner::{scan_text, FileScanResult, FileScanner};
use infrastructure::wiki_source::WikiSource;
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub sources_scanned: usize,
    pub sources_unchanged: usize,
    pub sources_skipped: usize,
    pub chunks_indexed: usize,
}

/// Scans a document tree or a wiki, embeds new or changed sources and
/// writes them to the configured index.
pub struct IngestService {
    embedder: BatchEmbedder,
    index: Arc<dyn DocumentIndex>,
}

impl IngestService {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn DocumentIndex>) -> Self {
        Self {
            embedder: BatchEmbedder::new(embedder),
            index,
        }
    }

    pub async fn ingest(&self, root: impl Into<PathBuf>, recreate: bool) -> Result<IngestReport> {
        let root = root.into();
        let timer = Telemetry::new();
        anyhow::ensure!(root.exists(), "path {} does not exist", root.display());

        self.prepare(recreate).await?;
        let scan_root = root.clone();
        let scanned = tokio::task::spawn_blocking(move || FileScanner::new(scan_root).scan_files())
            .await
            .context("File scan task failed")??;
        tracing::info!(root = %root.display(), files = scanned.len(), "scanned document tree");

        self.index_scanned(scanned, timer).await
    }

    /// Same pipeline as `ingest`, fed by the pages of an Azure DevOps Wiki.
    pub async fn ingest_wiki(&self, wiki: &WikiSource, recreate: bool) -> Result<IngestReport> {
        let timer = Telemetry::new();
        self.prepare(recreate).await?;
        let pages = wiki.fetch_pages().await.context("Failed to read the wiki")?;
        let scanned = pages
            .iter()
            .map(|page| scan_text(page.source(), &page.text))
            .collect();
        self.index_scanned(scanned, timer).await
    }

    async fn prepare(&self, recreate: bool) -> Result<()> {
        self.index
            .prepare(recreate)
            .await
            .context("Failed to prepare the search index")
    }

    async fn index_scanned(&self, scanned: Vec<FileScanResult>, timer: Telemetry) -> Result<IngestReport> {
        let mut report = IngestReport {
            sources_scanned: scanned.len(),
            ..IngestReport::default()
        };
        for item in scanned {
            if item.hash.is_empty() {
                report.sources_skipped += 1;
                continue;
            }
            let previous = self
                .index
                .fingerprint(&item.source)
                .await
                .with_context(|| format!("Failed to read fingerprint for {}", item.source))?;
            if previous.as_deref() == Some(item.hash.as_str()) {
                tracing::debug!(source = %item.source, "unchanged, skipping");
                report.sources_unchanged += 1;
                continue;
            }

            let documents = self
                .embedder
                .embed_chunks(&item.chunks)
                .await
                .with_context(|| format!("Failed to embed {}", item.source))?;
            let count = documents.len();
            self.index
                .replace_source(&item.source, &item.hash, documents)
                .await
                .with_context(|| format!("Failed to index {}", item.source))?;
            tracing::info!(source = %item.source, chunks = count, "indexed source");
            report.chunks_indexed += count;
        }

        tracing::info!(
            sources = report.sources_scanned,
            unchanged = report.sources_unchanged,
            chunks = report.chunks_indexed,
            elapsed_ms = timer.elapsed_ms(),
            "ingest finished"
        );
        Ok(report)
    }
}
