use crate::document_reader::read_document;
use domain::models::DocumentChunk;
use rayon::prelude::*;
use shared::types::Result;
use shared::utils::{collapse_whitespace, is_supported_file};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Paragraphs shorter than this carry too little to be worth embedding.
pub const MIN_CHUNK_CHARS: usize = 100;

pub struct FileScanner {
    root_path: PathBuf,
    ignored_dirs: HashSet<String>,
    max_file_bytes: u64,
}

impl FileScanner {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ignored_dirs: [
                ".git",
                "target",
                "node_modules",
                ".next",
                "dist",
                "build",
                ".idea",
                ".vscode",
                ".cache",
                "venv",
                "__pycache__",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            // Cap per-file scanning to keep ingestion responsive.
            max_file_bytes: 2 * 1024 * 1024,
        }
    }

    pub fn scan_files(&self) -> Result<Vec<FileScanResult>> {
        let files = self.collect_files()?;
        self.scan_paths(&files)
    }

    pub fn scan_paths(&self, paths: &[PathBuf]) -> Result<Vec<FileScanResult>> {
        tracing::debug!(files = paths.len(), "scanning files");
        paths
            .par_iter()
            .map(|path| self.load_and_chunk_file(path))
            .collect()
    }

    /// Supported files under the root, sorted for a stable ingest order. A
    /// root that is itself a file yields just that file.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if self.root_path.is_file() {
            if is_supported_file(&self.root_path) {
                files.push(self.root_path.clone());
            }
            return Ok(files);
        }
        self.collect_files_recursive(&self.root_path, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn collect_files_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if self.ignored_dirs.contains(name) {
                        continue;
                    }
                }
                self.collect_files_recursive(&path, files)?;
            } else if is_supported_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Source label for a path: relative to the root, `/`-separated.
    pub fn source_for(&self, path: &Path) -> String {
        let relative = if self.root_path.is_file() {
            path.file_name().map(Path::new).unwrap_or(path)
        } else {
            path.strip_prefix(&self.root_path).unwrap_or(path)
        };
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn load_and_chunk_file(&self, path: &Path) -> Result<FileScanResult> {
        let source = self.source_for(path);
        if let Ok(meta) = path.metadata() {
            if meta.len() > self.max_file_bytes {
                tracing::warn!(source = %source, bytes = meta.len(), "skipping oversized file");
                return Ok(FileScanResult {
                    source,
                    hash: String::new(),
                    chunks: Vec::new(),
                });
            }
        }
        let content = read_document(path)?;
        Ok(scan_text(source, &content))
    }
}

/// Fingerprint and chunk text from any source, file or not.
pub fn scan_text(source: impl Into<String>, text: &str) -> FileScanResult {
    let source = source.into();
    FileScanResult {
        hash: format!("{:x}", md5::compute(text.as_bytes())),
        chunks: chunk_text(text, &source),
        source,
    }
}

/// Split on blank lines, collapse whitespace, drop short and repeated
/// paragraphs. Chunk ids are `"{chunk_prefix}-chunk{n}"`, 1-based.
pub fn chunk_text(text: &str, source: &str) -> Vec<DocumentChunk> {
    let prefix = chunk_prefix(source);
    let text = text.replace("\r\n", "\n");
    let mut seen_hashes = HashSet::new();
    let mut chunks = Vec::new();

    for paragraph in text.split("\n\n") {
        let clean = collapse_whitespace(paragraph);
        if clean.chars().count() < MIN_CHUNK_CHARS {
            continue;
        }
        let hash = format!("{:x}", md5::compute(clean.as_bytes()));
        if !seen_hashes.insert(hash) {
            continue;
        }
        chunks.push(DocumentChunk {
            id: format!("{}-chunk{}", prefix, chunks.len() + 1),
            source: source.to_string(),
            content: clean,
        });
    }
    chunks
}

/// `safe_id` plus the first 8 hex digits of the source's md5. Distinct
/// sources never share a prefix even when their `safe_id`s match.
pub fn chunk_prefix(source: &str) -> String {
    let digest = format!("{:x}", md5::compute(source.as_bytes()));
    format!("{}-{}", safe_id(source), &digest[..8])
}

/// Index keys allow letters, digits, `_`, `-` and `=` only.
pub fn safe_id(source: &str) -> String {
    source
        .trim_start_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '=' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FileScanResult {
    pub source: String,
    pub hash: String,
    pub chunks: Vec<DocumentChunk>,
}
