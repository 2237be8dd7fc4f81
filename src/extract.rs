//! Per-file and batch extraction.
//!
//! [`Extractor`] ties the collaborators together: it validates the input, looks up
//! the cache, calls the [`PdfSource`] on a miss, runs the [`Pipeline`] and writes
//! the markdown artifacts.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::cache::{file_hash, CacheStore, JsonFileCache};
use crate::config::Config;
use crate::detect::{has_pdf_extension, validate_pdf};
use crate::error::{Error, ErrorKind, Result};
use crate::model::{Document, RawExtraction};
use crate::parser::{LopdfSource, PdfSource};
use crate::pipeline::Pipeline;
use crate::render::{Chunk, Chunker};

/// Name of the batch index file.
pub const INDEX_FILE: &str = "INDEX.md";

/// Result of extracting one file, before anything is written.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Input file
    pub path: PathBuf,
    /// SHA-256 of the input bytes
    pub hash: String,
    /// The raw pages came from the cache
    pub from_cache: bool,
    pub document: Document,
    /// Final markdown text
    pub markdown: String,
    /// Chunks of `markdown`; a single chunk when chunking is off
    pub chunks: Vec<Chunk>,
}

/// Summary of a successfully processed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub pages: usize,
    pub text_blocks: usize,
    pub tables: usize,
    pub from_cache: bool,
    /// The `{stem}.md` file
    pub output: PathBuf,
    /// `{stem}_partNNN.md` files, empty unless the document was split
    pub parts: Vec<PathBuf>,
}

/// Why a file could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub kind: ErrorKind,
    pub reason: String,
    pub hint: Option<String>,
}

impl From<&Error> for FileFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            reason: err.to_string(),
            hint: err.hint().map(str::to_string),
        }
    }
}

/// Outcome for one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: std::result::Result<FileSummary, FileFailure>,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// File name for display.
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Outcome of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// Path of the written index, if any
    pub index: Option<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    /// Successful files whose raw pages came from the cache.
    pub fn cached(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(&f.outcome, Ok(summary) if summary.from_cache))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileReport, &FileFailure)> {
        self.files
            .iter()
            .filter_map(|f| f.outcome.as_ref().err().map(|e| (f, e)))
    }
}

/// Converts PDF files to markdown with the configured collaborators.
pub struct Extractor {
    config: Config,
    pipeline: Pipeline,
    chunker: Chunker,
    source: Box<dyn PdfSource>,
    cache: Box<dyn CacheStore>,
}

impl Extractor {
    /// Create an extractor using lopdf and a JSON file cache in `output.cache_dir`.
    ///
    /// Fails when the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let pipeline = Pipeline::new(&config)?;
        let chunker = Chunker::new(config.output.chunk_budget());
        let cache = JsonFileCache::new(config.output.cache_dir.clone());
        Ok(Self {
            config,
            pipeline,
            chunker,
            source: Box::new(LopdfSource::new()),
            cache: Box::new(cache),
        })
    }

    /// Replace the PDF-parsing collaborator.
    pub fn with_source<S: PdfSource + 'static>(mut self, source: S) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Replace the cache store.
    pub fn with_cache<C: CacheStore + 'static>(mut self, cache: C) -> Self {
        self.cache = Box::new(cache);
        self
    }

    /// Write outputs to `dir` instead of `output.directory`.
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.output.directory = dir.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory receiving the markdown files.
    pub fn output_dir(&self) -> &Path {
        &self.config.output.directory
    }

    /// Extract one file without writing anything.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Extraction> {
        let path = path.as_ref();
        validate_pdf(path)?;
        log::info!("Processing {}", path.display());

        let hash = file_hash(path)?;
        let (raw, from_cache) = match self.cached(&hash) {
            Some(raw) => {
                log::info!("Using cached extraction for {}", display_name(path));
                (raw, true)
            }
            None => {
                let raw = self.source.extract(path, &self.config.extraction)?;
                if let Err(e) = self.cache.put(&hash, &raw) {
                    log::warn!("Could not cache extraction of {}: {}", path.display(), e);
                }
                (raw, false)
            }
        };

        let document = self.pipeline.run(&raw);
        let markdown = document.to_markdown();
        let chunks = self.chunker.chunk(&markdown);

        Ok(Extraction {
            path: path.to_path_buf(),
            hash,
            from_cache,
            document,
            markdown,
            chunks,
        })
    }

    fn cached(&self, hash: &str) -> Option<RawExtraction> {
        match self.cache.get(hash) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Cache lookup failed for {}: {}", hash, e);
                None
            }
        }
    }

    /// Extract one file and write `{stem}.md` (plus part files when split).
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> FileReport {
        let path = path.as_ref();
        let outcome = self
            .extract_file(path)
            .and_then(|extraction| self.write_outputs(&extraction))
            .map_err(|e| {
                log::warn!("Failed to process {}: {}", path.display(), e);
                FileFailure::from(&e)
            });
        FileReport {
            path: path.to_path_buf(),
            outcome,
        }
    }

    fn write_outputs(&self, extraction: &Extraction) -> Result<FileSummary> {
        let dir = self.output_dir();
        fs::create_dir_all(dir)?;

        let stem = extraction
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let output = dir.join(format!("{}.md", stem));
        fs::write(&output, &extraction.markdown)?;

        let mut parts = Vec::new();
        if extraction.chunks.len() > 1 {
            for chunk in &extraction.chunks {
                let part = dir.join(format!("{}_part{:03}.md", stem, chunk.index));
                fs::write(&part, &chunk.text)?;
                parts.push(part);
            }
        }
        log::info!("Saved {} ({} parts)", output.display(), parts.len());

        let stats = &extraction.document.stats;
        Ok(FileSummary {
            pages: stats.total_pages,
            text_blocks: stats.text_blocks,
            tables: stats.tables,
            from_cache: extraction.from_cache,
            output,
            parts,
        })
    }

    /// Process files in parallel; the report keeps the input order.
    pub fn process_files(&self, paths: &[PathBuf]) -> BatchReport {
        self.process_files_with(paths, |_| {})
    }

    /// Like [`process_files`](Self::process_files), calling `on_done` as each file finishes.
    pub fn process_files_with<F>(&self, paths: &[PathBuf], on_done: F) -> BatchReport
    where
        F: Fn(&FileReport) + Sync + Send,
    {
        let files: Vec<FileReport> = paths
            .par_iter()
            .map(|path| {
                let report = self.process_file(path);
                on_done(&report);
                report
            })
            .collect();

        let mut report = BatchReport { files, index: None };
        if self.config.output.create_index {
            match self.write_index(&report) {
                Ok(path) => report.index = Some(path),
                Err(e) => log::warn!("Could not write index: {}", e),
            }
        }
        log::info!(
            "Batch finished: {} succeeded, {} failed, {} cached",
            report.succeeded(),
            report.failed(),
            report.cached()
        );
        report
    }

    /// Process every PDF directly inside `dir`.
    ///
    /// A missing directory or one without PDFs is an input error.
    pub fn process_dir<P: AsRef<Path>>(&self, dir: P) -> Result<BatchReport> {
        let files = list_pdfs(dir)?;
        Ok(self.process_files(&files))
    }

    /// Write `INDEX.md` for a batch and return its path.
    pub fn write_index(&self, report: &BatchReport) -> Result<PathBuf> {
        let dir = self.output_dir();
        fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);
        fs::write(&path, render_index(report))?;
        log::info!("Created index {}", path.display());
        Ok(path)
    }
}

/// Markdown text of the batch index.
pub fn render_index(report: &BatchReport) -> String {
    let mut out = String::from("# PDF Content Index\n\n");
    let _ = writeln!(
        out,
        "_Generated {}_\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    for file in &report.files {
        let Ok(summary) = &file.outcome else {
            continue;
        };
        let name = file.file_name();
        let link = summary
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "## {}", name);
        let _ = writeln!(out, "- Pages: {}", summary.pages);
        let _ = writeln!(out, "- Text blocks: {}", summary.text_blocks);
        let _ = writeln!(out, "- Tables: {}", summary.tables);
        let _ = writeln!(out, "- File: [{}](./{})\n", name, link);
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        out.push_str("## Failed\n");
        for (file, failure) in failures {
            let _ = writeln!(out, "- {}: {}", file.file_name(), failure.reason);
        }
    }
    out
}

/// PDF files directly inside `dir`, sorted by name.
pub fn list_pdfs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_pdf_extension(p))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(Error::InvalidInput(format!(
            "No PDF files found in {}",
            dir.display()
        )));
    }
    log::info!("Found {} PDFs in {}", files.len(), dir.display());
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
