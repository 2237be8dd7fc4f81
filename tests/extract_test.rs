//! End-to-end tests of the extractor with a mock parsing collaborator.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pdf_extractor::config::ExtractionConfig;
use pdf_extractor::{
    BBox, Config, Error, ErrorKind, Extractor, JsonFileCache, MemoryCache, Page, PdfSource,
    RawExtraction, Result, Table, TextBlock,
};
use tempfile::TempDir;

/// Returns canned pages and counts calls; files named `broken*` fail to parse.
struct MockSource {
    calls: Arc<AtomicUsize>,
    paragraphs_per_page: usize,
}

impl MockSource {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            paragraphs_per_page: 3,
        }
    }

    fn with_paragraphs(mut self, count: usize) -> Self {
        self.paragraphs_per_page = count;
        self
    }
}

impl PdfSource for MockSource {
    fn extract(&self, path: &Path, _config: &ExtractionConfig) -> Result<RawExtraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stem = path.file_stem().unwrap().to_string_lossy();
        if stem.starts_with("broken") {
            return Err(Error::PdfParse("unexpected end of file".into()));
        }
        Ok(sample_document(3, self.paragraphs_per_page))
    }
}

/// Pages with a running header, a page footer, body paragraphs and one table.
fn sample_document(pages: u32, paragraphs: usize) -> RawExtraction {
    let mut result = Vec::new();
    for n in 1..=pages {
        let mut page = Page::letter(n);
        page.add_block(TextBlock::new(n, BBox::new(50.0, 20.0, 560.0, 35.0), "Dungeon Guide"));
        if n == 1 {
            page.add_block(
                TextBlock::new(n, BBox::new(50.0, 90.0, 560.0, 110.0), "CHAPTER 1 The Beginning")
                    .with_font_size(18.0),
            );
        }
        let step = 560.0 / (paragraphs as f32 + 2.0);
        for i in 0..paragraphs {
            let y = 120.0 + i as f32 * step.min(40.0);
            let text = format!(
                "Paragraph {}.{} describes the dungeon at some length so that\nthe text wraps onto a second line of the block.",
                n, i
            );
            page.add_block(
                TextBlock::new(n, BBox::new(50.0, y, 560.0, y + 24.0), text).with_font_size(10.0),
            );
        }
        if n == 2 {
            page.add_table(Table::new(
                n,
                BBox::new(50.0, 600.0, 560.0, 680.0),
                vec![
                    vec!["Item".into(), "Cost".into()],
                    vec!["Rope".into(), "1 gp".into()],
                    vec!["Torch".into(), "1 cp".into()],
                ],
            ));
        }
        page.add_block(TextBlock::new(
            n,
            BBox::new(250.0, 760.0, 360.0, 775.0),
            format!("Page {} of {}", n, pages),
        ));
        result.push(page);
    }
    RawExtraction::new(result)
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("output").join("markdown")
    }

    fn cache(&self) -> PathBuf {
        self.dir.path().join("output").join("raw")
    }

    fn config(&self) -> Config {
        Config::default()
            .with_output_dir(self.output())
            .with_cache_dir(self.cache())
    }

    /// Write a file with a PDF header; `seed` keeps content hashes distinct.
    fn pdf(&self, name: &str, seed: &str) -> PathBuf {
        fs::create_dir_all(self.input()).unwrap();
        let path = self.input().join(name);
        fs::write(&path, format!("%PDF-1.4\n% {}\n%%EOF\n", seed)).unwrap();
        path
    }
}

#[test]
fn test_single_file_markdown() {
    let ws = Workspace::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(calls.clone()))
        .with_cache(MemoryCache::new());

    let path = ws.pdf("guide.pdf", "guide");
    let extraction = extractor.extract_file(&path).unwrap();
    let markdown = &extraction.markdown;

    assert!(markdown.starts_with("# CHAPTER 1 The Beginning\n\nParagraph 1.0"));
    assert!(markdown.ends_with('\n') && !markdown.ends_with("\n\n"));
    assert!(!markdown.contains("Dungeon Guide"));
    assert!(!markdown.contains("of 3"));
    assert!(markdown.contains("<!-- page 2 -->"));
    assert!(markdown.contains("<!-- page 3 -->"));
    assert!(!markdown.contains("<!-- page 1 -->"));
    assert!(markdown.contains("| Item  | Cost |\n| ----- | ---- |"));

    let stats = &extraction.document.stats;
    assert_eq!(stats.total_pages, 3);
    assert_eq!(stats.tables, 1);
    assert_eq!(stats.headings, 1);
    assert_eq!(stats.suppressed_blocks, 6);
    assert_eq!(extraction.chunks.len(), 1);
    assert_eq!(extraction.hash.len(), 64);
}

#[test]
fn test_cache_idempotence() {
    let ws = Workspace::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(calls.clone()))
        .with_cache(MemoryCache::new());
    let path = ws.pdf("guide.pdf", "guide");

    let first = extractor.extract_file(&path).unwrap();
    let second = extractor.extract_file(&path).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.markdown, second.markdown);
}

#[test]
fn test_json_cache_survives_new_extractor() {
    let ws = Workspace::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let path = ws.pdf("guide.pdf", "guide");

    let first = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(calls.clone()))
        .with_cache(JsonFileCache::new(ws.cache()));
    let markdown = first.extract_file(&path).unwrap().markdown;

    let second = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(calls.clone()))
        .with_cache(JsonFileCache::new(ws.cache()));
    let cached = second.extract_file(&path).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cached.from_cache);
    assert_eq!(cached.markdown, markdown);
    assert!(ws.cache().join(format!("{}.json", cached.hash)).is_file());
}

#[test]
fn test_batch_isolates_failures() {
    let ws = Workspace::new();
    let calls = Arc::new(AtomicUsize::new(0));
    ws.pdf("alpha.pdf", "alpha");
    ws.pdf("broken.pdf", "broken");
    ws.pdf("gamma.pdf", "gamma");
    fs::write(ws.input().join("fake.pdf"), b"<html>not a pdf</html>").unwrap();
    fs::write(ws.input().join("empty.pdf"), b"").unwrap();
    fs::write(ws.input().join("notes.txt"), b"ignored").unwrap();

    let extractor = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(calls.clone()))
        .with_cache(MemoryCache::new());
    let report = extractor.process_dir(ws.input()).unwrap();

    let names: Vec<String> = report.files.iter().map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["alpha.pdf", "broken.pdf", "empty.pdf", "fake.pdf", "gamma.pdf"]);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 3);
    assert_eq!(report.cached(), 0);

    let kinds: Vec<ErrorKind> = report.failures().map(|(_, f)| f.kind).collect();
    assert_eq!(
        kinds,
        vec![ErrorKind::Extraction, ErrorKind::InvalidInput, ErrorKind::InvalidInput]
    );
    // Invalid inputs never reach the parser.
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert!(ws.output().join("alpha.md").is_file());
    assert!(ws.output().join("gamma.md").is_file());
    assert!(!ws.output().join("broken.md").exists());
}

#[test]
fn test_index_file() {
    let ws = Workspace::new();
    let calls = Arc::new(AtomicUsize::new(0));
    ws.pdf("alpha.pdf", "alpha");
    ws.pdf("broken.pdf", "broken");

    let extractor = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(calls))
        .with_cache(MemoryCache::new());
    let report = extractor.process_dir(ws.input()).unwrap();

    let index_path = report.index.clone().unwrap();
    assert_eq!(index_path, ws.output().join("INDEX.md"));
    let index = fs::read_to_string(index_path).unwrap();
    assert!(index.starts_with("# PDF Content Index"));
    assert!(index.contains("## alpha.pdf\n- Pages: 3\n"));
    assert!(index.contains("- Tables: 1\n"));
    assert!(index.contains("- File: [alpha.pdf](./alpha.md)"));
    assert!(index.contains("## Failed\n- broken.pdf: PDF parsing error: unexpected end of file"));
}

#[test]
fn test_index_disabled() {
    let ws = Workspace::new();
    ws.pdf("alpha.pdf", "alpha");
    let mut config = ws.config();
    config.output.create_index = false;

    let extractor = Extractor::new(config)
        .unwrap()
        .with_source(MockSource::new(Arc::new(AtomicUsize::new(0))))
        .with_cache(MemoryCache::new());
    let report = extractor.process_dir(ws.input()).unwrap();

    assert!(report.index.is_none());
    assert!(!ws.output().join("INDEX.md").exists());
}

#[test]
fn test_chunk_files() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.output.chunk_size_kb = 1;
    let path = ws.pdf("long.pdf", "long");

    let extractor = Extractor::new(config)
        .unwrap()
        .with_source(MockSource::new(Arc::new(AtomicUsize::new(0))).with_paragraphs(10))
        .with_cache(MemoryCache::new());
    let report = extractor.process_file(&path);
    let summary = report.outcome.unwrap();

    assert!(summary.parts.len() > 1);
    assert_eq!(summary.parts[0], ws.output().join("long_part001.md"));
    assert_eq!(summary.parts[1], ws.output().join("long_part002.md"));

    let full = fs::read_to_string(&summary.output).unwrap();
    let joined: String = summary
        .parts
        .iter()
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();
    assert_eq!(joined, full);
    for part in &summary.parts {
        let text = fs::read_to_string(part).unwrap();
        assert!(!text.is_empty());
        assert!(text.len() <= 1024 || !text.trim_end().contains("\n\n"));
    }
}

#[test]
fn test_no_parts_without_chunking() {
    let ws = Workspace::new();
    let path = ws.pdf("short.pdf", "short");
    let extractor = Extractor::new(ws.config())
        .unwrap()
        .with_source(MockSource::new(Arc::new(AtomicUsize::new(0))))
        .with_cache(MemoryCache::new());

    let summary = extractor.process_file(&path).outcome.unwrap();
    assert!(summary.parts.is_empty());
    assert!(!ws.output().join("short_part001.md").exists());
}

#[test]
fn test_missing_input_dir() {
    let ws = Workspace::new();
    let extractor = Extractor::new(ws.config()).unwrap();
    let err = extractor.process_dir(ws.dir.path().join("nope")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = Config::default();
    config.extraction.column_threshold = 1.5;
    let err = Extractor::new(config).err().unwrap();
    assert!(err.is_fatal());
}
