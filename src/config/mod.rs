//! Extraction configuration.
//!
//! A [`Config`] is loaded once (from YAML or a [`Preset`]) and then passed by
//! reference into every component. Nothing reads configuration from global state.

mod presets;

pub use presets::Preset;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::render::HeadingClassifier;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Block extraction and layout settings.
    pub extraction: ExtractionConfig,
    /// Markdown generation settings.
    pub markdown: MarkdownConfig,
    /// Output artifacts.
    pub output: OutputConfig,
    /// Logging setup used by the CLI.
    pub logging: LoggingConfig,
}

/// Settings for the text-block and table extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Blocks whose trimmed text has fewer characters are dropped.
    pub min_text_length: usize,
    /// Reorder blocks into reading order; when false, extraction order is kept.
    pub sort_blocks: bool,
    /// Column-detection threshold as a fraction (0..1).
    pub column_threshold: f32,
    /// Run the repeating header/footer pass.
    pub detect_headers_footers: bool,
    /// Fraction of the page height treated as top/bottom margin zone.
    pub header_footer_margin: f32,
    /// A margin text is repeating when it appears on more than this fraction of pages.
    pub header_footer_repeat_ratio: f32,
    /// Documents with fewer pages never have headers/footers removed.
    pub header_footer_min_pages: usize,
    /// Table detection settings.
    pub table_settings: TableSettings,
    /// Substrings that flag a block as special (e.g. stat blocks).
    pub block_indicators: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_length: 0,
            sort_blocks: true,
            column_threshold: 0.3,
            detect_headers_footers: true,
            header_footer_margin: 0.1,
            header_footer_repeat_ratio: 0.5,
            header_footer_min_pages: 2,
            table_settings: TableSettings::default(),
            block_indicators: Vec::new(),
        }
    }
}

/// How table edges are found along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStrategy {
    /// Ruling lines and rectangle borders.
    Lines,
    /// Ruling lines only; rectangle borders are ignored.
    LinesStrict,
    /// Alignment of words.
    Text,
}

impl TableStrategy {
    /// Whether this strategy uses drawn edges.
    pub fn uses_edges(self) -> bool {
        matches!(self, TableStrategy::Lines | TableStrategy::LinesStrict)
    }
}

/// Table detection settings handed to the parsing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub vertical_strategy: TableStrategy,
    pub horizontal_strategy: TableStrategy,
    /// Edges shorter than this (points) are ignored.
    pub edge_min_length: f32,
    /// Minimum words per row for the text strategy.
    pub min_words_horizontal: usize,
    /// Minimum words per column for the text strategy.
    pub min_words_vertical: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            vertical_strategy: TableStrategy::Lines,
            horizontal_strategy: TableStrategy::Lines,
            edge_min_length: 3.0,
            min_words_horizontal: 1,
            min_words_vertical: 1,
        }
    }
}

/// Inline formatting that survives into the markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formatting {
    Bold,
    Italic,
    Lists,
}

/// Markdown generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Patterns producing level-1 headings, tried first.
    pub chapter_patterns: Vec<String>,
    /// Patterns producing level-2 headings.
    pub section_patterns: Vec<String>,
    /// Formatting kept in the output.
    pub preserve_formatting: Vec<Formatting>,
    /// Font-size ratio over the body size that marks a heading (0 disables).
    pub heading_font_ratio: f32,
    /// Lines longer than this are never font-size headings.
    pub max_heading_length: usize,
    /// Text cleaning toggles.
    pub text_cleaning: TextCleaning,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            chapter_patterns: vec![r"^CHAPTER\s+\d+".into(), r"^Chapter\s+\d+".into()],
            section_patterns: vec![r"^[A-Z][A-Z\s]+$".into()],
            preserve_formatting: vec![Formatting::Bold, Formatting::Italic, Formatting::Lists],
            heading_font_ratio: 1.3,
            max_heading_length: 120,
            text_cleaning: TextCleaning::default(),
        }
    }
}

impl MarkdownConfig {
    /// Whether the given formatting kind is preserved.
    pub fn preserves(&self, kind: Formatting) -> bool {
        self.preserve_formatting.contains(&kind)
    }
}

/// Individually toggleable cleaning steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextCleaning {
    pub normalize_unicode: bool,
    pub normalize_whitespace: bool,
    pub dehyphenate: bool,
    pub normalize_quotes: bool,
    pub render_tables: bool,
    pub remove_headers: bool,
    pub remove_footers: bool,
}

impl Default for TextCleaning {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_whitespace: true,
            dehyphenate: true,
            normalize_quotes: true,
            render_tables: true,
            remove_headers: true,
            remove_footers: true,
        }
    }
}

/// Output artifact settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the markdown files and `INDEX.md`.
    pub directory: PathBuf,
    /// Directory of the JSON extraction cache.
    pub cache_dir: PathBuf,
    /// Chunk budget in KiB; 0 disables chunking.
    pub chunk_size_kb: u64,
    /// Write `INDEX.md` after a batch.
    pub create_index: bool,
    /// Marker inserted between pages; `{page}` is replaced by the next page number.
    pub page_separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output/markdown"),
            cache_dir: PathBuf::from("output/raw"),
            chunk_size_kb: 0,
            create_index: true,
            page_separator: "<!-- page {page} -->".into(),
        }
    }
}

impl OutputConfig {
    /// Chunk budget in bytes, `None` when chunking is disabled.
    pub fn chunk_budget(&self) -> Option<usize> {
        (self.chunk_size_kb > 0).then(|| (self.chunk_size_kb as usize).saturating_mul(1024))
    }
}

/// Logging settings, applied by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive understood by `env_logger` (e.g. `info`, `warn`).
    pub level: String,
    /// Optional log file receiving a copy of every record.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
        }
    }
}

impl Config {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults (with a warning). A file that exists but
    /// cannot be parsed or validated is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration of a named preset.
    pub fn from_preset(name: &str) -> Result<Self> {
        Ok(Preset::from_name(name)?.config())
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Replace extraction and markdown settings with those of a preset, keeping
    /// output locations.
    pub fn with_preset(mut self, preset: Preset) -> Self {
        let preset_config = preset.config();
        self.extraction = preset_config.extraction;
        self.markdown = preset_config.markdown;
        self.output.chunk_size_kb = preset_config.output.chunk_size_kb;
        self.output.create_index = preset_config.output.create_index;
        self.logging.level = preset_config.logging.level;
        self
    }

    /// Set the markdown output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.directory = dir.into();
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.cache_dir = dir.into();
        self
    }

    /// Check value ranges and compile every pattern once.
    pub fn validate(&self) -> Result<()> {
        let ex = &self.extraction;
        check_fraction("extraction.column_threshold", ex.column_threshold)?;
        check_fraction(
            "extraction.header_footer_repeat_ratio",
            ex.header_footer_repeat_ratio,
        )?;
        if !(ex.header_footer_margin > 0.0 && ex.header_footer_margin < 0.5) {
            return Err(Error::Config(format!(
                "extraction.header_footer_margin must be in (0, 0.5), got {}",
                ex.header_footer_margin
            )));
        }
        if ex.table_settings.edge_min_length < 0.0 {
            return Err(Error::Config(
                "extraction.table_settings.edge_min_length must not be negative".into(),
            ));
        }
        if self.markdown.heading_font_ratio < 0.0 {
            return Err(Error::Config(
                "markdown.heading_font_ratio must not be negative".into(),
            ));
        }
        HeadingClassifier::new(&self.markdown)?;
        Ok(())
    }
}

fn check_fraction(key: &str, value: f32) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{key} must be in (0, 1), got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.extraction.min_text_length, 0);
        assert_eq!(config.extraction.header_footer_min_pages, 2);
        assert!((config.extraction.column_threshold - 0.3).abs() < f32::EPSILON);
        assert!(config.markdown.text_cleaning.dehyphenate);
        assert_eq!(config.output.chunk_budget(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
extraction:
  min_text_length: 3
  table_settings:
    vertical_strategy: lines_strict
markdown:
  text_cleaning:
    dehyphenate: false
output:
  chunk_size_kb: 2
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.extraction.min_text_length, 3);
        assert!(config.extraction.sort_blocks);
        assert_eq!(
            config.extraction.table_settings.vertical_strategy,
            TableStrategy::LinesStrict
        );
        assert_eq!(
            config.extraction.table_settings.horizontal_strategy,
            TableStrategy::Lines
        );
        assert!(!config.markdown.text_cleaning.dehyphenate);
        assert!(config.markdown.text_cleaning.normalize_quotes);
        assert_eq!(config.output.chunk_budget(), Some(2048));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = Config::from_yaml_str("extraction: [unclosed").unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let err = Config::from_yaml_str("extraction:\n  min_text_length: lots\n").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = Config::from_yaml_str("extraction:\n  column_threshold: 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_yaml_str("extraction:\n  header_footer_margin: 0.6\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let yaml = "markdown:\n  chapter_patterns: ['^CHAPTER (']\n";
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "output:\n  create_index: false\n  page_separator: ''").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.output.create_index);
        assert!(config.output.page_separator.is_empty());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::from_preset("tables").unwrap();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(Config::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_with_preset_keeps_output_dirs() {
        let config = Config::new()
            .with_output_dir("out/md")
            .with_preset(Preset::Simple);
        assert_eq!(config.output.directory, PathBuf::from("out/md"));
        assert!(!config.extraction.sort_blocks);
        assert!(!config.output.create_index);
    }
}
