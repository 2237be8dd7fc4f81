//! Ready-made configurations for common documents.

use std::fmt;

use super::{
    Config, ExtractionConfig, Formatting, LoggingConfig, MarkdownConfig, OutputConfig,
    TableSettings, TableStrategy, TextCleaning,
};
use crate::error::{Error, Result};

/// Named configuration preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Fast extraction with minimal processing.
    Simple,
    /// Everything enabled; the recommended default.
    Detailed,
    /// Tuned for tabular documents.
    Tables,
}

impl Preset {
    /// All presets, in display order.
    pub const ALL: [Preset; 3] = [Preset::Simple, Preset::Detailed, Preset::Tables];

    /// Look up a preset by name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| Error::UnknownPreset(name.to_string(), Self::names().join(", ")))
    }

    /// Names of all presets.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.name()).collect()
    }

    /// Lowercase name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Preset::Simple => "simple",
            Preset::Detailed => "detailed",
            Preset::Tables => "tables",
        }
    }

    /// One-line description for interactive mode and `--list-presets`.
    pub fn description(self) -> &'static str {
        match self {
            Preset::Simple => "Fast extraction with minimal processing (best for simple PDFs)",
            Preset::Detailed => {
                "Full-featured extraction with tables and header/footer removal (recommended)"
            }
            Preset::Tables => "Focused on table extraction (best for spreadsheets and forms)",
        }
    }

    /// Build the full configuration for this preset.
    pub fn config(self) -> Config {
        match self {
            Preset::Simple => Config {
                extraction: ExtractionConfig {
                    min_text_length: 10,
                    sort_blocks: false,
                    detect_headers_footers: false,
                    ..ExtractionConfig::default()
                },
                markdown: MarkdownConfig {
                    chapter_patterns: Vec::new(),
                    section_patterns: Vec::new(),
                    heading_font_ratio: 0.0,
                    text_cleaning: TextCleaning {
                        render_tables: false,
                        remove_headers: false,
                        remove_footers: false,
                        ..TextCleaning::default()
                    },
                    ..MarkdownConfig::default()
                },
                output: OutputConfig {
                    chunk_size_kb: 0,
                    create_index: false,
                    ..OutputConfig::default()
                },
                logging: LoggingConfig {
                    level: "warn".into(),
                    file: None,
                },
            },
            Preset::Detailed => Config {
                extraction: ExtractionConfig {
                    min_text_length: 10,
                    ..ExtractionConfig::default()
                },
                markdown: MarkdownConfig::default(),
                output: OutputConfig {
                    chunk_size_kb: 500,
                    create_index: true,
                    ..OutputConfig::default()
                },
                logging: LoggingConfig::default(),
            },
            Preset::Tables => Config {
                extraction: ExtractionConfig {
                    min_text_length: 5,
                    table_settings: TableSettings {
                        vertical_strategy: TableStrategy::LinesStrict,
                        horizontal_strategy: TableStrategy::LinesStrict,
                        ..TableSettings::default()
                    },
                    ..ExtractionConfig::default()
                },
                markdown: MarkdownConfig {
                    chapter_patterns: Vec::new(),
                    section_patterns: Vec::new(),
                    preserve_formatting: Vec::<Formatting>::new(),
                    heading_font_ratio: 0.0,
                    text_cleaning: TextCleaning {
                        dehyphenate: false,
                        ..TextCleaning::default()
                    },
                    ..MarkdownConfig::default()
                },
                output: OutputConfig {
                    chunk_size_kb: 0,
                    create_index: false,
                    ..OutputConfig::default()
                },
                logging: LoggingConfig::default(),
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
