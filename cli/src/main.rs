//! pdf-extractor CLI - PDF to markdown extraction tool

use std::error::Error as StdError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf_extractor::config::LoggingConfig;
use pdf_extractor::extract::list_pdfs;
use pdf_extractor::{BatchReport, Config, Error, ErrorKind, Extractor, FileReport, Preset};

type CliResult<T> = Result<T, Box<dyn StdError>>;

const DEFAULT_INPUT_DIR: &str = "input/pdfs";

#[derive(Parser)]
#[command(name = "pdf-extractor")]
#[command(version)]
#[command(about = "Extract text and tables from PDF documents into markdown", long_about = None)]
#[command(after_help = "Examples:
  pdf-extractor document.pdf              Extract a single PDF
  pdf-extractor --all                     Extract all PDFs in input/pdfs/
  pdf-extractor -i                        Interactive mode (guided prompts)
  pdf-extractor --preset simple doc.pdf   Use the simple preset")]
struct Cli {
    /// PDF file to process
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Single PDF to process (alternative to the positional argument)
    #[arg(long, value_name = "FILE", conflicts_with = "file")]
    pdf: Option<PathBuf>,

    /// Process all PDFs in the input directory
    #[arg(long)]
    all: bool,

    /// Directory scanned by --all
    #[arg(long, value_name = "DIR", default_value = DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Directory receiving the markdown files (overrides the config)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "config.yaml", env = "PDF_EXTRACTOR_CONFIG")]
    config: PathBuf,

    /// Use a configuration preset instead of the config file (simple, detailed, tables)
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Run in interactive mode with guided prompts
    #[arg(short, long)]
    interactive: bool,

    /// Suppress progress output (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Show available presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        print_error(e.as_ref());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if cli.list_presets {
        cmd_list_presets();
        return Ok(());
    }
    if cli.interactive {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        return cmd_interactive(&cli, &mut input, &mut output);
    }

    let config_found = cli.config.exists();
    let config = load_config(&cli.config, cli.preset.as_deref())?;
    init_logging(&config.logging)?;
    if !config_found && cli.preset.is_none() {
        log::warn!("Config file {} not found, using defaults", cli.config.display());
    }

    let mut extractor = Extractor::new(config)?;
    if let Some(dir) = &cli.output_dir {
        extractor = extractor.with_output_dir(dir);
    }

    if let Some(file) = cli.file.as_deref().or(cli.pdf.as_deref()) {
        cmd_single(&extractor, file, cli.quiet)
    } else if cli.all {
        cmd_batch(&extractor, &cli.input_dir, cli.quiet)
    } else {
        println!("{}", "Usage: pdf-extractor <FILE> | --all | -i".yellow());
        println!("       pdf-extractor --help for more information");
        Ok(())
    }
}

/// Build the configuration: a preset replaces the file's extraction and markdown settings.
fn load_config(path: &Path, preset: Option<&str>) -> pdf_extractor::Result<Config> {
    match preset {
        Some(name) => {
            let preset = Preset::from_name(name)?;
            let base = if path.exists() {
                Config::load(path)?
            } else {
                Config::default()
            };
            Ok(base.with_preset(preset))
        }
        None if path.exists() => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn cmd_list_presets() {
    println!("\n{}\n", "Available Presets:".bold());
    for preset in Preset::ALL {
        println!("  {}: {}", preset.name().cyan(), preset.description());
    }
    println!("\nUse presets with: pdf-extractor --preset <name> your-file.pdf\n");
}

fn cmd_single(extractor: &Extractor, path: &Path, quiet: bool) -> CliResult<()> {
    pdf_extractor::validate_pdf(path)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Processing: {}", name));
    let report = extractor.process_file(path);
    spinner.finish_and_clear();

    match &report.outcome {
        Ok(summary) => {
            if !quiet {
                println!("  Processing: {}", name);
                if summary.from_cache {
                    println!("    {}", "Using cached data".cyan());
                }
                println!("    {}", format!("Extracted {} pages", summary.pages).green());
                if summary.tables > 0 {
                    println!("    {}", format!("Found {} tables", summary.tables).green());
                }
                println!(
                    "    {}",
                    format!("Saved to: {}", summary.output.display()).green()
                );
                if !summary.parts.is_empty() {
                    println!(
                        "    {}",
                        format!("Split into {} parts", summary.parts.len()).green()
                    );
                }
            }
            Ok(())
        }
        Err(failure) if failure.kind == ErrorKind::InvalidInput => Err(failure.reason.clone().into()),
        Err(failure) => {
            print_failure(&report, failure);
            Ok(())
        }
    }
}

fn cmd_batch(extractor: &Extractor, dir: &Path, quiet: bool) -> CliResult<()> {
    let files = list_pdfs(dir)?;
    if !quiet {
        println!("\nFound {} PDF(s) to process\n", files.len());
    }

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let report = extractor.process_files_with(&files, |file| {
        pb.set_message(file.file_name());
        pb.inc(1);
    });
    pb.finish_with_message("Done!");

    print_summary(&report, extractor.output_dir(), quiet);
    Ok(())
}

fn print_summary(report: &BatchReport, output_dir: &Path, quiet: bool) {
    if quiet {
        for (file, failure) in report.failures() {
            print_failure(file, failure);
        }
        return;
    }

    println!("{}", "=".repeat(40).blue());
    println!("{}", "Summary:".bold());
    println!(
        "{}",
        format!("  Successfully processed: {}", report.succeeded()).green()
    );
    if report.cached() > 0 {
        println!("{}", format!("  From cache: {}", report.cached()).cyan());
    }
    if report.failed() > 0 {
        println!("{}", format!("  Failed: {}", report.failed()).red());
        for (file, failure) in report.failures() {
            print_failure(file, failure);
        }
    }
    if let Some(index) = &report.index {
        println!("  Index: {}", index.display());
    }
    println!(
        "{}",
        format!("\nOutput saved to: {}/", output_dir.display()).cyan()
    );
}

fn print_failure(file: &FileReport, failure: &pdf_extractor::FileFailure) {
    eprintln!(
        "  {}: {}: {}",
        "Error".red().bold(),
        file.file_name(),
        failure.reason
    );
    if let Some(hint) = &failure.hint {
        eprintln!("    {} {}", "Hint:".yellow(), hint);
    }
}

fn print_error(e: &(dyn StdError + 'static)) {
    eprintln!("{}: {}", "Error".red().bold(), e);
    if let Some(hint) = e.downcast_ref::<Error>().and_then(Error::hint) {
        eprintln!("{} {}", "Hint:".yellow(), hint);
    }
}

// ---------------------------------------------------------------------------
// Interactive mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Single,
    Folder,
    Presets,
    Exit,
}

/// Preset selection, or the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigChoice {
    Preset(Preset),
    ConfigFile,
}

fn cmd_interactive<R: BufRead, W: Write>(cli: &Cli, input: &mut R, out: &mut W) -> CliResult<()> {
    writeln!(out, "{}", "\n=== PDF Text Extractor ===\n".blue().bold())?;
    writeln!(out, "Welcome! This tool extracts text from PDF files.\n")?;

    let action = choose(
        input,
        out,
        "What would you like to do?",
        &[
            "Extract a single PDF file",
            "Extract all PDFs in a folder",
            "Learn about presets",
            "Exit",
        ],
    )?;
    let action = match action {
        Some(0) => Action::Single,
        Some(1) => Action::Folder,
        Some(2) => Action::Presets,
        _ => Action::Exit,
    };

    match action {
        Action::Exit => {
            writeln!(out, "Goodbye!")?;
            return Ok(());
        }
        Action::Presets => {
            cmd_list_presets();
            return Ok(());
        }
        Action::Single | Action::Folder => {}
    }

    let choice = choose(
        input,
        out,
        "Which extraction preset would you like to use?",
        &[
            "Detailed - Full extraction with tables (Recommended)",
            "Simple - Fast extraction, minimal processing",
            "Tables - Focused on table extraction",
            "Custom - Use the config file",
        ],
    )?;
    let choice = match choice {
        Some(0) => ConfigChoice::Preset(Preset::Detailed),
        Some(1) => ConfigChoice::Preset(Preset::Simple),
        Some(2) => ConfigChoice::Preset(Preset::Tables),
        Some(_) => ConfigChoice::ConfigFile,
        None => return Ok(()),
    };

    let config = match choice {
        ConfigChoice::Preset(preset) => load_config(&cli.config, Some(preset.name()))?,
        ConfigChoice::ConfigFile => load_config(&cli.config, None)?,
    };
    init_logging(&config.logging)?;
    let mut extractor = Extractor::new(config)?;
    if let Some(dir) = &cli.output_dir {
        extractor = extractor.with_output_dir(dir);
    }

    if action == Action::Single {
        let Some(path) = prompt(input, out, "Enter the path to your PDF file", None)? else {
            return Ok(());
        };
        writeln!(out)?;
        cmd_single(&extractor, Path::new(&path), false)?;
    } else {
        let default = cli.input_dir.display().to_string();
        let Some(dir) = prompt(input, out, "Enter the folder containing PDFs", Some(&default))? else {
            return Ok(());
        };
        cmd_batch(&extractor, Path::new(&dir), false)?;
    }

    writeln!(
        out,
        "{}",
        format!(
            "\nDone! Check the {}/ folder for results.\n",
            extractor.output_dir().display()
        )
        .green()
    )?;
    Ok(())
}

/// Show numbered options and read a 1-based choice. `None` on end of input.
///
/// Invalid answers are asked again; an empty answer picks the first option.
fn choose<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
    options: &[&str],
) -> io::Result<Option<usize>> {
    loop {
        writeln!(out, "{}", question.bold())?;
        for (i, option) in options.iter().enumerate() {
            writeln!(out, "  {}) {}", i + 1, option)?;
        }
        write!(out, "Choice [1]: ")?;
        out.flush()?;

        let Some(answer) = read_answer(input)? else {
            return Ok(None);
        };
        if answer.is_empty() {
            return Ok(Some(0));
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
            _ => writeln!(out, "{}", format!("Please enter a number from 1 to {}", options.len()).yellow())?,
        }
    }
}

/// Ask for a value, falling back to `default` on an empty answer.
///
/// `None` on end of input, or on an empty answer without a default.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
    default: Option<&str>,
) -> io::Result<Option<String>> {
    match default {
        Some(d) => write!(out, "{} [{}]: ", question, d)?,
        None => write!(out, "{}: ", question)?,
    }
    out.flush()?;

    let Some(answer) = read_answer(input)? else {
        return Ok(None);
    };
    if answer.is_empty() {
        return Ok(default.map(str::to_string));
    }
    Ok(Some(answer))
}

fn read_answer<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Writes every record to stderr and to the log file.
struct TeeWriter {
    file: Mutex<File>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Ok(mut file) = self.file.lock() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut file) = self.file.lock() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install `env_logger`: the configured level, overridden by `RUST_LOG`, with an
/// optional copy to a log file.
fn init_logging(config: &LoggingConfig) -> CliResult<()> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if let Some(path) = &config.file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter {
            file: Mutex::new(file),
        })));
    }

    // A logger may already be installed (interactive mode re-entry, tests).
    let _ = builder.try_init();
    Ok(())
}
