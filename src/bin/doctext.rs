//! CLI binary for edgequake-doctext.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig`, runs one batch and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doctext::{
    check_engines, BatchCoordinator, BatchOutcome, BatchProgressCallback, DocumentKind,
    EngineStatus, ExtractionConfig, ItemOutcome, ItemStatus, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// finished input. Lines may arrive out of order with `--concurrency > 1`.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_item_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, index: usize, total: usize, outcome: &ItemOutcome) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}",
            status_mark(&outcome.status),
            index + 1,
            total,
            describe_item(outcome),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _outcome: &BatchOutcome) {
        self.bar.finish_and_clear();
    }
}

fn status_mark(status: &ItemStatus) -> String {
    match status {
        ItemStatus::Written => green("✓"),
        ItemStatus::Degraded => yellow("⚠"),
        ItemStatus::WriteFailed { .. } | ItemStatus::Skipped { .. } => red("✗"),
    }
}

fn describe_item(item: &ItemOutcome) -> String {
    let name = item
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| item.input.display().to_string());

    match &item.status {
        ItemStatus::Written | ItemStatus::Degraded => {
            let mut line = format!(
                "{:<32} {}  {}",
                name,
                dim(&format!("{:>6} chars", item.chars)),
                dim(&format!("{:.1}s", item.duration_ms as f64 / 1000.0)),
            );
            for failure in &item.failures {
                line.push_str(&format!("\n        {}", yellow(&failure.to_string())));
            }
            line
        }
        ItemStatus::WriteFailed { detail } => format!("{name:<32} {}", red(detail)),
        ItemStatus::Skipped { reason } => format!("{name:<32} {}", red(reason)),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a mixed batch; outputs land next to each input
  doctext scan.pdf letter.docx notes.txt IMG_0042.JPG

  # Collect every output in one directory
  doctext -o extracted/ uploads/*

  # English OCR, two inputs at a time
  doctext --lang eng --concurrency 2 *.pdf

  # Machine-readable outcome
  doctext --json uploads/* > outcome.json

  # Check that tesseract and pdfium can be found
  doctext --check-engines

OUTPUT:
  Each input <stem>.<ext> produces <stem>_extracted_text.docx containing a
  single "Extracted Text" heading followed by the extracted text. Existing
  files are overwritten. Two inputs with the same stem share one output:
  the later one on the command line wins.

EXIT STATUS:
  0  every input produced an output document (possibly with empty text)
  1  at least one input was skipped or could not be written

ENVIRONMENT VARIABLES:
  DOCTEXT_OCR_LANGUAGE  Tesseract language (default: fra)
  DOCTEXT_TESSERACT     Tesseract executable (default: tesseract on PATH)
  TESSDATA_PREFIX       Directory holding *.traineddata files
  PDFIUM_LIB_PATH       Path to libpdfium (default: ./, then system library)
  RUST_LOG              Log filter, e.g. RUST_LOG=edgequake_doctext=debug
"#;

/// Extract text from PDF, Word, text and image files into Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "doctext",
    version,
    about = "Extract text from PDF, Word, text and image files into Word documents",
    long_about = "Extract the text of each input into <stem>_extracted_text.docx. PDFs and \
images are read with OCR (pdfium + tesseract); Word and plain-text files are read directly. \
A file that cannot be read still gets an output with an empty body.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files (.pdf, .docx, .txt, .jpg, .jpeg, .png; any case).
    #[arg(required_unless_present = "check_engines")]
    files: Vec<PathBuf>,

    /// Write outputs to this directory instead of next to each input.
    #[arg(short, long, env = "DOCTEXT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Tesseract language code (e.g. fra, eng, fra+eng).
    #[arg(short, long = "lang", env = "DOCTEXT_OCR_LANGUAGE", default_value = "fra")]
    language: String,

    /// Rendering DPI for PDF pages (72–600).
    #[arg(long, env = "DOCTEXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Number of inputs processed at once.
    #[arg(short, long, env = "DOCTEXT_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Tesseract executable.
    #[arg(long, env = "DOCTEXT_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Directory holding tesseract's *.traineddata files.
    #[arg(long, env = "TESSDATA_PREFIX")]
    tessdata_dir: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Per-page OCR timeout in seconds.
    #[arg(long, env = "DOCTEXT_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Per-document PDF rendering timeout in seconds.
    #[arg(long, env = "DOCTEXT_RENDER_TIMEOUT", default_value_t = 300)]
    render_timeout: u64,

    /// Accept only these kinds (comma-separated: pdf,docx,txt,jpg,png).
    #[arg(long, env = "DOCTEXT_ALLOW", value_delimiter = ',')]
    allow: Vec<String>,

    /// Output the batch outcome as JSON instead of a summary.
    #[arg(long, env = "DOCTEXT_JSON")]
    json: bool,

    /// Report whether tesseract and pdfium are available, then exit.
    #[arg(long)]
    check_engines: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCTEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCTEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCTEXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar already prints one line per input.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check_engines;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Engine check ─────────────────────────────────────────────────────
    if cli.check_engines {
        let report = check_engines(&config)
            .await
            .context("Failed to check engines")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_engine("tesseract", &report.ocr);
            print_engine("pdfium", &report.pdf_renderer);
        }
        return Ok(if report.all_available() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    // ── Run batch ────────────────────────────────────────────────────────
    let coordinator = BatchCoordinator::new(config);
    let outcome = coordinator.process_paths(&cli.files).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if !cli.quiet {
        if !show_progress {
            // The progress callback already printed per-item lines.
            for (i, item) in outcome.items.iter().enumerate() {
                eprintln!(
                    "  {} {:>3}/{:<3} {}",
                    status_mark(&item.status),
                    i + 1,
                    outcome.len(),
                    describe_item(item)
                );
            }
        }
        print_summary(&outcome);
    }

    Ok(if outcome.all_written() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_engine(name: &str, status: &EngineStatus) {
    let mark = if status.available {
        green("✓")
    } else {
        red("✗")
    };
    println!("{mark} {:<10} {}", bold(name), status.detail);
}

fn print_summary(outcome: &BatchOutcome) {
    let mark = if outcome.all_written() && outcome.degraded() == 0 {
        green("✔")
    } else if outcome.all_written() {
        yellow("⚠")
    } else {
        red("✘")
    };
    eprintln!(
        "{} {}/{} written  ({} degraded, {} write failures, {} skipped)  {}ms",
        mark,
        bold(&outcome.written().to_string()),
        outcome.len(),
        outcome.degraded(),
        outcome.write_failed(),
        outcome.skipped(),
        outcome.total_duration_ms,
    );
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .ocr_language(cli.language.clone())
        .tesseract_path(cli.tesseract.clone())
        .concurrency(cli.concurrency)
        .ocr_timeout_secs(cli.ocr_timeout)
        .render_timeout_secs(cli.render_timeout);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(ref dir) = cli.tessdata_dir {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if !cli.allow.is_empty() {
        builder = builder.allowed_kinds(parse_kinds(&cli.allow)?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--allow` values into document kinds.
fn parse_kinds(values: &[String]) -> Result<Vec<DocumentKind>> {
    values
        .iter()
        .map(|v| {
            let v = v.trim().trim_start_matches('.');
            DocumentKind::from_extension(v)
                .with_context(|| format!("Unknown input kind '{v}' (expected pdf, docx, txt, jpg, jpeg or png)"))
        })
        .collect()
}
