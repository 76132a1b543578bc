//! CLI binary for edgequake-docverify.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalyzerConfig` + `Credentials` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docverify::{
    analyze_file, AnalysisProgressCallback, AnalysisReport, AnalyzerConfig, Credentials,
    DocumentKind, PdfDetection, ProgressCallback, Stage, ValidationResult,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner that relabels itself per stage and leaves a log line behind
/// for each finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("…");
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        if stage == Stage::Validate {
            self.bar.finish_and_clear();
        }
    }

    fn on_stage_skipped(&self, stage: Stage) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            dim("–"),
            stage.to_string(),
            dim("skipped (no address extracted)"),
        ));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a scanned bill
  docverify utility-bill.jpg

  # First page of a PDF statement, rendered at 200 DPI
  docverify --dpi 200 statement.pdf

  # Stricter address check, machine-readable output
  docverify --threshold 0.9 --json statement.pdf > report.json

  # Extract with another provider (key from ANTHROPIC_API_KEY)
  docverify --provider anthropic --model claude-sonnet-4-20250514 id-card.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          Key for the vision model (default OpenAI backend)
  GEOAPIFY_API_KEY        Key for address validation
  PDFIUM_LIB_PATH         Path to libpdfium, needed for PDF uploads
  RUST_LOG                Override the log filter (e.g. edgequake_docverify=debug)

  With --provider, the provider's own key variable is used instead of
  OPENAI_API_KEY (ANTHROPIC_API_KEY, GEMINI_API_KEY, …).
"#;

/// Extract identity fields from a document scan and validate its address.
#[derive(Parser, Debug)]
#[command(
    name = "docverify",
    version,
    about = "Extract name, address and date from a document scan and validate the address",
    long_about = "Read a JPG, PNG or PDF (first page), extract the holder's name, address and \
document date with a Vision Language Model, tell whether it is a bank statement, and check \
the address against the Geoapify geocoder.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to analyse (.jpg, .jpeg, .png or .pdf).
    input: PathBuf,

    /// API key for the vision model.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// API key for the geocoder.
    #[arg(long, env = "GEOAPIFY_API_KEY", hide_env_values = true)]
    geoapify_api_key: Option<String>,

    /// Vision model ID.
    #[arg(long, env = "DOCVERIFY_MODEL", default_value = edgequake_docverify::config::DEFAULT_MODEL)]
    model: String,

    /// Use a named edgequake-llm provider (openai, anthropic, gemini, ollama, …).
    #[arg(long, env = "DOCVERIFY_PROVIDER")]
    provider: Option<String>,

    /// OpenAI-compatible API root for the default backend.
    #[arg(long, env = "DOCVERIFY_BASE_URL", default_value = edgequake_docverify::config::DEFAULT_EXTRACTION_BASE_URL)]
    base_url: String,

    /// Geocoder search endpoint.
    #[arg(long, env = "DOCVERIFY_GEOCODE_URL", default_value = edgequake_docverify::config::DEFAULT_GEOCODE_URL)]
    geocode_url: String,

    /// PDF rendering DPI (72–600).
    #[arg(long, env = "DOCVERIFY_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Minimum geocoder confidence (0.0–1.0) for a valid address.
    #[arg(long, env = "DOCVERIFY_THRESHOLD", default_value_t = 0.8)]
    threshold: f64,

    /// Max output tokens for the model reply.
    #[arg(long, env = "DOCVERIFY_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, env = "DOCVERIFY_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// How PDFs are recognised.
    #[arg(long, value_enum, default_value = "name-or-magic")]
    pdf_detection: PdfDetectionArg,

    /// Path to the pdfium shared library.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "DOCVERIFY_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the report and errors.
    #[arg(short, long)]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PdfDetectionArg {
    /// `.pdf` file extension only.
    Name,
    /// `.pdf` extension or `%PDF-` signature.
    NameOrMagic,
}

impl From<PdfDetectionArg> for PdfDetection {
    fn from(v: PdfDetectionArg) -> Self {
        match v {
            PdfDetectionArg::Name => PdfDetection::NameOnly,
            PdfDetectionArg::NameOrMagic => PdfDetection::NameOrMagic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; INFO logs would
    // tear it apart.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let credentials = credentials_from(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let report = analyze_file(&cli.input, &credentials, &config)
        .await
        .with_context(|| format!("Failed to analyse {}", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        print_report(&report);
        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{}x{} px, {} KB JPEG, {}ms total",
                    report.stats.image_width,
                    report.stats.image_height,
                    report.stats.jpeg_bytes / 1024,
                    report.stats.total_duration_ms
                ))
            );
        }
    }

    Ok(())
}

/// Both keys are required unless a named provider supplies its own.
fn credentials_from(cli: &Cli) -> Result<Credentials> {
    let extraction = match (&cli.openai_api_key, &cli.provider) {
        (Some(key), _) if !key.trim().is_empty() => key.trim().to_string(),
        (_, Some(_)) => String::new(),
        _ => anyhow::bail!(
            "OpenAI API key required: pass --openai-api-key or set OPENAI_API_KEY"
        ),
    };
    let geocoding = match &cli.geoapify_api_key {
        Some(key) if !key.trim().is_empty() => key.trim().to_string(),
        _ => anyhow::bail!(
            "Geoapify API key required: pass --geoapify-api-key or set GEOAPIFY_API_KEY"
        ),
    };
    Ok(Credentials::new(extraction, geocoding))
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .dpi(cli.dpi)
        .confidence_threshold(cli.threshold)
        .max_tokens(cli.max_tokens)
        .model(cli.model.as_str())
        .extraction_base_url(cli.base_url.as_str())
        .geocode_url(cli.geocode_url.as_str())
        .pdf_detection(cli.pdf_detection.into());

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.extraction_prompt(prompt);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.as_str());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.as_path());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

// ── Human-readable report ────────────────────────────────────────────────────

fn print_report(report: &AnalysisReport) {
    let ex = &report.extraction;
    let or_dash = |s: &str| if s.is_empty() { dim("—") } else { s.to_string() };

    println!();
    println!("{}", bold("Document Information"));
    let doc_type = if ex.is_bank_statement() {
        "Bank statement"
    } else {
        "Document"
    };
    let source = match report.document {
        DocumentKind::Raster => String::new(),
        DocumentKind::Pdf { page_count } => dim(&format!("  (page 1 of {page_count})")),
    };
    println!("  {:<14} {}{}", "Type:", doc_type, source);
    println!("  {:<14} {}", "Name:", or_dash(ex.name()));
    println!("  {:<14} {}", "Date:", or_dash(ex.document_date()));
    println!("  {:<14} {}", "Address:", or_dash(ex.address()));
    if let Some(err) = ex.error() {
        println!("  {} {}", red("✗"), red(&err.to_string()));
    }

    println!();
    println!("{}", bold("Address Validation"));
    match &report.validation {
        None => println!("  {}", dim("Skipped: no address was extracted")),
        Some(v) => print_validation(v),
    }
    println!();
}

fn print_validation(v: &ValidationResult) {
    if let Some(err) = v.error() {
        println!("  {} {}", red("✗"), red(&format!("Validation error: {err}")));
        println!("{}", confidence_line(v));
        return;
    }

    if v.is_valid() {
        println!("  {} Address validated", green("✓"));
    } else {
        println!("  {} Address may not be valid", yellow("⚠"));
    }
    println!("{}", confidence_line(v));

    if let Some(formatted) = v.formatted_address() {
        println!("  {:<14} {}", "Standardized:", formatted);
    }

    if let Some(m) = v.best_match() {
        println!();
        println!("{}", bold("Geolocation"));
        let rows = [
            ("Country:", m.country.as_deref()),
            ("City:", m.city.as_deref()),
            ("State:", m.state.as_deref()),
            ("Postcode:", m.postcode.as_deref()),
            ("Street:", m.street.as_deref()),
        ];
        for (label, value) in rows {
            if let Some(value) = value {
                println!("  {:<14} {}", label, value);
            }
        }
        if let Some((lat, lon)) = m.coordinates() {
            println!("  {:<14} {}", "Coordinates:", cyan(&format!("{lat:.6}, {lon:.6}")));
        }
    }
}

fn confidence_line(v: &ValidationResult) -> String {
    format!(
        "  {:<14} {:>3.0}%  {}",
        "Confidence:",
        v.confidence() * 100.0,
        confidence_bar(v.confidence())
    )
}

const BAR_CELLS: usize = 20;

/// `[██████████░░░░░░░░░░]`, green from 80%, yellow from 50%, red below.
fn confidence_bar(confidence: f64) -> String {
    let filled = ((confidence.clamp(0.0, 1.0) * BAR_CELLS as f64).round() as usize).min(BAR_CELLS);
    let cells = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled));
    let coloured = if confidence >= 0.8 {
        green(&cells)
    } else if confidence >= 0.5 {
        yellow(&cells)
    } else {
        red(&cells)
    };
    format!("[{coloured}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_colour_bands() {
        assert!(confidence_bar(0.92).contains("\x1b[32m"));
        assert!(confidence_bar(0.8).contains("\x1b[32m"));
        assert!(confidence_bar(0.6).contains("\x1b[33m"));
        assert!(confidence_bar(0.2).contains("\x1b[31m"));
    }

    #[test]
    fn bar_fill_tracks_confidence() {
        assert_eq!(confidence_bar(0.5).matches('█').count(), 10);
        assert_eq!(confidence_bar(0.0).matches('░').count(), BAR_CELLS);
        assert_eq!(confidence_bar(1.0).matches('█').count(), BAR_CELLS);
    }

    #[test]
    fn failed_validation_still_shows_an_empty_red_bar() {
        let line = confidence_line(&ValidationResult::default());
        assert!(line.contains("  0%"), "got {line:?}");
        assert!(line.contains("\x1b[31m"));
        assert_eq!(line.matches('░').count(), BAR_CELLS);
    }

    #[test]
    fn missing_openai_key_is_reported() {
        let cli = Cli::parse_from(["docverify", "bill.png", "--geoapify-api-key", "geo"]);
        let cli = Cli {
            openai_api_key: None,
            ..cli
        };
        let err = credentials_from(&cli).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn provider_mode_needs_no_openai_key() {
        let cli = Cli::parse_from([
            "docverify",
            "bill.png",
            "--provider",
            "anthropic",
            "--geoapify-api-key",
            "geo",
        ]);
        let cli = Cli {
            openai_api_key: None,
            ..cli
        };
        let creds = credentials_from(&cli).unwrap();
        assert_eq!(creds.extraction_api_key(), "");
        assert_eq!(creds.geocoding_api_key(), "geo");
    }
}
