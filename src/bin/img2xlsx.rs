//! CLI binary for edgequake-contacts.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_contacts::{
    ExtractionConfig, ExtractionProgressCallback, Extractor, ProgressCallback, SchemaMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one ✓/✗ line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the image currently in flight.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting contacts from {total_images} images…"))
        ));
    }

    fn on_image_start(&self, _index: usize, _total: usize, path: &Path) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(file_label(path));
    }

    fn on_image_complete(&self, index: usize, total: usize, path: &Path, filled_fields: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            green("✓"),
            index,
            total,
            file_label(path),
            dim(&format!("{filled_fields:>2} fields")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            red("✗"),
            index,
            total,
            file_label(path),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let failed = total_images.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} images extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images extracted  ({} failed)",
                if failed == total_images {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every image in ./images into ./customer_info.xlsx
  img2xlsx

  # Another folder and output file
  img2xlsx scans/ -o contacts.xlsx

  # Stable twelve-column layout regardless of what the model returns
  img2xlsx --schema fixed scans/

  # Use a different provider through edgequake-llm
  img2xlsx --provider anthropic --model claude-sonnet-4-20250514 scans/

  # Local OpenAI-compatible server
  img2xlsx --base-url http://localhost:11434/v1 --model llava --api-key ollama scans/

  # Print the extracted records as JSON as well
  img2xlsx --json scans/ > records.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          API key for the built-in OpenAI-compatible client
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  GEMINI_API_KEY          Google Gemini API key (with --provider gemini)
  IMG2XLSX_MODEL          Default model (gpt-4o-mini)
  RUST_LOG                Log filter, e.g. edgequake_contacts=debug

  Variables may also be placed in a .env file in the working directory.
"#;

/// Extract customer contacts from document images into an Excel sheet.
#[derive(Parser, Debug)]
#[command(
    name = "img2xlsx",
    version,
    about = "Extract customer contacts from document images into an Excel sheet using Vision LLMs",
    long_about = "Send every PNG/JPEG image in a folder to a vision-capable LLM with a fixed \
twelve-field contact prompt, recover the JSON it returns, and write one spreadsheet row per image.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing .png/.jpg/.jpeg images.
    #[arg(default_value = "images")]
    folder: PathBuf,

    /// Spreadsheet to write (replaced if it exists).
    #[arg(short, long, env = "IMG2XLSX_OUTPUT", default_value = "customer_info.xlsx")]
    output: PathBuf,

    /// Vision model ID.
    #[arg(long, env = "IMG2XLSX_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure, …
    #[arg(
        long,
        env = "IMG2XLSX_PROVIDER",
        long_help = "LLM provider. Defaults to the built-in OpenAI-compatible client when an API key \
          is available, otherwise auto-detected from provider API key env vars."
    )]
    provider: Option<String>,

    /// API key for the OpenAI-compatible endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "IMG2XLSX_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// Max LLM output tokens per image.
    #[arg(long, env = "IMG2XLSX_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// Image detail hint sent with each image.
    #[arg(long, value_enum)]
    detail: Option<DetailArg>,

    /// Per-image LLM call timeout in seconds (0 = none).
    #[arg(long, env = "IMG2XLSX_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Record shape: keep model keys as returned, or map onto the fixed twelve fields.
    #[arg(long, value_enum, default_value = "as-returned")]
    schema: SchemaArg,

    /// Process images in directory-listing order instead of by file name.
    #[arg(long)]
    no_sort: bool,

    /// Path to a text file with a custom extraction prompt.
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Also print the extracted records and failures as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMG2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SchemaArg {
    AsReturned,
    Fixed,
}

impl From<SchemaArg> for SchemaMode {
    fn from(v: SchemaArg) -> Self {
        match v {
            SchemaArg::AsReturned => SchemaMode::AsReturned,
            SchemaArg::Fixed => SchemaMode::Fixed,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DetailArg {
    Low,
    High,
    Auto,
}

impl DetailArg {
    fn as_str(self) -> &'static str {
        match self {
            DetailArg::Low => "low",
            DetailArg::High => "high",
            DetailArg::Auto => "auto",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real env vars still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = log_filter(&cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let extractor = Extractor::from_config(config).context("Failed to set up the vision model")?;

    let output = extractor
        .run_to_file(&cli.folder, &cli.output)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} images  {}ms  →  {}",
            if stats.failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.extracted,
            stats.total_images,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if stats.total_input_tokens + stats.total_output_tokens > 0 {
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&stats.total_input_tokens.to_string()),
                dim(&stats.total_output_tokens.to_string()),
            );
        }
    }

    Ok(())
}

/// Default log level when `RUST_LOG` is unset.
///
/// The progress bar already reports each image, so library INFO logs are
/// shown only without it. WARN still carries the raw reply of a failed parse.
fn log_filter(cli: &Cli) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if cli.no_progress {
        "info"
    } else {
        "warn"
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .base_url(&cli.base_url)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .output_path(&cli.output)
        .schema_mode(cli.schema.into())
        .sort_files(!cli.no_sort);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(detail) = cli.detail {
        builder = builder.image_detail(detail.as_str());
    }
    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
