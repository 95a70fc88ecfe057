//! CLI binary for edgequake-salonpost.
//!
//! A thin shim over the library crate that maps CLI flags to the brand
//! profile, post attributes and `GenerationConfig`, then prints captions.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_salonpost::{
    client_for, generate_with_client, load_image, write_captions, write_output_json, AgeBand,
    AnglePolicy, BrandProfile, EmphasisPoint, Gender, GenerationConfig, GenerationOutput,
    GenerationProgressCallback, MenuItem, Platform, PostAttributes, PostType, ProgressCallback,
    ResponseFormat, Session, VariationAngle,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
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

/// Spinner shown while the provider is working. A new spinner is started for
/// every generation so the interactive loop can reuse one callback.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, platforms: &[Platform], angle: Option<VariationAngle>) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Generating");
        let targets: Vec<&str> = platforms.iter().map(|p| p.label()).collect();
        bar.set_message(match angle {
            Some(a) => format!("{}  ({})", targets.join(" + "), a.label()),
            None => targets.join(" + "),
        });
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn on_response(&self, raw_len: usize) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(format!("splitting reply ({raw_len} chars)"));
            }
        }
    }

    fn on_generation_complete(&self, produced: &[Platform], missing: &[Platform]) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        if missing.is_empty() {
            eprintln!(
                "{} {} caption(s) generated",
                green("✔"),
                bold(&produced.len().to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} captions generated",
                yellow("⚠"),
                bold(&produced.len().to_string()),
                produced.len() + missing.len()
            );
        }
    }

    fn on_generation_error(&self, error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Both platforms, salon details from the environment
  export SALON_NAME=SalonName SALON_AREA=吉祥寺
  salonpost lash.jpg

  # Lash-lift design post for women in their 30s and 40s
  salonpost lash.jpg --post-type design --age 30s,40s --gender female \
      --menu lash-lift --emphasis natural,gentle

  # X only, pinned opening angle, written to a file
  salonpost lash.jpg --platform x --angle season -o captions.txt

  # Keep regenerating with a fresh angle until happy
  salonpost lash.jpg --interactive

  # Structured output; fail if any caption misses its shape
  salonpost lash.jpg --json --strict > captions.json

  # List every selectable value
  salonpost --list-options

ENVIRONMENT VARIABLES:
  SALON_NAME              Salon name (required; becomes the brand hashtag)
  SALON_AREA              Area the salon serves
  SALON_CONCEPT           Brand concept
  SALON_TARGET            Main clientele
  SALON_SERVICE           Service category
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID (default gpt-4.1-mini)

Any vision-capable model works. Smaller models occasionally miss the
hashtag counts; shape problems are reported as warnings, or as a failure
with --strict.
"#;

/// Write Instagram and X captions for a salon photo using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "salonpost",
    version,
    about = "Write Instagram and X captions for a salon photo using Vision LLMs",
    long_about = "Write calm, on-brand Instagram and X captions for a lash or brow salon \
photo. The photo is sent to a Vision Language Model together with the post type, audience, \
menu and selling points; the reply is split per platform and checked for hashtag counts, \
length and the salon's own hashtag.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local photo path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "list_options")]
    input: Option<String>,

    // ── Post attributes ──────────────────────────────────────────────────
    /// Post type: treatment, design, availability, daily.
    #[arg(long, default_value = "treatment")]
    post_type: PostType,

    /// Target age bands, comma separated (10s, 20s, 30s, 40s, 50s).
    #[arg(long = "age", value_delimiter = ',')]
    ages: Vec<AgeBand>,

    /// Target gender: female, male, any.
    #[arg(long, default_value = "any")]
    gender: Gender,

    /// Menu items, comma separated (see --list-options).
    #[arg(long = "menu", value_delimiter = ',')]
    menu: Vec<MenuItem>,

    /// Points to emphasise, comma separated (see --list-options).
    #[arg(long, value_delimiter = ',')]
    emphasis: Vec<EmphasisPoint>,

    /// Platforms to write for, comma separated. Default: instagram,x.
    #[arg(long = "platform", value_delimiter = ',')]
    platforms: Vec<Platform>,

    // ── Brand profile ────────────────────────────────────────────────────
    /// Salon name; the brand hashtag is derived from it.
    #[arg(long, env = "SALON_NAME")]
    salon_name: Option<String>,

    /// Area the salon serves.
    #[arg(long, env = "SALON_AREA", default_value = "")]
    area: String,

    /// Brand concept.
    #[arg(long, env = "SALON_CONCEPT", default_value = "")]
    concept: String,

    /// Main clientele.
    #[arg(long, env = "SALON_TARGET", default_value = "")]
    target: String,

    /// Service category.
    #[arg(long, env = "SALON_SERVICE", default_value = "")]
    service: String,

    // ── Variation ────────────────────────────────────────────────────────
    /// Pin the opening angle (see --list-options).
    #[arg(long, conflicts_with = "no_angle")]
    angle: Option<VariationAngle>,

    /// Do not ask for any particular opening angle.
    #[arg(long)]
    no_angle: bool,

    /// Seed for the angle draw, for reproducible runs.
    #[arg(long, env = "SALONPOST_SEED")]
    seed: Option<u64>,

    /// After each result, offer to regenerate with a different angle.
    #[arg(short, long)]
    interactive: bool,

    // ── Output ───────────────────────────────────────────────────────────
    /// Response shape to ask the model for: markers or json.
    #[arg(long, value_enum, default_value = "markers")]
    format: FormatArg,

    /// Output structured JSON (GenerationOutput) instead of plain captions.
    #[arg(long, env = "SALONPOST_JSON")]
    json: bool,

    /// Write captions to this file instead of stdout.
    #[arg(short, long, env = "SALONPOST_OUTPUT")]
    output: Option<PathBuf>,

    /// Exit non-zero when a section is missing or a caption misses its shape.
    #[arg(long)]
    strict: bool,

    /// Print every selectable value and exit.
    #[arg(long)]
    list_options: bool,

    // ── Provider ─────────────────────────────────────────────────────────
    /// LLM model ID (default gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SALONPOST_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "SALONPOST_MAX_TOKENS", default_value_t = 700)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SALONPOST_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Longest photo edge sent to the model, in pixels.
    #[arg(long, env = "SALONPOST_MAX_IMAGE_EDGE", default_value_t = 1536)]
    max_image_edge: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SALONPOST_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "SALONPOST_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    // ── Logging ──────────────────────────────────────────────────────────
    /// Disable the spinner.
    #[arg(long, env = "SALONPOST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SALONPOST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and captions.
    #[arg(short, long, env = "SALONPOST_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Markers,
    Json,
}

impl From<FormatArg> for ResponseFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Markers => ResponseFormat::Markers,
            FormatArg::Json => ResponseFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep them quiet while it
    // runs. Shape warnings are printed by this binary, not via tracing.
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

    if cli.list_options {
        print_options();
        return Ok(());
    }
    let input = cli
        .input
        .as_deref()
        .context("An image path or URL is required")?;

    // ── Build inputs ─────────────────────────────────────────────────────
    let brand = build_brand(&cli)?;
    let attrs = build_attributes(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let mut session = match cli.seed {
        Some(seed) => Session::seeded(seed),
        None => Session::new(),
    };

    // The photo is read and checked before any provider is contacted.
    let image = load_image(input, &config)
        .await
        .context("Could not load the photo")?;
    let client = client_for(&config).await.context("Provider setup failed")?;

    let mut policy = if cli.no_angle {
        AnglePolicy::Off
    } else if let Some(angle) = cli.angle {
        AnglePolicy::Pinned(angle)
    } else {
        AnglePolicy::Random
    };

    // ── Generate (and regenerate on request) ─────────────────────────────
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let result = generate_with_client(
            &client,
            image.clone(),
            &brand,
            &attrs,
            policy,
            &mut session,
            &config,
        )
        .await;

        match result {
            Ok(output) => {
                emit(&cli, &output).await?;
                report_shape(&cli, &output);
            }
            Err(e) => {
                if let Some(raw) = e.raw_response() {
                    eprintln!(
                        "{} The reply could not be split per platform; raw reply follows.",
                        yellow("⚠")
                    );
                    println!("{raw}");
                }
                if !cli.interactive {
                    return Err(e).context("Generation failed");
                }
                if !show_progress {
                    eprintln!("{} {}", red("✘"), e);
                }
            }
        }

        if !cli.interactive {
            break;
        }
        eprint!("{} ", bold("[r] regenerate with a different angle  [q] quit:"));
        io::stderr().flush().ok();
        match stdin.next_line().await.context("Failed to read stdin")? {
            Some(line) if line.trim().eq_ignore_ascii_case("r") => {
                policy = AnglePolicy::AvoidRepeat;
            }
            _ => break,
        }
    }

    // ── Strict mode ──────────────────────────────────────────────────────
    if cli.strict {
        if let Some(output) = session.last_output() {
            if !output.is_complete() || output.has_issues() {
                anyhow::bail!("Captions do not match the requested shape (--strict)");
            }
        }
    }

    Ok(())
}

/// Write captions to the chosen destination.
async fn emit(cli: &Cli, output: &GenerationOutput) -> Result<()> {
    if let Some(ref path) = cli.output {
        if cli.json {
            write_output_json(output, path).await?;
        } else {
            write_captions(output, path).await?;
        }
        if !cli.quiet {
            eprintln!(
                "{}  {}ms  →  {}",
                green("✔"),
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.render_text().as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out{}",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output
                .angle
                .map(|a| format!("  —  {}", dim(a.label())))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

/// Flag missing sections and shape issues on stderr.
fn report_shape(cli: &Cli, output: &GenerationOutput) {
    if cli.quiet {
        return;
    }
    for missing in &output.missing {
        eprintln!("  {} {}", red("✗"), missing);
    }
    for caption in &output.captions {
        for issue in &caption.issues {
            eprintln!("  {} {}: {}", yellow("⚠"), caption.platform, issue);
        }
    }
}

fn build_brand(cli: &Cli) -> Result<BrandProfile> {
    let name = cli
        .salon_name
        .clone()
        .context("Salon name is required: pass --salon-name or set SALON_NAME")?;
    let brand = BrandProfile::new(name)
        .area(cli.area.as_str())
        .concept(cli.concept.as_str())
        .target(cli.target.as_str())
        .service(cli.service.as_str());
    brand.validate()?;
    Ok(brand)
}

fn build_attributes(cli: &Cli) -> Result<PostAttributes> {
    let mut builder = PostAttributes::builder()
        .post_type(cli.post_type)
        .age_bands(cli.ages.iter().copied())
        .gender(cli.gender)
        .menu_items(cli.menu.iter().copied())
        .emphasis(cli.emphasis.iter().copied());
    if !cli.platforms.is_empty() {
        builder = builder.platforms(cli.platforms.iter().copied());
    }
    builder.build().context("Invalid post attributes")
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_image_edge(cli.max_image_edge)
        .response_format(cli.format.clone().into());

    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_options() {
    fn section<T: Copy>(title: &str, all: &[T], slug: fn(T) -> &'static str, label: fn(T) -> &'static str) {
        println!("{}", bold(title));
        for &v in all {
            println!("  {:<16} {}", slug(v), label(v));
        }
        println!();
    }
    section("--post-type", PostType::ALL, PostType::slug, PostType::label);
    section("--age", AgeBand::ALL, AgeBand::slug, AgeBand::label);
    section("--gender", Gender::ALL, Gender::slug, Gender::label);
    section("--menu", MenuItem::ALL, MenuItem::slug, MenuItem::label);
    section("--emphasis", EmphasisPoint::ALL, EmphasisPoint::slug, EmphasisPoint::label);
    section("--platform", Platform::ALL, Platform::slug, Platform::label);
    section("--angle", VariationAngle::ALL, VariationAngle::slug, VariationAngle::label);
}
