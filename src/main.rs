use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};
use upload_scrub::imaging::{MediaFormat, OutputFormat, read_dimensions, scan_metadata};
use upload_scrub::output::{self, InspectEntry, SanitizeEntry};
use upload_scrub::{SanitizeOptions, Sanitizer, SourceImage, config, inputs};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "upload-scrub")]
#[command(about = "Strip metadata from images and fit them under an upload size limit")]
#[command(long_about = "\
Strip metadata from images and fit them under an upload size limit

Every image is decoded to bare pixels and re-encoded, so EXIF, XMP, IPTC,
ICC profiles and comments never reach the output. The longer edge is capped,
then quality and dimensions are lowered until the file fits the byte budget:

  quality   92 → 82 → ... → 30     (10 points per step)
  shrink    longer edge × 0.8      (quality resets to 70)
  floor     800px at quality 30    (kept even if still over budget)

Output files keep their original names. Directory arguments are walked for
.jpg, .jpeg, .png and .gif files.

Set RUST_LOG=upload_scrub=debug to trace every encode attempt.
Run 'upload-scrub gen-config' to generate a documented upload-scrub.toml.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct SanitizeArgs {
    /// Image files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Directory the sanitized images are written to
    #[arg(long, default_value = "sanitized")]
    out_dir: PathBuf,

    /// Byte budget per image (overrides the config file)
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Cap on the longer edge in pixels (overrides the config file)
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Re-encode in the source format instead of JPEG
    #[arg(long)]
    preserve_format: bool,

    /// Config file; missing means stock defaults
    #[arg(long, default_value = config::CONFIG_FILENAME)]
    config: PathBuf,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Images processed at once (defaults to the number of CPUs)
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Sanitize images into the output directory
    Sanitize(SanitizeArgs),
    /// Show format, dimensions and metadata segments without writing anything
    Inspect {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print a stock upload-scrub.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sanitize(args) => run_sanitize(args).await?,
        Command::Inspect { paths } => {
            let mut entries = Vec::new();
            for path in inputs::collect_inputs(&paths)? {
                entries.push(inspect(path).await?);
            }
            output::print_inspect_output(&entries);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn run_sanitize(args: SanitizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let scrub_config = config::load_config(&args.config)?;
    let options = apply_overrides(scrub_config.to_options(), &args);
    if options.budget.max_bytes == 0 || options.budget.max_dimension == 0 {
        return Err("--max-bytes and --max-dimension must be positive".into());
    }

    let paths = inputs::collect_inputs(&args.paths)?;
    let targets = output_paths(&paths, &args.out_dir)?;

    let sources = paths.iter().map(SourceImage::from_path).collect();
    let sanitizer = match args.jobs {
        Some(jobs) => Sanitizer::new().with_concurrency(jobs),
        None => Sanitizer::new(),
    };
    let images = sanitizer.sanitize_all(sources, &options).await?;

    tokio::fs::create_dir_all(&args.out_dir).await?;
    let mut entries = Vec::with_capacity(images.len());
    for ((source, written), image) in paths.into_iter().zip(targets).zip(images) {
        tokio::fs::write(&written, &image.data).await?;
        entries.push(SanitizeEntry {
            source,
            written,
            image,
        });
    }

    if args.json {
        println!("{}", output::format_sanitize_json(&entries)?);
    } else {
        output::print_sanitize_output(&entries, options.budget.max_bytes);
    }
    Ok(())
}

/// CLI flags win over the config file.
fn apply_overrides(mut options: SanitizeOptions, args: &SanitizeArgs) -> SanitizeOptions {
    if let Some(max_bytes) = args.max_bytes {
        options.budget.max_bytes = max_bytes;
    }
    if let Some(max_dimension) = args.max_dimension {
        options.budget.max_dimension = max_dimension;
    }
    if args.preserve_format {
        options.output = OutputFormat::PreserveSource;
    }
    options
}

/// Map each input to `out_dir/<file name>`, refusing two inputs that would
/// land on the same output file.
fn output_paths(paths: &[PathBuf], out_dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut targets = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .ok_or_else(|| format!("{} has no file name", path.display()))?;
        let target = out_dir.join(name);
        if let Some(previous) = seen.insert(target.clone(), path) {
            return Err(format!(
                "{} and {} would both be written to {}",
                previous.display(),
                path.display(),
                target.display()
            ));
        }
        targets.push(target);
    }
    Ok(targets)
}

async fn inspect(path: PathBuf) -> std::io::Result<InspectEntry> {
    let bytes = tokio::fs::read(&path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = MediaFormat::sniff(&bytes).or_else(|| MediaFormat::from_file_name(&name));
    let dimensions = format.and_then(|f| read_dimensions(&bytes, f).ok());
    Ok(InspectEntry {
        format,
        dimensions,
        bytes: bytes.len() as u64,
        metadata: scan_metadata(&bytes),
        path,
    })
}
