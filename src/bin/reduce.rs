use anyhow::{Context, Result, bail};
use clap::Parser;
use color_reduce::image_io::encode_png;
use color_reduce::{DEFAULT_COLORS, PageSize, QuantizeOptions, Session};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Reduce an image to a few colors and export it with its palette as a PDF.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input image (PNG or JPEG)
    input: PathBuf,

    /// Number of colors in the reduced image (2-32)
    #[arg(short = 'k', long, default_value_t = DEFAULT_COLORS)]
    n_colors: usize,

    /// Replace a palette color: CLUSTER=#rrggbb or #old=#new (repeatable)
    #[arg(short, long = "replace", value_name = "FROM=TO")]
    replacements: Vec<String>,

    /// Page size of the exported PDF (A4, A3, A2, A1, A0)
    #[arg(short, long, default_value = "A4")]
    page_size: String,

    /// Output PDF path
    #[arg(short, long, default_value = "reduced_color_image.pdf")]
    output: PathBuf,

    /// Also write the reduced image as PNG
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Print the final palette as JSON on stdout
    #[arg(long)]
    palette_json: bool,

    /// JSON file with k-means options (runs, max_iter, converge, seed)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_options(path: Option<&PathBuf>) -> Result<QuantizeOptions> {
    let Some(path) = path else {
        return Ok(QuantizeOptions::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn apply_replacement(session: &mut Session, spec: &str) -> Result<()> {
    let Some((from, to)) = spec.split_once('=') else {
        bail!("replacement {spec:?} must look like CLUSTER=#rrggbb or #old=#new");
    };
    let from = from.trim();
    let cluster = if from.starts_with('#') {
        session.cluster_for_hex(from)?
    } else {
        from.parse::<usize>()
            .with_context(|| format!("invalid cluster index {from:?}"))?
    };
    session.set_override_hex(cluster, to.trim())?;
    tracing::info!(cluster, color = to.trim(), "Applied replacement");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "color_reduce=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args = Args::parse();

    // Fail on a bad page size before doing any work.
    args.page_size.parse::<PageSize>()?;

    let options = load_options(args.config.as_ref())?;
    let bytes = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let mut session = Session::new(options);
    session
        .load(&bytes, args.n_colors)
        .context("color reduction failed")?;

    for spec in &args.replacements {
        apply_replacement(&mut session, spec)?;
    }

    if let Some(preview) = &args.preview {
        let img = session
            .render_image()
            .context("no reduced image available")?;
        fs::write(preview, encode_png(&img)?)?;
        println!("Saved preview → {}", preview.display());
    }

    if args.palette_json {
        println!("{}", serde_json::to_string_pretty(&session.palette())?);
    } else {
        for entry in session.palette() {
            println!(
                "{:>2}  {}  {:5.1}%",
                entry.cluster,
                entry.hex(),
                entry.percentage()
            );
        }
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    session
        .save_pdf(&args.output, &args.page_size)
        .context("PDF export failed")?;
    println!("Saved → {}", args.output.display());

    Ok(())
}
