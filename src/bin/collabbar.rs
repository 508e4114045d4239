use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser, Debug)]
#[command(name = "collabbar", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and measure every logo, print the resolved set as JSON.
    Measure(SourceArgs),
    /// Print the tiling for a viewport width as JSON.
    Layout(LayoutArgs),
    /// Write the strip as HTML markup.
    Html(FrameArgs),
    /// Render a single frame of the strip as a PNG.
    Frame(PngArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Catalog JSON (array of `{ "source", "href" }`). Defaults to the built-in partners.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Strip configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that relative logo sources are read from.
    #[arg(long, default_value = ".")]
    assets_root: PathBuf,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Viewport width.
    #[arg(long, default_value_t = 1200.0)]
    width: f64,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Viewport width.
    #[arg(long, default_value_t = 1200.0)]
    width: f64,

    /// Time since mount, in milliseconds.
    #[arg(long, default_value_t = 0)]
    time_ms: u64,

    /// Pointer enters the strip at this time (milliseconds since mount).
    #[arg(long)]
    hover_at_ms: Option<u64>,

    /// Pointer leaves the strip at this time (milliseconds since mount).
    #[arg(long)]
    leave_at_ms: Option<u64>,

    /// Output path. HTML goes to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PngArgs {
    #[command(flatten)]
    frame: FrameArgs,

    /// Background color as `RRGGBBAA` hex.
    #[arg(long, default_value = "121418ff")]
    background: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabbar=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Measure(args) => cmd_measure(args),
        Command::Layout(args) => cmd_layout(args),
        Command::Html(args) => cmd_html(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

struct Loaded {
    catalog: collabbar::LogoCatalog,
    config: collabbar::BarConfig,
    fetcher: Arc<dyn collabbar::LogoFetcher>,
}

fn load_sources(args: &SourceArgs) -> anyhow::Result<Loaded> {
    let catalog = match &args.catalog {
        Some(p) => collabbar::LogoCatalog::from_json_file(p)
            .with_context(|| format!("load catalog '{}'", p.display()))?,
        None => collabbar::LogoCatalog::partners(),
    };
    let config = match &args.config {
        Some(p) => collabbar::BarConfig::from_json_file(p)
            .with_context(|| format!("load config '{}'", p.display()))?,
        None => collabbar::BarConfig::default(),
    };
    let fetcher = make_fetcher(&args.assets_root, &config)?;
    Ok(Loaded {
        catalog,
        config,
        fetcher,
    })
}

#[cfg(feature = "http")]
fn make_fetcher(
    root: &Path,
    config: &collabbar::BarConfig,
) -> anyhow::Result<Arc<dyn collabbar::LogoFetcher>> {
    Ok(Arc::new(collabbar::HttpFetcher::new(
        root,
        config.load_timeout(),
    )?))
}

#[cfg(not(feature = "http"))]
fn make_fetcher(
    root: &Path,
    _config: &collabbar::BarConfig,
) -> anyhow::Result<Arc<dyn collabbar::LogoFetcher>> {
    Ok(Arc::new(collabbar::FsFetcher::new(root)))
}

fn resolve(loaded: &Loaded) -> collabbar::Resolution {
    let resolver = collabbar::DimensionResolver::new(Arc::clone(&loaded.fetcher), &loaded.config);
    let res = resolver.resolve(&loaded.catalog);
    for f in &res.failures {
        eprintln!("skipped logo {}: {}", f.index, f.error);
    }
    res
}

fn cmd_measure(args: SourceArgs) -> anyhow::Result<()> {
    let loaded = load_sources(&args)?;
    let res = resolve(&loaded);
    let json = serde_json::to_string_pretty(&res.entries[..]).context("encode resolved logos")?;
    println!("{json}");
    Ok(())
}

#[derive(serde::Serialize)]
struct LayoutReport {
    viewport_width: f64,
    logos: usize,
    unit_width: f64,
    repeats: u32,
    entries: usize,
    total_width: f64,
}

fn cmd_layout(args: LayoutArgs) -> anyhow::Result<()> {
    let loaded = load_sources(&args.source)?;
    let res = resolve(&loaded);
    let tiler = collabbar::TileFiller::from_config(&loaded.config)?;
    let seq = tiler.fill(args.width, Arc::clone(&res.entries))?;
    let report = LayoutReport {
        viewport_width: args.width,
        logos: seq.unit().len(),
        unit_width: seq.unit_width(),
        repeats: seq.repeats(),
        entries: seq.len(),
        total_width: seq.total_width(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("encode layout report")?
    );
    Ok(())
}

/// Build a bar and replay the hover timeline up to `time_ms`.
fn build_bar(
    loaded: &Loaded,
    args: &FrameArgs,
) -> anyhow::Result<(collabbar::CollabBar, Duration)> {
    let res = resolve(loaded);
    let mut bar = collabbar::CollabBar::new(
        loaded.catalog.clone(),
        loaded.config.clone(),
        args.width,
    )?;
    bar.handle(collabbar::BarEvent::LogosResolved(res), Duration::ZERO)?;

    let now = Duration::from_millis(args.time_ms);
    let mut events = Vec::new();
    if let Some(t) = args.hover_at_ms {
        events.push((t, collabbar::BarEvent::PointerEnter));
    }
    if let Some(t) = args.leave_at_ms {
        events.push((t, collabbar::BarEvent::PointerLeave));
    }
    events.sort_by_key(|(t, _)| *t);
    for (t, ev) in events {
        if t > args.time_ms {
            break;
        }
        bar.handle(ev, Duration::from_millis(t))?;
    }
    Ok((bar, now))
}

fn cmd_html(args: FrameArgs) -> anyhow::Result<()> {
    let loaded = load_sources(&args.source)?;
    let (bar, now) = build_bar(&loaded, &args)?;
    let html = collabbar::render_html(&bar, now);
    match &args.out {
        Some(path) => {
            write_output(path, html.as_bytes())?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn cmd_frame(args: PngArgs) -> anyhow::Result<()> {
    let background = parse_rgba_hex(&args.background)?;
    let out = args
        .frame
        .out
        .clone()
        .context("--out is required for frame output")?;

    let loaded = load_sources(&args.frame.source)?;
    let (bar, now) = build_bar(&loaded, &args.frame)?;
    let height = loaded.config.target_height.round().max(1.0) as u32;
    let bitmaps = collabbar::LogoBitmaps::prepare(loaded.fetcher.as_ref(), bar.resolved(), height);
    let frame = collabbar::render_frame(&bar.layout(now), &bitmaps, background)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .save_with_format(&out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn parse_rgba_hex(s: &str) -> anyhow::Result<[u8; 4]> {
    let s = s.trim_start_matches('#');
    anyhow::ensure!(
        s.len() == 8 && s.is_ascii(),
        "background must be 8 hex digits (RRGGBBAA), got '{s}'"
    );
    let mut out = [0u8; 4];
    for (i, px) in out.iter_mut().enumerate() {
        *px = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
            .with_context(|| format!("invalid hex in background '{s}'"))?;
    }
    Ok(out)
}
