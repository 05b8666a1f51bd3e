use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use thumbforge::{Canvas, Compositor, FsProjectStore, ImageRef, Layer, ProjectStore, Version};

#[derive(Parser, Debug)]
#[command(name = "thumbforge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List saved projects in a store directory.
    List(StoreArgs),
    /// Show the version history of one project.
    History(HistoryArgs),
    /// Flatten one version of a saved project into a PNG.
    Export(ExportArgs),
    /// Flatten a base image and layer images from disk into a PNG.
    Compose(ComposeArgs),
}

#[derive(Parser, Debug)]
struct StoreArgs {
    /// Project store directory.
    #[arg(long)]
    store: PathBuf,
}

#[derive(Parser, Debug)]
struct HistoryArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Project id.
    #[arg(long)]
    project: String,
}

#[derive(Parser, Debug)]
struct CanvasArgs {
    /// Output width in pixels (16:9 with height).
    #[arg(long, default_value_t = Canvas::REFERENCE.width)]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value_t = Canvas::REFERENCE.height)]
    height: u32,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Project id.
    #[arg(long)]
    project: String,

    /// Version index (0-based). Defaults to the last version.
    #[arg(long)]
    version: Option<usize>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Base image file.
    #[arg(long)]
    base: PathBuf,

    /// Layer image files, painted in order.
    #[arg(long = "layer")]
    layers: Vec<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::List(args) => cmd_list(args).await,
        Command::History(args) => cmd_history(args).await,
        Command::Export(args) => cmd_export(args).await,
        Command::Compose(args) => cmd_compose(args),
    }
}

async fn load_projects(store: &StoreArgs) -> anyhow::Result<Vec<thumbforge::Project>> {
    FsProjectStore::new(&store.store)
        .get_all()
        .await
        .with_context(|| format!("load projects from '{}'", store.store.display()))
}

async fn find_project(store: &StoreArgs, id: &str) -> anyhow::Result<thumbforge::Project> {
    load_projects(store)
        .await?
        .into_iter()
        .find(|p| p.id.to_string() == id)
        .with_context(|| format!("no project with id '{id}'"))
}

async fn cmd_list(args: StoreArgs) -> anyhow::Result<()> {
    for p in load_projects(&args).await? {
        println!(
            "{}  {:<24}  versions={:<3} snapshots={:<3} saved={}",
            p.id,
            p.name,
            p.revision_stack.len(),
            p.snapshots.len(),
            p.timestamp.to_rfc3339()
        );
    }
    Ok(())
}

async fn cmd_history(args: HistoryArgs) -> anyhow::Result<()> {
    let project = find_project(&args.store, &args.project).await?;
    for (i, v) in project.revision_stack.iter().enumerate() {
        println!(
            "{i:>3}  {}  layers={:<2} {}  {}",
            v.id,
            v.layers.len(),
            v.timestamp.to_rfc3339(),
            v.prompt.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let project = find_project(&args.store, &args.project).await?;
    let index = args
        .version
        .unwrap_or_else(|| project.revision_stack.len().saturating_sub(1));
    let version = project
        .revision_stack
        .get(index)
        .with_context(|| format!("project has no version {index}"))?;

    write_composed(version, &args.canvas, &args.out)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let base = read_image_ref(&args.base)?;
    let mut version = Version::from_base(base);
    for path in &args.layers {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        version.layers.push(Layer::new(read_image_ref(path)?, name));
    }

    write_composed(&version, &args.canvas, &args.out)
}

fn read_image_ref(path: &Path) -> anyhow::Result<ImageRef> {
    let bytes = std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
    ImageRef::from_bytes(&bytes).with_context(|| format!("load image '{}'", path.display()))
}

fn write_composed(version: &Version, canvas: &CanvasArgs, out: &Path) -> anyhow::Result<()> {
    let canvas = Canvas::new(canvas.width, canvas.height)?;
    let mut compositor = Compositor::new(canvas)?;
    let composed = compositor.compose_version(version)?;
    for id in &composed.skipped {
        eprintln!("warning: skipped layer {id} (could not decode)");
    }

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, composed.encode_png()?)
        .with_context(|| format!("write png '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}
