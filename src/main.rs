//! Flowtable - render XLSX templates with script formulas

mod logging;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flowtable_core::storage::{DirectoryLoader, Loader, read_xlsx, write_markdown, write_xlsx};
use flowtable_core::{Registry, RenderConfig, render};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    version,
    about = "Render an XLSX template whose cells hold {{...}} script formulas."
)]
struct Args {
    /// Template workbook (.xlsx).
    #[arg(long)]
    template: PathBuf,

    /// Directory of data files (csv, json, xlsx, sqlite) bound by file stem.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Rendered workbook; `.xlsx` is appended when missing.
    #[arg(long, default_value = "output.xlsx")]
    output: PathBuf,

    /// TOML file restricting backends and adding language aliases.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write a markdown preview of the rendered workbook.
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn has_xlsx_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

fn output_path(output: PathBuf) -> PathBuf {
    if has_xlsx_extension(&output) {
        output
    } else {
        let mut name = output.into_os_string();
        name.push(".xlsx");
        PathBuf::from(name)
    }
}

fn check_template(path: &Path) -> Result<()> {
    if !has_xlsx_extension(path) {
        bail!("only .xlsx templates are supported: {}", path.display());
    }
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("cannot read template {}", path.display()))?;
    if !metadata.is_file() {
        bail!("template is not a regular file: {}", path.display());
    }
    Ok(())
}

fn build_registry(config: Option<&Path>) -> Result<Registry> {
    let config = match config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    config
        .build_registry()
        .context("failed to start evaluation backends")
}

fn run(args: Args) -> Result<()> {
    check_template(&args.template)?;
    let output = output_path(args.output);

    let mut registry = build_registry(args.config.as_deref())?;

    if let Some(dir) = &args.data {
        let data = DirectoryLoader::with_default_loaders()
            .load(dir)
            .with_context(|| format!("failed to load data from {}", dir.display()))?;
        log::info!("loaded {} data files from {}", data.len(), dir.display());
        registry
            .init_data(&data)
            .context("failed to bind data into backends")?;
    }

    let mut book = read_xlsx(&args.template)
        .with_context(|| format!("failed to open template {}", args.template.display()))?;
    let stats = render(&mut book, &mut registry).context("render failed")?;
    log::info!(
        "rendered {} formulas over {} sheets (+{} rows, +{} columns)",
        stats.formulas,
        stats.sheets,
        stats.rows_inserted,
        stats.cols_inserted
    );

    write_xlsx(&book, &output).with_context(|| format!("failed to save {}", output.display()))?;

    if let Some(path) = &args.markdown {
        write_markdown(path, &book)
            .with_context(|| format!("failed to write markdown {}", path.display()))?;
        log::info!("exported preview to {}", path.display());
    }

    log::info!("[finish]");
    Ok(())
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
