//! pdf-box-eraser: strip rectangle borders and boxes from PDF pages.
//!
//! Supports two CLI modes:
//! - Legacy: `pdf-box-eraser input.pdf output.pdf [--options]`
//! - Modern: `pdf-box-eraser erase input.pdf -o output.pdf`, plus `info` and `preview`

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use eraser_core::options::{EraseOptions, PreviewFormat};
use eraser_core::range::PageRange;
use eraser_pdf::render;
use eraser_pdf::{BoxEraser, EraseReport, PageOutcome};

#[derive(Parser)]
#[command(
    name = "pdf-box-eraser",
    version,
    about = "Remove boxes and borders from PDF pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input PDF (legacy mode)
    #[arg(global = false)]
    input: Option<PathBuf>,

    /// Output PDF (legacy mode)
    #[arg(global = false)]
    output: Option<PathBuf>,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// First page to process (1-based, clamped to the document)
    #[arg(long, global = true, allow_negative_numbers = true)]
    start: Option<i64>,

    /// Last page to process (clamped to the document)
    #[arg(long, global = true, allow_negative_numbers = true)]
    end: Option<i64>,

    /// Re-compress streams before saving
    #[arg(long, global = true)]
    compress: bool,

    /// Also open XObjects whose names match no known prefix
    #[arg(long, global = true)]
    inspect_unprefixed: bool,

    /// Do not recurse into ExtGState soft masks
    #[arg(long, global = true)]
    no_soft_masks: bool,

    /// Preview rendering DPI (default: 100)
    #[arg(long, global = true)]
    preview_dpi: Option<u16>,

    /// Preview image format: png or jpeg (default: png)
    #[arg(long, global = true)]
    preview_format: Option<String>,

    /// JPEG quality for previews (1-100, default 85)
    #[arg(long, global = true)]
    jpeg_quality: Option<u8>,

    /// Dump effective merged config as TOML and exit
    #[arg(long, global = true)]
    dump_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Erase boxes and write the processed PDF
    Erase {
        /// Input PDF
        input: PathBuf,

        /// Output PDF
        #[arg(short, long)]
        output: PathBuf,

        /// Also write before/after previews of processed pages to this directory
        #[arg(long)]
        preview_dir: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Print the page count of a PDF
    Info {
        /// Input PDF
        input: PathBuf,
    },
    /// Render before/after previews without keeping the processed PDF
    Preview {
        /// Input PDF
        input: PathBuf,

        /// Directory for preview images
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn read_config(path: &Path) -> Option<EraseOptions> {
    let contents = std::fs::read_to_string(path).ok()?;
    match EraseOptions::from_toml(&contents) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

/// Load config from global and project-local TOML files.
/// The project-local file fully overrides the global one. Missing files are
/// silently ignored.
fn load_config() -> EraseOptions {
    let mut opts = EraseOptions::default();

    // 1. Global config: ~/.config/pdf-box-eraser/config.toml
    if let Some(config_dir) = dirs::config_dir() {
        if let Some(parsed) = read_config(&config_dir.join("pdf-box-eraser").join("config.toml")) {
            opts = parsed;
        }
    }

    // 2. Project-local config: ./.pdf-box-eraser.toml
    if let Some(parsed) = read_config(Path::new(".pdf-box-eraser.toml")) {
        opts = parsed;
    }

    opts
}

/// Apply CLI flags on top of config-loaded options.
/// Only overrides when the CLI flag was explicitly provided.
fn apply_cli_overrides(opts: &mut EraseOptions, cli: &Cli) {
    if cli.verbose > 0 {
        opts.verbose = cli.verbose;
    }

    if cli.start.is_some() {
        opts.start_page = cli.start;
    }
    if cli.end.is_some() {
        opts.end_page = cli.end;
    }

    if cli.compress {
        opts.compress_output = true;
    }
    if cli.inspect_unprefixed {
        opts.inspect_unprefixed_xobjects = true;
    }
    if cli.no_soft_masks {
        opts.follow_soft_masks = false;
    }

    if let Some(dpi) = cli.preview_dpi {
        opts.preview_dpi = dpi;
    }

    if let Some(ref name) = cli.preview_format {
        match PreviewFormat::from_name(name) {
            Some(format) => opts.preview_format = format,
            None => log::warn!("Unknown preview format '{}', keeping {:?}", name, opts.preview_format),
        }
    }

    if let Some(quality) = cli.jpeg_quality {
        opts.jpeg_quality = quality.clamp(1, 100);
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut options = load_config();
    apply_cli_overrides(&mut options, &cli);

    // Handle --dump-config
    if cli.dump_config {
        match options.to_toml() {
            Ok(s) => {
                println!("{}", s);
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }

    let result = match &cli.command {
        Some(Commands::Erase {
            input,
            output,
            preview_dir,
            json,
        }) => run_erase(input, output, preview_dir.as_deref(), *json, options),
        Some(Commands::Info { input }) => run_info(input),
        Some(Commands::Preview { input, output }) => run_preview(input, output, options),
        None => {
            // Legacy mode: positional args
            match (&cli.input, &cli.output) {
                (Some(input), Some(output)) => run_erase(input, output, None, false, options),
                _ => {
                    eprintln!("Usage: pdf-box-eraser <input.pdf> <output.pdf> [options]");
                    eprintln!("   or: pdf-box-eraser erase <input.pdf> -o <output.pdf> [options]");
                    process::exit(1);
                }
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn build_eraser(options: EraseOptions) -> BoxEraser {
    BoxEraser::new(options).progress_reporter(Box::new(|frac, stats| {
        if frac < 1.0 {
            log::info!("[{:3.0}%] {}", frac * 100.0, stats);
        } else {
            log::info!("Done!");
        }
    }))
}

/// Pages whose boxes were actually looked at, for previewing.
fn processed_pages(report: &EraseReport) -> Vec<u32> {
    report
        .pages
        .iter()
        .filter(|p| matches!(p.outcome, PageOutcome::Processed { .. }))
        .map(|p| p.page_number)
        .collect()
}

fn write_previews(original: &Path, processed: &Path, pages: &[u32], dir: &Path, options: &EraseOptions) -> Result<()> {
    if pages.is_empty() {
        log::info!("No processed pages to preview");
        return Ok(());
    }
    let pairs = render::render_before_after(original, processed, pages, options)
        .context("Failed to render previews")?;
    render::write_previews(&pairs, dir, options.preview_format)
        .with_context(|| format!("Failed to write previews to {}", dir.display()))?;
    Ok(())
}

fn run_erase(
    input: &Path,
    output: &Path,
    preview_dir: Option<&Path>,
    json: bool,
    options: EraseOptions,
) -> Result<()> {
    log::info!("Erasing boxes: {} → {}", input.display(), output.display());

    let (start, end) = (options.start_page, options.end_page);
    let eraser = build_eraser(options);

    let (mut doc, report) = eraser
        .process_pdf(input, start, end)
        .with_context(|| format!("Failed to process {}", input.display()))?;
    eraser
        .save(&mut doc, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let failed = report.failed_pages().count();
    if failed > 0 {
        log::warn!("{} page(s) could not be processed", failed);
    }

    if let Some(dir) = preview_dir {
        write_previews(input, output, &processed_pages(&report), dir, eraser.options())?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }

    Ok(())
}

fn run_info(input: &Path) -> Result<()> {
    let pages = eraser_pdf::page_count(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    println!("{}: {} page(s)", input.display(), pages);
    Ok(())
}

fn run_preview(input: &Path, output: &Path, options: EraseOptions) -> Result<()> {
    let total = eraser_pdf::page_count(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let range = PageRange::clamp(options.start_page, options.end_page, total)?;
    log::info!("Previewing pages {} of {}", range, input.display());

    let eraser = build_eraser(options);
    let processed = eraser
        .process_pdf_file(input, Some(range.start().into()), Some(range.end().into()))
        .with_context(|| format!("Failed to process {}", input.display()))?;

    let result = write_previews(
        input,
        &processed.path,
        &processed_pages(&processed.report),
        output,
        eraser.options(),
    );

    if let Err(e) = std::fs::remove_file(&processed.path) {
        log::warn!("Failed to remove {}: {}", processed.path.display(), e);
    }
    result
}
