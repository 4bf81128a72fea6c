//! docforge CLI - convert local files to PDF.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docforge_core::{AppConfig, DocumentConverter};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "docforge")]
#[command(author, version, about = "Convert documents to PDF", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Office suite executable
    #[arg(long, global = true, env = "DOCFORGE_OFFICE_BINARY")]
    office_binary: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge PDFs into one, in the order given
    Merge {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert an office document (doc, docx, odt, xlsx, pptx, ...)
    Office {
        input: PathBuf,

        /// Output PDF (default: input with .pdf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a raster image
    Image {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render an HTML file
    Html {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn output_for(input: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| input.with_extension("pdf"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(binary) = args.office_binary {
        config.office.binary = binary;
    }
    config.validate().context("Invalid configuration")?;

    let converter = DocumentConverter::new(&config);

    let (pdf, output) = match args.command {
        Command::Merge { inputs, output } => {
            let mut documents = Vec::with_capacity(inputs.len());
            for input in &inputs {
                documents.push(read(input).await?);
            }
            info!("Merging {} documents", documents.len());
            let pdf = converter.merge(documents).await.context("Merge failed")?;
            (pdf, output)
        }
        Command::Office { input, output } => {
            let extension = input.extension().and_then(|ext| ext.to_str());
            let bytes = read(&input).await?;
            let pdf = converter
                .office(&bytes, extension)
                .await
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            (pdf, output_for(&input, output))
        }
        Command::Image { input, output } => {
            let bytes = read(&input).await?;
            let pdf = converter
                .image(bytes)
                .await
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            (pdf, output_for(&input, output))
        }
        Command::Html { input, output } => {
            let bytes = read(&input).await?;
            let pdf = converter
                .html(bytes)
                .await
                .with_context(|| format!("Failed to render {}", input.display()))?;
            (pdf, output_for(&input, output))
        }
    };

    tokio::fs::write(&output, &pdf)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    #[allow(clippy::print_stdout)]
    {
        println!("Wrote {} ({} bytes)", output.display(), pdf.len());
    }

    Ok(())
}
