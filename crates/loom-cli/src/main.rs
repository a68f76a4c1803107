use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use loom_editor_core::{Editor, FileStore, InsertTarget, LoomConfig};
use loom_editor_io::{
    AttachmentEvent, DirectoryUploader, FileInput, FilePersister, InputSource, MediaEvent,
    MediaPipeline, save,
};
use miette::{IntoDiagnostic, Result};

#[derive(Parser)]
#[command(version, about = "loom - rich-text document tools", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(long, global = true, env = "LOOM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print it back in canonical form
    Normalize {
        /// HTML or JSON document
        input: PathBuf,

        /// Print the JSON tree instead of HTML
        #[arg(long)]
        json: bool,

        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload images into a directory, insert them and save the document
    Attach {
        /// HTML or JSON document to attach to
        document: PathBuf,

        /// Files to attach; anything that is not an image is skipped
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory receiving the uploaded files
        #[arg(long)]
        uploads: PathBuf,

        /// Output base path; writes <out>.html and <out>.json
        #[arg(long)]
        out: PathBuf,

        /// Append images at the end instead of at the cursor
        #[arg(long)]
        end: bool,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Target path (.toml or .json)
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LoomConfig::load(&FileStore::new(path)).await?,
        None => LoomConfig::default(),
    };

    match cli.command {
        Commands::Normalize { input, json, out } => normalize(&config, &input, json, out).await?,
        Commands::Attach {
            document,
            files,
            uploads,
            out,
            end,
        } => attach(config, &document, files, uploads, out, end).await?,
        Commands::InitConfig { path } => {
            LoomConfig::default().save(&FileStore::new(&path)).await?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

async fn open_document(config: &LoomConfig, path: &Path) -> Result<Editor> {
    let text = tokio::fs::read_to_string(path).await.into_diagnostic()?;
    let mut editor = Editor::new(config.editor.clone());
    if path.extension().is_some_and(|ext| ext == "json") {
        let value: serde_json::Value = serde_json::from_str(&text).into_diagnostic()?;
        editor.set_json(value)?;
    } else {
        for fallback in editor.set_content(&text) {
            tracing::warn!(kind = ?fallback.kind, detail = %fallback.detail, "parse fallback");
        }
    }
    Ok(editor)
}

async fn normalize(config: &LoomConfig, input: &Path, json: bool, out: Option<PathBuf>) -> Result<()> {
    let editor = open_document(config, input).await?;
    let rendered = if json {
        serde_json::to_string_pretty(&editor.to_json()).into_diagnostic()?
    } else {
        editor.to_html()
    };
    match out {
        Some(path) => tokio::fs::write(&path, rendered).await.into_diagnostic()?,
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn attach(
    mut config: LoomConfig,
    document: &Path,
    files: Vec<PathBuf>,
    uploads: PathBuf,
    out: PathBuf,
    end: bool,
) -> Result<()> {
    if end {
        config.media.insert_target = InsertTarget::End;
    }
    let mut editor = open_document(&config, document).await?;

    let mut inputs = Vec::with_capacity(files.len());
    for path in &files {
        let data = tokio::fs::read(path).await.into_diagnostic()?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        inputs.push(FileInput::new(name, None, data));
    }

    let mut pipeline = MediaPipeline::new(DirectoryUploader::new(uploads), config.media.clone());
    let attachment = pipeline.attach(AttachmentEvent::new(InputSource::Picker, inputs));
    if attachment.claim.rejected > 0 {
        println!("Skipped {} file(s) that are not images", attachment.claim.rejected);
    }

    let mut inserted = 0;
    for event in pipeline.settle(&mut editor).await {
        match event {
            MediaEvent::Inserted { filename, url, .. } => {
                inserted += 1;
                println!("✓ {filename} -> {url}");
            }
            MediaEvent::Failed(failure) => {
                println!("✗ {}: {}", failure.filename, failure.error);
            }
            MediaEvent::InsertRejected {
                filename, error, ..
            } => {
                println!("✗ {filename}: {error}");
            }
        }
    }
    pipeline.dispose();

    let persister = FilePersister::new(&out);
    save(&editor, &persister).await?;
    println!(
        "Inserted {inserted} image(s); saved {} and {}",
        persister.html_path().display(),
        persister.json_path().display()
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() {
    // a hook can only be installed once per process; keep the first
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    miette::set_panic_hook();
}
