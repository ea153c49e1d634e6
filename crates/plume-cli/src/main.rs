use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use plume_core::PlumeValue;
use plume_markup::{parse_document, project_read_mode, write_document};
use plume_widgets::ThemeMode;

#[derive(Parser)]
#[command(author, version, about = "Authoring-markup tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project authoring markup into its published read-mode form
    Render {
        input: PathBuf,
        /// Palette to resolve widget colors against
        #[arg(long, default_value = "light")]
        theme: String,
    },
    /// Dump the parsed document model as JSON
    Inspect { input: PathBuf },
    /// Parse and re-serialize, normalizing hand-authored markup
    Normalize { input: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render { input, theme } => render_command(input, &theme),
        Commands::Inspect { input } => inspect_command(input),
        Commands::Normalize { input } => normalize_command(input),
    }
}

fn load_document(input: &PathBuf) -> anyhow::Result<plume_core::Document> {
    let markup = fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    parse_document(&markup).with_context(|| format!("parsing {}", input.display()))
}

fn render_command(input: PathBuf, theme: &str) -> anyhow::Result<()> {
    let mode = match theme {
        "light" => ThemeMode::Light,
        "dark" => ThemeMode::Dark,
        other => anyhow::bail!("unknown theme {other:?} (expected light or dark)"),
    };

    let doc = load_document(&input)?;
    let projection = project_read_mode(&doc, mode);
    println!("{}", projection.markup);
    if projection.pending_math > 0 {
        eprintln!(
            "{} math span(s) await the typesetter",
            projection.pending_math
        );
    }
    Ok(())
}

fn inspect_command(input: PathBuf) -> anyhow::Result<()> {
    let doc = load_document(&input)?;
    let value = PlumeValue::from_document(doc);
    println!("{}", value.to_json_pretty()?);
    Ok(())
}

fn normalize_command(input: PathBuf) -> anyhow::Result<()> {
    let doc = load_document(&input)?;
    println!("{}", write_document(&doc));
    Ok(())
}
