//! `fude`: drive an AI block over a document on disk.
//!
//! Usage:
//!   # Insert a block after positions 1..8, generate, print the updated doc
//!   fude generate --doc note.json --from 1 --to 8 --prompt "Summarize this"
//!
//!   # Same, but replace the block with the rendered response
//!   fude generate --doc note.json --prompt "Write a haiku" --insert --out note.json
//!
//!   # Offline, no API key needed
//!   fude generate --doc note.json --prompt "Hello" --provider echo
//!
//!   fude key set <KEY>
//!   fude render --doc note.json

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fude_block::{
    BlockSession, Completion, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    block_schema,
};
use fude_doc::MemoryEditor;
use fude_llm::{ProviderKind, client_for};
use fude_markup::MarkupConverter;
use fude_types::CREDENTIAL_KEY;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::FudeConfig;

#[derive(Parser, Debug)]
#[command(name = "fude")]
#[command(about = "AI generation block for rich-text documents")]
struct Args {
    /// Config file (default: <config dir>/fude/config.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert a block into a document and generate a response for it
    Generate {
        /// Document JSON
        #[arg(long)]
        doc: PathBuf,

        /// Selection start (default: end of document)
        #[arg(long)]
        from: Option<usize>,

        /// Selection end (default: same as --from)
        #[arg(long)]
        to: Option<usize>,

        #[arg(long)]
        prompt: String,

        /// Replace the block with the rendered response
        #[arg(long)]
        insert: bool,

        /// Write the document here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Override the configured provider
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// Use (and store) this API key
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Print a document as HTML
    Render {
        #[arg(long)]
        doc: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    Set { key: String },
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = FudeConfig::load(args.config.as_deref())?;
    match args.command {
        Command::Generate {
            doc,
            from,
            to,
            prompt,
            insert,
            out,
            provider,
            api_key,
        } => {
            let request = GenerateArgs {
                doc,
                from,
                to,
                prompt,
                insert,
                out,
                provider: provider.unwrap_or(config.provider),
                api_key,
            };
            cmd_generate(&config, request).await
        }
        Command::Key { action } => cmd_key(&config, action),
        Command::Render { doc } => cmd_render(&doc),
    }
}

struct GenerateArgs {
    doc: PathBuf,
    from: Option<usize>,
    to: Option<usize>,
    prompt: String,
    insert: bool,
    out: Option<PathBuf>,
    provider: ProviderKind,
    api_key: Option<String>,
}

fn open_store(config: &FudeConfig) -> Result<Arc<dyn CredentialStore>> {
    let path = config
        .credentials_path
        .clone()
        .or_else(FileCredentialStore::default_path);
    match path {
        Some(path) => Ok(Arc::new(FileCredentialStore::open(path)?)),
        None => {
            tracing::warn!("no data directory; the API key will not be saved");
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
    }
}

fn load_doc(path: &Path) -> Result<MemoryEditor> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(MemoryEditor::from_json(Arc::new(block_schema()), value)?)
}

async fn cmd_generate(config: &FudeConfig, args: GenerateArgs) -> Result<()> {
    let mut editor = load_doc(&args.doc)?;
    let from = args.from.unwrap_or_else(|| editor.size());
    editor.select_range(from, args.to.unwrap_or(from))?;

    let client = client_for(args.provider, &config.gemini)?;
    let mut session = BlockSession::new(client, open_store(config)?, config.session.clone())
        .with_converter(MarkupConverter::new(config.markup.clone()));

    let id = session.insert_block(&mut editor)?;
    tracing::info!(node = %id, provider = session.client_name(), "block inserted");
    if let Some(key) = &args.api_key {
        session.set_credential(id, key)?;
    }
    if !session.submit(id, &args.prompt)? {
        bail!("prompt is empty");
    }

    let done = session.settle(&mut editor).await?;
    if let Some(view) = session.view(id) {
        eprintln!("{view}");
    }
    if !done.iter().any(|(_, c)| *c == Completion::Applied) {
        let message = session
            .controller(id)
            .and_then(|c| c.error_message())
            .unwrap_or("generation did not finish")
            .to_string();
        bail!(message);
    }

    if args.insert && !session.insert(id, &mut editor)? {
        tracing::warn!("empty response, block left in place");
    }

    let json = serde_json::to_string_pretty(&editor.to_json()?)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_key(config: &FudeConfig, action: KeyAction) -> Result<()> {
    let store = open_store(config)?;
    match action {
        KeyAction::Set { key } => {
            store.set(CREDENTIAL_KEY, &key)?;
            println!("API key saved");
        }
        KeyAction::Show => {
            let key = store.api_key()?;
            if key.is_empty() {
                println!("(not set)");
            } else {
                println!("{}", mask(&key));
            }
        }
    }
    Ok(())
}

fn cmd_render(doc: &Path) -> Result<()> {
    let editor = load_doc(doc)?;
    println!("{}", editor.to_html()?);
    Ok(())
}

/// Last four characters, the rest starred.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{tail}", "*".repeat(hidden))
}
