//! `docqa`: ingest documents into a local index and ask questions about them.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use docqa_core::{Config, Settings};
use docqa_rag::{Answer, Pipeline};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docqa", version, about = "Local document question answering")]
struct Cli {
    /// Directory holding config.toml / config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Increase log verbosity (-v, -vv); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed a file or directory of documents into an index
    Ingest {
        /// Input file or directory (json, txt, docx, pdf)
        #[arg(short, long)]
        input: PathBuf,
        /// Index directory [default: index.location]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Embedding model [default: embedding.model]
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Run a single query and print the results
    Query {
        query: String,
        #[arg(short, long)]
        index: Option<PathBuf>,
        /// Number of chunks to retrieve [default: retrieval.top_k]
        #[arg(short)]
        k: Option<usize>,
    },
    /// Interactive question loop
    Chat {
        #[arg(short, long)]
        index: Option<PathBuf>,
        #[arg(short)]
        k: Option<usize>,
        /// Show only generated answers, not the retrieved documents
        #[arg(long)]
        hide_docs: bool,
    },
    /// Print the header of a persisted index
    Info {
        #[arg(short, long)]
        index: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();
}

fn index_location(settings: &Settings, base: &Path, arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| docqa_core::config::resolve_with_base(base, &settings.index.location))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_from(&cli.config_dir).context("loading configuration")?;
    let mut settings = config.settings()?;

    match cli.command {
        Command::Ingest { input, output, model } => {
            if let Some(model) = model {
                settings.embedding.model = model;
            }
            let location = index_location(&settings, &cli.config_dir, output);
            let pipeline = Pipeline::from_settings(settings)?;
            let report = pipeline.ingest_report(&input, &location).context("ingestion failed")?;
            println!(
                "Indexed {} chunks from {} file(s) with {} (dim {}) into {} (generation {})",
                report.chunks,
                report.files,
                report.model_id,
                report.dim,
                report.location.display(),
                report.generation
            );
        }
        Command::Query { query, index, k } => {
            let location = index_location(&settings, &cli.config_dir, index);
            let k = k.unwrap_or(settings.retrieval.top_k);
            let pipeline = Pipeline::from_settings(settings)?;
            let answer = pipeline.answer(&query, &location, k);
            print_answer(&answer, true);
            if let Some(e) = answer.error {
                if answer.chunks.is_empty() {
                    bail!(e);
                }
            }
        }
        Command::Chat { index, k, hide_docs } => {
            let location = index_location(&settings, &cli.config_dir, index);
            let k = k.unwrap_or(settings.retrieval.top_k);
            let pipeline = Pipeline::from_settings(settings)?;
            chat(&pipeline, location, k, !hide_docs)?;
        }
        Command::Info { index } => {
            let location = index_location(&settings, &cli.config_dir, index);
            let info = docqa_index::read_info(&location)?;
            println!("{}", describe_index(&location, &info));
        }
    }
    Ok(())
}

fn describe_index(location: &Path, info: &docqa_index::IndexInfo) -> String {
    format!(
        "location:   {}\ngeneration: {}\nmodel:      {}\nmetric:     {}\ndim:        {}\nentries:    {}\ncreated:    {}\nchecksum:   {}",
        location.display(),
        info.generation,
        info.model_id,
        info.metric,
        info.dim,
        info.count,
        info.created_at,
        info.checksum
    )
}

fn print_answer(answer: &Answer, show_docs: bool) {
    if let Some(e) = &answer.error {
        eprintln!("Error: {e}");
    }
    if show_docs {
        println!("\nRETRIEVED DOCUMENTS:");
        println!("{}", answer.formatted_text);
    }
    if let Some(text) = &answer.answer {
        println!("\nANSWER:");
        println!("{text}");
    }
}

fn print_help() {
    println!("\nUsage:");
    println!("  - Ask any question about your documents");
    println!("  - Type 'exit' or 'quit' to end the session");
    println!("  - Type 'help' to see this message");
    println!("  - Type 'source' to switch to another index directory");
}

fn prompt(stdin: &mut impl BufRead, text: &str) -> io::Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn chat(pipeline: &Pipeline, mut location: PathBuf, k: usize, show_docs: bool) -> anyhow::Result<()> {
    println!("Document Q&A  (index: {})", location.display());
    println!("Type 'exit' or 'quit' to end the session, 'help' for usage.");

    let mut stdin = io::stdin().lock();
    while let Some(query) = prompt(&mut stdin, "\n> ")? {
        match query.to_lowercase().as_str() {
            "" => {}
            "exit" | "quit" => break,
            "help" => print_help(),
            "source" => {
                let Some(path) = prompt(&mut stdin, "Index directory: ")? else { break };
                let path = docqa_core::config::expand_path(path);
                if docqa_index::exists(&path) {
                    println!("Now using index at {}", path.display());
                    location = path;
                } else {
                    println!("No index found at {}", path.display());
                }
            }
            _ => print_answer(&pipeline.answer(&query, &location, k), show_docs),
        }
    }
    println!("Goodbye.");
    Ok(())
}
