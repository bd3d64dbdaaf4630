use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use readforme::{
    config::{self, Config},
    extract::UploadedDocument,
    logging,
    speech::{OpenAiSpeechClient, SpeechSynthesizer},
    summarization::{OpenAiSummarizationClient, SummarizationClient},
    upstream,
};

#[derive(Parser)]
#[command(
    name = "readforme-cli",
    about = "Extract, summarise, or read aloud a local document"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the document's extracted text.
    Extract {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print a plain-language summary of the document.
    Summarize {
        #[arg(long)]
        input: PathBuf,
        /// Target summary length; defaults to `SUMMARY_WORDS`.
        #[arg(long)]
        words: Option<usize>,
    },
    /// Write the document (or its summary) as MP3 speech.
    Speak {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        summarize: bool,
    },
}

#[tokio::main]
async fn main() {
    logging::init_cli_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Extract { input } => {
            let text = read_text(&input)?;
            println!("{text}");
        }
        Command::Summarize { input, words } => {
            let text = read_readable_text(&input)?;
            let config = config::load().context("Failed to load configuration")?;
            let target_words = words.unwrap_or(config.summary_words);
            let summary = summarizer(&config)?
                .summarize(&text, target_words)
                .await?;
            println!("{summary}");
        }
        Command::Speak {
            input,
            output,
            summarize,
        } => {
            let config = config::load().context("Failed to load configuration")?;
            let text = if summarize {
                let text = read_readable_text(&input)?;
                summarizer(&config)?
                    .summarize(&text, config.summary_words)
                    .await?
            } else {
                read_text(&input)?
            };
            let http = upstream::http_client().context("Failed to build HTTP client")?;
            let audio = OpenAiSpeechClient::new(http, &config)
                .synthesize(&text)
                .await
                .context("Speech synthesis failed")?;
            fs::write(&output, &audio)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!("Wrote {} bytes to {}", audio.len(), output.display());
        }
    }
    Ok(())
}

fn summarizer(config: &Config) -> Result<OpenAiSummarizationClient> {
    let http = upstream::http_client().context("Failed to build HTTP client")?;
    Ok(OpenAiSummarizationClient::new(http, config))
}

fn read_text(input: &Path) -> Result<String> {
    let filename = input
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable filename", input.display()))?;
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let document = UploadedDocument::new(filename, bytes)?;
    tracing::debug!(filename = %document.filename, kind = %document.kind, "Extracting");
    Ok(document.extract()?)
}

fn read_readable_text(input: &Path) -> Result<String> {
    let text = read_text(input)?;
    if text.trim().is_empty() {
        bail!(readforme::api::NO_READABLE_TEXT_MESSAGE);
    }
    Ok(text)
}
