//! cadence CLI — exercises the streaming TTS pipeline from the command line.
//!
//! ```text
//! cadence speak "hello world" [--model dummy]
//! cadence stream [--model dummy]   # reads stdin line by line
//! ```

use std::io::IsTerminal;
use std::sync::Arc;

use cadence_lib::engine::DummyEngine;
use cadence_lib::input::Input;
use cadence_lib::pipeline::{EngineChoice, Pipeline, PipelineConfig};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::info;

/// cadence — streaming text-to-speech pipeline
#[derive(Parser)]
#[command(name = "cadence", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize one string through the pipeline.
    Speak {
        /// Text to speak
        text: String,
        /// Model name to resolve through the registry
        #[arg(long, default_value = "dummy")]
        model: String,
    },
    /// Read stdin line by line, feeding the pipeline incrementally as
    /// fragments arrive. Press Ctrl-C to cancel mid-stream.
    Stream {
        #[arg(long, default_value = "dummy")]
        model: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Speak { text, model } => run_speak(text, model).await,
        Command::Stream { model } => run_stream(model).await,
    }
}

fn build_pipeline(model: String) -> Pipeline {
    let choice = if model == "dummy" {
        EngineChoice::Direct(Arc::new(DummyEngine::default()))
    } else {
        EngineChoice::Model {
            name: model,
            kwargs: Default::default(),
        }
    };
    Pipeline::new(choice, PipelineConfig::default()).expect("invalid pipeline configuration")
}

async fn run_speak(text: String, model: String) {
    let pipeline = build_pipeline(model);
    let stream = match pipeline.stream(text).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("failed to start pipeline: {e}");
            return;
        }
    };
    tokio::pin!(stream);

    while let Some((chunk, text)) = stream.next().await {
        println!("segment: {text:?} ({} bytes)", chunk.data.len());
    }
}

async fn run_stream(model: String) {
    let pipeline = build_pipeline(model);

    let stdin = tokio::io::stdin();
    if std::io::stdin().is_terminal() {
        eprintln!("reading fragments from stdin, one per line (Ctrl-D to finish)...");
    }
    let lines = LinesStream::new(BufReader::new(stdin).lines()).filter_map(|line| async move { line.ok() });
    let input = Input::from_stream(lines);

    let stream = match pipeline.stream(input).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("failed to start pipeline: {e}");
            return;
        }
    };
    tokio::pin!(stream);

    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
    let mut cancelled = false;

    loop {
        if cancelled {
            match stream.next().await {
                Some((chunk, text)) => println!("segment: {text:?} ({} bytes)", chunk.data.len()),
                None => break,
            }
            continue;
        }

        tokio::select! {
            next = stream.next() => {
                match next {
                    Some((chunk, text)) => println!("segment: {text:?} ({} bytes)", chunk.data.len()),
                    None => break,
                }
            }
            _ = &mut ctrl_c => {
                info!("cancelling pipeline");
                pipeline.cancel();
                cancelled = true;
            }
        }
    }
}
