//! Replay a recorded list of change sets against a document.

use std::path::Path;

use anyhow::{bail, Context};
use docmodel::{ChangeSet, Text};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "docmodel=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help") {
        print_help();
        return Ok(());
    }
    let invert = args.iter().any(|arg| arg == "--invert");
    let paths: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();
    let [document, changes] = paths.as_slice() else {
        print_help();
        bail!("expected a document and a change file");
    };

    let doc = read_document(Path::new(document.as_str()))?;
    let sets = read_changes(Path::new(changes.as_str()))?;
    tracing::info!(length = doc.len(), lines = doc.lines(), changes = sets.len(), "loaded document");

    let result = replay(&doc, &sets, invert)?;
    print!("{result}");
    return Ok(());
}

fn print_help() {
    println!("docmodel-replay\n");
    println!("Usage: docmodel-replay <document> <changes.json> [--invert]\n");
    println!("Applies a JSON array of change sets to the document in order and");
    println!("prints the result.\n");
    println!("Options:");
    println!("  --invert    Undo every change again through its inverse");
    println!("  --help      Show this help message");
    println!("\nEnvironment variables:");
    println!("  RUST_LOG    Log filter (default: docmodel=info)");
}

fn read_document(path: &Path) -> anyhow::Result<Text> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    return Ok(Text::from(content));
}

fn read_changes(path: &Path) -> anyhow::Result<Vec<ChangeSet>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let sets: Vec<ChangeSet> =
        serde_json::from_str(&content).with_context(|| format!("parsing change sets in {}", path.display()))?;
    return Ok(sets);
}

fn replay(doc: &Text, sets: &[ChangeSet], invert: bool) -> anyhow::Result<Text> {
    let mut current = doc.clone();
    let mut inverses = Vec::with_capacity(sets.len());
    for (i, set) in sets.iter().enumerate() {
        if invert {
            inverses.push(set.invert(&current).with_context(|| format!("inverting change {i}"))?);
        }
        current = set.apply(&current).with_context(|| format!("applying change {i}"))?;
        tracing::debug!(change = i, length = current.len(), "applied change");
    }
    tracing::info!(length = current.len(), lines = current.lines(), "replayed changes");

    if invert {
        for (i, inverse) in inverses.iter().enumerate().rev() {
            current = inverse.apply(&current).with_context(|| format!("undoing change {i}"))?;
        }
        if current != *doc {
            tracing::warn!("undoing every change did not restore the document");
            bail!("inverse replay diverged from the original document");
        }
        tracing::info!("inverse replay restored the original document");
    }
    return Ok(current);
}
