//! Convert Linked Art place and polity exports into a search field catalog.
//!
//! Usage:
//!   cargo run -p convert_catalog -- places data/places --output places.json
//!   cargo run -p convert_catalog -- polities data/polities/sample_framed.jsonld
//!   cargo run -p convert_catalog -- merge places.json polities.json --output catalog.json

mod linked_art;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use searchfield_core::{Entity, EntityCatalog};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use linked_art::{entity_from_record, place_record, polity_records, RecordKind};

#[derive(Parser, Debug)]
#[command(name = "convert_catalog")]
#[command(about = "Convert Linked Art JSON-LD into catalog JSON")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output file (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Every *.json file of a directory holds one place
    Places { dir: PathBuf },
    /// One JSON-LD file whose @graph lists every polity
    Polities { file: PathBuf },
    /// Concatenate catalog files, dropping repeated ids
    Merge { files: Vec<PathBuf> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let entities = match &args.command {
        Command::Places { dir } => convert_places(dir)?,
        Command::Polities { file } => convert_polities(file)?,
        Command::Merge { files } => merge(files)?,
    };
    tracing::info!(count = entities.len(), "converted entities");

    let json = serde_json::to_string_pretty(&entities)?;
    match args.output {
        Some(path) => std::fs::write(&path, json + "\n")
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn convert_places(dir: &Path) -> Result<Vec<Entity>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut entities = Vec::with_capacity(files.len());
    for path in files {
        tracing::debug!(file = %path.display(), "processing place");
        let document = read_json(&path)?;
        match entity_from_record(place_record(&document), RecordKind::Place) {
            Some(entity) => entities.push(entity),
            None => tracing::debug!(file = %path.display(), "no appellations, skipped"),
        }
    }
    Ok(entities)
}

fn convert_polities(file: &Path) -> Result<Vec<Entity>> {
    let document = read_json(file)?;
    Ok(polity_records(&document)
        .into_iter()
        .filter_map(|record| entity_from_record(record, RecordKind::Polity))
        .collect())
}

fn merge(files: &[PathBuf]) -> Result<Vec<Entity>> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for path in files {
        let catalog = EntityCatalog::load_json(path)?;
        for entity in catalog.iter() {
            if seen.insert(entity.id.clone()) {
                merged.push(Entity::clone(entity));
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_places_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"id": "b", "type": "Place", "is_appellative_subject_of": {
                "classified_as": ["http://vocab.getty.edu/aat/300404670"],
                "ascribes_appellation": {"content": "Paris"}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"@graph": [{"id": "a", "type": "Place", "is_appellative_subject_of": null}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not json").unwrap();

        let entities = convert_places(dir.path()).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].label, "Paris");
    }

    #[test]
    fn test_output_loads_as_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let entities = vec![
            Entity::new("a", "Place", "Rome").with_alternatives(["Roma"]),
            Entity::new("b", "Group", ""),
        ];
        std::fs::write(&path, serde_json::to_string_pretty(&entities).unwrap()).unwrap();

        let merged = merge(&[path.clone(), path]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].alternatives, vec!["Roma"]);
    }
}
