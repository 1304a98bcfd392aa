//! Artifact lookup and backend listing

use crate::artifact::ArtifactStore;
use crate::config::Config;
use crate::llm::Backend;
use anyhow::Result;

/// Print the resolved path of an artifact in the store
pub fn fetch_command(config: &Config, filename: &str) -> Result<()> {
    let store = ArtifactStore::open(&config.store.output_dir)?;
    let path = store.resolve(filename)?;
    println!("{}", path.display());
    Ok(())
}

pub fn models_command(json: bool) -> Result<()> {
    if json {
        let listing: serde_json::Map<String, serde_json::Value> = Backend::ALL
            .iter()
            .map(|b| (b.tag().to_string(), serde_json::json!(b.known_models())))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for backend in Backend::ALL {
        println!("{}", backend);
        for model in backend.known_models() {
            println!("  {}", model);
        }
    }
    Ok(())
}
