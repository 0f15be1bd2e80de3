//! quest-lint: load and cross-check quest content before it ships.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use quest_core::quest::QuestRegistry;
use quest_core::{DefinitionError, NpcDirectory, QuestConfig};

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quest_core=info,quest_lint=info")),
        )
        .init();

    let config_path = std::env::var_os("QUEST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("quests.toml"));

    let config = match QuestConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match lint(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Quest data is invalid: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn lint(config: &QuestConfig) -> Result<(), DefinitionError> {
    let mut npcs = NpcDirectory::new();
    npcs.load_from_directory(&config.data_dir)?;

    let mut registry = QuestRegistry::new();
    registry.load_from_directory(&config.data_dir)?;
    registry.validate(&npcs)?;
    registry.populate_offers(&mut npcs);

    let mut givers: Vec<_> = npcs.all().collect();
    givers.sort_by(|a, b| a.id.cmp(&b.id));
    for giver in givers {
        if !giver.has_quest_activity() {
            warn!("Giver '{}' offers no quests", giver.id);
            continue;
        }
        let offers: Vec<&str> = giver.offers().iter().map(|q| q.id.as_str()).collect();
        info!("{} ({}): {}", giver.display_name, giver.id, offers.join(", "));
    }

    let mut quest_ids: Vec<&String> = registry.ids().collect();
    quest_ids.sort();
    for quest_id in quest_ids {
        let Some(quest) = registry.get(quest_id) else {
            continue;
        };
        if quest.completion_giver() != quest.giver_id {
            info!("'{}' is turned in at '{}'", quest.id, quest.completion_giver());
        }
        for dependent in registry.dependents(quest_id) {
            let marker = if dependent.auto_complete { " (auto)" } else { "" };
            info!("Chain: {} -> {}{}", quest_id, dependent.id, marker);
        }
    }

    let longest = registry.longest_chain();
    if longest > config.max_chain_depth {
        warn!(
            "Longest quest chain ({}) exceeds max_chain_depth ({})",
            longest, config.max_chain_depth
        );
    }

    info!(
        "{} quests across {} givers OK, longest chain {}",
        registry.len(),
        npcs.len(),
        longest
    );
    Ok(())
}
