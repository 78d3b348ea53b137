use ycode_config::YcodeConfig;
use ycode_memory::{MemorySettings, MemoryStore, MemoryWrite};

use super::MemoryAction;

pub(super) fn cmd_memory(config: &YcodeConfig, action: MemoryAction) -> ycode_core::Result<()> {
    let store = MemoryStore::open(MemorySettings::from_config(config))?;

    match action {
        MemoryAction::Add {
            category,
            content,
            date,
            tags,
            project,
        } => {
            let status = store.add_memory(&MemoryWrite {
                category,
                content,
                date,
                tags,
                project,
            })?;
            println!("{status}");
        }
        MemoryAction::Search { query, limit } => {
            println!("{}", store.search(&query, limit)?);
        }
        MemoryAction::Context { input } => {
            match store.build_context_block(input.as_deref(), config.memory.max_profile_items)? {
                Some(block) => println!("{}", block.text_content()),
                None => println!("(memory is empty)"),
            }
        }
    }
    Ok(())
}
