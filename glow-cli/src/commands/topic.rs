//! Topic command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::open_notary;

/// Create a clinic topic and print its id.
pub async fn execute_create(
    journal: Option<PathBuf>,
    memo: Option<String>,
    quiet: bool,
) -> Result<()> {
    let notary = open_notary(journal.as_deref())?;
    let topic_id = notary
        .create_topic(memo.as_deref())
        .await
        .context("Failed to create ledger topic")?;

    info!(topic_id = %topic_id, "Topic created");

    if quiet {
        // Still print the id so scripts can capture it.
        println!("{topic_id}");
    } else {
        println!();
        println!("{}", "Ledger topic created".green().bold());
        println!();
        println!("   {} {}", "Topic ID:".dimmed(), topic_id);
        if let Some(memo) = memo {
            println!("   {} {}", "Memo:".dimmed(), memo);
        }
        println!();
        println!(
            "   Pass {} to certify photos on this topic.",
            format!("--topic {topic_id}").cyan()
        );
    }
    Ok(())
}
