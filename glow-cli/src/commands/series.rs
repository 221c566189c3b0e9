//! Series command implementation.

use anyhow::Result;
use colored::Colorize;
use glow_core::PhotoSeries;

/// Print one or all standard photo series.
pub fn execute(name: Option<PhotoSeries>, quiet: bool) -> Result<()> {
    let series: Vec<PhotoSeries> = match name {
        Some(series) => vec![series],
        None => PhotoSeries::ALL.to_vec(),
    };

    for series in series {
        if quiet {
            let angles: Vec<String> = series.angles().iter().map(|a| a.to_string()).collect();
            println!("{}\t{}", series, angles.join(","));
            continue;
        }
        println!();
        println!("{} {}", series.label().bold(), format!("({series})").dimmed());
        for (i, angle) in series.angles().iter().enumerate() {
            println!("   {:>2}. {}", i + 1, angle);
        }
    }
    Ok(())
}
