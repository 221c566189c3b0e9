//! Decrypt command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::{image_extension, load_bundle};

/// `photo.png.glow` becomes `photo.png.certified.<ext>`.
fn default_output(bundle: &Path, extension: &str) -> PathBuf {
    let stem = bundle
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    bundle.with_file_name(format!("{stem}.certified.{extension}"))
}

/// Execute the decrypt command.
pub fn execute(bundle_path: PathBuf, output: Option<PathBuf>, quiet: bool) -> Result<()> {
    let bundle = load_bundle(&bundle_path)?;
    let image = bundle
        .decrypt_image()
        .context("Failed to decrypt bundle image")?;

    let output = output.unwrap_or_else(|| default_output(&bundle_path, image_extension(&image)));
    std::fs::write(&output, &image)
        .with_context(|| format!("Failed to write image {}", output.display()))?;

    info!(path = %output.display(), bytes = image.len(), "Decrypted image written");

    if !quiet {
        println!();
        println!("{}", "Watermarked image decrypted".green().bold());
        println!();
        println!("   {} {}", "Written to:".dimmed(), output.display());
        println!("   {} {} bytes", "Size:".dimmed(), image.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("/tmp/photo.png.glow"), "png"),
            PathBuf::from("/tmp/photo.png.certified.png")
        );
        assert_eq!(
            default_output(Path::new("bundle"), "jpg"),
            PathBuf::from("bundle.certified.jpg")
        );
    }
}
