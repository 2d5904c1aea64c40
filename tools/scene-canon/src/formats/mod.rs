//! Canonical scene output
//!
//! The canonical scene is written as pretty-printed JSON with a trailing
//! newline. Every collection in it is ordered, so identical input gives
//! byte-identical output.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::session::CanonicalScene;

/// Write a canonical scene to any writer
pub fn write_canonical_scene<W: Write>(w: &mut W, scene: &CanonicalScene) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, scene).context("Failed to serialize canonical scene")?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write a canonical scene to a file, or stdout when no path is given
pub fn write_canonical_scene_to(output: Option<&Path>, scene: &CanonicalScene) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output: {:?}", path))?;
            let mut writer = BufWriter::new(file);
            write_canonical_scene(&mut writer, scene)?;
            writer.flush()?;
            tracing::info!("Wrote {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_canonical_scene(&mut writer, scene)?;
        }
    }
    Ok(())
}
