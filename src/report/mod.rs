//! Reports: text toplists, JSON dumps, header grep, and the payload classification table.

pub mod dump;
pub mod grep;
pub mod table;
pub mod toplist;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Open `path` for writing; `-` means stdout.
pub fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(std::io::stdout().lock())));
    }
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("Cannot create '{}': {e}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Open `path` for reading; `-` means stdin.
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(std::io::stdin().lock())));
    }
    if !path.is_file() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("Cannot open '{}': {e}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}
