use super::Document;
use crate::error::{EecalcError, Result};
use crate::protocol::Snapshot;
use eecalc_engine::engine::create_engine_with_functions;
use std::path::{Path, PathBuf};

const MAX_FUNCTION_FILE_BYTES: u64 = 1_048_576; // 1 MiB
const MAX_SNAPSHOT_FILE_BYTES: u64 = 4_194_304; // 4 MiB

fn read_bounded(path: &Path, max: u64, what: &str) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > max {
        return Err(EecalcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: {} too large ({} bytes, max {})",
                path.display(),
                what,
                meta.len(),
                max
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Read a snapshot (`{"cells": [...]}`) from a JSON file.
pub fn read_snapshot_file(path: &Path) -> Result<Snapshot> {
    let content = read_bounded(path, MAX_SNAPSHOT_FILE_BYTES, "snapshot file")?;
    Snapshot::from_json(&content)
}

/// Write a snapshot as pretty JSON.
pub fn write_snapshot_file(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}

impl Document {
    /// Load custom Rhai functions from a file (appends to existing functions).
    /// Returns the canonical path loaded, or an error.
    pub fn load_functions(&mut self, path: &Path) -> Result<PathBuf> {
        let path_buf = std::fs::canonicalize(path)?;
        let content = read_bounded(&path_buf, MAX_FUNCTION_FILE_BYTES, "functions file")?;

        if self.functions_files.contains(&path_buf) {
            // Already loaded: keep current compiled state unchanged.
            return Ok(path_buf);
        }

        let new_custom_functions = match &self.custom_functions {
            Some(existing) => format!("{}\n\n{}", existing, content),
            None => content,
        };

        self.install_functions(new_custom_functions)?;
        self.functions_files.push(path_buf.clone());
        tracing::info!(path = %path_buf.display(), "loaded functions");

        Ok(path_buf)
    }

    /// Re-read every loaded functions file, for picking up edits made while
    /// the sheet is open. Nothing changes unless all files read and compile.
    /// Returns the number of files reloaded.
    pub fn reload_functions(&mut self) -> Result<usize> {
        if self.functions_files.is_empty() {
            return Err(EecalcError::NoFunctionsLoaded);
        }

        let contents = self
            .functions_files
            .iter()
            .map(|path| read_bounded(path, MAX_FUNCTION_FILE_BYTES, "functions file"))
            .collect::<Result<Vec<String>>>()?;
        self.install_functions(contents.join("\n\n"))?;
        tracing::info!(files = contents.len(), "reloaded functions");

        Ok(contents.len())
    }

    /// Swap in `script` and a fresh engine, if the script compiles.
    fn install_functions(&mut self, script: String) -> Result<()> {
        let (engine, compile_error) = create_engine_with_functions(Some(&script));
        if let Some(err) = compile_error {
            return Err(EecalcError::RhaiCompile(err));
        }
        self.engine = engine;
        self.custom_functions = Some(script);
        Ok(())
    }

    /// The sheet as a snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.cells.texts())
    }

    /// Save the sheet texts to a JSON snapshot file.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        write_snapshot_file(path, &self.snapshot())
    }
}
