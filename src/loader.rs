//! Loading `.fbs` schemas and their includes from disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use flatrecord_core::parser::{self, ParseError, SchemaFile};
use flatrecord_core::types::Schema;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file failed to parse. Keeps its text for rendering.
    #[error("{}: {error}", path.display())]
    Parse {
        path: PathBuf,
        text: String,
        error: ParseError,
    },

    #[error(transparent)]
    Codec(#[from] flatrecord_core::Error),
}

/// Load the schema at `path` and every file it includes.
///
/// Includes are resolved relative to the including file, and each file is
/// read once. The namespace and `root_type` of `path` win over those of its
/// includes.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Schema, Error> {
    let mut files: Vec<SchemaFile> = Vec::new();
    let mut seen = HashSet::new();
    let mut pending = vec![path.as_ref().to_path_buf()];

    while let Some(path) = pending.pop() {
        let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let file = match parser::parse_file(&text) {
            Ok(file) => file,
            Err(error) => return Err(Error::Parse { path, text, error }),
        };
        let dir = path.parent().unwrap_or(Path::new(""));
        pending.extend(file.includes.iter().rev().map(|include| dir.join(include)));
        files.push(file);
    }

    Ok(parser::lower(&files)?)
}
