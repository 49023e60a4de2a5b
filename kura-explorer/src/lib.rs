pub mod protocol;
pub mod render;
pub mod router;

use std::path::{Path, PathBuf};

use kura_core::ingest::FileKind;
use kura_core::{ExplorerSession, IngestError};

/// Load every checkpoint file found in `dir` into the session.
///
/// Returns the failures; files that loaded are already in the session.
pub async fn load_checkpoint(session: &mut ExplorerSession, dir: &Path) -> Vec<(PathBuf, IngestError)> {
    let paths: Vec<PathBuf> = FileKind::ALL
        .iter()
        .map(|kind| dir.join(kind.file_name()))
        .collect();

    session
        .load_files(&paths)
        .await
        .into_iter()
        .filter_map(|(path, result)| result.err().map(|e| (path, e)))
        .collect()
}
