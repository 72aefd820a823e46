use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use tracing::{info, Level};

use crate::{ManualEditState, ManualEditsError};

/// Read the raw document text, `None` if there is no file yet.
///
/// The text is returned unparsed so the caller decides how a malformed document is handled.
#[tracing::instrument(level = Level::DEBUG)]
pub fn read_document_text(file_path: &Path) -> Result<Option<String>, ManualEditsError> {
    let mut file = match File::open(file_path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(ManualEditsError::IoError(error)),
    };

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(ManualEditsError::IoError)?;

    Ok(Some(content))
}

/// Documents are always rewritten in full.
pub fn save(state: &ManualEditState, file_path: &Path) -> Result<(), ManualEditsError> {
    info!("Saving manual edits. path: {:?}", file_path);

    let content = state.to_json_string()?;

    let mut file = File::create(file_path).map_err(ManualEditsError::IoError)?;
    file.write_all(content.as_bytes())
        .map_err(ManualEditsError::IoError)?;

    Ok(())
}
