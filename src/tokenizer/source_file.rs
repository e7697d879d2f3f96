use std::io::{self, Write};
use std::path::Path;
use std::process::Stdio;
use tempfile::NamedTempFile;

use super::SourceInput;

/// Private on-disk copy of a source buffer.
///
/// The parser needs a real file (as stdin or as a path). The file is removed
/// when this value drops, whichever way the parse ends.
pub(crate) struct SourceFile {
    file: NamedTempFile,
}

impl SourceFile {
    pub(crate) fn create(source: SourceInput<'_>) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("corpus-miner-")
            .tempfile()?;

        match source {
            SourceInput::Text(text) => file.write_all(text.as_bytes())?,
            SourceInput::Bytes(bytes) => file.write_all(bytes)?,
            SourceInput::Reader(reader) => {
                io::copy(reader, &mut file)?;
            }
        }
        file.flush()?;

        Ok(Self { file })
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// A fresh read handle positioned at the start of the file
    pub(crate) fn stdin(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.file.reopen()?))
    }
}
