//! Path-based adapter around the in-memory signing engine.
//!
//! The input is read completely before signing starts and the output is
//! written to a temporary file in the destination directory, then renamed
//! over the target. A failed run leaves the destination untouched.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::adapters::backend::CertificateSigner;
use crate::pipelines::sign::SignWorkflow;
use crate::{SigningError, SigningOptions, SigningResult};

/// Replace `path` with `bytes` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> SigningResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| {
        SigningError::IoError(format!(
            "Failed to create temporary file in {}: {e}",
            dir.display()
        ))
    })?;
    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| SigningError::IoError(format!("Failed to write temporary file: {e}")))?;
    temp.persist(path).map_err(|e| {
        SigningError::IoError(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

/// Sign the PE file at `input` and write the result to `output`.
///
/// `input` and `output` may be the same path.
pub fn sign_pe_file<S>(
    input: &Path,
    output: &Path,
    signer: &S,
    options: SigningOptions,
) -> SigningResult<()>
where
    S: CertificateSigner + ?Sized,
{
    log::info!("Signing {} -> {}", input.display(), output.display());
    let data = std::fs::read(input).map_err(|e| {
        SigningError::IoError(format!("Failed to read input file {}: {e}", input.display()))
    })?;

    let signed = SignWorkflow::new(options).sign(&data, signer)?;
    write_atomic(output, &signed)?;
    log::info!("Wrote signed image to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, b"old contents").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.bin");
        let err = write_atomic(&path, b"x").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
        assert!(!path.exists());
    }
}
