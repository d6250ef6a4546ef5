//! Zip assembly over whatever subset of a task's files downloaded.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes one deflate-compressed zip at `dest` from parallel source/name
/// slices.
///
/// A `None` or unreadable source is skipped, so a failed download never
/// poisons the rest of the bundle. Errors are returned only when the
/// container itself cannot be produced.
pub fn build_archive(
    sources: &[Option<PathBuf>],
    names: &[String],
    dest: &Path,
) -> anyhow::Result<()> {
    let file =
        File::create(dest).with_context(|| format!("create archive {}", dest.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (i, source) in sources.iter().enumerate() {
        let Some(path) = source else { continue };
        let mut src = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), "skipping archive entry: {e}");
                continue;
            }
        };
        if let Err(e) = zip.start_file(names[i].as_str(), options) {
            warn!(name = %names[i], "skipping archive entry: {e}");
            continue;
        }
        if let Err(e) = io::copy(&mut src, &mut zip) {
            warn!(name = %names[i], "archive entry truncated: {e}");
        }
    }

    zip.finish().context("finalize archive")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn skips_missing_and_unreadable_sources() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        std::fs::write(&kept, b"hello").unwrap();
        let dest = dir.path().join("out.zip");

        let sources = vec![None, Some(kept), Some(dir.path().join("gone.txt"))];
        let names = vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()];
        build_archive(&sources, &names, &dest).unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        let mut entry = zip.by_index(0).unwrap();
        assert_eq!(entry.name(), "b.txt");
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        assert_eq!(body, "hello");
    }

    #[test]
    fn empty_input_is_a_valid_empty_zip() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.zip");
        build_archive(&[], &[], &dest).unwrap();

        let zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn fails_when_destination_not_creatable() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("no-such-dir").join("out.zip");
        assert!(build_archive(&[], &[], &dest).is_err());
    }
}
