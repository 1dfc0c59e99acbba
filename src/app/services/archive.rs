//! Archive unwrapping for primary+attachments payloads.
//!
//! Field data is often delivered as a zip holding one root-level
//! document plus side-car attachments in sub-paths. This module
//! classifies a raw payload against that convention without parsing
//! the primary document itself.

use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::app::models::ArchiveEntry;
use crate::constants::MAX_ATTACHMENT_BYTES;
use crate::error::{Error, Result};

/// An extracted side-car attachment
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub entry: ArchiveEntry,
    pub content: Vec<u8>,
}

/// Classification of a raw payload
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// Payload is not an archive the conventions recognize; the caller
    /// falls through to direct parsing
    NotAnArchive,
    /// Exactly one root-level entry plus at least one nested entry
    PrimaryWithAttachments {
        primary_name: String,
        primary: Vec<u8>,
        attachments: Vec<Attachment>,
    },
    /// Two or more root-level entries and nothing nested: a container
    /// of independent documents, offered to the chain entry by entry
    MultiEntry(Vec<(String, Vec<u8>)>),
}

/// Attempt to unwrap a payload against the archive conventions.
///
/// Structural failure to open the payload as an archive is not an
/// error. An entry whose declared size exceeds the in-memory buffer
/// limit is fatal.
pub fn unwrap(payload: &[u8], source: &Path) -> Result<Unwrapped> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(payload)) {
        Ok(archive) => archive,
        Err(_) => return Ok(Unwrapped::NotAnArchive),
    };

    let mut root_entries = Vec::new();
    let mut nested_entries = Vec::new();

    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(|e| Error::Archive {
            path: source.to_path_buf(),
            source: e,
        })?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if entry.size() > MAX_ATTACHMENT_BYTES {
            return Err(Error::AttachmentTooLarge {
                entry: name,
                size: entry.size(),
                limit: MAX_ATTACHMENT_BYTES,
            });
        }
        if name.contains('/') {
            nested_entries.push(index);
        } else {
            root_entries.push(index);
        }
    }

    match (root_entries.len(), nested_entries.len()) {
        (1, nested) if nested >= 1 => {
            let (primary_name, primary) = read_entry(&mut archive, root_entries[0], source)?;
            let mut attachments = Vec::with_capacity(nested);
            for index in nested_entries {
                let (path, content) = read_entry(&mut archive, index, source)?;
                attachments.push(Attachment {
                    entry: ArchiveEntry {
                        path,
                        size: content.len() as u64,
                    },
                    content,
                });
            }
            debug!(
                "{}: primary '{}' with {} attachment(s)",
                source.display(),
                primary_name,
                attachments.len()
            );
            Ok(Unwrapped::PrimaryWithAttachments {
                primary_name,
                primary,
                attachments,
            })
        }
        (roots, 0) if roots >= 2 => {
            let mut entries = Vec::with_capacity(roots);
            for index in root_entries {
                entries.push(read_entry(&mut archive, index, source)?);
            }
            debug!(
                "{}: container of {} independent entries",
                source.display(),
                entries.len()
            );
            Ok(Unwrapped::MultiEntry(entries))
        }
        _ => Ok(Unwrapped::NotAnArchive),
    }
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    index: usize,
    source: &Path,
) -> Result<(String, Vec<u8>)> {
    let mut entry = archive.by_index(index).map_err(|e| Error::Archive {
        path: source.to_path_buf(),
        source: e,
    })?;
    let name = entry.name().to_string();
    let mut content = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut content)?;
    Ok((name, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn source() -> &'static Path {
        Path::new("test.zip")
    }

    #[test]
    fn plain_bytes_are_not_an_archive() {
        let result = unwrap(b"just some text", source()).unwrap();
        assert_eq!(result, Unwrapped::NotAnArchive);
    }

    #[test]
    fn primary_and_attachments_round_trip() {
        let payload = build_zip(&[
            ("visit.json", b"primary payload"),
            ("attachments/photo.jpg", b"jpeg bytes"),
            ("attachments/notes.txt", b"field notes"),
        ]);

        match unwrap(&payload, source()).unwrap() {
            Unwrapped::PrimaryWithAttachments {
                primary_name,
                primary,
                attachments,
            } => {
                assert_eq!(primary_name, "visit.json");
                assert_eq!(primary, b"primary payload");
                assert_eq!(attachments.len(), 2);
                assert_eq!(attachments[0].entry.path, "attachments/photo.jpg");
                assert_eq!(attachments[0].content, b"jpeg bytes");
                assert_eq!(attachments[1].entry.path, "attachments/notes.txt");
                assert_eq!(attachments[1].content, b"field notes");
                assert_eq!(attachments[1].entry.size, 11);
            }
            other => panic!("expected primary+attachments, got {other:?}"),
        }
    }

    #[test]
    fn single_root_entry_without_attachments_is_not_an_archive() {
        let payload = build_zip(&[("visit.json", b"primary payload")]);
        assert_eq!(unwrap(&payload, source()).unwrap(), Unwrapped::NotAnArchive);
    }

    #[test]
    fn multiple_roots_with_nested_entries_is_not_an_archive() {
        let payload = build_zip(&[
            ("a.json", b"a"),
            ("b.json", b"b"),
            ("attachments/x.jpg", b"x"),
        ]);
        assert_eq!(unwrap(&payload, source()).unwrap(), Unwrapped::NotAnArchive);
    }

    #[test]
    fn multiple_root_entries_form_a_container() {
        let payload = build_zip(&[("a.json", b"first"), ("b.json", b"second")]);
        match unwrap(&payload, source()).unwrap() {
            Unwrapped::MultiEntry(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0], ("a.json".to_string(), b"first".to_vec()));
                assert_eq!(entries[1], ("b.json".to_string(), b"second".to_vec()));
            }
            other => panic!("expected multi-entry container, got {other:?}"),
        }
    }

    #[test]
    fn directory_entries_are_ignored() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("attachments/", SimpleFileOptions::default())
            .unwrap();
        writer
            .start_file("visit.json", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"primary").unwrap();
        writer
            .start_file("attachments/photo.jpg", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"jpeg").unwrap();
        let payload = writer.finish().unwrap().into_inner();

        match unwrap(&payload, source()).unwrap() {
            Unwrapped::PrimaryWithAttachments { attachments, .. } => {
                assert_eq!(attachments.len(), 1);
            }
            other => panic!("expected primary+attachments, got {other:?}"),
        }
    }
}
