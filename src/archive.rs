// 📦 Archive Resolver - input file -> one flat payload to parse
//
// A flat container (.sd3) is its own payload. A compressed container (.zip)
// holds the payload as a member, picked by extension priority and extracted
// to a scratch file that is removed when the ResolvedPayload is dropped.

use crate::error::{IngestError, Result};
use crate::parser::Dialect;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// .sd3, the file is the payload
    Flat,
    /// .zip, the payload is an inner .cl2/.hy3 member
    Compressed,
}

impl ContainerKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("sd3") => Ok(ContainerKind::Flat),
            Some("zip") => Ok(ContainerKind::Compressed),
            _ => Err(IngestError::ArchiveFormat(path.to_path_buf())),
        }
    }
}

// ============================================================================
// ARCHIVE ITEM
// ============================================================================

/// One input file plus its member listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveItem {
    pub path: PathBuf,
    pub kind: ContainerKind,
    pub members: Vec<String>,
}

impl ArchiveItem {
    /// Classify a file and list its members (a flat container lists itself)
    pub fn scan(path: &Path) -> Result<Self> {
        let kind = ContainerKind::from_path(path)?;

        let members = match kind {
            ContainerKind::Flat => path
                .file_name()
                .map(|n| vec![n.to_string_lossy().into_owned()])
                .unwrap_or_default(),
            ContainerKind::Compressed => {
                let archive = ZipArchive::new(File::open(path)?)?;
                archive.file_names().map(String::from).collect()
            }
        };

        Ok(ArchiveItem {
            path: path.to_path_buf(),
            kind,
            members,
        })
    }
}

/// First member whose extension matches the earliest dialect in `priority`
pub fn select_member(members: &[String], priority: &[Dialect]) -> Option<(String, Dialect)> {
    priority.iter().find_map(|dialect| {
        members
            .iter()
            .find(|m| Dialect::from_path(Path::new(m.as_str())) == Some(*dialect))
            .map(|m| (m.clone(), *dialect))
    })
}

// ============================================================================
// RESOLVED PAYLOAD
// ============================================================================

/// The flat file to parse. Holds the scratch file (if any) alive.
#[derive(Debug)]
pub struct ResolvedPayload {
    pub source: PathBuf,
    pub kind: ContainerKind,
    pub dialect: Dialect,
    scratch: Option<NamedTempFile>,
}

impl ResolvedPayload {
    pub fn path(&self) -> &Path {
        match &self.scratch {
            Some(tmp) => tmp.path(),
            None => &self.source,
        }
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

#[derive(Debug, Clone)]
pub struct ArchiveResolver {
    scratch_dir: Option<PathBuf>,
    priority: Vec<Dialect>,
}

impl ArchiveResolver {
    pub fn new(scratch_dir: Option<PathBuf>, priority: Vec<Dialect>) -> Self {
        ArchiveResolver {
            scratch_dir,
            priority,
        }
    }

    pub fn resolve(&self, item: &ArchiveItem) -> Result<ResolvedPayload> {
        match item.kind {
            ContainerKind::Flat => {
                debug!("Flat container {}", item.path.display());
                Ok(ResolvedPayload {
                    source: item.path.clone(),
                    kind: item.kind,
                    dialect: Dialect::Sd3,
                    scratch: None,
                })
            }
            ContainerKind::Compressed => {
                let (member, dialect) = select_member(&item.members, &self.priority)
                    .ok_or_else(|| IngestError::MissingPayload {
                        archive: item.path.clone(),
                        expected: self
                            .priority
                            .iter()
                            .map(|d| format!(".{}", d.extension()))
                            .collect::<Vec<_>>()
                            .join(" or "),
                    })?;

                let scratch = self.extract(&item.path, &member, dialect)?;
                info!(
                    "Extracted {} from {} to {}",
                    member,
                    item.path.display(),
                    scratch.path().display()
                );

                Ok(ResolvedPayload {
                    source: item.path.clone(),
                    kind: item.kind,
                    dialect,
                    scratch: Some(scratch),
                })
            }
        }
    }

    fn extract(&self, archive_path: &Path, member: &str, dialect: Dialect) -> Result<NamedTempFile> {
        let mut archive = ZipArchive::new(File::open(archive_path)?)?;
        let mut entry = archive.by_name(member)?;

        let suffix = format!(".{}", dialect.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("swim-registrar-").suffix(&suffix);
        let mut scratch = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        io::copy(&mut entry, &mut scratch)?;
        scratch.flush()?;
        Ok(scratch)
    }
}

impl Default for ArchiveResolver {
    fn default() -> Self {
        Self::new(None, vec![Dialect::Cl2, Dialect::Hy3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn create_test_zip(dir: &Path, name: &str, members: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        for (member, contents) in members {
            writer.start_file(*member, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_container_kind() {
        assert_eq!(ContainerKind::from_path(Path::new("a.sd3")).unwrap(), ContainerKind::Flat);
        assert_eq!(ContainerKind::from_path(Path::new("a.ZIP")).unwrap(), ContainerKind::Compressed);
        assert!(matches!(
            ContainerKind::from_path(Path::new("a.txt")),
            Err(IngestError::ArchiveFormat(_))
        ));
        assert!(ContainerKind::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_select_member_priority() {
        let members = vec!["meet.hy3".to_string(), "meet.cl2".to_string()];
        let priority = [Dialect::Cl2, Dialect::Hy3];

        assert_eq!(
            select_member(&members, &priority),
            Some(("meet.cl2".to_string(), Dialect::Cl2))
        );
        assert_eq!(
            select_member(&["x.HY3".to_string()], &priority),
            Some(("x.HY3".to_string(), Dialect::Hy3))
        );
        assert_eq!(select_member(&["readme.txt".to_string()], &priority), None);
    }

    #[test]
    fn test_resolve_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.sd3");
        fs::write(&path, "A0").unwrap();

        let item = ArchiveItem::scan(&path).unwrap();
        assert_eq!(item.members, vec!["roster.sd3".to_string()]);

        let payload = ArchiveResolver::default().resolve(&item).unwrap();
        assert_eq!(payload.dialect, Dialect::Sd3);
        assert_eq!(payload.path(), path.as_path());
    }

    #[test]
    fn test_resolve_zip_prefers_cl2_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let zip = create_test_zip(
            dir.path(),
            "results.zip",
            &[("meet.hy3", "hy3 contents"), ("meet.cl2", "cl2 contents")],
        );

        let resolver = ArchiveResolver::new(
            Some(scratch.path().to_path_buf()),
            vec![Dialect::Cl2, Dialect::Hy3],
        );
        let item = ArchiveItem::scan(&zip).unwrap();
        assert_eq!(item.members.len(), 2);

        let payload = resolver.resolve(&item).unwrap();
        assert_eq!(payload.dialect, Dialect::Cl2);
        assert_eq!(fs::read_to_string(payload.path()).unwrap(), "cl2 contents");

        let extracted = payload.path().to_path_buf();
        assert!(extracted.starts_with(scratch.path()));
        drop(payload);
        assert!(!extracted.exists());
    }

    #[test]
    fn test_resolve_zip_missing_payload() {
        let dir = tempfile::tempdir().unwrap();
        let zip = create_test_zip(dir.path(), "bad.zip", &[("notes.txt", "nothing")]);

        let item = ArchiveItem::scan(&zip).unwrap();
        let err = ArchiveResolver::default().resolve(&item).unwrap_err();
        assert!(matches!(err, IngestError::MissingPayload { .. }));
        assert!(err.to_string().ends_with("contains no .cl2 or .hy3 file"));

        let hy3_only = ArchiveResolver::new(None, vec![Dialect::Hy3]);
        let err = hy3_only.resolve(&item).unwrap_err();
        assert!(err.to_string().ends_with("contains no .hy3 file"));
    }
}
