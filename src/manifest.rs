//! Drive manifest - read-only CSV describing known removable drives.
//!
//! `platform_mount` may list several `<platform>:<path>` tokens separated by
//! `|` (e.g. `mac:/Volumes/Ext-10 | win:E:\`). Only the mac token is
//! consumed here; the host mount is remapped to the container-visible root
//! by fixed prefix substitution.

use crate::error::{CatalogueError, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const HOST_MOUNT_PREFIX: &str = "/Volumes/";
const CONTAINER_MOUNT_PREFIX: &str = "/host/Volumes/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub drive_label: String,
    pub platform_mount: Option<String>,
    pub volume_uuid: Option<String>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

impl ManifestEntry {
    /// The mac mount path, parsed out of the platform_mount token list.
    pub fn mac_mount(&self) -> Option<String> {
        let tokens = self.platform_mount.as_deref()?;
        for token in tokens.split('|') {
            let token = token.trim();
            if token.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("mac:")) {
                return Some(token[4..].trim().to_string());
            }
        }
        None
    }

    /// Container-visible mount path for this drive, if the manifest knows
    /// its mac mount.
    pub fn container_mount(&self) -> Option<String> {
        self.mac_mount().map(|m| to_container_path(&m))
    }
}

/// Map a host mac path under /Volumes to the container binding.
pub fn to_container_path(mac_path: &str) -> String {
    match mac_path.strip_prefix(HOST_MOUNT_PREFIX) {
        Some(rest) => format!("{CONTAINER_MOUNT_PREFIX}{rest}"),
        None => mac_path.to_string(),
    }
}

#[derive(Debug)]
pub struct DriveManifest {
    entries: HashMap<String, ManifestEntry>,
}

impl DriveManifest {
    /// Load the manifest CSV. A missing file is fatal; the caller has no
    /// sensible fallback without drive mounts.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CatalogueError::NotFound(format!(
                "Manifest not found: {}",
                path.display()
            )));
        }
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let mut entries = HashMap::new();
        for record in reader.deserialize() {
            let entry: ManifestEntry = record?;
            let label = entry.drive_label.trim().to_string();
            if label.is_empty() {
                continue;
            }
            entries.insert(label, entry);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, drive_label: &str) -> Option<&ManifestEntry> {
        self.entries.get(drive_label)
    }

    pub fn lookup(&self, drive_label: &str) -> Result<&ManifestEntry> {
        self.get(drive_label).ok_or_else(|| {
            CatalogueError::Manifest(format!(
                "Drive label not found in manifest: {drive_label}"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "drive_label,platform_mount,volume_uuid,serial_number,notes\n";

    #[test]
    fn test_load_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive_manifest.csv");
        fs::write(
            &path,
            format!("{HEADER}Ext-10,mac:/Volumes/Ext-10 | win:E:\\,uuid-1,SN123,archive\n"),
        )
        .unwrap();

        let manifest = DriveManifest::load(&path).unwrap();
        assert_eq!(manifest.len(), 1);
        let entry = manifest.lookup("Ext-10").unwrap();
        assert_eq!(entry.mac_mount().as_deref(), Some("/Volumes/Ext-10"));
        assert_eq!(
            entry.container_mount().as_deref(),
            Some("/host/Volumes/Ext-10")
        );
        assert_eq!(entry.volume_uuid.as_deref(), Some("uuid-1"));
    }

    #[test]
    fn test_missing_platform_mount() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive_manifest.csv");
        fs::write(&path, format!("{HEADER}Ext-11,,,,\n")).unwrap();

        let manifest = DriveManifest::load(&path).unwrap();
        let entry = manifest.lookup("Ext-11").unwrap();
        assert!(entry.platform_mount.is_none());
        assert!(entry.mac_mount().is_none());
        assert!(entry.container_mount().is_none());
    }

    #[test]
    fn test_non_volumes_path_not_remapped() {
        assert_eq!(to_container_path("/mnt/disk"), "/mnt/disk");
        assert_eq!(to_container_path("/Volumes/X"), "/host/Volumes/X");
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let err =
            DriveManifest::load(Path::new("/unlikely/to/exist/manifest.csv")).unwrap_err();
        assert!(matches!(err, CatalogueError::NotFound(_)));
    }

    #[test]
    fn test_unknown_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive_manifest.csv");
        fs::write(&path, HEADER).unwrap();
        let manifest = DriveManifest::load(&path).unwrap();
        let err = manifest.lookup("Ext-99").unwrap_err();
        assert!(matches!(err, CatalogueError::Manifest(_)));
    }
}
