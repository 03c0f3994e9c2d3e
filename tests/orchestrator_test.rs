use drive_catalogue::category::Category;
use drive_catalogue::error::{CatalogueError, Result};
use drive_catalogue::history::{DRIVES_RELATION, SCANS_RELATION};
use drive_catalogue::orchestrator::{DriveScanOrchestrator, ScanOptions};
use drive_catalogue::scanner::ScanInvoker;
use drive_catalogue::store::CatalogueStore;
use polars::prelude::*;
use std::cell::RefCell;
use std::fs;
use std::path::Path;

/// Records invocations and fabricates batch CSVs the way the container
/// extraction scripts would.
struct MockScanner {
    scan_root: String,
    calls: RefCell<Vec<&'static str>>,
    fail_files: bool,
}

impl MockScanner {
    fn new(scan_root: &str) -> Self {
        Self {
            scan_root: scan_root.to_string(),
            calls: RefCell::new(Vec::new()),
            fail_files: false,
        }
    }

    fn failing(scan_root: &str) -> Self {
        Self {
            fail_files: true,
            ..Self::new(scan_root)
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn write_from_list(&self, list: &Path, out: &Path) -> Result<()> {
        let mut body = String::from("SourceFile,FileSize#\n");
        for line in fs::read_to_string(list)?.lines() {
            body.push_str(&format!("{line},1\n"));
        }
        fs::write(out, body)?;
        Ok(())
    }
}

impl ScanInvoker for MockScanner {
    fn scan_files(&self, _drive_path: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.calls.borrow_mut().push("scan_files");
        if self.fail_files {
            return Err(CatalogueError::Scan("simulated scanner failure".into()));
        }
        let root = &self.scan_root;
        fs::write(
            outdir.join("files_2024-01-01.csv"),
            format!(
                "SourceFile,FileSize#\n\
                 {root}/{label}/a.jpg,123\n\
                 {root}/{label}/v/b.mov,456\n\
                 {root}/{label}/doc.txt,7\n"
            ),
        )?;
        Ok(())
    }

    fn scan_photos(&self, _drive_path: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.calls.borrow_mut().push("scan_photos");
        let root = &self.scan_root;
        fs::write(
            outdir.join("photos_2024-01-01.csv"),
            format!("SourceFile,FileSize#\n{root}/{label}/a.jpg,123\n"),
        )?;
        Ok(())
    }

    fn scan_videos(&self, _drive_path: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.calls.borrow_mut().push("scan_videos");
        let root = &self.scan_root;
        fs::write(
            outdir.join("videos_2024-01-01.csv"),
            format!("SourceFile,FileSize#\n{root}/{label}/v/b.mov,456\n"),
        )?;
        Ok(())
    }

    fn extract_photos_from_list(&self, list: &Path, _label: &str, outdir: &Path) -> Result<()> {
        self.calls.borrow_mut().push("extract_photos_from_list");
        self.write_from_list(list, &outdir.join("photos_2024-01-01.csv"))
    }

    fn extract_videos_from_list(&self, list: &Path, _label: &str, outdir: &Path) -> Result<()> {
        self.calls.borrow_mut().push("extract_videos_from_list");
        self.write_from_list(list, &outdir.join("videos_2024-01-01.csv"))
    }
}

struct Fixture {
    _store_dir: tempfile::TempDir,
    _out_dir: tempfile::TempDir,
    _mount_dir: tempfile::TempDir,
    options: ScanOptions,
}

/// A manifest with one drive, a mounted drive directory under a temp scan
/// root, and empty store/output directories.
fn fixture(label: &str) -> Fixture {
    let store_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let mount_dir = tempfile::tempdir().unwrap();
    let scan_root = mount_dir.path().display().to_string();
    fs::create_dir_all(mount_dir.path().join(label)).unwrap();

    let manifest_path = store_dir.path().join("drive_manifest.csv");
    fs::write(
        &manifest_path,
        format!("drive_label,platform_mount,volume_uuid,serial_number,notes\n{label},,,,\n"),
    )
    .unwrap();

    let options = ScanOptions {
        store_dir: store_dir.path().join("catalogue"),
        manifest_path,
        outdir: out_dir.path().to_path_buf(),
        scan_root,
        force: false,
    };
    Fixture {
        _store_dir: store_dir,
        _out_dir: out_dir,
        _mount_dir: mount_dir,
        options,
    }
}

fn seed_drive_rows(store_dir: &Path, scan_root: &str, label: &str, categories: &[Category]) {
    let store = CatalogueStore::open(store_dir).unwrap();
    for category in categories {
        let mut raw = df![
            "SourceFile" => [format!("{scan_root}/{label}/seeded.bin")],
            "FileSize#" => [1i64],
        ]
        .unwrap();
        store.write_relation(category.raw_relation(), &mut raw).unwrap();
    }
}

fn history_statuses(store_dir: &Path) -> Vec<String> {
    let store = CatalogueStore::open(store_dir).unwrap();
    let history = store.read_relation(SCANS_RELATION).unwrap().unwrap();
    history
        .column("status")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_full_run_scans_ingests_and_records() {
    let fx = fixture("D1");
    let scanner = MockScanner::new(&fx.options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, fx.options.clone());

    let outcome = orchestrator.run("D1").unwrap();
    assert_eq!(outcome.status.as_str(), "ok");
    assert_eq!(
        outcome.scanned,
        vec![Category::Files, Category::Photos, Category::Videos]
    );

    let store = CatalogueStore::open(&fx.options.store_dir).unwrap();
    assert_eq!(store.read_relation("files_raw").unwrap().unwrap().height(), 3);
    assert_eq!(store.read_relation("photos_raw").unwrap().unwrap().height(), 1);
    assert_eq!(store.read_relation("videos_raw").unwrap().unwrap().height(), 1);
    assert_eq!(store.read_relation(DRIVES_RELATION).unwrap().unwrap().height(), 1);
    assert_eq!(history_statuses(&fx.options.store_dir), vec!["ok"]);
}

#[test]
fn test_media_scans_narrowed_by_files_scan() {
    let fx = fixture("D1");
    let scanner = MockScanner::new(&fx.options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, fx.options.clone());
    orchestrator.run("D1").unwrap();

    let calls = orchestrator_calls(&orchestrator);
    assert_eq!(
        calls,
        vec!["scan_files", "extract_photos_from_list", "extract_videos_from_list"]
    );
}

fn orchestrator_calls(orchestrator: &DriveScanOrchestrator<MockScanner>) -> Vec<&'static str> {
    orchestrator.scanner_ref().calls()
}

#[test]
fn test_skip_when_all_categories_indexed() {
    let fx = fixture("D1");
    seed_drive_rows(
        &fx.options.store_dir,
        &fx.options.scan_root,
        "D1",
        &Category::ALL,
    );

    let scanner = MockScanner::new(&fx.options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, fx.options.clone());
    let outcome = orchestrator.run("D1").unwrap();

    assert_eq!(outcome.status.as_str(), "skipped");
    assert!(outcome.scanned.is_empty());
    assert!(orchestrator_calls(&orchestrator).is_empty());
    assert_eq!(history_statuses(&fx.options.store_dir), vec!["skipped"]);
    let store = CatalogueStore::open(&fx.options.store_dir).unwrap();
    assert_eq!(store.read_relation(DRIVES_RELATION).unwrap().unwrap().height(), 1);
}

#[test]
fn test_partial_index_scans_only_missing_categories() {
    let fx = fixture("D1");
    seed_drive_rows(
        &fx.options.store_dir,
        &fx.options.scan_root,
        "D1",
        &[Category::Photos],
    );

    let scanner = MockScanner::new(&fx.options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, fx.options.clone());
    let outcome = orchestrator.run("D1").unwrap();

    assert_eq!(outcome.status.as_str(), "ok");
    assert_eq!(outcome.scanned, vec![Category::Files, Category::Videos]);
    let calls = orchestrator_calls(&orchestrator);
    assert!(calls.contains(&"scan_files"));
    assert!(calls.contains(&"extract_videos_from_list"));
    assert!(!calls.contains(&"scan_photos"));
    assert!(!calls.contains(&"extract_photos_from_list"));
}

#[test]
fn test_force_rescans_everything() {
    let fx = fixture("D1");
    seed_drive_rows(
        &fx.options.store_dir,
        &fx.options.scan_root,
        "D1",
        &Category::ALL,
    );

    let mut options = fx.options.clone();
    options.force = true;
    let scanner = MockScanner::new(&options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, options.clone());
    let outcome = orchestrator.run("D1").unwrap();

    assert_eq!(outcome.status.as_str(), "ok");
    assert_eq!(outcome.scanned.len(), 3);
    assert!(!orchestrator_calls(&orchestrator).is_empty());
    assert_eq!(history_statuses(&options.store_dir), vec!["ok"]);
}

#[test]
fn test_scan_failure_recorded_and_propagated() {
    let fx = fixture("D1");
    let scanner = MockScanner::failing(&fx.options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, fx.options.clone());

    let err = orchestrator.run("D1").unwrap_err();
    assert!(matches!(err, CatalogueError::Scan(_)));

    // Best-effort bookkeeping still landed.
    assert_eq!(history_statuses(&fx.options.store_dir), vec!["failed"]);
    let store = CatalogueStore::open(&fx.options.store_dir).unwrap();
    assert_eq!(store.read_relation(DRIVES_RELATION).unwrap().unwrap().height(), 1);
    // Nothing was ingested.
    assert!(store.read_relation("files_raw").unwrap().is_none());
}

#[test]
fn test_unknown_drive_label_is_fatal() {
    let fx = fixture("D1");
    let scanner = MockScanner::new(&fx.options.scan_root);
    let orchestrator = DriveScanOrchestrator::new(scanner, fx.options.clone());
    let err = orchestrator.run("D9").unwrap_err();
    assert!(matches!(err, CatalogueError::Manifest(_)));
    // No bookkeeping for a drive the manifest does not know.
    let store = CatalogueStore::open(&fx.options.store_dir).unwrap();
    assert!(store.read_relation(SCANS_RELATION).unwrap().is_none());
}
