//! Batch import of a directory of plasmid maps.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use plasmidoro_formats::{detect_format_from_extension, entity_name, load};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::reconcile::{reconcile, Outcome};
use crate::table::{import_table_where, TableReport, PLASMIDS};
use crate::workbook::Workbook;
use crate::Result;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TreeReport {
    /// Plasmid names encountered, from sequence files and plasmid tables.
    pub names: Vec<String>,
    pub created: usize,
    pub replaced: usize,
    pub refreshed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub tables: usize,
}

impl TreeReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::FullyReplaced => self.replaced += 1,
            Outcome::FeaturesRefreshed => self.refreshed += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::SkippedNotOverwritable | Outcome::SkippedFormatNotPreferred => {
                self.skipped += 1
            }
        }
    }

    fn push_name(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }
}

fn is_archive(entry: &DirEntry, archive_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| archive_dirs.iter().any(|a| a == name))
}

fn is_table(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Import a workbook found in the tree when its first sheet is keyed like
/// the plasmid table; other workbooks (pool designs and the like) are ignored.
fn import_plasmid_table(
    conn: &Connection,
    path: &Path,
    overwrite: &dyn Fn(&str) -> bool,
) -> Result<Option<TableReport>> {
    let workbook = Workbook::open(path)?;
    let keyed = workbook
        .first()?
        .header()
        .first()
        .is_some_and(|label| label == PLASMIDS.key_label);
    if !keyed {
        return Ok(None);
    }
    import_table_where(conn, &workbook, &PLASMIDS, overwrite).map(Some)
}

/// Path relative to `root` with `/` separators.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `root` in file-name order and reconcile every sequence file with the
/// plasmid named after it. Directories named in `archive_dirs` are skipped
/// with everything below them. A failing file is logged and the walk continues.
///
/// `.xlsx` plasmid tables go through the table importer once every map has
/// been reconciled, so a table row never turns into a placeholder that blocks
/// its map. Rows for plasmids created by this walk are always filled in.
pub fn import_tree(
    conn: &Connection,
    root: &Path,
    overwrite: bool,
    archive_dirs: &[String],
) -> Result<TreeReport> {
    info!("importing plasmid maps from {}", root.display());
    let mut report = TreeReport::default();
    // name -> whether the file that claimed it is annotated
    let mut claimed: HashMap<String, bool> = HashMap::new();
    let mut created: HashSet<String> = HashSet::new();
    let mut tables: Vec<(PathBuf, String)> = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_archive(e, archive_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cannot read directory entry: {}", e);
                report.failed += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = relative_path(root, path);

        if is_table(path) {
            tables.push((path.to_path_buf(), rel));
            continue;
        }

        let (Some(format), Some(name)) = (detect_format_from_extension(&rel), entity_name(&rel))
        else {
            debug!("ignoring {}", rel);
            continue;
        };

        let annotated = format.is_annotated();
        if let Some(&earlier_annotated) = claimed.get(&name) {
            if earlier_annotated || !annotated {
                warn!("{}: {} was already imported from another file in this run", rel, name);
                report.duplicates += 1;
                continue;
            }
        }
        claimed.insert(name.clone(), annotated);
        report.push_name(&name);

        let loaded = match load(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("{}: {}", rel, e);
                report.failed += 1;
                continue;
            }
        };
        match reconcile(conn, &name, &loaded.record, &rel, &loaded.footprint, overwrite) {
            Ok(outcome) => {
                if outcome == Outcome::Created {
                    created.insert(name);
                }
                report.record(outcome)
            }
            Err(e) => {
                warn!("{}: {}", rel, e);
                report.failed += 1;
            }
        }
    }

    let fill_row = |key: &str| overwrite || created.contains(key);
    for (path, rel) in tables {
        match import_plasmid_table(conn, &path, &fill_row) {
            Ok(None) => debug!("{}: not a plasmid table", rel),
            Ok(Some(table)) => {
                report.tables += 1;
                for key in &table.keys {
                    report.push_name(key);
                }
            }
            Err(e) => {
                warn!("{}: {}", rel, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "plasmid maps: {} created, {} replaced, {} refreshed, {} unchanged, {} skipped, {} failed",
        report.created,
        report.replaced,
        report.refreshed,
        report.unchanged,
        report.skipped,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::tests::{write_xlsx, NO_FILLS};
    use plasmidoro_store::inventory::get_text;
    use plasmidoro_store::plasmids::{features_of, get_plasmid_by_name};
    use plasmidoro_store::{open_in_memory, EntityKind};
    use pretty_assertions::assert_eq;
    use std::fs;

    const GB: &str = "LOCUS       pX  12 bp    DNA     circular SYN 01-JAN-2024
FEATURES             Location/Qualifiers
     misc_feature    1..6
                     /label=\"BsmBI site 1\"
ORIGIN
        1 acgtacgtac gt
//
";

    fn archives() -> Vec<String> {
        vec!["Archive".to_string(), "old".to_string()]
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/data/maps");
        assert_eq!(relative_path(root, &root.join("a").join("p.gb")), "a/p.gb");
    }

    #[test]
    fn test_walk_skips_archives_and_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join("Archive")).unwrap();
        fs::create_dir_all(root.join("sub").join("old")).unwrap();
        fs::write(root.join("pA.gb"), GB).unwrap();
        fs::write(root.join("sub").join("pB.fa"), ">pB\nACGT\n").unwrap();
        fs::write(root.join("Archive").join("pC.gb"), GB).unwrap();
        fs::write(root.join("sub").join("old").join("pD.gb"), GB).unwrap();
        fs::write(root.join("notes.txt"), "hello").unwrap();
        fs::write(root.join("broken.gb"), "not genbank").unwrap();

        let conn = open_in_memory().unwrap();
        let report = import_tree(&conn, root, false, &archives()).unwrap();

        assert_eq!(report.names, vec!["broken", "pA", "pB"]);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert!(get_plasmid_by_name(&conn, "pC").unwrap().is_none());

        let pb = get_plasmid_by_name(&conn, "pB").unwrap().unwrap();
        assert_eq!(pb.sequence_file, "sub/pB.fa");
        assert_eq!(pb.sequence, "ACGT");
    }

    #[test]
    fn test_second_run_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pA.gb"), GB).unwrap();
        fs::write(dir.path().join("pB.fa"), ">pB\nACGT\n").unwrap();

        let conn = open_in_memory().unwrap();
        import_tree(&conn, dir.path(), true, &archives()).unwrap();
        let pa = get_plasmid_by_name(&conn, "pA").unwrap().unwrap();
        let before = features_of(&conn, pa.id).unwrap();

        let report = import_tree(&conn, dir.path(), true, &archives()).unwrap();
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.created + report.replaced + report.refreshed, 0);
        assert_eq!(features_of(&conn, pa.id).unwrap(), before);
    }

    #[test]
    fn test_duplicate_name_prefers_annotated_file() {
        let dir = tempfile::tempdir().unwrap();
        // pA.fa sorts before pA.gb
        fs::write(dir.path().join("pA.fa"), ">pA\nGGGG\n").unwrap();
        fs::write(dir.path().join("pA.gb"), GB).unwrap();
        fs::write(dir.path().join("pA.gbk"), GB).unwrap();

        let conn = open_in_memory().unwrap();
        let report = import_tree(&conn, dir.path(), true, &archives()).unwrap();
        assert_eq!(report.names, vec!["pA"]);
        assert_eq!(report.created, 1);
        assert_eq!(report.replaced, 1);
        assert_eq!(report.duplicates, 1);

        let pa = get_plasmid_by_name(&conn, "pA").unwrap().unwrap();
        assert_eq!(pa.sequence_file, "pA.gb");
        assert_eq!(pa.sequence, "ACGTACGTACGT");
    }

    #[test]
    fn test_table_in_tree_does_not_block_maps() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        // "All_plasmids.xlsx" sorts before the map files
        let table: &[&[&str]] = &[&["Name", "AMD number"], &["pA", "AMD001"], &["pZ", "AMD026"]];
        write_xlsx(&root.join("All_plasmids.xlsx"), &[("Plasmids", table, NO_FILLS)]);
        let pools: &[&[&str]] = &[&["Magic pool", "Plasmid"], &["MP1", "pA"]];
        write_xlsx(&root.join("Magic_Pool_Summary_Sheet.xlsx"), &[("Summary", pools, NO_FILLS)]);
        fs::write(root.join("pA.gb"), GB).unwrap();

        let conn = open_in_memory().unwrap();
        let report = import_tree(&conn, root, false, &archives()).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.tables, 1);
        assert_eq!(report.names, vec!["pA", "pZ"]);

        let pa = get_plasmid_by_name(&conn, "pA").unwrap().unwrap();
        assert_eq!(pa.sequence_file, "pA.gb");
        assert_eq!(pa.sequence, "ACGTACGTACGT");
        assert_eq!(
            get_text(&conn, EntityKind::Plasmid, pa.id, "amd_number").unwrap().as_deref(),
            Some("AMD001")
        );
        let pz = get_plasmid_by_name(&conn, "pZ").unwrap().unwrap();
        assert_eq!(pz.sequence_file, "");

        // Rows of plasmids that already existed still need overwriting
        let table: &[&[&str]] = &[&["Name", "AMD number"], &["pA", "AMD002"]];
        write_xlsx(&root.join("All_plasmids.xlsx"), &[("Plasmids", table, NO_FILLS)]);
        import_tree(&conn, root, false, &archives()).unwrap();
        assert_eq!(
            get_text(&conn, EntityKind::Plasmid, pa.id, "amd_number").unwrap().as_deref(),
            Some("AMD001")
        );
    }
}
