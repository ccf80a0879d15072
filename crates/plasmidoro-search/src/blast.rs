//! BLAST+ invocation.

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use plasmidoro_core::search::{DatabaseKind, SanitizedQuery, SearchParams, SearchTool};
use tracing::debug;

use crate::{Result, SearchError};

/// Queries shorter than this use the `blastn` task instead of megablast.
pub const SHORT_QUERY: usize = 30;

/// Locations of the prebuilt databases and, optionally, of the binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlastDatabases {
    pub nucleotide: PathBuf,
    pub protein: PathBuf,
    pub bin_dir: Option<PathBuf>,
}

impl BlastDatabases {
    pub fn path(&self, kind: DatabaseKind) -> &Path {
        match kind {
            DatabaseKind::Nucleotide => &self.nucleotide,
            DatabaseKind::Protein => &self.protein,
        }
    }

    pub fn program(&self, tool: SearchTool) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(tool.as_str()),
            None => PathBuf::from(tool.as_str()),
        }
    }
}

/// A fully specified search: program, arguments and the FASTA fed to stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: SearchTool,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdin: String,
}

impl Invocation {
    pub fn new(params: &SearchParams, query: &SanitizedQuery, dbs: &BlastDatabases) -> Self {
        let tool = params.tool;
        let mut args = vec![
            "-db".to_string(),
            dbs.path(tool.database()).display().to_string(),
            "-max_target_seqs".to_string(),
            params.hit_cap.to_string(),
            "-evalue".to_string(),
            params.evalue.clone(),
        ];
        let extra: &[&str] = match tool {
            SearchTool::Blastn => &["-dust", "no", "-soft_masking", "false"],
            SearchTool::Blastp => &["-matrix", "PAM30"],
            SearchTool::Tblastn => &["-soft_masking", "false"],
        };
        args.extend(extra.iter().map(|s| s.to_string()));
        args.extend(["-outfmt".to_string(), "6".to_string()]);
        if tool == SearchTool::Blastn && query.sequence.len() < SHORT_QUERY {
            args.extend(["-task".to_string(), "blastn".to_string()]);
        }

        Self {
            tool,
            program: dbs.program(tool),
            args,
            stdin: format!(">{}\n{}", query.id, query.sequence),
        }
    }
}

/// Runs a search and returns its tabular output.
pub trait SearchRunner {
    fn run(&self, invocation: &Invocation) -> Result<String>;
}

/// Runs the BLAST+ binaries as blocking subprocesses.
///
/// The query is fed from a separate thread so a tool that exits without
/// reading it is still waited for and reported by its exit status.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlastRunner;

impl SearchRunner for BlastRunner {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        debug!("{} {}", invocation.program.display(), invocation.args.join(" "));
        let tool_error = |message: String| SearchError::Tool {
            tool: invocation.tool,
            message,
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tool_error(e.to_string()))?;

        let writer = child.stdin.take().map(|mut stdin| {
            let query = invocation.stdin.clone();
            thread::spawn(move || stdin.write_all(query.as_bytes()))
        });
        let output = child.wait_with_output()?;
        let written = match writer {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("query writer panicked"))),
            None => Ok(()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(tool_error(if stderr.is_empty() {
                "Execution error".to_string()
            } else {
                stderr
            }));
        }
        match written {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {}
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dbs() -> BlastDatabases {
        BlastDatabases {
            nucleotide: PathBuf::from("blast/nucleotide"),
            protein: PathBuf::from("blast/protein"),
            bin_dir: None,
        }
    }

    fn query(sequence: &str) -> SanitizedQuery {
        SanitizedQuery {
            id: "q1".to_string(),
            sequence: sequence.to_string(),
        }
    }

    fn params(tool: SearchTool) -> SearchParams {
        SearchParams {
            tool,
            ..SearchParams::from_query("")
        }
    }

    #[test]
    fn test_blastn_short_query_uses_blastn_task() {
        let inv = Invocation::new(&params(SearchTool::Blastn), &query("ACGTACGT"), &dbs());
        assert_eq!(inv.program, PathBuf::from("blastn"));
        assert_eq!(
            inv.args,
            vec![
                "-db", "blast/nucleotide", "-max_target_seqs", "100", "-evalue", "0.0001",
                "-dust", "no", "-soft_masking", "false", "-outfmt", "6", "-task", "blastn",
            ]
        );
        assert_eq!(inv.stdin, ">q1\nACGTACGT");
    }

    #[test]
    fn test_blastn_long_query_uses_default_task() {
        let long = "A".repeat(SHORT_QUERY);
        let inv = Invocation::new(&params(SearchTool::Blastn), &query(&long), &dbs());
        assert!(!inv.args.contains(&"-task".to_string()));
    }

    #[test]
    fn test_protein_tools() {
        let inv = Invocation::new(&params(SearchTool::Blastp), &query("MKV"), &dbs());
        assert_eq!(inv.args[1], "blast/protein");
        assert!(inv.args.windows(2).any(|w| w == ["-matrix", "PAM30"]));

        let mut dbs = dbs();
        dbs.bin_dir = Some(PathBuf::from("/opt/blast/bin"));
        let inv = Invocation::new(&params(SearchTool::Tblastn), &query("MKV"), &dbs);
        assert_eq!(inv.program, PathBuf::from("/opt/blast/bin/tblastn"));
        assert_eq!(inv.args[1], "blast/nucleotide");
        assert!(inv.args.windows(2).any(|w| w == ["-soft_masking", "false"]));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, tool: SearchTool, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(tool.as_str());
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool_reports_stderr_for_large_query() {
        let bin = tempfile::tempdir().unwrap();
        fake_tool(
            bin.path(),
            SearchTool::Blastp,
            "echo 'BLAST Database error: No alias or index file found' >&2\nexit 2",
        );
        let mut dbs = dbs();
        dbs.bin_dir = Some(bin.path().to_path_buf());
        let large = query(&"M".repeat(2_000_000));
        let inv = Invocation::new(&params(SearchTool::Blastp), &large, &dbs);

        match BlastRunner.run(&inv) {
            Err(SearchError::Tool { tool, message }) => {
                assert_eq!(tool, SearchTool::Blastp);
                assert_eq!(message, "BLAST Database error: No alias or index file found");
            }
            other => panic!("expected a tool error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_binary_is_a_tool_error() {
        let mut dbs = dbs();
        dbs.bin_dir = Some(PathBuf::from("/nonexistent/plasmidoro/bin"));
        let inv = Invocation::new(&params(SearchTool::Blastp), &query("MKV"), &dbs);
        assert!(matches!(
            BlastRunner.run(&inv),
            Err(SearchError::Tool { tool: SearchTool::Blastp, .. })
        ));
    }
}
