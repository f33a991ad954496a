//! Indexing a source tree from the command line: walk, extract in parallel,
//! feed the single-writer index serially, then merge.

use crate::extract::{ExtractedFile, SourceExtractor};
use crate::index::facade::Index;
use crate::index::merge::MergeSummary;
use crate::utils::progress;
use crate::utils::{get_index_file, remove_index, AppConfig, IndexMeta};
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// What one `index` run did
#[derive(Debug, Default)]
pub struct IndexReport {
    pub root: PathBuf,
    pub index_file: PathBuf,
    pub indexed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub merge: Option<MergeSummary>,
    pub recovered: bool,
}

/// A file found by the walker
struct Candidate {
    full_path: PathBuf,
    rel_path: String,
    mtime: u64,
}

/// Open the index for `root`, creating it if needed
pub fn open_index(root: &Path, config: &AppConfig) -> Result<Index> {
    let index_file = get_index_file(root)?;
    let index = Index::open(&index_file, config.index.clone())
        .with_context(|| format!("Failed to open index at {}", index_file.display()))?;
    if let Some(event) = index.recovery() {
        eprintln!(
            "warning: index at {} was corrupt and has been reset ({})",
            event.path.display(),
            event.reason
        );
    }
    Ok(index)
}

/// Index (or re-index) every changed file under `root`
pub fn build_index(root_path: &Path, config: &AppConfig, force: bool, quiet: bool) -> Result<IndexReport> {
    let root = root_path.canonicalize().context("Invalid path")?;
    if force {
        remove_index(&root).context("Failed to remove existing index")?;
    }

    let mut meta = IndexMeta::load(&root)?.unwrap_or_else(|| IndexMeta::new(&root));
    let mut index = open_index(&root, config)?;
    let mut report = IndexReport {
        root: root.clone(),
        index_file: index.index_file().to_path_buf(),
        recovered: index.recovery().is_some(),
        ..IndexReport::default()
    };
    // A reset index holds none of the files meta.json remembers
    if report.recovered {
        meta.files.clear();
    }

    if !quiet {
        println!("Indexing: {}", root.display());
    }

    let discover = progress::spinner("Discovering files...", quiet);
    let candidates = discover_files(&root, config);
    if let Some(spinner) = discover {
        spinner.finish_with_message(format!("Found {} files", candidates.len()));
    }

    // Files the index will hold after this run, with their mtimes
    let mut current: BTreeMap<String, u64> = BTreeMap::new();
    let mut changed = Vec::new();
    for candidate in candidates {
        if meta.files.get(&candidate.rel_path) == Some(&candidate.mtime) {
            current.insert(candidate.rel_path, candidate.mtime);
            report.unchanged += 1;
        } else {
            changed.push(candidate);
        }
    }

    let extractor = SourceExtractor::new()?;
    let errors = AtomicUsize::new(0);
    let pb = progress::bar(changed.len() as u64, "Extracting...", quiet);
    let read = |candidate: &Candidate| -> Option<(ExtractedFile, u64)> {
        let result = read_candidate(candidate, config.max_file_size, &extractor, &errors);
        if let Some(pb) = &pb {
            pb.inc(1);
        }
        result.map(|file| (file, candidate.mtime))
    };
    let extracted: Vec<(ExtractedFile, u64)> = if config.parallel_read {
        changed.par_iter().filter_map(read).collect()
    } else {
        changed.iter().filter_map(read).collect()
    };
    if let Some(pb) = &pb {
        pb.finish_with_message(format!("Extracted {} files", extracted.len()));
    }
    report.errors = errors.load(Ordering::Relaxed);
    report.skipped = changed.len() - extracted.len() - report.errors;

    for (file, mtime) in &extracted {
        index.add_document(&file.path, file)?;
        current.insert(file.path.clone(), *mtime);
        report.indexed += 1;
    }

    // Vanished files, and changed files that no longer extract
    for path in meta.files.keys() {
        if !current.contains_key(path) {
            debug!(path = %path, "dropping file from index");
            index.remove(path);
            report.removed += 1;
        }
    }

    let finalize = progress::spinner("Merging index...", quiet);
    report.merge = index.save()?;
    if let Some(spinner) = finalize {
        spinner.finish_with_message("Index complete");
    }

    meta.files = current;
    meta.save()?;

    if report.errors > 0 {
        warn!(errors = report.errors, "some files could not be read");
    }
    Ok(report)
}

/// Remove individual files (relative to `root`) from its index
pub fn remove_files(root_path: &Path, config: &AppConfig, files: &[String]) -> Result<usize> {
    let root = root_path.canonicalize().context("Invalid path")?;
    let mut meta = IndexMeta::load(&root)?.unwrap_or_else(|| IndexMeta::new(&root));
    let mut index = open_index(&root, config)?;

    let mut removed = 0;
    for file in files {
        let rel = normalize(Path::new(file));
        index.remove(&rel);
        if meta.files.remove(&rel).is_some() {
            removed += 1;
        }
    }

    index.save()?;
    meta.save()?;
    Ok(removed)
}

fn discover_files(root: &Path, config: &AppConfig) -> Vec<Candidate> {
    let ignored = config.ignored_dirs.clone();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            !ignored.iter().any(|d| d.as_str() == name.as_ref())
        })
        .build();

    walker
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| {
            let full_path = entry.path().to_path_buf();
            let rel_path = normalize(full_path.strip_prefix(root).ok()?);
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            Some(Candidate {
                full_path,
                rel_path,
                mtime,
            })
        })
        .collect()
}

fn read_candidate(
    candidate: &Candidate,
    max_file_size: u64,
    extractor: &SourceExtractor,
    errors: &AtomicUsize,
) -> Option<ExtractedFile> {
    let content = match fs::read(&candidate.full_path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %candidate.full_path.display(), error = %e, "unreadable file");
            errors.fetch_add(1, Ordering::Relaxed);
            return None;
        }
    };
    if content.len() as u64 > max_file_size {
        return None;
    }
    extractor.extract_bytes(&candidate.rel_path, &content)
}

/// Relative path with `/` separators, as stored in the index
pub fn normalize(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
