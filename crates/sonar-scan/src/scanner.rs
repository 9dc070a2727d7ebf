//! Single-repository scanner.
//!
//! A scan walks one repository, builds an extension histogram, counts lines,
//! feeds manifests to the [`FrameworkDetector`] and classifies the result. It
//! has no side effects and shares no mutable state, so scans run in
//! parallel freely.

use crate::classify::{classify, RepositoryProfile};
use crate::discover::repository_name;
use crate::filters::IgnoreRules;
use crate::{Result, ScanError};
use chrono::Utc;
use ignore::WalkBuilder;
use sonar_core::{AnalysisStatus, RepositoryRecord, NO_EXTENSION, OTHERS_BUCKET};
use sonar_detect::FrameworkDetector;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// Default cap on files examined per repository
pub const DEFAULT_MAX_FILES: usize = 5000;

/// Default ceiling for files read for line counting or detection (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default depth below the repository root at which manifests are examined
pub const DEFAULT_MANIFEST_DEPTH: usize = 6;

/// Extensions kept explicitly in the histogram
pub const DEFAULT_TOP_EXTENSIONS: usize = 10;

/// Extensions never line-counted.
const BINARY_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".webp", ".tiff", ".psd", ".pdf", ".doc",
    ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".gz", ".tgz", ".bz2", ".xz", ".7z",
    ".rar", ".tar", ".jar", ".war", ".ear", ".class", ".dll", ".exe", ".so", ".dylib", ".a",
    ".o", ".obj", ".lib", ".pdb", ".bin", ".dat", ".db", ".sqlite", ".mp3", ".mp4", ".wav",
    ".avi", ".mov", ".woff", ".woff2", ".ttf", ".otf", ".eot", ".pyc", ".wasm", ".nupkg",
];

/// Root-level directories that count as configuration.
const CONFIG_DIRS: &[&str] = &[
    ".github/workflows",
    ".circleci",
    "k8s",
    "kubernetes",
    "helm",
    "terraform",
    "deploy",
];

/// Resource limits and tuning for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_files: usize,
    pub max_file_size: u64,
    pub manifest_depth: usize,
    pub top_extensions: usize,
    pub ignore: IgnoreRules,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            manifest_depth: DEFAULT_MANIFEST_DEPTH,
            top_extensions: DEFAULT_TOP_EXTENSIONS,
            ignore: IgnoreRules::default(),
        }
    }
}

/// Walks one repository and produces its metadata record.
#[derive(Debug, Clone)]
pub struct RepositoryScanner {
    options: ScanOptions,
    detector: Arc<FrameworkDetector>,
}

/// Running totals for one walk.
#[derive(Debug, Default)]
struct Tally {
    extension_counts: BTreeMap<String, u64>,
    total_files: u64,
    total_lines: u64,
    undecodable: u64,
    unreadable: u64,
    truncated: bool,
    has_readme: bool,
    frameworks: BTreeSet<String>,
    config_files: Vec<String>,
}

impl RepositoryScanner {
    pub fn new(options: ScanOptions, detector: Arc<FrameworkDetector>) -> Self {
        Self { options, detector }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn detector(&self) -> &FrameworkDetector {
        &self.detector
    }

    /// Scan `repo_path`, recording its path relative to `repos_root`.
    ///
    /// Unreadable entries inside the repository are skipped and noted as a
    /// caveat. Only a missing or unreadable repository root is an error.
    pub fn scan(&self, repos_root: &Path, repo_path: &Path) -> Result<RepositoryRecord> {
        check_root(repo_path)?;

        let name = repository_name(repo_path);
        let relative = repo_path
            .strip_prefix(repos_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| repo_path.to_path_buf());

        let mut tally = self.walk(repo_path);
        self.collect_config_dirs(repo_path, &mut tally);

        let classification = classify(&RepositoryProfile {
            extension_counts: &tally.extension_counts,
            total_files: tally.total_files,
            config_files: &tally.config_files,
            frameworks: &tally.frameworks,
            has_readme: tally.has_readme,
        });

        let mut record = RepositoryRecord::new(name, relative);
        record.file_extension_counts = fold_histogram(
            &tally.extension_counts,
            tally.undecodable,
            self.options.top_extensions,
        );
        record.total_files = tally.total_files;
        record.total_lines = tally.total_lines;
        record.has_readme = tally.has_readme;
        record.repository_type = classification.repository_type;
        record.analysis_confidence = classification.confidence;
        record.analysis_status = AnalysisStatus::Analyzed;
        record.scan_caveats = self.caveats(&tally);
        record.detected_frameworks = tally.frameworks;
        record.config_files = tally.config_files;
        record.last_analyzed = Some(Utc::now());

        tracing::debug!(
            repository = %record.name,
            files = record.total_files,
            lines = record.total_lines,
            frameworks = record.detected_frameworks.len(),
            repository_type = %record.repository_type,
            "Scanned repository"
        );

        Ok(record)
    }

    fn walk(&self, repo_path: &Path) -> Tally {
        let mut tally = Tally::default();
        let ignore_rules = self.options.ignore.clone();
        let walk_root = repo_path.to_path_buf();

        let mut walker = WalkBuilder::new(repo_path);
        walker
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let relative = entry.path().strip_prefix(&walk_root).unwrap_or(entry.path());
                !ignore_rules.skip_dir(&entry.file_name().to_string_lossy(), relative)
            });

        for result in walker.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::debug!(%error, "Skipping unreadable entry");
                    tally.unreadable += 1;
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(repo_path).unwrap_or(path);
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if self.options.ignore.skip_file(&file_name, relative) {
                continue;
            }

            if tally.total_files as usize >= self.options.max_files {
                tracing::debug!(
                    repository = %repo_path.display(),
                    max_files = self.options.max_files,
                    "File cap reached, truncating scan"
                );
                tally.truncated = true;
                break;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(error) => {
                    tracing::debug!(path = %path.display(), %error, "Skipping unreadable file");
                    tally.unreadable += 1;
                    continue;
                }
            };

            self.visit_file(path, relative, &file_name, entry.depth(), size, &mut tally);
        }

        tally
    }

    fn visit_file(
        &self,
        path: &Path,
        relative: &Path,
        file_name: &str,
        depth: usize,
        size: u64,
        tally: &mut Tally,
    ) {
        let extension = extension_key(path);
        tally.total_files += 1;

        if depth == 1 && file_name.to_uppercase().starts_with("README") {
            tally.has_readme = true;
        }

        let is_manifest = depth <= self.options.manifest_depth && self.detector.is_manifest(file_name);
        let countable = !BINARY_EXTENSIONS.contains(&extension.as_str());
        let within_limit = size <= self.options.max_file_size;

        let mut text = None;
        if within_limit && (countable || is_manifest) {
            match std::fs::read(path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(decoded) => text = Some(decoded),
                    Err(_) => {
                        tally.undecodable += 1;
                        if is_manifest {
                            tracing::debug!(path = %path.display(), "Manifest is not valid UTF-8");
                        }
                        return;
                    }
                },
                Err(error) => {
                    tracing::debug!(path = %path.display(), %error, "Skipping unreadable file");
                    tally.unreadable += 1;
                }
            }
        }

        *tally.extension_counts.entry(extension).or_insert(0) += 1;

        if let Some(text) = &text {
            if countable {
                tally.total_lines += count_lines(text.as_bytes());
            }
        }

        if is_manifest {
            // Oversized manifests still trigger presence rules
            let contents = text.as_deref().unwrap_or("");
            tally.frameworks.extend(self.detector.detect(file_name, contents));
            tally.config_files.push(slash_path(relative));
        }
    }

    fn collect_config_dirs(&self, repo_path: &Path, tally: &mut Tally) {
        for dir in CONFIG_DIRS {
            if repo_path.join(dir).is_dir() {
                let entry = format!("{}/", dir);
                if !tally.config_files.contains(&entry) {
                    tally.config_files.push(entry);
                }
            }
        }
        tally.config_files.sort();
    }

    fn caveats(&self, tally: &Tally) -> Vec<String> {
        let mut caveats = Vec::new();
        if tally.truncated {
            caveats.push(format!(
                "File limit of {} reached; scan truncated",
                self.options.max_files
            ));
        }
        if tally.unreadable > 0 {
            caveats.push(format!(
                "{} entries could not be read and were skipped",
                tally.unreadable
            ));
        }
        if tally.undecodable > 0 {
            caveats.push(format!(
                "{} files could not be decoded as UTF-8 and were counted under \"{}\"",
                tally.undecodable, OTHERS_BUCKET
            ));
        }
        caveats
    }
}

fn check_root(repo_path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(repo_path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::RootMissing(repo_path.to_path_buf()));
        }
        Err(source) => {
            return Err(ScanError::RootUnreadable {
                path: repo_path.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(repo_path.to_path_buf()));
    }

    std::fs::read_dir(repo_path).map_err(|source| ScanError::RootUnreadable {
        path: repo_path.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// Histogram key for a file: lowercase extension with the dot, or `(none)`.
pub fn extension_key(path: &Path) -> String {
    match path.extension() {
        Some(ext) if !ext.is_empty() => format!(".{}", ext.to_string_lossy().to_lowercase()),
        _ => NO_EXTENSION.to_string(),
    }
}

/// Line terminators plus a trailing unterminated line.
pub fn count_lines(bytes: &[u8]) -> u64 {
    let terminators = bytes.iter().filter(|b| **b == b'\n').count() as u64;
    match bytes.last() {
        Some(b'\n') | None => terminators,
        Some(_) => terminators + 1,
    }
}

/// Keep the `top` most frequent extensions, folding the rest (and files
/// that failed to decode) into the `others` bucket. Ties break by key.
pub fn fold_histogram(
    counts: &BTreeMap<String, u64>,
    undecodable: u64,
    top: usize,
) -> BTreeMap<String, u64> {
    let mut ranked: Vec<(&String, u64)> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(ext, count)| (ext, *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut folded = BTreeMap::new();
    let mut others = undecodable;
    for (index, (ext, count)) in ranked.into_iter().enumerate() {
        if index < top {
            folded.insert(ext.clone(), count);
        } else {
            others += count;
        }
    }
    if others > 0 {
        *folded.entry(OTHERS_BUCKET.to_string()).or_insert(0) += others;
    }
    folded
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
