//! Bounded worker pool fanning repository scans out in parallel.
//!
//! Workers pull paths from a shared queue and run each scan on tokio's
//! blocking pool. Results flow back over a channel in completion order and
//! are re-associated with their repository name. A failed or panicking scan
//! only affects its own outcome.

use crate::discover::repository_name;
use crate::scanner::RepositoryScanner;
use crate::ScanError;
use parking_lot::Mutex;
use sonar_core::RepositoryRecord;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Default number of concurrent scans
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on concurrent scans
pub const MAX_WORKERS: usize = 8;

/// One unit of work: scan the repository at `path` under `repos_root`
type ScanFn = dyn Fn(&Path, &Path) -> Result<RepositoryRecord, ScanError> + Send + Sync;

/// Result of scanning one repository
#[derive(Debug)]
pub struct ScanOutcome {
    pub name: String,
    pub path: PathBuf,
    pub result: Result<RepositoryRecord, ScanError>,
}

/// Progress notification sent after every completed scan
#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub completed: usize,
    pub total: usize,
    pub repository: String,
    pub succeeded: bool,
}

/// A failed scan, kept alongside the successes
#[derive(Debug)]
pub struct ScanFailure {
    pub name: String,
    pub path: PathBuf,
    pub error: ScanError,
}

/// Outcome of a whole batch, both lists sorted by repository name
#[derive(Debug, Default)]
pub struct BatchResult {
    pub records: Vec<RepositoryRecord>,
    pub failures: Vec<ScanFailure>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<ScanOutcome>) -> Self {
        let mut batch = BatchResult::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(record) => batch.records.push(record),
                Err(error) => batch.failures.push(ScanFailure {
                    name: outcome.name,
                    path: outcome.path,
                    error,
                }),
            }
        }
        batch.records.sort_by(|a, b| a.name.cmp(&b.name));
        batch.failures.sort_by(|a, b| a.name.cmp(&b.name));
        batch
    }

    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Runs scans over many repositories with bounded concurrency.
#[derive(Debug, Clone)]
pub struct AnalysisCoordinator {
    scanner: Arc<RepositoryScanner>,
    workers: usize,
}

impl AnalysisCoordinator {
    /// `workers` is clamped to `1..=MAX_WORKERS`.
    pub fn new(scanner: Arc<RepositoryScanner>, workers: usize) -> Self {
        Self {
            scanner,
            workers: workers.clamp(1, MAX_WORKERS),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn scanner(&self) -> &RepositoryScanner {
        &self.scanner
    }

    /// Scan every path, calling `progress` after each completion.
    ///
    /// Outcomes arrive in completion order. Dropping the returned future
    /// stops collection; scans already running finish on the blocking pool
    /// and their results are discarded.
    pub async fn analyze_all<F>(
        &self,
        repos_root: &Path,
        paths: Vec<PathBuf>,
        progress: F,
    ) -> Vec<ScanOutcome>
    where
        F: FnMut(&ScanProgress),
    {
        let scanner = Arc::clone(&self.scanner);
        let scan: Arc<ScanFn> = Arc::new(move |root: &Path, path: &Path| scanner.scan(root, path));
        self.run_pool(scan, repos_root, paths, progress).await
    }

    async fn run_pool<F>(
        &self,
        scan: Arc<ScanFn>,
        repos_root: &Path,
        paths: Vec<PathBuf>,
        mut progress: F,
    ) -> Vec<ScanOutcome>
    where
        F: FnMut(&ScanProgress),
    {
        let total = paths.len();
        if total == 0 {
            return Vec::new();
        }

        let started = Instant::now();
        let workers = self.workers.min(total);
        tracing::info!(repositories = total, workers, "Starting repository analysis");

        let queue = Arc::new(Mutex::new(paths.into_iter().collect::<VecDeque<_>>()));
        let (tx, mut rx) = mpsc::channel::<ScanOutcome>(total);
        let repos_root: Arc<Path> = Arc::from(repos_root);

        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let scan = Arc::clone(&scan);
            let repos_root = Arc::clone(&repos_root);

            tokio::spawn(async move {
                loop {
                    let next = queue.lock().pop_front();
                    let Some(path) = next else {
                        break;
                    };
                    let outcome = scan_one(Arc::clone(&scan), Arc::clone(&repos_root), path).await;
                    if tx.send(outcome).await.is_err() {
                        tracing::debug!(worker_id, "Receiver dropped, worker stopping");
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            if let Err(error) = &outcome.result {
                tracing::warn!(repository = %outcome.name, %error, "Repository scan failed");
            }
            progress(&ScanProgress {
                completed: outcomes.len() + 1,
                total,
                repository: outcome.name.clone(),
                succeeded: outcome.result.is_ok(),
            });
            outcomes.push(outcome);
            if outcomes.len() == total {
                break;
            }
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        tracing::info!(
            repositories = outcomes.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Repository analysis finished"
        );

        outcomes
    }

    /// [`analyze_all`](Self::analyze_all) without progress, grouped into
    /// successes and failures.
    pub async fn analyze_batch(&self, repos_root: &Path, paths: Vec<PathBuf>) -> BatchResult {
        BatchResult::from_outcomes(self.analyze_all(repos_root, paths, |_| {}).await)
    }
}

async fn scan_one(scan: Arc<ScanFn>, repos_root: Arc<Path>, path: PathBuf) -> ScanOutcome {
    let name = repository_name(&path);
    let scan_path = path.clone();
    let result = match tokio::task::spawn_blocking(move || scan(&repos_root, &scan_path)).await {
        Ok(result) => result,
        Err(join_error) => Err(ScanError::Aborted {
            name: name.clone(),
            message: join_error.to_string(),
        }),
    };
    ScanOutcome { name, path, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn coordinator(workers: usize) -> AnalysisCoordinator {
        let scanner = Arc::new(RepositoryScanner::new(
            Default::default(),
            Arc::new(sonar_detect::FrameworkDetector::new()),
        ));
        AnalysisCoordinator::new(scanner, workers)
    }

    /// Runs `repositories` slow scans and returns the most that overlapped.
    async fn peak_concurrency(coordinator: &AnalysisCoordinator, repositories: usize) -> usize {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let scan: Arc<ScanFn> = {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            Arc::new(move |_root: &Path, path: &Path| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(25));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(RepositoryRecord::new(repository_name(path), path))
            })
        };

        let paths: Vec<PathBuf> = (0..repositories)
            .map(|i| PathBuf::from(format!("/repos/svc-{}", i)))
            .collect();
        let mut completed = 0;
        let outcomes = coordinator
            .run_pool(scan, Path::new("/repos"), paths, |_| completed += 1)
            .await;

        assert_eq!(outcomes.len(), repositories);
        assert_eq!(completed, repositories);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(running.load(Ordering::SeqCst), 0);
        peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_scans_never_exceed_worker_count() {
        let peak = peak_concurrency(&coordinator(3), 12).await;
        assert!(peak <= 3, "{} scans overlapped with 3 workers", peak);
        assert!(peak >= 2, "scans did not run in parallel");
    }

    #[tokio::test]
    async fn test_clamped_pool_bounds_concurrency() {
        let coordinator = coordinator(64);
        assert_eq!(coordinator.workers(), MAX_WORKERS);
        let peak = peak_concurrency(&coordinator, 20).await;
        assert!(peak <= MAX_WORKERS, "{} scans overlapped", peak);
    }

    #[tokio::test]
    async fn test_single_worker_runs_sequentially() {
        assert_eq!(peak_concurrency(&coordinator(1), 4).await, 1);
    }

    #[test]
    fn test_worker_clamp() {
        let scanner = Arc::new(RepositoryScanner::new(
            Default::default(),
            Arc::new(sonar_detect::FrameworkDetector::new()),
        ));
        assert_eq!(AnalysisCoordinator::new(Arc::clone(&scanner), 0).workers(), 1);
        assert_eq!(AnalysisCoordinator::new(Arc::clone(&scanner), 4).workers(), 4);
        assert_eq!(AnalysisCoordinator::new(scanner, 64).workers(), MAX_WORKERS);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let scanner = Arc::new(RepositoryScanner::new(
            Default::default(),
            Arc::new(sonar_detect::FrameworkDetector::new()),
        ));
        let coordinator = AnalysisCoordinator::new(scanner, DEFAULT_WORKERS);
        let outcomes = coordinator
            .analyze_all(Path::new("/nonexistent"), Vec::new(), |_| panic!("no progress expected"))
            .await;
        assert!(outcomes.is_empty());
    }
}
