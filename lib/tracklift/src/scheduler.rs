//! Bounded fan-out/fan-in of acquisitions for one playlist.
//!
//! A fixed pool of worker tasks drains a shared job queue and reports every
//! finished acquisition over a channel. The collecting loop in
//! [`BatchScheduler::run_batch`] is the only code that touches the tally.

use futures::FutureExt;
use shared::download::{AcquisitionOutcome, AcquisitionStatus, PlaylistRunResult};
use shared::playlist::TrackDescriptor;
use std::any::Any;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::worker::AcquisitionWorker;

type JobQueue = Arc<Mutex<VecDeque<(usize, TrackDescriptor)>>>;

#[derive(Clone)]
pub struct BatchScheduler {
    worker: Arc<AcquisitionWorker>,
}

impl BatchScheduler {
    pub fn new(worker: AcquisitionWorker) -> Self {
        Self {
            worker: Arc::new(worker),
        }
    }

    /// Acquires every track into `target_dir` with at most `max_workers` in
    /// flight, returning once all of them have been counted.
    pub async fn run_batch(
        &self,
        playlist_name: &str,
        tracks: &[TrackDescriptor],
        target_dir: &Path,
        max_workers: NonZeroUsize,
    ) -> PlaylistRunResult {
        let total = tracks.len();
        let mut result = PlaylistRunResult::new(playlist_name);
        if total == 0 {
            return result;
        }

        let pool_size = max_workers.get().min(total);
        info!(
            "Found {} tracks. Starting downloads to '{}' using up to {} workers.",
            total,
            target_dir.display(),
            pool_size
        );

        let queue: JobQueue = Arc::new(Mutex::new(tracks.iter().cloned().enumerate().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let target_dir = Arc::new(target_dir.to_path_buf());

        let mut workers = JoinSet::new();
        for worker_id in 0..pool_size {
            workers.spawn(run_worker(
                worker_id,
                Arc::clone(&self.worker),
                Arc::clone(&queue),
                Arc::clone(&target_dir),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut reported = vec![false; total];
        let mut completed = 0;
        while let Some((index, outcome)) = rx.recv().await {
            if std::mem::replace(&mut reported[index], true) {
                warn!("Ignoring duplicate result for job {}", index);
                continue;
            }
            completed += 1;
            record(&mut result, outcome);
            info!(
                "Progress: {}/{} tasks processed. (Succeeded: {}, Failed: {})",
                completed, total, result.succeeded, result.failed
            );
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Download worker for '{}' ended abnormally: {}", playlist_name, e);
            }
        }

        // A worker that died mid-job never reported; count its track as failed.
        for (index, seen) in reported.iter().enumerate() {
            if !seen {
                record(
                    &mut result,
                    AcquisitionOutcome {
                        descriptor: tracks[index].clone(),
                        status: AcquisitionStatus::Failed("worker exited before reporting".into()),
                    },
                );
            }
        }

        result
    }
}

async fn run_worker(
    worker_id: usize,
    worker: Arc<AcquisitionWorker>,
    queue: JobQueue,
    target_dir: Arc<PathBuf>,
    tx: mpsc::UnboundedSender<(usize, AcquisitionOutcome)>,
) {
    loop {
        let job = queue.lock().await.pop_front();
        let Some((index, track)) = job else {
            break;
        };

        let acquired = AssertUnwindSafe(worker.acquire(&track, &target_dir))
            .catch_unwind()
            .await;
        let outcome = match acquired {
            Ok(outcome) => outcome,
            Err(panic) => AcquisitionOutcome {
                status: AcquisitionStatus::Failed(format!(
                    "acquisition panicked: {}",
                    panic_message(panic.as_ref())
                )),
                descriptor: track,
            },
        };

        if tx.send((index, outcome)).is_err() {
            break;
        }
    }
    debug!("Download worker {} finished", worker_id);
}

fn record(result: &mut PlaylistRunResult, outcome: AcquisitionOutcome) {
    let AcquisitionOutcome { descriptor, status } = outcome;
    match status {
        AcquisitionStatus::Failed(reason) => {
            warn!(
                "Download FAILED for track: {} (Playlist: {}): {}",
                descriptor.display_name(),
                result.playlist_name,
                reason
            );
            result.failed += 1;
            result.failed_descriptors.push(descriptor);
        }
        AcquisitionStatus::Downloaded | AcquisitionStatus::Skipped => result.succeeded += 1,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{track, FakeFetcher};
    use std::time::Duration;

    fn scheduler(fetcher: &FakeFetcher) -> BatchScheduler {
        BatchScheduler::new(AcquisitionWorker::new(Arc::new(fetcher.clone())))
    }

    fn workers(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn tracks(n: usize) -> Vec<TrackDescriptor> {
        (0..n).map(|i| track("Band", &format!("Track #{i:03}"))).collect()
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default();

        let result = scheduler(&fetcher)
            .run_batch("Mix", &[], dir.path(), workers(4))
            .await;

        assert_eq!(result, PlaylistRunResult::new("Mix"));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_track_is_counted_exactly_once() {
        for (n, cap) in [(1, 1), (3, 8), (10, 3), (25, 1), (25, 25)] {
            let dir = tempfile::tempdir().unwrap();
            let fetcher = FakeFetcher::default().fail_on("#002").fail_on("#007");

            let result = scheduler(&fetcher)
                .run_batch("Mix", &tracks(n), dir.path(), workers(cap))
                .await;

            assert_eq!(result.total(), n, "n={n} cap={cap}");
            assert_eq!(result.failed, result.failed_descriptors.len());
            assert_eq!(fetcher.calls(), n);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_worker_cap() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().with_delay(Duration::from_millis(20));

        let result = scheduler(&fetcher)
            .run_batch("Mix", &tracks(12), dir.path(), workers(3))
            .await;

        assert_eq!(result.succeeded, 12);
        assert!(fetcher.max_in_flight() <= 3);
        assert!(fetcher.max_in_flight() >= 2, "work should overlap");
    }

    #[tokio::test]
    async fn two_of_three_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().fail_on("Bad Song");
        let batch = vec![
            track("Band", "Good Song"),
            track("Band", "Bad Song"),
            track("Band", "Fine Song"),
        ];

        let result = scheduler(&fetcher)
            .run_batch("Mix", &batch, dir.path(), workers(2))
            .await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_descriptors, vec![track("Band", "Bad Song")]);
    }

    #[tokio::test]
    async fn panicking_acquisition_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().panic_on("Cursed");
        let batch = vec![track("Band", "Cursed"), track("Band", "Blessed")];

        let result = scheduler(&fetcher)
            .run_batch("Mix", &batch, dir.path(), workers(1))
            .await;

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_descriptors, vec![track("Band", "Cursed")]);
    }

    #[tokio::test]
    async fn already_downloaded_tracks_count_as_success() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Band - Old.mp3"), b"x").unwrap();
        let fetcher = FakeFetcher::default();

        let result = scheduler(&fetcher)
            .run_batch("Mix", &[track("Band", "Old"), track("Band", "New")], dir.path(), workers(2))
            .await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn colliding_names_in_one_batch_both_fetch_into_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().with_delay(Duration::from_millis(50));
        let batch = vec![track("Band", "Song?"), track("Band", "Song*")];

        let result = scheduler(&fetcher)
            .run_batch("Mix", &batch, dir.path(), workers(2))
            .await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(dir.path().join("Band - Song_.mp3").exists());
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
