//! The ingestion loop
//!
//! The loop never exits. Each iteration polls the ingester once
//! and then sleeps:
//!
//! ```txt
//!   start
//!   ||
//!   \/
//! +-------------+                    +-------------+
//! |   Polling   | == done/error ===> |  Sleeping   |
//! +-------------+                    +-------------+
//!   /\                                  ||
//!   ||=========== --poll-interval-ms ===||
//! ```
//!
//! A poll scans manifests, processes every pending file, and
//! evicts files which never arrived. Errors and panics inside a
//! poll are logged, and the next iteration proceeds as usual.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use cd11rx::{Ingester, StorageClient};

use crate::cli::Args;

/// Run the application
///
/// Polls `ingester` forever, sleeping for the configured
/// poll interval between iterations.
pub fn run<S>(args: &Args, mut ingester: Ingester<S>) -> !
where
    S: StorageClient,
{
    let interval = Duration::from_millis(args.poll_interval_ms);
    info!(
        "watching \"{}\" every {} ms",
        ingester.watch_dir().display(),
        args.poll_interval_ms
    );

    loop {
        poll_once(&mut ingester, Utc::now());
        thread::sleep(interval);
    }
}

/// Run one iteration, returning true if it completed
fn poll_once<S>(ingester: &mut Ingester<S>, now: DateTime<Utc>) -> bool
where
    S: StorageClient,
{
    match panic::catch_unwind(AssertUnwindSafe(|| ingester.poll(now))) {
        Ok(Ok(report)) => {
            if !report.is_quiet() {
                debug!(
                    "poll: {} manifest(s), {} announced, {} rejected, {} processed, {} pending, {} missing",
                    report.manifests_read,
                    report.names_announced,
                    report.names_rejected,
                    report.files_processed,
                    report.files_pending,
                    report.evicted.len()
                );
            }
            true
        }
        Ok(Err(err)) => {
            error!("{}", err);
            false
        }
        Err(_) => {
            error!("ingestion iteration panicked; continuing with the next one");
            false
        }
    }
}
