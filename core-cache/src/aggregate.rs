//! Live count and total size derived from the entry set.
//!
//! One background task per storage switches over membership (the entry-set
//! snapshot channel) and combines the latest size of every member. When the
//! membership changes the member subscriptions are dropped and rebuilt.

use crate::entries::EntrySnapshot;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Receivers for the derived views of one storage.
#[derive(Clone)]
pub struct AggregateViews {
    pub count: watch::Receiver<usize>,
    pub total_size: watch::Receiver<u64>,
}

/// Spawn the aggregation pipeline on the current runtime.
///
/// The task stops when `scope` is cancelled or the membership channel closes.
pub fn spawn_aggregation(
    membership: watch::Receiver<EntrySnapshot>,
    scope: CancellationToken,
) -> AggregateViews {
    let (count_tx, count) = watch::channel(membership.borrow().len());
    let (size_tx, total_size) = watch::channel(0u64);

    tokio::spawn(run_aggregation(membership, count_tx, size_tx, scope));

    AggregateViews { count, total_size }
}

async fn run_aggregation(
    mut membership: watch::Receiver<EntrySnapshot>,
    count_tx: watch::Sender<usize>,
    size_tx: watch::Sender<u64>,
    scope: CancellationToken,
) {
    loop {
        let members = membership.borrow_and_update().clone();
        count_tx.send_replace(members.len());

        let mut receivers: Vec<watch::Receiver<u64>> =
            members.iter().map(|handle| handle.total_size()).collect();
        let mut latest: Vec<u64> = receivers
            .iter_mut()
            .map(|rx| *rx.borrow_and_update())
            .collect();
        size_tx.send_replace(latest.iter().sum());
        trace!(members = members.len(), "Recomputed aggregate size");

        let mut sizes = stream::select_all(
            receivers
                .into_iter()
                .enumerate()
                .map(|(index, rx)| WatchStream::from_changes(rx).map(move |size| (index, size))),
        );

        loop {
            tokio::select! {
                _ = scope.cancelled() => return,
                changed = membership.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                Some((index, size)) = sizes.next() => {
                    latest[index] = size;
                    size_tx.send_replace(latest.iter().sum());
                }
            }
        }
    }
}
