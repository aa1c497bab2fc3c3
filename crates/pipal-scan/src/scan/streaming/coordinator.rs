use super::chunk::Chunk;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Pushes every planned chunk into the worker queue and returns how many
/// were queued.
///
/// The queue is bounded, so this waits whenever the workers fall behind.
/// Feeding stops as soon as `token` is cancelled, or when every worker has
/// dropped its end of the queue. Dropping `tx` on return closes the queue,
/// which lets idle workers exit once it is drained.
pub async fn feed_chunks(
    plan: impl IntoIterator<Item = Chunk>,
    tx: mpsc::Sender<Chunk>,
    token: CancellationToken,
) -> usize {
    let mut queued = 0;

    for chunk in plan {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::info!("Run cancelled; stopped queueing at chunk {}", chunk.id);
                break;
            }
            sent = tx.send(chunk) => {
                if sent.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("All workers exited; stopped queueing at chunk {}", chunk.id);
                    break;
                }
                queued += 1;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Queued {queued} chunks");
    queued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::streaming::chunk::ChunkPlan;

    #[tokio::test]
    async fn queues_the_whole_plan_then_closes() {
        let (tx, mut rx) = mpsc::channel(64);
        let queued = feed_chunks(ChunkPlan::new(0, 1_000, 300, 20), tx, CancellationToken::new()).await;
        assert_eq!(queued, 4);

        let mut ids = Vec::new();
        while let Some(chunk) = rx.recv().await {
            ids.push(chunk.id);
        }
        assert_eq!(ids, [0, 300, 580, 860]);
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let (tx, mut rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let feeder = tokio::spawn(feed_chunks(
            ChunkPlan::new(0, 10_000, 100, 10),
            tx,
            token.clone(),
        ));

        // The first chunk fills the queue; the feeder then blocks on the second.
        assert_eq!(rx.recv().await.map(|c| c.id), Some(0));
        token.cancel();
        let queued = feeder.await.unwrap();
        assert!(queued <= 2, "{queued}");

        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn stops_when_workers_are_gone() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let queued = feed_chunks(ChunkPlan::new(0, 10_000, 100, 10), tx, CancellationToken::new()).await;
        assert_eq!(queued, 0);
    }
}
