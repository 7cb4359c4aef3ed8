use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use futures_util::{future::BoxFuture, stream::FuturesUnordered, FutureExt, TryStreamExt};
use record::TreeRecord;
use tokio::{sync::Semaphore, time::timeout};

use crate::{
    assemble::{assemble, decode_payload, DecodeError},
    remote::{child_path, RemoteError, RemoteTree},
};

pub type TraverseResult<T> = Result<T, TraverseError>;

#[derive(Debug, thiserror::Error)]
pub enum TraverseError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("fetching '{path}' took longer than {after:?}")]
    FetchTimeout { path: String, after: Duration },
}

#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Upper bound on nodes whose fetches are outstanding at the same time.
    pub max_in_flight: Option<usize>,
    pub fetch_timeout: Option<Duration>,
}

#[derive(Debug)]
pub struct Traversal {
    pub root: TreeRecord,
    pub nodes: u64,
    pub payload_bytes: u64,
}

struct Fetched {
    id: u64,
    data: String,
    children: Vec<String>,
}

struct Traverser<'a, T> {
    tree: &'a T,
    fetch_timeout: Option<Duration>,
    permits: Option<Semaphore>,
    last_id: AtomicU64,
    payload_bytes: AtomicU64,
}

/// Walks the subtree at `root` and builds its records. Any failing node aborts the
/// whole walk: the error is returned and no partial tree is kept.
pub async fn traverse<T>(
    tree: &T,
    root: &str,
    options: &TraverseOptions,
) -> TraverseResult<Traversal>
where
    T: RemoteTree,
{
    let traverser = Traverser {
        tree,
        fetch_timeout: options.fetch_timeout,
        permits: options.max_in_flight.map(|n| Semaphore::new(n.max(1))),
        last_id: AtomicU64::new(0),
        payload_bytes: AtomicU64::new(0),
    };

    let root = traverser.visit(root.to_string()).await?;
    Ok(Traversal {
        root,
        nodes: traverser.last_id.load(Ordering::SeqCst),
        payload_bytes: traverser.payload_bytes.load(Ordering::SeqCst),
    })
}

impl<'a, T> Traverser<'a, T>
where
    T: RemoteTree,
{
    fn visit(&self, path: String) -> BoxFuture<'_, TraverseResult<TreeRecord>> {
        async move {
            let Fetched { id, data, children } = self.fetch(&path).await?;
            if children.is_empty() {
                return Ok(assemble(&path, data, Vec::new(), id));
            }

            // NOTE: the group lives in this frame, returning early drops it and with it
            // every sibling still in flight.
            let mut group: FuturesUnordered<_> = children
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    self.visit(child_path(&path, name))
                        .map(move |res| res.map(|rec| (i, rec)))
                })
                .collect();

            let mut records = Vec::with_capacity(children.len());
            loop {
                match group.try_next().await {
                    Ok(Some(done)) => records.push(done),
                    Ok(None) => break,
                    Err(e) => {
                        if !group.is_empty() {
                            log::debug!(
                                "Cancelling {} sibling(s) under '{}'",
                                group.len(),
                                path
                            );
                        }
                        return Err(e);
                    }
                }
            }

            records.sort_unstable_by_key(|(i, _)| *i);
            let records = records.into_iter().map(|(_, rec)| rec).collect();
            Ok(assemble(&path, data, records, id))
        }
        .boxed()
    }

    async fn fetch(&self, path: &str) -> TraverseResult<Fetched> {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .expect("the semaphore is never closed"),
            ),
            None => None,
        };

        let both = async {
            tokio::try_join!(self.tree.fetch_data(path), self.tree.fetch_children(path))
        };
        let (payload, mut children) = match self.fetch_timeout {
            None => both.await?,
            Some(after) => timeout(after, both).await.map_err(|_| {
                TraverseError::FetchTimeout {
                    path: path.to_string(),
                    after,
                }
            })??,
        };
        drop(_permit);

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.payload_bytes
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
        log::trace!("Visited '{}' as #{} with {} children", path, id, children.len());

        let data = decode_payload(path, Some(&payload))?;
        children.sort_unstable();
        Ok(Fetched { id, data, children })
    }
}
