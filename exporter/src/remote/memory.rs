//! In-memory tree for exercising the traversal without a server.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::{child_path, RemoteError, RemoteResult, RemoteTree};

#[derive(Default)]
pub struct MemoryTree {
    data: HashMap<String, Vec<u8>>,
    children: HashMap<String, Vec<String>>,
    stalled: HashSet<String>,
    disconnected: HashSet<String>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default().with_node("/", "")
    }

    /// Adds `path` and links it to its parent, which must already exist.
    pub fn with_node(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.data.insert(path.to_string(), data.into());
        self.children.insert(path.to_string(), Vec::new());
        if path != "/" {
            let (parent, name) = path.rsplit_once('/').expect("absolute path");
            let parent = if parent.is_empty() { "/" } else { parent };
            self.children
                .get_mut(parent)
                .expect("parent added first")
                .push(name.to_string());
        }
        self
    }

    /// Lists `name` under `parent` without creating it, like a node deleted right
    /// after its parent's children were read.
    pub fn with_phantom(mut self, parent: &str, name: &str) -> Self {
        self.children
            .get_mut(parent)
            .expect("parent added first")
            .push(name.to_string());
        self
    }

    /// Fetches on `path` never resolve.
    pub fn with_stall(mut self, path: &str) -> Self {
        self.stalled.insert(path.to_string());
        self
    }

    /// Fetches on `path` fail as if the session dropped.
    pub fn with_disconnect(mut self, path: &str) -> Self {
        self.disconnected.insert(path.to_string());
        self
    }

    /// Builds a full tree `fanout` wide and `depth` levels below `/`.
    pub fn wide(fanout: usize, depth: usize) -> Self {
        fn grow(
            tree: MemoryTree,
            parent: &str,
            fanout: usize,
            depth: usize,
        ) -> MemoryTree {
            if depth == 0 {
                return tree;
            }
            (0..fanout).fold(tree, |tree, i| {
                let path = child_path(parent, &format!("n{}", i));
                let tree = tree.with_node(&path, path.as_bytes());
                grow(tree, &path, fanout, depth - 1)
            })
        }
        grow(Self::new(), "/", fanout, depth)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, path: &str) -> RemoteResult<InFlight<'_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        // Give siblings a chance to start their own requests.
        tokio::task::yield_now().await;

        if self.stalled.contains(path) {
            std::future::pending::<()>().await;
        }
        if self.disconnected.contains(path) {
            return Err(RemoteError::ConnectionLost {
                path: path.to_string(),
                reason: "session expired".to_string(),
            });
        }
        Ok(guard)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteTree for MemoryTree {
    async fn fetch_data(&self, path: &str) -> RemoteResult<Vec<u8>> {
        let _guard = self.enter(path).await?;
        self.data
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::NoNode(path.to_string()))
    }

    async fn fetch_children(&self, path: &str) -> RemoteResult<Vec<String>> {
        let _guard = self.enter(path).await?;
        match (self.data.contains_key(path), self.children.get(path)) {
            (true, Some(children)) => Ok(children.clone()),
            _ => Err(RemoteError::NoNode(path.to_string())),
        }
    }
}
