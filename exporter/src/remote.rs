pub mod zookeeper;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("node '{0}' does not exist")]
    NoNode(String),
    #[error("lost the connection while reading '{path}': {reason}")]
    ConnectionLost { path: String, reason: String },
    #[error("could not connect within {0:?}")]
    Timeout(std::time::Duration),
    #[error("could not authenticate: {0}")]
    Auth(String),
    #[error("unexpected answer while reading '{path}': {reason}")]
    Unexpected { path: String, reason: String },
}

/// Read-only view of a remote coordination tree. One handle is shared by every
/// concurrent fetch of a traversal, so implementations must allow overlapping calls.
#[async_trait]
pub trait RemoteTree: Sync {
    async fn fetch_data(&self, path: &str) -> RemoteResult<Vec<u8>>;
    async fn fetch_children(&self, path: &str) -> RemoteResult<Vec<String>>;
}

pub fn child_path(parent: &str, child: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Last `/` segment of `path`, `/` itself for the root.
pub fn basename(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some("") | None => "/",
        Some(name) => name,
    }
}

/// A root path must be absolute and without empty segments, `/` excepted.
pub fn is_valid_path(path: &str) -> bool {
    path == "/"
        || (path.starts_with('/') && path[1..].split('/').all(|seg| !seg.is_empty()))
}
