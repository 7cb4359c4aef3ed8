use std::{
    ffi::CString,
    fs::File,
    io::{self, Write},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tempfile::NamedTempFile;

use crate::{
    remote::{zookeeper::ZkTree, RemoteError, RemoteTree},
    traverse::{traverse, TraverseError, TraverseOptions},
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("'{}' is a directory, please provide a file name instead", .0.display())]
    IsADirectory(PathBuf),
    #[error("no permission to write '{}'", .0.display())]
    NoWritePermission(PathBuf),
    #[error("could not start the session")]
    Connect(#[source] RemoteError),
    #[error(transparent)]
    Traverse(#[from] TraverseError),
    #[error("could not serialize the tree")]
    Serialize(#[from] serde_json::Error),
    #[error("could not write '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything needed for one export, merged from the command line and config.
#[derive(Debug)]
pub struct ExportJob {
    pub host: String,
    pub root: String,
    pub credentials: String,
    pub destination: PathBuf,
    pub connect_timeout: Duration,
    pub options: TraverseOptions,
}

#[derive(Debug)]
pub struct ExportSummary {
    pub nodes: u64,
    pub bytes_written: usize,
    pub elapsed: Duration,
}

pub async fn run(job: &ExportJob) -> Result<ExportSummary, ExportError> {
    check_destination(&job.destination)?;
    log::debug!("Write permission on {:?} ok", job.destination);

    let start = Instant::now();
    let tree = ZkTree::bootstrap(&job.host, &job.credentials, job.connect_timeout)
        .await
        .map_err(ExportError::Connect)?;
    log::debug!("Session ready after {:?}", start.elapsed());

    export_tree(&tree, &job.root, &job.destination, &job.options).await
}

/// Walks `root`, then writes the whole document in one go. Nothing is written if
/// any step fails.
pub async fn export_tree<T>(
    tree: &T,
    root: &str,
    destination: &Path,
    options: &TraverseOptions,
) -> Result<ExportSummary, ExportError>
where
    T: RemoteTree,
{
    let start = Instant::now();
    log::info!("Traversing '{}'", root);
    let traversal = traverse(tree, root, options).await?;
    log::info!(
        "Visited {} nodes ({} payload bytes) in {:?}",
        traversal.nodes,
        traversal.payload_bytes,
        start.elapsed()
    );

    let bytes = serde_json::to_vec(&traversal.root)?;
    let bytes_written = bytes.len();
    let path = destination.to_owned();
    tokio::task::spawn_blocking(move || {
        write_atomically(&path, |file| file.write_all(&bytes))
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    .and_then(|res| res)
    .map_err(|source| ExportError::Write {
        path: destination.to_owned(),
        source,
    })?;

    let summary = ExportSummary {
        nodes: traversal.nodes,
        bytes_written,
        elapsed: start.elapsed(),
    };
    log::info!(
        "Wrote {} bytes to {:?} in {:?}",
        summary.bytes_written,
        destination,
        summary.elapsed
    );
    Ok(summary)
}

/// Lets `fill` write into a temporary file next to `destination` and renames it over
/// `destination` only once that succeeded. On any error `destination` is untouched
/// and the temporary file is removed.
fn write_atomically<F>(destination: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    // NOTE: same directory, so the final rename never crosses file systems
    let mut tmp = NamedTempFile::new_in(parent_dir(destination))?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

fn parent_dir(destination: &Path) -> &Path {
    destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Fails early, before any remote I/O, if `destination` can't be written.
pub fn check_destination(destination: &Path) -> Result<(), ExportError> {
    match std::fs::metadata(destination) {
        Ok(meta) if meta.is_dir() => {
            Err(ExportError::IsADirectory(destination.to_owned()))
        }
        Ok(_) => writable(destination, destination),
        Err(_) => writable(parent_dir(destination), destination),
    }
}

fn writable(checked: &Path, destination: &Path) -> Result<(), ExportError> {
    let denied = || ExportError::NoWritePermission(destination.to_owned());
    let path = CString::new(checked.as_os_str().as_bytes()).map_err(|_| denied())?;
    if unsafe { libc::access(path.as_ptr(), libc::W_OK) } == 0 {
        Ok(())
    } else {
        Err(denied())
    }
}
