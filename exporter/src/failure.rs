use std::{error::Error, process::ExitCode};

use uuid::Uuid;

use crate::{
    cli::CliError,
    export::ExportError,
    remote::RemoteError,
    traverse::TraverseError,
};

/// Anything that ends the process unsuccessfully.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Usage(#[from] CliError),
    #[error(transparent)]
    Config(#[from] anyhow::Error),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Category {
    Usage,
    ConnectionTimeout,
    AuthRejected,
    PermissionDenied,
    InvalidDestination,
    NotADirectory,
    MissingNode,
    PayloadDecode,
    Unimplemented,
}

impl Category {
    pub fn code(self) -> u8 {
        match self {
            Category::Usage => 1,
            Category::ConnectionTimeout | Category::AuthRejected => 2,
            Category::PermissionDenied => 3,
            Category::InvalidDestination => 4,
            Category::NotADirectory => 5,
            Category::MissingNode => 6,
            Category::PayloadDecode => 7,
            Category::Unimplemented => 255,
        }
    }

    pub fn cause(self) -> &'static str {
        match self {
            Category::Usage => "wrong arguments",
            Category::ConnectionTimeout => "the connection to ZooKeeper failed",
            Category::AuthRejected => "ZooKeeper rejected the credentials",
            Category::PermissionDenied => "no permission to write the destination",
            Category::InvalidDestination => "the destination is a directory",
            Category::NotADirectory => "the root path is not a node path",
            Category::MissingNode => "a node disappeared during the export",
            Category::PayloadDecode => "a node holds data that is not UTF-8",
            Category::Unimplemented => "something this tool does not handle happened",
        }
    }
}

impl From<&Failure> for Category {
    fn from(failure: &Failure) -> Self {
        match failure {
            Failure::Usage(CliError::InvalidRoot(_)) => Category::NotADirectory,
            Failure::Usage(_) | Failure::Config(_) => Category::Usage,
            Failure::Export(e) => e.into(),
        }
    }
}

impl From<&ExportError> for Category {
    fn from(e: &ExportError) -> Self {
        match e {
            ExportError::IsADirectory(_) => Category::InvalidDestination,
            ExportError::NoWritePermission(_) | ExportError::Write { .. } => {
                Category::PermissionDenied
            }
            ExportError::Connect(RemoteError::NoNode(_)) => Category::MissingNode,
            ExportError::Connect(RemoteError::Auth(_)) => Category::AuthRejected,
            ExportError::Connect(RemoteError::Unexpected { .. }) => {
                Category::Unimplemented
            }
            ExportError::Connect(_) => Category::ConnectionTimeout,
            ExportError::Traverse(TraverseError::Remote(r)) => match r {
                RemoteError::NoNode(_) => Category::MissingNode,
                RemoteError::ConnectionLost { .. } | RemoteError::Timeout(_) => {
                    Category::ConnectionTimeout
                }
                RemoteError::Auth(_) => Category::AuthRejected,
                RemoteError::Unexpected { .. } => Category::Unimplemented,
            },
            ExportError::Traverse(TraverseError::FetchTimeout { .. }) => {
                Category::ConnectionTimeout
            }
            ExportError::Traverse(TraverseError::Decode(_)) => Category::PayloadDecode,
            ExportError::Serialize(_) => Category::Unimplemented,
        }
    }
}

/// The error and all of its sources, outermost first.
fn chain(e: &dyn Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

pub fn short_id(error_id: &Uuid) -> String {
    error_id.to_string()[..8].to_string()
}

pub fn summary(category: Category, error_id: &Uuid) -> String {
    format!(
        "An error has occurred: {}.\nError id: {}",
        category.cause(),
        short_id(error_id)
    )
}

/// Logs `failure` in full under a fresh id, tells the operator the short version and
/// picks the exit code.
pub fn make_graceful(failure: &Failure) -> ExitCode {
    let category = Category::from(failure);
    let error_id = Uuid::new_v4();
    log::error!("{} ({:?}): {}", error_id, category, chain(failure));
    log::debug!("{} details: {:?}", error_id, failure);
    eprintln!("{}", summary(category, &error_id));
    ExitCode::from(category.code())
}
