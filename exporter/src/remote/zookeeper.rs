use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use zookeeper_client as zk;

use super::{RemoteError, RemoteResult, RemoteTree};

const DIGEST: &str = "digest";

/// A ZooKeeper session. `zk::Client` multiplexes requests over one session, so all
/// fetches of a traversal share this handle.
pub struct ZkTree {
    client: zk::Client,
}

impl ZkTree {
    /// Connects to `host` (`host:port[,host:port...]`) and authenticates with
    /// `credentials` (`user:password`) unless they are empty.
    pub async fn bootstrap(
        host: &str,
        credentials: &str,
        connect_timeout: Duration,
    ) -> RemoteResult<Self> {
        log::debug!("Connecting to '{}' (timeout {:?})", host, connect_timeout);
        let client = match timeout(connect_timeout, zk::Client::connect(host)).await {
            Err(_) => return Err(RemoteError::Timeout(connect_timeout)),
            Ok(Err(e)) => return Err(translate("/", e)),
            Ok(Ok(client)) => client,
        };
        log::info!("ZooKeeper connection established");

        if credentials.is_empty() {
            log::debug!("No credentials given, skipping authentication");
        } else {
            client
                .auth(DIGEST.to_string(), credentials.as_bytes().to_vec())
                .await
                .map_err(|e| RemoteError::Auth(e.to_string()))?;
            log::debug!("Authenticated with the {} scheme", DIGEST);
        }

        Ok(ZkTree { client })
    }
}

#[async_trait]
impl RemoteTree for ZkTree {
    async fn fetch_data(&self, path: &str) -> RemoteResult<Vec<u8>> {
        let (data, _stat) = self
            .client
            .get_data(path)
            .await
            .map_err(|e| translate(path, e))?;
        Ok(data)
    }

    async fn fetch_children(&self, path: &str) -> RemoteResult<Vec<String>> {
        self.client
            .list_children(path)
            .await
            .map_err(|e| translate(path, e))
    }
}

fn translate(path: &str, e: zk::Error) -> RemoteError {
    match e {
        zk::Error::NoNode => RemoteError::NoNode(path.to_string()),
        zk::Error::ConnectionLoss
        | zk::Error::SessionExpired
        | zk::Error::ClientClosed => RemoteError::ConnectionLost {
            path: path.to_string(),
            reason: e.to_string(),
        },
        e => RemoteError::Unexpected {
            path: path.to_string(),
            reason: e.to_string(),
        },
    }
}
