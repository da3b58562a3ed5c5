use std::collections::HashSet;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use super::{Connection, ConnectionContext, ConnectionRegistry};
use crate::error::RegistryError;

/// Turns full connection-set snapshots into "connection appeared" events.
///
/// A connection that drops out of a snapshot and later comes back is
/// reported again as a fresh appearance.
#[derive(Debug, Default)]
pub struct ConnectionAppearances {
    present: HashSet<String>,
}

impl ConnectionAppearances {
    /// Apply the next snapshot, returning the connections it added
    pub fn apply(&mut self, snapshot: Vec<Connection>) -> Vec<Connection> {
        let mut current = HashSet::with_capacity(snapshot.len());
        let mut added = Vec::new();

        for connection in snapshot {
            if !current.insert(connection.root_uri().to_string()) {
                continue;
            }
            if !self.present.contains(connection.root_uri()) {
                added.push(connection);
            }
        }

        self.present = current;
        added
    }
}

/// Every context the dispatcher should listen on: the local context right
/// away, then each remote connection as it appears.
///
/// Registry failures are passed through as-is.
pub fn observe_contexts(
    registry: &dyn ConnectionRegistry,
) -> BoxStream<'static, Result<ConnectionContext, RegistryError>> {
    let appearances = registry
        .observe_connections()
        .scan(ConnectionAppearances::default(), |seen, snapshot| {
            let batch: Vec<Result<ConnectionContext, RegistryError>> = match snapshot {
                Ok(connections) => seen
                    .apply(connections)
                    .into_iter()
                    .map(|connection| Ok(ConnectionContext::Remote(connection)))
                    .collect(),
                Err(err) => vec![Err(err)],
            };
            future::ready(Some(batch))
        })
        .flat_map(stream::iter);

    stream::once(future::ready(Ok(ConnectionContext::Local)))
        .chain(appearances)
        .boxed()
}
