use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

/// Hold everything back until `delay` has passed.
///
/// Returns `false` if shutdown was requested (or the handle dropped) first,
/// in which case nothing downstream may run.
pub(crate) async fn wait_for_startup(
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if *shutdown.borrow() {
        return false;
    }

    tokio::select! {
        _ = sleep(delay) => !*shutdown.borrow(),
        _ = shutdown.changed() => false,
    }
}
