use std::future::Future;

use serde::Serialize;
use tracing::warn;

/// What happened to an optimistic boolean toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToggleOutcome {
    /// Native side accepted the new value
    Applied(bool),
    /// Native side rejected it; local state went back to this value
    RolledBack(bool),
    /// Capture hardware inactive, nothing was touched
    Skipped,
}

/// Flip `flag` immediately, then confirm with the native side.
///
/// `cue` fires with the new value right away and, on rejection, again with the
/// reverted value. `remote` receives the new local value.
pub async fn optimistic_toggle<C, R, Fut>(flag: &mut bool, mut cue: C, remote: R) -> ToggleOutcome
where
    C: FnMut(bool),
    R: FnOnce(bool) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let previous = *flag;
    let next = !previous;

    *flag = next;
    cue(next);

    match remote(next).await {
        Ok(()) => ToggleOutcome::Applied(next),
        Err(e) => {
            warn!("↩️ Rolling back toggle to {}: {:#}", previous, e);
            *flag = previous;
            cue(previous);
            ToggleOutcome::RolledBack(previous)
        }
    }
}
