//! Batch Trigger Module
//!
//! Cancellable minimum-dwell timer. The waiting side lives in the flush task;
//! the `FastForward` side is kept in the flush registry so shutdown can release
//! the wait immediately instead of sleeping out the rest of the dwell.

use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until};

pub(crate) struct DwellTimer {
    deadline: Instant,
    fired: oneshot::Receiver<()>,
}

pub(crate) struct FastForward {
    fire: Option<oneshot::Sender<()>>,
}

/// Create a dwell timer ending at `deadline` and the trigger that ends it early.
///
/// The deadline is absolute so the dwell does not depend on when the flush
/// task first gets polled.
pub(crate) fn dwell(deadline: Instant) -> (DwellTimer, FastForward) {
    let (fire, fired) = oneshot::channel();
    (
        DwellTimer { deadline, fired },
        FastForward { fire: Some(fire) },
    )
}

impl DwellTimer {
    /// Wait out the dwell. Returns `true` if it was fast-forwarded.
    pub(crate) async fn wait(self) -> bool {
        let timer = sleep_until(self.deadline);
        tokio::pin!(timer);
        tokio::select! {
            _ = &mut timer => false,
            fired = self.fired => match fired {
                Ok(()) => true,
                // Trigger dropped without firing: sleep until the deadline.
                Err(_) => {
                    timer.await;
                    false
                }
            },
        }
    }
}

impl FastForward {
    /// Release the waiting flush. Returns `false` if already fired.
    pub(crate) fn fire(&mut self) -> bool {
        match self.fire.take() {
            Some(fire) => fire.send(()).is_ok(),
            None => false,
        }
    }
}
