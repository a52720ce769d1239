use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Conventional status for a process ended by SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    CancelledQuestion,
    Quit,
}

/// Routes Ctrl-C to the question in flight. With no question in flight the
/// interrupt means quit.
#[derive(Clone, Default)]
pub struct InterruptRouter {
    in_flight: Arc<Mutex<Option<CancellationToken>>>,
}

impl InterruptRouter {
    /// Token for the next question; replaces any earlier one.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    pub fn finish(&self) {
        self.slot().take();
    }

    pub fn interrupt(&self) -> Interrupt {
        match self.slot().take() {
            Some(token) => {
                token.cancel();
                Interrupt::CancelledQuestion
            }
            None => Interrupt::Quit,
        }
    }

    /// The single SIGINT listener for a run. Aborting the handle stops it.
    pub fn spawn_watcher(&self) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if router.interrupt() == Interrupt::Quit {
                    eprintln!();
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
                tracing::info!("question cancelled by interrupt");
            }
        })
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
