use std::{
    sync::mpsc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};

/// Terminates script execution in an isolate if it is still running once a deadline passes.
pub(crate) struct Watchdog {
    done: mpsc::Sender<()>,
    thread: thread::JoinHandle<bool>,
}

impl Watchdog {
    pub fn start(handle: v8::IsolateHandle, timeout: Duration) -> Result<Self> {
        let (done, done_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("script-watchdog".into())
            .spawn(move || match done_rx.recv_timeout(timeout) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    log::debug!("Script exceeded {timeout:?}, terminating execution.");
                    handle.terminate_execution();
                    true
                }
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => false,
            })
            .context("spawning script watchdog thread")?;
        Ok(Self { done, thread })
    }

    /// Stops the watchdog. Returns true if it terminated execution.
    pub fn finish(self) -> bool {
        // The watchdog may already have exited.
        let _ = self.done.send(());
        match self.thread.join() {
            Ok(terminated) => terminated,
            Err(_) => {
                log::error!("Script watchdog thread panicked.");
                false
            }
        }
    }
}
