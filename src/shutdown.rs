use std::fmt;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// SIGINT/SIGTERM handlers, registered when the listener is created.
///
/// A signal that arrives before [`ShutdownListener::recv`] is first awaited
/// is kept and returned by the next `recv`. Must be created inside a tokio
/// runtime.
pub struct ShutdownListener {
    #[cfg(unix)]
    interrupt: Option<signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<signal::unix::Signal>,
}

impl ShutdownListener {
    pub fn install() -> Self {
        #[cfg(unix)]
        {
            use signal::unix::{signal, SignalKind};
            let register = |kind: SignalKind, name: &str| match signal(kind) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!(error = %e, signal = name, "failed to install signal handler");
                    None
                }
            };
            Self {
                interrupt: register(SignalKind::interrupt(), "SIGINT"),
                terminate: register(SignalKind::terminate(), "SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Resolves on the first SIGINT (Ctrl+C) or SIGTERM.
    pub async fn recv(&mut self) -> ShutdownSignal {
        let received = self.next_signal().await;
        info!(signal = %received, "received shutdown signal");
        received
    }

    #[cfg(unix)]
    async fn next_signal(&mut self) -> ShutdownSignal {
        let interrupt = wait_on(self.interrupt.as_mut());
        let terminate = wait_on(self.terminate.as_mut());
        tokio::select! {
            biased;
            _ = interrupt => ShutdownSignal::Interrupt,
            _ = terminate => ShutdownSignal::Terminate,
        }
    }

    #[cfg(not(unix))]
    async fn next_signal(&mut self) -> ShutdownSignal {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        ShutdownSignal::Interrupt
    }
}

#[cfg(unix)]
async fn wait_on(stream: Option<&mut signal::unix::Signal>) {
    match stream {
        Some(stream) => {
            if stream.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
