// Shared autoplay support state
// Write-once verdict published by the probe and read by everything else

use tokio::sync::watch;

/// Where the probe currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The probe has not reported yet.
    Pending,
    /// Playback started without user interaction.
    Supported,
    /// The environment refused playback, or the probe could not run.
    Unsupported,
}

impl SupportStatus {
    /// The boolean consumers branch on, once resolved.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            SupportStatus::Pending => None,
            SupportStatus::Supported => Some(true),
            SupportStatus::Unsupported => Some(false),
        }
    }
}

/// Producer half of the verdict. `resolve` consumes it, so the verdict
/// can only ever be written once.
pub struct SupportResolver {
    tx: watch::Sender<SupportStatus>,
}

/// Reader half of the verdict. Cheap to clone; any number of readers may
/// peek or wait.
#[derive(Clone)]
pub struct SupportHandle {
    rx: watch::Receiver<SupportStatus>,
}

/// Create an unresolved verdict pair.
pub fn support_channel() -> (SupportResolver, SupportHandle) {
    let (tx, rx) = watch::channel(SupportStatus::Pending);
    (SupportResolver { tx }, SupportHandle { rx })
}

impl SupportResolver {
    /// Publish the verdict and wake every waiting reader.
    pub fn resolve(self, supported: bool) {
        let status = if supported {
            SupportStatus::Supported
        } else {
            SupportStatus::Unsupported
        };
        // No receivers left is fine; the value still lands in the channel.
        let _ = self.tx.send(status);
    }
}

impl SupportHandle {
    /// Non-blocking look at the current status.
    pub fn current(&self) -> SupportStatus {
        *self.rx.borrow()
    }

    /// Wait for the verdict. A probe that disappears without reporting
    /// counts as unsupported.
    pub async fn resolved(&self) -> bool {
        let mut rx = self.rx.clone();
        loop {
            if let Some(supported) = rx.borrow_and_update().as_bool() {
                return supported;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_to_true_for_all_readers() {
        let (resolver, handle) = support_channel();
        let other = handle.clone();

        assert_eq!(handle.current(), SupportStatus::Pending);

        resolver.resolve(true);

        assert!(handle.resolved().await);
        assert!(other.resolved().await);
        assert_eq!(handle.current(), SupportStatus::Supported);
    }

    #[tokio::test]
    async fn resolves_to_false() {
        let (resolver, handle) = support_channel();
        resolver.resolve(false);

        assert!(!handle.resolved().await);
        assert_eq!(handle.current(), SupportStatus::Unsupported);
    }

    #[tokio::test]
    async fn repeated_reads_see_the_same_value() {
        let (resolver, handle) = support_channel();
        resolver.resolve(true);

        assert!(handle.resolved().await);
        assert!(handle.resolved().await);
        assert_eq!(handle.current(), SupportStatus::Supported);
    }

    #[tokio::test]
    async fn dropped_resolver_reads_as_unsupported() {
        let (resolver, handle) = support_channel();
        drop(resolver);

        assert!(!handle.resolved().await);
    }

    #[tokio::test]
    async fn waiters_wake_on_resolution() {
        let (resolver, handle) = support_channel();
        let waiter = tokio::spawn(async move { handle.resolved().await });

        resolver.resolve(true);

        assert!(waiter.await.unwrap());
    }
}
