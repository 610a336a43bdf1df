#![cfg(unix)]

use site_watcher::shutdown::{ShutdownListener, ShutdownSignal};
use std::process::Command;
use std::time::Duration;

#[tokio::test]
async fn signal_before_recv_is_not_lost() {
    let mut listener = ShutdownListener::install();

    // Delivered before anything awaits the listener.
    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let received = tokio::time::timeout(Duration::from_secs(5), listener.recv())
        .await
        .expect("signal should already be pending");
    assert_eq!(received, ShutdownSignal::Terminate);
}
