use ferrous_mdns_jobs::InterfaceWatchJob;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::MockInterfaceMonitor;

#[tokio::test(start_paused = true)]
async fn test_interface_watch_fires_on_interval() {
    let mock = Arc::new(MockInterfaceMonitor::new());
    let job = Arc::new(InterfaceWatchJob::new(mock.clone()).with_interval(30));

    job.start().await;
    sleep(Duration::from_secs(65)).await;

    assert_eq!(mock.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interface_watch_error_is_non_fatal() {
    let mock = Arc::new(MockInterfaceMonitor::new());
    mock.set_should_fail(true);
    let job = Arc::new(InterfaceWatchJob::new(mock.clone()).with_interval(1));

    job.start().await;
    sleep(Duration::from_millis(2500)).await;

    assert!(mock.call_count() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_interface_watch_shuts_down_on_cancellation() {
    let mock = Arc::new(MockInterfaceMonitor::new());
    let token = CancellationToken::new();
    let job = Arc::new(
        InterfaceWatchJob::new(mock.clone())
            .with_interval(1)
            .with_cancellation(token.clone()),
    );

    job.start().await;
    token.cancel();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(mock.call_count(), 0);
}
