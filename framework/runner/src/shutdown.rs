use tokio::signal;
use fetch_bench_core::prelude::ShutdownHandle;

/// Stop the current run when the user presses Ctrl-C.
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> anyhow::Result<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("Unable to listen for Ctrl-C, runs can only be stopped by the harness: {e}");
            return;
        }
        println!("Received shutdown signal, stopping the run...");
        listener_handle.shutdown();
    });

    Ok(handle)
}
