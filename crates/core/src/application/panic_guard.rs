// Panic isolation for process units
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Await a future, turning a panic inside it into `Err(message)`
///
/// The future is polled on the current task (no `tokio::spawn`), so sibling
/// units keep their interleaving and ordering guarantees.
pub async fn guarded<F, T>(unit: &str, future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(payload) => {
            let panic_msg = panic_message(payload.as_ref());
            error!(unit = %unit, panic_msg = %panic_msg, "Process unit panicked");
            Err(panic_msg)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
