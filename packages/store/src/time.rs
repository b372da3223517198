//! Platform-aware timers: `tokio::time` on native, `gloo-timers` on WASM.

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use futures::future::{select, Either};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

pub async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}

/// Race `future` against a timer; the future is dropped if the timer wins.
pub async fn timeout<F: Future>(duration: Duration, future: F) -> Result<F::Output, Elapsed> {
    let future = pin!(future);
    let delay = pin!(sleep(duration));
    match select(future, delay).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(Elapsed(duration)),
    }
}
