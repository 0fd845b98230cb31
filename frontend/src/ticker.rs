use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;
use shared::progress::Ticker;
use std::time::Duration;

/// Waits on the browser timer between progress steps.
pub struct GlooTicker;

#[async_trait(?Send)]
impl Ticker for GlooTicker {
    async fn tick(&self, interval: Duration) {
        let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).await;
    }
}
