//! 可取消的周期任务
//!
//! 轮询任务绑定在会话的生命周期上：切换联系人、关闭面板或句柄被丢弃时停止。

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    label: String,
}

impl PollHandle {
    /// 启动周期任务，第一次触发在一个周期之后
    ///
    /// `tick` 返回 `false` 时任务自行结束
    pub fn spawn<F, Fut>(period: Duration, label: impl Into<String>, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let label = label.into();
        let token = CancellationToken::new();
        let child = token.clone();
        let task_label = label.clone();

        info!("[Poller] ⏱️ 启动轮询: {}，间隔 {:?}", label, period);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                // 进行中的一轮总是执行完，监听器不会漏掉本轮的通知
                if !tick().await || child.is_cancelled() {
                    break;
                }
            }
            debug!("[Poller] 轮询结束: {}", task_label);
        });

        Self { token, task, label }
    }

    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!("[Poller] ⏹️ 停止轮询: {}", self.label);
            self.token.cancel();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = PollHandle::spawn(Duration::from_secs(2), "test", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        tokio::time::sleep(Duration::from_millis(6_100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_returning_false_ends_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = PollHandle::spawn(Duration::from_secs(1), "once", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                false
            }
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_the_running_tick_finish() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (started.clone(), finished.clone());
        let handle = PollHandle::spawn(Duration::from_secs(2), "slow", move || {
            let (s, f) = (s.clone(), f.clone());
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                f.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        handle.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = PollHandle::spawn(Duration::from_secs(1), "dropped", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                true
            }
        });
        drop(handle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
