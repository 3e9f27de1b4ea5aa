//! 監視ループの中断制御

use std::future::Future;

/// `work` と `stop` を競わせる。`stop` が先に終われば `None`
///
/// HTTP取得の途中でもCtrl+Cで即座に抜けるために使う。
pub async fn race_stop<F, S>(work: F, stop: S) -> Option<F::Output>
where
    F: Future,
    S: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = stop => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_interrupts_pending_work() {
        let result = race_stop(std::future::pending::<u32>(), async {}).await;
        assert_eq!(result, None, "取得待ちの途中でも停止できること");
    }

    #[tokio::test]
    async fn test_work_finishes_before_stop() {
        let result = race_stop(async { 7 }, tokio::time::sleep(Duration::from_secs(30))).await;
        assert_eq!(result, Some(7));
    }
}
