//! 리슨 키 세션 관리.
//!
//! 사용자 데이터 스트림의 리슨 키는 약 60분 유효합니다.
//! 만료보다 충분히 짧은 25분 주기로 갱신하며, 개별 갱신 실패는
//! 경고로만 남기고 세션을 유지합니다.

use crate::error::ExchangeResult;
use crate::traits::FuturesApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 리슨 키 갱신 주기.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25 * 60);

/// 리슨 키 수명주기 관리자.
pub struct ListenKeyManager {
    api: Arc<dyn FuturesApi>,
}

impl ListenKeyManager {
    /// 새 관리자를 생성합니다.
    pub fn new(api: Arc<dyn FuturesApi>) -> Self {
        Self { api }
    }

    /// 리슨 키를 발급받습니다.
    pub async fn acquire(&self) -> ExchangeResult<String> {
        let key = self.api.start_user_stream().await?;
        info!("Listen key acquired");
        Ok(key)
    }

    /// 주기적 갱신 태스크를 시작합니다.
    ///
    /// 종료 신호가 올 때까지 25분마다 갱신을 시도합니다.
    /// 갱신 실패는 기록만 하고 다음 주기에 다시 시도합니다.
    pub fn spawn_keepalive(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(KEEPALIVE_INTERVAL);
            // 첫 틱은 즉시 발화한다. 키는 방금 발급됐으므로 건너뛴다.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match api.keepalive_user_stream().await {
                            Ok(()) => debug!("Listen key keepalive sent"),
                            Err(e) => {
                                warn!(error = %e, "Listen key keepalive failed, will retry next interval");
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!("Listen key keepalive stopped");
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExchangeError;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};
    use terminal_core::{Candle, OrderRequest, Position, SymbolFilters, Timeframe};

    struct CountingApi {
        keepalives: AtomicU32,
        fail_keepalive: bool,
    }

    #[async_trait]
    impl FuturesApi for CountingApi {
        async fn start_user_stream(&self) -> ExchangeResult<String> {
            Ok("listen-key".to_string())
        }
        async fn keepalive_user_stream(&self) -> ExchangeResult<()> {
            self.keepalives.fetch_add(1, Ordering::SeqCst);
            if self.fail_keepalive {
                Err(ExchangeError::NetworkError("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
        async fn ticker_price(&self, _symbol: &str) -> ExchangeResult<Decimal> {
            unimplemented!()
        }
        async fn symbol_filters(&self, _symbol: &str) -> ExchangeResult<SymbolFilters> {
            unimplemented!()
        }
        async fn klines(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: Option<u32>,
        ) -> ExchangeResult<Vec<Candle>> {
            unimplemented!()
        }
        async fn account_positions(&self) -> ExchangeResult<Vec<Position>> {
            unimplemented!()
        }
        async fn change_leverage(&self, _symbol: &str, _leverage: u32) -> ExchangeResult<()> {
            unimplemented!()
        }
        async fn change_position_mode(&self, _dual_side: bool) -> ExchangeResult<()> {
            unimplemented!()
        }
        async fn submit_order(&self, _request: &OrderRequest) -> ExchangeResult<String> {
            unimplemented!()
        }
        async fn cancel_order(&self, _symbol: &str, _order_id: &str) -> ExchangeResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_fires_every_interval() {
        let api = Arc::new(CountingApi {
            keepalives: AtomicU32::new(0),
            fail_keepalive: false,
        });
        let manager = ListenKeyManager::new(Arc::clone(&api) as Arc<dyn FuturesApi>);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = manager.spawn_keepalive(shutdown_rx);
        // 태스크가 인터벌 타이머를 등록하도록 먼저 한 번 실행한다.
        tokio::task::yield_now().await;

        tokio::time::advance(KEEPALIVE_INTERVAL).await;
        tokio::task::yield_now().await;
        assert_eq!(api.keepalives.load(Ordering::SeqCst), 1);

        tokio::time::advance(KEEPALIVE_INTERVAL).await;
        tokio::task::yield_now().await;
        assert_eq!(api.keepalives.load(Ordering::SeqCst), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_failure_does_not_stop_loop() {
        let api = Arc::new(CountingApi {
            keepalives: AtomicU32::new(0),
            fail_keepalive: true,
        });
        let manager = ListenKeyManager::new(Arc::clone(&api) as Arc<dyn FuturesApi>);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = manager.spawn_keepalive(shutdown_rx);
        // 태스크가 인터벌 타이머를 등록하도록 먼저 한 번 실행한다.
        tokio::task::yield_now().await;

        tokio::time::advance(KEEPALIVE_INTERVAL).await;
        tokio::task::yield_now().await;
        tokio::time::advance(KEEPALIVE_INTERVAL).await;
        tokio::task::yield_now().await;

        // 실패해도 루프는 계속 돈다
        assert_eq!(api.keepalives.load(Ordering::SeqCst), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
