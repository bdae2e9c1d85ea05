//! 포지션 동기화기.
//!
//! 계좌 REST 스냅샷을 조회해 수량 0 포지션을 걸러낸 뒤 버스에 발행합니다.
//! 사용자 데이터 스트림의 계좌 이벤트가 재동기화를 유발합니다.

use crate::bus::PublicationBus;
use crate::traits::{AccountEvent, FuturesApi};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// REST 스냅샷 기반 포지션 동기화기.
pub struct PositionSynchronizer {
    api: Arc<dyn FuturesApi>,
    bus: Arc<PublicationBus>,
}

impl PositionSynchronizer {
    /// 새 동기화기를 생성합니다.
    pub fn new(api: Arc<dyn FuturesApi>, bus: Arc<PublicationBus>) -> Self {
        Self { api, bus }
    }

    /// 포지션 스냅샷을 새로 조회해 발행합니다.
    ///
    /// 조회 실패 시 직전 발행값을 유지합니다. 오래된 데이터가
    /// 빈 데이터보다 낫습니다.
    pub async fn refresh(&self) {
        match self.api.account_positions().await {
            Ok(positions) => {
                let open: Vec<_> = positions.into_iter().filter(|p| !p.is_flat()).collect();
                debug!(count = open.len(), "Position snapshot refreshed");
                self.bus.publish_positions(open);
            }
            Err(e) => {
                warn!(error = %e, "Position refresh failed, keeping previous snapshot");
            }
        }
    }

    /// 계좌 이벤트를 소비해 재동기화를 유발하는 루프를 시작합니다.
    ///
    /// 이벤트마다 분리된 태스크로 refresh를 실행합니다. 스트림 소비가
    /// REST 왕복을 기다리지 않고, 발행은 마지막 완료가 이깁니다.
    pub fn spawn_trigger_loop(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<AccountEvent>,
    ) -> JoinHandle<()> {
        let synchronizer = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(?event, "Account event received, scheduling position refresh");
                let synchronizer = Arc::clone(&synchronizer);
                tokio::spawn(async move {
                    synchronizer.refresh().await;
                });
            }
        })
    }
}
