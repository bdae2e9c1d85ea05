//! WebSocket 스트림 라우터.
//!
//! 하나의 소켓으로 캔들 스트림과 사용자 데이터 스트림을 함께 구독하고,
//! 수신 메시지를 JSON 형태로 판별해 캔들 채널과 계좌 이벤트 채널로
//! 분배합니다.
//!
//! - 캔들 이벤트는 마감 플래그(`k.x`)가 참일 때만 전달합니다.
//! - 계좌 이벤트는 `ACCOUNT_UPDATE`/`ORDER_TRADE_UPDATE`만 전달합니다.
//! - 잘못된 JSON은 기록 후 버립니다. 연결 에러로 승격하지 않습니다.

use crate::connector::binance::models::WsKlineEvent;
use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::{AccountEvent, StreamHandles};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use terminal_core::{Candle, Timeframe};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

/// 구독 메시지.
#[derive(Debug, Serialize)]
struct SubscribeMessage {
    method: String,
    params: Vec<String>,
    id: u64,
}

/// 수신 메시지 분류 결과.
#[derive(Debug)]
pub(crate) enum Routed {
    /// 마감된 캔들
    Candle(Candle),
    /// 포지션 재동기화를 유발하는 계좌 이벤트
    Account(AccountEvent),
    /// 무시 (진행 중 캔들, 구독 응답, 관심 없는 이벤트, 잘못된 JSON)
    Ignored,
}

/// 다중화 WebSocket 스트림 라우터.
pub struct StreamRouter {
    ws_url: String,
}

impl StreamRouter {
    /// 새 라우터를 생성합니다.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    /// 캔들 스트림 이름을 반환합니다.
    pub fn kline_stream_name(symbol: &str, timeframe: Timeframe) -> String {
        format!(
            "{}@kline_{}",
            symbol.to_lowercase(),
            timeframe.to_binance_interval()
        )
    }

    /// 사용자 데이터 스트림 이름을 반환합니다.
    pub fn user_stream_name(listen_key: &str) -> String {
        format!("userData@{}", listen_key)
    }

    /// 소켓을 열고 두 논리 스트림을 구독한 뒤 수신 루프를 시작합니다.
    ///
    /// 소켓 에러나 서버 종료는 `failure` 핸들로 한 번 통지됩니다.
    /// 종료 신호에 의한 정상 종료는 통지 없이 핸들을 닫습니다.
    pub async fn open(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        listen_key: &str,
        mut shutdown: watch::Receiver<bool>,
    ) -> ExchangeResult<StreamHandles> {
        info!("Connecting to WebSocket: {}", self.ws_url);

        let (ws, _) = connect_async(&self.ws_url)
            .await
            .map_err(|e| ExchangeError::WebSocket(e.to_string()))?;

        let (mut write, mut read) = ws.split();

        // 두 논리 스트림을 한 구독 프레임으로 등록
        let streams = vec![
            Self::kline_stream_name(symbol, timeframe),
            Self::user_stream_name(listen_key),
        ];
        let subscribe = SubscribeMessage {
            method: "SUBSCRIBE".to_string(),
            params: streams.clone(),
            id: 1,
        };
        let json = serde_json::to_string(&subscribe)?;
        write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ExchangeError::WebSocket(e.to_string()))?;

        info!(?streams, "Subscribed to streams");

        let (candle_tx, candle_rx) = mpsc::channel(1000);
        let (account_tx, account_rx) = mpsc::channel(1000);
        let (failure_tx, failure_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut failure_tx = Some(failure_tx);

            loop {
                tokio::select! {
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => match Self::classify(&text) {
                            Routed::Candle(candle) => {
                                if candle_tx.send(candle).await.is_err() {
                                    debug!("Candle receiver dropped, stopping read loop");
                                    break;
                                }
                            }
                            Routed::Account(event) => {
                                if account_tx.send(event).await.is_err() {
                                    debug!("Account receiver dropped, stopping read loop");
                                    break;
                                }
                            }
                            Routed::Ignored => {}
                        },
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, answering with pong");
                            if write.send(Message::Pong(data)).await.is_err() {
                                if let Some(tx) = failure_tx.take() {
                                    let _ = tx.send(ExchangeError::WebSocket(
                                        "Failed to send pong".to_string(),
                                    ));
                                }
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("WebSocket closed by server");
                            if let Some(tx) = failure_tx.take() {
                                let _ = tx.send(ExchangeError::WebSocket(
                                    "Connection closed by server".to_string(),
                                ));
                            }
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            if let Some(tx) = failure_tx.take() {
                                let _ = tx.send(ExchangeError::WebSocket(e.to_string()));
                            }
                            break;
                        }
                        _ => {}
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Shutdown signal received, closing WebSocket");
                            let _ = write.send(Message::Close(None)).await;
                            // 정상 종료는 실패 통지 없이 핸들만 닫는다
                            break;
                        }
                    }
                }
            }
        });

        Ok(StreamHandles {
            candles: candle_rx,
            account_events: account_rx,
            failure: failure_rx,
        })
    }

    /// 수신 텍스트 메시지를 분류합니다.
    pub(crate) fn classify(text: &str) -> Routed {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Malformed stream message dropped");
                return Routed::Ignored;
            }
        };

        // 구독 응답 등 이벤트 타입 없는 메시지
        let Some(event_type) = value.get("e").and_then(|v| v.as_str()) else {
            return Routed::Ignored;
        };

        match event_type {
            "kline" => match serde_json::from_value::<WsKlineEvent>(value) {
                Ok(event) if event.kline.is_closed => Routed::Candle(event.to_candle()),
                Ok(_) => Routed::Ignored, // 진행 중 캔들
                Err(e) => {
                    warn!(error = %e, "Malformed kline event dropped");
                    Routed::Ignored
                }
            },
            "ACCOUNT_UPDATE" => Routed::Account(AccountEvent::AccountUpdate),
            "ORDER_TRADE_UPDATE" => Routed::Account(AccountEvent::OrderTradeUpdate),
            other => {
                debug!(event_type = other, "Uninteresting stream event dropped");
                Routed::Ignored
            }
        }
    }
}
