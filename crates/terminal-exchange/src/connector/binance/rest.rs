//! 바이낸스 USD-M 선물 REST 클라이언트.
//!
//! 공개/키 인증/서명 요청 헬퍼와 `FuturesApi` 구현.
//! 서명 요청은 쿼리 문자열에 HMAC-SHA256 서명을 붙이고
//! `X-MBX-APIKEY` 헤더로 키를 전달합니다.

use crate::connector::binance::config::BinanceFuturesConfig;
use crate::connector::binance::models::{
    AccountResponse, BinanceErrorBody, ExchangeInfo, IgnoredResponse, ListenKeyResponse,
    OrderResponse, PriceTicker, RestKline,
};
use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::FuturesApi;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use terminal_core::{Candle, OrderRequest, OrderType, Position, SymbolFilters, Timeframe};
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;

/// 바이낸스 선물 REST 클라이언트.
pub struct BinanceFuturesClient {
    config: BinanceFuturesConfig,
    client: Client,
}

impl BinanceFuturesClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceFuturesConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 환경 변수에서 생성.
    pub fn from_env() -> Option<Self> {
        BinanceFuturesConfig::from_env().and_then(|config| Self::new(config).ok())
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &BinanceFuturesConfig {
        &self.config
    }

    /// 현재 타임스탬프(밀리초) 반환.
    fn timestamp_ms() -> ExchangeResult<u64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| ExchangeError::TimestampError(e.to_string()))
    }

    /// HMAC-SHA256으로 쿼리 문자열 서명.
    fn sign(&self, query: &str) -> ExchangeResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Unauthorized(format!("Invalid API secret: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let query = Self::build_query(params);

        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", endpoint);

        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// API 키 헤더만 필요한 요청 (리슨 키 엔드포인트).
    async fn keyed_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);

        debug!("{} (keyed) {}", method, endpoint);

        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// 서명된 GET 요청.
    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let full_url = self.signed_url(endpoint, params)?;

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&full_url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// 서명된 POST 요청.
    async fn signed_post<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let body = self.signed_query(params)?;

        debug!("POST (signed) {}", endpoint);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// 서명된 DELETE 요청.
    async fn signed_delete<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let full_url = self.signed_url(endpoint, params)?;

        debug!("DELETE (signed) {}", endpoint);

        let response = self
            .client
            .delete(&full_url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// timestamp/recvWindow/signature가 붙은 쿼리 문자열을 만듭니다.
    fn signed_query(&self, params: &[(&str, String)]) -> ExchangeResult<String> {
        let mut all_params = params.to_vec();
        let timestamp = Self::timestamp_ms()?.to_string();
        let recv_window = self.config.recv_window.to_string();
        all_params.push(("timestamp", timestamp));
        all_params.push(("recvWindow", recv_window));

        let query = Self::build_query(&all_params);
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    /// 서명된 전체 URL을 만듭니다.
    fn signed_url(&self, endpoint: &str, params: &[(&str, String)]) -> ExchangeResult<String> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let query = self.signed_query(params)?;
        Ok(format!("{}?{}", url, query))
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })
        } else {
            // 에러 응답 파싱 시도
            if let Ok(error) = serde_json::from_str::<BinanceErrorBody>(&body) {
                Err(Self::map_error_code(error.code, &error.msg))
            } else {
                Err(ExchangeError::ApiError {
                    code: status.as_u16() as i32,
                    message: body,
                })
            }
        }
    }

    /// 바이낸스 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i32, msg: &str) -> ExchangeError {
        match code {
            -1000 => ExchangeError::Unknown(msg.to_string()),
            -1001 => ExchangeError::Disconnected(msg.to_string()),
            -1002 | -2014 | -2015 => ExchangeError::Unauthorized(msg.to_string()),
            -1003 => ExchangeError::RateLimited,
            -1013 | -1111 | -4003 => ExchangeError::InvalidParameter(msg.to_string()),
            -1021 => ExchangeError::TimestampError(msg.to_string()),
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            -2010 => ExchangeError::InsufficientBalance(msg.to_string()),
            -2011 | -2013 => ExchangeError::OrderNotFound(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }
}

#[async_trait]
impl FuturesApi for BinanceFuturesClient {
    async fn start_user_stream(&self) -> ExchangeResult<String> {
        let resp: ListenKeyResponse = self
            .keyed_request(Method::POST, "/fapi/v1/listenKey")
            .await?;
        Ok(resp.listen_key)
    }

    async fn keepalive_user_stream(&self) -> ExchangeResult<()> {
        let _: IgnoredResponse = self.keyed_request(Method::PUT, "/fapi/v1/listenKey").await?;
        Ok(())
    }

    async fn ticker_price(&self, symbol: &str) -> ExchangeResult<Decimal> {
        let resp: PriceTicker = self
            .public_get("/fapi/v1/ticker/price", &[("symbol", symbol.to_string())])
            .await?;
        resp.price
            .parse()
            .map_err(|_| ExchangeError::ParseError(format!("Invalid price: {}", resp.price)))
    }

    async fn symbol_filters(&self, symbol: &str) -> ExchangeResult<SymbolFilters> {
        let info: ExchangeInfo = self
            .public_get("/fapi/v1/exchangeInfo", &[("symbol", symbol.to_string())])
            .await?;

        info.symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| ExchangeError::SymbolNotFound(symbol.to_string()))?
            .to_symbol_filters()
    }

    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> ExchangeResult<Vec<Candle>> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", timeframe.to_binance_interval().to_string()),
        ];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let resp: Vec<RestKline> = self.public_get("/fapi/v1/klines", &params).await?;
        Ok(resp
            .iter()
            .map(|k| k.to_candle(symbol, timeframe))
            .collect())
    }

    async fn account_positions(&self) -> ExchangeResult<Vec<Position>> {
        let resp: AccountResponse = self.signed_get("/fapi/v2/account", &[]).await?;
        Ok(resp.positions.iter().map(|p| p.to_position()).collect())
    }

    async fn change_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        let _: IgnoredResponse = self
            .signed_post(
                "/fapi/v1/leverage",
                &[
                    ("symbol", symbol.to_string()),
                    ("leverage", leverage.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn change_position_mode(&self, dual_side: bool) -> ExchangeResult<()> {
        let _: IgnoredResponse = self
            .signed_post(
                "/fapi/v1/positionSide/dual",
                &[("dualSidePosition", dual_side.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn submit_order(&self, request: &OrderRequest) -> ExchangeResult<String> {
        let mut params = vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.to_string()),
            ("type", request.order_type.to_string()),
            ("quantity", request.quantity.clone()),
            ("positionSide", request.position_side.to_string()),
        ];

        if request.order_type == OrderType::Limit {
            if let Some(price) = &request.price {
                params.push(("price", price.clone()));
            }
            if let Some(tif) = &request.time_in_force {
                params.push(("timeInForce", tif.to_string()));
            }
        }

        if let Some(client_id) = &request.client_order_id {
            params.push(("newClientOrderId", client_id.clone()));
        }

        let resp: OrderResponse = self.signed_post("/fapi/v1/order", &params).await?;
        Ok(resp.order_id.to_string())
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<()> {
        let _: IgnoredResponse = self
            .signed_delete(
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client_for(server: &mockito::ServerGuard) -> BinanceFuturesClient {
        let config =
            BinanceFuturesConfig::new("test-key".into(), "test-secret".into()).with_rest_url(server.url());
        BinanceFuturesClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_start_user_stream() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/fapi/v1/listenKey")
            .match_header("X-MBX-APIKEY", "test-key")
            .with_body(r#"{"listenKey": "abc123"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let key = client.start_user_stream().await.unwrap();

        assert_eq!(key, "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ticker_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fapi/v1/ticker/price?symbol=BTCUSDT")
            .with_body(r#"{"symbol": "BTCUSDT", "price": "50123.45"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let price = client.ticker_price("BTCUSDT").await.unwrap();

        assert_eq!(price, dec!(50123.45));
    }

    #[tokio::test]
    async fn test_account_positions_signed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/fapi/v2/account\?.*signature=[0-9a-f]{64}.*$".to_string()))
            .match_header("X-MBX-APIKEY", "test-key")
            .with_body(
                r#"{"positions": [
                    {"symbol": "BTCUSDT", "positionAmt": "0.5", "entryPrice": "50000",
                     "unrealizedProfit": "100", "leverage": "10", "positionSide": "BOTH"},
                    {"symbol": "ETHUSDT", "positionAmt": "0", "entryPrice": "0",
                     "unrealizedProfit": "0", "leverage": "20", "positionSide": "BOTH"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let positions = client.account_positions().await.unwrap();

        // REST 계층은 수량 0 포지션도 그대로 반환한다 (필터링은 동기화기 몫)
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].amount, dec!(0.5));
    }

    #[tokio::test]
    async fn test_error_code_mapping() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fapi/v1/listenKey")
            .with_status(401)
            .with_body(r#"{"code": -2015, "msg": "Invalid API-key"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.start_user_stream().await.unwrap_err();

        assert!(matches!(err, ExchangeError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_mapping() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fapi/v1/ticker/price?symbol=BTCUSDT")
            .with_status(429)
            .with_body(r#"{"code": -1003, "msg": "Too many requests"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.ticker_price("BTCUSDT").await.unwrap_err();

        assert!(matches!(err, ExchangeError::RateLimited));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_error_codes() {
        assert!(matches!(
            BinanceFuturesClient::map_error_code(-1121, "Invalid symbol"),
            ExchangeError::SymbolNotFound(_)
        ));
        assert!(matches!(
            BinanceFuturesClient::map_error_code(-1013, "Invalid quantity"),
            ExchangeError::InvalidParameter(_)
        ));
        assert!(matches!(
            BinanceFuturesClient::map_error_code(-9999, "?"),
            ExchangeError::ApiError { code: -9999, .. }
        ));
    }
}
