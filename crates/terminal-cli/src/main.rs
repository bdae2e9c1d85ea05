//! 선물 터미널 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # BTCUSDT 1분봉 실시간 스트림 관찰
//! terminal stream -s BTCUSDT -i 1m
//!
//! # 100 USD 시장가 매수
//! terminal market -s BTCUSDT --side BUY -u 100
//!
//! # 지정가 매도 주문
//! terminal limit -s BTCUSDT --side SELL -u 100 -p 65000
//!
//! # 포지션 청산
//! terminal close -s BTCUSDT
//!
//! # 레버리지 10배 설정
//! terminal leverage -s BTCUSDT -l 10
//!
//! # 인자 생략 시 config/default.toml의 terminal 섹션 기본값 사용
//! terminal stream
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use terminal_core::{
    init_logging, AppConfig, LogConfig, PositionSide, Side, TerminalConfig, TimeInForce, Timeframe,
};

mod commands;

use commands::session::TerminalSession;

#[derive(Parser)]
#[command(name = "terminal")]
#[command(about = "Futures trading terminal - 바이낸스 USD-M 선물 연결 계층", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 실시간 캔들/포지션/상태 스트림 관찰
    Stream {
        /// 거래 심볼 (예: BTCUSDT). 생략하면 설정 파일의 기본 심볼
        #[arg(short, long)]
        symbol: Option<String>,

        /// 캔들 주기 (1m, 5m, 15m, 1h, 4h, 1d 등). 생략하면 설정 파일의 기본 간격
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// USD 금액 시장가 주문
    Market {
        /// 거래 심볼
        #[arg(short, long)]
        symbol: String,

        /// 주문 방향 (BUY, SELL)
        #[arg(long)]
        side: String,

        /// 주문 금액 (USD)
        #[arg(short, long)]
        usd: Decimal,

        /// 포지션 방향 (BOTH, LONG, SHORT)
        #[arg(long, default_value = "BOTH")]
        position_side: String,
    },

    /// USD 금액 지정가 주문
    Limit {
        /// 거래 심볼
        #[arg(short, long)]
        symbol: String,

        /// 주문 방향 (BUY, SELL)
        #[arg(long)]
        side: String,

        /// 주문 금액 (USD)
        #[arg(short, long)]
        usd: Decimal,

        /// 지정가
        #[arg(short, long)]
        price: Decimal,

        /// 포지션 방향 (BOTH, LONG, SHORT)
        #[arg(long, default_value = "BOTH")]
        position_side: String,

        /// 주문 유효 기간 (GTC, IOC, FOK)
        #[arg(long, default_value = "GTC")]
        time_in_force: String,
    },

    /// 포지션 시장가 청산
    Close {
        /// 거래 심볼
        #[arg(short, long)]
        symbol: String,

        /// 포지션 방향 (BOTH, LONG, SHORT)
        #[arg(long, default_value = "BOTH")]
        position_side: String,
    },

    /// 미체결 주문 취소
    Cancel {
        /// 거래 심볼
        #[arg(short, long)]
        symbol: String,

        /// 거래소 주문 ID
        #[arg(short, long)]
        order_id: String,
    },

    /// 레버리지 변경 (1~125)
    Leverage {
        /// 거래 심볼. 생략하면 설정 파일의 기본 심볼
        #[arg(short, long)]
        symbol: Option<String>,

        /// 레버리지 배수. 생략하면 설정 파일의 기본 레버리지
        #[arg(short, long)]
        leverage: Option<u32>,
    },

    /// 헤지 모드 설정 (on: 양방향, off: 단방향)
    Hedge {
        /// on 또는 off
        mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env는 없어도 된다. RUST_LOG와 TERMINAL__ 오버라이드가 들어올 수 있으므로
    // 설정 로드보다 먼저 읽는다.
    let _ = dotenvy::dotenv();
    let app_config = AppConfig::load_default()
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    let log_config = LogConfig::new(app_config.logging.level.clone())
        .with_format(app_config.logging.format.parse().unwrap_or_default());
    init_logging(log_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let cli = Cli::parse();
    let session = TerminalSession::from_env(&app_config.exchange)?;
    let defaults = &app_config.terminal;

    match cli.command {
        Commands::Stream { symbol, interval } => {
            let symbol = effective_symbol(symbol, defaults);
            let timeframe = effective_timeframe(interval, defaults)?;
            commands::stream::run_stream(&session, &symbol, timeframe).await?;
        }

        Commands::Market {
            symbol,
            side,
            usd,
            position_side,
        } => {
            let side = parse_side(&side)?;
            let position_side = parse_position_side(&position_side)?;
            commands::order::market_order(&session, &symbol, side, usd, position_side).await?;
        }

        Commands::Limit {
            symbol,
            side,
            usd,
            price,
            position_side,
            time_in_force,
        } => {
            let side = parse_side(&side)?;
            let position_side = parse_position_side(&position_side)?;
            let time_in_force = time_in_force
                .parse::<TimeInForce>()
                .map_err(|e| anyhow!(e))?;
            commands::order::limit_order(
                &session,
                &symbol,
                side,
                usd,
                price,
                position_side,
                time_in_force,
            )
            .await?;
        }

        Commands::Close {
            symbol,
            position_side,
        } => {
            let position_side = parse_position_side(&position_side)?;
            commands::order::close_position(&session, &symbol, position_side).await?;
        }

        Commands::Cancel { symbol, order_id } => {
            commands::order::cancel_order(&session, &symbol, &order_id).await?;
        }

        Commands::Leverage { symbol, leverage } => {
            let symbol = effective_symbol(symbol, defaults);
            let leverage = effective_leverage(leverage, defaults);
            commands::order::set_leverage(&session, &symbol, leverage).await?;
        }

        Commands::Hedge { mode } => {
            let enabled = match mode.to_lowercase().as_str() {
                "on" => true,
                "off" => false,
                other => return Err(anyhow!("Invalid hedge mode: {}. Use: on, off", other)),
            };
            commands::order::set_hedge_mode(&session, enabled).await?;
        }
    }

    Ok(())
}

/// 인자가 없으면 설정 파일의 기본 심볼을 사용합니다.
fn effective_symbol(arg: Option<String>, defaults: &TerminalConfig) -> String {
    arg.unwrap_or_else(|| defaults.default_symbol.clone())
}

/// 인자가 없으면 설정 파일의 기본 캔들 간격을 사용합니다.
fn effective_timeframe(arg: Option<String>, defaults: &TerminalConfig) -> Result<Timeframe> {
    let raw = arg.unwrap_or_else(|| defaults.default_interval.clone());
    raw.parse::<Timeframe>().map_err(|e| anyhow!(e))
}

/// 인자가 없으면 설정 파일의 기본 레버리지를 사용합니다.
fn effective_leverage(arg: Option<u32>, defaults: &TerminalConfig) -> u32 {
    arg.unwrap_or(defaults.default_leverage)
}

fn parse_side(s: &str) -> Result<Side> {
    s.parse::<Side>().map_err(|e| anyhow!(e))
}

fn parse_position_side(s: &str) -> Result<PositionSide> {
    s.parse::<PositionSide>().map_err(|e| anyhow!(e))
}
