//! # Terminal Core
//!
//! 선물 터미널의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 터미널 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들스틱 시장 데이터 구조체
//! - 포지션 추적
//! - 주문 요청 타입
//! - 심볼 필터 (수량/가격 단위 제약)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use logging::*;
pub use types::*;
