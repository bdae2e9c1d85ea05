//! CLI 명령어 구현 모듈.

pub mod order;
pub mod session;
pub mod stream;
