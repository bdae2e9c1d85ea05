//! 선물 터미널의 도메인 모델.

pub mod filters;
pub mod market_data;
pub mod order;
pub mod position;

pub use filters::*;
pub use market_data::*;
pub use order::*;
pub use position::*;
