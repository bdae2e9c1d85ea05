//! 재연결 백오프 정책.
//!
//! 순수 계산만 하는 타입입니다. 타이머 없이 스케줄을 검증할 수 있도록
//! 지연 계산과 시도 횟수 판단을 분리했습니다.

use std::time::Duration;

/// 지수 백오프 재연결 정책.
///
/// `attempt`번째 실패 후 지연은 `min(base * 2^attempt, cap)`입니다.
/// `max_attempts`회 연속 실패하면 재연결을 포기합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// 첫 실패 후 기본 지연
    pub base: Duration,
    /// 지연 상한
    pub cap: Duration,
    /// 최대 연속 실패 횟수
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            cap: Duration::from_millis(60000),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// 새 정책을 생성합니다.
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
        }
    }

    /// `attempt`번째 실패(0부터 시작) 후 대기할 지연을 반환합니다.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay_ms = self
            .base
            .as_millis()
            .saturating_mul(multiplier as u128)
            .min(self.cap.as_millis());
        Duration::from_millis(delay_ms as u64)
    }

    /// 연속 실패 횟수가 한도에 도달했는지 확인합니다.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_schedule() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_saturates_at_cap() {
        let policy = ReconnectPolicy::default();
        // 2^6 = 64초 > 60초 상한
        assert_eq!(policy.delay_for(6), Duration::from_millis(60000));
        assert_eq!(policy.delay_for(20), Duration::from_millis(60000));
        assert_eq!(policy.delay_for(63), Duration::from_millis(60000));
        // 시프트 오버플로우 구간에서도 상한 유지
        assert_eq!(policy.delay_for(64), Duration::from_millis(60000));
    }

    #[test]
    fn test_exhaustion() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.is_exhausted(9));
        assert!(policy.is_exhausted(10));
        assert!(policy.is_exhausted(11));
    }
}
