//! 时间源

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// 时钟接口，便于测试时注入固定时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn since(&self, t: DateTime<Utc>) -> Duration {
        self.now() - t
    }

    fn until(&self, t: DateTime<Utc>) -> Duration {
        t - self.now()
    }
}

/// 系统 UTC 时钟
///
/// 精度截断到微秒，与数据库时间戳精度一致
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// 固定时钟
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_microsecond_precise() {
        let now = SystemClock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_fixed_clock_offsets() {
        let now = Utc::now();
        let clock = FixedClock(now);
        assert_eq!(clock.since(now - Duration::seconds(5)), Duration::seconds(5));
        assert_eq!(clock.until(now + Duration::seconds(7)), Duration::seconds(7));
    }
}
