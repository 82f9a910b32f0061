//! 시간 관련 값
//!
//! chrono로 정확히 표현할 수 있는 값(Date, LocalTime, DateTime,
//! LocalDateTime)은 chrono 타입을 그대로 쓰고, 여기에는 chrono에 대응
//! 타입이 없는 것만 정의합니다.

use std::fmt;

use chrono::{FixedOffset, NaiveTime};
use serde::Serialize;

/// 오프셋이 있는 시각 (`Time` 구조체)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OffsetTime {
    /// 로컬 시각
    pub time: NaiveTime,
    /// UTC 기준 오프셋 (초)
    pub offset_seconds: i32,
}

impl OffsetTime {
    /// 새 OffsetTime 생성
    pub fn new(time: NaiveTime, offset_seconds: i32) -> Self {
        Self { time, offset_seconds }
    }

    /// chrono 오프셋으로 변환. 범위를 벗어나면 `None`.
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.offset_seconds)
    }
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset() {
            Some(offset) => write!(f, "{}{}", self.time, offset),
            None => write!(f, "{}[{}s]", self.time, self.offset_seconds),
        }
    }
}

/// 타임존 ID가 붙은 날짜-시각 (`DateTimeZoneId` 구조체)
///
/// `seconds`는 와이어에 실린 값 그대로입니다. UTC 포맷(Bolt 5.0 이상 또는
/// `utc` 패치)에서는 UTC 기준 epoch 초, 레거시 포맷에서는 해당 존의
/// 로컬 벽시계 epoch 초입니다. 존 오프셋 해석에는 타임존 DB가 필요하므로
/// 호출자에게 맡깁니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZonedDateTime {
    /// epoch 초
    pub seconds: i64,
    /// 나노초
    pub nanoseconds: i64,
    /// IANA 타임존 ID
    pub zone_id: String,
}

impl ZonedDateTime {
    /// 새 ZonedDateTime 생성
    pub fn new(seconds: i64, nanoseconds: i64, zone_id: impl Into<String>) -> Self {
        Self {
            seconds,
            nanoseconds,
            zone_id: zone_id.into(),
        }
    }
}

impl fmt::Display for ZonedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}[{}]", self.seconds, self.nanoseconds, self.zone_id)
    }
}

// ============================================================================
// Duration - 시간 간격
// ============================================================================

/// 시간 간격
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Duration {
    /// 개월
    pub months: i64,
    /// 일
    pub days: i64,
    /// 초
    pub seconds: i64,
    /// 나노초
    pub nanoseconds: i64,
}

impl Duration {
    /// 새 Duration 생성
    pub fn new(months: i64, days: i64, seconds: i64, nanoseconds: i64) -> Self {
        Self {
            months,
            days,
            seconds,
            nanoseconds,
        }
    }

    /// 초에서 생성
    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(0, 0, seconds, 0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{}M{}DT{}.{:09}S",
            self.months, self.days, self.seconds, self.nanoseconds
        )
    }
}
