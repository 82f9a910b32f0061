//! Driver Error Types
//!
//! 엔진 레벨 에러 정의. 하나의 치명적 에러가 대기 중인 모든 핸들러에 전달되므로
//! `DriverError`는 `Clone`입니다.

use std::sync::Arc;

use thiserror::Error;

use crate::bolt::{BoltError, FailureMessage};

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// 서버가 FAILURE로 응답
    #[error("Server error: {code} - {message}")]
    Server {
        /// 에러 코드 (Neo.{Classification}.{Category}.{Title})
        code: String,
        /// 에러 메시지
        message: String,
    },

    /// 아웃바운드 메시지 인코딩 실패 (연결은 계속 사용 가능)
    #[error("{0}")]
    Encode(Arc<BoltError>),

    /// 채널 레벨 실패 (디코딩, 프레이밍, I/O). 연결을 닫아야 함
    #[error("Channel error: {0}")]
    Channel(Arc<BoltError>),

    /// 프로토콜 계약 위반
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// 프로토콜 에러 (메타데이터 형식 오류 등)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 이전 실패로 인해 서버가 요청을 무시함
    #[error("Request ignored: {0}")]
    Ignored(String),

    /// 잘못된 요청 수량
    #[error("Invalid demand: {0}. Expecting a positive number or -1 for all records")]
    InvalidDemand(i64),

    /// RESET 전에는 새 요청 불가
    #[error("Connection requires RESET after a previous failure")]
    ResetRequired,

    /// 연결 종료
    #[error("Connection terminated: {0}")]
    ConnectionTerminated(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DriverError {
    /// 서버 에러 생성
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 프로토콜 위반 에러 생성
    pub fn protocol_violation(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 무시됨 에러 생성
    pub fn ignored(msg: impl Into<String>) -> Self {
        Self::Ignored(msg.into())
    }

    /// 연결 종료 에러 생성
    pub fn connection_terminated(msg: impl Into<String>) -> Self {
        Self::ConnectionTerminated(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 서버 에러 코드
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Channel(_) | Self::ConnectionTerminated(_) => true,
            Self::Server { code, .. } => is_retryable_code(code),
            _ => false,
        }
    }

    /// 연결을 더 이상 사용할 수 없는 에러인지 여부
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Channel(_) | Self::ProtocolViolation(_) | Self::ConnectionTerminated(_)
        )
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Server { code, .. } => classification(code) == "ClientError",
            Self::Encode(_) | Self::InvalidDemand(_) | Self::Configuration(_) => true,
            _ => false,
        }
    }
}

/// 에러 코드 분류 (Neo.{Classification}.{Category}.{Title})
fn classification(code: &str) -> &str {
    code.split('.').nth(1).unwrap_or("Unknown")
}

/// 재시도 가능한 에러 코드 확인
fn is_retryable_code(code: &str) -> bool {
    classification(code) == "TransientError"
        || code == "Neo.ClientError.Cluster.NotALeader"
        || code == "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase"
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        if err.is_local() {
            DriverError::Encode(Arc::new(err))
        } else {
            DriverError::Channel(Arc::new(err))
        }
    }
}

impl From<FailureMessage> for DriverError {
    fn from(failure: FailureMessage) -> Self {
        DriverError::Server {
            code: failure.code,
            message: failure.message,
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
