//! Connection Configuration
//!
//! 연결 하나에 적용되는 프레이밍/스트리밍 설정

use std::collections::HashMap;

use super::error::{DriverError, DriverResult};
use crate::bolt::codec::{DEFAULT_MAX_MESSAGE_SIZE, MAX_CHUNK_SIZE};
use crate::bolt::handshake::Handshake;
use crate::bolt::{AuthToken, Value, FETCH_ALL};

/// 기본 fetch size
pub const DEFAULT_FETCH_SIZE: i64 = 1000;

// ============================================================================
// ConnectionConfig - 연결 설정
// ============================================================================

/// 연결 설정
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// HELLO에 실리는 User Agent
    pub user_agent: String,
    /// 인증 토큰
    pub auth: AuthToken,
    /// 라우팅 컨텍스트
    pub routing: Option<HashMap<String, Value>>,
    /// 핸드셰이크 버전 제안
    pub handshake: Handshake,
    /// 청크 최대 크기 (1..=65535)
    pub max_chunk_size: usize,
    /// 수신 메시지 최대 크기
    pub max_message_size: usize,
    /// PULL 한 번에 요청할 레코드 수 (-1 = 전체)
    pub fetch_size: i64,
}

impl ConnectionConfig {
    /// 빌더 시작
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: Self::default(),
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> DriverResult<()> {
        if self.max_chunk_size == 0 || self.max_chunk_size > MAX_CHUNK_SIZE {
            return Err(DriverError::configuration(format!(
                "max_chunk_size must be in 1..={}, got {}",
                MAX_CHUNK_SIZE, self.max_chunk_size
            )));
        }
        if self.max_message_size == 0 {
            return Err(DriverError::configuration("max_message_size must be positive"));
        }
        if self.fetch_size == 0 || self.fetch_size < FETCH_ALL {
            return Err(DriverError::configuration(format!(
                "fetch_size must be positive or -1, got {}",
                self.fetch_size
            )));
        }
        if self.user_agent.is_empty() {
            return Err(DriverError::configuration("user_agent must not be empty"));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("Zeta4G/{}", env!("CARGO_PKG_VERSION")),
            auth: AuthToken::none(),
            routing: None,
            handshake: Handshake::new(),
            max_chunk_size: MAX_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            fetch_size: DEFAULT_FETCH_SIZE,
        }
    }
}

// ============================================================================
// ConnectionConfigBuilder - 설정 빌더
// ============================================================================

/// 연결 설정 빌더
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// User Agent 설정
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 인증 토큰 설정
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.config.auth = auth;
        self
    }

    /// 라우팅 컨텍스트 설정
    pub fn with_routing(mut self, routing: HashMap<String, Value>) -> Self {
        self.config.routing = Some(routing);
        self
    }

    /// 핸드셰이크 버전 제안 설정
    pub fn with_handshake(mut self, handshake: Handshake) -> Self {
        self.config.handshake = handshake;
        self
    }

    /// 청크 최대 크기 설정
    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// 수신 메시지 최대 크기 설정
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Fetch Size 설정
    pub fn with_fetch_size(mut self, size: i64) -> Self {
        self.config.fetch_size = size;
        self
    }

    /// 검증 후 빌드
    pub fn build(self) -> DriverResult<ConnectionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================
