//! Inbound Message Dispatcher
//!
//! 연결 하나의 응답 핸들러 FIFO 큐. 디코딩된 서버 응답을 요청 제출 순서대로
//! 핸들러에 연결합니다.
//!
//! - SUCCESS: 선두 핸들러를 꺼내 `on_success`
//! - FAILURE: 선두 핸들러를 꺼내 `on_failure`, 이후 RESET 필요 상태
//! - RECORD: 선두 핸들러를 유지한 채 `on_record`
//! - IGNORED: 선두 핸들러를 꺼내 직전 FAILURE 에러로 `on_failure`
//!
//! 치명적 에러가 발생하면 대기 중인 모든 핸들러가 같은 에러로 실패하고
//! 이후 응답은 버려집니다. 치명 상태는 해제되지 않습니다.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, error, warn};

use super::error::{DriverError, DriverResult};
use crate::bolt::{BoltMessage, BoltResponse, Value};

/// SUCCESS 메타데이터
pub type Metadata = HashMap<String, Value>;

// ============================================================================
// ResponseHandler - 응답 핸들러
// ============================================================================

/// 요청 하나에 대한 서버 응답 콜백
///
/// 연결의 실행 컨텍스트 안에서 순서대로 호출되므로 블로킹 I/O를 하면 안 됩니다.
pub trait ResponseHandler: Send {
    /// SUCCESS 수신
    fn on_success(&mut self, metadata: Metadata);

    /// FAILURE, IGNORED 또는 치명적 에러
    fn on_failure(&mut self, error: DriverError);

    /// RECORD 수신. 에러를 돌려주면 연결 전체가 치명 상태가 됩니다
    fn on_record(&mut self, fields: Vec<Value>) -> DriverResult<()>;
}

struct QueuedHandler {
    handler: Box<dyn ResponseHandler>,
    is_reset: bool,
}

// ============================================================================
// InboundMessageDispatcher
// ============================================================================

/// 응답 디스패처
#[derive(Default)]
pub struct InboundMessageDispatcher {
    handlers: VecDeque<QueuedHandler>,
    current_error: Option<DriverError>,
    fatal_error: Option<DriverError>,
    needs_reset: bool,
}

impl InboundMessageDispatcher {
    /// 빈 디스패처 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 핸들러를 큐 끝에 추가. 치명 상태면 즉시 실패시킵니다
    pub fn enqueue(&mut self, handler: Box<dyn ResponseHandler>) {
        self.push(handler, false);
    }

    /// RESET 요청의 핸들러 추가. 이 핸들러의 SUCCESS가 RESET 필요 상태를 해제합니다
    pub fn enqueue_reset(&mut self, handler: Box<dyn ResponseHandler>) {
        self.push(handler, true);
    }

    fn push(&mut self, mut handler: Box<dyn ResponseHandler>, is_reset: bool) {
        if let Some(fatal) = &self.fatal_error {
            handler.on_failure(fatal.clone());
            return;
        }
        self.handlers.push_back(QueuedHandler { handler, is_reset });
    }

    /// 디코딩된 메시지 하나를 처리
    pub fn dispatch(&mut self, message: BoltMessage) {
        if self.fatal_error.is_some() {
            warn!("dropping {} received after fatal error", message.name());
            return;
        }

        let response = match message {
            BoltMessage::Response(response) => response,
            BoltMessage::Request(request) => {
                self.handle_fatal_error(DriverError::protocol_violation(format!(
                    "Unexpected request message {} received from server",
                    request.name()
                )));
                return;
            }
        };

        match response {
            BoltResponse::Success(success) => {
                let Some(mut entry) = self.pop_head("SUCCESS") else {
                    return;
                };
                if entry.is_reset {
                    debug!("RESET acknowledged, clearing failure state");
                    self.needs_reset = false;
                    self.current_error = None;
                }
                entry.handler.on_success(success.metadata);
            }
            BoltResponse::Failure(failure) => {
                let Some(mut entry) = self.pop_head("FAILURE") else {
                    return;
                };
                let error = DriverError::from(failure);
                debug!(%error, "request failed, connection requires RESET");
                self.current_error = Some(error.clone());
                self.needs_reset = true;
                entry.handler.on_failure(error);
            }
            BoltResponse::Ignored => {
                let Some(mut entry) = self.pop_head("IGNORED") else {
                    return;
                };
                let error = self.current_error.clone().unwrap_or_else(|| {
                    DriverError::ignored("Request ignored either because of an error or RESET")
                });
                entry.handler.on_failure(error);
            }
            BoltResponse::Record(record) => {
                let result = match self.handlers.front_mut() {
                    Some(head) => head.handler.on_record(record.fields),
                    None => Err(DriverError::protocol_violation(
                        "Unexpected RECORD with no pending response handler",
                    )),
                };
                if let Err(error) = result {
                    self.handle_fatal_error(error);
                }
            }
        }
    }

    fn pop_head(&mut self, name: &str) -> Option<QueuedHandler> {
        let head = self.handlers.pop_front();
        if head.is_none() {
            self.handle_fatal_error(DriverError::protocol_violation(format!(
                "Unexpected {} with no pending response handler",
                name
            )));
        }
        head
    }

    /// 치명 상태로 전환하고 대기 중인 모든 핸들러를 같은 에러로 실패시킵니다
    pub fn handle_fatal_error(&mut self, error: DriverError) {
        if self.fatal_error.is_none() {
            error!(%error, pending = self.handlers.len(), "fatal connection error");
            self.fatal_error = Some(error.clone());
        }
        self.current_error = Some(error.clone());
        while let Some(mut entry) = self.handlers.pop_front() {
            entry.handler.on_failure(error.clone());
        }
    }

    /// 대기 중인 핸들러 수
    pub fn queued_handlers(&self) -> usize {
        self.handlers.len()
    }

    /// 치명 상태 여부
    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// 최초의 치명적 에러
    pub fn fatal_error(&self) -> Option<&DriverError> {
        self.fatal_error.as_ref()
    }

    /// RESET 필요 여부
    pub fn needs_reset(&self) -> bool {
        self.needs_reset
    }

    /// 마지막 FAILURE 또는 치명적 에러
    pub fn current_error(&self) -> Option<&DriverError> {
        self.current_error.as_ref()
    }
}

impl std::fmt::Debug for InboundMessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundMessageDispatcher")
            .field("queued_handlers", &self.handlers.len())
            .field("needs_reset", &self.needs_reset)
            .field("fatal_error", &self.fatal_error)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
