//! Transaction Response Handlers
//!
//! BEGIN / COMMIT / ROLLBACK 응답을 `oneshot` 슬롯으로 전달합니다.
//! 세 요청 모두 레코드를 받으면 안 되며, 받으면 프로토콜 위반입니다.

use tokio::sync::oneshot;

use crate::bolt::Value;
use crate::driver::bookmark::Bookmark;
use crate::driver::dispatcher::{Metadata, ResponseHandler};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::summary::MetadataExtractor;

use super::complete;

/// COMMIT 결과. 북마크가 없으면 `Ok(None)`
pub type CommitResult = DriverResult<Option<Bookmark>>;

fn unexpected_records(request: &str, fields: Vec<Value>) -> DriverError {
    DriverError::protocol_violation(format!(
        "{} is not expected to receive records: {}",
        request,
        Value::List(fields)
    ))
}

// ============================================================================
// CommitTxResponseHandler
// ============================================================================

/// COMMIT 응답 핸들러
pub struct CommitTxResponseHandler {
    slot: Option<oneshot::Sender<CommitResult>>,
    extractor: MetadataExtractor,
}

impl CommitTxResponseHandler {
    /// 핸들러와 결과 수신기 생성
    pub fn new(extractor: MetadataExtractor) -> (Self, oneshot::Receiver<CommitResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Some(tx),
                extractor,
            },
            rx,
        )
    }
}

impl ResponseHandler for CommitTxResponseHandler {
    fn on_success(&mut self, metadata: Metadata) {
        let bookmark = self.extractor.extract_bookmark(&metadata);
        complete(&mut self.slot, bookmark);
    }

    fn on_failure(&mut self, error: DriverError) {
        complete(&mut self.slot, Err(error));
    }

    fn on_record(&mut self, fields: Vec<Value>) -> DriverResult<()> {
        Err(unexpected_records("Transaction commit", fields))
    }
}

// ============================================================================
// RollbackTxResponseHandler
// ============================================================================

/// ROLLBACK 응답 핸들러
pub struct RollbackTxResponseHandler {
    slot: Option<oneshot::Sender<DriverResult<()>>>,
}

impl RollbackTxResponseHandler {
    /// 핸들러와 결과 수신기 생성
    pub fn new() -> (Self, oneshot::Receiver<DriverResult<()>>) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Some(tx) }, rx)
    }
}

impl ResponseHandler for RollbackTxResponseHandler {
    fn on_success(&mut self, _metadata: Metadata) {
        complete(&mut self.slot, Ok(()));
    }

    fn on_failure(&mut self, error: DriverError) {
        complete(&mut self.slot, Err(error));
    }

    fn on_record(&mut self, fields: Vec<Value>) -> DriverResult<()> {
        Err(unexpected_records("Transaction rollback", fields))
    }
}

// ============================================================================
// BeginTxResponseHandler
// ============================================================================

/// BEGIN 응답 핸들러
pub struct BeginTxResponseHandler {
    slot: Option<oneshot::Sender<DriverResult<()>>>,
}

impl BeginTxResponseHandler {
    /// 핸들러와 결과 수신기 생성
    pub fn new() -> (Self, oneshot::Receiver<DriverResult<()>>) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Some(tx) }, rx)
    }
}

impl ResponseHandler for BeginTxResponseHandler {
    fn on_success(&mut self, _metadata: Metadata) {
        complete(&mut self.slot, Ok(()));
    }

    fn on_failure(&mut self, error: DriverError) {
        complete(&mut self.slot, Err(error));
    }

    fn on_record(&mut self, fields: Vec<Value>) -> DriverResult<()> {
        Err(unexpected_records("Transaction begin", fields))
    }
}

// ============================================================================
// Tests
// ============================================================================
