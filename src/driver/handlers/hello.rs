//! HELLO / RESET 응답 핸들러

use tokio::sync::oneshot;

use crate::bolt::Value;
use crate::driver::dispatcher::{Metadata, ResponseHandler};
use crate::driver::error::{DriverError, DriverResult};

use super::complete;

/// HELLO 응답 핸들러. SUCCESS 메타데이터(server, connection_id, patch_bolt)를 돌려줍니다
pub struct HelloResponseHandler {
    slot: Option<oneshot::Sender<DriverResult<Metadata>>>,
}

impl HelloResponseHandler {
    /// 핸들러와 결과 수신기 생성
    pub fn new() -> (Self, oneshot::Receiver<DriverResult<Metadata>>) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Some(tx) }, rx)
    }
}

impl ResponseHandler for HelloResponseHandler {
    fn on_success(&mut self, metadata: Metadata) {
        complete(&mut self.slot, Ok(metadata));
    }

    fn on_failure(&mut self, error: DriverError) {
        complete(&mut self.slot, Err(error));
    }

    fn on_record(&mut self, _fields: Vec<Value>) -> DriverResult<()> {
        Err(DriverError::protocol_violation("HELLO is not expected to receive records"))
    }
}

/// RESET 응답 핸들러
pub struct ResetResponseHandler {
    slot: Option<oneshot::Sender<DriverResult<()>>>,
}

impl ResetResponseHandler {
    /// 핸들러와 결과 수신기 생성
    pub fn new() -> (Self, oneshot::Receiver<DriverResult<()>>) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Some(tx) }, rx)
    }
}

impl ResponseHandler for ResetResponseHandler {
    fn on_success(&mut self, _metadata: Metadata) {
        complete(&mut self.slot, Ok(()));
    }

    fn on_failure(&mut self, error: DriverError) {
        complete(&mut self.slot, Err(error));
    }

    fn on_record(&mut self, _fields: Vec<Value>) -> DriverResult<()> {
        Err(DriverError::protocol_violation("RESET is not expected to receive records"))
    }
}
