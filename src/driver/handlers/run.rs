//! RUN 응답 핸들러

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::bolt::{Value, ABSENT_QUERY_ID};
use crate::driver::dispatcher::{Metadata, ResponseHandler};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::summary::MetadataExtractor;

/// RUN SUCCESS에서 얻은 결과 메타데이터
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// 컬럼 키
    pub fields: Arc<[String]>,
    /// 첫 레코드까지 걸린 시간
    pub result_available_after: Option<Duration>,
    /// 쿼리 ID (-1 = 마지막 쿼리)
    pub qid: i64,
}

impl Default for RunResult {
    fn default() -> Self {
        Self {
            fields: Arc::from(Vec::new()),
            result_available_after: None,
            qid: ABSENT_QUERY_ID,
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    result: Option<RunResult>,
    error: Option<DriverError>,
}

/// RUN 응답 핸들러
///
/// 복제본끼리 결과를 공유합니다. 하나는 디스패처에, 하나는 PULL 핸들러에 둡니다.
#[derive(Debug, Clone)]
pub struct RunResponseHandler {
    state: Arc<Mutex<RunState>>,
    extractor: MetadataExtractor,
}

impl RunResponseHandler {
    /// 새 핸들러 생성
    pub fn new(extractor: MetadataExtractor) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::default())),
            extractor,
        }
    }

    /// RUN 결과 (SUCCESS 전에는 None)
    pub fn result(&self) -> Option<RunResult> {
        self.state.lock().result.clone()
    }

    /// RUN 실패 에러
    pub fn error(&self) -> Option<DriverError> {
        self.state.lock().error.clone()
    }

    /// 응답 수신 여부
    pub fn is_done(&self) -> bool {
        let state = self.state.lock();
        state.result.is_some() || state.error.is_some()
    }

    /// 컬럼 키. SUCCESS 전에는 빈 목록
    pub fn keys(&self) -> Arc<[String]> {
        self.state
            .lock()
            .result
            .as_ref()
            .map(|r| r.fields.clone())
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// PULL/DISCARD에 붙일 쿼리 ID
    pub fn query_id(&self) -> i64 {
        self.state
            .lock()
            .result
            .as_ref()
            .map_or(ABSENT_QUERY_ID, |r| r.qid)
    }

    /// 첫 레코드까지 걸린 시간
    pub fn result_available_after(&self) -> Option<Duration> {
        self.state
            .lock()
            .result
            .as_ref()
            .and_then(|r| r.result_available_after)
    }
}

impl ResponseHandler for RunResponseHandler {
    fn on_success(&mut self, metadata: Metadata) {
        let result = RunResult {
            fields: self.extractor.extract_query_keys(&metadata).into(),
            result_available_after: self.extractor.extract_result_available_after(&metadata),
            qid: self.extractor.extract_query_id(&metadata),
        };
        self.state.lock().result = Some(result);
    }

    fn on_failure(&mut self, error: DriverError) {
        self.state.lock().error = Some(error);
    }

    fn on_record(&mut self, fields: Vec<Value>) -> DriverResult<()> {
        Err(DriverError::protocol_violation(format!(
            "RUN is not expected to receive records: {}",
            Value::List(fields)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_handler_success() {
        let handler = RunResponseHandler::new(MetadataExtractor::V4);
        assert_eq!(handler.query_id(), -1);
        assert!(handler.keys().is_empty());

        let mut dispatcher_copy = handler.clone();
        let mut metadata = Metadata::new();
        metadata.insert("fields".to_string(), Value::List(vec![Value::from("n")]));
        metadata.insert("t_first".to_string(), Value::Integer(4));
        metadata.insert("qid".to_string(), Value::Integer(7));
        dispatcher_copy.on_success(metadata);

        assert!(handler.is_done());
        assert_eq!(&*handler.keys(), &["n".to_string()]);
        assert_eq!(handler.query_id(), 7);
        assert_eq!(handler.result_available_after(), Some(Duration::from_millis(4)));
    }

    #[test]
    fn test_run_handler_failure() {
        let handler = RunResponseHandler::new(MetadataExtractor::V4);
        handler
            .clone()
            .on_failure(DriverError::server("Neo.ClientError.Statement.SyntaxError", "bad"));

        assert!(handler.is_done());
        assert!(handler.result().is_none());
        assert_eq!(
            handler.error().unwrap().code(),
            Some("Neo.ClientError.Statement.SyntaxError")
        );
    }

    #[test]
    fn test_run_handler_rejects_records() {
        let mut handler = RunResponseHandler::new(MetadataExtractor::V3);
        let err = handler.on_record(vec![Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, DriverError::ProtocolViolation(_)));
    }
}
