//! Streaming Pull Handler
//!
//! 소비자 수요에 따라 PULL/DISCARD를 내보내는 결과 스트림 상태 기계.
//!
//! ```text
//! Initialized ─request─▶ Streaming ◀─request/has_more─▶ AwaitingDemand
//!      │                     │                               │
//!      │                     ├─SUCCESS──▶ Succeeded          │
//!      │                     └─FAILURE──▶ Failed             │
//!      └──────cancel──▶ Cancelling ◀──────cancel─────────────┘
//!                           └─SUCCESS──▶ Discarded
//! ```
//!
//! 한 스트림에는 응답을 기다리는 PULL/DISCARD가 최대 하나만 있습니다.
//! 소비자는 상태 잠금 밖에서 호출되므로 소비자 안에서 `request`나 `cancel`을
//! 다시 호출할 수 있습니다.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::completion::PullCompletionListener;
use super::run::RunResponseHandler;
use crate::bolt::{BoltRequest, DiscardMessage, PullMessage, Value, FETCH_ALL};
use crate::driver::connection::Connection;
use crate::driver::dispatcher::{Metadata, ResponseHandler};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::record::Record;
use crate::driver::summary::{MetadataExtractor, ResultSummary};

/// 레코드 소비자. 레코드마다 `(Some(record), None)`, 정상 종료 시 `(None, None)`,
/// 실패 시 `(None, Some(error))`
pub type RecordConsumer = Box<dyn FnMut(Option<Record>, Option<DriverError>) + Send>;

/// 요약 소비자. `(Some(summary), None)` 또는 `(None, Some(error))`
pub type SummaryConsumer = Box<dyn FnMut(Option<ResultSummary>, Option<DriverError>) + Send>;

// ============================================================================
// PullStatus
// ============================================================================

/// 스트림 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    /// 아직 PULL을 보내지 않음
    Initialized,
    /// 경계 SUCCESS(has_more) 수신 후 추가 수요 대기
    AwaitingDemand,
    /// PULL 응답 대기 중
    Streaming,
    /// 취소됨, DISCARD 응답 대기 중
    Cancelling,
    /// 정상 종료
    Succeeded,
    /// 실패
    Failed,
    /// 취소 후 서버 커서 정리 완료
    Discarded,
}

impl PullStatus {
    /// 종료 상태 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Discarded)
    }
}

// ============================================================================
// PullResponseHandler
// ============================================================================

struct PullState {
    status: PullStatus,
    /// 아직 보내지 않은 수요 (-1 = 무제한)
    to_request: i64,
    /// 응답 대기 중인 PULL이 남긴 레코드 수 (-1 = 무제한)
    in_flight: i64,
    /// 응답 대기 중인 PULL/DISCARD 존재 여부
    outstanding: bool,
    keys: Option<Arc<[String]>>,
    buffered: VecDeque<Record>,
    outcome: Option<Result<ResultSummary, DriverError>>,
    record_consumer: Option<RecordConsumer>,
    summary_consumer: Option<SummaryConsumer>,
    record_outcome_delivered: bool,
    summary_outcome_delivered: bool,
    listener: Option<Box<dyn PullCompletionListener>>,
}

struct PullInner {
    query: String,
    run: RunResponseHandler,
    connection: Arc<dyn Connection>,
    extractor: MetadataExtractor,
    state: Mutex<PullState>,
}

/// 결과 스트림 핸들러
///
/// 복제본은 같은 상태를 공유합니다. 디스패처는 PULL/DISCARD마다 복제본 하나를
/// 받고 소비자 쪽이 또 하나를 가집니다.
#[derive(Clone)]
pub struct PullResponseHandler {
    inner: Arc<PullInner>,
}

impl PullResponseHandler {
    /// 새 스트림 생성
    pub fn new(
        query: impl Into<String>,
        run: RunResponseHandler,
        connection: Arc<dyn Connection>,
        listener: Box<dyn PullCompletionListener>,
    ) -> Self {
        let extractor = MetadataExtractor::for_version(connection.protocol_version());
        Self {
            inner: Arc::new(PullInner {
                query: query.into(),
                run,
                connection,
                extractor,
                state: Mutex::new(PullState {
                    status: PullStatus::Initialized,
                    to_request: 0,
                    in_flight: 0,
                    outstanding: false,
                    keys: None,
                    buffered: VecDeque::new(),
                    outcome: None,
                    record_consumer: None,
                    summary_consumer: None,
                    record_outcome_delivered: false,
                    summary_outcome_delivered: false,
                    listener: Some(listener),
                }),
            }),
        }
    }

    /// 현재 상태
    pub fn status(&self) -> PullStatus {
        self.inner.state.lock().status
    }

    /// 종료 여부
    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    /// 남은 수요. 무제한이면 -1
    pub fn demand(&self) -> i64 {
        let state = self.inner.state.lock();
        if state.to_request == FETCH_ALL || state.in_flight == FETCH_ALL {
            FETCH_ALL
        } else {
            state.to_request.saturating_add(state.in_flight)
        }
    }

    /// 레코드 소비자 설치. 이미 받은 레코드와 종료 결과가 있으면 즉시 전달합니다
    pub fn install_record_consumer<F>(&self, consumer: F)
    where
        F: FnMut(Option<Record>, Option<DriverError>) + Send + 'static,
    {
        self.inner.state.lock().record_consumer = Some(Box::new(consumer));
        self.drain_records();
    }

    /// 요약 소비자 설치. 이미 종료되었으면 결과를 즉시 한 번 전달합니다
    pub fn install_summary_consumer<F>(&self, consumer: F)
    where
        F: FnMut(Option<ResultSummary>, Option<DriverError>) + Send + 'static,
    {
        self.inner.state.lock().summary_consumer = Some(Box::new(consumer));
        self.drain_summary();
    }

    /// `n`개 레코드 추가 요청. `-1`은 남은 레코드 전부
    pub fn request(&self, n: i64) -> DriverResult<()> {
        if n <= 0 && n != FETCH_ALL {
            return Err(DriverError::InvalidDemand(n));
        }

        let pull = {
            let mut state = self.inner.state.lock();
            if state.status.is_terminal() || state.status == PullStatus::Cancelling {
                return Ok(());
            }
            state.to_request = if n == FETCH_ALL || state.to_request == FETCH_ALL {
                FETCH_ALL
            } else {
                state.to_request.saturating_add(n)
            };
            if state.outstanding {
                None
            } else {
                Some(self.next_pull(&mut state))
            }
        };

        if let Some(pull) = pull {
            self.write(BoltRequest::Pull(pull));
        }
        Ok(())
    }

    /// 스트림 취소. 남은 레코드는 DISCARD로 버립니다. 여러 번 호출해도 같습니다
    pub fn cancel(&self) {
        let discard = {
            let mut state = self.inner.state.lock();
            let status = state.status;
            match status {
                PullStatus::Initialized | PullStatus::AwaitingDemand => {
                    state.status = PullStatus::Cancelling;
                    state.outstanding = true;
                    true
                }
                PullStatus::Streaming => {
                    state.status = PullStatus::Cancelling;
                    false
                }
                _ => return,
            }
        };
        self.clear_pending();

        debug!(query = %self.inner.query, deferred = !discard, "cancelling result stream");
        if discard {
            self.write(BoltRequest::Discard(self.discard_all()));
        }
    }

    fn clear_pending(&self) {
        let mut state = self.inner.state.lock();
        state.to_request = 0;
        state.in_flight = 0;
        state.buffered.clear();
    }

    /// 보내지 않은 수요를 PULL 하나로 만듭니다
    fn next_pull(&self, state: &mut PullState) -> PullMessage {
        let n = if self.inner.connection.protocol_version().supports_bounded_pull() {
            state.to_request
        } else {
            FETCH_ALL
        };
        state.status = PullStatus::Streaming;
        state.outstanding = true;
        state.in_flight = n;
        state.to_request = 0;
        PullMessage::new(n, self.inner.run.query_id())
    }

    fn discard_all(&self) -> DiscardMessage {
        DiscardMessage::new(FETCH_ALL, self.inner.run.query_id())
    }

    fn write(&self, request: BoltRequest) {
        trace!(query = %self.inner.query, "submitting {}", request);
        self.inner
            .connection
            .write_and_flush(request, Box::new(self.clone()));
    }

    fn keys(&self, state: &mut PullState) -> Arc<[String]> {
        state
            .keys
            .get_or_insert_with(|| self.inner.run.keys())
            .clone()
    }

    fn complete(&self, outcome: Result<ResultSummary, DriverError>, metadata: Option<&Metadata>) {
        let listener = {
            let mut state = self.inner.state.lock();
            state.outstanding = false;
            state.to_request = 0;
            state.in_flight = 0;
            state.status = match (&outcome, state.status) {
                (Err(_), _) => PullStatus::Failed,
                (Ok(_), PullStatus::Cancelling) => PullStatus::Discarded,
                (Ok(_), _) => PullStatus::Succeeded,
            };
            if state.status == PullStatus::Discarded {
                state.buffered.clear();
            }
            state.outcome = Some(outcome.clone());
            state.listener.take()
        };

        if let Some(mut listener) = listener {
            match (&outcome, metadata) {
                (Ok(_), Some(metadata)) => listener.after_success(metadata),
                (Ok(_), None) => listener.after_success(&Metadata::new()),
                (Err(error), _) => listener.after_failure(error),
            }
        }

        self.drain_records();
        self.drain_summary();
    }

    /// 버퍼된 레코드와 종료 결과를 레코드 소비자에게 순서대로 전달
    fn drain_records(&self) {
        loop {
            let (mut consumer, record, error) = {
                let mut state = self.inner.state.lock();
                if state.record_consumer.is_none() {
                    return;
                }
                if let Some(record) = state.buffered.pop_front() {
                    (state.record_consumer.take(), Some(record), None)
                } else if state.record_outcome_delivered {
                    return;
                } else if let Some(outcome) = &state.outcome {
                    let error = outcome.as_ref().err().cloned();
                    state.record_outcome_delivered = true;
                    (state.record_consumer.take(), None, error)
                } else {
                    return;
                }
            };

            if let Some(consumer) = consumer.as_mut() {
                consumer(record, error);
            }

            let mut state = self.inner.state.lock();
            if state.record_consumer.is_none() {
                state.record_consumer = consumer;
            }
        }
    }

    /// 종료 결과를 요약 소비자에게 한 번 전달
    fn drain_summary(&self) {
        let (mut consumer, summary, error) = {
            let mut state = self.inner.state.lock();
            if state.summary_consumer.is_none() || state.summary_outcome_delivered {
                return;
            }
            let (summary, error) = match &state.outcome {
                Some(Ok(summary)) => (Some(summary.clone()), None),
                Some(Err(error)) => (None, Some(error.clone())),
                None => return,
            };
            state.summary_outcome_delivered = true;
            (state.summary_consumer.take(), summary, error)
        };

        if let Some(consumer) = consumer.as_mut() {
            consumer(summary, error);
        }

        let mut state = self.inner.state.lock();
        if state.summary_consumer.is_none() {
            state.summary_consumer = consumer;
        }
    }
}

impl ResponseHandler for PullResponseHandler {
    fn on_success(&mut self, metadata: Metadata) {
        let has_more = metadata
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if has_more {
            let next = {
                let mut state = self.inner.state.lock();
                state.outstanding = false;
                if state.in_flight == FETCH_ALL {
                    state.to_request = FETCH_ALL;
                } else if state.to_request != FETCH_ALL {
                    // 서버가 짧게 끊은 배치의 남은 수요는 다음 PULL로 이월
                    state.to_request = state.to_request.saturating_add(state.in_flight);
                }
                state.in_flight = 0;
                let status = state.status;
                match status {
                    PullStatus::Cancelling => {
                        state.outstanding = true;
                        Some(BoltRequest::Discard(self.discard_all()))
                    }
                    status if status.is_terminal() => None,
                    _ if state.to_request != 0 => {
                        Some(BoltRequest::Pull(self.next_pull(&mut state)))
                    }
                    _ => {
                        state.status = PullStatus::AwaitingDemand;
                        None
                    }
                }
            };
            if let Some(request) = next {
                self.write(request);
            }
            return;
        }

        if self.status().is_terminal() {
            return;
        }
        let outcome = self.inner.extractor.extract_summary(
            &self.inner.query,
            self.inner.run.result_available_after(),
            &metadata,
        );
        self.complete(outcome, Some(&metadata));
    }

    fn on_failure(&mut self, error: DriverError) {
        if self.status().is_terminal() {
            return;
        }
        debug!(query = %self.inner.query, %error, "result stream failed");
        self.complete(Err(error), None);
    }

    fn on_record(&mut self, fields: Vec<Value>) -> DriverResult<()> {
        {
            let mut state = self.inner.state.lock();
            let status = state.status;
            match status {
                PullStatus::Cancelling => return Ok(()),
                status if status.is_terminal() => {
                    return Err(DriverError::protocol_violation(format!(
                        "Received RECORD after the result stream completed ({:?})",
                        status
                    )))
                }
                _ => {}
            }
            if state.in_flight > 0 {
                state.in_flight -= 1;
            }
            let keys = self.keys(&mut state);
            state.buffered.push_back(Record::new(keys, fields));
        }
        self.drain_records();
        Ok(())
    }
}

impl std::fmt::Debug for PullResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PullResponseHandler")
            .field("query", &self.inner.query)
            .field("status", &state.status)
            .field("to_request", &state.to_request)
            .field("in_flight", &state.in_flight)
            .field("outstanding", &state.outstanding)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::BoltVersion;
    use crate::driver::bookmark::{Bookmark, BookmarkHolder, DefaultBookmarkHolder};
    use crate::driver::handlers::completion::SessionPullCompletionListener;
    use crate::driver::handlers::testing::RecordingConnection;

    type Seen<T> = Arc<Mutex<Vec<(Option<T>, Option<String>)>>>;

    struct Fixture {
        connection: Arc<RecordingConnection>,
        bookmarks: Arc<DefaultBookmarkHolder>,
        handler: PullResponseHandler,
        records: Seen<Record>,
        summaries: Seen<ResultSummary>,
    }

    fn fixture(version: BoltVersion) -> Fixture {
        let connection = Arc::new(RecordingConnection::new(version));
        let bookmarks = Arc::new(DefaultBookmarkHolder::new());
        let run = RunResponseHandler::new(MetadataExtractor::for_version(version));
        let mut run_success = Metadata::new();
        run_success.insert("fields".to_string(), Value::List(vec![Value::from("n")]));
        run.clone().on_success(run_success);

        let listener = SessionPullCompletionListener::new(connection.clone(), bookmarks.clone());
        let handler = PullResponseHandler::new(
            "UNWIND range(1, 10) AS n RETURN n",
            run,
            connection.clone(),
            Box::new(listener),
        );
        Fixture {
            connection,
            bookmarks,
            handler,
            records: Arc::new(Mutex::new(Vec::new())),
            summaries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    impl Fixture {
        fn install_consumers(&self) {
            self.install_record_consumer();
            self.install_summary_consumer();
        }

        fn install_record_consumer(&self) {
            let records = self.records.clone();
            self.handler.install_record_consumer(move |record, error| {
                records.lock().push((record, error.map(|e| e.to_string())));
            });
        }

        fn install_summary_consumer(&self) {
            let summaries = self.summaries.clone();
            self.handler.install_summary_consumer(move |summary, error| {
                summaries.lock().push((summary, error.map(|e| e.to_string())));
            });
        }

        /// 디스패처가 받은 핸들러 복제본으로 응답 전달
        fn respond_success(&self, metadata: Metadata) {
            self.handler.clone().on_success(metadata);
        }

        fn respond_record(&self, n: i64) {
            self.handler.clone().on_record(vec![Value::Integer(n)]).unwrap();
        }

        fn respond_failure(&self, error: DriverError) {
            self.handler.clone().on_failure(error);
        }

        fn record_count(&self) -> usize {
            self.records.lock().iter().filter(|(r, _)| r.is_some()).count()
        }
    }

    fn has_more() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("has_more".to_string(), Value::Boolean(true));
        metadata
    }

    fn done(bookmark: Option<&str>) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), Value::from("r"));
        if let Some(bookmark) = bookmark {
            metadata.insert("bookmark".to_string(), Value::from(bookmark));
        }
        metadata
    }

    #[test]
    fn test_request_sends_single_pull() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(5).unwrap();
        assert_eq!(f.connection.requests(), vec![BoltRequest::Pull(PullMessage::new(5, -1))]);
        assert_eq!(f.handler.status(), PullStatus::Streaming);

        for n in 1..=5 {
            f.respond_record(n);
        }
        assert_eq!(f.handler.demand(), 0);
        f.respond_success(has_more());

        assert_eq!(f.handler.status(), PullStatus::AwaitingDemand);
        assert_eq!(f.connection.requests().len(), 1);
        assert_eq!(f.record_count(), 5);
    }

    #[test]
    fn test_demand_accumulates_while_pull_outstanding() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(2).unwrap();
        f.handler.request(3).unwrap();
        f.handler.request(4).unwrap();
        assert_eq!(f.connection.requests().len(), 1);
        assert_eq!(f.handler.demand(), 9);

        f.respond_record(1);
        f.respond_record(2);
        f.respond_success(has_more());

        assert_eq!(
            f.connection.requests(),
            vec![
                BoltRequest::Pull(PullMessage::new(2, -1)),
                BoltRequest::Pull(PullMessage::new(7, -1)),
            ]
        );
        assert_eq!(f.handler.status(), PullStatus::Streaming);
    }

    #[test]
    fn test_short_batch_keeps_remaining_demand() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(5).unwrap();
        for n in 1..=3 {
            f.respond_record(n);
        }
        assert_eq!(f.handler.demand(), 2);
        f.respond_success(has_more());

        assert_eq!(
            f.connection.requests(),
            vec![
                BoltRequest::Pull(PullMessage::new(5, -1)),
                BoltRequest::Pull(PullMessage::new(2, -1)),
            ]
        );
        assert_eq!(f.handler.status(), PullStatus::Streaming);
        assert_eq!(f.handler.demand(), 2);
    }

    #[test]
    fn test_invalid_demand() {
        let f = fixture(BoltVersion::V4_4);
        assert!(matches!(f.handler.request(0), Err(DriverError::InvalidDemand(0))));
        assert!(matches!(f.handler.request(-5), Err(DriverError::InvalidDemand(-5))));
        assert!(f.connection.requests().is_empty());
    }

    #[test]
    fn test_bounded_demand_saturates() {
        let f = fixture(BoltVersion::V4_4);
        f.handler.request(1).unwrap();
        f.handler.request(i64::MAX).unwrap();
        f.handler.request(i64::MAX).unwrap();
        assert_eq!(f.handler.demand(), i64::MAX);
    }

    #[test]
    fn test_unbounded_demand_streams_to_completion() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(FETCH_ALL).unwrap();
        assert_eq!(f.handler.demand(), -1);
        for n in 1..=10 {
            f.respond_record(n);
        }
        f.respond_success(done(Some("bm-1")));

        assert_eq!(f.connection.requests(), vec![BoltRequest::Pull(PullMessage::all())]);
        assert_eq!(f.handler.status(), PullStatus::Succeeded);
        assert_eq!(f.record_count(), 10);
        assert_eq!(f.bookmarks.bookmark(), Some(Bookmark::new("bm-1")));
        assert_eq!(f.connection.release_count(), 1);

        let records = f.records.lock();
        assert_eq!(records.last(), Some(&(None, None)));
        assert_eq!(records[0].0.as_ref().unwrap().get_int("n"), Some(1));
    }

    #[test]
    fn test_success_delivers_summary_once() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(FETCH_ALL).unwrap();
        f.respond_success(done(None));
        f.respond_failure(DriverError::connection_terminated("late"));

        let summaries = f.summaries.lock();
        assert_eq!(summaries.len(), 1);
        let summary = summaries[0].0.as_ref().unwrap();
        assert_eq!(summary.query, "UNWIND range(1, 10) AS n RETURN n");
        assert_eq!(f.handler.status(), PullStatus::Succeeded);
        assert_eq!(f.connection.release_count(), 1);
    }

    #[test]
    fn test_failure_notifies_both_consumers() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(10).unwrap();
        f.respond_record(1);
        f.respond_failure(DriverError::server("Neo.ClientError.Statement.ArithmeticError", "/ by zero"));

        assert_eq!(f.handler.status(), PullStatus::Failed);
        assert_eq!(f.connection.release_count(), 1);

        let records = f.records.lock();
        assert_eq!(records.len(), 2);
        assert!(records[1].0.is_none());
        assert!(records[1].1.as_ref().unwrap().contains("/ by zero"));

        let summaries = f.summaries.lock();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].0.is_none());
        assert!(summaries[0].1.is_some());
    }

    #[test]
    fn test_cancel_before_streaming_discards_immediately() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.cancel();
        f.handler.cancel();
        assert_eq!(f.handler.status(), PullStatus::Cancelling);
        assert_eq!(f.connection.requests(), vec![BoltRequest::Discard(DiscardMessage::all())]);

        f.handler.request(5).unwrap();
        assert_eq!(f.connection.requests().len(), 1);

        f.respond_success(done(None));
        f.handler.cancel();

        assert_eq!(f.handler.status(), PullStatus::Discarded);
        assert_eq!(f.connection.requests().len(), 1);
        assert_eq!(f.record_count(), 0);
        assert_eq!(f.summaries.lock().len(), 1);
        assert!(f.summaries.lock()[0].0.is_some());
        assert_eq!(f.connection.release_count(), 1);
    }

    #[test]
    fn test_cancel_while_streaming_defers_discard() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(3).unwrap();
        f.respond_record(1);
        f.handler.cancel();
        f.respond_record(2);
        f.respond_record(3);
        assert_eq!(f.connection.requests().len(), 1);

        f.respond_success(has_more());
        assert_eq!(
            f.connection.requests(),
            vec![
                BoltRequest::Pull(PullMessage::new(3, -1)),
                BoltRequest::Discard(DiscardMessage::all()),
            ]
        );

        f.respond_success(done(None));
        assert_eq!(f.handler.status(), PullStatus::Discarded);
        assert_eq!(f.record_count(), 1);
    }

    #[test]
    fn test_late_summary_consumer_after_failure() {
        let f = fixture(BoltVersion::V4_4);
        f.install_record_consumer();

        f.handler.request(1).unwrap();
        f.respond_failure(DriverError::server("Neo.ClientError.Statement.SyntaxError", "E"));
        assert!(f.summaries.lock().is_empty());

        f.install_summary_consumer();
        f.respond_failure(DriverError::connection_terminated("again"));

        let summaries = f.summaries.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].0, None);
        assert!(summaries[0].1.as_ref().unwrap().contains("E"));
    }

    #[test]
    fn test_late_record_consumer_receives_buffered_records() {
        let f = fixture(BoltVersion::V4_4);

        f.handler.request(FETCH_ALL).unwrap();
        f.respond_record(1);
        f.respond_record(2);
        f.respond_success(done(None));
        assert!(f.handler.is_done());

        f.install_record_consumer();
        let records = f.records.lock();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].0.as_ref().unwrap().get_int("n"), Some(2));
        assert_eq!(records[2], (None, None));
    }

    #[test]
    fn test_consumer_can_request_reentrantly() {
        let f = fixture(BoltVersion::V4_4);
        let handler = f.handler.clone();
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        f.handler.install_record_consumer(move |record, _| {
            if record.is_some() {
                *counter.lock() += 1;
                handler.request(1).unwrap();
            }
        });

        f.handler.request(1).unwrap();
        f.respond_record(1);
        f.respond_success(has_more());

        assert_eq!(*seen.lock(), 1);
        assert_eq!(
            f.connection.requests(),
            vec![
                BoltRequest::Pull(PullMessage::new(1, -1)),
                BoltRequest::Pull(PullMessage::new(1, -1)),
            ]
        );
    }

    #[test]
    fn test_pull_uses_query_id() {
        let connection = Arc::new(RecordingConnection::new(BoltVersion::V4_4));
        let run = RunResponseHandler::new(MetadataExtractor::V4);
        let mut run_success = Metadata::new();
        run_success.insert("qid".to_string(), Value::Integer(4));
        run.clone().on_success(run_success);

        let listener = SessionPullCompletionListener::new(
            connection.clone(),
            Arc::new(DefaultBookmarkHolder::new()),
        );
        let handler = PullResponseHandler::new("RETURN 1", run, connection.clone(), Box::new(listener));
        handler.request(10).unwrap();

        assert_eq!(connection.requests(), vec![BoltRequest::Pull(PullMessage::new(10, 4))]);
    }

    #[test]
    fn test_bolt3_always_pulls_all() {
        let f = fixture(BoltVersion::V3_0);
        f.handler.request(5).unwrap();
        assert_eq!(f.connection.requests(), vec![BoltRequest::Pull(PullMessage::all())]);
        assert_eq!(f.handler.demand(), -1);
    }

    #[test]
    fn test_summary_extraction_failure_fails_stream() {
        let f = fixture(BoltVersion::V4_4);
        f.install_consumers();

        f.handler.request(FETCH_ALL).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), Value::from("unknown"));
        f.respond_success(metadata);

        assert_eq!(f.handler.status(), PullStatus::Failed);
        assert!(f.summaries.lock()[0].1.is_some());
        assert_eq!(f.connection.release_count(), 1);
    }

    #[test]
    fn test_record_after_completion_is_violation() {
        let f = fixture(BoltVersion::V4_4);
        f.handler.request(FETCH_ALL).unwrap();
        f.respond_success(done(None));

        let err = f.handler.clone().on_record(vec![Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, DriverError::ProtocolViolation(_)));
    }
}
