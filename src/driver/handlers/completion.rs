//! Pull Completion Listeners
//!
//! PULL 스트림이 종료될 때 한 번 호출되는 전략 객체.
//! 세션 범위 스트림은 북마크를 갱신하고 연결을 반환하며,
//! 트랜잭션 범위 스트림은 실패를 트랜잭션에 기록합니다.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::driver::bookmark::BookmarkHolder;
use crate::driver::connection::Connection;
use crate::driver::dispatcher::Metadata;
use crate::driver::error::DriverError;
use crate::driver::summary::MetadataExtractor;

/// 스트림 종료 시 호출되는 리스너
pub trait PullCompletionListener: Send {
    /// 종료 SUCCESS 수신 후
    fn after_success(&mut self, metadata: &Metadata);

    /// FAILURE 또는 치명적 에러 수신 후
    fn after_failure(&mut self, error: &DriverError);
}

// ============================================================================
// SessionPullCompletionListener
// ============================================================================

/// 자동 커밋 쿼리용 리스너
pub struct SessionPullCompletionListener {
    connection: Arc<dyn Connection>,
    bookmarks: Arc<dyn BookmarkHolder>,
    extractor: MetadataExtractor,
}

impl SessionPullCompletionListener {
    /// 새 리스너 생성
    pub fn new(connection: Arc<dyn Connection>, bookmarks: Arc<dyn BookmarkHolder>) -> Self {
        let extractor = MetadataExtractor::for_version(connection.protocol_version());
        Self {
            connection,
            bookmarks,
            extractor,
        }
    }
}

impl PullCompletionListener for SessionPullCompletionListener {
    fn after_success(&mut self, metadata: &Metadata) {
        match self.extractor.extract_bookmark(metadata) {
            Ok(Some(bookmark)) => self.bookmarks.set_bookmark(bookmark),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "keeping previous bookmark"),
        }
        self.connection.release();
    }

    fn after_failure(&mut self, _error: &DriverError) {
        self.connection.release();
    }
}

// ============================================================================
// TransactionPullCompletionListener
// ============================================================================

/// 명시적 트랜잭션의 종료 상태
///
/// 트랜잭션 안의 쿼리가 실패하면 트랜잭션은 커밋할 수 없게 됩니다.
#[derive(Debug, Clone, Default)]
pub struct TransactionHandle {
    terminated: Arc<Mutex<Option<DriverError>>>,
}

impl TransactionHandle {
    /// 새 핸들 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 종료 표시. 처음 에러만 유지
    pub fn mark_terminated(&self, error: DriverError) {
        let mut terminated = self.terminated.lock();
        if terminated.is_none() {
            *terminated = Some(error);
        }
    }

    /// 종료 여부
    pub fn is_terminated(&self) -> bool {
        self.terminated.lock().is_some()
    }

    /// 종료 원인
    pub fn termination(&self) -> Option<DriverError> {
        self.terminated.lock().clone()
    }
}

/// 트랜잭션 안의 쿼리용 리스너. 연결은 트랜잭션이 끝날 때 반환됩니다
pub struct TransactionPullCompletionListener {
    transaction: TransactionHandle,
}

impl TransactionPullCompletionListener {
    /// 새 리스너 생성
    pub fn new(transaction: TransactionHandle) -> Self {
        Self { transaction }
    }
}

impl PullCompletionListener for TransactionPullCompletionListener {
    fn after_success(&mut self, _metadata: &Metadata) {}

    fn after_failure(&mut self, error: &DriverError) {
        self.transaction.mark_terminated(error.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::{BoltVersion, Value};
    use crate::driver::bookmark::{Bookmark, DefaultBookmarkHolder};
    use crate::driver::handlers::testing::RecordingConnection;

    #[test]
    fn test_session_listener_success_sets_bookmark_and_releases() {
        let connection = Arc::new(RecordingConnection::new(BoltVersion::V4_4));
        let bookmarks = Arc::new(DefaultBookmarkHolder::new());
        let mut listener = SessionPullCompletionListener::new(connection.clone(), bookmarks.clone());

        let mut metadata = Metadata::new();
        metadata.insert("bookmark".to_string(), Value::from("bm-1"));
        listener.after_success(&metadata);

        assert_eq!(bookmarks.bookmark(), Some(Bookmark::new("bm-1")));
        assert_eq!(connection.release_count(), 1);
    }

    #[test]
    fn test_session_listener_failure_releases() {
        let connection = Arc::new(RecordingConnection::new(BoltVersion::V4_4));
        let bookmarks = Arc::new(DefaultBookmarkHolder::new());
        let mut listener = SessionPullCompletionListener::new(connection.clone(), bookmarks.clone());

        listener.after_failure(&DriverError::server("Neo.ClientError.Statement.SyntaxError", "bad"));

        assert_eq!(bookmarks.bookmark(), None);
        assert_eq!(connection.release_count(), 1);
    }

    #[test]
    fn test_transaction_listener_marks_terminated() {
        let tx = TransactionHandle::new();
        let mut listener = TransactionPullCompletionListener::new(tx.clone());

        listener.after_success(&Metadata::new());
        assert!(!tx.is_terminated());

        listener.after_failure(&DriverError::server("Neo.ClientError.Statement.SyntaxError", "first"));
        listener.after_failure(&DriverError::server("Neo.ClientError.Statement.SyntaxError", "second"));
        assert!(tx.is_terminated());
        assert!(tx.termination().unwrap().to_string().contains("first"));
    }
}
