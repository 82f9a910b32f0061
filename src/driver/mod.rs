//! Driver Module
//!
//! Bolt 연결 위의 요청/응답 엔진.
//!
//! # 구성
//!
//! - [`BoltChannel`]: 핸드셰이크, 프레이밍, 응답 디스패치
//! - [`InboundMessageDispatcher`]: 응답 핸들러 FIFO 큐와 실패/치명 상태
//! - [`handlers`]: RUN / PULL / COMMIT 등 요청별 응답 핸들러
//! - [`summary`]: SUCCESS 메타데이터 → [`ResultSummary`]
//!
//! # Example
//!
//! ```ignore
//! let mut channel = BoltChannel::connect(stream, ConnectionConfig::default()).await?;
//! channel.hello().await?;
//!
//! let (commit, rx) = CommitTxResponseHandler::new(MetadataExtractor::V4);
//! channel.submit(BoltRequest::Commit, Box::new(commit)).await?;
//! channel.run_until_idle().await?;
//! let bookmark = rx.await??;
//! ```

pub mod bookmark;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod record;
pub mod summary;

pub use bookmark::{Bookmark, BookmarkHolder, DefaultBookmarkHolder, NoOpBookmarkHolder};
pub use config::{ConnectionConfig, ConnectionConfigBuilder, DEFAULT_FETCH_SIZE};
pub use connection::{BoltChannel, ChannelConnection, Connection};
pub use dispatcher::{InboundMessageDispatcher, Metadata, ResponseHandler};
pub use error::{DriverError, DriverResult};
pub use handlers::{
    BeginTxResponseHandler, CommitTxResponseHandler, HelloResponseHandler, PullCompletionListener,
    PullResponseHandler, PullStatus, ResetResponseHandler, RollbackTxResponseHandler,
    RunResponseHandler, SessionPullCompletionListener, TransactionHandle,
    TransactionPullCompletionListener,
};
pub use record::Record;
pub use summary::{
    Counters, InputPosition, MetadataExtractor, Notification, Plan, ProfiledPlan, QueryType,
    ResultSummary,
};
