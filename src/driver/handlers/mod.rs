//! Response Handlers
//!
//! 요청 종류별 [`ResponseHandler`](super::dispatcher::ResponseHandler) 구현.
//!
//! - [`RunResponseHandler`]: RUN 메타데이터 (keys, qid, t_first)
//! - [`PullResponseHandler`]: 수요 기반 레코드 스트리밍
//! - [`CommitTxResponseHandler`]: COMMIT → 북마크
//! - [`HelloResponseHandler`], [`ResetResponseHandler`]: 연결 수명주기

use tokio::sync::oneshot;
use tracing::trace;

use crate::driver::error::DriverResult;

pub mod commit;
pub mod completion;
pub mod hello;
pub mod pull;
pub mod run;

pub use commit::{BeginTxResponseHandler, CommitResult, CommitTxResponseHandler, RollbackTxResponseHandler};
pub use completion::{
    PullCompletionListener, SessionPullCompletionListener, TransactionHandle,
    TransactionPullCompletionListener,
};
pub use hello::{HelloResponseHandler, ResetResponseHandler};
pub use pull::{PullResponseHandler, PullStatus, RecordConsumer, SummaryConsumer};
pub use run::{RunResponseHandler, RunResult};

/// 슬롯이 비어 있지 않으면 결과를 한 번만 보냅니다. 수신기가 사라졌으면 버립니다
pub(crate) fn complete<T>(slot: &mut Option<oneshot::Sender<DriverResult<T>>>, result: DriverResult<T>) {
    if let Some(tx) = slot.take() {
        if tx.send(result).is_err() {
            trace!("response slot dropped before completion");
        }
    }
}
