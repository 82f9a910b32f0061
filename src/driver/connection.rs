//! Bolt Channel
//!
//! 바이트 스트림 하나 위의 Bolt 연결. 핸드셰이크, 청크 프레이밍([`BoltCodec`]),
//! 응답 디스패치([`InboundMessageDispatcher`])를 하나로 묶습니다.
//!
//! 핸들러가 보내는 후속 요청(PULL, DISCARD)은 [`Connection`]을 통해 outbox에
//! 쌓이고, 채널이 응답 하나를 디스패치할 때마다 순서대로 전송됩니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::config::ConnectionConfig;
use super::dispatcher::{InboundMessageDispatcher, Metadata, ResponseHandler};
use super::error::{DriverError, DriverResult};
use super::handlers::{HelloResponseHandler, ResetResponseHandler};
use crate::bolt::handshake::HANDSHAKE_RESPONSE_SIZE;
use crate::bolt::{
    BoltCodec, BoltError, BoltMessage, BoltRequest, BoltVersion, HelloMessage, MessageFormat,
    SuccessMessage,
};

// ============================================================================
// Connection - 핸들러 쪽 연결 인터페이스
// ============================================================================

/// 응답 핸들러가 보는 연결
pub trait Connection: Send + Sync {
    /// 요청과 그 응답 핸들러를 전송 대기열에 넣습니다
    fn write_and_flush(&self, request: BoltRequest, handler: Box<dyn ResponseHandler>);

    /// 연결을 소유자에게 반환
    fn release(&self);

    /// 협상된 프로토콜 버전
    fn protocol_version(&self) -> BoltVersion;
}

type Outbound = (BoltRequest, Box<dyn ResponseHandler>);

/// [`BoltChannel`]에 붙는 [`Connection`] 구현
pub struct ChannelConnection {
    version: BoltVersion,
    outbox: Mutex<Vec<Outbound>>,
    releases: AtomicUsize,
}

impl ChannelConnection {
    fn new(version: BoltVersion) -> Self {
        Self {
            version,
            outbox: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
        }
    }

    /// 반환 횟수
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// 전송 대기 중인 요청 수
    pub fn pending_writes(&self) -> usize {
        self.outbox.lock().len()
    }

    fn take_outbox(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.outbox.lock())
    }
}

impl Connection for ChannelConnection {
    fn write_and_flush(&self, request: BoltRequest, handler: Box<dyn ResponseHandler>) {
        self.outbox.lock().push((request, handler));
    }

    fn release(&self) {
        let count = self.releases.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(count, "connection released");
    }

    fn protocol_version(&self) -> BoltVersion {
        self.version
    }
}

impl std::fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConnection")
            .field("version", &self.version)
            .field("pending_writes", &self.pending_writes())
            .field("releases", &self.release_count())
            .finish()
    }
}

// ============================================================================
// BoltChannel
// ============================================================================

/// 클라이언트 쪽 Bolt 채널
pub struct BoltChannel<T> {
    framed: Framed<T, BoltCodec>,
    dispatcher: InboundMessageDispatcher,
    connection: Arc<ChannelConnection>,
    config: ConnectionConfig,
    server: Option<String>,
}

impl<T> BoltChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// 핸드셰이크를 수행하고 채널 생성
    pub async fn connect(mut stream: T, config: ConnectionConfig) -> DriverResult<Self> {
        config.validate()?;

        stream
            .write_all(&config.handshake.preamble())
            .await
            .map_err(BoltError::from)?;
        stream.flush().await.map_err(BoltError::from)?;

        let mut response = [0u8; HANDSHAKE_RESPONSE_SIZE];
        stream
            .read_exact(&mut response)
            .await
            .map_err(BoltError::from)?;
        let version = config.handshake.accept(response).map_err(BoltError::from)?;
        info!(%version, "Bolt handshake completed");

        Ok(Self::new(stream, version, config))
    }

    /// 이미 버전이 협상된 스트림으로 채널 생성
    pub fn new(stream: T, version: BoltVersion, config: ConnectionConfig) -> Self {
        let codec = BoltCodec::with_limits(
            MessageFormat::new(version),
            config.max_chunk_size,
            config.max_message_size,
        );
        Self {
            framed: Framed::new(stream, codec),
            dispatcher: InboundMessageDispatcher::new(),
            connection: Arc::new(ChannelConnection::new(version)),
            config,
            server: None,
        }
    }

    /// 협상된 프로토콜 버전
    pub fn protocol_version(&self) -> BoltVersion {
        self.connection.version
    }

    /// 현재 메시지 형식 (패치 반영)
    pub fn format(&self) -> &MessageFormat {
        self.framed.codec().format()
    }

    /// 핸들러에 넘길 연결
    pub fn connection(&self) -> Arc<dyn Connection> {
        self.connection.clone()
    }

    /// 연결 반환 횟수
    pub fn release_count(&self) -> usize {
        self.connection.release_count()
    }

    /// 응답 디스패처
    pub fn dispatcher(&self) -> &InboundMessageDispatcher {
        &self.dispatcher
    }

    /// 연결 설정
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// HELLO SUCCESS가 알려 준 서버 에이전트
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// HELLO 교환. 서버가 수락한 패치를 이후 메시지부터 적용합니다
    pub async fn hello(&mut self) -> DriverResult<Metadata> {
        let mut hello =
            HelloMessage::new(&self.config.user_agent).with_auth(self.config.auth.clone());
        if let Some(routing) = &self.config.routing {
            hello = hello.with_routing(routing.clone());
        }
        if let Some(patches) = self.format().hello_patches() {
            hello = hello.with_patches(patches);
        }

        let (handler, rx) = HelloResponseHandler::new();
        self.submit(hello.into(), Box::new(handler)).await?;
        self.run_until_idle().await?;
        let metadata = rx
            .await
            .map_err(|_| DriverError::connection_terminated("HELLO response was never received"))??;

        let success = SuccessMessage::with_metadata(metadata);
        let patches = success.patch_bolt();
        if !patches.is_empty() {
            self.framed.codec_mut().apply_patches(&patches);
        }
        self.server = success.server().map(str::to_string);
        info!(
            server = self.server.as_deref().unwrap_or("unknown"),
            format = %self.format(),
            "connection initialized"
        );
        Ok(success.metadata)
    }

    /// 요청 전송과 핸들러 등록
    ///
    /// 인코딩 실패는 이 요청에만 해당하므로 연결은 계속 쓸 수 있습니다.
    /// 쓰기 실패는 연결 전체를 치명 상태로 만듭니다.
    pub async fn submit(
        &mut self,
        request: BoltRequest,
        mut handler: Box<dyn ResponseHandler>,
    ) -> DriverResult<()> {
        if let Some(fatal) = self.dispatcher.fatal_error() {
            let error = fatal.clone();
            handler.on_failure(error.clone());
            return Err(error);
        }
        let is_reset = matches!(request, BoltRequest::Reset);
        if self.dispatcher.needs_reset() && !is_reset && !matches!(request, BoltRequest::Goodbye) {
            handler.on_failure(DriverError::ResetRequired);
            return Err(DriverError::ResetRequired);
        }

        if let Err(e) = self.framed.feed(BoltMessage::from(request)).await {
            let error = DriverError::from(e);
            handler.on_failure(error.clone());
            if !matches!(error, DriverError::Encode(_)) {
                self.dispatcher.handle_fatal_error(error.clone());
            }
            return Err(error);
        }

        if is_reset {
            self.dispatcher.enqueue_reset(handler);
        } else {
            self.dispatcher.enqueue(handler);
        }
        self.flush().await
    }

    /// 응답 메시지 하나를 읽어 디스패치
    pub async fn process_next(&mut self) -> DriverResult<()> {
        if let Some(fatal) = self.dispatcher.fatal_error() {
            return Err(fatal.clone());
        }

        match self.framed.next().await {
            Some(Ok(message)) => {
                self.dispatcher.dispatch(message);
                self.flush_outbox().await
            }
            Some(Err(e)) => Err(self.fail(DriverError::from(e))),
            None => Err(self.fail(DriverError::connection_terminated(
                "Connection closed by server",
            ))),
        }
    }

    /// 대기 중인 핸들러가 모두 응답을 받을 때까지 처리
    ///
    /// 수요를 기다리는 스트림은 핸들러가 없으므로 여기서 멈춥니다.
    pub async fn run_until_idle(&mut self) -> DriverResult<()> {
        loop {
            self.flush_outbox().await?;
            if self.dispatcher.queued_handlers() == 0 {
                if let Some(fatal) = self.dispatcher.fatal_error() {
                    return Err(fatal.clone());
                }
                return Ok(());
            }
            self.process_next().await?;
        }
    }

    /// RESET 전송 후 응답 대기
    pub async fn reset(&mut self) -> DriverResult<()> {
        let (handler, rx) = ResetResponseHandler::new();
        self.submit(BoltRequest::Reset, Box::new(handler)).await?;
        self.run_until_idle().await?;
        rx.await
            .map_err(|_| DriverError::connection_terminated("RESET response was never received"))?
    }

    /// 연결 종료. GOODBYE는 최선 노력으로 보냅니다
    pub async fn close(mut self) -> DriverResult<()> {
        if !self.dispatcher.is_fatal() {
            if let Err(e) = self.framed.send(BoltMessage::from(BoltRequest::Goodbye)).await {
                debug!(error = %e, "failed to send GOODBYE");
            }
        }
        self.dispatcher
            .handle_fatal_error(DriverError::connection_terminated("Connection closed by client"));
        for (_, mut handler) in self.connection.take_outbox() {
            handler.on_failure(DriverError::connection_terminated("Connection closed by client"));
        }
        self.framed
            .get_mut()
            .shutdown()
            .await
            .map_err(BoltError::from)?;
        Ok(())
    }

    async fn flush(&mut self) -> DriverResult<()> {
        if let Err(e) = SinkExt::<BoltMessage>::flush(&mut self.framed).await {
            return Err(self.fail(DriverError::from(e)));
        }
        Ok(())
    }

    /// 핸들러가 쌓은 요청을 전송
    async fn flush_outbox(&mut self) -> DriverResult<()> {
        let pending = self.connection.take_outbox();
        if pending.is_empty() {
            return Ok(());
        }

        for (request, mut handler) in pending {
            if let Some(fatal) = self.dispatcher.fatal_error() {
                handler.on_failure(fatal.clone());
                continue;
            }
            match self.framed.feed(BoltMessage::from(request)).await {
                Ok(()) => self.dispatcher.enqueue(handler),
                Err(e) => {
                    let error = DriverError::from(e);
                    handler.on_failure(error.clone());
                    if !matches!(error, DriverError::Encode(_)) {
                        self.dispatcher.handle_fatal_error(error);
                    }
                }
            }
        }

        if let Some(fatal) = self.dispatcher.fatal_error() {
            return Err(fatal.clone());
        }
        self.flush().await
    }

    fn fail(&mut self, error: DriverError) -> DriverError {
        warn!(%error, "closing channel");
        self.dispatcher.handle_fatal_error(error.clone());
        for (_, mut handler) in self.connection.take_outbox() {
            handler.on_failure(error.clone());
        }
        error
    }
}

impl<T> std::fmt::Debug for BoltChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltChannel")
            .field("format", self.framed.codec().format())
            .field("dispatcher", &self.dispatcher)
            .field("connection", &self.connection)
            .field("server", &self.server)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
