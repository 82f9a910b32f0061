//! # Zeta4G Bolt
//!
//! Bolt wire-protocol engine for the [Zeta4G](https://github.com/zeta9044/zeta4g)
//! graph database: chunk framing, response dispatch and demand-driven result
//! streaming over one persistent connection.
//!
//! ## Features
//!
//! - **Chunked framing** - Messages split into 65535-byte chunks with zero-length terminators
//! - **Versioned wire format** - Bolt 3 to 5, including the `utc` date-time patch
//! - **FIFO dispatch** - Responses correlated to requests in submission order
//! - **Backpressure** - PULL/DISCARD flow control driven by consumer demand
//! - **Async/Await** - `tokio_util` codec over any `AsyncRead + AsyncWrite` transport
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tokio::net::TcpStream;
//! use zeta4g_bolt::bolt::{AuthToken, RunMessage};
//! use zeta4g_bolt::driver::{
//!     BoltChannel, ConnectionConfig, DefaultBookmarkHolder, MetadataExtractor,
//!     PullResponseHandler, RunResponseHandler, SessionPullCompletionListener,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("localhost:7687").await?;
//! let config = ConnectionConfig::builder()
//!     .with_auth(AuthToken::basic("zeta4g", "password"))
//!     .build()?;
//!
//! let mut channel = BoltChannel::connect(stream, config).await?;
//! channel.hello().await?;
//!
//! let run = RunResponseHandler::new(MetadataExtractor::for_version(channel.protocol_version()));
//! channel.submit(RunMessage::new("MATCH (n) RETURN n").into(), Box::new(run.clone())).await?;
//!
//! let bookmarks = Arc::new(DefaultBookmarkHolder::new());
//! let listener = SessionPullCompletionListener::new(channel.connection(), bookmarks);
//! let pull = PullResponseHandler::new(
//!     "MATCH (n) RETURN n",
//!     run.clone(),
//!     channel.connection(),
//!     Box::new(listener),
//! );
//! pull.install_record_consumer(|record, error| {
//!     if let Some(record) = record {
//!         println!("{:?}", record);
//!     } else if let Some(error) = error {
//!         eprintln!("failed: {}", error);
//!     }
//! });
//! pull.request(channel.config().fetch_size)?;
//! channel.run_until_idle().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`bolt`] - Wire level: PackStream, values, messages, format, codec, handshake
//! - [`driver`] - Engine level: dispatcher, response handlers, summaries, channel
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use bolt::{BoltCodec, BoltError, BoltMessage, BoltVersion, MessageFormat, Value};
pub use driver::{
    BoltChannel, Bookmark, ConnectionConfig, DriverError, DriverResult, InboundMessageDispatcher,
    PullResponseHandler, ResponseHandler, ResultSummary,
};
