//! Bolt protocol request messages.
//!
//! Request messages are sent from the client to the server. Field layout on
//! the wire is handled by [`crate::bolt::format::MessageFormat`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::tag;
use crate::bolt::value::{fmt_map, Value};

/// Record count meaning "everything that is left".
pub const FETCH_ALL: i64 = -1;

/// Query id meaning "the most recently started query".
pub const ABSENT_QUERY_ID: i64 = -1;

/// Access mode for transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read-write access (default)
    #[default]
    Write,
    /// Read-only access
    Read,
}

impl AccessMode {
    /// Convert to string for metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "r",
            AccessMode::Write => "w",
        }
    }
}

/// Authentication token carried inside HELLO.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    /// Authentication scheme (e.g., "basic", "bearer")
    pub scheme: String,
    /// Principal (username)
    pub principal: Option<String>,
    /// Credentials (password)
    pub credentials: Option<String>,
    /// Realm
    pub realm: Option<String>,
    /// Scheme-specific parameters
    pub parameters: Option<HashMap<String, Value>>,
}

impl AuthToken {
    /// Create a basic auth token.
    pub fn basic(principal: &str, credentials: &str) -> Self {
        Self {
            scheme: "basic".to_string(),
            principal: Some(principal.to_string()),
            credentials: Some(credentials.to_string()),
            realm: None,
            parameters: None,
        }
    }

    /// Create a bearer token.
    pub fn bearer(token: &str) -> Self {
        Self {
            scheme: "bearer".to_string(),
            principal: None,
            credentials: Some(token.to_string()),
            realm: None,
            parameters: None,
        }
    }

    /// Create an anonymous auth token (no auth).
    pub fn none() -> Self {
        Self {
            scheme: "none".to_string(),
            principal: None,
            credentials: None,
            realm: None,
            parameters: None,
        }
    }
}

/// All Bolt request messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltRequest {
    /// HELLO - Initialize connection
    Hello(HelloMessage),
    /// GOODBYE - Close connection gracefully
    Goodbye,
    /// RESET - Reset connection state
    Reset,
    /// RUN - Execute a query
    Run(RunMessage),
    /// BEGIN - Start transaction
    Begin(BeginMessage),
    /// COMMIT - Commit transaction
    Commit,
    /// ROLLBACK - Rollback transaction
    Rollback,
    /// PULL - Pull results
    Pull(PullMessage),
    /// DISCARD - Discard results
    Discard(DiscardMessage),
}

impl BoltRequest {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltRequest::Hello(_) => tag::HELLO,
            BoltRequest::Goodbye => tag::GOODBYE,
            BoltRequest::Reset => tag::RESET,
            BoltRequest::Run(_) => tag::RUN,
            BoltRequest::Begin(_) => tag::BEGIN,
            BoltRequest::Commit => tag::COMMIT,
            BoltRequest::Rollback => tag::ROLLBACK,
            BoltRequest::Pull(_) => tag::PULL,
            BoltRequest::Discard(_) => tag::DISCARD,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Hello(_) => "HELLO",
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Reset => "RESET",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Begin(_) => "BEGIN",
            BoltRequest::Commit => "COMMIT",
            BoltRequest::Rollback => "ROLLBACK",
            BoltRequest::Pull(_) => "PULL",
            BoltRequest::Discard(_) => "DISCARD",
        }
    }
}

macro_rules! impl_from_message {
    ($($message:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$message> for BoltRequest {
                fn from(msg: $message) -> Self {
                    BoltRequest::$variant(msg)
                }
            }
        )+
    };
}

impl_from_message! {
    HelloMessage => Hello,
    RunMessage => Run,
    BeginMessage => Begin,
    PullMessage => Pull,
    DiscardMessage => Discard,
}

impl fmt::Display for BoltRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltRequest::Hello(msg) => write!(f, "HELLO {}", msg),
            BoltRequest::Run(msg) => {
                write!(f, "RUN \"{}\" ", msg.query)?;
                fmt_map(f, &msg.parameters)?;
                write!(f, " ")?;
                fmt_map(f, &msg.extra)
            }
            BoltRequest::Begin(msg) => {
                write!(f, "BEGIN ")?;
                fmt_map(f, &msg.extra)
            }
            BoltRequest::Pull(msg) => write!(f, "PULL {}", msg),
            BoltRequest::Discard(msg) => write!(f, "DISCARD {}", msg),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// HELLO message - Initialize connection.
#[derive(Debug, Clone, PartialEq)]
pub struct HelloMessage {
    /// User agent string
    pub user_agent: String,
    /// Authentication token
    pub auth: Option<AuthToken>,
    /// Routing context
    pub routing: Option<HashMap<String, Value>>,
    /// Wire format patches the client is willing to use
    pub patch_bolt: Option<Vec<String>>,
    /// Additional extra data
    pub extra: HashMap<String, Value>,
}

impl HelloMessage {
    /// Create a new HELLO message.
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            auth: None,
            routing: None,
            patch_bolt: None,
            extra: HashMap::new(),
        }
    }

    /// Set authentication.
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set routing context.
    pub fn with_routing(mut self, routing: HashMap<String, Value>) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Advertise wire format patches.
    pub fn with_patches(mut self, patches: Vec<String>) -> Self {
        self.patch_bolt = Some(patches);
        self
    }
}

impl fmt::Display for HelloMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{user_agent: \"{}\"", self.user_agent)?;
        if let Some(auth) = &self.auth {
            write!(f, ", scheme: \"{}\"", auth.scheme)?;
            if let Some(principal) = &auth.principal {
                write!(f, ", principal: \"{}\"", principal)?;
            }
            if auth.credentials.is_some() {
                write!(f, ", credentials: ******")?;
            }
        }
        if let Some(patches) = &self.patch_bolt {
            write!(f, ", patch_bolt: {:?}", patches)?;
        }
        write!(f, "}}")
    }
}

/// RUN message - Execute a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMessage {
    /// Query text
    pub query: String,
    /// Query parameters
    pub parameters: HashMap<String, Value>,
    /// Extra metadata (db, bookmarks, mode, ...)
    pub extra: HashMap<String, Value>,
}

impl RunMessage {
    /// Create a new RUN message.
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            parameters: HashMap::new(),
            extra: HashMap::new(),
        }
    }

    /// Set query parameters.
    pub fn with_parameters(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters = params;
        self
    }

    /// Add a single query parameter.
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// Set database name.
    pub fn with_database(mut self, db: &str) -> Self {
        self.extra.insert("db".to_string(), Value::String(db.to_string()));
        self
    }

    /// Set bookmark(s).
    pub fn with_bookmarks(mut self, bookmarks: Vec<String>) -> Self {
        insert_bookmarks(&mut self.extra, bookmarks);
        self
    }

    /// Set access mode. Write is the server default and is not sent.
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        insert_mode(&mut self.extra, mode);
        self
    }
}

/// BEGIN message - Start a transaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeginMessage {
    /// Extra metadata (db, bookmarks, tx_timeout, tx_metadata, mode)
    pub extra: HashMap<String, Value>,
}

impl BeginMessage {
    /// Create a new BEGIN message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bookmarks.
    pub fn with_bookmarks(mut self, bookmarks: Vec<String>) -> Self {
        insert_bookmarks(&mut self.extra, bookmarks);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        self.extra.insert("tx_timeout".to_string(), Value::Integer(millis));
        self
    }

    /// Set access mode.
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        insert_mode(&mut self.extra, mode);
        self
    }

    /// Set database.
    pub fn with_database(mut self, db: &str) -> Self {
        self.extra.insert("db".to_string(), Value::String(db.to_string()));
        self
    }

    /// Set transaction metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        if !metadata.is_empty() {
            self.extra.insert("tx_metadata".to_string(), Value::Map(metadata));
        }
        self
    }
}

fn insert_bookmarks(extra: &mut HashMap<String, Value>, bookmarks: Vec<String>) {
    if !bookmarks.is_empty() {
        let list = bookmarks.into_iter().map(Value::String).collect();
        extra.insert("bookmarks".to_string(), Value::List(list));
    }
}

fn insert_mode(extra: &mut HashMap<String, Value>, mode: AccessMode) {
    match mode {
        AccessMode::Read => {
            extra.insert("mode".to_string(), Value::String("r".to_string()));
        }
        AccessMode::Write => {
            extra.remove("mode");
        }
    }
}

/// PULL message - Pull query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullMessage {
    /// Number of records to pull ([`FETCH_ALL`] for all)
    pub n: i64,
    /// Query ID; [`ABSENT_QUERY_ID`] targets the last query
    pub qid: i64,
}

impl PullMessage {
    /// Create a PULL ALL message.
    pub fn all() -> Self {
        Self::new(FETCH_ALL, ABSENT_QUERY_ID)
    }

    /// Create a PULL with count and query id.
    pub fn new(n: i64, qid: i64) -> Self {
        Self { n, qid }
    }
}

impl fmt::Display for PullMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{n: {}, qid: {}}}", self.n, self.qid)
    }
}

/// DISCARD message - Discard query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscardMessage {
    /// Number of records to discard ([`FETCH_ALL`] for all)
    pub n: i64,
    /// Query ID; [`ABSENT_QUERY_ID`] targets the last query
    pub qid: i64,
}

impl DiscardMessage {
    /// Create a DISCARD ALL message.
    pub fn all() -> Self {
        Self::new(FETCH_ALL, ABSENT_QUERY_ID)
    }

    /// Create a DISCARD with count and query id.
    pub fn new(n: i64, qid: i64) -> Self {
        Self { n, qid }
    }
}

impl fmt::Display for DiscardMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{n: {}, qid: {}}}", self.n, self.qid)
    }
}
