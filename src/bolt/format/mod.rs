//! Versioned message format.
//!
//! A [`MessageFormat`] decides how typed [`Value`](crate::bolt::value::Value)s
//! and [`BoltMessage`]s map onto PackStream structures for one negotiated
//! protocol version and patch set. Formats are immutable; negotiating a
//! patch produces a new format that the codec swaps in.

mod reader;
mod temporal;
mod writer;

use std::fmt;

use bytes::BytesMut;

use crate::bolt::handshake::BoltVersion;
use crate::bolt::message::BoltMessage;
use crate::bolt::packstream::PackStreamError;

pub use reader::MAX_NESTING_DEPTH;
use reader::ValueReader;
use writer::ValueWriter;

/// Patch that switches legacy date-time structures to UTC-based ones.
pub const UTC_PATCH: &str = "utc";

/// Structure tags of typed values.
pub mod tags {
    /// Node
    pub const NODE: u8 = 0x4E;
    /// Relationship
    pub const RELATIONSHIP: u8 = 0x52;
    /// Relationship inside a Path
    pub const UNBOUND_RELATIONSHIP: u8 = 0x72;
    /// Path
    pub const PATH: u8 = 0x50;
    /// Point2D
    pub const POINT_2D: u8 = 0x58;
    /// Point3D
    pub const POINT_3D: u8 = 0x59;
    /// Date
    pub const DATE: u8 = 0x44;
    /// Time
    pub const TIME: u8 = 0x54;
    /// LocalTime
    pub const LOCAL_TIME: u8 = 0x74;
    /// LocalDateTime
    pub const LOCAL_DATE_TIME: u8 = 0x64;
    /// Duration
    pub const DURATION: u8 = 0x45;
    /// DateTime with local wall-clock seconds
    pub const DATE_TIME_LEGACY: u8 = 0x46;
    /// DateTimeZoneId with local wall-clock seconds
    pub const DATE_TIME_ZONE_ID_LEGACY: u8 = 0x66;
    /// DateTime with UTC seconds
    pub const DATE_TIME_UTC: u8 = 0x49;
    /// DateTimeZoneId with UTC seconds
    pub const DATE_TIME_ZONE_ID_UTC: u8 = 0x69;
}

/// Message (de)serialization rules for one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFormat {
    version: BoltVersion,
    utc_patch: bool,
}

impl MessageFormat {
    /// Create the base format for a version.
    pub fn new(version: BoltVersion) -> Self {
        Self {
            version,
            utc_patch: false,
        }
    }

    /// Protocol version.
    pub fn version(&self) -> BoltVersion {
        self.version
    }

    /// Return a format with the given negotiated patches applied.
    ///
    /// Unknown patches are ignored; applying a patch twice is a no-op.
    pub fn with_patches<S: AsRef<str>>(&self, patches: &[S]) -> Self {
        let mut format = *self;
        for patch in patches {
            if patch.as_ref() == UTC_PATCH {
                format.utc_patch = true;
            }
        }
        format
    }

    /// Names of the patches applied to this format.
    pub fn patches(&self) -> Vec<&'static str> {
        if self.utc_patch {
            vec![UTC_PATCH]
        } else {
            Vec::new()
        }
    }

    /// Check if date-times are written and read against UTC.
    pub fn date_time_utc(&self) -> bool {
        self.utc_patch || self.version.utc_date_time_by_default()
    }

    /// Patches a client should advertise in HELLO for this version.
    pub fn hello_patches(&self) -> Option<Vec<String>> {
        if self.version.supports_utc_patch() {
            Some(vec![UTC_PATCH.to_string()])
        } else {
            None
        }
    }

    /// Serialize one message, appending its bytes to `dst`.
    ///
    /// On error `dst` may hold a partial message; callers truncate.
    pub fn write_message(&self, message: &BoltMessage, dst: &mut BytesMut) -> Result<(), PackStreamError> {
        match message {
            BoltMessage::Request(request) => ValueWriter::new(self, dst, false).write_request(request),
            BoltMessage::Response(response) => ValueWriter::new(self, dst, true).write_response(response),
        }
    }

    /// Deserialize exactly one message from `src`.
    pub fn read_message(&self, src: &[u8]) -> Result<BoltMessage, PackStreamError> {
        ValueReader::new(self, src).read_message()
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bolt {}", self.version)?;
        if self.utc_patch {
            write!(f, " +{}", UTC_PATCH)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

    use super::*;
    use crate::bolt::message::{
        AuthToken, BeginMessage, BoltRequest, BoltResponse, DiscardMessage, FailureMessage,
        HelloMessage, PullMessage, RecordMessage, RunMessage, SuccessMessage,
    };
    use crate::bolt::value::{
        Duration, Node, OffsetTime, Path, Point, Relationship, UnboundRelationship, Value,
        ZonedDateTime,
    };

    fn write(format: &MessageFormat, msg: impl Into<BoltMessage>) -> Vec<u8> {
        let mut buf = BytesMut::new();
        format.write_message(&msg.into(), &mut buf).unwrap();
        buf.to_vec()
    }

    fn roundtrip(format: &MessageFormat, msg: impl Into<BoltMessage>) -> BoltMessage {
        let msg = msg.into();
        let mut buf = BytesMut::new();
        format.write_message(&msg, &mut buf).unwrap();
        let back = format.read_message(&buf).unwrap();
        assert_eq!(back, msg);
        back
    }

    fn record(values: Vec<Value>) -> BoltResponse {
        BoltResponse::Record(RecordMessage::new(values))
    }

    #[test]
    fn test_patches() {
        let base = MessageFormat::new(BoltVersion::V4_4);
        assert!(!base.date_time_utc());
        assert!(base.patches().is_empty());

        let patched = base.with_patches(&["utc", "something-else"]);
        assert!(patched.date_time_utc());
        assert_eq!(patched.patches(), vec!["utc"]);
        assert_eq!(patched.with_patches(&["utc"]), patched);
        assert_eq!(patched.to_string(), "Bolt 4.4 +utc");

        assert!(MessageFormat::new(BoltVersion::V5_0).date_time_utc());
        assert_eq!(base.hello_patches(), Some(vec!["utc".to_string()]));
        assert_eq!(MessageFormat::new(BoltVersion::V4_2).hello_patches(), None);
    }

    #[test]
    fn test_simple_requests_bytes() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        assert_eq!(write(&format, BoltRequest::Reset), vec![0xB0, 0x0F]);
        assert_eq!(write(&format, BoltRequest::Goodbye), vec![0xB0, 0x02]);
        assert_eq!(write(&format, BoltRequest::Commit), vec![0xB0, 0x12]);
        assert_eq!(write(&format, BoltRequest::Rollback), vec![0xB0, 0x13]);
    }

    #[test]
    fn test_pull_bytes() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        assert_eq!(
            write(&format, BoltRequest::Pull(PullMessage::all())),
            vec![0xB1, 0x3F, 0xA1, 0x81, b'n', 0xFF]
        );
        let bytes = write(&format, BoltRequest::Discard(DiscardMessage::new(5, 3)));
        assert_eq!(&bytes[..3], &[0xB1, 0x2F, 0xA2]);
        roundtrip(&format, BoltRequest::Discard(DiscardMessage::new(5, 3)));
        roundtrip(&format, BoltRequest::Pull(PullMessage::new(100, -1)));
    }

    #[test]
    fn test_bolt3_flow_control() {
        let format = MessageFormat::new(BoltVersion::V3_0);
        assert_eq!(write(&format, BoltRequest::Pull(PullMessage::all())), vec![0xB0, 0x3F]);
        assert_eq!(write(&format, BoltRequest::Discard(DiscardMessage::all())), vec![0xB0, 0x2F]);
        roundtrip(&format, BoltRequest::Pull(PullMessage::all()));

        let mut buf = BytesMut::new();
        let err = format
            .write_message(&BoltRequest::Pull(PullMessage::new(10, -1)).into(), &mut buf)
            .unwrap_err();
        assert!(matches!(err, PackStreamError::UnsupportedValue(_)));
    }

    #[test]
    fn test_request_roundtrips() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        let hello = HelloMessage::new("zeta4g-bolt/0.1")
            .with_auth(AuthToken::basic("neo4j", "pw"))
            .with_patches(vec!["utc".into()]);
        roundtrip(&format, BoltRequest::Hello(hello));
        roundtrip(&format, BoltRequest::Hello(HelloMessage::new("agent")));

        let run = RunMessage::new("RETURN $x")
            .with_param("x", vec![Value::Integer(1), Value::from("a")])
            .with_database("neo4j");
        roundtrip(&format, BoltRequest::Run(run));
        roundtrip(&format, BoltRequest::Begin(BeginMessage::new().with_database("db")));
    }

    #[test]
    fn test_response_roundtrips() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        roundtrip(&format, BoltResponse::Success(SuccessMessage::run_success(vec!["n".into()], Some(0))));
        roundtrip(&format, BoltResponse::Failure(FailureMessage::new("Neo.ClientError.X", "bad")));
        roundtrip(&format, BoltResponse::Ignored);
        roundtrip(
            &format,
            record(vec![
                Value::Null,
                Value::Boolean(true),
                Value::Float(1.25),
                Value::Bytes(vec![1, 2, 3]),
                Value::Map(HashMap::from([("k".to_string(), Value::Integer(-300))])),
            ]),
        );
    }

    #[test]
    fn test_failure_requires_code() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        // FAILURE {message: "x"}
        let bytes = [0xB1, 0x7F, 0xA1, 0x87, b'm', b'e', b's', b's', b'a', b'g', b'e', 0x81, b'x'];
        assert!(matches!(
            format.read_message(&bytes),
            Err(PackStreamError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        assert_eq!(
            format.read_message(&[0xB0, 0x7E, 0x00]),
            Err(PackStreamError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_unknown_message_tag() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        assert!(matches!(
            format.read_message(&[0xB0, 0x66]),
            Err(PackStreamError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_graph_values_rejected_in_requests() {
        let format = MessageFormat::new(BoltVersion::V5_0);
        let node = Value::Node(Node::new(1, vec![], HashMap::new()));
        let run = RunMessage::new("RETURN $n").with_param("n", node);
        let mut buf = BytesMut::new();
        let err = format.write_message(&BoltRequest::Run(run).into(), &mut buf).unwrap_err();
        assert!(matches!(err, PackStreamError::UnsupportedValue(_)));
    }

    #[test]
    fn test_graph_values_v4() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        let a = Node::new(1, vec!["Person".into()], HashMap::from([("name".into(), Value::from("A"))]));
        let b = Node::new(2, vec![], HashMap::new());
        let rel = Relationship::new(10, 1, 2, "KNOWS", HashMap::new());
        let path = Path::new(
            vec![a.clone(), b.clone()],
            vec![UnboundRelationship::new(10, "KNOWS", HashMap::new())],
            vec![1, 1],
        );
        let back = roundtrip(
            &format,
            record(vec![Value::Node(a), Value::Relationship(rel), Value::Path(path)]),
        );
        if let Some(BoltResponse::Record(r)) = back.into_response() {
            assert_eq!(r.get(0).and_then(Value::as_node).map(|n| n.element_id.as_str()), Some("1"));
        } else {
            panic!("expected record");
        }
    }

    #[test]
    fn test_graph_values_v5_element_ids() {
        let format = MessageFormat::new(BoltVersion::V5_0);
        let node = Node::new(1, vec![], HashMap::new()).with_element_id("4:abc:1");
        let mut rel = Relationship::new(7, 1, 2, "R", HashMap::new());
        rel.element_id = "5:abc:7".into();
        rel.start_node_element_id = "4:abc:1".into();
        rel.end_node_element_id = "4:abc:2".into();
        roundtrip(&format, record(vec![Value::Node(node), Value::Relationship(rel)]));
    }

    #[test]
    fn test_node_size_checked_per_version() {
        // Node with 3 fields is invalid on 5.0
        let bytes = [0xB1, 0x71, 0x91, 0xB3, 0x4E, 0x01, 0x90, 0xA0];
        assert!(MessageFormat::new(BoltVersion::V4_4).read_message(&bytes).is_ok());
        assert!(MessageFormat::new(BoltVersion::V5_0).read_message(&bytes).is_err());
    }

    #[test]
    fn test_spatial_and_temporal_roundtrip() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        let time = NaiveTime::from_hms_nano_opt(23, 59, 59, 999).unwrap();
        roundtrip(
            &format,
            record(vec![
                Value::Point(Point::cartesian_2d(1.0, 2.0)),
                Value::Point(Point::cartesian_3d(1.0, 2.0, 3.0)),
                Value::Date(date),
                Value::Time(OffsetTime::new(time, -3600)),
                Value::LocalTime(time),
                Value::LocalDateTime(date.and_time(time)),
                Value::Duration(Duration::new(1, 2, 3, 4)),
                Value::DateTimeZoneId(ZonedDateTime::new(100, 0, "Europe/Stockholm")),
            ]),
        );
    }

    #[test]
    fn test_date_time_legacy_vs_utc_bytes() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = DateTime::from_timestamp(0, 0).unwrap().with_timezone(&offset);
        let msg = record(vec![Value::DateTime(dt)]);

        let legacy = MessageFormat::new(BoltVersion::V4_4);
        // RECORD [DateTime(3600, 0, 3600)]
        assert_eq!(
            write(&legacy, msg.clone()),
            vec![0xB1, 0x71, 0x91, 0xB3, 0x46, 0xC9, 0x0E, 0x10, 0x00, 0xC9, 0x0E, 0x10]
        );

        let utc = legacy.with_patches(&["utc"]);
        assert_eq!(
            write(&utc, msg.clone()),
            vec![0xB1, 0x71, 0x91, 0xB3, 0x49, 0x00, 0x00, 0xC9, 0x0E, 0x10]
        );

        roundtrip(&legacy, msg.clone());
        roundtrip(&utc, msg);
    }

    #[test]
    fn test_date_time_mode_mismatch_rejected() {
        let legacy = MessageFormat::new(BoltVersion::V4_4);
        let utc = legacy.with_patches(&["utc"]);
        let legacy_bytes = [0xB1, 0x71, 0x91, 0xB3, 0x46, 0x00, 0x00, 0x00];
        let utc_bytes = [0xB1, 0x71, 0x91, 0xB3, 0x69, 0x00, 0x00, 0x81, b'Z'];

        assert!(legacy.read_message(&legacy_bytes).is_ok());
        assert!(utc.read_message(&legacy_bytes).is_err());
        assert!(utc.read_message(&utc_bytes).is_ok());
        assert!(legacy.read_message(&utc_bytes).is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        let mut bytes = vec![0xB1, 0x71];
        bytes.extend(std::iter::repeat(0x91).take(500_000));
        bytes.push(0x01);

        let err = format.read_message(&bytes).unwrap_err();
        assert!(matches!(err, PackStreamError::InvalidStructure(_)));
        assert!(err.to_string().contains("nesting too deep"));
    }

    #[test]
    fn test_nesting_at_limit_accepted() {
        let format = MessageFormat::new(BoltVersion::V4_4);
        // RECORD fields list is the first level
        let mut bytes = vec![0xB1, 0x71];
        bytes.extend(std::iter::repeat(0x91).take(MAX_NESTING_DEPTH - 1));
        bytes.push(0x01);

        assert!(format.read_message(&bytes).is_ok());
    }
}
