//! Typed value and message deserialization.

use std::collections::HashMap;

use super::temporal;
use super::{tags, MessageFormat};
use crate::bolt::message::{
    tag, AuthToken, BeginMessage, BoltMessage, BoltRequest, BoltResponse, DiscardMessage,
    FailureMessage, HelloMessage, PullMessage, RecordMessage, RunMessage, SuccessMessage,
    ABSENT_QUERY_ID, FETCH_ALL,
};
use crate::bolt::packstream::{PackStreamDecoder, PackStreamError, PackType};
use crate::bolt::value::{
    Duration, Node, OffsetTime, Path, Point, Relationship, UnboundRelationship, Value,
    ZonedDateTime,
};

/// Deepest value nesting accepted from the wire.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Unpacks typed values for one message.
pub(super) struct ValueReader<'f, 'a> {
    dec: PackStreamDecoder<'a>,
    format: &'f MessageFormat,
    depth: usize,
}

impl<'f, 'a> ValueReader<'f, 'a> {
    pub(super) fn new(format: &'f MessageFormat, src: &'a [u8]) -> Self {
        Self {
            dec: PackStreamDecoder::new(src),
            format,
            depth: 0,
        }
    }

    pub(super) fn read_message(&mut self) -> Result<BoltMessage, PackStreamError> {
        let (size, msg_tag) = self.dec.unpack_struct_header()?;
        let message = match msg_tag {
            tag::SUCCESS => {
                expect_fields("SUCCESS", size, 1)?;
                BoltResponse::Success(SuccessMessage::with_metadata(self.read_map()?)).into()
            }
            tag::RECORD => {
                expect_fields("RECORD", size, 1)?;
                BoltResponse::Record(RecordMessage::new(self.read_list()?)).into()
            }
            tag::FAILURE => {
                expect_fields("FAILURE", size, 1)?;
                let metadata = self.read_map()?;
                BoltResponse::Failure(FailureMessage::new(
                    required_str(&metadata, "FAILURE", "code")?,
                    required_str(&metadata, "FAILURE", "message")?,
                ))
                .into()
            }
            tag::IGNORED => {
                self.skip_fields(size)?;
                BoltResponse::Ignored.into()
            }
            tag::HELLO => {
                expect_fields("HELLO", size, 1)?;
                BoltRequest::Hello(hello_from_extra(self.read_map()?)).into()
            }
            tag::RUN => {
                expect_fields("RUN", size, 3)?;
                let query = self.dec.unpack_string()?;
                let parameters = self.read_map()?;
                let extra = self.read_map()?;
                BoltRequest::Run(RunMessage {
                    query,
                    parameters,
                    extra,
                })
                .into()
            }
            tag::BEGIN => {
                expect_fields("BEGIN", size, 1)?;
                BoltRequest::Begin(BeginMessage {
                    extra: self.read_map()?,
                })
                .into()
            }
            tag::PULL => {
                let (n, qid) = self.read_flow("PULL", size)?;
                BoltRequest::Pull(PullMessage::new(n, qid)).into()
            }
            tag::DISCARD => {
                let (n, qid) = self.read_flow("DISCARD", size)?;
                BoltRequest::Discard(DiscardMessage::new(n, qid)).into()
            }
            tag::GOODBYE => self.empty_request("GOODBYE", size, BoltRequest::Goodbye)?,
            tag::RESET => self.empty_request("RESET", size, BoltRequest::Reset)?,
            tag::COMMIT => self.empty_request("COMMIT", size, BoltRequest::Commit)?,
            tag::ROLLBACK => self.empty_request("ROLLBACK", size, BoltRequest::Rollback)?,
            other => {
                return Err(PackStreamError::InvalidStructure(format!(
                    "Unknown message tag: 0x{:02X}",
                    other
                )))
            }
        };
        if !self.dec.is_empty() {
            return Err(PackStreamError::TrailingBytes(self.dec.remaining()));
        }
        Ok(message)
    }

    fn empty_request(
        &mut self,
        name: &str,
        size: usize,
        request: BoltRequest,
    ) -> Result<BoltMessage, PackStreamError> {
        expect_fields(name, size, 0)?;
        Ok(request.into())
    }

    fn read_flow(&mut self, name: &str, size: usize) -> Result<(i64, i64), PackStreamError> {
        if !self.format.version().supports_bounded_pull() {
            expect_fields(name, size, 0)?;
            return Ok((FETCH_ALL, ABSENT_QUERY_ID));
        }
        expect_fields(name, size, 1)?;
        let extra = self.read_map()?;
        let n = extra.get("n").and_then(Value::as_int).ok_or_else(|| {
            PackStreamError::InvalidStructure(format!("{} requires integer 'n'", name))
        })?;
        let qid = extra.get("qid").and_then(Value::as_int).unwrap_or(ABSENT_QUERY_ID);
        Ok((n, qid))
    }

    fn skip_fields(&mut self, size: usize) -> Result<(), PackStreamError> {
        for _ in 0..size {
            self.read_value()?;
        }
        Ok(())
    }

    pub(super) fn read_value(&mut self) -> Result<Value, PackStreamError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(PackStreamError::InvalidStructure(format!(
                "nesting too deep (limit {})",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        let value = self.read_nested_value();
        self.depth -= 1;
        value
    }

    fn read_nested_value(&mut self) -> Result<Value, PackStreamError> {
        match self.dec.peek_type()? {
            PackType::Null => {
                self.dec.unpack_null()?;
                Ok(Value::Null)
            }
            PackType::Boolean => Ok(Value::Boolean(self.dec.unpack_bool()?)),
            PackType::Integer => Ok(Value::Integer(self.dec.unpack_int()?)),
            PackType::Float => Ok(Value::Float(self.dec.unpack_float()?)),
            PackType::Bytes => Ok(Value::Bytes(self.dec.unpack_bytes()?)),
            PackType::String => Ok(Value::String(self.dec.unpack_string()?)),
            PackType::List => Ok(Value::List(self.read_list()?)),
            PackType::Map => Ok(Value::Map(self.read_map()?)),
            PackType::Struct => {
                let (size, struct_tag) = self.dec.unpack_struct_header()?;
                self.read_struct(size, struct_tag)
            }
            PackType::Reserved => Err(PackStreamError::InvalidStructure(
                "reserved marker".to_string(),
            )),
        }
    }

    fn read_list(&mut self) -> Result<Vec<Value>, PackStreamError> {
        let len = self.dec.unpack_list_header()?;
        let mut items = Vec::with_capacity(len.min(self.dec.remaining()));
        for _ in 0..len {
            items.push(self.read_value()?);
        }
        Ok(items)
    }

    fn read_map(&mut self) -> Result<HashMap<String, Value>, PackStreamError> {
        let len = self.dec.unpack_map_header()?;
        let mut map = HashMap::with_capacity(len.min(self.dec.remaining()));
        for _ in 0..len {
            let key = self.dec.unpack_string()?;
            let value = self.read_value()?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn read_strings(&mut self) -> Result<Vec<String>, PackStreamError> {
        let len = self.dec.unpack_list_header()?;
        let mut items = Vec::with_capacity(len.min(self.dec.remaining()));
        for _ in 0..len {
            items.push(self.dec.unpack_string()?);
        }
        Ok(items)
    }

    fn read_struct(&mut self, size: usize, struct_tag: u8) -> Result<Value, PackStreamError> {
        let utc = self.format.date_time_utc();
        match struct_tag {
            tags::NODE => Ok(Value::Node(self.read_node(size)?)),
            tags::RELATIONSHIP => Ok(Value::Relationship(self.read_relationship(size)?)),
            tags::PATH => Ok(Value::Path(self.read_path(size)?)),
            tags::UNBOUND_RELATIONSHIP => Err(PackStreamError::InvalidStructure(
                "UnboundRelationship outside of a Path".to_string(),
            )),
            tags::POINT_2D => {
                expect_fields("Point2D", size, 3)?;
                let srid = self.read_srid()?;
                let x = self.dec.unpack_float()?;
                let y = self.dec.unpack_float()?;
                Ok(Value::Point(Point::new_2d(srid, x, y)))
            }
            tags::POINT_3D => {
                expect_fields("Point3D", size, 4)?;
                let srid = self.read_srid()?;
                let x = self.dec.unpack_float()?;
                let y = self.dec.unpack_float()?;
                let z = self.dec.unpack_float()?;
                Ok(Value::Point(Point::new_3d(srid, x, y, z)))
            }
            tags::DATE => {
                expect_fields("Date", size, 1)?;
                Ok(Value::Date(temporal::date_from_epoch_days(self.dec.unpack_int()?)?))
            }
            tags::TIME => {
                expect_fields("Time", size, 2)?;
                let time = temporal::time_from_nanos_of_day(self.dec.unpack_int()?)?;
                let offset = self.dec.unpack_int()?;
                let offset = i32::try_from(offset).map_err(|_| {
                    PackStreamError::InvalidStructure(format!("Time offset out of range: {}", offset))
                })?;
                Ok(Value::Time(OffsetTime::new(time, offset)))
            }
            tags::LOCAL_TIME => {
                expect_fields("LocalTime", size, 1)?;
                Ok(Value::LocalTime(temporal::time_from_nanos_of_day(self.dec.unpack_int()?)?))
            }
            tags::LOCAL_DATE_TIME => {
                expect_fields("LocalDateTime", size, 2)?;
                let seconds = self.dec.unpack_int()?;
                let nanos = self.dec.unpack_int()?;
                Ok(Value::LocalDateTime(temporal::local_from_epoch(seconds, nanos)?))
            }
            tags::DATE_TIME_LEGACY | tags::DATE_TIME_UTC => {
                self.check_date_time_mode(struct_tag, tags::DATE_TIME_UTC)?;
                expect_fields("DateTime", size, 3)?;
                let seconds = self.dec.unpack_int()?;
                let nanos = self.dec.unpack_int()?;
                let offset = self.dec.unpack_int()?;
                Ok(Value::DateTime(temporal::offset_date_time(seconds, nanos, offset, utc)?))
            }
            tags::DATE_TIME_ZONE_ID_LEGACY | tags::DATE_TIME_ZONE_ID_UTC => {
                self.check_date_time_mode(struct_tag, tags::DATE_TIME_ZONE_ID_UTC)?;
                expect_fields("DateTimeZoneId", size, 3)?;
                let seconds = self.dec.unpack_int()?;
                let nanos = self.dec.unpack_int()?;
                let zone_id = self.dec.unpack_string()?;
                Ok(Value::DateTimeZoneId(ZonedDateTime::new(seconds, nanos, zone_id)))
            }
            tags::DURATION => {
                expect_fields("Duration", size, 4)?;
                Ok(Value::Duration(Duration::new(
                    self.dec.unpack_int()?,
                    self.dec.unpack_int()?,
                    self.dec.unpack_int()?,
                    self.dec.unpack_int()?,
                )))
            }
            other => Err(PackStreamError::InvalidStructure(format!(
                "Unknown structure tag: 0x{:02X}",
                other
            ))),
        }
    }

    fn check_date_time_mode(&self, found: u8, utc_tag: u8) -> Result<(), PackStreamError> {
        let is_utc_tag = found == utc_tag;
        if is_utc_tag == self.format.date_time_utc() {
            Ok(())
        } else {
            Err(PackStreamError::InvalidStructure(format!(
                "Date-time structure 0x{:02X} is not valid when UTC encoding is {}",
                found,
                if self.format.date_time_utc() { "enabled" } else { "disabled" }
            )))
        }
    }

    fn read_srid(&mut self) -> Result<i32, PackStreamError> {
        let srid = self.dec.unpack_int()?;
        i32::try_from(srid)
            .map_err(|_| PackStreamError::InvalidStructure(format!("SRID out of range: {}", srid)))
    }

    fn element_id_fields(&self) -> usize {
        if self.format.version().uses_element_ids() {
            1
        } else {
            0
        }
    }

    fn read_node(&mut self, size: usize) -> Result<Node, PackStreamError> {
        expect_fields("Node", size, 3 + self.element_id_fields())?;
        let id = self.dec.unpack_int()?;
        let labels = self.read_strings()?;
        let properties = self.read_map()?;
        let mut node = Node::new(id, labels, properties);
        if self.element_id_fields() == 1 {
            node.element_id = self.dec.unpack_string()?;
        }
        Ok(node)
    }

    fn read_relationship(&mut self, size: usize) -> Result<Relationship, PackStreamError> {
        expect_fields("Relationship", size, 5 + 3 * self.element_id_fields())?;
        let id = self.dec.unpack_int()?;
        let start = self.dec.unpack_int()?;
        let end = self.dec.unpack_int()?;
        let rel_type = self.dec.unpack_string()?;
        let properties = self.read_map()?;
        let mut rel = Relationship::new(id, start, end, rel_type, properties);
        if self.element_id_fields() == 1 {
            rel.element_id = self.dec.unpack_string()?;
            rel.start_node_element_id = self.dec.unpack_string()?;
            rel.end_node_element_id = self.dec.unpack_string()?;
        }
        Ok(rel)
    }

    fn read_unbound(&mut self) -> Result<UnboundRelationship, PackStreamError> {
        let (size, struct_tag) = self.dec.unpack_struct_header()?;
        if struct_tag != tags::UNBOUND_RELATIONSHIP {
            return Err(PackStreamError::InvalidStructure(format!(
                "Expected UnboundRelationship in Path, found tag 0x{:02X}",
                struct_tag
            )));
        }
        expect_fields("UnboundRelationship", size, 3 + self.element_id_fields())?;
        let id = self.dec.unpack_int()?;
        let rel_type = self.dec.unpack_string()?;
        let properties = self.read_map()?;
        let mut rel = UnboundRelationship::new(id, rel_type, properties);
        if self.element_id_fields() == 1 {
            rel.element_id = self.dec.unpack_string()?;
        }
        Ok(rel)
    }

    fn read_path(&mut self, size: usize) -> Result<Path, PackStreamError> {
        expect_fields("Path", size, 3)?;

        let len = self.dec.unpack_list_header()?;
        let mut nodes = Vec::with_capacity(len.min(self.dec.remaining()));
        for _ in 0..len {
            let (node_size, struct_tag) = self.dec.unpack_struct_header()?;
            if struct_tag != tags::NODE {
                return Err(PackStreamError::InvalidStructure(format!(
                    "Expected Node in Path, found tag 0x{:02X}",
                    struct_tag
                )));
            }
            nodes.push(self.read_node(node_size)?);
        }

        let len = self.dec.unpack_list_header()?;
        let mut relationships = Vec::with_capacity(len.min(self.dec.remaining()));
        for _ in 0..len {
            relationships.push(self.read_unbound()?);
        }

        let len = self.dec.unpack_list_header()?;
        let mut indices = Vec::with_capacity(len.min(self.dec.remaining()));
        for _ in 0..len {
            indices.push(self.dec.unpack_int()?);
        }

        Ok(Path::new(nodes, relationships, indices))
    }
}

fn expect_fields(name: &str, found: usize, expected: usize) -> Result<(), PackStreamError> {
    if found == expected {
        Ok(())
    } else {
        Err(PackStreamError::InvalidStructure(format!(
            "Invalid {} structure size: expected {} fields, found {}",
            name, expected, found
        )))
    }
}

fn required_str<'m>(
    map: &'m HashMap<String, Value>,
    message: &str,
    key: &str,
) -> Result<&'m str, PackStreamError> {
    map.get(key).and_then(Value::as_str).ok_or_else(|| {
        PackStreamError::InvalidStructure(format!("{} requires string '{}'", message, key))
    })
}

/// Split a HELLO metadata map back into its typed parts.
fn hello_from_extra(mut extra: HashMap<String, Value>) -> HelloMessage {
    let user_agent = take_string(&mut extra, "user_agent").unwrap_or_default();
    let auth = take_string(&mut extra, "scheme").map(|scheme| AuthToken {
        scheme,
        principal: take_string(&mut extra, "principal"),
        credentials: take_string(&mut extra, "credentials"),
        realm: take_string(&mut extra, "realm"),
        parameters: take_map(&mut extra, "parameters"),
    });
    let routing = take_map(&mut extra, "routing");
    let patch_bolt = match extra.remove("patch_bolt") {
        Some(Value::List(list)) => Some(
            list.into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Some(other) => {
            extra.insert("patch_bolt".to_string(), other);
            None
        }
        None => None,
    };

    HelloMessage {
        user_agent,
        auth,
        routing,
        patch_bolt,
        extra,
    }
}

fn take_string(map: &mut HashMap<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            map.insert(key.to_string(), other);
            None
        }
    }
}

fn take_map(map: &mut HashMap<String, Value>, key: &str) -> Option<HashMap<String, Value>> {
    match map.remove(key)? {
        Value::Map(m) => Some(m),
        other => {
            map.insert(key.to_string(), other);
            None
        }
    }
}
