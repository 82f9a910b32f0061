//! Typed value and message serialization.

use std::collections::HashMap;

use bytes::BytesMut;

use super::temporal;
use super::{tags, MessageFormat};
use crate::bolt::message::{
    tag, BoltRequest, BoltResponse, DiscardMessage, HelloMessage, PullMessage, ABSENT_QUERY_ID,
    FETCH_ALL,
};
use crate::bolt::packstream::{PackStreamEncoder, PackStreamError};
use crate::bolt::value::{Node, Path, Relationship, UnboundRelationship, Value};

/// Packs typed values for one message.
pub(super) struct ValueWriter<'f, 'b> {
    enc: PackStreamEncoder<'b>,
    format: &'f MessageFormat,
    allow_graph: bool,
}

impl<'f, 'b> ValueWriter<'f, 'b> {
    pub(super) fn new(format: &'f MessageFormat, dst: &'b mut BytesMut, allow_graph: bool) -> Self {
        Self {
            enc: PackStreamEncoder::new(dst),
            format,
            allow_graph,
        }
    }

    pub(super) fn write_request(&mut self, request: &BoltRequest) -> Result<(), PackStreamError> {
        match request {
            BoltRequest::Hello(hello) => {
                self.enc.pack_struct_header(1, tag::HELLO)?;
                self.write_map(&hello_extra(hello))
            }
            BoltRequest::Run(run) => {
                self.enc.pack_struct_header(3, tag::RUN)?;
                self.enc.pack_string(&run.query)?;
                self.write_map(&run.parameters)?;
                self.write_map(&run.extra)
            }
            BoltRequest::Begin(begin) => {
                self.enc.pack_struct_header(1, tag::BEGIN)?;
                self.write_map(&begin.extra)
            }
            BoltRequest::Pull(PullMessage { n, qid }) => self.write_flow(tag::PULL, "PULL", *n, *qid),
            BoltRequest::Discard(DiscardMessage { n, qid }) => {
                self.write_flow(tag::DISCARD, "DISCARD", *n, *qid)
            }
            BoltRequest::Goodbye | BoltRequest::Reset | BoltRequest::Commit | BoltRequest::Rollback => {
                self.enc.pack_struct_header(0, request.tag())
            }
        }
    }

    pub(super) fn write_response(&mut self, response: &BoltResponse) -> Result<(), PackStreamError> {
        match response {
            BoltResponse::Success(msg) => {
                self.enc.pack_struct_header(1, tag::SUCCESS)?;
                self.write_map(&msg.metadata)
            }
            BoltResponse::Record(msg) => {
                self.enc.pack_struct_header(1, tag::RECORD)?;
                self.write_list(&msg.fields)
            }
            BoltResponse::Failure(msg) => {
                self.enc.pack_struct_header(1, tag::FAILURE)?;
                self.enc.pack_map_header(2)?;
                self.enc.pack_string("code")?;
                self.enc.pack_string(&msg.code)?;
                self.enc.pack_string("message")?;
                self.enc.pack_string(&msg.message)
            }
            BoltResponse::Ignored => self.enc.pack_struct_header(0, tag::IGNORED),
        }
    }

    fn write_flow(&mut self, msg_tag: u8, name: &str, n: i64, qid: i64) -> Result<(), PackStreamError> {
        if !self.format.version().supports_bounded_pull() {
            if n != FETCH_ALL || qid != ABSENT_QUERY_ID {
                return Err(PackStreamError::UnsupportedValue(format!(
                    "{} with n={} qid={} requires Bolt 4.0 or later",
                    name, n, qid
                )));
            }
            return self.enc.pack_struct_header(0, msg_tag);
        }
        self.enc.pack_struct_header(1, msg_tag)?;
        let has_qid = qid != ABSENT_QUERY_ID;
        self.enc.pack_map_header(if has_qid { 2 } else { 1 })?;
        self.enc.pack_string("n")?;
        self.enc.pack_int(n);
        if has_qid {
            self.enc.pack_string("qid")?;
            self.enc.pack_int(qid);
        }
        Ok(())
    }

    pub(super) fn write_value(&mut self, value: &Value) -> Result<(), PackStreamError> {
        match value {
            Value::Null => self.enc.pack_null(),
            Value::Boolean(b) => self.enc.pack_bool(*b),
            Value::Integer(i) => self.enc.pack_int(*i),
            Value::Float(f) => self.enc.pack_float(*f),
            Value::String(s) => self.enc.pack_string(s)?,
            Value::Bytes(b) => self.enc.pack_bytes(b)?,
            Value::List(items) => self.write_list(items)?,
            Value::Map(map) => self.write_map(map)?,
            Value::Node(node) => {
                self.check_graph("Node")?;
                self.write_node(node)?;
            }
            Value::Relationship(rel) => {
                self.check_graph("Relationship")?;
                self.write_relationship(rel)?;
            }
            Value::Path(path) => {
                self.check_graph("Path")?;
                self.write_path(path)?;
            }
            Value::Point(point) => match point.z {
                None => {
                    self.enc.pack_struct_header(3, tags::POINT_2D)?;
                    self.enc.pack_int(point.srid as i64);
                    self.enc.pack_float(point.x);
                    self.enc.pack_float(point.y);
                }
                Some(z) => {
                    self.enc.pack_struct_header(4, tags::POINT_3D)?;
                    self.enc.pack_int(point.srid as i64);
                    self.enc.pack_float(point.x);
                    self.enc.pack_float(point.y);
                    self.enc.pack_float(z);
                }
            },
            Value::Date(date) => {
                self.enc.pack_struct_header(1, tags::DATE)?;
                self.enc.pack_int(temporal::epoch_days(date));
            }
            Value::Time(time) => {
                self.enc.pack_struct_header(2, tags::TIME)?;
                self.enc.pack_int(temporal::nanos_of_day(&time.time));
                self.enc.pack_int(time.offset_seconds as i64);
            }
            Value::LocalTime(time) => {
                self.enc.pack_struct_header(1, tags::LOCAL_TIME)?;
                self.enc.pack_int(temporal::nanos_of_day(time));
            }
            Value::LocalDateTime(dt) => {
                let (seconds, nanos) = temporal::local_epoch(dt);
                self.enc.pack_struct_header(2, tags::LOCAL_DATE_TIME)?;
                self.enc.pack_int(seconds);
                self.enc.pack_int(nanos);
            }
            Value::DateTime(dt) => {
                let utc = self.format.date_time_utc();
                let (seconds, nanos, offset) = temporal::offset_date_time_fields(dt, utc);
                let struct_tag = if utc { tags::DATE_TIME_UTC } else { tags::DATE_TIME_LEGACY };
                self.enc.pack_struct_header(3, struct_tag)?;
                self.enc.pack_int(seconds);
                self.enc.pack_int(nanos);
                self.enc.pack_int(offset);
            }
            Value::DateTimeZoneId(dt) => {
                let struct_tag = if self.format.date_time_utc() {
                    tags::DATE_TIME_ZONE_ID_UTC
                } else {
                    tags::DATE_TIME_ZONE_ID_LEGACY
                };
                self.enc.pack_struct_header(3, struct_tag)?;
                self.enc.pack_int(dt.seconds);
                self.enc.pack_int(dt.nanoseconds);
                self.enc.pack_string(&dt.zone_id)?;
            }
            Value::Duration(d) => {
                self.enc.pack_struct_header(4, tags::DURATION)?;
                self.enc.pack_int(d.months);
                self.enc.pack_int(d.days);
                self.enc.pack_int(d.seconds);
                self.enc.pack_int(d.nanoseconds);
            }
        }
        Ok(())
    }

    fn check_graph(&self, kind: &str) -> Result<(), PackStreamError> {
        if self.allow_graph {
            Ok(())
        } else {
            Err(PackStreamError::UnsupportedValue(format!(
                "{} values cannot be sent to the server",
                kind
            )))
        }
    }

    fn write_list(&mut self, items: &[Value]) -> Result<(), PackStreamError> {
        self.enc.pack_list_header(items.len())?;
        for item in items {
            self.write_value(item)?;
        }
        Ok(())
    }

    fn write_map(&mut self, map: &HashMap<String, Value>) -> Result<(), PackStreamError> {
        self.enc.pack_map_header(map.len())?;
        for (key, value) in map {
            self.enc.pack_string(key)?;
            self.write_value(value)?;
        }
        Ok(())
    }

    fn write_strings(&mut self, items: &[String]) -> Result<(), PackStreamError> {
        self.enc.pack_list_header(items.len())?;
        for item in items {
            self.enc.pack_string(item)?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<(), PackStreamError> {
        let element_ids = self.format.version().uses_element_ids();
        self.enc.pack_struct_header(if element_ids { 4 } else { 3 }, tags::NODE)?;
        self.enc.pack_int(node.id);
        self.write_strings(&node.labels)?;
        self.write_map(&node.properties)?;
        if element_ids {
            self.enc.pack_string(&node.element_id)?;
        }
        Ok(())
    }

    fn write_relationship(&mut self, rel: &Relationship) -> Result<(), PackStreamError> {
        let element_ids = self.format.version().uses_element_ids();
        self.enc.pack_struct_header(if element_ids { 8 } else { 5 }, tags::RELATIONSHIP)?;
        self.enc.pack_int(rel.id);
        self.enc.pack_int(rel.start_node_id);
        self.enc.pack_int(rel.end_node_id);
        self.enc.pack_string(&rel.rel_type)?;
        self.write_map(&rel.properties)?;
        if element_ids {
            self.enc.pack_string(&rel.element_id)?;
            self.enc.pack_string(&rel.start_node_element_id)?;
            self.enc.pack_string(&rel.end_node_element_id)?;
        }
        Ok(())
    }

    fn write_unbound(&mut self, rel: &UnboundRelationship) -> Result<(), PackStreamError> {
        let element_ids = self.format.version().uses_element_ids();
        self.enc
            .pack_struct_header(if element_ids { 4 } else { 3 }, tags::UNBOUND_RELATIONSHIP)?;
        self.enc.pack_int(rel.id);
        self.enc.pack_string(&rel.rel_type)?;
        self.write_map(&rel.properties)?;
        if element_ids {
            self.enc.pack_string(&rel.element_id)?;
        }
        Ok(())
    }

    fn write_path(&mut self, path: &Path) -> Result<(), PackStreamError> {
        self.enc.pack_struct_header(3, tags::PATH)?;
        self.enc.pack_list_header(path.nodes.len())?;
        for node in &path.nodes {
            self.write_node(node)?;
        }
        self.enc.pack_list_header(path.relationships.len())?;
        for rel in &path.relationships {
            self.write_unbound(rel)?;
        }
        self.enc.pack_list_header(path.indices.len())?;
        for index in &path.indices {
            self.enc.pack_int(*index);
        }
        Ok(())
    }
}

/// Flatten a HELLO into its single metadata map.
fn hello_extra(hello: &HelloMessage) -> HashMap<String, Value> {
    let mut map = hello.extra.clone();
    map.insert("user_agent".to_string(), Value::from(hello.user_agent.as_str()));
    if let Some(auth) = &hello.auth {
        map.insert("scheme".to_string(), Value::from(auth.scheme.as_str()));
        if let Some(principal) = &auth.principal {
            map.insert("principal".to_string(), Value::from(principal.as_str()));
        }
        if let Some(credentials) = &auth.credentials {
            map.insert("credentials".to_string(), Value::from(credentials.as_str()));
        }
        if let Some(realm) = &auth.realm {
            map.insert("realm".to_string(), Value::from(realm.as_str()));
        }
        if let Some(parameters) = &auth.parameters {
            map.insert("parameters".to_string(), Value::Map(parameters.clone()));
        }
    }
    if let Some(routing) = &hello.routing {
        map.insert("routing".to_string(), Value::Map(routing.clone()));
    }
    if let Some(patches) = &hello.patch_bolt {
        let list = patches.iter().map(|p| Value::from(p.as_str())).collect();
        map.insert("patch_bolt".to_string(), Value::List(list));
    }
    map
}
