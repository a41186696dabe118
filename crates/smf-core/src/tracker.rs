//! Structural invariant checking layered over the event protocol.
//!
//! [`Tracker`] sits between an encoding and a consumer. It forwards every
//! event the consumer asked for and checks, independently of what the
//! consumer wants:
//!
//! - every triangle index is below the declared vertex count,
//! - the number of triangles received equals the declared count,
//! - each attribute receives exactly `vertex_count` values,
//! - a non-zero declared vertex or triangle count is matched by data.
//!
//! Findings are reported to the consumer as errors and move the tracker to
//! [`TrackerState::Failed`], but checking continues so every violation in
//! the stream is reported.

use crate::attribute::Attribute;
use crate::events::{Interest, ParserEvents};
use crate::header::Header;
use crate::schema::SchemaIdentifier;
use crate::status::{LexicalPosition, ParseError, ParseWarning};
use crate::value::AttributeValue;
use crate::version::FormatVersion;

pub const MISSING_VERTICES: &str =
    "A non-zero vertex count was specified, but no vertices were provided.";

pub const MISSING_TRIANGLES: &str =
    "A non-zero triangle count was specified, but no triangles were provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerState {
    Initial,
    Started,
    HeaderParsed,
    Attributes,
    AttributeValues,
    Triangles,
    Meta,
    Finished,
    Failed,
}

/// Declared-versus-observed checker for one stream. Single use.
#[derive(Debug)]
pub struct Tracker<E> {
    inner: E,
    state: TrackerState,
    position: LexicalPosition,
    /// An upstream error stopped the stream; end-of-stream checks are moot.
    halted: bool,
    finished: bool,

    vertex_count: u64,
    triangle_count: u64,
    vertices_seen: bool,
    triangles_seen: bool,
    triangles_received: u64,
    values_received: u64,
    current_attribute: Option<Attribute>,

    forward_header: bool,
    forward_body: bool,
    forward_attributes: bool,
    forward_values: bool,
    forward_triangles: bool,
    forward_meta: bool,
}

impl<E: ParserEvents> Tracker<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            state: TrackerState::Initial,
            position: LexicalPosition::default(),
            halted: false,
            finished: false,
            vertex_count: 0,
            triangle_count: 0,
            vertices_seen: false,
            triangles_seen: false,
            triangles_received: 0,
            values_received: 0,
            current_attribute: None,
            forward_header: false,
            forward_body: false,
            forward_attributes: false,
            forward_values: false,
            forward_triangles: false,
            forward_meta: false,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn has_failed(&self) -> bool {
        self.state == TrackerState::Failed
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    /// Sets the position attached to subsequent findings.
    pub fn locate(&mut self, position: LexicalPosition) {
        self.position = position;
    }

    fn fail(&mut self, message: String) {
        log::debug!("structural error: {}", message);
        self.state = TrackerState::Failed;
        self.inner
            .on_error(ParseError::new(self.position.clone(), message));
    }

    fn enter(&mut self, state: TrackerState) {
        if self.state != TrackerState::Failed {
            self.state = state;
        }
    }

    /// Reports events that arrive before a header or after the end.
    fn check_in_body(&mut self, event: &str) -> bool {
        match self.state {
            TrackerState::Initial | TrackerState::Started => {
                self.fail(format!("Received {} before a header", event));
                false
            }
            TrackerState::Finished => {
                self.fail(format!("Received {} after the stream finished", event));
                false
            }
            _ => true,
        }
    }

    fn check_triangle_count(&mut self) {
        if self.triangle_count != 0 && self.triangles_received == 0 {
            self.fail(MISSING_TRIANGLES.to_string());
        } else if self.triangles_received != self.triangle_count {
            self.fail(format!(
                "Expected {} triangles, but {} were provided",
                self.triangle_count, self.triangles_received
            ));
        }
    }
}

impl<E: ParserEvents> ParserEvents for Tracker<E> {
    fn on_error(&mut self, error: ParseError) {
        self.halted = true;
        self.state = TrackerState::Failed;
        self.inner.on_error(error);
    }

    fn on_warning(&mut self, warning: ParseWarning) {
        self.inner.on_warning(warning);
    }

    fn on_start(&mut self) {
        if self.state != TrackerState::Initial {
            self.fail("Received the start of a stream twice".to_string());
            return;
        }
        self.state = TrackerState::Started;
        self.inner.on_start();
    }

    fn on_version_received(&mut self, version: FormatVersion) -> Interest {
        self.forward_header = self.inner.on_version_received(version).is_accepted();
        Interest::Accept
    }

    fn on_header_parsed(&mut self, header: &Header) -> Interest {
        if self.state != TrackerState::Started {
            self.fail("Received a header out of sequence".to_string());
            return Interest::Decline;
        }
        log::debug!(
            "tracking {} vertices, {} triangles",
            header.vertex_count(),
            header.triangles().count
        );
        self.vertex_count = header.vertex_count();
        self.triangle_count = header.triangles().count;
        self.forward_body =
            self.forward_header && self.inner.on_header_parsed(header).is_accepted();
        self.enter(TrackerState::HeaderParsed);
        Interest::Accept
    }

    fn on_attributes_non_interleaved(&mut self) -> Interest {
        if !self.check_in_body("vertex data") {
            return Interest::Decline;
        }
        self.vertices_seen = true;
        self.forward_attributes =
            self.forward_body && self.inner.on_attributes_non_interleaved().is_accepted();
        self.enter(TrackerState::Attributes);
        Interest::Accept
    }

    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Interest {
        if !self.check_in_body("attribute data") {
            return Interest::Decline;
        }
        self.values_received = 0;
        self.current_attribute = Some(attribute.clone());
        self.forward_values =
            self.forward_attributes && self.inner.on_data_attribute_start(attribute).is_accepted();
        self.enter(TrackerState::AttributeValues);
        Interest::Accept
    }

    fn on_data_attribute_value(&mut self, value: AttributeValue) {
        self.values_received += 1;
        if self.forward_values {
            self.inner.on_data_attribute_value(value);
        }
    }

    fn on_data_attribute_value_finish(&mut self) {
        if let Some(attribute) = self.current_attribute.take() {
            if self.values_received != self.vertex_count {
                self.fail(format!(
                    "Attribute {}: expected {} values, but {} were provided",
                    attribute.name(),
                    self.vertex_count,
                    self.values_received
                ));
            }
        }
        if self.forward_values {
            self.inner.on_data_attribute_value_finish();
        }
        self.forward_values = false;
        self.enter(TrackerState::Attributes);
    }

    fn on_data_attributes_non_interleaved_finish(&mut self) {
        if self.forward_attributes {
            self.inner.on_data_attributes_non_interleaved_finish();
        }
        self.forward_attributes = false;
        self.enter(TrackerState::HeaderParsed);
    }

    fn on_triangles(&mut self) -> Interest {
        if !self.check_in_body("triangles") {
            return Interest::Decline;
        }
        self.triangles_seen = true;
        self.triangles_received = 0;
        self.forward_triangles = self.forward_body && self.inner.on_triangles().is_accepted();
        self.enter(TrackerState::Triangles);
        Interest::Accept
    }

    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        let index = self.triangles_received;
        for (vertex, value) in [v0, v1, v2].into_iter().enumerate() {
            if value >= self.vertex_count {
                self.fail(format!(
                    "Triangle {}, vertex {} specifies a vertex value ({}) greater than the specified vertex count ({})",
                    index, vertex, value, self.vertex_count
                ));
            }
        }
        self.triangles_received += 1;
        if self.forward_triangles {
            self.inner.on_data_triangle(v0, v1, v2);
        }
    }

    fn on_data_triangles_finish(&mut self) {
        self.check_triangle_count();
        if self.forward_triangles {
            self.inner.on_data_triangles_finish();
        }
        self.forward_triangles = false;
        self.enter(TrackerState::HeaderParsed);
    }

    fn on_meta(&mut self, schema: &SchemaIdentifier) -> Interest {
        if !self.check_in_body("metadata") {
            return Interest::Decline;
        }
        self.enter(TrackerState::Meta);
        self.forward_meta = self.forward_body && self.inner.on_meta(schema).is_accepted();
        Interest::from_bool(self.forward_meta)
    }

    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]) {
        if self.forward_meta {
            self.inner.on_meta_data(schema, data);
        }
        self.forward_meta = false;
    }

    fn on_finish(&mut self) {
        if self.finished {
            self.fail("Received the end of a stream twice".to_string());
            return;
        }
        self.finished = true;
        if !self.halted
            && !matches!(self.state, TrackerState::Initial | TrackerState::Started)
        {
            if self.vertex_count != 0 && !self.vertices_seen {
                self.fail(MISSING_VERTICES.to_string());
            }
            if self.triangle_count != 0 && !self.triangles_seen {
                self.fail(MISSING_TRIANGLES.to_string());
            }
        }
        self.enter(TrackerState::Finished);
        self.inner.on_finish();
    }
}
