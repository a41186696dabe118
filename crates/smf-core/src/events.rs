//! Push-parser event protocol.
//!
//! Every SMF encoding drives a consumer through the same call sequence:
//!
//! ```text
//! on_start
//! on_version_received
//! on_header_parsed
//!   on_attributes_non_interleaved
//!     (on_data_attribute_start  on_data_attribute_value*  on_data_attribute_value_finish)*
//!   on_data_attributes_non_interleaved_finish
//!   on_triangles  on_data_triangle*  on_data_triangles_finish
//!   (on_meta  on_meta_data?)*
//! on_finish
//! ```
//!
//! Methods that open a branch return an [`Interest`]. A consumer that
//! declines a branch receives none of its data events; the encoding routes
//! them to [`IgnoringEvents`] instead and still reads and checks every byte
//! of the branch, so stream position never depends on consumer interest.
//! Errors and warnings are always delivered, whatever the consumer declined.
//!
//! The default implementation of every data method is a no-op and every
//! branch defaults to [`Interest::Decline`], so a consumer only implements
//! the parts of the stream it cares about.

use crate::attribute::Attribute;
use crate::header::Header;
use crate::schema::SchemaIdentifier;
use crate::status::{ParseError, ParseWarning};
use crate::value::AttributeValue;
use crate::version::FormatVersion;

/// Whether a consumer wants the events of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    Accept,
    Decline,
}

impl Interest {
    pub fn is_accepted(self) -> bool {
        self == Interest::Accept
    }

    pub fn from_bool(accept: bool) -> Self {
        if accept {
            Interest::Accept
        } else {
            Interest::Decline
        }
    }
}

/// Receiver of parse events.
pub trait ParserEvents {
    fn on_error(&mut self, error: ParseError);

    fn on_warning(&mut self, warning: ParseWarning);

    fn on_start(&mut self) {}

    fn on_version_received(&mut self, _version: FormatVersion) -> Interest {
        Interest::Decline
    }

    fn on_header_parsed(&mut self, _header: &Header) -> Interest {
        Interest::Decline
    }

    fn on_attributes_non_interleaved(&mut self) -> Interest {
        Interest::Decline
    }

    fn on_data_attribute_start(&mut self, _attribute: &Attribute) -> Interest {
        Interest::Decline
    }

    fn on_data_attribute_value(&mut self, _value: AttributeValue) {}

    fn on_data_attribute_value_finish(&mut self) {}

    fn on_data_attributes_non_interleaved_finish(&mut self) {}

    fn on_triangles(&mut self) -> Interest {
        Interest::Decline
    }

    fn on_data_triangle(&mut self, _v0: u64, _v1: u64, _v2: u64) {}

    fn on_data_triangles_finish(&mut self) {}

    fn on_meta(&mut self, _schema: &SchemaIdentifier) -> Interest {
        Interest::Decline
    }

    fn on_meta_data(&mut self, _schema: &SchemaIdentifier, _data: &[u8]) {}

    fn on_finish(&mut self) {}
}

/// Consumer that declines everything.
///
/// Encodings substitute it for any branch the real consumer declined.
/// Diagnostics reaching it are logged and dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoringEvents;

impl ParserEvents for IgnoringEvents {
    fn on_error(&mut self, error: ParseError) {
        log::debug!("ignored error: {}", error);
    }

    fn on_warning(&mut self, warning: ParseWarning) {
        log::debug!("ignored warning: {}", warning);
    }
}

/// Picks the receiver of a branch's data events.
pub fn data_sink<'a>(
    events: &'a mut dyn ParserEvents,
    ignoring: &'a mut IgnoringEvents,
    interest: Interest,
) -> &'a mut dyn ParserEvents {
    match interest {
        Interest::Accept => events,
        Interest::Decline => ignoring,
    }
}

impl<E: ParserEvents + ?Sized> ParserEvents for &mut E {
    fn on_error(&mut self, error: ParseError) {
        (**self).on_error(error)
    }

    fn on_warning(&mut self, warning: ParseWarning) {
        (**self).on_warning(warning)
    }

    fn on_start(&mut self) {
        (**self).on_start()
    }

    fn on_version_received(&mut self, version: FormatVersion) -> Interest {
        (**self).on_version_received(version)
    }

    fn on_header_parsed(&mut self, header: &Header) -> Interest {
        (**self).on_header_parsed(header)
    }

    fn on_attributes_non_interleaved(&mut self) -> Interest {
        (**self).on_attributes_non_interleaved()
    }

    fn on_data_attribute_start(&mut self, attribute: &Attribute) -> Interest {
        (**self).on_data_attribute_start(attribute)
    }

    fn on_data_attribute_value(&mut self, value: AttributeValue) {
        (**self).on_data_attribute_value(value)
    }

    fn on_data_attribute_value_finish(&mut self) {
        (**self).on_data_attribute_value_finish()
    }

    fn on_data_attributes_non_interleaved_finish(&mut self) {
        (**self).on_data_attributes_non_interleaved_finish()
    }

    fn on_triangles(&mut self) -> Interest {
        (**self).on_triangles()
    }

    fn on_data_triangle(&mut self, v0: u64, v1: u64, v2: u64) {
        (**self).on_data_triangle(v0, v1, v2)
    }

    fn on_data_triangles_finish(&mut self) {
        (**self).on_data_triangles_finish()
    }

    fn on_meta(&mut self, schema: &SchemaIdentifier) -> Interest {
        (**self).on_meta(schema)
    }

    fn on_meta_data(&mut self, schema: &SchemaIdentifier, data: &[u8]) {
        (**self).on_meta_data(schema, data)
    }

    fn on_finish(&mut self) {
        (**self).on_finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::LexicalPosition;

    #[derive(Default)]
    struct Counting {
        errors: usize,
        triangles: usize,
    }

    impl ParserEvents for Counting {
        fn on_error(&mut self, _error: ParseError) {
            self.errors += 1;
        }

        fn on_warning(&mut self, _warning: ParseWarning) {}

        fn on_data_triangle(&mut self, _v0: u64, _v1: u64, _v2: u64) {
            self.triangles += 1;
        }
    }

    #[test]
    fn declined_branches_go_to_the_ignoring_sink() {
        let mut counting = Counting::default();
        let mut ignoring = IgnoringEvents;
        data_sink(&mut counting, &mut ignoring, Interest::Decline).on_data_triangle(0, 1, 2);
        assert_eq!(counting.triangles, 0);
        data_sink(&mut counting, &mut ignoring, Interest::Accept).on_data_triangle(0, 1, 2);
        assert_eq!(counting.triangles, 1);
    }

    #[test]
    fn defaults_decline_every_branch() {
        let mut counting = Counting::default();
        assert_eq!(counting.on_triangles(), Interest::Decline);
        assert_eq!(
            counting.on_version_received(FormatVersion::new(1, 0)),
            Interest::Decline
        );
    }

    #[test]
    fn mutable_references_forward() {
        fn deliver<E: ParserEvents>(mut events: E) {
            events.on_error(ParseError::new(LexicalPosition::default(), "x"));
        }

        let mut counting = Counting::default();
        deliver(&mut counting);
        assert_eq!(counting.errors, 1);
    }
}
