//! JSON form of protobuf enum fields.
//!
//! prost stores enums as `i32`. On the REST side they are written as their
//! proto names (`RUNNING`, `EXECUTION_QUEUE`) and read back from either the
//! name or the number. Unknown numbers are written as numbers.

use serde::de::{self, Deserializer, Visitor};
use serde::Serializer;
use std::fmt;

macro_rules! enum_field {
    ($module:ident, $ty:ty, $label:literal) => {
        pub mod $module {
            use super::*;

            pub fn serialize<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
                match <$ty>::try_from(*value) {
                    Ok(known) => serializer.serialize_str(known.as_str_name()),
                    Err(_) => serializer.serialize_i32(*value),
                }
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
                deserializer.deserialize_any(EnumVisitor {
                    label: $label,
                    from_name: |name| <$ty>::from_str_name(name).map(|v| v as i32),
                })
            }
        }
    };
}

enum_field!(workflow_execution_phase, crate::admin::WorkflowExecutionPhase, "workflow execution phase");
enum_field!(sort_direction, crate::admin::sort::Direction, "sort direction");
enum_field!(matchable_resource, crate::admin::MatchableResource, "resource type");

struct EnumVisitor {
    label: &'static str,
    from_name: fn(&str) -> Option<i32>,
}

impl<'de> Visitor<'de> for EnumVisitor {
    type Value = i32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} name or number", self.label)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<i32, E> {
        (self.from_name)(value)
            .ok_or_else(|| E::custom(format!("unknown {} {:?}", self.label, value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i32, E> {
        i32::try_from(value).map_err(|_| E::custom(format!("{} out of range", self.label)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i32, E> {
        i32::try_from(value).map_err(|_| E::custom(format!("{} out of range", self.label)))
    }
}
