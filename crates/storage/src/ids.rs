use std::fmt;

use serde::{Deserialize, Serialize};

// Both record ids are opaque strings on the wire; the macro keeps their shape identical.
macro_rules! define_record_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Time-derived id: the epoch milliseconds rendered as decimal text.
            pub fn from_millis(millis: i64) -> Self {
                Self(millis.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_record_id!(ChatroomId);
define_record_id!(MessageId);

impl MessageId {
    /// Id given to synthesized history entries.
    pub fn filler(timestamp_millis: i64) -> Self {
        Self(format!("dummy-{timestamp_millis}"))
    }

    pub fn is_filler(&self) -> bool {
        self.0.starts_with("dummy-")
    }
}
