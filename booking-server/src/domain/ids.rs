//! Identifier newtypes.
//!
//! Journeys, stations, stops, trains, passengers, orders and tickets are
//! identified by opaque non-empty strings (e.g. `TJ0001`, `ST01`). Seats and
//! coaches use integer identities. Wrapping each in its own type keeps a
//! seat id from ever being passed where a coach id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

impl InvalidId {
    /// The identifier kind that failed to parse (e.g. "station id").
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, trimming surrounding whitespace.
            ///
            /// Blank input is rejected.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(InvalidId {
                        kind: $kind,
                        reason: "must not be empty",
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Parse a decimal identifier, trimming surrounding whitespace.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                s.trim().parse::<u32>().map(Self).map_err(|_| InvalidId {
                    kind: $kind,
                    reason: "must be a non-negative integer",
                })
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identity of a scheduled train journey.
    JourneyId,
    "journey id"
);
string_id!(
    /// Identity of a station.
    StationId,
    "station id"
);
string_id!(
    /// Identity of one stop (a station visit within a journey).
    StopId,
    "stop id"
);
string_id!(
    /// Identity of a train (rolling stock set).
    TrainId,
    "train id"
);
string_id!(
    /// Identity of a line (the route a journey runs along).
    LineId,
    "line id"
);
string_id!(
    /// Identity of a passenger.
    PassengerId,
    "passenger id"
);
string_id!(
    /// Identity of an order grouping one or more tickets.
    OrderId,
    "order id"
);
string_id!(
    /// Identity of an issued ticket.
    TicketId,
    "ticket id"
);

numeric_id!(
    /// Identity of a seat.
    SeatId,
    "seat id"
);
numeric_id!(
    /// Identity of a coach.
    CoachId,
    "coach id"
);


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any identifier without surrounding whitespace survives a parse
        #[test]
        fn roundtrip(s in "[A-Za-z0-9_-]{1,16}") {
            let id = OrderId::parse(&s).unwrap();
            prop_assert_eq!(id.as_str(), s.as_str());
        }

        /// Every u32 parses back to itself
        #[test]
        fn seat_roundtrip(n in any::<u32>()) {
            prop_assert_eq!(SeatId::parse(&n.to_string()).unwrap(), SeatId(n));
        }
    }
}
