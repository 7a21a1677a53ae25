//! Typed ids for agents, path requests and graph elements.
//!
//! Each id is a newtype over an integer with an `INVALID` sentinel, so an
//! agent index cannot be passed where a request id is expected.  `index()`
//! converts to a `Vec` position.

use std::fmt;

macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// `MAX` of the inner integer; never handed out.
            pub const INVALID: $name = $name(<$inner>::MAX);

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;

            fn try_from(index: usize) -> Result<Self, Self::Error> {
                Ok(Self(<$inner>::try_from(index)?))
            }
        }
    };
}

typed_id! {
    /// Index of an agent (one motion controller).
    pub struct AgentId(u32);
}

typed_id! {
    /// Monotonically increasing identifier of a path request.
    ///
    /// Never reused within one broker, unlike the arena slot that holds the
    /// request (see `RequestHandle` in `nav-request`).
    pub struct RequestId(u64);
}

typed_id! {
    /// Index of a waypoint-graph node.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed waypoint-graph edge.
    pub struct EdgeId(u32);
}

impl RequestId {
    /// The id that follows `self`.
    #[inline]
    pub fn next(self) -> RequestId {
        RequestId(self.0 + 1)
    }
}
