//! HTTP request methods as bit-flag values.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// HTTP request method, represented as a bit flag.
///
/// Endpoint registration stores a single value (possibly [`HttpMethod::ALL`]).
/// Dispatch compares values for equality and falls back to the `ALL` bucket;
/// it never intersects bitmasks. The flag representation is kept so that
/// single-method membership tests stay cheap (e.g. the HEAD check on
/// responses).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HttpMethod(u16);

impl HttpMethod {
    /// Sentinel for strings that do not name a supported method.
    pub const UNKNOWN: HttpMethod = HttpMethod(0x0000);
    pub const GET: HttpMethod = HttpMethod(0x0001);
    pub const POST: HttpMethod = HttpMethod(0x0002);
    pub const PUT: HttpMethod = HttpMethod(0x0004);
    pub const DELETE: HttpMethod = HttpMethod(0x0008);
    pub const HEAD: HttpMethod = HttpMethod(0x0010);
    pub const OPTIONS: HttpMethod = HttpMethod(0x0020);
    pub const PATCH: HttpMethod = HttpMethod(0x0040);
    /// Union of all seven supported methods; the fallback bucket for
    /// endpoints registered without a specific method.
    pub const ALL: HttpMethod = HttpMethod(0x007F);

    /// Map a method name to its flag value.
    ///
    /// Names are matched exactly as they appear on the request line;
    /// anything unrecognized maps to [`HttpMethod::UNKNOWN`].
    pub fn from_name(name: &str) -> HttpMethod {
        match name {
            "GET" => Self::GET,
            "POST" => Self::POST,
            "PUT" => Self::PUT,
            "DELETE" => Self::DELETE,
            "HEAD" => Self::HEAD,
            "OPTIONS" => Self::OPTIONS,
            "PATCH" => Self::PATCH,
            "All" => Self::ALL,
            _ => Self::UNKNOWN,
        }
    }

    /// Canonical name for this value; the aggregate values render as `All`
    /// and `Unknown`.
    pub fn name(self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::HEAD => "HEAD",
            Self::OPTIONS => "OPTIONS",
            Self::PATCH => "PATCH",
            Self::ALL => "All",
            _ => "Unknown",
        }
    }

    /// True when every flag in `other` is set in `self`.
    pub fn contains(self, other: HttpMethod) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Raw flag bits.
    pub fn bits(self) -> u16 {
        self.0
    }
}

impl BitOr for HttpMethod {
    type Output = HttpMethod;

    fn bitor(self, rhs: HttpMethod) -> HttpMethod {
        HttpMethod(self.0 | rhs.0)
    }
}

impl BitOrAssign for HttpMethod {
    fn bitor_assign(&mut self, rhs: HttpMethod) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
