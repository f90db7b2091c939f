// ── Dynamic wire values ──
//
// Variables and unrecognised reply arguments have no static type, so they
// are kept as a tagged `Value` inferred from the token's shape. Every
// variant encodes to a token that infers back to the same variant; booleans
// travel as `Int` 0/1 because the wire cannot tell them apart.

use std::fmt;

use bytes::Bytes;

use super::{DecodeError, FixedPoint, WireType};

/// A wire value whose type is only known at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Fixed(FixedPoint),
    Text(String),
    Bytes(Bytes),
    /// An unquoted, non-numeric token such as an enumeration name. Text
    /// that would not read back as a bare token is sent quoted.
    Symbol(String),
}

impl Value {
    /// Infer a value from its token: quoted → text, `{..}`/`[..]` → bytes,
    /// integer → int, decimal → fixed, anything else → symbol.
    pub fn infer(token: &str) -> Self {
        if token.starts_with('"') {
            if let Ok(text) = String::decode(token) {
                return Self::Text(text);
            }
        } else if token.starts_with('{') || token.starts_with('[') {
            if let Ok(buf) = Bytes::decode(token) {
                return Self::Bytes(buf);
            }
        } else if let Ok(n) = token.parse::<i64>() {
            return Self::Int(n);
        } else if let Ok(f) = token.parse::<FixedPoint>() {
            return Self::Fixed(f);
        }
        Self::Symbol(token.to_owned())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to fixed point.
    pub fn as_fixed(&self) -> Option<FixedPoint> {
        match self {
            Self::Fixed(f) => Some(*f),
            Self::Int(n) => Some(FixedPoint::from_int(*n)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

/// Whether `s` survives the wire as a single unquoted token that infers
/// back to a symbol.
fn is_bare_symbol(s: &str) -> bool {
    !s.is_empty()
        && !s.chars().any(|c| c.is_whitespace() || c == '"')
        && matches!(Value::infer(s), Value::Symbol(_))
}

impl WireType for Value {
    const TYPE_NAME: &'static str = "value";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        if token.is_empty() {
            return Err(DecodeError::new(token, Self::TYPE_NAME));
        }
        Ok(Self::infer(token))
    }

    fn encode(&self) -> String {
        match self {
            Self::Int(n) => n.encode(),
            Self::Fixed(f) => f.encode(),
            Self::Text(s) => s.encode(),
            Self::Bytes(b) => b.encode(),
            Self::Symbol(s) if is_bare_symbol(s) => s.clone(),
            Self::Symbol(s) => s.encode(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Fixed(v) => write!(f, "{v}"),
            Self::Text(s) | Self::Symbol(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&b.encode()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<FixedPoint> for Value {
    fn from(f: FixedPoint) -> Self {
        Self::Fixed(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Int(i64::from(b))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}
