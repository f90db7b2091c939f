// ── Wire value codec ──
//
// Stateless conversion between protocol tokens and typed values.
// Every supported type implements `WireType`; decoding a token outside
// a type's grammar fails with `DecodeError`, and for every representable
// value `decode(encode(v)) == v`.

mod fixed;
mod tokenize;
mod value;

use bytes::Bytes;
use thiserror::Error;

pub use fixed::FixedPoint;
pub use tokenize::tokenize;
pub use value::Value;

/// A token that does not match the grammar of the expected type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode {token:?} as {expected}")]
pub struct DecodeError {
    pub token: String,
    pub expected: &'static str,
}

impl DecodeError {
    pub fn new(token: &str, expected: &'static str) -> Self {
        Self {
            token: token.to_owned(),
            expected,
        }
    }
}

/// A value with a textual wire representation.
pub trait WireType: Sized {
    /// Name used in decode errors.
    const TYPE_NAME: &'static str;

    fn decode(token: &str) -> Result<Self, DecodeError>;

    fn encode(&self) -> String;
}

/// Decode `token` as `T`.
pub fn decode<T: WireType>(token: &str) -> Result<T, DecodeError> {
    T::decode(token)
}

/// Encode `value` as a single wire token.
pub fn encode<T: WireType>(value: &T) -> String {
    value.encode()
}

/// Encode a heterogeneous argument list into wire tokens.
///
/// ```rust,ignore
/// let args = wire_args![42_u8, FixedPoint::from_int(3), true];
/// ```
#[macro_export]
macro_rules! wire_args {
    () => { ::std::vec::Vec::<::std::string::String>::new() };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::codec::WireType::encode(&$arg)),+]
    };
}

// ── Integers ─────────────────────────────────────────────────────────

macro_rules! impl_wire_int {
    ($($t:ty),*) => {$(
        impl WireType for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn decode(token: &str) -> Result<Self, DecodeError> {
                token
                    .parse::<$t>()
                    .map_err(|_| DecodeError::new(token, Self::TYPE_NAME))
            }

            fn encode(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

impl_wire_int!(i8, i16, i32, i64, u8, u16, u32, u64);

// ── Fixed point ──────────────────────────────────────────────────────

impl WireType for FixedPoint {
    const TYPE_NAME: &'static str = "FixedPoint";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        token.parse()
    }

    fn encode(&self) -> String {
        self.to_string()
    }
}

// ── Booleans ─────────────────────────────────────────────────────────

impl WireType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        match token {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(DecodeError::new(token, Self::TYPE_NAME)),
        }
    }

    fn encode(&self) -> String {
        if *self { "1".into() } else { "0".into() }
    }
}

// ── Strings ──────────────────────────────────────────────────────────

impl WireType for String {
    const TYPE_NAME: &'static str = "string";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        if !token.starts_with('"') {
            return Ok(token.to_owned());
        }

        let err = || DecodeError::new(token, Self::TYPE_NAME);
        let mut out = String::with_capacity(token.len());
        let mut chars = token[1..].chars();
        loop {
            match chars.next() {
                Some('\\') => out.push(chars.next().ok_or_else(err)?),
                // The closing quote must be the final character.
                Some('"') if chars.as_str().is_empty() => return Ok(out),
                Some('"') | None => return Err(err()),
                Some(c) => out.push(c),
            }
        }
    }

    fn encode(&self) -> String {
        let mut out = String::with_capacity(self.len() + 2);
        out.push('"');
        for c in self.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
        out
    }
}

// ── Byte buffers ─────────────────────────────────────────────────────

impl WireType for Bytes {
    const TYPE_NAME: &'static str = "bytes";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        let err = || DecodeError::new(token, Self::TYPE_NAME);

        let (inner, radix) = if let Some(hex) = token
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
        {
            (hex, 16)
        } else if let Some(dec) = token
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
        {
            (dec, 10)
        } else {
            return Err(err());
        };

        if inner.trim().is_empty() {
            return Ok(Self::new());
        }

        inner
            .split(',')
            .map(|part| {
                let part = part.trim();
                let valid_len = if radix == 16 {
                    (1..=2).contains(&part.len())
                } else {
                    (1..=3).contains(&part.len())
                };
                if !valid_len {
                    return Err(err());
                }
                u8::from_str_radix(part, radix).map_err(|_| err())
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Self::from)
    }

    fn encode(&self) -> String {
        let parts: Vec<String> = self.iter().map(|b| format!("{b:02X}")).collect();
        format!("{{{}}}", parts.join(","))
    }
}

// ── Enumerations ─────────────────────────────────────────────────────

/// Implement [`WireType`] for enums that travel by symbolic name.
///
/// The enum must derive `strum::EnumString` and `strum::IntoStaticStr`
/// and be `Copy`; the strum name table is the only mapping used, so an
/// ordinal on the wire is a decode error.
#[macro_export]
macro_rules! wire_enum {
    ($($t:ty),* $(,)?) => {$(
        impl $crate::codec::WireType for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn decode(token: &str) -> ::core::result::Result<Self, $crate::codec::DecodeError> {
                <$t as ::core::str::FromStr>::from_str(token)
                    .map_err(|_| $crate::codec::DecodeError::new(token, <Self as $crate::codec::WireType>::TYPE_NAME))
            }

            fn encode(&self) -> ::std::string::String {
                let name: &'static str = self.into();
                name.to_owned()
            }
        }
    )*};
}

/// Explicit ordinal table for enums that an interface documents as
/// travelling by number rather than by name.
pub trait OrdinalEnum: Copy + Sized {
    const TYPE_NAME: &'static str;

    fn to_ordinal(self) -> i64;

    fn from_ordinal(value: i64) -> Option<Self>;
}

/// Declare the ordinal table of an enum.
///
/// ```rust,ignore
/// ordinal_enum!(RgbChannel { 0 => Red, 1 => Green, 2 => Blue, 3 => White });
/// ```
#[macro_export]
macro_rules! ordinal_enum {
    ($t:ident { $($n:literal => $variant:ident),+ $(,)? }) => {
        impl $crate::codec::OrdinalEnum for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn to_ordinal(self) -> i64 {
                match self {
                    $(Self::$variant => $n,)+
                }
            }

            fn from_ordinal(value: i64) -> ::core::option::Option<Self> {
                match value {
                    $($n => ::core::option::Option::Some(Self::$variant),)+
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
}

/// Wire adapter sending an [`OrdinalEnum`] as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordinal<E>(pub E);

impl<E: OrdinalEnum> WireType for Ordinal<E> {
    const TYPE_NAME: &'static str = E::TYPE_NAME;

    fn decode(token: &str) -> Result<Self, DecodeError> {
        token
            .parse::<i64>()
            .ok()
            .and_then(E::from_ordinal)
            .map(Ordinal)
            .ok_or_else(|| DecodeError::new(token, Self::TYPE_NAME))
    }

    fn encode(&self) -> String {
        self.0.to_ordinal().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::{EnumString, IntoStaticStr};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
    enum Mode {
        Off,
        Cool,
        Heat,
    }

    wire_enum!(Mode);
    ordinal_enum!(Mode { 0 => Off, 1 => Cool, 2 => Heat });

    fn round_trip<T: WireType + PartialEq + std::fmt::Debug>(values: &[T]) {
        for v in values {
            let token = encode(v);
            assert_eq!(&decode::<T>(&token).unwrap(), v, "token {token:?}");
        }
    }

    #[test]
    fn round_trips_every_supported_type() {
        round_trip(&[0_i32, 1, -1, i32::MAX, i32::MIN]);
        round_trip(&[0_u8, 128, 255]);
        round_trip(&[i64::MIN, 0, i64::MAX]);
        round_trip(&[true, false]);
        round_trip(&[
            String::new(),
            "plain".to_owned(),
            "with space".to_owned(),
            r#"say "hi""#.to_owned(),
            r"back\slash".to_owned(),
        ]);
        round_trip(&[
            FixedPoint::ZERO,
            FixedPoint::from_thousandths(21_500),
            FixedPoint::from_thousandths(-1),
            FixedPoint::from_int(100),
        ]);
        round_trip(&[Bytes::new(), Bytes::from_static(&[0, 1, 0xAB, 0xFF])]);
        round_trip(&[Mode::Off, Mode::Cool, Mode::Heat]);
        round_trip(&[Ordinal(Mode::Off), Ordinal(Mode::Heat)]);
        round_trip(&[
            Value::Int(-7),
            Value::from(true),
            Value::Fixed(FixedPoint::from_thousandths(21_500)),
            Value::Fixed(FixedPoint::from_int(3)),
            Value::Text(String::new()),
            Value::Text("42".to_owned()),
            Value::Text("two words".to_owned()),
            Value::Bytes(Bytes::from_static(&[0x10, 0x20])),
            Value::Symbol("Heating".to_owned()),
        ]);
    }

    #[test]
    fn out_of_grammar_tokens_fail_deterministically() {
        for _ in 0..3 {
            assert_eq!(
                decode::<bool>("2").unwrap_err(),
                DecodeError::new("2", "bool")
            );
            assert!(decode::<i32>("1.5").is_err());
            assert!(decode::<u8>("256").is_err());
            assert!(decode::<FixedPoint>("warm").is_err());
            assert!(decode::<Bytes>("{GG}").is_err());
            assert!(decode::<Bytes>("[1,,2]").is_err());
            assert!(decode::<Bytes>("1,2").is_err());
            assert!(decode::<String>(r#""unterminated"#).is_err());
            assert!(decode::<String>(r#""early"end""#).is_err());
            assert!(decode::<Mode>("1").is_err());
            assert!(decode::<Mode>("heat").is_err());
            assert!(decode::<Ordinal<Mode>>("Heat").is_err());
            assert!(decode::<Ordinal<Mode>>("7").is_err());
        }
    }

    #[test]
    fn decodes_both_buffer_forms() {
        let hex: Bytes = decode("{0a,FF,7}").unwrap();
        let dec: Bytes = decode("[10, 255, 7]").unwrap();
        assert_eq!(hex, dec);
        assert_eq!(encode(&hex), "{0A,FF,07}");
    }

    #[test]
    fn bare_string_tokens_decode_verbatim() {
        assert_eq!(decode::<String>("Heating").unwrap(), "Heating");
    }

    #[test]
    fn enums_travel_by_name() {
        assert_eq!(encode(&Mode::Heat), "Heat");
        assert_eq!(decode::<Mode>("Cool").unwrap(), Mode::Cool);
        assert_eq!(encode(&Ordinal(Mode::Heat)), "2");
    }

    #[test]
    fn wire_args_encodes_each_argument() {
        let args = wire_args![42_u8, true, FixedPoint::from_int(3), "a b".to_owned()];
        assert_eq!(args, vec!["42", "1", "3.000", r#""a b""#]);
    }
}
