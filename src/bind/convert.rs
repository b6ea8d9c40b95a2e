//! Scalar conversion at leaf positions.

use crate::model::{ScalarKind, Value};
use crate::name::uniform_form;

/// Why a value could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConversionFailure(pub String);

impl ConversionFailure {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Converts source values into the scalar a target expects.
pub trait Converter: Send + Sync {
    fn convert(&self, value: &Value, kind: &ScalarKind) -> Result<Value, ConversionFailure>;
}

/// Text-tolerant converter for the built-in scalar kinds.
///
/// | Kind | Accepts |
/// |------|---------|
/// | `String` | any scalar, rendered as text |
/// | `Bool` | `true/false/yes/no/on/off/1/0`, any case |
/// | `Int` | decimal or `0x` hex text, integral floats; range checked |
/// | `Float` | numbers and numeric text |
/// | `Char` | text of exactly one character |
/// | `Enum` | variant names compared in uniform form (`FOO_BAR` selects `FooBar`) |
///
/// Null passes through unchanged for every kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn convert(&self, value: &Value, kind: &ScalarKind) -> Result<Value, ConversionFailure> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        if !value.is_scalar() {
            return Err(ConversionFailure::new(format!("a {} cannot become a {kind}", value.type_name())));
        }
        match kind {
            ScalarKind::String => Ok(Value::String(text_of(value)?)),
            ScalarKind::Bool => to_bool(value).map(Value::Bool),
            ScalarKind::Int { min, max } => {
                let int = to_int(value)?;
                if int < *min || int > *max {
                    return Err(ConversionFailure::new(format!("{int} is out of range [{min}, {max}]")));
                }
                Ok(Value::Int(int))
            }
            ScalarKind::Float => to_float(value).map(Value::Float),
            ScalarKind::Char => {
                let text = text_of(value)?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Value::String(ch.to_string())),
                    _ => Err(ConversionFailure::new(format!("'{text}' is not a single character"))),
                }
            }
            ScalarKind::Enum(variants) => {
                let text = text_of(value)?;
                let wanted = uniform_form(&text);
                variants
                    .iter()
                    .find(|variant| uniform_form(variant) == wanted)
                    .map(|variant| Value::String((*variant).to_owned()))
                    .ok_or_else(|| ConversionFailure::new(format!("'{text}' is not one of [{}]", variants.join(", "))))
            }
        }
    }
}

fn text_of(value: &Value) -> Result<String, ConversionFailure> {
    value
        .to_text()
        .map(|text| text.into_owned())
        .ok_or_else(|| ConversionFailure::new(format!("a {} has no text form", value.type_name())))
}

fn to_bool(value: &Value) -> Result<bool, ConversionFailure> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ConversionFailure::new(format!("'{text}' is not a boolean"))),
        },
        other => Err(ConversionFailure::new(format!("{other} is not a boolean"))),
    }
}

fn to_int(value: &Value) -> Result<i64, ConversionFailure> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(_) => value
            .as_int()
            .ok_or_else(|| ConversionFailure::new(format!("{value} is not an integer"))),
        Value::String(text) => parse_int(text.trim())
            .ok_or_else(|| ConversionFailure::new(format!("'{text}' is not an integer"))),
        other => Err(ConversionFailure::new(format!("{other} is not an integer"))),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None if digits.bytes().all(|b| b.is_ascii_digit()) => digits.parse::<i128>().ok()?,
        None => return None,
    };
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

fn to_float(value: &Value) -> Result<f64, ConversionFailure> {
    match value {
        Value::Int(_) | Value::Float(_) => value
            .as_float()
            .ok_or_else(|| ConversionFailure::new(format!("{value} is not a number"))),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionFailure::new(format!("'{text}' is not a number"))),
        other => Err(ConversionFailure::new(format!("{other} is not a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORS: &[&str] = &["Red", "DarkBlue"];

    fn convert(value: impl Into<Value>, kind: ScalarKind) -> Result<Value, ConversionFailure> {
        DefaultConverter.convert(&value.into(), &kind)
    }

    #[test]
    fn test_bool_spellings() {
        for text in ["true", "YES", "on", "1"] {
            assert_eq!(convert(text, ScalarKind::Bool), Ok(Value::Bool(true)));
        }
        for text in ["false", "No", "OFF", "0"] {
            assert_eq!(convert(text, ScalarKind::Bool), Ok(Value::Bool(false)));
        }
        assert!(convert("maybe", ScalarKind::Bool).is_err());
    }

    #[test]
    fn test_int_range_and_hex() {
        let port = ScalarKind::int(0, 65535);
        assert_eq!(convert("8080", port.clone()), Ok(Value::Int(8080)));
        assert_eq!(convert(" 0x1F ", port.clone()), Ok(Value::Int(31)));
        assert_eq!(convert(Value::Float(80.0), port.clone()), Ok(Value::Int(80)));
        assert!(convert("70000", port.clone()).is_err());
        assert!(convert("-1", port.clone()).is_err());
        assert!(convert("80a", port).is_err());
        assert_eq!(convert("-42", ScalarKind::int(-100, 100)), Ok(Value::Int(-42)));
    }

    #[test]
    fn test_out_of_range_float_is_not_an_integer() {
        let any = ScalarKind::int(i128::from(i64::MIN), i128::from(i64::MAX));
        assert!(convert(Value::Float(1e20), any.clone()).is_err());
        assert!(convert(Value::Float(-1e20), any.clone()).is_err());
        assert_eq!(convert(Value::Float(1e15), any), Ok(Value::Int(1_000_000_000_000_000)));
    }

    #[test]
    fn test_string_renders_scalars() {
        assert_eq!(convert(30, ScalarKind::String), Ok(Value::from("30")));
        assert_eq!(convert(true, ScalarKind::String), Ok(Value::from("true")));
        assert!(convert(vec![1], ScalarKind::String).is_err());
    }

    #[test]
    fn test_enum_is_lenient() {
        for text in ["dark-blue", "DARK_BLUE", "darkBlue"] {
            assert_eq!(convert(text, ScalarKind::Enum(COLORS)), Ok(Value::from("DarkBlue")));
        }
        assert!(convert("green", ScalarKind::Enum(COLORS)).is_err());
    }

    #[test]
    fn test_char_and_float() {
        assert_eq!(convert("x", ScalarKind::Char), Ok(Value::from("x")));
        assert!(convert("xy", ScalarKind::Char).is_err());
        assert_eq!(convert("1.5", ScalarKind::Float), Ok(Value::Float(1.5)));
        assert_eq!(convert(2, ScalarKind::Float), Ok(Value::Float(2.0)));
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(convert(Value::Null, ScalarKind::Bool), Ok(Value::Null));
    }
}
