//! Values and types that exist at run time.

use std::{
    convert::Infallible,
    fmt,
    io::{Read, Write},
    str::FromStr,
    sync::Arc,
};

use crate::binary::{Deserialize, Deserializer, Error, ErrorKind, Serialize, Serializer};

/// Static type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    Void = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    /// Any value, including `null`.
    Object = 5,
}

impl Type {
    pub const ALL: [Type; 6] = [
        Type::Void,
        Type::Bool,
        Type::Int,
        Type::Float,
        Type::String,
        Type::Object,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Type::Void => "void",
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Float => "float",
            Type::String => "string",
            Type::Object => "object",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.keyword() == keyword)
    }

    /// Returns whether a value of type `source` can be stored in a slot of this type without an
    /// explicit conversion.
    pub fn is_assignable_from(self, source: Type) -> bool {
        match (self, source) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Object, _) => true,
            (Type::Float, Type::Int) => true,
            (target, source) => target == source,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl Serialize for Type {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        (*self as u8).serialize(serializer)
    }
}

impl Deserialize for Type {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        let tag = deserializer.deserialize::<u8>()?;
        Self::ALL
            .into_iter()
            .find(|ty| *ty as u8 == tag)
            .ok_or_else(|| ErrorKind::Deserialize.make(format!("invalid type tag {tag}")))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
}

impl Value {
    /// The most specific type of the value. `null` has type `object`.
    pub fn ty(&self) -> Type {
        match self {
            Value::Null => Type::Object,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
        }
    }

    /// Converts the value so that it can be stored in a slot of type `ty`, or returns `None` if
    /// that is not possible.
    pub fn coerce_to(&self, ty: Type) -> Option<Value> {
        match (ty, self) {
            (Type::Void, _) => None,
            (Type::Object, value) => Some(value.clone()),
            (Type::String, Value::Null) => Some(Value::Null),
            (Type::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (ty, value) if value.ty() == ty => Some(value.clone()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

/// Parses a value from loosely typed text, as found on command lines: integers, floats,
/// `true`/`false` and `null` are recognized, and everything else becomes a string.
impl FromStr for Value {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => {
                if let Ok(i) = s.parse::<i64>() {
                    Value::Int(i)
                } else if let Ok(x) = s.parse::<f64>() {
                    Value::Float(x)
                } else {
                    Value::String(Arc::from(s))
                }
            }
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl Serialize for Value {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> Result<(), Error> {
        match self {
            Value::Null => 0_u8.serialize(serializer),
            Value::Bool(b) => {
                1_u8.serialize(serializer)?;
                b.serialize(serializer)
            }
            Value::Int(i) => {
                2_u8.serialize(serializer)?;
                i.serialize(serializer)
            }
            Value::Float(x) => {
                3_u8.serialize(serializer)?;
                x.serialize(serializer)
            }
            Value::String(s) => {
                4_u8.serialize(serializer)?;
                s.serialize(serializer)
            }
        }
    }
}

impl Deserialize for Value {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> Result<Self, Error> {
        Ok(match deserializer.deserialize::<u8>()? {
            0 => Value::Null,
            1 => Value::Bool(deserializer.deserialize()?),
            2 => Value::Int(deserializer.deserialize()?),
            3 => Value::Float(deserializer.deserialize()?),
            4 => Value::String(deserializer.deserialize()?),
            other => return Err(ErrorKind::Deserialize.make(format!("invalid value tag {other}"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{deserialize, serialize};

    #[test]
    fn ints_widen_to_floats_but_not_back() {
        assert!(Type::Float.is_assignable_from(Type::Int));
        assert!(!Type::Int.is_assignable_from(Type::Float));
        assert!(Type::Object.is_assignable_from(Type::String));
        assert!(!Type::Object.is_assignable_from(Type::Void));
        assert_eq!(Value::Int(2).coerce_to(Type::Float), Some(Value::Float(2.0)));
        assert_eq!(Value::Float(2.0).coerce_to(Type::Int), None);
    }

    #[test]
    fn loose_parsing_prefers_the_narrowest_type() {
        assert_eq!("41".parse::<Value>(), Ok(Value::Int(41)));
        assert_eq!("4.5".parse::<Value>(), Ok(Value::Float(4.5)));
        assert_eq!("true".parse::<Value>(), Ok(Value::Bool(true)));
        assert_eq!("hello".parse::<Value>(), Ok(Value::from("hello")));
    }

    #[test]
    fn values_survive_serialization() {
        let value = Value::from("constant");
        let bytes = serialize(&value).unwrap();
        assert_eq!(deserialize::<Value>(&bytes).unwrap(), value);
        assert!(deserialize::<Value>(&[9]).is_err());
    }

    #[test]
    fn type_keywords() {
        assert_eq!(Type::from_keyword("float"), Some(Type::Float));
        assert_eq!(Type::from_keyword("double"), None);
        assert_eq!(Type::Object.to_string(), "object");
    }
}
