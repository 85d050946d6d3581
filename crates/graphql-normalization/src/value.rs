use std::fmt;

use cynic_parser::ConstValue;

/// An owned GraphQL constant value, as found in directive arguments and default values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub(crate) fn from_ast(value: ConstValue<'_>) -> Self {
        match &value {
            ConstValue::Null(_) => Value::Null,
            ConstValue::Int(n) => Value::Int(n.as_i64()),
            ConstValue::Float(n) => Value::Float(n.as_f64()),
            ConstValue::String(s) => Value::String(s.as_str().to_owned()),
            ConstValue::Boolean(b) => Value::Boolean(b.value()),
            ConstValue::Enum(e) => Value::Enum(e.name().to_owned()),
            ConstValue::List(l) => Value::List(l.items().map(Value::from_ast).collect()),
            ConstValue::Object(o) => Value::Object(
                o.fields()
                    .map(|field| (field.name().to_owned(), Value::from_ast(field.value())))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of value, as used in error messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Boolean(_) => "Boolean",
            Value::Enum(_) => "Enum",
            Value::List(_) => "List",
            Value::Object(_) => "Object",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::String(s) => write_quoted(s, f),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Enum(e) => f.write_str(e),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

pub(crate) fn write_quoted(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '\r' => f.write_str("\\r"),
            '\n' => f.write_str("\\n"),
            '\t' => f.write_str("\\t"),
            '\\' => f.write_str("\\\\"),
            '"' => f.write_str("\\\""),
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32),
            c => write!(f, "{c}"),
        }?;
    }
    f.write_str("\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_escapes_strings() {
        let value = Value::List(vec![
            Value::from("a \"quoted\"\nline"),
            Value::Int(3),
            Value::Object(vec![("consumerName".to_owned(), Value::from("c"))]),
        ]);

        assert_eq!(
            value.to_string(),
            r#"["a \"quoted\"\nline", 3, {consumerName: "c"}]"#
        );
    }
}
