use serde::{Deserialize, Serialize};

/// The declared value type of a field, function argument or widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Number,
    Date,
    Time,
    Datetime,
    Boolean,
    Select,
    Multiselect,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Number => "number",
            ValueType::Date => "date",
            ValueType::Time => "time",
            ValueType::Datetime => "datetime",
            ValueType::Boolean => "boolean",
            ValueType::Select => "select",
            ValueType::Multiselect => "multiselect",
        }
    }

    /// Whether a raw JSON value has the shape this type stores.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match self {
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Multiselect => match value {
                Value::Array(items) => items.iter().all(|v| v.is_string() || v.is_number()),
                _ => false,
            },
            ValueType::Select => value.is_string() || value.is_number(),
            ValueType::Text | ValueType::Date | ValueType::Time | ValueType::Datetime => {
                value.is_string()
            }
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the right hand side of a rule comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    #[default]
    Value,
    Field,
    Func,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Value => write!(f, "value"),
            ValueSource::Field => write!(f, "field"),
            ValueSource::Func => write!(f, "func"),
        }
    }
}

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub value: String,
    pub title: String,
}

impl ListItem {
    pub fn new(value: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            title: title.into(),
        }
    }
}

/// Moment-style tokens, longest first so `YYYY` wins over `YY`.
const MOMENT_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("M", "%-m"),
    ("D", "%-d"),
    ("H", "%-H"),
    ("h", "%-I"),
    ("m", "%-M"),
    ("s", "%-S"),
    ("A", "%p"),
    ("a", "%P"),
];

/// Translate a moment.js format string (`DD-MM-YYYY`, `h:mm:ss A`) into a
/// chrono strftime pattern. Text inside `[...]` is copied literally.
pub fn moment_to_chrono(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').unwrap_or(stripped.len());
            push_literal(&mut out, &stripped[..end]);
            rest = stripped.get(end + 1..).unwrap_or("");
            continue;
        }
        for (token, pattern) in MOMENT_TOKENS {
            if let Some(stripped) = rest.strip_prefix(token) {
                out.push_str(pattern);
                rest = stripped;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            push_literal(&mut out, c.encode_utf8(&mut [0; 4]));
        }
        rest = chars.as_str();
    }

    out
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moment_date_formats() {
        assert_eq!(moment_to_chrono("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono("DD-MM-YYYY"), "%d-%m-%Y");
        assert_eq!(moment_to_chrono("h:mm:ss A"), "%-I:%M:%S %p");
    }

    #[test]
    fn test_moment_literals() {
        assert_eq!(moment_to_chrono("[Day] D"), "Day %-d");
        assert_eq!(moment_to_chrono("YYYY%"), "%Y%%");
    }

    #[test]
    fn test_type_accepts() {
        use serde_json::json;
        assert!(ValueType::Number.accepts(&json!(3.5)));
        assert!(!ValueType::Number.accepts(&json!("3")));
        assert!(ValueType::Multiselect.accepts(&json!(["a", "b"])));
        assert!(!ValueType::Boolean.accepts(&json!("true")));
    }

    #[test]
    fn test_value_type_serde() {
        let ty: ValueType = serde_json::from_str("\"multiselect\"").unwrap();
        assert_eq!(ty, ValueType::Multiselect);
        assert_eq!(serde_json::to_string(&ValueSource::Func).unwrap(), "\"func\"");
    }
}
