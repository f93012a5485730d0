//! Custom prompt filters

use minijinja::value::Value;
use minijinja::{Error, ErrorKind};

/// Register all custom filters with a minijinja Environment
pub fn register_filters(env: &mut minijinja::Environment) {
    env.add_filter("json", filter_json);
    env.add_filter("word_count", filter_word_count);
    env.add_filter("truncate_words", filter_truncate_words);
}

/// Serialize value to a JSON string
fn filter_json(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("JSON serialization failed: {}", e),
        )
    })
}

/// Number of whitespace-separated words
fn filter_word_count(value: Value) -> usize {
    if value.is_undefined() || value.is_none() {
        return 0;
    }
    value.to_string().split_whitespace().count()
}

/// Keep at most `limit` words, marking the cut with an ellipsis
fn filter_truncate_words(value: Value, limit: usize) -> String {
    let text = value.to_string();
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.len() <= limit {
        return words.join(" ");
    }
    format!("{} ...", words[..limit].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json() {
        let value = Value::from(vec!["a", "b"]);
        assert_eq!(filter_json(value).unwrap(), r#"["a","b"]"#);

        assert_eq!(filter_json(Value::from("quote\"d")).unwrap(), r#""quote\"d""#);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(filter_word_count(Value::from("the quick  brown fox")), 4);
        assert_eq!(filter_word_count(Value::from("")), 0);
        assert_eq!(filter_word_count(Value::UNDEFINED), 0);
    }

    #[test]
    fn test_truncate_words() {
        let value = Value::from("one two three four");
        assert_eq!(filter_truncate_words(value.clone(), 2), "one two ...");
        assert_eq!(filter_truncate_words(value, 10), "one two three four");
    }
}
