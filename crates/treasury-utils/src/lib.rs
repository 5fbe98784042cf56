//! Formatting helpers shared by the console crates

/// Insert thousands separators into the integer part of a number
///
/// The sign and any fractional part are kept as-is, so `-1234567.50`
/// becomes `-1,234,567.50`.
pub fn group_thousands(number: &str, separator: char) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (integer, fraction) = match unsigned.find('.') {
        Some(pos) => (&unsigned[..pos], &unsigned[pos..]),
        None => (unsigned, ""),
    };

    let mut grouped = String::new();
    let mut count = 0;
    for c in integer.chars().rev() {
        if count == 3 {
            grouped.push(separator);
            count = 0;
        }
        grouped.push(c);
        count += 1;
    }
    let integer: String = grouped.chars().rev().collect();
    format!("{}{}{}", sign, integer, fraction)
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Generate a request identifier for log correlation
pub fn request_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("100", ','), "100");
        assert_eq!(group_thousands("1234567", ','), "1,234,567");
        assert_eq!(group_thousands("-1234567.50", ','), "-1,234,567.50");
        assert_eq!(group_thousands("1000.125", '\''), "1'000.125");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("A & B"), "A &amp; B");
    }

    #[test]
    fn test_request_ids_are_unique() {
        let id = request_id();
        assert_ne!(id, request_id());
        let hex = id.strip_prefix("req-").unwrap();
        assert_eq!(hex.len(), 32);
        assert!(uuid::Uuid::parse_str(hex).is_ok());
    }
}
