use regex::Regex;
use std::sync::OnceLock;

fn grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bgrade\s*(\d{1,2})\b").expect("grade pattern"))
}

/// Best-effort grade level from a free-text class name such as "Grade 5 - A".
pub fn parse_grade_level(class_name: &str) -> Option<u8> {
    grade_pattern()
        .captures(class_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Display label for a class name: "Grade N" when it parses, the raw text otherwise.
pub fn grade_label(class_name: &str) -> String {
    match parse_grade_level(class_name) {
        Some(level) => format!("Grade {}", level),
        None => class_name.trim().to_string(),
    }
}
