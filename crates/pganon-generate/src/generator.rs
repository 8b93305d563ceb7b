use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::Rng;

/// The capability consumed by the anonymization engine: given an input
/// string, produce a replacement string.
///
/// Implementations are pure except for randomness and must be safe to call
/// from multiple threads, although the engine drives them from one task.
pub trait Generator: Send + Sync {
    /// Pattern name this generator answers to, e.g. `US_PHONE`.
    fn name(&self) -> &str;

    /// Produce an anonymized value for the given input.
    fn generate(&self, input: &str) -> String;
}

/// Generators indexed by upper-cased name.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, generator: Arc<dyn Generator>) {
        self.generators
            .insert(generator.name().to_uppercase(), generator);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(&name.to_uppercase()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generators.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

/// Random integer in `[0, max)` from the OS generator. Returns 0 for max 0.
pub(crate) fn random_int(max: usize) -> usize {
    if max == 0 {
        return 0;
    }
    OsRng.gen_range(0..max)
}

/// Random integer in the inclusive range.
pub(crate) fn random_range(min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    OsRng.gen_range(min..=max)
}

pub(crate) fn random_digit() -> char {
    char::from(b'0' + random_int(10) as u8)
}

pub(crate) fn random_upper() -> char {
    char::from(b'A' + random_int(26) as u8)
}

pub(crate) fn random_lower() -> char {
    char::from(b'a' + random_int(26) as u8)
}

pub(crate) fn random_choice<'a>(choices: &'a [&'a str]) -> &'a str {
    if choices.is_empty() {
        return "";
    }
    choices[random_int(choices.len())]
}

/// A string of `n` random digits.
pub(crate) fn random_digits(n: usize) -> String {
    (0..n).map(|_| random_digit()).collect()
}

/// Luhn check digit for a string of ASCII digits.
pub(crate) fn luhn_check_digit(digits: &str) -> char {
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        let mut d = (b - b'0') as u32;
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    char::from(b'0' + ((10 - (sum % 10)) % 10) as u8)
}

/// Validate a full digit string (payload + check digit) against Luhn.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (payload, check) = digits.split_at(digits.len() - 1);
    luhn_check_digit(payload) == check.chars().next().unwrap_or('x')
}

/// Separator and grouping style detected from a phone-shaped input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PhoneShape {
    pub has_parens: bool,
    pub separator: Option<char>,
    pub has_country: bool,
}

pub(crate) fn detect_phone_shape(input: &str) -> PhoneShape {
    let mut shape = PhoneShape::default();
    for c in input.chars() {
        match c {
            '(' => shape.has_parens = true,
            '-' | '.' | ' ' => {
                if shape.separator.is_none() {
                    shape.separator = Some(c);
                }
            }
            '+' => shape.has_country = true,
            _ => {}
        }
    }
    shape
}

/// Lay out ten digits according to the detected shape.
pub(crate) fn format_phone(digits: &str, shape: PhoneShape) -> String {
    if digits.len() < 10 {
        return digits.to_string();
    }

    let sep = shape.separator.map(String::from).unwrap_or_default();
    if shape.has_parens {
        return format!(
            "({}) {}{}{}",
            &digits[0..3],
            &digits[3..6],
            sep,
            &digits[6..10]
        );
    }
    if !sep.is_empty() {
        return format!(
            "{}{}{}{}{}",
            &digits[0..3],
            sep,
            &digits[3..6],
            sep,
            &digits[6..10]
        );
    }
    digits.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl Generator for Fixed {
        fn name(&self) -> &str {
            "Fixed_Value"
        }
        fn generate(&self, _input: &str) -> String {
            "x".to_string()
        }
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let mut registry = GeneratorRegistry::new();
        registry.register(Arc::new(Fixed));
        assert!(registry.get("fixed_value").is_some());
        assert!(registry.get("FIXED_VALUE").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn luhn_round_trip() {
        let payload = "453201511283036";
        let check = luhn_check_digit(payload);
        let full = format!("{payload}{check}");
        assert!(luhn_valid(&full));
    }

    #[test]
    fn luhn_rejects_wrong_digit() {
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("79927398710"));
    }

    #[test]
    fn phone_shape_detection() {
        let shape = detect_phone_shape("(555) 123-4567");
        assert!(shape.has_parens);
        assert_eq!(shape.separator, Some('-'));
        assert!(!shape.has_country);

        let shape = detect_phone_shape("+1 555 123 4567");
        assert!(shape.has_country);
        assert_eq!(shape.separator, Some(' '));
    }

    #[test]
    fn phone_formatting_preserves_digit_count() {
        let digits = "2025550123";
        for input in ["202-555-0123", "202.555.0123", "(202) 555-0123", "2025550123"] {
            let shape = detect_phone_shape(input);
            let formatted = format_phone(digits, shape);
            let count = formatted.chars().filter(char::is_ascii_digit).count();
            assert_eq!(count, 10, "shape from {input:?} dropped digits");
        }
    }
}
