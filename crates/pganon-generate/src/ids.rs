use crate::generator::{random_digit, random_digits, random_int, Generator};

/// US Social Security numbers with a valid area (not 000, not 666, below 900),
/// shaped like the input.
pub struct UsSsnGenerator;

impl UsSsnGenerator {
    fn valid_area() -> usize {
        loop {
            let area = 1 + random_int(899);
            if area != 666 && area < 900 {
                return area;
            }
        }
    }
}

impl Generator for UsSsnGenerator {
    fn name(&self) -> &str {
        "US_SSN"
    }

    fn generate(&self, input: &str) -> String {
        let area = Self::valid_area();
        let group = 1 + random_int(99);
        let serial = 1 + random_int(9999);

        if input.contains('-') {
            format!("{area:03}-{group:02}-{serial:04}")
        } else if input.contains(' ') {
            format!("{area:03} {group:02} {serial:04}")
        } else {
            format!("{area:03}{group:02}{serial:04}")
        }
    }
}

/// UK NHS numbers: ten digits with a modulus-11 check digit, spaced as
/// `XXX XXX XXXX` when the input is.
pub struct UkNhsGenerator;

impl UkNhsGenerator {
    fn check_digit(digits: &[u8; 9]) -> Option<u8> {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, &d)| d as u32 * (10 - i as u32))
            .sum();
        match 11 - (sum % 11) {
            11 => Some(0),
            10 => None,
            d => Some(d as u8),
        }
    }
}

impl Generator for UkNhsGenerator {
    fn name(&self) -> &str {
        "UK_NHS"
    }

    fn generate(&self, input: &str) -> String {
        let mut digits = [0u8; 9];
        let check = loop {
            for d in &mut digits {
                *d = random_int(10) as u8;
            }
            if let Some(check) = Self::check_digit(&digits) {
                break check;
            }
        };

        let mut result: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        result.push(char::from(b'0' + check));

        if input.contains(' ') {
            format!("{} {} {}", &result[0..3], &result[3..6], &result[6..10])
        } else {
            result
        }
    }
}

const NI_PREFIX_LETTERS: &[u8] = b"ABCEGHJKLMNOPRSTWXYZ";
const NI_SUFFIX_LETTERS: &[u8] = b"ABCD";

/// UK National Insurance numbers: two prefix letters, six digits, one suffix
/// letter, spaced `AB 12 34 56 C` when the input is.
pub struct UkNiGenerator;

impl Generator for UkNiGenerator {
    fn name(&self) -> &str {
        "UK_NI"
    }

    fn generate(&self, input: &str) -> String {
        let p1 = char::from(NI_PREFIX_LETTERS[random_int(NI_PREFIX_LETTERS.len())]);
        let p2 = char::from(NI_PREFIX_LETTERS[random_int(NI_PREFIX_LETTERS.len())]);
        let digits = random_digits(6);
        let suffix = char::from(NI_SUFFIX_LETTERS[random_int(NI_SUFFIX_LETTERS.len())]);

        if input.contains(' ') {
            format!(
                "{p1}{p2} {} {} {} {suffix}",
                &digits[0..2],
                &digits[2..4],
                &digits[4..6]
            )
        } else {
            format!("{p1}{p2}{digits}{suffix}")
        }
    }
}

const PASSPORT_LETTERS: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ";

/// Passport numbers: nine characters by default, alphanumeric when the input
/// carries letters, matching longer all-digit inputs in length.
pub struct PassportGenerator;

impl Generator for PassportGenerator {
    fn name(&self) -> &str {
        "PASSPORT"
    }

    fn generate(&self, input: &str) -> String {
        let has_letters = input.chars().any(|c| c.is_ascii_alphabetic());
        let digit_count = input.chars().filter(char::is_ascii_digit).count();
        let length = digit_count.max(9);

        if !has_letters {
            return random_digits(length);
        }

        let letter_count = if length > 8 { 2 } else { 1 };
        let mut out = String::with_capacity(length);
        for _ in 0..letter_count {
            out.push(char::from(PASSPORT_LETTERS[random_int(PASSPORT_LETTERS.len())]));
        }
        while out.len() < length {
            out.push(random_digit());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits_of(s: &str) -> Vec<u8> {
        s.chars()
            .filter(char::is_ascii_digit)
            .map(|c| c as u8 - b'0')
            .collect()
    }

    #[test]
    fn ssn_area_is_valid() {
        for _ in 0..64 {
            let out = UsSsnGenerator.generate("123-45-6789");
            let area: u32 = out[0..3].parse().unwrap();
            assert_ne!(area, 0);
            assert_ne!(area, 666);
            assert!(area < 900, "area {area} out of range");
        }
    }

    #[test]
    fn ssn_shape_follows_input() {
        assert_eq!(UsSsnGenerator.generate("123-45-6789").len(), 11);
        assert!(UsSsnGenerator.generate("123 45 6789").contains(' '));
        assert_eq!(UsSsnGenerator.generate("123456789").len(), 9);
    }

    #[test]
    fn nhs_check_digit_is_valid_mod_11() {
        for _ in 0..64 {
            let out = UkNhsGenerator.generate("9434765919");
            let digits = digits_of(&out);
            assert_eq!(digits.len(), 10);
            let sum: u32 = digits[..9]
                .iter()
                .enumerate()
                .map(|(i, &d)| d as u32 * (10 - i as u32))
                .sum();
            let expected = match 11 - (sum % 11) {
                11 => 0,
                d => d,
            };
            assert_eq!(digits[9] as u32, expected, "bad check digit in {out}");
        }
    }

    #[test]
    fn nhs_spacing_follows_input() {
        let spaced = UkNhsGenerator.generate("943 476 5919");
        assert_eq!(spaced.len(), 12);
        assert_eq!(spaced.matches(' ').count(), 2);
    }

    #[test]
    fn ni_number_shape() {
        let compact = UkNiGenerator.generate("QQ123456C");
        assert_eq!(compact.len(), 9);
        assert!(compact[0..2].chars().all(|c| c.is_ascii_uppercase()));
        assert!(compact[2..8].chars().all(|c| c.is_ascii_digit()));

        let spaced = UkNiGenerator.generate("QQ 12 34 56 C");
        assert_eq!(spaced.matches(' ').count(), 4);
    }

    #[test]
    fn passport_follows_input_style() {
        let alnum = PassportGenerator.generate("AB1234567");
        assert_eq!(alnum.len(), 9);
        assert!(alnum.chars().next().unwrap().is_ascii_uppercase());

        let numeric = PassportGenerator.generate("123456789");
        assert!(numeric.chars().all(|c| c.is_ascii_digit()));
    }
}
