use crate::generator::{luhn_check_digit, random_digits, random_int, Generator};

/// Luhn-valid card numbers in the Visa range, separator-preserving.
pub struct CreditCardGenerator;

impl Generator for CreditCardGenerator {
    fn name(&self) -> &str {
        "CREDIT_CARD"
    }

    fn generate(&self, input: &str) -> String {
        let sep = if input.contains('-') {
            Some('-')
        } else if input.contains(' ') {
            Some(' ')
        } else {
            None
        };

        let payload = format!("4{}", random_digits(14));
        let digits = format!("{payload}{}", luhn_check_digit(&payload));

        match sep {
            Some(sep) => format!(
                "{}{sep}{}{sep}{}{sep}{}",
                &digits[0..4],
                &digits[4..8],
                &digits[8..12],
                &digits[12..16]
            ),
            None => digits,
        }
    }
}

/// Card expiry dates, MM/YY or MM/YYYY depending on the input.
pub struct CreditCardExpiryGenerator;

impl Generator for CreditCardExpiryGenerator {
    fn name(&self) -> &str {
        "CREDIT_CARD_EXPIRY"
    }

    fn generate(&self, input: &str) -> String {
        let month = 1 + random_int(12);
        let year = 27 + random_int(6);

        if input.len() >= 7 && input.contains('/') {
            format!("{month:02}/20{year:02}")
        } else {
            format!("{month:02}/{year:02}")
        }
    }
}

/// Card verification values, 3 digits or 4 for Amex-shaped input.
pub struct CreditCardCvvGenerator;

impl Generator for CreditCardCvvGenerator {
    fn name(&self) -> &str {
        "CREDIT_CARD_CVV"
    }

    fn generate(&self, input: &str) -> String {
        let input_digits = input.chars().filter(char::is_ascii_digit).count();
        let length = if input_digits == 4 { 4 } else { 3 };
        random_digits(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::luhn_valid;

    #[test]
    fn card_numbers_pass_luhn() {
        for _ in 0..32 {
            let out = CreditCardGenerator.generate("4111111111111111");
            assert!(luhn_valid(&out), "{out} fails Luhn");
        }
    }

    #[test]
    fn card_separator_follows_input() {
        let dashed = CreditCardGenerator.generate("4111-1111-1111-1111");
        assert_eq!(dashed.matches('-').count(), 3);

        let spaced = CreditCardGenerator.generate("4111 1111 1111 1111");
        assert_eq!(spaced.matches(' ').count(), 3);

        let plain = CreditCardGenerator.generate("4111111111111111");
        assert_eq!(plain.len(), 16);
        let digits: String = dashed.chars().filter(char::is_ascii_digit).collect();
        assert!(luhn_valid(&digits));
    }

    #[test]
    fn expiry_format_follows_input() {
        let long = CreditCardExpiryGenerator.generate("12/2027");
        assert_eq!(long.len(), 7);
        assert!(long[3..].starts_with("20"));

        let short = CreditCardExpiryGenerator.generate("12/27");
        assert_eq!(short.len(), 5);
    }

    #[test]
    fn cvv_length_follows_input() {
        assert_eq!(CreditCardCvvGenerator.generate("123").len(), 3);
        assert_eq!(CreditCardCvvGenerator.generate("1234").len(), 4);
    }
}
