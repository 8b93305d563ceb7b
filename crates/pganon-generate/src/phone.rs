use crate::generator::{
    detect_phone_shape, format_phone, random_digits, random_int, Generator,
};

/// US phone numbers in the fictional 555-01xx range, shaped like the input.
pub struct UsPhoneGenerator;

impl Generator for UsPhoneGenerator {
    fn name(&self) -> &str {
        "US_PHONE"
    }

    fn generate(&self, input: &str) -> String {
        let shape = detect_phone_shape(input);

        // Area code 2xx-9xx, 555 exchange, 01xx subscriber block.
        let area = format!("{}{}", 2 + random_int(8), random_digits(2));
        let subscriber = format!("01{:02}", random_int(100));

        format_phone(&format!("{area}555{subscriber}"), shape)
    }
}

struct UkRange {
    area: &'static str,
    exchange: &'static str,
}

// Ofcom-reserved drama ranges.
const UK_LANDLINE: &[UkRange] = &[
    UkRange { area: "20", exchange: "7946 0" },
    UkRange { area: "117", exchange: "496 0" },
    UkRange { area: "131", exchange: "496 0" },
    UkRange { area: "161", exchange: "496 0" },
];
const UK_MOBILE: UkRange = UkRange { area: "7700", exchange: "900" };

/// UK phone numbers from the Ofcom fictional ranges, +44 and mobile aware.
pub struct UkPhoneGenerator;

impl Generator for UkPhoneGenerator {
    fn name(&self) -> &str {
        "UK_PHONE"
    }

    fn generate(&self, input: &str) -> String {
        let has_country = input.contains("+44");
        let is_mobile = input.contains("07") || input.contains("+447");

        let range = if is_mobile {
            &UK_MOBILE
        } else {
            &UK_LANDLINE[random_int(UK_LANDLINE.len())]
        };
        let subscriber = format!("{:03}", random_int(1000));

        if has_country {
            format!("+44 {} {}{}", range.area, range.exchange, subscriber)
        } else {
            format!("0{} {}{}", range.area, range.exchange, subscriber)
        }
    }
}

/// International numbers: +CC followed by a ten-digit national number.
pub struct InternationalPhoneGenerator;

impl Generator for InternationalPhoneGenerator {
    fn name(&self) -> &str {
        "INTERNATIONAL_PHONE"
    }

    fn generate(&self, input: &str) -> String {
        let shape = detect_phone_shape(input);
        let country = 1 + random_int(99);
        let national = format_phone(&random_digits(10), shape);

        if shape.has_country {
            format!("+{country} {national}")
        } else {
            national
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_phone_matches_input_digit_count() {
        for input in ["202-555-0123", "(202) 555-0123", "202.555.0123", "2025550123"] {
            let out = UsPhoneGenerator.generate(input);
            let in_digits = input.chars().filter(char::is_ascii_digit).count();
            let out_digits = out.chars().filter(char::is_ascii_digit).count();
            assert_eq!(in_digits, out_digits, "{input} -> {out}");
        }
    }

    #[test]
    fn us_phone_uses_fictional_exchange() {
        let out = UsPhoneGenerator.generate("2025550123");
        assert_eq!(&out[3..6], "555");
    }

    #[test]
    fn uk_phone_keeps_country_prefix() {
        let out = UkPhoneGenerator.generate("+44 20 7946 0000");
        assert!(out.starts_with("+44 "), "{out}");

        let out = UkPhoneGenerator.generate("020 7946 0000");
        assert!(out.starts_with('0'), "{out}");
    }

    #[test]
    fn uk_mobile_input_yields_mobile_range() {
        let out = UkPhoneGenerator.generate("07700 900123");
        assert!(out.starts_with("07700"), "{out}");
    }
}
