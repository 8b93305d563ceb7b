use crate::data;
use crate::generator::{random_choice, Generator};

/// Apply the input's case style to a generated value: all-upper and all-lower
/// inputs keep their style, everything else keeps the list's title case.
fn match_case(input: &str, value: String) -> String {
    if input.len() > 1 && input == input.to_uppercase() {
        value.to_uppercase()
    } else if input.len() > 1 && input == input.to_lowercase() {
        value.to_lowercase()
    } else {
        value
    }
}

/// Full person names, `Last, First` aware.
pub struct NameGenerator;

impl Generator for NameGenerator {
    fn name(&self) -> &str {
        "PERSON_NAME"
    }

    fn generate(&self, input: &str) -> String {
        let first = random_choice(data::FIRST_NAMES);
        let last = random_choice(data::LAST_NAMES);

        if input.contains(',') {
            return format!("{last}, {first}");
        }
        match_case(input, format!("{first} {last}"))
    }
}

pub struct FirstNameGenerator;

impl Generator for FirstNameGenerator {
    fn name(&self) -> &str {
        "PERSON_FIRST_NAME"
    }

    fn generate(&self, input: &str) -> String {
        match_case(input, random_choice(data::FIRST_NAMES).to_string())
    }
}

pub struct LastNameGenerator;

impl Generator for LastNameGenerator {
    fn name(&self) -> &str {
        "PERSON_LAST_NAME"
    }

    fn generate(&self, input: &str) -> String {
        match_case(input, random_choice(data::LAST_NAMES).to_string())
    }
}
