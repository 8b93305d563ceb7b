use crate::data;
use crate::generator::{random_choice, Generator};

/// Lorem ipsum text roughly matching the input length.
pub struct LoremGenerator;

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Generator for LoremGenerator {
    fn name(&self) -> &str {
        "LOREMIPSUM"
    }

    fn generate(&self, input: &str) -> String {
        let target = if input.is_empty() { 50 } else { input.len() };

        let mut out = String::new();
        let mut word_count = 0usize;

        while out.len() < target {
            let word = random_choice(data::LOREM_WORDS);

            if !out.is_empty() {
                if out.len() + 1 + word.len() > target + 10 {
                    break;
                }
                out.push(' ');
            }

            if word_count == 0 {
                out.push_str(&capitalize(word));
            } else {
                out.push_str(word);
            }
            word_count += 1;

            // Sentence break every eight words or so.
            if word_count % 8 == 0 && out.len() + 10 < target {
                out.push('.');
                if out.len() + 5 < target {
                    out.push(' ');
                    out.push_str(&capitalize(random_choice(data::LOREM_WORDS)));
                    word_count += 1;
                }
            }
        }

        if !out.is_empty() && !out.ends_with('.') {
            out.push('.');
        }
        out
    }
}
