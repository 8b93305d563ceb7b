use sha2::{Digest, Sha256};

use crate::data;
use crate::generator::{random_choice, random_int, Generator};

/// Email generator.
///
/// The local-part embeds six hex characters of a SHA-256 hash of the input,
/// so two distinct originals are very unlikely to collide even before the
/// dictionary's uniqueness machinery runs.
pub struct EmailGenerator;

impl Generator for EmailGenerator {
    fn name(&self) -> &str {
        "EMAIL"
    }

    fn generate(&self, input: &str) -> String {
        let first = random_choice(data::FIRST_NAMES).to_lowercase();
        let last = random_choice(data::LAST_NAMES).to_lowercase();
        let domain = random_choice(data::EMAIL_DOMAINS);

        let digest = Sha256::digest(input.as_bytes());
        let suffix = format!("{digest:x}")[..6].to_string();

        let f = first.chars().next().unwrap_or('x');
        let l = last.chars().next().unwrap_or('x');

        match random_int(5) {
            0 => format!("{first}.{last}.{suffix}@{domain}"),
            1 => format!("{f}{last}.{suffix}@{domain}"),
            2 => format!("{first}{l}.{suffix}@{domain}"),
            3 => format!("{first}_{last}_{suffix}@{domain}"),
            _ => format!("{first}{last}.{suffix}@{domain}"),
        }
    }
}
