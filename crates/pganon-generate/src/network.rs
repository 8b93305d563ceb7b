use crate::data;
use crate::generator::{random_choice, random_int, Generator};

/// IPv4 addresses, avoiding loopback and multicast ranges.
pub struct Ipv4Generator;

impl Ipv4Generator {
    fn first_octet() -> usize {
        match random_int(5) {
            0 => 10,
            1 => 172,
            2 => 192,
            _ => loop {
                let octet = 1 + random_int(223);
                if octet != 127 && octet != 10 {
                    break octet;
                }
            },
        }
    }
}

impl Generator for Ipv4Generator {
    fn name(&self) -> &str {
        "IPV4_ADDRESS"
    }

    fn generate(&self, _input: &str) -> String {
        format!(
            "{}.{}.{}.{}",
            Self::first_octet(),
            random_int(256),
            random_int(256),
            1 + random_int(254)
        )
    }
}

/// IPv6 addresses, compressed-notation and case aware.
pub struct Ipv6Generator;

impl Ipv6Generator {
    fn hex_group(uppercase: bool) -> String {
        let chars: &[u8] = if uppercase {
            b"0123456789ABCDEF"
        } else {
            b"0123456789abcdef"
        };
        (0..4).map(|_| char::from(chars[random_int(16)])).collect()
    }
}

impl Generator for Ipv6Generator {
    fn name(&self) -> &str {
        "IPV6_ADDRESS"
    }

    fn generate(&self, input: &str) -> String {
        let compressed = input.contains("::");
        let uppercase =
            input.to_uppercase() == input && input.chars().any(|c| c.is_ascii_alphabetic());

        if compressed && random_int(2) == 0 {
            return format!(
                "2001:db8:{}:{}::{}",
                Self::hex_group(uppercase),
                Self::hex_group(uppercase),
                Self::hex_group(uppercase)
            );
        }

        (0..8)
            .map(|_| Self::hex_group(uppercase))
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Hostnames, FQDN and numeric-suffix aware.
pub struct HostnameGenerator;

impl Generator for HostnameGenerator {
    fn name(&self) -> &str {
        "HOSTNAME"
    }

    fn generate(&self, input: &str) -> String {
        let is_fqdn = input.contains('.');
        let has_number = input.chars().any(|c| c.is_ascii_digit());

        let prefix = random_choice(data::HOSTNAME_PREFIXES);
        let hostname = if has_number {
            format!("{prefix}{:02}", 1 + random_int(99))
        } else {
            prefix.to_string()
        };

        if is_fqdn {
            format!("{hostname}.{}", random_choice(data::HOSTNAME_DOMAINS))
        } else {
            hostname
        }
    }
}
