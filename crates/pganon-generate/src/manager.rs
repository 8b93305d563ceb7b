use std::sync::Arc;

use pganon_core::pattern::Registry as PatternRegistry;
use pganon_core::{Error, Result};

use crate::dob::DobGenerator;
use crate::email::EmailGenerator;
use crate::finance::{CreditCardCvvGenerator, CreditCardExpiryGenerator, CreditCardGenerator};
use crate::format::{FormatGenerator, FormatKind, FormatSpec};
use crate::generator::{Generator, GeneratorRegistry};
use crate::ids::{PassportGenerator, UkNhsGenerator, UkNiGenerator, UsSsnGenerator};
use crate::lorem::LoremGenerator;
use crate::network::{HostnameGenerator, Ipv4Generator, Ipv6Generator};
use crate::person::{FirstNameGenerator, LastNameGenerator, NameGenerator};
use crate::phone::{InternationalPhoneGenerator, UkPhoneGenerator, UsPhoneGenerator};

/// Owns the generator registry: built-ins plus format generators constructed
/// from the loaded pattern registry.
pub struct Manager {
    registry: GeneratorRegistry,
}

impl Manager {
    /// A manager with every built-in generator registered.
    pub fn new() -> Self {
        let mut registry = GeneratorRegistry::new();

        let builtins: Vec<Arc<dyn Generator>> = vec![
            Arc::new(EmailGenerator),
            Arc::new(NameGenerator),
            Arc::new(FirstNameGenerator),
            Arc::new(LastNameGenerator),
            Arc::new(UsPhoneGenerator),
            Arc::new(UkPhoneGenerator),
            Arc::new(InternationalPhoneGenerator),
            Arc::new(CreditCardGenerator),
            Arc::new(CreditCardExpiryGenerator),
            Arc::new(CreditCardCvvGenerator),
            Arc::new(UsSsnGenerator),
            Arc::new(UkNhsGenerator),
            Arc::new(UkNiGenerator),
            Arc::new(PassportGenerator),
            Arc::new(DobGenerator::any()),
            Arc::new(DobGenerator::over_13()),
            Arc::new(DobGenerator::over_16()),
            Arc::new(DobGenerator::over_18()),
            Arc::new(DobGenerator::over_21()),
            Arc::new(Ipv4Generator),
            Arc::new(Ipv6Generator),
            Arc::new(HostnameGenerator),
            Arc::new(LoremGenerator),
        ];
        for generator in builtins {
            registry.register(generator);
        }

        Self { registry }
    }

    /// Register format generators for every format-backed pattern, and check
    /// that alias patterns point at a known generator.
    pub fn register_patterns(&mut self, patterns: &PatternRegistry) -> Result<()> {
        for pattern in patterns.iter() {
            if let Some(format) = &pattern.format {
                let kind = pattern
                    .kind
                    .as_deref()
                    .and_then(FormatKind::parse);
                let spec = FormatSpec::new(
                    format.clone(),
                    kind,
                    pattern.min,
                    pattern.max,
                    pattern.min_year,
                    pattern.max_year,
                );
                self.registry
                    .register(Arc::new(FormatGenerator::new(&pattern.name, spec)));
            } else if let Some(replacement) = &pattern.replacement {
                let target = self.registry.get(replacement).ok_or_else(|| {
                    Error::pattern_named(
                        &pattern.name,
                        format!("replacement names unknown generator {replacement:?}"),
                    )
                })?;
                // Re-bind the built-in under the pattern's alias.
                self.registry
                    .register(Arc::new(Alias::new(&pattern.name, target)));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.registry.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// A built-in generator re-registered under a user-chosen name.
struct Alias {
    name: String,
    target: Arc<dyn Generator>,
}

impl Alias {
    fn new(name: impl Into<String>, target: Arc<dyn Generator>) -> Self {
        Self { name: name.into(), target }
    }
}

impl Generator for Alias {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, input: &str) -> String {
        self.target.generate(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pganon_core::pattern::Pattern;

    #[test]
    fn builtins_are_registered() {
        let manager = Manager::new();
        for name in ["EMAIL", "PERSON_NAME", "US_PHONE", "CREDIT_CARD", "UK_NHS", "US_SSN"] {
            assert!(manager.get(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn alias_pattern_rebinds_builtin() {
        let mut patterns = PatternRegistry::new();
        patterns
            .add(Pattern {
                name: "CUSTOMER_EMAIL".into(),
                replacement: Some("EMAIL".into()),
                ..Pattern::default()
            })
            .unwrap();

        let mut manager = Manager::new();
        manager.register_patterns(&patterns).unwrap();

        let gen = manager.get("customer_email").unwrap();
        let out = gen.generate("a@x.com");
        assert!(out.contains('@'));
    }

    #[test]
    fn alias_to_unknown_generator_fails() {
        let mut patterns = PatternRegistry::new();
        patterns
            .add(Pattern {
                name: "BROKEN".into(),
                replacement: Some("NO_SUCH_GENERATOR".into()),
                ..Pattern::default()
            })
            .unwrap();

        let mut manager = Manager::new();
        let err = manager.register_patterns(&patterns).unwrap_err();
        assert!(err.to_string().contains("unknown generator"));
    }

    #[test]
    fn format_pattern_becomes_generator() {
        let mut patterns = PatternRegistry::new();
        patterns
            .add(Pattern {
                name: "BADGE".into(),
                format: Some("EMP-####".into()),
                ..Pattern::default()
            })
            .unwrap();

        let mut manager = Manager::new();
        manager.register_patterns(&patterns).unwrap();

        let out = manager.get("BADGE").unwrap().generate("EMP-1234");
        assert!(out.starts_with("EMP-"));
        assert!(out[4..].chars().all(|c| c.is_ascii_digit()));
    }
}
