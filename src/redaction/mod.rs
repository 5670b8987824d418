//! LLM-driven privacy redaction.
//!
//! A [`Redactor`] asks the completion model to mask or substitute personal
//! information according to a [`RedactorConfig`]. The [`guard`] module is a
//! deterministic regex pass applied afterwards to anything leaving the API.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod guard;
pub mod redactor;

pub use guard::PiiGuard;
pub use redactor::Redactor;

use crate::llm::{LlmError, SharedLlm};

#[derive(Debug, Error)]
pub enum RedactionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Failed to parse redacted output as JSON: {0}")]
    Parse(String),

    #[error("invalid redaction option: {0}")]
    InvalidOption(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedactionTechnique {
    /// Replace with the mask token
    Mask,
    /// Replace with realistic equivalent values
    Substitute,
    /// Mask the most sensitive types, then substitute the rest
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SophisticationLevel {
    Minimal,
    #[default]
    Standard,
    Comprehensive,
    Paranoid,
}

impl SophisticationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SophisticationLevel::Minimal => "minimal",
            SophisticationLevel::Standard => "standard",
            SophisticationLevel::Comprehensive => "comprehensive",
            SophisticationLevel::Paranoid => "paranoid",
        }
    }
}

impl fmt::Display for SophisticationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedactionTechnique {
    type Err = RedactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mask" => Ok(Self::Mask),
            "substitute" => Ok(Self::Substitute),
            "both" => Ok(Self::Both),
            other => Err(RedactionError::InvalidOption(format!("unknown technique '{}'", other))),
        }
    }
}

impl FromStr for SophisticationLevel {
    type Err = RedactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            "paranoid" => Ok(Self::Paranoid),
            other => Err(RedactionError::InvalidOption(format!("unknown sophistication level '{}'", other))),
        }
    }
}

/// Which categories of personal data are redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeConfig {
    pub names: bool,
    pub ssn: bool,
    pub phone_numbers: bool,
    pub email_addresses: bool,
    pub physical_addresses: bool,
    pub dates_of_birth: bool,
    pub financial_accounts: bool,
    pub medical_info: bool,
    pub biometric_data: bool,
    pub ip_addresses: bool,
    pub usernames: bool,
    pub passwords: bool,

    // Indirect identifiers, enabled at the higher levels
    pub nicknames: bool,
    pub locations: bool,
    pub employers: bool,
    pub relationships: bool,
    pub educational_history: bool,
    pub physical_descriptions: bool,
    pub vehicle_info: bool,
    pub travel_history: bool,
}

impl Default for DataTypeConfig {
    fn default() -> Self {
        Self {
            names: true,
            ssn: true,
            phone_numbers: true,
            email_addresses: true,
            physical_addresses: true,
            dates_of_birth: true,
            financial_accounts: true,
            medical_info: true,
            biometric_data: true,
            ip_addresses: true,
            usernames: true,
            passwords: true,
            nicknames: false,
            locations: false,
            employers: false,
            relationships: false,
            educational_history: false,
            physical_descriptions: false,
            vehicle_info: false,
            travel_history: false,
        }
    }
}

impl DataTypeConfig {
    pub fn for_level(level: SophisticationLevel) -> Self {
        let mut cfg = Self::default();

        match level {
            SophisticationLevel::Minimal => {
                cfg.physical_addresses = false;
                cfg.dates_of_birth = false;
                cfg.financial_accounts = false;
                cfg.medical_info = false;
                cfg.biometric_data = false;
                cfg.ip_addresses = false;
                cfg.usernames = false;
            }
            SophisticationLevel::Standard => {}
            SophisticationLevel::Comprehensive => {
                cfg.enable_indirect_identifiers();
            }
            SophisticationLevel::Paranoid => {
                cfg.enable_indirect_identifiers();
                cfg.educational_history = true;
                cfg.physical_descriptions = true;
                cfg.vehicle_info = true;
                cfg.travel_history = true;
            }
        }

        cfg
    }

    fn enable_indirect_identifiers(&mut self) {
        self.nicknames = true;
        self.locations = true;
        self.employers = true;
        self.relationships = true;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedactorConfig {
    pub technique: RedactionTechnique,
    pub sophistication: SophisticationLevel,
    pub data_types: DataTypeConfig,
    /// Names that must be redacted in every form
    pub target_individuals: Vec<String>,
    /// Regex patterns that must always be redacted
    pub custom_patterns: Vec<String>,
    pub mask_char: char,
    pub mask_length: usize,
    pub maintain_gender: bool,
    pub maintain_ethnicity_hints: bool,
    pub maintain_name_length: bool,
    pub model: Option<String>,
    pub temperature: f32,
}

impl Default for RedactorConfig {
    fn default() -> Self {
        Self::new(RedactionTechnique::default(), SophisticationLevel::default())
    }
}

impl RedactorConfig {
    /// Data types follow the sophistication level.
    pub fn new(technique: RedactionTechnique, sophistication: SophisticationLevel) -> Self {
        Self {
            technique,
            sophistication,
            data_types: DataTypeConfig::for_level(sophistication),
            target_individuals: Vec::new(),
            custom_patterns: Vec::new(),
            mask_char: '*',
            mask_length: 3,
            maintain_gender: true,
            maintain_ethnicity_hints: false,
            maintain_name_length: false,
            model: None,
            temperature: 0.1,
        }
    }

    pub fn mask(&self) -> String {
        self.mask_char.to_string().repeat(self.mask_length)
    }
}

/// Build a redactor from option names such as `"both"` and `"standard"`.
pub fn create_redactor(
    llm: SharedLlm,
    technique: &str,
    sophistication: &str,
    target_individuals: Vec<String>,
    custom_patterns: Vec<String>,
) -> Result<Redactor, RedactionError> {
    let mut config = RedactorConfig::new(technique.parse()?, sophistication.parse()?);
    config.target_individuals = target_individuals;
    config.custom_patterns = custom_patterns;
    Ok(Redactor::new(config, llm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_level() {
        let cfg = DataTypeConfig::for_level(SophisticationLevel::Minimal);
        assert!(cfg.names);
        assert!(cfg.ssn);
        assert!(!cfg.physical_addresses);
        assert!(!cfg.nicknames);
    }

    #[test]
    fn standard_level() {
        let cfg = DataTypeConfig::for_level(SophisticationLevel::Standard);
        assert!(cfg.names);
        assert!(cfg.physical_addresses);
        assert!(!cfg.nicknames);
    }

    #[test]
    fn comprehensive_level() {
        let cfg = DataTypeConfig::for_level(SophisticationLevel::Comprehensive);
        assert!(cfg.nicknames);
        assert!(cfg.locations);
        assert!(cfg.employers);
        assert!(!cfg.travel_history);
    }

    #[test]
    fn paranoid_level() {
        let cfg = DataTypeConfig::for_level(SophisticationLevel::Paranoid);
        assert!(cfg.nicknames);
        assert!(cfg.travel_history);
        assert!(cfg.vehicle_info);
    }

    #[test]
    fn default_config() {
        let cfg = RedactorConfig::default();
        assert_eq!(cfg.technique, RedactionTechnique::Both);
        assert_eq!(cfg.sophistication, SophisticationLevel::Standard);
        assert_eq!(cfg.data_types, DataTypeConfig::for_level(SophisticationLevel::Standard));
        assert_eq!(cfg.mask(), "***");
    }

    #[test]
    fn custom_mask() {
        let mut cfg = RedactorConfig::new(RedactionTechnique::Mask, SophisticationLevel::Paranoid);
        cfg.mask_char = '#';
        cfg.mask_length = 5;
        assert_eq!(cfg.mask(), "#####");
    }

    #[test]
    fn parses_option_names() {
        assert_eq!("MASK".parse::<RedactionTechnique>().unwrap(), RedactionTechnique::Mask);
        assert_eq!(" paranoid ".parse::<SophisticationLevel>().unwrap(), SophisticationLevel::Paranoid);
        assert!("invalid".parse::<RedactionTechnique>().is_err());
        assert!("extreme".parse::<SophisticationLevel>().is_err());
    }
}
