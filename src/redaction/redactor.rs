use serde_json::Value;

use super::{DataTypeConfig, RedactionError, RedactionTechnique, RedactorConfig, SophisticationLevel};
use crate::llm::{extract_json, CompletionRequest, SharedLlm};

/// Marker the substitution pass is told to leave untouched.
const MASKED_MARKER: &str = "***";

pub struct Redactor {
    config: RedactorConfig,
    llm: SharedLlm,
}

impl Redactor {
    pub fn new(config: RedactorConfig, llm: SharedLlm) -> Self {
        Self { config, llm }
    }

    pub fn config(&self) -> &RedactorConfig {
        &self.config
    }

    /// Redact a free-text document.
    ///
    /// With [`RedactionTechnique::Both`] the most sensitive types are masked
    /// first and the remainder is substituted in a second call.
    pub async fn redact(&self, document: &str) -> Result<String, RedactionError> {
        match self.config.technique {
            RedactionTechnique::Mask => self.mask_pass(document, false).await,
            RedactionTechnique::Substitute => self.substitution_pass(document).await,
            RedactionTechnique::Both => {
                let masked = self.mask_pass(document, true).await?;
                self.substitution_pass(&masked).await
            }
        }
    }

    /// Redact a JSON value by round-tripping its pretty-printed text.
    pub async fn redact_json(&self, value: &Value) -> Result<Value, RedactionError> {
        let document =
            serde_json::to_string_pretty(value).map_err(|e| RedactionError::Parse(e.to_string()))?;
        let redacted = self.redact(&document).await?;
        extract_json(&redacted).map_err(|e| RedactionError::Parse(e.to_string()))
    }

    async fn mask_pass(&self, document: &str, partial: bool) -> Result<String, RedactionError> {
        let mask = self.config.mask();
        let request = CompletionRequest::new(
            self.mask_system_message(partial),
            self.mask_prompt(document, &mask, partial),
        );
        self.call(request).await
    }

    async fn substitution_pass(&self, document: &str) -> Result<String, RedactionError> {
        let request = CompletionRequest::new(self.substitution_system_message(), self.substitution_prompt(document));
        self.call(request).await
    }

    async fn call(&self, request: CompletionRequest) -> Result<String, RedactionError> {
        let request = request
            .with_model(self.config.model.clone())
            .with_temperature(self.config.temperature);
        let reply = self.llm.complete(request).await?;
        Ok(reply.trim().to_string())
    }

    pub(crate) fn mask_prompt(&self, document: &str, mask: &str, partial: bool) -> String {
        let data_types = if partial {
            partial_mask_types(&self.config.data_types)
        } else {
            all_data_types(&self.config.data_types)
        };

        format!(
            "Redact the following document by replacing sensitive information with \"{mask}\".\n\n\
             DOCUMENT TO REDACT:\n---\n{document}\n---\n\n\
             DATA TYPES TO REDACT WITH \"{mask}\":\n{data_types}\n\
             {individuals}{patterns}\n\
             INSTRUCTIONS:\n\
             1. Replace each instance of the listed data types with exactly \"{mask}\"\n\
             2. Keep every other character as-is, including formatting and whitespace\n\
             3. Do NOT add explanations or commentary\n\
             4. Return ONLY the redacted document\n\n\
             REDACTED DOCUMENT:",
            individuals = self.individuals_section(),
            patterns = self.patterns_section(),
        )
    }

    pub(crate) fn substitution_prompt(&self, document: &str) -> String {
        format!(
            "Redact the following document by replacing sensitive information with realistic substitute values.\n\n\
             DOCUMENT TO REDACT:\n---\n{document}\n---\n\n\
             DATA TYPES TO SUBSTITUTE:\n{data_types}\n\
             {individuals}\n\
             SUBSTITUTION RULES:\n{rules}\n\
             - Use realistic, plausible replacement values\n\
             - Stay consistent: an original value maps to the same replacement everywhere\n\
             - Keep the document readable\n\
             - Do NOT add explanations or commentary\n\
             - Do NOT replace text already marked with \"{MASKED_MARKER}\" - leave those as-is\n\
             - Return ONLY the redacted document\n\n\
             REDACTED DOCUMENT:",
            data_types = substitution_types(&self.config.data_types),
            individuals = self.individuals_section(),
            rules = self.consistency_rules(),
        )
    }

    pub(crate) fn mask_system_message(&self, partial: bool) -> String {
        let scope = match self.config.sophistication {
            SophisticationLevel::Minimal => "basic PII only",
            SophisticationLevel::Standard => "standard PII and sensitive data",
            SophisticationLevel::Comprehensive => "comprehensive sensitive data including indirect identifiers",
            SophisticationLevel::Paranoid => "maximum privacy - anything that could lead to re-identification",
        };
        let phase = if partial {
            "first phase (masking critical data)"
        } else {
            "complete masking"
        };

        format!(
            "You are a privacy protection specialist performing document redaction.\n\
             Your task is {phase} redaction at the {level} level ({scope}).\n\
             Replace sensitive data with the mask exactly as instructed.\n\
             Keep document structure and non-sensitive content unchanged.\n\
             Return only the redacted document with no additional text.",
            level = self.config.sophistication,
        )
    }

    pub(crate) fn substitution_system_message(&self) -> String {
        let scope = match self.config.sophistication {
            SophisticationLevel::Minimal => "basic PII",
            SophisticationLevel::Standard => "standard PII and sensitive data",
            SophisticationLevel::Comprehensive => {
                "comprehensive data including nicknames, locations, and indirect identifiers"
            }
            SophisticationLevel::Paranoid => {
                "maximum privacy - replacing anything that could enable re-identification"
            }
        };

        format!(
            "You are a privacy protection specialist performing document redaction via substitution.\n\
             Your task is replacing {scope} with realistic equivalent values.\n\
             Names become plausible alternative names.\n\
             Locations become different locations of the same kind (city for city, state for state).\n\
             Numbers become realistic alternatives in the same format.\n\
             The same original value always gets the same replacement.\n\
             Skip any text already marked with \"{MASKED_MARKER}\", it is intentionally masked.\n\
             Return only the redacted document with no additional text."
        )
    }

    fn individuals_section(&self) -> String {
        if self.config.target_individuals.is_empty() {
            return String::new();
        }
        let names = self
            .config
            .target_individuals
            .iter()
            .map(|name| format!("\"{}\"", name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "\nSPECIFIC INDIVIDUALS TO ALWAYS REDACT:\n\
             Redact these individuals in every form (full name, first name, last name, nicknames, references):\n\
             {names}\n"
        )
    }

    fn patterns_section(&self) -> String {
        if self.config.custom_patterns.is_empty() {
            return String::new();
        }
        let patterns = self
            .config
            .custom_patterns
            .iter()
            .map(|p| format!("- Pattern: {}", p))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nCUSTOM PATTERNS TO REDACT:\n{patterns}\n")
    }

    fn consistency_rules(&self) -> String {
        let rules = [
            (self.config.maintain_gender, "- Keep the apparent gender of names (male names -> male names)"),
            (
                self.config.maintain_ethnicity_hints,
                "- Keep cultural or ethnic characteristics of names where apparent",
            ),
            (self.config.maintain_name_length, "- Keep replacement names similar in length"),
        ];
        bullet_list(&rules, "- Use any appropriate realistic replacements")
    }
}

fn bullet_list(items: &[(bool, &str)], fallback: &str) -> String {
    let enabled: Vec<&str> = items.iter().filter(|(on, _)| *on).map(|(_, text)| *text).collect();
    if enabled.is_empty() {
        fallback.to_string()
    } else {
        enabled.join("\n")
    }
}

/// Types masked ahead of substitution; they never get realistic replacements.
fn partial_mask_types(cfg: &DataTypeConfig) -> String {
    bullet_list(
        &[
            (cfg.ssn, "- Social Security Numbers (SSN)"),
            (cfg.passwords, "- Passwords and security credentials"),
            (cfg.financial_accounts, "- Bank account numbers, credit card numbers"),
            (cfg.medical_info, "- Medical record numbers, diagnosis codes"),
            (cfg.biometric_data, "- Biometric identifiers"),
        ],
        "- No specific types for masking",
    )
}

fn substitution_types(cfg: &DataTypeConfig) -> String {
    bullet_list(
        &[
            (cfg.names, "- Personal names (first, last, full names)"),
            (cfg.nicknames, "- Nicknames and aliases"),
            (cfg.phone_numbers, "- Phone numbers (replace with different realistic numbers)"),
            (cfg.email_addresses, "- Email addresses (replace with different realistic addresses)"),
            (cfg.physical_addresses, "- Physical/mailing addresses"),
            (cfg.dates_of_birth, "- Dates of birth (shift by a random amount)"),
            (cfg.ip_addresses, "- IP addresses"),
            (cfg.usernames, "- Usernames and handles"),
            (cfg.locations, "- Location references (cities, neighborhoods, landmarks)"),
            (cfg.employers, "- Employer names and work locations"),
            (cfg.relationships, "- Relationship identifiers (spouse name, children's names)"),
            (cfg.educational_history, "- Schools, universities, degrees"),
            (cfg.physical_descriptions, "- Physical descriptions that could identify"),
            (cfg.vehicle_info, "- Vehicle information (make, model, license plates)"),
            (cfg.travel_history, "- Travel history and frequent locations"),
        ],
        "- General PII as appropriate",
    )
}

fn all_data_types(cfg: &DataTypeConfig) -> String {
    bullet_list(
        &[
            (cfg.names, "- Personal names"),
            (cfg.ssn, "- Social Security Numbers"),
            (cfg.phone_numbers, "- Phone numbers"),
            (cfg.email_addresses, "- Email addresses"),
            (cfg.physical_addresses, "- Physical addresses"),
            (cfg.dates_of_birth, "- Dates of birth"),
            (cfg.financial_accounts, "- Financial account numbers"),
            (cfg.medical_info, "- Medical information"),
            (cfg.biometric_data, "- Biometric data"),
            (cfg.ip_addresses, "- IP addresses"),
            (cfg.usernames, "- Usernames"),
            (cfg.passwords, "- Passwords"),
            (cfg.nicknames, "- Nicknames and aliases"),
            (cfg.locations, "- Location references"),
            (cfg.employers, "- Employer information"),
            (cfg.relationships, "- Relationship identifiers"),
            (cfg.educational_history, "- Educational history"),
            (cfg.physical_descriptions, "- Physical descriptions"),
            (cfg.vehicle_info, "- Vehicle information"),
            (cfg.travel_history, "- Travel history"),
        ],
        "- Standard PII",
    )
}
