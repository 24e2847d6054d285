//! Field validation and normalisation for import records.
//!
//! A [`Validator`] is built once from a [`ValidatorRules`] value and then
//! shared read-only by every sanitizer worker. Nothing here holds mutable or
//! process-wide state.

use std::{fmt, net::IpAddr, str::FromStr};

use regex::Regex;
use thiserror::Error;

use crate::{Field, Record};

const LATITUDE_LIMIT: f64 = 90.0;
const LONGITUDE_LIMIT: f64 = 180.0;

/// Words rejected in free-text fields, matched case-insensitively as whole
/// words.
const DEFAULT_DENYLIST: [&str; 13] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "UNION", "AND", "OR", "DROP", "EXEC", "EXECUTE",
    "ALTER", "CREATE", "TRUNCATE",
];

/// Rule set used to build a [`Validator`].
///
/// The default rules require an uppercase two-letter sequence somewhere in
/// the country code and reject SQL keywords in country and city names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRules {
    /// Pattern the country code must contain. It is not anchored.
    pub country_code_pattern: String,
    /// Whole words that may not appear in country or city names.
    pub denylist: Vec<String>,
}

impl Default for ValidatorRules {
    fn default() -> Self {
        Self {
            country_code_pattern: "[A-Z]{2}".to_owned(),
            denylist: DEFAULT_DENYLIST.iter().map(|word| (*word).to_owned()).collect(),
        }
    }
}

/// A rule set could not be compiled into matchers.
#[derive(Debug, Error)]
#[error("invalid validation rule {rule:?}")]
pub struct InvalidRule {
    /// The offending pattern.
    pub rule: String,
    /// Compilation failure reported by `regex`.
    #[source]
    pub source: regex::Error,
}

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The value could not be parsed as the expected type.
    Unparseable,
    /// The value parsed but lies outside the permitted range.
    OutOfRange,
    /// The value does not contain the required pattern.
    PatternMismatch,
    /// The value contains a denied keyword.
    DeniedKeyword,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unparseable => "not parseable",
            Self::OutOfRange => "out of range",
            Self::PatternMismatch => "pattern mismatch",
            Self::DeniedKeyword => "denied keyword",
        };
        f.write_str(text)
    }
}

/// A record was rejected. Only the first failing field is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} ({reason})")]
pub struct ValidationError {
    /// Column that failed.
    pub field: Field,
    /// Category of the failure.
    pub reason: RejectReason,
    /// The raw value as read from input.
    pub value: String,
}

impl ValidationError {
    fn new(field: Field, reason: RejectReason, value: &str) -> Self {
        Self {
            field,
            reason,
            value: value.to_owned(),
        }
    }
}

/// Immutable, precompiled validation rules.
///
/// # Examples
///
/// ```
/// use geolocation_core::{Record, Validator};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let validator = Validator::standard()?;
/// let mut record = Record::from_fields([
///     "10.0.0.1", "IE", "Ireland", "Dun Laoghaire", "53.29", "-6.13", "17",
/// ]);
/// validator.sanitize(&mut record)?;
/// assert_eq!(record.city, "Dun Laoghaire");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    country_code: Regex,
    denied_words: Regex,
}

impl Validator {
    /// Compile the supplied rules.
    pub fn new(rules: &ValidatorRules) -> Result<Self, InvalidRule> {
        let country_code = compile(&rules.country_code_pattern)?;
        let alternatives: Vec<String> = rules
            .denylist
            .iter()
            .map(|word| regex::escape(word))
            .collect();
        let denied_words = compile(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))?;
        Ok(Self {
            country_code,
            denied_words,
        })
    }

    /// Compile the default rules.
    pub fn standard() -> Result<Self, InvalidRule> {
        Self::new(&ValidatorRules::default())
    }

    /// Accept any IPv4 or IPv6 literal.
    pub fn validate_address(&self, value: &str) -> Result<IpAddr, ValidationError> {
        IpAddr::from_str(value)
            .map_err(|_| ValidationError::new(Field::Address, RejectReason::Unparseable, value))
    }

    /// Require the country code pattern somewhere in the value.
    ///
    /// The match is unanchored: `"B"` and `"ab"` are rejected,
    /// but a longer value embedding an uppercase pair is accepted as-is.
    pub fn validate_country_code(&self, value: &str) -> Result<(), ValidationError> {
        if self.country_code.is_match(value) {
            Ok(())
        } else {
            Err(ValidationError::new(
                Field::CountryCode,
                RejectReason::PatternMismatch,
                value,
            ))
        }
    }

    /// Reject denied keywords and wrap values containing `'` in single quotes.
    ///
    /// Wrapping is applied on every call, so a value that already carries
    /// quotes gains another pair each time it passes through.
    pub fn validate_and_normalize_text(
        &self,
        field: Field,
        value: &str,
    ) -> Result<String, ValidationError> {
        if self.denied_words.is_match(value) {
            return Err(ValidationError::new(
                field,
                RejectReason::DeniedKeyword,
                value,
            ));
        }
        if value.contains('\'') {
            Ok(format!("'{value}'"))
        } else {
            Ok(value.to_owned())
        }
    }

    /// Parse a latitude in `[-90, 90]`.
    pub fn validate_latitude(&self, value: &str) -> Result<f64, ValidationError> {
        parse_bounded(Field::Latitude, value, LATITUDE_LIMIT)
    }

    /// Parse a longitude in `[-180, 180]`.
    pub fn validate_longitude(&self, value: &str) -> Result<f64, ValidationError> {
        parse_bounded(Field::Longitude, value, LONGITUDE_LIMIT)
    }

    /// Parse a signed base-10 integer. No range is enforced beyond `i64`.
    pub fn validate_auxiliary(&self, value: &str) -> Result<i64, ValidationError> {
        value.parse::<i64>().map_err(|_| {
            ValidationError::new(Field::AuxiliaryValue, RejectReason::Unparseable, value)
        })
    }

    /// Run every check in column order, stopping at the first failure.
    ///
    /// On success `country` and `city` are replaced with their normalised
    /// forms. A rejected record is left untouched.
    pub fn sanitize(&self, record: &mut Record) -> Result<(), ValidationError> {
        self.validate_address(&record.address)?;
        self.validate_country_code(&record.country_code)?;
        let country = self.validate_and_normalize_text(Field::Country, &record.country)?;
        let city = self.validate_and_normalize_text(Field::City, &record.city)?;
        self.validate_latitude(&record.latitude)?;
        self.validate_longitude(&record.longitude)?;
        self.validate_auxiliary(&record.auxiliary_value)?;

        record.country = country;
        record.city = city;
        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex, InvalidRule> {
    Regex::new(pattern).map_err(|source| InvalidRule {
        rule: pattern.to_owned(),
        source,
    })
}

fn parse_bounded(field: Field, value: &str, limit: f64) -> Result<f64, ValidationError> {
    let parsed = value
        .parse::<f64>()
        .map_err(|_| ValidationError::new(field, RejectReason::Unparseable, value))?;
    // NaN fails the range check as well.
    if (-limit..=limit).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ValidationError::new(field, RejectReason::OutOfRange, value))
    }
}
