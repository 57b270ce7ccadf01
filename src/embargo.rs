use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::countries;
use crate::errors::{DatesError, DatesResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
}

impl Country {
    pub fn new(code: &str) -> DatesResult<Self> {
        if !countries::is_valid_country_code(code) {
            return Err(DatesError::InvalidCountryCode(code.to_string()));
        }
        Ok(Self {
            code: code.trim().to_ascii_uppercase(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedCourse {
    pub course_key: String,
    pub enroll_msg_key: String,
    pub access_msg_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Blacklist,
    Whitelist,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Blacklist => "blacklist",
            RuleType::Whitelist => "whitelist",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = DatesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "blacklist" => Ok(RuleType::Blacklist),
            "whitelist" => Ok(RuleType::Whitelist),
            other => Err(DatesError::InvalidInput(format!("unknown rule type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryAccessRule {
    pub country: Country,
    pub course_key: String,
    pub rule_type: RuleType,
}

/// Whether a learner located in `country` may access the course.
///
/// Courses without a restriction record are open everywhere. Once any
/// whitelist rule exists only whitelisted countries get in; otherwise
/// blacklisted countries are turned away.
pub fn check_country_access(
    restricted: Option<&RestrictedCourse>,
    rules: &[CountryAccessRule],
    country: &str,
) -> DatesResult<bool> {
    let country = Country::new(country)?;
    let Some(course) = restricted else {
        return Ok(true);
    };

    let course_rules = rules
        .iter()
        .filter(|rule| rule.course_key == course.course_key);
    let mut whitelisted = false;
    let mut has_whitelist = false;
    let mut blacklisted = false;

    for rule in course_rules {
        let matches = rule.country == country;
        match rule.rule_type {
            RuleType::Whitelist => {
                has_whitelist = true;
                whitelisted |= matches;
            }
            RuleType::Blacklist => blacklisted |= matches,
        }
    }

    if has_whitelist {
        Ok(whitelisted)
    } else {
        Ok(!blacklisted)
    }
}
