use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DatesError;
use crate::grades::GradingPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateType {
    CourseStart,
    CourseEnd,
    TodaysDate,
    AssignmentDue,
    VerifiedUpgradeDeadline,
    VerificationDeadline,
    CertificateAvailable,
    Other(String),
}

impl DateType {
    pub fn as_str(&self) -> &str {
        match self {
            DateType::CourseStart => "course-start-date",
            DateType::CourseEnd => "course-end-date",
            DateType::TodaysDate => "todays-date",
            DateType::AssignmentDue => "assignment-due-date",
            DateType::VerifiedUpgradeDeadline => "verified-upgrade-deadline",
            DateType::VerificationDeadline => "verification-deadline-date",
            DateType::CertificateAvailable => "certificate-available-date",
            DateType::Other(value) => value,
        }
    }
}

impl From<String> for DateType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "course-start-date" => DateType::CourseStart,
            "course-end-date" => DateType::CourseEnd,
            "todays-date" => DateType::TodaysDate,
            "assignment-due-date" => DateType::AssignmentDue,
            "verified-upgrade-deadline" => DateType::VerifiedUpgradeDeadline,
            "verification-deadline-date" => DateType::VerificationDeadline,
            "certificate-available-date" => DateType::CertificateAvailable,
            _ => DateType::Other(value),
        }
    }
}

impl From<DateType> for String {
    fn from(value: DateType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dated course event as produced by the date-block provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub date_type: DateType,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub link_text: String,
    #[serde(default)]
    pub extra_info: Option<String>,
    #[serde(default)]
    pub contains_gated_content: bool,
    #[serde(default)]
    pub is_verification_deadline: bool,
    #[serde(default)]
    pub block_key: Option<String>,
    #[serde(default)]
    pub section_name: Option<String>,
    #[serde(default)]
    pub assignment_type: Option<String>,
    #[serde(default)]
    pub complete: Option<bool>,
}

impl DateEvent {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>, date_type: DateType) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            date,
            date_type,
            link: String::new(),
            link_text: String::new(),
            extra_info: None,
            contains_gated_content: false,
            is_verification_deadline: false,
            block_key: None,
            section_name: None,
            assignment_type: None,
            complete: None,
        }
    }

    pub fn todays_date(now: DateTime<Utc>) -> Self {
        Self::new("Today", now, DateType::TodaysDate)
    }

    pub fn is_verification_deadline(&self) -> bool {
        self.is_verification_deadline || self.date_type == DateType::VerificationDeadline
    }
}

/// Modes the LMS does not list here (credit, executive-education, ...)
/// are carried through as `Other` and never count as full access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnrollmentMode {
    Audit,
    Honor,
    Verified,
    Professional,
    Masters,
    Unenrolled,
    Other(String),
}

impl EnrollmentMode {
    pub fn as_str(&self) -> &str {
        match self {
            EnrollmentMode::Audit => "audit",
            EnrollmentMode::Honor => "honor",
            EnrollmentMode::Verified => "verified",
            EnrollmentMode::Professional => "professional",
            EnrollmentMode::Masters => "masters",
            EnrollmentMode::Unenrolled => "none",
            EnrollmentMode::Other(value) => value,
        }
    }
}

impl From<String> for EnrollmentMode {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "audit" => EnrollmentMode::Audit,
            "honor" => EnrollmentMode::Honor,
            "verified" => EnrollmentMode::Verified,
            "professional" | "no-id-professional" => EnrollmentMode::Professional,
            "masters" => EnrollmentMode::Masters,
            "none" | "" => EnrollmentMode::Unenrolled,
            _ => EnrollmentMode::Other(normalized),
        }
    }
}

impl From<EnrollmentMode> for String {
    fn from(value: EnrollmentMode) -> Self {
        value.as_str().to_string()
    }
}

/// A stored due or end date. Values written without an offset stay naive
/// so they can be refused instead of compared against an aware clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Deadline {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl Deadline {
    pub fn to_utc(&self, location: &str) -> Result<DateTime<Utc>, DatesError> {
        match self {
            Deadline::Aware(value) => Ok(value.with_timezone(&Utc)),
            Deadline::Naive(value) => Err(DatesError::AmbiguousTime {
                location: location.to_string(),
                deadline: *value,
            }),
        }
    }
}

impl From<DateTime<Utc>> for Deadline {
    fn from(value: DateTime<Utc>) -> Self {
        Deadline::Aware(value.fixed_offset())
    }
}

impl FromStr for Deadline {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(aware) = DateTime::parse_from_rfc3339(value) {
            return Ok(Deadline::Aware(aware));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(Deadline::Naive)
            .ok_or_else(|| format!("unrecognised timestamp: {value}"))
    }
}

impl TryFrom<String> for Deadline {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Deadline> for String {
    fn from(value: Deadline) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deadline::Aware(value) => write!(f, "{}", value.to_rfc3339()),
            Deadline::Naive(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowCorrectness {
    #[default]
    Always,
    PastDue,
    Never,
}

impl FromStr for ShowCorrectness {
    type Err = DatesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "always" => Ok(ShowCorrectness::Always),
            "past_due" => Ok(ShowCorrectness::PastDue),
            "never" => Ok(ShowCorrectness::Never),
            other => Err(DatesError::InvalidInput(format!(
                "unknown show_correctness value: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProblemScore {
    pub earned: f64,
    pub possible: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSubsection {
    pub display_name: String,
    pub location: String,
    #[serde(default)]
    pub due: Option<Deadline>,
    #[serde(default)]
    pub end: Option<Deadline>,
    #[serde(default)]
    pub self_paced: bool,
    #[serde(default)]
    pub hide_after_due: bool,
    #[serde(default)]
    pub graded: bool,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub problem_scores: Vec<ProblemScore>,
    #[serde(default)]
    pub show_correctness: ShowCorrectness,
}

impl GradedSubsection {
    /// Self-paced subsections hide relative to the course end, instructor
    /// paced ones relative to their due date.
    pub fn hide_deadline(&self) -> Option<&Deadline> {
        if self.self_paced {
            self.end.as_ref()
        } else {
            self.due.as_ref()
        }
    }

    pub fn graded_total(&self) -> ProblemScore {
        self.problem_scores
            .iter()
            .fold(ProblemScore::default(), |total, score| ProblemScore {
                earned: total.earned + score.earned,
                possible: total.possible + score.possible,
            })
    }

    pub fn percent_graded(&self) -> f64 {
        let total = self.graded_total();
        if total.possible > 0.0 {
            total.earned / total.possible
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSection {
    pub display_name: String,
    #[serde(default)]
    pub subsections: Vec<GradedSubsection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub mode: EnrollmentMode,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub enrollment: Option<Enrollment>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl LearnerRecord {
    pub fn is_enrolled(&self) -> bool {
        self.enrollment.as_ref().is_some_and(|e| e.is_active)
    }

    pub fn enrollment_mode(&self) -> EnrollmentMode {
        self.enrollment
            .as_ref()
            .map(|e| e.mode.clone())
            .unwrap_or(EnrollmentMode::Unenrolled)
    }
}

/// Who is asking, and when. Built once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub is_staff: bool,
    pub enrollment_mode: EnrollmentMode,
    pub current_time: DateTime<Utc>,
    pub locale_timezone: Option<String>,
}

impl ViewerContext {
    pub fn for_learner(learner: &LearnerRecord, now: DateTime<Utc>) -> Self {
        Self {
            is_staff: learner.is_staff,
            enrollment_mode: learner.enrollment_mode(),
            current_time: now,
            locale_timezone: learner.time_zone.clone(),
        }
    }

    pub fn is_full_access(&self) -> bool {
        self.enrollment_mode == EnrollmentMode::Verified
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedModeOffer {
    pub price: i32,
    pub currency: String,
    pub sku: String,
    #[serde(default)]
    pub upgrade_deadline: Option<DateTime<Utc>>,
}

impl VerifiedModeOffer {
    pub fn currency_symbol(&self) -> &'static str {
        match self.currency.to_ascii_lowercase().as_str() {
            "usd" | "cad" | "aud" => "$",
            "eur" => "€",
            "gbp" => "£",
            "inr" => "₹",
            _ => "",
        }
    }
}

/// Everything known about one learner in one course for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub course_key: String,
    #[serde(default)]
    pub display_name: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub self_paced: bool,
    pub learner: LearnerRecord,
    #[serde(default)]
    pub date_blocks: Vec<DateEvent>,
    #[serde(default)]
    pub sections: Vec<GradedSection>,
    #[serde(default)]
    pub grading_policy: Option<GradingPolicy>,
    #[serde(default)]
    pub verified_mode: Option<VerifiedModeOffer>,
}

impl CourseSnapshot {
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| end < now)
    }
}
