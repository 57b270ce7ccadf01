use tracing::warn;
use url::Url;

use crate::errors::{DatesError, DatesResult};
use crate::models::{DateEvent, GradedSubsection, ShowCorrectness, ViewerContext};

/// Turns relative paths and content locations into absolute URLs.
pub trait UrlResolver {
    fn absolute(&self, path: &str) -> String;

    fn jump_to(&self, course_key: &str, location: &str) -> String {
        self.absolute(&format!("/courses/{course_key}/jump_to/{location}"))
    }
}

#[derive(Debug, Clone)]
pub struct BaseUrl(Url);

impl BaseUrl {
    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        Url::parse(base).map(Self)
    }
}

impl UrlResolver for BaseUrl {
    fn absolute(&self, path: &str) -> String {
        match self.0.join(path) {
            Ok(url) => url.to_string(),
            Err(err) => {
                warn!(path, error = %err, "could not resolve link against base url");
                path.to_string()
            }
        }
    }
}

/// Gated events and verification deadlines are reserved for verified
/// learners; everything else is visible to anyone who can see the tab.
pub fn learner_has_access(event: &DateEvent, viewer: &ViewerContext) -> bool {
    let gated = event.contains_gated_content || event.is_verification_deadline();
    !gated || viewer.is_full_access()
}

pub fn resolve_link(event: &DateEvent, resolver: &impl UrlResolver) -> String {
    if event.link.is_empty() {
        String::new()
    } else {
        resolver.absolute(&event.link)
    }
}

/// Returns the jump-to URL for a subsection, or `None` when the content is
/// hidden after its deadline and the viewer is not staff.
pub fn resolve_jump_url(
    subsection: &GradedSubsection,
    viewer: &ViewerContext,
    course_key: &str,
    resolver: &impl UrlResolver,
) -> DatesResult<Option<String>> {
    if subsection.location.trim().is_empty() {
        return Err(DatesError::InvalidInput(format!(
            "subsection '{}' has no location",
            subsection.display_name
        )));
    }

    if viewer.is_staff {
        return Ok(Some(resolver.jump_to(course_key, &subsection.location)));
    }

    if subsection.hide_after_due {
        if let Some(deadline) = subsection.hide_deadline() {
            let deadline = deadline.to_utc(&subsection.location)?;
            if viewer.current_time > deadline {
                return Ok(None);
            }
        }
    }

    Ok(Some(resolver.jump_to(course_key, &subsection.location)))
}

pub fn show_grades(subsection: &GradedSubsection, viewer: &ViewerContext) -> DatesResult<bool> {
    if viewer.is_staff {
        return Ok(true);
    }

    match subsection.show_correctness {
        ShowCorrectness::Always => Ok(true),
        ShowCorrectness::Never => Ok(false),
        ShowCorrectness::PastDue => match &subsection.due {
            None => Ok(true),
            Some(due) => Ok(viewer.current_time > due.to_utc(&subsection.location)?),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateType, Deadline, EnrollmentMode};
    use chrono::{DateTime, TimeZone, Utc};

    const COURSE: &str = "course-v1:edX+DemoX+2026";

    fn resolver() -> BaseUrl {
        BaseUrl::parse("https://lms.example.com").unwrap()
    }

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    fn viewer(is_staff: bool, mode: EnrollmentMode, now: DateTime<Utc>) -> ViewerContext {
        ViewerContext {
            is_staff,
            enrollment_mode: mode,
            current_time: now,
            locale_timezone: None,
        }
    }

    fn subsection(due: Option<Deadline>, hide_after_due: bool) -> GradedSubsection {
        GradedSubsection {
            display_name: "Midterm".to_string(),
            location: "block-v1:edX+DemoX+2026+type@sequential+block@midterm".to_string(),
            due,
            end: None,
            self_paced: false,
            hide_after_due,
            graded: true,
            format: Some("Exam".to_string()),
            problem_scores: Vec::new(),
            show_correctness: ShowCorrectness::Always,
        }
    }

    #[test]
    fn ungated_events_are_open_to_every_mode() {
        let event = DateEvent::new("Course starts", at(2020), DateType::CourseStart);
        for mode in [
            EnrollmentMode::Audit,
            EnrollmentMode::Verified,
            EnrollmentMode::Unenrolled,
            EnrollmentMode::Honor,
        ] {
            assert!(learner_has_access(&event, &viewer(false, mode, at(2021))));
        }
    }

    #[test]
    fn gated_events_require_verified_mode() {
        let mut event = DateEvent::new("Graded quiz", at(2020), DateType::AssignmentDue);
        event.contains_gated_content = true;
        event.link = "/verify".to_string();
        assert!(!learner_has_access(&event, &viewer(false, EnrollmentMode::Audit, at(2021))));
        assert!(learner_has_access(&event, &viewer(false, EnrollmentMode::Verified, at(2021))));

        let deadline = DateEvent::new("Verify", at(2020), DateType::VerificationDeadline);
        assert!(!learner_has_access(&deadline, &viewer(false, EnrollmentMode::Honor, at(2021))));
        assert!(learner_has_access(&deadline, &viewer(false, EnrollmentMode::Verified, at(2021))));
    }

    #[test]
    fn empty_links_stay_empty() {
        let mut event = DateEvent::new("Due", at(2020), DateType::AssignmentDue);
        assert_eq!(resolve_link(&event, &resolver()), "");
        event.link = "/courses/x/progress".to_string();
        assert_eq!(
            resolve_link(&event, &resolver()),
            "https://lms.example.com/courses/x/progress"
        );
        event.link = "https://ecommerce.example.com/basket".to_string();
        assert_eq!(
            resolve_link(&event, &resolver()),
            "https://ecommerce.example.com/basket"
        );
    }

    #[test]
    fn past_due_hidden_subsection_has_no_link_for_learners() {
        let section = subsection(Some(at(2020).into()), true);
        let learner = viewer(false, EnrollmentMode::Verified, at(2021));
        assert_eq!(resolve_jump_url(&section, &learner, COURSE, &resolver()), Ok(None));
    }

    #[test]
    fn staff_always_get_the_jump_link() {
        let section = subsection(Some(at(2020).into()), true);
        let staff = viewer(true, EnrollmentMode::Unenrolled, at(2021));
        let url = resolve_jump_url(&section, &staff, COURSE, &resolver()).unwrap();
        assert_eq!(
            url.as_deref(),
            Some(
                "https://lms.example.com/courses/course-v1:edX+DemoX+2026/jump_to/\
                 block-v1:edX+DemoX+2026+type@sequential+block@midterm"
            )
        );
    }

    #[test]
    fn hide_after_due_without_a_deadline_never_hides() {
        let section = subsection(None, true);
        let learner = viewer(false, EnrollmentMode::Audit, at(2030));
        assert!(resolve_jump_url(&section, &learner, COURSE, &resolver())
            .unwrap()
            .is_some());
    }

    #[test]
    fn future_deadline_keeps_the_link() {
        let section = subsection(Some(at(2022).into()), true);
        let learner = viewer(false, EnrollmentMode::Audit, at(2021));
        assert!(resolve_jump_url(&section, &learner, COURSE, &resolver())
            .unwrap()
            .is_some());
    }

    #[test]
    fn self_paced_subsections_hide_relative_to_end() {
        let mut section = subsection(Some(at(2020).into()), true);
        section.self_paced = true;
        section.end = Some(at(2025).into());
        let learner = viewer(false, EnrollmentMode::Audit, at(2021));
        assert!(resolve_jump_url(&section, &learner, COURSE, &resolver())
            .unwrap()
            .is_some());
        let later = viewer(false, EnrollmentMode::Audit, at(2026));
        assert_eq!(resolve_jump_url(&section, &later, COURSE, &resolver()), Ok(None));
    }

    #[test]
    fn naive_deadline_is_rejected_not_compared() {
        let naive: Deadline = "2020-01-01T00:00:00".parse().unwrap();
        let section = subsection(Some(naive), true);
        let learner = viewer(false, EnrollmentMode::Audit, at(2021));
        let err = resolve_jump_url(&section, &learner, COURSE, &resolver()).unwrap_err();
        assert!(matches!(err, DatesError::AmbiguousTime { .. }));

        let staff = viewer(true, EnrollmentMode::Audit, at(2021));
        assert!(resolve_jump_url(&section, &staff, COURSE, &resolver()).is_ok());
    }

    #[test]
    fn missing_location_fails_fast() {
        let mut section = subsection(None, false);
        section.location = String::new();
        let learner = viewer(true, EnrollmentMode::Audit, at(2021));
        assert!(matches!(
            resolve_jump_url(&section, &learner, COURSE, &resolver()),
            Err(DatesError::InvalidInput(_))
        ));
    }

    #[test]
    fn past_due_correctness_waits_for_the_due_date() {
        let mut section = subsection(Some(at(2022).into()), false);
        section.show_correctness = ShowCorrectness::PastDue;
        assert_eq!(show_grades(&section, &viewer(false, EnrollmentMode::Audit, at(2021))), Ok(false));
        assert_eq!(show_grades(&section, &viewer(false, EnrollmentMode::Audit, at(2023))), Ok(true));
        assert_eq!(show_grades(&section, &viewer(true, EnrollmentMode::Audit, at(2021))), Ok(true));

        section.show_correctness = ShowCorrectness::Never;
        assert_eq!(show_grades(&section, &viewer(false, EnrollmentMode::Verified, at(2030))), Ok(false));
    }
}
