use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{DatesError, DatesResult};
use crate::grades::{self, CourseGrade, GradingPolicy};
use crate::models::{
    CourseSnapshot, DateEvent, DateType, Deadline, EnrollmentMode, GradedSection,
    GradedSubsection, LearnerRecord, ProblemScore, ShowCorrectness, ViewerContext,
};
use crate::policy::{self, UrlResolver};

#[derive(Debug, Clone, Serialize)]
pub struct DateBlockRow {
    pub block_key: Option<String>,
    pub section_name: Option<String>,
    pub assignment_type: Option<String>,
    pub complete: Option<bool>,
    pub date: DateTime<Utc>,
    pub date_type: DateType,
    pub description: String,
    pub learner_has_access: bool,
    pub link: String,
    pub link_text: String,
    pub title: String,
    pub extra_info: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsectionScoresRow {
    pub display_name: String,
    pub due: Option<Deadline>,
    pub format: Option<String>,
    pub graded: bool,
    pub graded_total: ProblemScore,
    pub percent_graded: f64,
    pub problem_scores: Vec<ProblemScore>,
    pub show_correctness: ShowCorrectness,
    pub show_grades: bool,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionScoresRow {
    pub display_name: String,
    pub subsections: Vec<SubsectionScoresRow>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatesBannerInfo {
    pub content_type_gating_enabled: bool,
    pub missed_deadlines: bool,
    pub missed_gated_content: bool,
    pub verified_upgrade_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedModeRow {
    pub price: i32,
    pub currency: String,
    pub currency_symbol: String,
    pub sku: String,
    pub upgrade_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionSummary {
    pub complete_count: usize,
    pub incomplete_count: usize,
    pub locked_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentPolicyRow {
    pub num_droppable: u32,
    pub num_total: u32,
    pub short_label: Option<String>,
    #[serde(rename = "type")]
    pub assignment_type: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradingPolicyRow {
    pub assignment_policies: Vec<AssignmentPolicyRow>,
    pub grade_range: BTreeMap<String, f64>,
}

impl From<&GradingPolicy> for GradingPolicyRow {
    fn from(policy: &GradingPolicy) -> Self {
        Self {
            assignment_policies: policy
                .assignment_policies
                .iter()
                .map(|assignment| AssignmentPolicyRow {
                    num_droppable: assignment.drop_count,
                    num_total: assignment.min_count,
                    short_label: assignment.short_label.clone(),
                    assignment_type: assignment.assignment_type.clone(),
                    weight: assignment.weight,
                })
                .collect(),
            grade_range: policy.grade_cutoffs.clone(),
        }
    }
}

/// The Dates tab response body.
#[derive(Debug, Clone, Serialize)]
pub struct DatesTabPayload {
    pub course_date_blocks: Vec<DateBlockRow>,
    pub has_ended: bool,
    pub learner_is_full_access: bool,
    pub user_timezone: Option<String>,
    pub section_scores: Vec<SectionScoresRow>,
    pub dates_banner_info: DatesBannerInfo,
    pub verified_upgrade_link: Option<String>,
    pub can_show_upgrade_sock: bool,
    pub verified_mode: Option<VerifiedModeRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_summary: Option<CompletionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_grade: Option<CourseGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grading_policy: Option<GradingPolicyRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_has_passing_grade: Option<bool>,
}

/// Switches and injected capabilities for one build.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseOptions {
    pub include_grades: bool,
    pub show_upgrade_sock: bool,
    pub content_type_gating: bool,
}

/// Unauthenticated callers never get this far; enrolled learners and course
/// staff may see the tab, everyone else is turned away.
pub fn ensure_can_view(learner: &LearnerRecord) -> DatesResult<()> {
    if learner.is_enrolled() || learner.is_staff {
        Ok(())
    } else {
        Err(DatesError::NotEnrolled)
    }
}

pub fn build_response(
    snapshot: &CourseSnapshot,
    viewer: &ViewerContext,
    lms: &impl UrlResolver,
    ecommerce: &impl UrlResolver,
    options: &ResponseOptions,
) -> DatesResult<DatesTabPayload> {
    let upgrade_link = verified_upgrade_link(snapshot, viewer, ecommerce);
    let blocks = course_date_blocks(snapshot, viewer.current_time, upgrade_link.as_deref());

    let course_date_blocks: Vec<DateBlockRow> = blocks
        .iter()
        .filter(|block| block.date_type != DateType::TodaysDate)
        .map(|block| date_block_row(block, viewer, lms))
        .collect();

    let section_scores = snapshot
        .sections
        .iter()
        .map(|section| section_row(section, viewer, &snapshot.course_key, lms))
        .collect::<DatesResult<Vec<_>>>()?;

    let (missed_deadlines, missed_gated_content) = missed_deadlines(snapshot, &blocks, viewer);
    let dates_banner_info = DatesBannerInfo {
        content_type_gating_enabled: options.content_type_gating,
        missed_deadlines,
        missed_gated_content,
        verified_upgrade_link: upgrade_link.clone(),
    };

    let verified_mode = match (&upgrade_link, &snapshot.verified_mode) {
        (Some(upgrade_url), Some(offer)) => Some(VerifiedModeRow {
            price: offer.price,
            currency: offer.currency.to_ascii_uppercase(),
            currency_symbol: offer.currency_symbol().to_string(),
            sku: offer.sku.clone(),
            upgrade_url: upgrade_url.clone(),
        }),
        _ => None,
    };

    let mut payload = DatesTabPayload {
        has_ended: snapshot.has_ended(viewer.current_time),
        learner_is_full_access: viewer.is_full_access(),
        user_timezone: viewer.locale_timezone.clone(),
        section_scores,
        dates_banner_info,
        verified_upgrade_link: upgrade_link,
        can_show_upgrade_sock: options.show_upgrade_sock,
        verified_mode,
        completion_summary: None,
        course_grade: None,
        grading_policy: None,
        user_has_passing_grade: None,
        course_date_blocks,
    };

    if options.include_grades {
        payload.completion_summary = Some(completion_summary(&payload.course_date_blocks));
        if let Some(policy) = &snapshot.grading_policy {
            let grade = grades::compute_course_grade(&snapshot.sections, policy);
            payload.user_has_passing_grade = Some(grade.is_passing);
            payload.course_grade = Some(grade);
            payload.grading_policy = Some(GradingPolicyRow::from(policy));
        }
    }

    debug!(
        course = %snapshot.course_key,
        learner = %snapshot.learner.username,
        mode = viewer.enrollment_mode.as_str(),
        blocks = payload.course_date_blocks.len(),
        sections = payload.section_scores.len(),
        "assembled dates payload"
    );

    Ok(payload)
}

/// Orders the course's dated events, adding the course start and end, the
/// upgrade deadline and a marker for the current moment.
pub fn course_date_blocks(
    snapshot: &CourseSnapshot,
    now: DateTime<Utc>,
    upgrade_link: Option<&str>,
) -> Vec<DateEvent> {
    let mut blocks = Vec::with_capacity(snapshot.date_blocks.len() + 4);
    let provided = |date_type: DateType| {
        snapshot
            .date_blocks
            .iter()
            .any(|block| block.date_type == date_type)
    };

    if !provided(DateType::CourseStart) {
        let mut start = DateEvent::new("Course starts", snapshot.start, DateType::CourseStart);
        start.description = format!("{} begins.", course_label(snapshot));
        blocks.push(start);
    }

    blocks.extend(snapshot.date_blocks.iter().cloned());

    if let (Some(link), Some(deadline)) = (
        upgrade_link,
        snapshot
            .verified_mode
            .as_ref()
            .and_then(|offer| offer.upgrade_deadline),
    ) {
        let mut upgrade = DateEvent::new(
            "Upgrade to Verified Certificate",
            deadline,
            DateType::VerifiedUpgradeDeadline,
        );
        upgrade.description =
            "Don't miss the opportunity to highlight your new knowledge and skills by earning a verified certificate."
                .to_string();
        upgrade.link = link.to_string();
        upgrade.link_text = "Upgrade to Verified Certificate".to_string();
        blocks.push(upgrade);
    }

    if let Some(end) = snapshot.end.filter(|_| !provided(DateType::CourseEnd)) {
        let mut block = DateEvent::new("Course ends", end, DateType::CourseEnd);
        block.description = if end < now {
            "This course is archived, which means you can review course content but it is no longer active."
                .to_string()
        } else {
            "After the course ends, the course content will be archived and no longer active."
                .to_string()
        };
        blocks.push(block);
    }

    blocks.push(DateEvent::todays_date(now));
    blocks.sort_by_key(|block| block.date);
    blocks
}

fn course_label(snapshot: &CourseSnapshot) -> &str {
    if snapshot.display_name.is_empty() {
        &snapshot.course_key
    } else {
        &snapshot.display_name
    }
}

fn date_block_row(
    block: &DateEvent,
    viewer: &ViewerContext,
    lms: &impl UrlResolver,
) -> DateBlockRow {
    DateBlockRow {
        block_key: block.block_key.clone(),
        section_name: block.section_name.clone(),
        assignment_type: block.assignment_type.clone(),
        complete: block.complete,
        date: block.date,
        date_type: block.date_type.clone(),
        description: block.description.clone(),
        learner_has_access: policy::learner_has_access(block, viewer),
        link: policy::resolve_link(block, lms),
        link_text: block.link_text.clone(),
        title: block.title.clone(),
        extra_info: block.extra_info.clone(),
    }
}

fn section_row(
    section: &GradedSection,
    viewer: &ViewerContext,
    course_key: &str,
    lms: &impl UrlResolver,
) -> DatesResult<SectionScoresRow> {
    let subsections = section
        .subsections
        .iter()
        .map(|subsection| subsection_row(subsection, viewer, course_key, lms))
        .collect::<DatesResult<Vec<_>>>()?;

    Ok(SectionScoresRow {
        display_name: section.display_name.clone(),
        subsections,
    })
}

fn subsection_row(
    subsection: &GradedSubsection,
    viewer: &ViewerContext,
    course_key: &str,
    lms: &impl UrlResolver,
) -> DatesResult<SubsectionScoresRow> {
    let url = withhold_on_ambiguous_time(
        policy::resolve_jump_url(subsection, viewer, course_key, lms),
        None,
    )?;
    let show_grades = withhold_on_ambiguous_time(policy::show_grades(subsection, viewer), false)?;

    Ok(SubsectionScoresRow {
        display_name: subsection.display_name.clone(),
        due: subsection.due,
        format: subsection.format.clone(),
        graded: subsection.graded,
        graded_total: subsection.graded_total(),
        percent_graded: subsection.percent_graded(),
        problem_scores: subsection.problem_scores.clone(),
        show_correctness: subsection.show_correctness,
        show_grades,
        url,
    })
}

/// A deadline stored without an offset cannot be compared safely. The
/// affected value falls back to its restrictive form; other errors
/// propagate.
fn withhold_on_ambiguous_time<T>(result: DatesResult<T>, withheld: T) -> DatesResult<T> {
    match result {
        Err(DatesError::AmbiguousTime { location, deadline }) => {
            warn!(
                %location,
                %deadline,
                "deadline has no timezone offset; withholding time-gated field"
            );
            Ok(withheld)
        }
        other => other,
    }
}

pub fn verified_upgrade_link(
    snapshot: &CourseSnapshot,
    viewer: &ViewerContext,
    ecommerce: &impl UrlResolver,
) -> Option<String> {
    if !snapshot.learner.is_enrolled()
        || !matches!(
            viewer.enrollment_mode,
            EnrollmentMode::Audit | EnrollmentMode::Honor
        )
    {
        return None;
    }

    let offer = snapshot.verified_mode.as_ref()?;
    if offer
        .upgrade_deadline
        .is_some_and(|deadline| deadline <= viewer.current_time)
    {
        return None;
    }

    Some(ecommerce.absolute(&format!("/basket/add/?sku={}", offer.sku)))
}

/// Self-paced learners are told when an assignment deadline slipped by
/// without completion, and whether any of those held gated content.
fn missed_deadlines(
    snapshot: &CourseSnapshot,
    blocks: &[DateEvent],
    viewer: &ViewerContext,
) -> (bool, bool) {
    if !snapshot.self_paced {
        return (false, false);
    }

    let mut missed = false;
    let mut missed_gated = false;
    for block in blocks {
        let overdue = block.date_type == DateType::AssignmentDue
            && block.date < viewer.current_time
            && !block.complete.unwrap_or(false);
        if overdue {
            missed = true;
            if block.contains_gated_content && !viewer.is_full_access() {
                missed_gated = true;
            }
        }
    }
    (missed, missed_gated)
}

fn completion_summary(rows: &[DateBlockRow]) -> CompletionSummary {
    rows.iter()
        .filter(|row| row.date_type == DateType::AssignmentDue)
        .fold(CompletionSummary::default(), |mut summary, row| {
            if !row.learner_has_access {
                summary.locked_count += 1;
            } else if row.complete.unwrap_or(false) {
                summary.complete_count += 1;
            } else {
                summary.incomplete_count += 1;
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::AssignmentPolicy;
    use crate::models::{Enrollment, VerifiedModeOffer};
    use crate::policy::BaseUrl;
    use chrono::TimeZone;

    const COURSE: &str = "course-v1:edX+DemoX+2026";

    fn at(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
    }

    fn lms() -> BaseUrl {
        BaseUrl::parse("https://lms.example.com").unwrap()
    }

    fn ecommerce() -> BaseUrl {
        BaseUrl::parse("https://ecommerce.example.com").unwrap()
    }

    fn learner(mode: EnrollmentMode) -> LearnerRecord {
        LearnerRecord {
            username: "avery".to_string(),
            is_staff: false,
            enrollment: Some(Enrollment {
                mode,
                is_active: true,
            }),
            time_zone: Some("America/New_York".to_string()),
        }
    }

    fn assignment(title: &str, date: DateTime<Utc>, gated: bool, complete: bool) -> DateEvent {
        let mut event = DateEvent::new(title, date, DateType::AssignmentDue);
        event.link = format!("/courses/{COURSE}/jump_to/{title}");
        event.contains_gated_content = gated;
        event.complete = Some(complete);
        event.assignment_type = Some("Homework".to_string());
        event
    }

    fn midterm() -> GradedSubsection {
        GradedSubsection {
            display_name: "Midterm".to_string(),
            location: "block-v1:edX+DemoX+2026+type@sequential+block@midterm".to_string(),
            due: Some(at(2020, 1).into()),
            end: None,
            self_paced: false,
            hide_after_due: true,
            graded: true,
            format: Some("Exam".to_string()),
            problem_scores: vec![
                ProblemScore { earned: 2.0, possible: 2.0 },
                ProblemScore { earned: 0.0, possible: 2.0 },
            ],
            show_correctness: ShowCorrectness::Always,
        }
    }

    fn snapshot(mode: EnrollmentMode) -> CourseSnapshot {
        CourseSnapshot {
            course_key: COURSE.to_string(),
            display_name: "Demo Course".to_string(),
            start: at(2019, 9),
            end: Some(at(2022, 6)),
            self_paced: false,
            learner: learner(mode),
            date_blocks: vec![
                assignment("hw1", at(2020, 2), false, true),
                assignment("quiz", at(2020, 3), true, false),
                DateEvent::todays_date(at(2020, 4)),
            ],
            sections: vec![GradedSection {
                display_name: "Week 1".to_string(),
                subsections: vec![midterm()],
            }],
            grading_policy: Some(GradingPolicy {
                assignment_policies: vec![AssignmentPolicy {
                    assignment_type: "Exam".to_string(),
                    short_label: None,
                    weight: 1.0,
                    min_count: 1,
                    drop_count: 0,
                }],
                grade_cutoffs: BTreeMap::from([("Pass".to_string(), 0.5)]),
            }),
            verified_mode: Some(VerifiedModeOffer {
                price: 49,
                currency: "usd".to_string(),
                sku: "8CF08E5".to_string(),
                upgrade_deadline: Some(at(2021, 6)),
            }),
        }
    }

    fn build(
        snapshot: &CourseSnapshot,
        is_staff: bool,
        now: DateTime<Utc>,
        options: ResponseOptions,
    ) -> DatesTabPayload {
        let mut viewer = ViewerContext::for_learner(&snapshot.learner, now);
        viewer.is_staff = is_staff;
        build_response(snapshot, &viewer, &lms(), &ecommerce(), &options).unwrap()
    }

    #[test]
    fn todays_marker_never_reaches_the_payload() {
        let payload = build(&snapshot(EnrollmentMode::Audit), false, at(2021, 1), Default::default());
        assert!(payload
            .course_date_blocks
            .iter()
            .all(|row| row.date_type != DateType::TodaysDate));
        // start, hw1, quiz, upgrade deadline, end
        assert_eq!(payload.course_date_blocks.len(), 5);
        assert_eq!(payload.course_date_blocks[0].date_type, DateType::CourseStart);
    }

    #[test]
    fn audit_learner_sees_gated_block_locked() {
        let payload = build(&snapshot(EnrollmentMode::Audit), false, at(2021, 1), Default::default());
        let quiz = payload
            .course_date_blocks
            .iter()
            .find(|row| row.title == "quiz")
            .unwrap();
        assert!(!quiz.learner_has_access);
        assert!(quiz.link.starts_with("https://lms.example.com/courses/"));
        assert!(!payload.learner_is_full_access);
        assert_eq!(payload.user_timezone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn verified_learner_has_full_access_and_no_upsell() {
        let payload = build(&snapshot(EnrollmentMode::Verified), false, at(2021, 1), Default::default());
        assert!(payload.learner_is_full_access);
        assert!(payload.course_date_blocks.iter().all(|row| row.learner_has_access));
        assert_eq!(payload.verified_upgrade_link, None);
        assert!(payload.verified_mode.is_none());
    }

    #[test]
    fn hidden_subsection_link_depends_on_staff() {
        let snap = snapshot(EnrollmentMode::Audit);
        let learner_view = build(&snap, false, at(2021, 1), Default::default());
        let row = &learner_view.section_scores[0].subsections[0];
        assert_eq!(row.url, None);
        assert_eq!(row.graded_total.earned, 2.0);
        assert_eq!(row.graded_total.possible, 4.0);
        assert_eq!(row.percent_graded, 0.5);
        assert_eq!(row.problem_scores[1].possible, 2.0);

        let staff_view = build(&snap, true, at(2021, 1), Default::default());
        assert!(staff_view.section_scores[0].subsections[0].url.is_some());
    }

    #[test]
    fn naive_deadline_withholds_link_without_failing() {
        let mut snap = snapshot(EnrollmentMode::Audit);
        snap.sections[0].subsections[0].due = Some("2020-01-01T00:00:00".parse().unwrap());
        let payload = build(&snap, false, at(2021, 1), Default::default());
        assert_eq!(payload.section_scores[0].subsections[0].url, None);
    }

    #[test]
    fn missing_location_fails_the_whole_payload() {
        let mut snap = snapshot(EnrollmentMode::Audit);
        snap.sections[0].subsections[0].location = String::new();
        let viewer = ViewerContext::for_learner(&snap.learner, at(2021, 1));
        let result = build_response(&snap, &viewer, &lms(), &ecommerce(), &Default::default());
        assert!(matches!(result, Err(DatesError::InvalidInput(_))));
    }

    #[test]
    fn upgrade_link_closes_at_the_deadline() {
        let snap = snapshot(EnrollmentMode::Audit);
        let open = build(&snap, false, at(2021, 1), Default::default());
        assert_eq!(
            open.verified_upgrade_link.as_deref(),
            Some("https://ecommerce.example.com/basket/add/?sku=8CF08E5")
        );
        let offer = open.verified_mode.unwrap();
        assert_eq!(offer.currency, "USD");
        assert_eq!(offer.currency_symbol, "$");

        let closed = build(&snap, false, at(2021, 7), Default::default());
        assert_eq!(closed.verified_upgrade_link, None);
        assert!(closed
            .course_date_blocks
            .iter()
            .all(|row| row.date_type != DateType::VerifiedUpgradeDeadline));
    }

    #[test]
    fn banner_reports_missed_gated_deadlines_for_self_paced_courses() {
        let mut snap = snapshot(EnrollmentMode::Audit);
        let payload = build(&snap, false, at(2021, 1), Default::default());
        assert!(!payload.dates_banner_info.missed_deadlines);

        snap.self_paced = true;
        let options = ResponseOptions {
            content_type_gating: true,
            ..Default::default()
        };
        let payload = build(&snap, false, at(2021, 1), options);
        assert!(payload.dates_banner_info.missed_deadlines);
        assert!(payload.dates_banner_info.missed_gated_content);
        assert!(payload.dates_banner_info.content_type_gating_enabled);
    }

    #[test]
    fn grades_are_only_attached_when_requested() {
        let snap = snapshot(EnrollmentMode::Audit);
        let plain = build(&snap, false, at(2021, 1), Default::default());
        assert!(plain.course_grade.is_none());
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("course_grade").is_none());

        let options = ResponseOptions {
            include_grades: true,
            ..Default::default()
        };
        let full = build(&snap, false, at(2021, 1), options);
        let grade = full.course_grade.unwrap();
        assert_eq!(grade.percent, 0.5);
        assert_eq!(full.user_has_passing_grade, Some(true));
        assert_eq!(full.grading_policy.unwrap().assignment_policies[0].num_total, 1);
        assert_eq!(
            full.completion_summary,
            Some(CompletionSummary {
                complete_count: 1,
                incomplete_count: 0,
                locked_count: 1,
            })
        );
    }

    #[test]
    fn only_enrolled_learners_and_staff_may_view() {
        let mut record = learner(EnrollmentMode::Audit);
        assert_eq!(ensure_can_view(&record), Ok(()));

        record.enrollment = None;
        assert_eq!(ensure_can_view(&record), Err(DatesError::NotEnrolled));

        record.is_staff = true;
        assert_eq!(ensure_can_view(&record), Ok(()));

        record.is_staff = false;
        record.enrollment = Some(Enrollment {
            mode: EnrollmentMode::Verified,
            is_active: false,
        });
        assert_eq!(ensure_can_view(&record), Err(DatesError::NotEnrolled));
    }

    #[test]
    fn has_ended_follows_course_end() {
        let snap = snapshot(EnrollmentMode::Audit);
        assert!(!build(&snap, false, at(2021, 1), Default::default()).has_ended);
        assert!(build(&snap, false, at(2023, 1), Default::default()).has_ended);
    }

    #[test]
    fn unlisted_enrollment_mode_is_served_without_full_access() {
        let snap = snapshot(EnrollmentMode::Other("credit".to_string()));
        assert_eq!(ensure_can_view(&snap.learner), Ok(()));

        let payload = build(&snap, false, at(2021, 1), Default::default());
        assert!(!payload.learner_is_full_access);
        assert_eq!(payload.verified_upgrade_link, None);
        let quiz = payload
            .course_date_blocks
            .iter()
            .find(|row| row.title == "quiz")
            .unwrap();
        assert!(!quiz.learner_has_access);
    }

    #[test]
    fn stored_start_and_end_blocks_are_not_duplicated() {
        let mut snap = snapshot(EnrollmentMode::Audit);
        let mut start = DateEvent::new("Orientation opens", at(2019, 9), DateType::CourseStart);
        start.description = "Provided by the schedule.".to_string();
        snap.date_blocks.push(start);
        snap.date_blocks
            .push(DateEvent::new("Course closes", at(2022, 6), DateType::CourseEnd));

        let blocks = course_date_blocks(&snap, at(2021, 1), None);
        let count = |date_type: DateType| {
            blocks
                .iter()
                .filter(|block| block.date_type == date_type)
                .count()
        };
        assert_eq!(count(DateType::CourseStart), 1);
        assert_eq!(count(DateType::CourseEnd), 1);
        assert_eq!(blocks[0].title, "Orientation opens");
    }
}
