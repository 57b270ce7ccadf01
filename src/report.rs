use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::dates::{DateBlockRow, DatesTabPayload};

fn block_line(block: &DateBlockRow) -> String {
    let mut line = format!("- {}: {}", block.date.format("%a %b %-d, %Y"), block.title);
    if let Some(assignment_type) = &block.assignment_type {
        let _ = write!(line, " ({assignment_type})");
    }
    if !block.learner_has_access {
        line.push_str(" [verified only]");
    } else if block.complete == Some(true) {
        line.push_str(" [completed]");
    }
    if !block.link.is_empty() {
        let _ = write!(line, " <{}>", block.link);
    }
    line
}

pub fn build_report(course_key: &str, now: DateTime<Utc>, payload: &DatesTabPayload) -> String {
    let (past, upcoming): (Vec<&DateBlockRow>, Vec<&DateBlockRow>) = payload
        .course_date_blocks
        .iter()
        .partition(|block| block.date < now);

    let mut output = String::new();
    let timezone = payload.user_timezone.as_deref().unwrap_or("UTC");

    let _ = writeln!(output, "# Important Dates");
    let _ = writeln!(
        output,
        "Generated for {} on {} (times shown in UTC, preferred zone {})",
        course_key,
        now.format("%Y-%m-%d"),
        timezone
    );
    if payload.has_ended {
        let _ = writeln!(output, "This course has ended.");
    }

    if payload.dates_banner_info.missed_deadlines {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "> It looks like you missed some important deadlines based on our suggested schedule."
        );
        if payload.dates_banner_info.missed_gated_content {
            let _ = writeln!(
                output,
                "> Some of the missed content is only available to verified learners."
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming");
    if upcoming.is_empty() {
        let _ = writeln!(output, "No upcoming dates.");
    } else {
        for block in upcoming {
            let _ = writeln!(output, "{}", block_line(block));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Past");
    if past.is_empty() {
        let _ = writeln!(output, "No past dates.");
    } else {
        for block in past.iter().rev() {
            let _ = writeln!(output, "{}", block_line(block));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grades");
    if payload.section_scores.is_empty() {
        let _ = writeln!(output, "No graded content yet.");
    }
    for section in payload.section_scores.iter() {
        let _ = writeln!(output, "### {}", section.display_name);
        for subsection in section.subsections.iter() {
            let score = if subsection.show_grades {
                format!(
                    "{}/{} ({:.0}%)",
                    subsection.graded_total.earned,
                    subsection.graded_total.possible,
                    subsection.percent_graded * 100.0
                )
            } else {
                "score hidden".to_string()
            };
            let _ = writeln!(output, "- {}: {}", subsection.display_name, score);
        }
    }

    if let Some(grade) = &payload.course_grade {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Course grade: {:.0}% ({}){}",
            grade.percent * 100.0,
            grade.letter_grade.as_deref().unwrap_or("no letter"),
            if grade.is_passing { ", passing" } else { "" }
        );
    }

    if let Some(link) = &payload.verified_upgrade_link {
        let _ = writeln!(output);
        let _ = writeln!(output, "Upgrade to a verified certificate: <{link}>");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{DatesBannerInfo, SectionScoresRow, SubsectionScoresRow};
    use crate::models::{DateType, ProblemScore, ShowCorrectness};
    use chrono::TimeZone;

    fn row(title: &str, date: DateTime<Utc>, access: bool) -> DateBlockRow {
        DateBlockRow {
            block_key: None,
            section_name: None,
            assignment_type: Some("Homework".to_string()),
            complete: Some(false),
            date,
            date_type: DateType::AssignmentDue,
            description: String::new(),
            learner_has_access: access,
            link: String::new(),
            link_text: String::new(),
            title: title.to_string(),
            extra_info: None,
        }
    }

    fn payload() -> DatesTabPayload {
        DatesTabPayload {
            course_date_blocks: vec![
                row("HW 1", Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(), true),
                row("Gated quiz", Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap(), false),
            ],
            has_ended: false,
            learner_is_full_access: false,
            user_timezone: None,
            section_scores: vec![SectionScoresRow {
                display_name: "Week 1".to_string(),
                subsections: vec![SubsectionScoresRow {
                    display_name: "HW 1".to_string(),
                    due: None,
                    format: Some("Homework".to_string()),
                    graded: true,
                    graded_total: ProblemScore { earned: 3.0, possible: 4.0 },
                    percent_graded: 0.75,
                    problem_scores: vec![],
                    show_correctness: ShowCorrectness::Always,
                    show_grades: true,
                    url: None,
                }],
            }],
            dates_banner_info: DatesBannerInfo::default(),
            verified_upgrade_link: None,
            can_show_upgrade_sock: false,
            verified_mode: None,
            completion_summary: None,
            course_grade: None,
            grading_policy: None,
            user_has_passing_grade: None,
        }
    }

    #[test]
    fn splits_past_and_upcoming_dates() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let report = build_report("course-v1:edX+DemoX+2026", now, &payload());
        let upcoming = report.find("## Upcoming").unwrap();
        let past = report.find("## Past").unwrap();
        let quiz = report.find("Gated quiz").unwrap();
        let homework = report.find("HW 1 (Homework)").unwrap();
        assert!(upcoming < quiz && quiz < past);
        assert!(past < homework);
        assert!(report.contains("[verified only]"));
        assert!(report.contains("- HW 1: 3/4 (75%)"));
    }

    #[test]
    fn hidden_scores_are_not_printed() {
        let mut payload = payload();
        payload.section_scores[0].subsections[0].show_grades = false;
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let report = build_report("course-v1:edX+DemoX+2026", now, &payload);
        assert!(report.contains("HW 1: score hidden"));
        assert!(!report.contains("3/4"));
    }
}
