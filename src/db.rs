use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::embargo::{Country, CountryAccessRule, RestrictedCourse, RuleType};
use crate::errors::DatesError;
use crate::grades::{AssignmentPolicy, GradingPolicy};
use crate::models::{
    CourseSnapshot, DateEvent, DateType, Deadline, Enrollment, EnrollmentMode, GradedSection,
    GradedSubsection, LearnerRecord, ProblemScore, ShowCorrectness, VerifiedModeOffer,
};

pub const DEMO_COURSE: &str = "course-v1:edX+DemoX+Demo_2026";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("migrations applied");
    Ok(())
}

fn utc(year: i32, month: u32, day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .context("invalid date")
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO course_home.courses
        (course_key, display_name, start_at, end_at, self_paced,
         verified_price, verified_currency, verified_sku, upgrade_deadline)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (course_key) DO UPDATE
        SET display_name = EXCLUDED.display_name, start_at = EXCLUDED.start_at,
            end_at = EXCLUDED.end_at, self_paced = EXCLUDED.self_paced
        "#,
    )
    .bind(DEMO_COURSE)
    .bind("Demonstration Course")
    .bind(utc(2026, 1, 12)?)
    .bind(utc(2026, 12, 18)?)
    .bind(false)
    .bind(49)
    .bind("usd")
    .bind("8CF08E5")
    .bind(utc(2026, 11, 1)?)
    .execute(pool)
    .await?;

    let learners = vec![
        ("avery", Some("America/New_York"), Some("audit")),
        ("jules", Some("Europe/Madrid"), Some("verified")),
        ("kiara", None, None),
    ];

    for (username, time_zone, mode) in learners {
        sqlx::query(
            r#"
            INSERT INTO course_home.learners (username, time_zone)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE SET time_zone = EXCLUDED.time_zone
            "#,
        )
        .bind(username)
        .bind(time_zone)
        .execute(pool)
        .await?;

        if let Some(mode) = mode {
            sqlx::query(
                r#"
                INSERT INTO course_home.enrollments (username, course_key, mode)
                VALUES ($1, $2, $3)
                ON CONFLICT (username, course_key) DO UPDATE SET mode = EXCLUDED.mode
                "#,
            )
            .bind(username)
            .bind(DEMO_COURSE)
            .bind(mode)
            .execute(pool)
            .await?;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO course_home.course_staff (username, course_key)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind("kiara")
    .bind(DEMO_COURSE)
    .execute(pool)
    .await?;

    let blocks = vec![
        (
            "seed-hw1",
            "Homework 1: Getting Started",
            utc(2026, 2, 2)?,
            false,
            "block-v1:edX+DemoX+Demo_2026+type@sequential+block@hw1",
            "Week 1",
            "Homework",
        ),
        (
            "seed-midterm",
            "Midterm Exam",
            utc(2026, 4, 6)?,
            true,
            "block-v1:edX+DemoX+Demo_2026+type@sequential+block@midterm",
            "Week 6",
            "Exam",
        ),
        (
            "seed-final",
            "Final Exam",
            utc(2026, 12, 7)?,
            true,
            "block-v1:edX+DemoX+Demo_2026+type@sequential+block@final",
            "Week 14",
            "Exam",
        ),
    ];

    for (source_key, title, occurs_at, gated, block_key, section_name, assignment_type) in blocks {
        sqlx::query(
            r#"
            INSERT INTO course_home.date_blocks
            (id, course_key, title, occurs_at, date_type, link, link_text,
             contains_gated_content, block_key, section_name, assignment_type, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(DEMO_COURSE)
        .bind(title)
        .bind(occurs_at)
        .bind(DateType::AssignmentDue.to_string())
        .bind(format!("/courses/{DEMO_COURSE}/jump_to/{block_key}"))
        .bind(title)
        .bind(gated)
        .bind(block_key)
        .bind(section_name)
        .bind(assignment_type)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO course_home.date_blocks
        (id, course_key, title, description, occurs_at, date_type, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(DEMO_COURSE)
    .bind("Verification Deadline")
    .bind("You must successfully complete verification before this date to qualify for a Verified Certificate.")
    .bind(utc(2026, 12, 10)?)
    .bind(DateType::VerificationDeadline.to_string())
    .bind("seed-verification")
    .execute(pool)
    .await?;

    sqlx::query("INSERT INTO course_home.completions (username, block_key) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind("avery")
        .bind("block-v1:edX+DemoX+Demo_2026+type@sequential+block@hw1")
        .execute(pool)
        .await?;

    let sections = vec![
        (
            Uuid::parse_str("5b0c8d2e-61c4-4f6b-9b1e-0a6f5c1d9e01")?,
            1,
            "Week 1: Introduction",
            vec![(
                "block-v1:edX+DemoX+Demo_2026+type@sequential+block@hw1",
                "Homework 1: Getting Started",
                utc(2026, 2, 2)?,
                "Homework",
                false,
                "always",
            )],
        ),
        (
            Uuid::parse_str("9e3f14a7-2d4b-4c8e-a6f0-7b2c3d4e5f02")?,
            2,
            "Week 6: Review",
            vec![(
                "block-v1:edX+DemoX+Demo_2026+type@sequential+block@midterm",
                "Midterm Exam",
                utc(2026, 4, 6)?,
                "Exam",
                true,
                "past_due",
            )],
        ),
    ];

    for (section_id, position, display_name, subsections) in sections {
        sqlx::query(
            r#"
            INSERT INTO course_home.sections (id, course_key, position, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            "#,
        )
        .bind(section_id)
        .bind(DEMO_COURSE)
        .bind(position)
        .bind(display_name)
        .execute(pool)
        .await?;

        for (index, (location, name, due, format, hide_after_due, show_correctness)) in
            subsections.into_iter().enumerate()
        {
            sqlx::query(
                r#"
                INSERT INTO course_home.subsections
                (location, section_id, position, display_name, due_at, format,
                 graded, hide_after_due, show_correctness)
                VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8)
                ON CONFLICT (location) DO NOTHING
                "#,
            )
            .bind(location)
            .bind(section_id)
            .bind(index as i32 + 1)
            .bind(name)
            .bind(due)
            .bind(format)
            .bind(hide_after_due)
            .bind(show_correctness)
            .execute(pool)
            .await?;
        }
    }

    let scores = vec![
        ("avery", "block-v1:edX+DemoX+Demo_2026+type@sequential+block@hw1", vec![(1.0, 1.0), (0.5, 1.0)]),
        ("avery", "block-v1:edX+DemoX+Demo_2026+type@sequential+block@midterm", vec![(3.0, 5.0)]),
        ("jules", "block-v1:edX+DemoX+Demo_2026+type@sequential+block@hw1", vec![(1.0, 1.0), (1.0, 1.0)]),
    ];

    for (username, location, problems) in scores {
        for (index, (earned, possible)) in problems.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO course_home.problem_scores
                (username, subsection_location, position, earned, possible)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (username, subsection_location, position) DO UPDATE
                SET earned = EXCLUDED.earned, possible = EXCLUDED.possible
                "#,
            )
            .bind(username)
            .bind(location)
            .bind(index as i32)
            .bind(earned)
            .bind(possible)
            .execute(pool)
            .await?;
        }
    }

    let policies = vec![("Homework", Some("HW"), 0.4, 1, 0), ("Exam", None, 0.6, 2, 0)];
    for (assignment_type, short_label, weight, min_count, drop_count) in policies {
        sqlx::query(
            r#"
            INSERT INTO course_home.assignment_policies
            (course_key, assignment_type, short_label, weight, min_count, drop_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (course_key, assignment_type) DO NOTHING
            "#,
        )
        .bind(DEMO_COURSE)
        .bind(assignment_type)
        .bind(short_label)
        .bind(weight)
        .bind(min_count)
        .bind(drop_count)
        .execute(pool)
        .await?;
    }

    for (letter, cutoff) in [("A", 0.9), ("B", 0.8), ("Pass", 0.5)] {
        sqlx::query(
            r#"
            INSERT INTO course_home.grade_cutoffs (course_key, letter, cutoff)
            VALUES ($1, $2, $3)
            ON CONFLICT (course_key, letter) DO NOTHING
            "#,
        )
        .bind(DEMO_COURSE)
        .bind(letter)
        .bind(cutoff)
        .execute(pool)
        .await?;
    }

    info!(course = DEMO_COURSE, "seed data inserted");
    Ok(())
}

pub async fn load_snapshot(
    pool: &PgPool,
    course_key: &str,
    username: &str,
) -> anyhow::Result<CourseSnapshot> {
    let course = sqlx::query(
        r#"
        SELECT display_name, start_at, end_at, self_paced,
               verified_price, verified_currency, verified_sku, upgrade_deadline
        FROM course_home.courses
        WHERE course_key = $1
        "#,
    )
    .bind(course_key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatesError::CourseNotFound(course_key.to_string()))?;

    let self_paced: bool = course.get("self_paced");
    let end: Option<DateTime<Utc>> = course.get("end_at");

    let verified_price: Option<i32> = course.get("verified_price");
    let verified_sku: Option<String> = course.get("verified_sku");
    let verified_mode = match (verified_price, verified_sku) {
        (Some(price), Some(sku)) => Some(VerifiedModeOffer {
            price,
            currency: course
                .get::<Option<String>, _>("verified_currency")
                .unwrap_or_else(|| "usd".to_string()),
            sku,
            upgrade_deadline: course.get("upgrade_deadline"),
        }),
        _ => None,
    };

    let learner = fetch_learner(pool, course_key, username).await?;
    let date_blocks = fetch_date_blocks(pool, course_key, username).await?;
    let sections = fetch_graded_sections(pool, course_key, username, self_paced, end).await?;
    let grading_policy = fetch_grading_policy(pool, course_key).await?;

    debug!(
        course = course_key,
        learner = username,
        blocks = date_blocks.len(),
        sections = sections.len(),
        "loaded course snapshot"
    );

    Ok(CourseSnapshot {
        course_key: course_key.to_string(),
        display_name: course.get("display_name"),
        start: course.get("start_at"),
        end,
        self_paced,
        learner,
        date_blocks,
        sections,
        grading_policy,
        verified_mode,
    })
}

async fn fetch_learner(
    pool: &PgPool,
    course_key: &str,
    username: &str,
) -> anyhow::Result<LearnerRecord> {
    let time_zone: Option<String> =
        sqlx::query("SELECT time_zone FROM course_home.learners WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?
            .and_then(|row| row.get("time_zone"));

    let enrollment = match sqlx::query(
        "SELECT mode, is_active FROM course_home.enrollments WHERE username = $1 AND course_key = $2",
    )
    .bind(username)
    .bind(course_key)
    .fetch_optional(pool)
    .await?
    {
        Some(row) => Some(Enrollment {
            mode: EnrollmentMode::from(row.get::<String, _>("mode")),
            is_active: row.get("is_active"),
        }),
        None => None,
    };

    let is_staff = sqlx::query(
        "SELECT 1 FROM course_home.course_staff WHERE username = $1 AND course_key = $2",
    )
    .bind(username)
    .bind(course_key)
    .fetch_optional(pool)
    .await?
    .is_some();

    Ok(LearnerRecord {
        username: username.to_string(),
        is_staff,
        enrollment,
        time_zone,
    })
}

async fn fetch_date_blocks(
    pool: &PgPool,
    course_key: &str,
    username: &str,
) -> anyhow::Result<Vec<DateEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT b.title, b.description, b.occurs_at, b.date_type, b.link, b.link_text,
               b.extra_info, b.contains_gated_content, b.block_key, b.section_name,
               b.assignment_type, (c.block_key IS NOT NULL) AS complete
        FROM course_home.date_blocks b
        LEFT JOIN course_home.completions c
               ON c.block_key = b.block_key AND c.username = $2
        WHERE b.course_key = $1
        ORDER BY b.occurs_at
        "#,
    )
    .bind(course_key)
    .bind(username)
    .fetch_all(pool)
    .await?;

    let mut blocks = Vec::with_capacity(rows.len());
    for row in rows {
        let date_type = DateType::from(row.get::<String, _>("date_type"));
        let block_key: Option<String> = row.get("block_key");
        // completion only means something for blocks that point at content
        let complete = block_key.as_ref().map(|_| row.get::<bool, _>("complete"));
        blocks.push(DateEvent {
            title: row.get("title"),
            description: row.get("description"),
            date: row.get("occurs_at"),
            is_verification_deadline: date_type == DateType::VerificationDeadline,
            date_type,
            link: row.get("link"),
            link_text: row.get("link_text"),
            extra_info: row.get("extra_info"),
            contains_gated_content: row.get("contains_gated_content"),
            block_key,
            section_name: row.get("section_name"),
            assignment_type: row.get("assignment_type"),
            complete,
        });
    }

    Ok(blocks)
}

async fn fetch_graded_sections(
    pool: &PgPool,
    course_key: &str,
    username: &str,
    self_paced: bool,
    course_end: Option<DateTime<Utc>>,
) -> anyhow::Result<Vec<GradedSection>> {
    let section_rows = sqlx::query(
        "SELECT id, display_name FROM course_home.sections WHERE course_key = $1 ORDER BY position",
    )
    .bind(course_key)
    .fetch_all(pool)
    .await?;

    let score_rows = sqlx::query(
        r#"
        SELECT ps.subsection_location, ps.earned, ps.possible
        FROM course_home.problem_scores ps
        JOIN course_home.subsections sub ON sub.location = ps.subsection_location
        JOIN course_home.sections s ON s.id = sub.section_id
        WHERE s.course_key = $1 AND ps.username = $2
        ORDER BY ps.subsection_location, ps.position
        "#,
    )
    .bind(course_key)
    .bind(username)
    .fetch_all(pool)
    .await?;

    let mut scores: HashMap<String, Vec<ProblemScore>> = HashMap::new();
    for row in score_rows {
        scores
            .entry(row.get("subsection_location"))
            .or_default()
            .push(ProblemScore {
                earned: row.get("earned"),
                possible: row.get("possible"),
            });
    }

    let subsection_rows = sqlx::query(
        r#"
        SELECT sub.section_id, sub.location, sub.display_name, sub.due_at, sub.format,
               sub.graded, sub.hide_after_due, sub.show_correctness
        FROM course_home.subsections sub
        JOIN course_home.sections s ON s.id = sub.section_id
        WHERE s.course_key = $1
        ORDER BY s.position, sub.position
        "#,
    )
    .bind(course_key)
    .fetch_all(pool)
    .await?;

    let mut by_section: HashMap<Uuid, Vec<GradedSubsection>> = HashMap::new();
    for row in subsection_rows {
        let location: String = row.get("location");
        let due: Option<DateTime<Utc>> = row.get("due_at");
        let show_correctness: ShowCorrectness = row.get::<String, _>("show_correctness").parse()?;
        by_section
            .entry(row.get("section_id"))
            .or_default()
            .push(GradedSubsection {
                display_name: row.get("display_name"),
                problem_scores: scores.remove(&location).unwrap_or_default(),
                location,
                due: due.map(Deadline::from),
                end: course_end.map(Deadline::from),
                self_paced,
                hide_after_due: row.get("hide_after_due"),
                graded: row.get("graded"),
                format: row.get("format"),
                show_correctness,
            });
    }

    Ok(section_rows
        .into_iter()
        .map(|row| {
            let id: Uuid = row.get("id");
            GradedSection {
                display_name: row.get("display_name"),
                subsections: by_section.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

async fn fetch_grading_policy(
    pool: &PgPool,
    course_key: &str,
) -> anyhow::Result<Option<GradingPolicy>> {
    let policy_rows = sqlx::query(
        r#"
        SELECT assignment_type, short_label, weight, min_count, drop_count
        FROM course_home.assignment_policies
        WHERE course_key = $1
        ORDER BY assignment_type
        "#,
    )
    .bind(course_key)
    .fetch_all(pool)
    .await?;

    let cutoff_rows =
        sqlx::query("SELECT letter, cutoff FROM course_home.grade_cutoffs WHERE course_key = $1")
            .bind(course_key)
            .fetch_all(pool)
            .await?;

    if policy_rows.is_empty() && cutoff_rows.is_empty() {
        return Ok(None);
    }

    let assignment_policies = policy_rows
        .into_iter()
        .map(|row| AssignmentPolicy {
            assignment_type: row.get("assignment_type"),
            short_label: row.get("short_label"),
            weight: row.get("weight"),
            min_count: row.get::<i32, _>("min_count").max(0) as u32,
            drop_count: row.get::<i32, _>("drop_count").max(0) as u32,
        })
        .collect();

    let grade_cutoffs: BTreeMap<String, f64> = cutoff_rows
        .into_iter()
        .map(|row| (row.get("letter"), row.get("cutoff")))
        .collect();

    Ok(Some(GradingPolicy {
        assignment_policies,
        grade_cutoffs,
    }))
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        course_key: String,
        title: String,
        #[serde(default)]
        description: String,
        date: DateTime<Utc>,
        date_type: String,
        #[serde(default)]
        link: String,
        #[serde(default)]
        link_text: String,
        extra_info: Option<String>,
        #[serde(default)]
        contains_gated_content: bool,
        block_key: Option<String>,
        section_name: Option<String>,
        assignment_type: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // dates without an offset fail here rather than being stored as server-local time
        let row = result.with_context(|| format!("invalid date block on line {}", index + 2))?;

        let date_type = DateType::from(row.date_type.clone());
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO course_home.date_blocks
            (id, course_key, title, description, occurs_at, date_type, link, link_text,
             extra_info, contains_gated_content, block_key, section_name, assignment_type,
             source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.course_key)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.date)
        .bind(date_type.as_str())
        .bind(&row.link)
        .bind(&row.link_text)
        .bind(&row.extra_info)
        .bind(row.contains_gated_content)
        .bind(&row.block_key)
        .bind(&row.section_name)
        .bind(&row.assignment_type)
        .bind(source_key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to store date block '{}'", row.title))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "imported date blocks");
    Ok(inserted)
}

pub async fn restrict_course(
    pool: &PgPool,
    course_key: &str,
    country: &Country,
    rule_type: RuleType,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO course_home.restricted_courses (course_key)
        VALUES ($1)
        ON CONFLICT (course_key) DO NOTHING
        "#,
    )
    .bind(course_key)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO course_home.country_access_rules (course_key, country, rule_type)
        VALUES ($1, $2, $3)
        ON CONFLICT (course_key, country) DO UPDATE SET rule_type = EXCLUDED.rule_type
        "#,
    )
    .bind(course_key)
    .bind(&country.code)
    .bind(rule_type.as_str())
    .execute(pool)
    .await?;

    info!(course = course_key, country = %country.code, rule = %rule_type, "stored country access rule");
    Ok(())
}

pub async fn fetch_embargo(
    pool: &PgPool,
    course_key: &str,
) -> anyhow::Result<(Option<RestrictedCourse>, Vec<CountryAccessRule>)> {
    let restricted = sqlx::query(
        "SELECT enroll_msg_key, access_msg_key FROM course_home.restricted_courses WHERE course_key = $1",
    )
    .bind(course_key)
    .fetch_optional(pool)
    .await?
    .map(|row| RestrictedCourse {
        course_key: course_key.to_string(),
        enroll_msg_key: row.get("enroll_msg_key"),
        access_msg_key: row.get("access_msg_key"),
    });

    let rows = sqlx::query(
        "SELECT country, rule_type FROM course_home.country_access_rules WHERE course_key = $1",
    )
    .bind(course_key)
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        let code: String = row.get("country");
        rules.push(CountryAccessRule {
            country: Country::new(&code)?,
            course_key: course_key.to_string(),
            rule_type: row.get::<String, _>("rule_type").parse()?,
        });
    }

    Ok((restricted, rules))
}
