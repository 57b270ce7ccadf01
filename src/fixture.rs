use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::models::CourseSnapshot;

/// Loads a course snapshot from a JSON file instead of Postgres.
pub fn load_snapshot(path: &Path) -> anyhow::Result<CourseSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let snapshot: CourseSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;
    info!(
        course = %snapshot.course_key,
        blocks = snapshot.date_blocks.len(),
        sections = snapshot.sections.len(),
        "loaded snapshot fixture"
    );
    Ok(snapshot)
}
