use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::GradedSection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPolicy {
    #[serde(rename = "type")]
    pub assignment_type: String,
    #[serde(default)]
    pub short_label: Option<String>,
    pub weight: f64,
    #[serde(default)]
    pub min_count: u32,
    #[serde(default)]
    pub drop_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    #[serde(default)]
    pub assignment_policies: Vec<AssignmentPolicy>,
    /// Letter grade to the lowest fraction that earns it.
    #[serde(default)]
    pub grade_cutoffs: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseGrade {
    pub letter_grade: Option<String>,
    pub percent: f64,
    pub is_passing: bool,
}

pub fn compute_course_grade(sections: &[GradedSection], policy: &GradingPolicy) -> CourseGrade {
    let percent: f64 = policy
        .assignment_policies
        .iter()
        .map(|assignment| assignment.weight * assignment_type_average(sections, assignment))
        .sum();
    let percent = round_percent(percent);
    let letter_grade = letter_grade(percent, &policy.grade_cutoffs);

    CourseGrade {
        is_passing: letter_grade.is_some(),
        letter_grade,
        percent,
    }
}

fn assignment_type_average(sections: &[GradedSection], assignment: &AssignmentPolicy) -> f64 {
    let mut percents: Vec<f64> = sections
        .iter()
        .flat_map(|section| section.subsections.iter())
        .filter(|sub| sub.graded && sub.format.as_deref() == Some(assignment.assignment_type.as_str()))
        .map(|sub| sub.percent_graded())
        .collect();

    while percents.len() < assignment.min_count as usize {
        percents.push(0.0);
    }

    percents.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let kept = &percents[(assignment.drop_count as usize).min(percents.len())..];

    if kept.is_empty() {
        0.0
    } else {
        kept.iter().sum::<f64>() / kept.len() as f64
    }
}

/// Two decimal places, halves rounded away from zero.
pub fn round_percent(percent: f64) -> f64 {
    (percent * 100.0).round() / 100.0
}

pub fn letter_grade(percent: f64, cutoffs: &BTreeMap<String, f64>) -> Option<String> {
    let mut ordered: Vec<(&String, &f64)> = cutoffs.iter().collect();
    ordered.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    ordered
        .into_iter()
        .find(|(_, cutoff)| percent >= **cutoff)
        .map(|(letter, _)| letter.clone())
}
