use crate::grade::{round2, StudentOutcome};
use crate::normalize::Gender;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub total: usize,
    pub attended: usize,
    pub absent: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub median: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDistribution {
    pub counts: BTreeMap<String, usize>,
    pub percentages: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderSlice {
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderAnalysis {
    pub male: GenderSlice,
    pub female: GenderSlice,
    pub unknown: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAnalytics {
    pub attendance: Attendance,
    pub performance: Performance,
    pub grade_distribution: GradeDistribution,
    pub gender_analysis: GenderAnalysis,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOverview {
    pub students: usize,
    pub subjects: usize,
    pub average: f64,
    pub highest_average: f64,
    pub lowest_average: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderPerformanceSlice {
    pub average: f64,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderPerformance {
    pub male: GenderPerformanceSlice,
    pub female: GenderPerformanceSlice,
    pub unknown: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAnalytics {
    pub overview: ClassOverview,
    pub grade_distribution: GradeDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division_distribution: Option<GradeDistribution>,
    pub gender_performance: GenderPerformance,
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 * 100.0 / whole as f64)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round2(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Lower median: the middle element of the sorted list, taking the lower of
/// the two middles on even counts.
fn lower_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[(sorted.len() - 1) / 2]
}

fn distribution(counts: BTreeMap<String, usize>, denominator: usize) -> GradeDistribution {
    let percentages = counts
        .iter()
        .map(|(grade, &count)| (grade.clone(), percentage(count, denominator)))
        .collect();
    GradeDistribution {
        counts,
        percentages,
    }
}

/// Aggregate one subject across the class. Performance and gender averages
/// cover attended marks only; attendance and distribution percentages use
/// the full roster as denominator.
pub fn subject_analytics(students: &[StudentOutcome], subject: &str) -> SubjectAnalytics {
    let total = students.len();
    let mut marks: Vec<f64> = Vec::new();
    let mut male_marks: Vec<f64> = Vec::new();
    let mut female_marks: Vec<f64> = Vec::new();
    let mut unknown_attended = 0usize;
    let mut passed = 0usize;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for student in students {
        let Some((_, result)) = student.subjects.iter().find(|(name, _)| name == subject) else {
            continue;
        };
        *counts.entry(result.grade.clone()).or_insert(0) += 1;
        let Some(mark) = result.mark else {
            continue;
        };
        marks.push(mark);
        if result.pass {
            passed += 1;
        }
        match student.record.gender {
            Gender::Male => male_marks.push(mark),
            Gender::Female => female_marks.push(mark),
            Gender::Unknown => unknown_attended += 1,
        }
    }

    let attended = marks.len();
    SubjectAnalytics {
        attendance: Attendance {
            total,
            attended,
            absent: total - attended,
            rate: percentage(attended, total),
        },
        performance: Performance {
            average: mean(&marks),
            highest: marks.iter().cloned().fold(0.0, f64::max),
            lowest: if marks.is_empty() {
                0.0
            } else {
                marks.iter().cloned().fold(f64::INFINITY, f64::min)
            },
            median: lower_median(&marks),
            pass_rate: percentage(passed, attended),
        },
        grade_distribution: distribution(counts, total),
        gender_analysis: GenderAnalysis {
            male: GenderSlice {
                average: mean(&male_marks),
                count: male_marks.len(),
            },
            female: GenderSlice {
                average: mean(&female_marks),
                count: female_marks.len(),
            },
            unknown: unknown_attended,
        },
    }
}

/// Aggregate the whole class. The class average is the mean of per-student
/// averages over students with at least one attended subject; students with
/// none stay in the roster counts but out of every average denominator.
pub fn class_analytics(students: &[StudentOutcome], subjects: &[String]) -> ClassAnalytics {
    let total = students.len();
    let mut averages: Vec<f64> = Vec::new();
    let mut male_averages: Vec<f64> = Vec::new();
    let mut female_averages: Vec<f64> = Vec::new();
    let mut male_count = 0usize;
    let mut female_count = 0usize;
    let mut unknown_count = 0usize;
    let mut grade_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut division_counts: BTreeMap<String, usize> = BTreeMap::new();

    for student in students {
        match student.record.gender {
            Gender::Male => male_count += 1,
            Gender::Female => female_count += 1,
            Gender::Unknown => unknown_count += 1,
        }
        if let Some(grade) = &student.summary.grade {
            *grade_counts.entry(grade.clone()).or_insert(0) += 1;
        }
        if let Some(division) = &student.summary.division {
            *division_counts.entry(division.clone()).or_insert(0) += 1;
        }
        let Some(avg) = student.summary.average_exact else {
            continue;
        };
        averages.push(avg);
        match student.record.gender {
            Gender::Male => male_averages.push(avg),
            Gender::Female => female_averages.push(avg),
            Gender::Unknown => {}
        }
    }

    ClassAnalytics {
        overview: ClassOverview {
            students: total,
            subjects: subjects.len(),
            average: mean(&averages),
            highest_average: round2(averages.iter().cloned().fold(0.0, f64::max)),
            lowest_average: if averages.is_empty() {
                0.0
            } else {
                round2(averages.iter().cloned().fold(f64::INFINITY, f64::min))
            },
        },
        grade_distribution: distribution(grade_counts, total),
        division_distribution: if division_counts.is_empty() {
            None
        } else {
            Some(distribution(division_counts, total))
        },
        gender_performance: GenderPerformance {
            male: GenderPerformanceSlice {
                average: mean(&male_averages),
                count: male_count,
                percentage: percentage(male_count, total),
            },
            female: GenderPerformanceSlice {
                average: mean(&female_averages),
                count: female_count,
                percentage: percentage(female_count, total),
            },
            unknown: unknown_count,
        },
    }
}
