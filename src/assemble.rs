use crate::analytics::{self, ClassAnalytics, SubjectAnalytics};
use crate::grade::{self, StudentOutcome};
use crate::normalize::{self, RowError};
use crate::rank;
use crate::rules::{RuleBook, StatusPolicy, SystemId};
use serde::Serialize;
use serde_json::json;

/// Serializable engine failure, mapped to the IPC error envelope at the
/// boundary. Configuration errors abort the whole run; row-level problems
/// travel in `ProcessedResult::errors` instead.
#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Fixed subject column set; inferred from the rows when absent.
    pub subjects: Option<Vec<String>>,
    /// Explicit principal-subject designation (ACSEE). Falling back to the
    /// first N subject columns is a documented degraded mode.
    pub principal_subjects: Option<Vec<String>>,
    /// Opaque caller identifiers (exam id, class id, per-subject ids),
    /// passed through into the output verbatim.
    pub external_ids: serde_json::Value,
}

/// The complete assembled output of one processing run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    pub external_ids: serde_json::Value,
    pub grading_system: String,
    pub subjects: Vec<String>,
    pub students: Vec<StudentOutcome>,
    pub class_analytics: ClassAnalytics,
    #[serde(serialize_with = "crate::grade::pairs_as_map")]
    pub subject_analytics: Vec<(String, SubjectAnalytics)>,
    pub errors: Vec<RowError>,
}

/// Full pipeline: normalize -> grade -> rank -> aggregate -> assemble.
///
/// Ranking is the one synchronization point: it needs every graded student
/// before a single rank can be assigned, so it runs after the grading pass
/// and before analytics (summaries carry rank values).
pub fn process_class(
    book: &RuleBook,
    system_id: SystemId,
    rows: &[serde_json::Value],
    options: &ProcessOptions,
) -> ProcessedResult {
    let system = book.get(system_id);
    let normalized = normalize::normalize_rows(rows, options.subjects.as_deref());

    let principals: Vec<String> = match system.status_policy {
        StatusPolicy::PrincipalDivision => match &options.principal_subjects {
            Some(explicit) => explicit
                .iter()
                .filter(|p| normalized.subjects.contains(p))
                .cloned()
                .collect(),
            // Degraded mode: first N subject columns stand in as principals.
            None => normalized
                .subjects
                .iter()
                .take(system.principal_count)
                .cloned()
                .collect(),
        },
        _ => Vec::new(),
    };

    let mut students: Vec<StudentOutcome> = normalized
        .records
        .into_iter()
        .map(|record| {
            let (subjects, summary) =
                grade::summarize_student(system, &record, &normalized.subjects, &principals);
            StudentOutcome {
                record,
                subjects,
                summary,
            }
        })
        .collect();

    assign_class_ranks(&mut students, system.gpa);
    assign_subject_ranks(&mut students, &normalized.subjects);

    let subject_analytics: Vec<(String, SubjectAnalytics)> = normalized
        .subjects
        .iter()
        .map(|subject| (subject.clone(), analytics::subject_analytics(&students, subject)))
        .collect();
    let class_analytics = analytics::class_analytics(&students, &normalized.subjects);

    ProcessedResult {
        external_ids: options.external_ids.clone(),
        grading_system: system_id.as_str().to_string(),
        subjects: normalized.subjects,
        students,
        class_analytics,
        subject_analytics,
        errors: normalized.errors,
    }
}

fn assign_class_ranks(students: &mut [StudentOutcome], gpa: bool) {
    let average_keys: Vec<Option<f64>> =
        students.iter().map(|s| s.summary.average_exact).collect();
    for (student, rank) in students
        .iter_mut()
        .zip(rank::competition_ranks(&average_keys))
    {
        student.summary.class_rank = rank;
    }

    // Point-sum systems rank ascending (fewest points wins); GPA systems
    // rank descending. Negating the key keeps one ranking routine.
    let point_keys: Vec<Option<f64>> = students
        .iter()
        .map(|s| {
            s.summary
                .average_exact
                .and(s.summary.points)
                .map(|p| if gpa { p } else { -p })
        })
        .collect();
    for (student, rank) in students
        .iter_mut()
        .zip(rank::competition_ranks(&point_keys))
    {
        student.summary.points_rank = rank;
    }
}

fn assign_subject_ranks(students: &mut [StudentOutcome], subjects: &[String]) {
    for subject in subjects {
        let keys: Vec<Option<f64>> = students
            .iter()
            .map(|s| {
                s.subjects
                    .iter()
                    .find(|(name, _)| name == subject)
                    .and_then(|(_, r)| r.mark)
            })
            .collect();
        for (student, rank) in students.iter_mut().zip(rank::competition_ranks(&keys)) {
            if let Some((_, result)) = student
                .subjects
                .iter_mut()
                .find(|(name, _)| name == subject)
            {
                result.rank = rank;
            }
        }
    }
}

fn result_field<'a>(
    result: &'a serde_json::Value,
    key: &str,
) -> Result<&'a serde_json::Value, EngineError> {
    result
        .get(key)
        .ok_or_else(|| EngineError::new("bad_result", format!("result is missing {}", key)))
}

/// Flatten an assembled result to one row per student-subject pair plus one
/// summary row per student, ready for bulk persistence. Pure reshape: no
/// value is recomputed.
pub fn database_rows(result: &serde_json::Value) -> Result<serde_json::Value, EngineError> {
    let students = result_field(result, "students")?
        .as_array()
        .ok_or_else(|| EngineError::new("bad_result", "students must be an array"))?;

    let mut rows: Vec<serde_json::Value> = Vec::new();
    let mut summaries: Vec<serde_json::Value> = Vec::new();
    for student in students {
        let info = result_field(student, "student")?;
        let admission_no = info.get("admissionNo").cloned().unwrap_or(json!(""));
        let student_id = info.get("studentId").cloned().unwrap_or(json!(""));

        if let Some(subjects) = student.get("subjects").and_then(|v| v.as_object()) {
            for (subject, data) in subjects {
                rows.push(json!({
                    "admissionNo": admission_no,
                    "studentId": student_id,
                    "subject": subject,
                    "mark": data.get("mark").cloned().unwrap_or(serde_json::Value::Null),
                    "grade": data.get("grade").cloned().unwrap_or(serde_json::Value::Null),
                    "points": data.get("points").cloned().unwrap_or(serde_json::Value::Null),
                    "pass": data.get("pass").cloned().unwrap_or(json!(false)),
                    "rank": data.get("rank").cloned().unwrap_or(serde_json::Value::Null),
                }));
            }
        }

        summaries.push(json!({
            "admissionNo": admission_no,
            "studentId": student_id,
            "fullName": info.get("fullName").cloned().unwrap_or(json!("")),
            "gender": info.get("gender").cloned().unwrap_or(json!("UNKNOWN")),
            "summary": student.get("summary").cloned().unwrap_or(json!({})),
        }));
    }

    Ok(json!({
        "externalIds": result.get("externalIds").cloned().unwrap_or(json!({})),
        "gradingSystem": result.get("gradingSystem").cloned().unwrap_or(json!("")),
        "rows": rows,
        "summaries": summaries,
    }))
}

/// Condense an assembled result to headline class metrics. Pure reshape.
pub fn summary_report(result: &serde_json::Value) -> Result<serde_json::Value, EngineError> {
    let class = result_field(result, "classAnalytics")?;
    let overview = result_field(class, "overview")?;
    let error_count = result
        .get("errors")
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .unwrap_or(0);

    Ok(json!({
        "externalIds": result.get("externalIds").cloned().unwrap_or(json!({})),
        "gradingSystem": result.get("gradingSystem").cloned().unwrap_or(json!("")),
        "overview": overview,
        "gradeDistribution": class.get("gradeDistribution").cloned().unwrap_or(json!({})),
        "divisionDistribution": class.get("divisionDistribution").cloned().unwrap_or(serde_json::Value::Null),
        "genderPerformance": class.get("genderPerformance").cloned().unwrap_or(json!({})),
        "errorCount": error_count,
    }))
}
