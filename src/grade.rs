use crate::normalize::StudentRecord;
use crate::rules::{GradingSystem, StatusPolicy};
use serde::Serialize;

/// Unified grading result for one mark (the richer dict shape from the
/// legacy engine is canonical; the tuple-returning duplicate is gone).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub grade: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    pub description: &'static str,
    pub pass: bool,
}

/// What a single raw mark maps to under a system.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    Graded(GradeResult),
    /// No mark recorded. Excluded from averages and pass/fail counts.
    Absent,
    /// Mark outside [0,100]. Never a crash.
    Invalid,
}

pub fn grade_for(system: &GradingSystem, mark: Option<f64>) -> GradeOutcome {
    let Some(mark) = mark else {
        return GradeOutcome::Absent;
    };
    match system.band_for(mark) {
        Some(band) => GradeOutcome::Graded(GradeResult {
            grade: band.grade,
            points: band.points,
            description: band.description,
            pass: system.is_passing(band.grade),
        }),
        None => GradeOutcome::Invalid,
    }
}

/// Per-student, per-subject result. `rank` is filled by the ranking pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub mark: Option<f64>,
    pub grade: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    pub description: String,
    pub pass: bool,
    pub attended: bool,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    /// No attended subjects at all.
    Absent,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Absent => "ABSENT",
        }
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub total_marks: f64,
    pub average_mark: f64,
    pub subjects_total: usize,
    pub subjects_attended: usize,
    pub subjects_passed: usize,
    pub subjects_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub class_rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_rank: Option<u32>,
    /// Unrounded average, kept for ranking and class aggregation so that
    /// display rounding never shifts ties or class means.
    #[serde(skip)]
    pub average_exact: Option<f64>,
}

/// One student's fully graded outcome, carried from the grading pass
/// through ranking into aggregation and assembly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOutcome {
    #[serde(rename = "student")]
    pub record: StudentRecord,
    #[serde(serialize_with = "crate::grade::pairs_as_map")]
    pub subjects: Vec<(String, SubjectResult)>,
    pub summary: StudentSummary,
}

/// Serialize name/value pairs as an object, preserving column order.
pub fn pairs_as_map<S: serde::Serializer, V: Serialize>(
    pairs: &[(String, V)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (name, value) in pairs {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn subject_result(system: &GradingSystem, mark: Option<f64>) -> SubjectResult {
    match grade_for(system, mark) {
        GradeOutcome::Graded(g) => SubjectResult {
            mark: mark.map(round2),
            grade: g.grade.to_string(),
            points: g.points,
            description: g.description.to_string(),
            pass: g.pass,
            attended: true,
            rank: None,
        },
        GradeOutcome::Absent => SubjectResult {
            mark: None,
            grade: "ABS".to_string(),
            points: None,
            description: "Absent".to_string(),
            pass: false,
            attended: false,
            rank: None,
        },
        GradeOutcome::Invalid => SubjectResult {
            mark: None,
            grade: "ERR".to_string(),
            points: None,
            description: "Invalid mark".to_string(),
            pass: false,
            attended: false,
            rank: None,
        },
    }
}

/// Grade every subject of one student and fold the results into a summary.
/// Subject order follows `subjects`; `principals` only matters for systems
/// with a principal-subject policy.
pub fn summarize_student(
    system: &GradingSystem,
    record: &StudentRecord,
    subjects: &[String],
    principals: &[String],
) -> (Vec<(String, SubjectResult)>, StudentSummary) {
    let mut results: Vec<(String, SubjectResult)> = Vec::with_capacity(subjects.len());
    for subject in subjects {
        results.push((subject.clone(), subject_result(system, record.mark(subject))));
    }

    let attended: Vec<&(String, SubjectResult)> =
        results.iter().filter(|(_, r)| r.attended).collect();
    let passed = attended.iter().filter(|(_, r)| r.pass).count();
    let failed = attended.len() - passed;
    let total: f64 = attended.iter().filter_map(|(_, r)| r.mark).sum();
    let average_exact = if attended.is_empty() {
        None
    } else {
        Some(total / attended.len() as f64)
    };

    let overall = average_exact.and_then(|avg| match grade_for(system, Some(avg)) {
        GradeOutcome::Graded(g) => Some(g),
        _ => None,
    });

    let mut summary = StudentSummary {
        total_marks: round2(total),
        average_mark: average_exact.map(round2).unwrap_or(0.0),
        subjects_total: subjects.len(),
        subjects_attended: attended.len(),
        subjects_passed: passed,
        subjects_failed: failed,
        points: None,
        division: None,
        status: if attended.is_empty() {
            Status::Absent
        } else {
            Status::Pass
        },
        grade: overall.as_ref().map(|g| g.grade.to_string()),
        description: overall.as_ref().map(|g| g.description.to_string()),
        class_rank: None,
        points_rank: None,
        average_exact,
    };

    if attended.is_empty() {
        return (results, summary);
    }

    match system.status_policy {
        StatusPolicy::Division => {
            let point_sum: f64 = attended.iter().filter_map(|(_, r)| r.points).sum();
            let division = system.division_for(point_sum);
            summary.points = Some(point_sum);
            summary.division = Some(division.to_string());
            summary.status = if division == system.fail_division {
                Status::Fail
            } else {
                Status::Pass
            };
        }
        StatusPolicy::PrincipalDivision => {
            let is_principal = |name: &str| principals.iter().any(|p| p == name);
            let principal_attended: Vec<&&(String, SubjectResult)> = attended
                .iter()
                .filter(|(name, _)| is_principal(name))
                .collect();
            let principal_passes = principal_attended.iter().filter(|(_, r)| r.pass).count();
            let point_sum: f64 = principal_attended.iter().filter_map(|(_, r)| r.points).sum();
            summary.points = Some(point_sum);
            if principal_attended.len() < 2 || principal_passes < 2 {
                // Not enough principal evidence: failed outright, whatever
                // the point sum says.
                summary.division = Some(system.fail_division.to_string());
                summary.status = Status::Fail;
            } else {
                let division = system.division_for(point_sum);
                summary.division = Some(division.to_string());
                summary.status = if division == system.fail_division {
                    Status::Fail
                } else {
                    Status::Pass
                };
            }
        }
        StatusPolicy::FailFraction => {
            if system.gpa {
                let graded: Vec<f64> = attended.iter().filter_map(|(_, r)| r.points).collect();
                if !graded.is_empty() {
                    summary.points =
                        Some(round2(graded.iter().sum::<f64>() / graded.len() as f64));
                }
            }
            let fail_fraction = failed as f64 / attended.len() as f64;
            summary.status = if fail_fraction > system.max_fail_fraction {
                Status::Fail
            } else {
                Status::Pass
            };
        }
    }

    if summary.status == Status::Fail && system.status_policy != StatusPolicy::FailFraction {
        // A failing division overrides the average-derived grade.
        if let Some(fail_band) = system.bands.last() {
            summary.grade = Some(fail_band.grade.to_string());
            summary.description = Some(fail_band.description.to_string());
        }
    }

    (results, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Gender, StudentRecord};
    use crate::rules::{RuleBook, SystemId};
    use std::collections::HashMap;

    fn record(marks: &[(&str, Option<f64>)]) -> StudentRecord {
        StudentRecord {
            admission_no: "ADM001".to_string(),
            student_id: "STU001".to_string(),
            full_name: "JOHN MWAMBA".to_string(),
            gender: Gender::Male,
            class_name: "FORM 4".to_string(),
            stream: "EAST".to_string(),
            remarks: String::new(),
            marks: marks
                .iter()
                .map(|(s, m)| (s.to_string(), *m))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn subjects(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn csee_grade_bands_give_expected_grades_and_points() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        match grade_for(csee, Some(85.0)) {
            GradeOutcome::Graded(g) => {
                assert_eq!(g.grade, "A");
                assert_eq!(g.points, Some(1.0));
                assert!(g.pass);
            }
            other => panic!("expected graded, got {:?}", other),
        }
        match grade_for(csee, Some(15.0)) {
            GradeOutcome::Graded(g) => {
                assert_eq!(g.grade, "F");
                assert_eq!(g.points, Some(5.0));
                assert!(!g.pass);
            }
            other => panic!("expected graded, got {:?}", other),
        }
        assert_eq!(grade_for(csee, None), GradeOutcome::Absent);
        assert_eq!(grade_for(csee, Some(120.0)), GradeOutcome::Invalid);
        assert_eq!(grade_for(csee, Some(-3.0)), GradeOutcome::Invalid);
    }

    #[test]
    fn csee_summary_totals_and_division() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        let subs = subjects(&["Mathematics", "English", "Physics"]);
        let rec = record(&[
            ("Mathematics", Some(85.0)),
            ("English", Some(78.0)),
            ("Physics", Some(65.0)),
        ]);
        let (results, summary) = summarize_student(csee, &rec, &subs, &[]);
        let grades: Vec<&str> = results.iter().map(|(_, r)| r.grade.as_str()).collect();
        assert_eq!(grades, vec!["A", "B", "B"]);
        assert_eq!(summary.total_marks, 228.0);
        assert_eq!(summary.average_mark, 76.0);
        assert_eq!(summary.points, Some(5.0));
        assert_eq!(summary.division.as_deref(), Some("I"));
        assert_eq!(summary.status, Status::Pass);
    }

    #[test]
    fn csee_division_zero_forces_fail_and_grade_f() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        // Nine failed subjects: 9 * 5 points = 45 > 35 cap.
        let names: Vec<String> = (0..9).map(|i| format!("S{}", i)).collect();
        let marks: Vec<(String, Option<f64>)> =
            names.iter().map(|n| (n.clone(), Some(10.0))).collect();
        let rec = StudentRecord {
            marks: marks.into_iter().collect(),
            ..record(&[])
        };
        let (_, summary) = summarize_student(csee, &rec, &names, &[]);
        assert_eq!(summary.division.as_deref(), Some("0"));
        assert_eq!(summary.status, Status::Fail);
        assert_eq!(summary.grade.as_deref(), Some("F"));
    }

    #[test]
    fn absent_subject_is_marked_not_graded() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        let subs = subjects(&["Mathematics", "English"]);
        let rec = record(&[("Mathematics", Some(50.0)), ("English", None)]);
        let (results, summary) = summarize_student(csee, &rec, &subs, &[]);
        assert_eq!(results[1].1.grade, "ABS");
        assert!(!results[1].1.attended);
        assert_eq!(summary.subjects_attended, 1);
        // Absent subject excluded from the average denominator.
        assert_eq!(summary.average_mark, 50.0);
        // But its points never leak into the division sum.
        assert_eq!(summary.points, Some(3.0));
    }

    #[test]
    fn zero_attended_subjects_yield_absent_status() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        let subs = subjects(&["Mathematics", "English"]);
        let rec = record(&[("Mathematics", None), ("English", None)]);
        let (_, summary) = summarize_student(csee, &rec, &subs, &[]);
        assert_eq!(summary.status, Status::Absent);
        assert_eq!(summary.total_marks, 0.0);
        assert_eq!(summary.average_mark, 0.0);
        assert!(summary.grade.is_none());
        assert!(summary.division.is_none());
    }

    #[test]
    fn acsee_single_attended_principal_fails_despite_points() {
        let book = RuleBook::load().expect("rule book");
        let acsee = book.get(SystemId::Acsee);
        let subs = subjects(&["Physics", "Chemistry", "Mathematics"]);
        let principals = subs.clone();
        // One excellent principal (1 point, division I range), two absences.
        let rec = record(&[
            ("Physics", Some(95.0)),
            ("Chemistry", None),
            ("Mathematics", None),
        ]);
        let (_, summary) = summarize_student(acsee, &rec, &subs, &principals);
        assert_eq!(summary.division.as_deref(), Some("0"));
        assert_eq!(summary.status, Status::Fail);
    }

    #[test]
    fn acsee_two_principal_passes_earn_a_division() {
        let book = RuleBook::load().expect("rule book");
        let acsee = book.get(SystemId::Acsee);
        let subs = subjects(&["Physics", "Chemistry", "Mathematics", "General Studies"]);
        let principals = subjects(&["Physics", "Chemistry", "Mathematics"]);
        let rec = record(&[
            ("Physics", Some(85.0)),     // A, 1 point
            ("Chemistry", Some(72.0)),   // B, 2 points
            ("Mathematics", Some(64.0)), // C, 3 points
            ("General Studies", Some(30.0)), // non-principal, ignored for points
        ]);
        let (_, summary) = summarize_student(acsee, &rec, &subs, &principals);
        assert_eq!(summary.points, Some(6.0));
        assert_eq!(summary.division.as_deref(), Some("I"));
        assert_eq!(summary.status, Status::Pass);
    }

    #[test]
    fn plse_fail_fraction_rule() {
        let book = RuleBook::load().expect("rule book");
        let plse = book.get(SystemId::Plse);
        let subs = subjects(&["A", "B", "C", "D"]);
        // 2 of 4 failed (50% > 40%) -> FAIL.
        let rec = record(&[
            ("A", Some(90.0)),
            ("B", Some(70.0)),
            ("C", Some(10.0)),
            ("D", Some(5.0)),
        ]);
        let (_, summary) = summarize_student(plse, &rec, &subs, &[]);
        assert_eq!(summary.status, Status::Fail);
        assert!(summary.division.is_none());

        // 1 of 4 failed (25%) -> PASS.
        let rec = record(&[
            ("A", Some(90.0)),
            ("B", Some(70.0)),
            ("C", Some(55.0)),
            ("D", Some(5.0)),
        ]);
        let (_, summary) = summarize_student(plse, &rec, &subs, &[]);
        assert_eq!(summary.status, Status::Pass);
    }

    #[test]
    fn nacte_reports_gpa_as_points() {
        let book = RuleBook::load().expect("rule book");
        let nacte = book.get(SystemId::Nacte);
        let subs = subjects(&["Module A", "Module B"]);
        let rec = record(&[("Module A", Some(80.0)), ("Module B", Some(67.0))]);
        let (results, summary) = summarize_student(nacte, &rec, &subs, &[]);
        assert_eq!(results[0].1.points, Some(4.0));
        assert_eq!(results[1].1.points, Some(3.0));
        assert_eq!(summary.points, Some(3.5));
        assert_eq!(summary.status, Status::Pass);
    }
}
