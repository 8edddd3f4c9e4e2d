use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Columns that describe the student rather than a subject.
const STUDENT_INFO_COLUMNS: [&str; 8] = [
    "admission_no",
    "student_id",
    "full_name",
    "gender",
    "class",
    "stream",
    "remarks",
    "subjects",
];

/// Positional spreadsheet columns with no header land here and are ignored.
const UNNAMED_SENTINEL: &str = "__unnamed__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Unknown => "UNKNOWN",
        }
    }
}

impl Serialize for Gender {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Canonical cleaned row. Immutable for the rest of the processing run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub admission_no: String,
    pub student_id: String,
    pub full_name: String,
    pub gender: Gender,
    pub class_name: String,
    pub stream: String,
    pub remarks: String,
    #[serde(skip)]
    pub marks: HashMap<String, Option<f64>>,
}

impl StudentRecord {
    pub fn mark(&self, subject: &str) -> Option<f64> {
        self.marks.get(subject).copied().flatten()
    }
}

/// Non-fatal defect in one input row. Processing continues past these.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl RowError {
    fn new(row: usize, field: &str, message: impl Into<String>) -> RowError {
        RowError {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Output of normalization: cleaned records, the subject column list in
/// first-seen order, and every row-level error encountered along the way.
#[derive(Debug, Clone)]
pub struct NormalizedClass {
    pub records: Vec<StudentRecord>,
    pub subjects: Vec<String>,
    pub errors: Vec<RowError>,
}

/// Lowercase, collapse separator runs to a single underscore, and map
/// headerless positional columns to a sentinel. Only the spreadsheet
/// `Unnamed: N` shape is positional; a real subject named "Unnamed Arts"
/// stays a subject.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.starts_with("unnamed:") {
        return UNNAMED_SENTINEL.to_string();
    }
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

fn is_student_info(column: &str) -> bool {
    STUDENT_INFO_COLUMNS.contains(&column)
}

fn field_as_string(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_gender(value: Option<&serde_json::Value>) -> Result<Gender, String> {
    let raw = field_as_string(value);
    if raw.is_empty() {
        return Err("missing gender".to_string());
    }
    match raw.to_lowercase().as_str() {
        "m" | "male" => Ok(Gender::Male),
        "f" | "female" => Ok(Gender::Female),
        other => Err(format!("unrecognized gender: {}", other)),
    }
}

/// Marks come in as JSON numbers or numeric strings. `null`/missing means
/// absent. Anything else, or a value outside [0,100], is a row error and is
/// treated as absent so the rest of the row still computes.
fn parse_mark(value: Option<&serde_json::Value>) -> Result<Option<f64>, String> {
    let mark = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(v) => v,
            None => return Err("mark is not a finite number".to_string()),
        },
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(v) => v,
                Err(_) => return Err(format!("unparseable mark: {}", trimmed)),
            }
        }
        Some(other) => return Err(format!("unparseable mark: {}", other)),
    };
    if !(0.0..=100.0).contains(&mark) {
        return Err(format!("mark {} out of range (0-100)", mark));
    }
    Ok(Some(mark))
}

/// Remap a raw row to normalized column names. Flat subject columns get
/// header normalization; names inside a nested `subjects` object are kept
/// verbatim apart from trimming, since the JSON upload path already names
/// subjects deliberately.
fn normalized_columns(row: &serde_json::Map<String, serde_json::Value>) -> HashMap<String, serde_json::Value> {
    let mut out = HashMap::new();
    for (key, value) in row {
        let column = normalize_header(key);
        if column.is_empty() || column == UNNAMED_SENTINEL {
            continue;
        }
        out.insert(column, value.clone());
    }
    out
}

fn subject_marks_for_row(
    row_num: usize,
    columns: &HashMap<String, serde_json::Value>,
    errors: &mut Vec<RowError>,
) -> Vec<(String, Option<f64>)> {
    let mut marks: Vec<(String, Option<f64>)> = Vec::new();

    if let Some(serde_json::Value::Object(nested)) = columns.get("subjects") {
        for (subject, value) in nested {
            let name = subject.trim().to_string();
            if name.is_empty() {
                continue;
            }
            match parse_mark(Some(value)) {
                Ok(mark) => marks.push((name, mark)),
                Err(msg) => {
                    errors.push(RowError::new(row_num, &name, msg));
                    marks.push((name, None));
                }
            }
        }
        return marks;
    }

    let mut flat: Vec<(&String, &serde_json::Value)> = columns
        .iter()
        .filter(|(column, _)| !is_student_info(column))
        .collect();
    // HashMap iteration order is arbitrary; keep inference deterministic.
    flat.sort_by(|a, b| a.0.cmp(b.0));
    for (subject, value) in flat {
        match parse_mark(Some(value)) {
            Ok(mark) => marks.push((subject.clone(), mark)),
            Err(msg) => {
                errors.push(RowError::new(row_num, subject, msg));
                marks.push((subject.clone(), None));
            }
        }
    }
    marks
}

/// Clean a batch of loosely-typed rows into [`StudentRecord`]s.
///
/// `declared_subjects` fixes the subject column set (marks for undeclared
/// columns are dropped); when `None` the set is inferred from the rows in
/// first-seen order. Rows lacking both admission number and student id are
/// blank template rows and are dropped without an error.
pub fn normalize_rows(
    rows: &[serde_json::Value],
    declared_subjects: Option<&[String]>,
) -> NormalizedClass {
    let mut errors: Vec<RowError> = Vec::new();
    // Dedupe the declared list up front; a repeated column name would
    // otherwise serialize as duplicate object keys downstream.
    let mut subjects: Vec<String> = Vec::new();
    let mut seen_subjects: HashSet<String> = HashSet::new();
    for subject in declared_subjects.unwrap_or_default() {
        if seen_subjects.insert(subject.clone()) {
            subjects.push(subject.clone());
        }
    }
    let mut seen_admissions: HashSet<String> = HashSet::new();
    let mut records: Vec<StudentRecord> = Vec::new();

    for (idx, raw) in rows.iter().enumerate() {
        let row_num = idx + 1;
        let Some(obj) = raw.as_object() else {
            errors.push(RowError::new(row_num, "row", "row is not an object"));
            continue;
        };
        let columns = normalized_columns(obj);

        let admission_no = field_as_string(columns.get("admission_no"));
        let student_id = field_as_string(columns.get("student_id"));
        if admission_no.is_empty() && student_id.is_empty() {
            // Blank template row.
            continue;
        }

        let key = if admission_no.is_empty() {
            student_id.clone()
        } else {
            admission_no.clone()
        };
        if !seen_admissions.insert(key.clone()) {
            errors.push(
                RowError::new(row_num, "admission_no", format!("duplicate admission number: {}", key)),
            );
            continue;
        }

        let gender = match parse_gender(columns.get("gender")) {
            Ok(g) => g,
            Err(msg) => {
                errors.push(RowError::new(row_num, "gender", msg));
                Gender::Unknown
            }
        };

        let row_marks = subject_marks_for_row(row_num, &columns, &mut errors);
        let mut marks: HashMap<String, Option<f64>> = HashMap::new();
        for (subject, mark) in row_marks {
            if declared_subjects.is_some() {
                if !seen_subjects.contains(&subject) {
                    continue;
                }
            } else if seen_subjects.insert(subject.clone()) {
                subjects.push(subject.clone());
            }
            marks.insert(subject, mark);
        }

        records.push(StudentRecord {
            admission_no,
            student_id,
            full_name: field_as_string(columns.get("full_name")),
            gender,
            class_name: field_as_string(columns.get("class")),
            stream: field_as_string(columns.get("stream")),
            remarks: field_as_string(columns.get("remarks")),
            marks,
        });
    }

    // Every record answers for every subject column, absent where unstated.
    for record in &mut records {
        for subject in &subjects {
            record.marks.entry(subject.clone()).or_insert(None);
        }
    }

    NormalizedClass {
        records,
        subjects,
        errors,
    }
}
