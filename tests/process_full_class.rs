
use serde_json::json;
use test_support::{request_ok, spawn_sidecar};

fn sample_params() -> serde_json::Value {
    json!({
        "system": "csee",
        "subjects": ["Mathematics", "English", "Physics"],
        "externalIds": { "examId": "EX-2024-1", "classId": "CL-4E" },
        "rows": [
            {
                "admission_no": "ADM001", "student_id": "STU001",
                "full_name": "JOHN MWAMBA", "gender": "M",
                "class": "FORM 4", "stream": "EAST",
                "subjects": { "Mathematics": 85, "English": 78, "Physics": 65 }
            },
            {
                "admission_no": "ADM002", "student_id": "STU002",
                "full_name": "SARAH JUMANNE", "gender": "F",
                "class": "FORM 4", "stream": "EAST",
                "subjects": { "Mathematics": 72, "English": 88, "Physics": 91 }
            }
        ]
    })
}

#[test]
fn csee_sample_scenario_end_to_end() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let result = request_ok(&mut stdin, &mut reader, "1", "marks.process", sample_params());

    let students = result["students"].as_array().expect("students");
    assert_eq!(students.len(), 2);

    let s1 = &students[0];
    assert_eq!(s1["subjects"]["Mathematics"]["grade"], "A");
    assert_eq!(s1["subjects"]["English"]["grade"], "B");
    assert_eq!(s1["subjects"]["Physics"]["grade"], "B");
    assert_eq!(s1["summary"]["totalMarks"], 228.0);
    assert_eq!(s1["summary"]["averageMark"], 76.0);
    assert_eq!(s1["summary"]["classRank"], 2);
    assert_eq!(s1["summary"]["status"], "PASS");

    let s2 = &students[1];
    assert_eq!(s2["subjects"]["Mathematics"]["grade"], "B");
    assert_eq!(s2["subjects"]["English"]["grade"], "A");
    assert_eq!(s2["subjects"]["Physics"]["grade"], "A");
    assert_eq!(s2["summary"]["totalMarks"], 251.0);
    assert_eq!(s2["summary"]["averageMark"], 83.67);
    assert_eq!(s2["summary"]["classRank"], 1);

    assert_eq!(result["classAnalytics"]["overview"]["average"], 79.83);
    assert_eq!(result["externalIds"]["examId"], "EX-2024-1");
    assert_eq!(result["errors"].as_array().map(|a| a.len()), Some(0));
}

#[test]
fn processing_twice_is_byte_identical() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let first = request_ok(&mut stdin, &mut reader, "1", "marks.process", sample_params());
    let second = request_ok(&mut stdin, &mut reader, "2", "marks.process", sample_params());
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );
}

#[test]
fn bad_rows_produce_embedded_errors_not_failure() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let mut params = sample_params();
    params["rows"].as_array_mut().expect("rows").push(json!({
        "admission_no": "ADM003", "student_id": "STU003",
        "full_name": "BROKEN ROW", "gender": "yes",
        "subjects": { "Mathematics": "not a number", "English": 130, "Physics": 55 }
    }));

    let result = request_ok(&mut stdin, &mut reader, "1", "marks.process", params);
    let students = result["students"].as_array().expect("students");
    assert_eq!(students.len(), 3);

    // The broken row still computes from its one good mark.
    let s3 = &students[2];
    assert_eq!(s3["student"]["gender"], "UNKNOWN");
    assert_eq!(s3["subjects"]["Mathematics"]["grade"], "ABS");
    assert_eq!(s3["subjects"]["Physics"]["grade"], "C");
    assert_eq!(s3["summary"]["subjectsAttended"], 1);

    let errors = result["errors"].as_array().expect("errors");
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|e| e["row"] == 3));
}

#[test]
fn blank_template_rows_are_ignored() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let mut params = sample_params();
    params["rows"].as_array_mut().expect("rows").push(json!({
        "admission_no": "", "student_id": "", "full_name": "", "gender": "",
        "subjects": {}
    }));
    let result = request_ok(&mut stdin, &mut reader, "1", "marks.process", params);
    assert_eq!(result["students"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(result["errors"].as_array().map(|a| a.len()), Some(0));
}

#[test]
fn acsee_principal_rules_apply_over_ipc() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let params = json!({
        "system": "acsee",
        "subjects": ["Physics", "Chemistry", "Mathematics"],
        "principalSubjects": ["Physics", "Chemistry", "Mathematics"],
        "rows": [
            {
                "admission_no": "ADM010", "student_id": "STU010",
                "full_name": "ONE PRINCIPAL ONLY", "gender": "F",
                "subjects": { "Physics": 95, "Chemistry": null, "Mathematics": null }
            },
            {
                "admission_no": "ADM011", "student_id": "STU011",
                "full_name": "FULL SET", "gender": "M",
                "subjects": { "Physics": 85, "Chemistry": 72, "Mathematics": 64 }
            }
        ]
    });
    let result = request_ok(&mut stdin, &mut reader, "1", "marks.process", params);
    let students = result["students"].as_array().expect("students");

    // One attended principal: forced FAIL, division 0, points ignored.
    assert_eq!(students[0]["summary"]["division"], "0");
    assert_eq!(students[0]["summary"]["status"], "FAIL");

    // Three passing principals: 1 + 2 + 3 points = Division I.
    assert_eq!(students[1]["summary"]["points"], 6.0);
    assert_eq!(students[1]["summary"]["division"], "I");
    assert_eq!(students[1]["summary"]["status"], "PASS");
}
