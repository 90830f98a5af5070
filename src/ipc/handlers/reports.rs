use crate::calc::{self, SubjectRecord, SUBJECTS};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_class, required_roll, workspace};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

use super::setup::{load_section, SetupSection};

fn handle_report_card(state: &mut AppState, req: &Request) -> Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roll = match required_roll(req) {
        Ok(v) => v,
        Err(e) => {
            // A blank/zero roll is just a roll nobody has.
            if req.params.get("roll").is_some() {
                return err(
                    &req.id,
                    "not_found",
                    format!("Student not found in Class {}.", class),
                    Some(json!({ "class": class, "roll": req.params.get("roll") })),
                );
            }
            return e;
        }
    };
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };

    let Some(student) = ws.store.find_student(&class, roll) else {
        return err(
            &req.id,
            "not_found",
            format!("Student not found in Class {}.", class),
            Some(json!({ "class": class, "roll": roll })),
        );
    };

    let records: Vec<SubjectRecord<'_>> = SUBJECTS
        .iter()
        .map(|&subject| ws.store.subject_record(&class, subject))
        .collect();
    let card = calc::assemble_report_card(student, &records);

    let school = match load_section(ws.conn, SetupSection::School) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let reports = match load_section(ws.conn, SetupSection::Reports) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let signatures: Vec<Value> = if reports["showSignatureLines"].as_bool().unwrap_or(true) {
        vec![
            reports["teacherLabel"].clone(),
            reports["principalLabel"].clone(),
            json!("Date"),
        ]
    } else {
        Vec::new()
    };

    ok(
        &req.id,
        json!({
            "school": school,
            "class": class,
            "card": card,
            "signatures": signatures,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "reports.reportCard" => Some(handle_report_card(state, req)),
        _ => None,
    }
}
