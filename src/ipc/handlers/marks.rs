use crate::calc::{self, CoScholastic, Term};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    mark_value, number_or_zero, required_class, required_exam, required_subject, roll_value,
    workspace,
};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn co_json(term: Term, co: CoScholastic, configured: bool) -> Value {
    json!({
        "term": term,
        "ma": co.ma,
        "se": co.se,
        "pf": co.pf,
        "configured": configured,
    })
}

fn handle_grid_open(state: &mut AppState, req: &Request) -> Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_subject(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam = match required_exam(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };

    let max = exam.max_marks();
    let marks = ws.store.subject_marks(&class, &subject);
    let rows: Vec<Value> = ws
        .store
        .students(&class)
        .into_iter()
        .map(|s| {
            json!({
                "roll": s.roll,
                "name": s.name,
                "value": marks.get(exam, s.roll),
            })
        })
        .collect();

    let term = exam.term();
    let co_scholastic = exam.as_term_exam().map(|t| {
        let co = ws.store.subject_co_scholastic(&class, &subject);
        co_json(t, co.term(t), co.is_configured(t))
    });

    ok(
        &req.id,
        json!({
            "title": format!("Class {} — {} — {} (Max {})", class, subject, exam, max),
            "class": class,
            "subject": subject,
            "exam": exam,
            "term": term,
            "max": max,
            "rows": rows,
            "coScholastic": co_scholastic,
        }),
    )
}

fn handle_grid_save(state: &mut AppState, req: &Request) -> Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_subject(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam = match required_exam(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(raw_entries) = req.params.get("entries").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "entries must be an array", None);
    };

    let mut entries: Vec<(u32, Option<f64>)> = Vec::with_capacity(raw_entries.len());
    for (i, entry) in raw_entries.iter().enumerate() {
        let roll = roll_value(entry.get("roll")).filter(|r| *r > 0 && *r <= u32::MAX as i64);
        let Some(roll) = roll else {
            return err(
                &req.id,
                "bad_params",
                "entry roll must be a positive integer",
                Some(json!({ "index": i })),
            );
        };
        entries.push((roll as u32, mark_value(entry.get("value"))));
    }

    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    let summary = ws.store.save_mark_grid(&class, &subject, exam, &entries);
    if let Err(e) = ws.persist(req) {
        return e;
    }
    if summary.all_in_range() {
        tracing::info!(class = %class, subject = %subject, exam = %exam, count = summary.count, "marks saved");
    } else {
        tracing::warn!(
            class = %class,
            subject = %subject,
            exam = %exam,
            out_of_range = ?summary.out_of_range,
            "marks saved with out-of-range entries"
        );
    }

    ok(
        &req.id,
        json!({
            "count": summary.count,
            "allInRange": summary.all_in_range(),
            "outOfRange": summary.out_of_range,
            "max": summary.max,
            "message": summary.message(),
        }),
    )
}

fn handle_co_scholastic_save(state: &mut AppState, req: &Request) -> Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_subject(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Either an explicit term, or the exam currently open in the grid.
    let term = match req.params.get("term").and_then(|v| v.as_str()) {
        Some(raw) => match Term::parse(raw) {
            Some(t) => t,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "term must be HY or AN",
                    Some(json!({ "term": raw })),
                )
            }
        },
        None => match required_exam(req) {
            Ok(exam) => exam.term(),
            Err(e) => return e,
        },
    };
    let co = CoScholastic {
        ma: number_or_zero(req.params.get("ma")),
        se: number_or_zero(req.params.get("se")),
        pf: number_or_zero(req.params.get("pf")),
    };

    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    ws.store.set_co_scholastic(&class, &subject, term, co);
    if let Err(e) = ws.persist(req) {
        return e;
    }
    tracing::info!(class = %class, subject = %subject, term = %term, "co-scholastic saved");
    ok(
        &req.id,
        json!({
            "coScholastic": co_json(term, co, true),
            "message": "Co-Scholastic saved for this subject & term."
        }),
    )
}

fn handle_term_finals(state: &mut AppState, req: &Request) -> Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_subject(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam = match required_exam(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(term) = exam.as_term_exam() else {
        return err(
            &req.id,
            "bad_params",
            "Switch Exam to HY or AN to compute term final.",
            Some(json!({ "exam": exam })),
        );
    };
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };

    let rec = ws.store.subject_record(&class, &subject);
    let students: Vec<Value> = ws
        .store
        .students(&class)
        .into_iter()
        .map(|s| {
            let b = calc::term_breakdown(rec.marks, rec.co_scholastic, term, s.roll);
            json!({
                "roll": s.roll,
                "name": s.name,
                "examRaw": b.exam_raw,
                "bestPt": b.best_pt,
                "ma": b.co_scholastic.ma,
                "se": b.co_scholastic.se,
                "pf": b.co_scholastic.pf,
                "termFinal": b.term_final,
                "grade": calc::grade_from(b.term_final),
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "class": class,
            "subject": subject,
            "term": term,
            "students": students,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "marks.gridOpen" => Some(handle_grid_open(state, req)),
        "marks.gridSave" => Some(handle_grid_save(state, req)),
        "coScholastic.save" => Some(handle_co_scholastic_save(state, req)),
        "calc.termFinals" => Some(handle_term_finals(state, req)),
        _ => None,
    }
}

