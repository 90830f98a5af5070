use crate::calc::{ExamCode, SUBJECTS};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::{GradebookStore, StoreError};
use rusqlite::Connection;
use serde_json::{json, Value};

/// Open workspace: the connection and the store it backs.
pub struct Workspace<'a> {
    pub conn: &'a Connection,
    pub store: &'a mut GradebookStore,
}

impl Workspace<'_> {
    pub fn persist(&self, req: &Request) -> Result<(), Value> {
        self.store.persist(self.conn).map_err(|e| {
            tracing::error!(error = %e, "failed to persist store");
            err(&req.id, "db_update_failed", e.to_string(), None)
        })
    }
}

pub fn workspace<'a>(state: &'a mut AppState, req: &Request) -> Result<Workspace<'a>, Value> {
    match (state.db.as_ref(), state.store.as_mut()) {
        (Some(conn), Some(store)) => Ok(Workspace { conn, store }),
        _ => Err(err(&req.id, "no_workspace", "select a workspace first", None)),
    }
}

pub fn store_error(req: &Request, e: StoreError) -> Value {
    err(&req.id, e.code, e.message, None)
}

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Class names are strings, but UIs often send them as numbers.
pub fn required_class(req: &Request) -> Result<String, Value> {
    match req.params.get("class") {
        Some(Value::Number(n)) => {
            let whole = n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            });
            Ok(whole.map(|c| c.to_string()).unwrap_or_else(|| n.to_string()))
        }
        _ => required_str(req, "class"),
    }
}

pub fn required_subject(req: &Request) -> Result<String, Value> {
    let subject = required_str(req, "subject")?;
    if !SUBJECTS.contains(&subject.as_str()) {
        return Err(err(
            &req.id,
            "bad_params",
            "unknown subject",
            Some(json!({ "subject": subject, "subjects": SUBJECTS })),
        ));
    }
    Ok(subject)
}

pub fn required_exam(req: &Request) -> Result<ExamCode, Value> {
    let raw = required_str(req, "exam")?;
    ExamCode::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "exam must be one of: PWT1, PWT2, PWT3, PWT4, HY, AN",
            Some(json!({ "exam": raw })),
        )
    })
}

/// Roll as sent by the client; range checks are left to the caller.
pub fn roll_value(v: Option<&Value>) -> Option<i64> {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn required_roll(req: &Request) -> Result<u32, Value> {
    roll_value(req.params.get("roll"))
        .filter(|r| *r > 0 && *r <= u32::MAX as i64)
        .map(|r| r as u32)
        .ok_or_else(|| err(&req.id, "bad_params", "roll must be a positive integer", None))
}

/// Grid cell input: blank, null and non-numeric text are "no mark".
pub fn mark_value(v: Option<&Value>) -> Option<f64> {
    match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Co-scholastic component: anything unusable counts as 0.
pub fn number_or_zero(v: Option<&Value>) -> f64 {
    crate::calc::num0(mark_value(v))
}

pub fn confirmed(req: &Request) -> bool {
    req.params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_value_treats_blank_and_garbage_as_no_mark() {
        assert_eq!(mark_value(None), None);
        assert_eq!(mark_value(Some(&Value::Null)), None);
        assert_eq!(mark_value(Some(&json!(""))), None);
        assert_eq!(mark_value(Some(&json!("abc"))), None);
        assert_eq!(mark_value(Some(&json!(" 35 "))), Some(35.0));
        assert_eq!(mark_value(Some(&json!(41.5))), Some(41.5));
    }

    fn req_with(params: Value) -> Request {
        Request {
            id: "1".to_string(),
            method: "students.list".to_string(),
            params,
        }
    }

    #[test]
    fn numeric_class_maps_to_its_string_key() {
        assert_eq!(required_class(&req_with(json!({ "class": 6 }))).ok(), Some("6".to_string()));
        assert_eq!(required_class(&req_with(json!({ "class": 6.0 }))).ok(), Some("6".to_string()));
        assert_eq!(required_class(&req_with(json!({ "class": " 7 " }))).ok(), Some("7".to_string()));
        assert_eq!(
            required_class(&req_with(json!({ "class": 6.5 }))).ok(),
            Some("6.5".to_string())
        );
        assert!(required_class(&req_with(json!({}))).is_err());
    }

    #[test]
    fn roll_value_accepts_numeric_strings() {
        assert_eq!(roll_value(Some(&json!(3))), Some(3));
        assert_eq!(roll_value(Some(&json!(3.0))), Some(3));
        assert_eq!(roll_value(Some(&json!("12"))), Some(12));
        assert_eq!(roll_value(Some(&json!(2.5))), None);
        assert_eq!(roll_value(Some(&json!(true))), None);
    }
}
