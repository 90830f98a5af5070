use crate::ipc::error::ok;
use crate::ipc::helpers::{
    confirmed, required_class, required_roll, roll_value, store_error, workspace,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "classes": ws.store.class_names() }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({ "class": class, "students": ws.store.students(&class) }),
    )
}

fn handle_students_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roll = roll_value(req.params.get("roll")).unwrap_or(0);
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    let student = match ws.store.add_student(&class, roll, name) {
        Ok(s) => s,
        Err(e) => return store_error(req, e),
    };
    if let Err(e) = ws.persist(req) {
        return e;
    }
    tracing::info!(class = %class, roll = student.roll, "student added");
    ok(&req.id, json!({ "class": class, "student": student }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roll = match required_roll(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    let removed = ws.store.delete_student(&class, roll);
    if removed {
        if let Err(e) = ws.persist(req) {
            return e;
        }
        tracing::info!(class = %class, roll, "student deleted");
    }
    ok(&req.id, json!({ "removed": removed }))
}

fn handle_students_import_demo(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    ws.store.load_demo_roster();
    if let Err(e) = ws.persist(req) {
        return e;
    }
    ok(
        &req.id,
        json!({
            "classes": ws.store.class_names(),
            "message": "Demo students loaded for classes 6, 7, 8."
        }),
    )
}

fn handle_class_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let confirm = confirmed(req);
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    if let Err(e) = ws.store.clear_class(&class, |_| confirm) {
        return store_error(req, e);
    }
    if let Err(e) = ws.persist(req) {
        return e;
    }
    tracing::warn!(class = %class, "class cleared");
    ok(
        &req.id,
        json!({ "cleared": class, "message": format!("Cleared Class {}", class) }),
    )
}

fn handle_store_clear_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let confirm = confirmed(req);
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };
    if let Err(e) = ws.store.clear_all(|_| confirm) {
        return store_error(req, e);
    }
    if let Err(e) = ws.persist(req) {
        return e;
    }
    state.last_marksheets = None;
    tracing::warn!("all gradebook data cleared");
    ok(
        &req.id,
        json!({ "cleared": "all", "message": "All data cleared." }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "students.add" => Some(handle_students_add(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.importDemo" => Some(handle_students_import_demo(state, req)),
        "class.clear" => Some(handle_class_clear(state, req)),
        "store.clearAll" => Some(handle_store_clear_all(state, req)),
        _ => None,
    }
}
