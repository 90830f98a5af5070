use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_class, required_str, workspace};
use crate::ipc::types::{AppState, Request};
use crate::marksheets::{self, MarksheetKind};
use serde_json::{json, Value};
use std::path::PathBuf;

const TERM_FORMULA: &str = "0.5×Exam + 0.5×Best PWT + MA+SE+PF";

fn handle_render(state: &mut AppState, req: &Request) -> Value {
    let class = match required_class(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let raw_kind = match required_str(req, "type") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(kind) = MarksheetKind::parse(&raw_kind) else {
        return err(
            &req.id,
            "bad_params",
            "type must be one of: RAW, HYFINAL, ANFINAL",
            Some(json!({ "type": raw_kind })),
        );
    };
    let ws = match workspace(state, req) {
        Ok(ws) => ws,
        Err(e) => return e,
    };

    // An empty class leaves the previous render exportable.
    if ws.store.students(&class).is_empty() {
        return ok(
            &req.id,
            json!({
                "class": class,
                "type": kind.as_str(),
                "blocks": [],
                "message": format!("No students in Class {}.", class),
            }),
        );
    }

    let blocks = marksheets::assemble_class_marksheets(ws.store, &class, kind);
    let formula = match kind {
        MarksheetKind::Raw => None,
        MarksheetKind::TermFinal(_) => Some(TERM_FORMULA),
    };
    let result = json!({
        "class": class,
        "type": kind.as_str(),
        "heading": kind.heading(&class),
        "formula": formula,
        "blocks": blocks,
    });
    state.last_marksheets = Some(blocks);
    ok(&req.id, result)
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> Value {
    let out_dir = match required_str(req, "outDir") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let blocks = match state.last_marksheets.as_deref() {
        Some(b) if !b.is_empty() => b,
        _ => return err(&req.id, "nothing_rendered", "Render a marksheet first.", None),
    };

    match export::write_marksheets_csv(&out_dir, blocks) {
        Ok(path) => ok(
            &req.id,
            json!({
                "path": path.to_string_lossy(),
                "blocks": blocks.len(),
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "outDir": out_dir.to_string_lossy() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "marksheets.render" => Some(handle_render(state, req)),
        "marksheets.exportCsv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
