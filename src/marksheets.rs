use crate::calc::{self, CoScholastic, RowSet, Term, SUBJECTS};
use crate::store::GradebookStore;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarksheetKind {
    Raw,
    TermFinal(Term),
}

impl MarksheetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RAW" => Some(Self::Raw),
            "HYFINAL" => Some(Self::TermFinal(Term::Hy)),
            "ANFINAL" => Some(Self::TermFinal(Term::An)),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::TermFinal(Term::Hy) => "HYFINAL",
            Self::TermFinal(Term::An) => "ANFINAL",
        }
    }

    pub fn heading(self, class: &str) -> String {
        match self {
            Self::Raw => format!("Class {} — Raw Exam Marks", class),
            Self::TermFinal(term) => format!("Class {} — {} Final (100)", class, term),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetBlock {
    pub title: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co_scholastic: Option<CoScholastic>,
    pub sheet: RowSet,
}

/// One block per subject, in canonical subject order.
pub fn assemble_class_marksheets(
    store: &GradebookStore,
    class: &str,
    kind: MarksheetKind,
) -> Vec<SheetBlock> {
    let students = store.students(class);
    SUBJECTS
        .iter()
        .map(|&subject| {
            let rec = store.subject_record(class, subject);
            match kind {
                MarksheetKind::Raw => SheetBlock {
                    title: format!("{} (Raw)", subject),
                    subject: subject.to_string(),
                    co_scholastic: None,
                    sheet: calc::assemble_raw_sheet(&students, rec.marks),
                },
                MarksheetKind::TermFinal(term) => SheetBlock {
                    title: format!("{} ({} Final)", subject, term),
                    subject: subject.to_string(),
                    co_scholastic: Some(rec.co_scholastic.term(term)),
                    sheet: calc::assemble_term_sheet(&students, rec.marks, rec.co_scholastic, term),
                },
            }
        })
        .collect()
}
