use crate::calc::{
    self, CoScholastic, ExamCode, Student, SubjectCoScholastic, SubjectMarks, SubjectRecord, Term,
};
use crate::db;
use anyhow::Context;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub const STUDENTS_KEY: &str = "studentsByClass";
pub const MARKS_KEY: &str = "marks";
pub const COSCHOL_KEY: &str = "coschol";

pub const DEFAULT_CLASSES: [&str; 3] = ["6", "7", "8"];

static EMPTY_MARKS: SubjectMarks = SubjectMarks::new();
static EMPTY_CO: SubjectCoScholastic = SubjectCoScholastic::new();

#[derive(Debug, Clone)]
pub struct StoreError {
    pub code: &'static str,
    pub message: String,
}

impl StoreError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSaveSummary {
    pub count: usize,
    pub out_of_range: Vec<u32>,
    pub max: f64,
}

impl GridSaveSummary {
    pub fn all_in_range(&self) -> bool {
        self.out_of_range.is_empty()
    }

    pub fn message(&self) -> String {
        if self.all_in_range() {
            format!("Saved marks for {} entries.", self.count)
        } else {
            format!("Saved with warnings (values must be 0–{}).", self.max)
        }
    }
}

/// Students, marks and co-scholastic entries for every class.
#[derive(Debug, Clone, PartialEq)]
pub struct GradebookStore {
    students_by_class: BTreeMap<String, Vec<Student>>,
    marks: BTreeMap<String, BTreeMap<String, SubjectMarks>>,
    co_scholastic: BTreeMap<String, BTreeMap<String, SubjectCoScholastic>>,
}

impl Default for GradebookStore {
    fn default() -> Self {
        Self {
            students_by_class: default_rosters(),
            marks: BTreeMap::new(),
            co_scholastic: BTreeMap::new(),
        }
    }
}

fn default_rosters() -> BTreeMap<String, Vec<Student>> {
    DEFAULT_CLASSES
        .iter()
        .map(|c| (c.to_string(), Vec::new()))
        .collect()
}

fn demo_rosters() -> BTreeMap<String, Vec<Student>> {
    let demo: [(&str, [&str; 3]); 3] = [
        ("6", ["Aarav", "Anaya", "Kabir"]),
        ("7", ["Rohit", "Sana", "Iqra"]),
        ("8", ["Kunal", "Meera", "Arnav"]),
    ];
    demo.iter()
        .map(|(class, names)| {
            let students = names
                .iter()
                .enumerate()
                .map(|(i, n)| Student {
                    roll: i as u32 + 1,
                    name: n.to_string(),
                })
                .collect();
            (class.to_string(), students)
        })
        .collect()
}

fn load_record<T: DeserializeOwned>(conn: &Connection, key: &str) -> anyhow::Result<Option<T>> {
    let value = match db::record_get_json(conn, key) {
        Ok(Some(v)) => v,
        Ok(None) => return Ok(None),
        Err(e) => {
            tracing::warn!(record = key, error = %format!("{e:#}"), "unreadable record, using defaults");
            return Ok(None);
        }
    };
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(record = key, error = %e, "malformed record, using defaults");
            Ok(None)
        }
    }
}

fn save_record<T: Serialize>(conn: &Connection, key: &str, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_value(value).with_context(|| format!("failed to encode {}", key))?;
    db::record_set_json(conn, key, &json)
}

impl GradebookStore {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let store = Self {
            students_by_class: load_record(conn, STUDENTS_KEY)?
                .unwrap_or(defaults.students_by_class),
            marks: load_record(conn, MARKS_KEY)?.unwrap_or(defaults.marks),
            co_scholastic: load_record(conn, COSCHOL_KEY)?.unwrap_or(defaults.co_scholastic),
        };
        tracing::debug!(classes = store.students_by_class.len(), "store loaded");
        Ok(store)
    }

    /// Writes all three records in one transaction.
    pub fn persist(&self, conn: &Connection) -> anyhow::Result<()> {
        let tx = conn.unchecked_transaction()?;
        save_record(&tx, STUDENTS_KEY, &self.students_by_class)?;
        save_record(&tx, MARKS_KEY, &self.marks)?;
        save_record(&tx, COSCHOL_KEY, &self.co_scholastic)?;
        tx.commit().context("failed to commit store records")?;
        Ok(())
    }

    pub fn class_names(&self) -> Vec<String> {
        self.students_by_class.keys().cloned().collect()
    }

    /// Roster sorted by roll.
    pub fn students(&self, class: &str) -> Vec<Student> {
        let mut list = self
            .students_by_class
            .get(class)
            .cloned()
            .unwrap_or_default();
        list.sort_by_key(|s| s.roll);
        list
    }

    pub fn find_student(&self, class: &str, roll: u32) -> Option<&Student> {
        self.students_by_class
            .get(class)
            .and_then(|list| list.iter().find(|s| s.roll == roll))
    }

    pub fn add_student(&mut self, class: &str, roll: i64, name: &str) -> Result<Student, StoreError> {
        let name = name.trim();
        if roll <= 0 || roll > u32::MAX as i64 || name.is_empty() {
            return Err(StoreError::new("bad_params", "Please fill Roll and Name"));
        }
        let roll = roll as u32;
        let list = self.students_by_class.entry(class.to_string()).or_default();
        if list.iter().any(|s| s.roll == roll) {
            return Err(StoreError::new(
                "duplicate_roll",
                "Roll already exists in this class",
            ));
        }
        let student = Student {
            roll,
            name: name.to_string(),
        };
        list.push(student.clone());
        Ok(student)
    }

    /// Roster only; marks recorded under the roll are kept.
    pub fn delete_student(&mut self, class: &str, roll: u32) -> bool {
        let Some(list) = self.students_by_class.get_mut(class) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.roll != roll);
        list.len() != before
    }

    pub fn load_demo_roster(&mut self) {
        self.students_by_class = demo_rosters();
    }

    pub fn clear_class<F>(&mut self, class: &str, confirm: F) -> Result<(), StoreError>
    where
        F: FnOnce(&str) -> bool,
    {
        let prompt = format!("Delete ALL students & marks of Class {}?", class);
        if !confirm(&prompt) {
            return Err(StoreError::new("confirmation_declined", prompt));
        }
        self.students_by_class.insert(class.to_string(), Vec::new());
        self.marks.remove(class);
        self.co_scholastic.remove(class);
        Ok(())
    }

    pub fn clear_all<F>(&mut self, confirm: F) -> Result<(), StoreError>
    where
        F: FnOnce(&str) -> bool,
    {
        let prompt = "Delete ALL data (students, marks, coschol)?";
        if !confirm(prompt) {
            return Err(StoreError::new("confirmation_declined", prompt));
        }
        *self = Self::default();
        Ok(())
    }

    pub fn subject_marks(&self, class: &str, subject: &str) -> &SubjectMarks {
        self.marks
            .get(class)
            .and_then(|m| m.get(subject))
            .unwrap_or(&EMPTY_MARKS)
    }

    pub fn subject_co_scholastic(&self, class: &str, subject: &str) -> &SubjectCoScholastic {
        self.co_scholastic
            .get(class)
            .and_then(|m| m.get(subject))
            .unwrap_or(&EMPTY_CO)
    }

    pub fn subject_record<'a>(&'a self, class: &str, subject: &'a str) -> SubjectRecord<'a> {
        SubjectRecord {
            subject,
            marks: self.subject_marks(class, subject),
            co_scholastic: self.subject_co_scholastic(class, subject),
        }
    }

    /// Entries outside `0..=max` are stored and reported, never rejected.
    pub fn save_mark_grid(
        &mut self,
        class: &str,
        subject: &str,
        exam: ExamCode,
        entries: &[(u32, Option<f64>)],
    ) -> GridSaveSummary {
        let marks = self
            .marks
            .entry(class.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default();
        let mut out_of_range = Vec::new();
        for &(roll, value) in entries {
            let check = calc::validate_mark_entry(value, exam);
            if !check.in_range {
                out_of_range.push(roll);
            }
            marks.set(exam, roll, check.accepted);
        }
        GridSaveSummary {
            count: entries.len(),
            out_of_range,
            max: exam.max_marks(),
        }
    }

    pub fn set_co_scholastic(&mut self, class: &str, subject: &str, term: Term, co: CoScholastic) {
        self.co_scholastic
            .entry(class.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default()
            .set(term, co);
    }
}
