use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical subject order for marksheets and report cards.
pub const SUBJECTS: [&str; 6] = [
    "English",
    "Hindi",
    "Mathematics",
    "Science",
    "Social Science",
    "Sanskrit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExamCode {
    #[serde(rename = "PWT1")]
    Pwt1,
    #[serde(rename = "PWT2")]
    Pwt2,
    #[serde(rename = "PWT3")]
    Pwt3,
    #[serde(rename = "PWT4")]
    Pwt4,
    #[serde(rename = "HY")]
    Hy,
    #[serde(rename = "AN")]
    An,
}

impl ExamCode {
    pub const ALL: [ExamCode; 6] = [
        ExamCode::Pwt1,
        ExamCode::Pwt2,
        ExamCode::Pwt3,
        ExamCode::Pwt4,
        ExamCode::Hy,
        ExamCode::An,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PWT1" => Some(Self::Pwt1),
            "PWT2" => Some(Self::Pwt2),
            "PWT3" => Some(Self::Pwt3),
            "PWT4" => Some(Self::Pwt4),
            "HY" => Some(Self::Hy),
            "AN" => Some(Self::An),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pwt1 => "PWT1",
            Self::Pwt2 => "PWT2",
            Self::Pwt3 => "PWT3",
            Self::Pwt4 => "PWT4",
            Self::Hy => "HY",
            Self::An => "AN",
        }
    }

    pub fn max_marks(self) -> f64 {
        match self {
            Self::Pwt1 | Self::Pwt2 | Self::Pwt3 | Self::Pwt4 => 40.0,
            Self::Hy | Self::An => 100.0,
        }
    }

    /// Term this exam feeds into.
    pub fn term(self) -> Term {
        match self {
            Self::Pwt1 | Self::Pwt2 | Self::Hy => Term::Hy,
            Self::Pwt3 | Self::Pwt4 | Self::An => Term::An,
        }
    }

    /// The term whose final this exam *is*, if it is a term exam.
    pub fn as_term_exam(self) -> Option<Term> {
        match self {
            Self::Hy => Some(Term::Hy),
            Self::An => Some(Term::An),
            _ => None,
        }
    }
}

impl fmt::Display for ExamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    #[serde(rename = "HY")]
    Hy,
    #[serde(rename = "AN")]
    An,
}

impl Term {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HY" => Some(Self::Hy),
            "AN" => Some(Self::An),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hy => "HY",
            Self::An => "AN",
        }
    }

    pub fn exam(self) -> ExamCode {
        match self {
            Self::Hy => ExamCode::Hy,
            Self::An => ExamCode::An,
        }
    }

    /// Periodic tests whose best score feeds this term.
    pub fn periodic_pair(self) -> (ExamCode, ExamCode) {
        match self {
            Self::Hy => (ExamCode::Pwt1, ExamCode::Pwt2),
            Self::An => (ExamCode::Pwt3, ExamCode::Pwt4),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
    D,
    E,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::D => "D",
            Self::E => "E",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub roll: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoScholastic {
    pub ma: f64,
    pub se: f64,
    pub pf: f64,
}

impl CoScholastic {
    /// Component sum, non-finite components counting as 0.
    pub fn total(&self) -> f64 {
        num0(Some(self.ma)) + num0(Some(self.se)) + num0(Some(self.pf))
    }

    fn sanitized(self) -> Self {
        Self {
            ma: num0(Some(self.ma)),
            se: num0(Some(self.se)),
            pf: num0(Some(self.pf)),
        }
    }
}

/// Marks for one class and subject: `exam -> roll -> mark`.
/// `None` is an explicitly cleared cell; a missing roll is never-entered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectMarks(BTreeMap<ExamCode, BTreeMap<u32, Option<f64>>>);

impl SubjectMarks {
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, exam: ExamCode, roll: u32) -> Option<f64> {
        self.0.get(&exam).and_then(|m| m.get(&roll)).copied().flatten()
    }

    pub fn set(&mut self, exam: ExamCode, roll: u32, value: Option<f64>) {
        self.0.entry(exam).or_default().insert(roll, value);
    }
}

/// Co-scholastic entries for one class and subject, per term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectCoScholastic(BTreeMap<Term, CoScholastic>);

impl SubjectCoScholastic {
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Missing terms read as all-zero.
    pub fn term(&self, term: Term) -> CoScholastic {
        self.0.get(&term).copied().unwrap_or_default()
    }

    pub fn is_configured(&self, term: Term) -> bool {
        self.0.contains_key(&term)
    }

    pub fn set(&mut self, term: Term, co: CoScholastic) {
        self.0.insert(term, co);
    }
}

/// Everything the engine needs about one subject of one class.
#[derive(Debug, Clone, Copy)]
pub struct SubjectRecord<'a> {
    pub subject: &'a str,
    pub marks: &'a SubjectMarks,
    pub co_scholastic: &'a SubjectCoScholastic,
}

/// 1-decimal half-up rounding: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Absent or non-finite inputs count as 0.
pub fn num0(v: Option<f64>) -> f64 {
    match v {
        Some(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

pub fn best_periodic(periodic_a: Option<f64>, periodic_b: Option<f64>) -> f64 {
    num0(periodic_a).max(num0(periodic_b))
}

pub fn term_final(
    exam_raw: Option<f64>,
    periodic_a: Option<f64>,
    periodic_b: Option<f64>,
    co: CoScholastic,
) -> f64 {
    round_off_1_decimal(
        0.5 * num0(exam_raw) + 0.5 * best_periodic(periodic_a, periodic_b) + co.total(),
    )
}

pub fn overall_final(hy_final: f64, an_final: f64) -> f64 {
    round_off_1_decimal(0.4 * hy_final + 0.6 * an_final)
}

pub fn grade_from(percentage: f64) -> Grade {
    match percentage {
        p if p >= 91.0 => Grade::A1,
        p if p >= 81.0 => Grade::A2,
        p if p >= 71.0 => Grade::B1,
        p if p >= 61.0 => Grade::B2,
        p if p >= 51.0 => Grade::C1,
        p if p >= 41.0 => Grade::C2,
        p if p >= 33.0 => Grade::D,
        _ => Grade::E,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkEntryCheck {
    pub accepted: Option<f64>,
    pub in_range: bool,
}

/// Marks are accepted as entered; range problems are only flagged.
pub fn validate_mark_entry(value: Option<f64>, exam: ExamCode) -> MarkEntryCheck {
    match value {
        None => MarkEntryCheck {
            accepted: None,
            in_range: true,
        },
        Some(v) => MarkEntryCheck {
            accepted: Some(v),
            in_range: !(v < 0.0 || v > exam.max_marks()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermBreakdown {
    pub term: Term,
    pub exam_raw: f64,
    pub best_pt: f64,
    pub co_scholastic: CoScholastic,
    pub term_final: f64,
}

pub fn term_breakdown(
    marks: &SubjectMarks,
    co_scholastic: &SubjectCoScholastic,
    term: Term,
    roll: u32,
) -> TermBreakdown {
    let exam_raw = marks.get(term.exam(), roll);
    let (pa, pb) = term.periodic_pair();
    let (periodic_a, periodic_b) = (marks.get(pa, roll), marks.get(pb, roll));
    let co = co_scholastic.term(term).sanitized();
    TermBreakdown {
        term,
        exam_raw: num0(exam_raw),
        best_pt: best_periodic(periodic_a, periodic_b),
        co_scholastic: co,
        term_final: term_final(exam_raw, periodic_a, periodic_b, co),
    }
}

/// One marksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Roll(u32),
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn mark(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Roll(r) => write!(f, "{}", r),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Empty => Ok(()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Roll(r) => serializer.serialize_u32(*r),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Empty => serializer.serialize_str(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

fn sorted_by_roll(students: &[Student]) -> Vec<&Student> {
    let mut out: Vec<&Student> = students.iter().collect();
    out.sort_by_key(|s| s.roll);
    out
}

pub fn assemble_raw_sheet(students: &[Student], marks: &SubjectMarks) -> RowSet {
    let mut columns = vec!["Roll".to_string(), "Name".to_string()];
    columns.extend(ExamCode::ALL.iter().map(|e| e.as_str().to_string()));

    let rows = sorted_by_roll(students)
        .into_iter()
        .map(|s| {
            let mut row = vec![Cell::Roll(s.roll), Cell::Text(s.name.clone())];
            row.extend(ExamCode::ALL.iter().map(|&e| Cell::mark(marks.get(e, s.roll))));
            row
        })
        .collect();

    RowSet { columns, rows }
}

pub fn assemble_term_sheet(
    students: &[Student],
    marks: &SubjectMarks,
    co_scholastic: &SubjectCoScholastic,
    term: Term,
) -> RowSet {
    let columns = vec![
        "Roll".to_string(),
        "Name".to_string(),
        format!("{}Exam", term),
        "BestPT".to_string(),
        "MA".to_string(),
        "SE".to_string(),
        "PF".to_string(),
        format!("{}Final", term),
    ];

    let rows = sorted_by_roll(students)
        .into_iter()
        .map(|s| {
            let b = term_breakdown(marks, co_scholastic, term, s.roll);
            vec![
                Cell::Roll(s.roll),
                Cell::Text(s.name.clone()),
                Cell::Number(b.exam_raw),
                Cell::Number(b.best_pt),
                Cell::Number(b.co_scholastic.ma),
                Cell::Number(b.co_scholastic.se),
                Cell::Number(b.co_scholastic.pf),
                Cell::Number(b.term_final),
            ]
        })
        .collect();

    RowSet { columns, rows }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject: String,
    pub hy_final: f64,
    pub an_final: f64,
    pub overall_final: f64,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub roll: u32,
    pub name: String,
    pub subjects: Vec<SubjectResult>,
    pub total: f64,
    pub max_total: f64,
    pub percentage: f64,
    pub overall_grade: Grade,
}

/// Subjects are reported in the order given; callers pass them in
/// `SUBJECTS` order.
pub fn assemble_report_card(student: &Student, subjects: &[SubjectRecord<'_>]) -> ReportCard {
    let mut total = 0.0_f64;
    let mut results: Vec<SubjectResult> = Vec::with_capacity(subjects.len());

    for rec in subjects {
        let hy = term_breakdown(rec.marks, rec.co_scholastic, Term::Hy, student.roll).term_final;
        let an = term_breakdown(rec.marks, rec.co_scholastic, Term::An, student.roll).term_final;
        let overall = overall_final(hy, an);
        total += overall;
        results.push(SubjectResult {
            subject: rec.subject.to_string(),
            hy_final: hy,
            an_final: an,
            overall_final: overall,
            grade: grade_from(overall),
        });
    }

    let max_total = 100.0 * subjects.len() as f64;
    let percentage = if max_total > 0.0 {
        // Divide first; `100 * total / max` lands below .x5 ties.
        round_off_1_decimal((total / max_total) * 100.0)
    } else {
        0.0
    };

    ReportCard {
        roll: student.roll,
        name: student.name.clone(),
        subjects: results,
        total: round_off_1_decimal(total),
        max_total,
        percentage,
        overall_grade: grade_from(percentage),
    }
}
