use crate::model::Student;
use crate::store::{Failure, Store, classify};
use eyre::{Context, Error, ensure};
use std::io::Read;
use tracing::{debug, info, instrument};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ImportReport {
    pub inserted: usize,
    /// Rows whose roll number already exists in their group.
    pub skipped: usize,
    /// Rows without a roll number or a student name.
    pub blank: usize,
}

/// Read students from CSV and insert them. A student already present in
/// the same group is skipped, it does not abort the import. Rows lacking a
/// roll number or a name are left out.
#[instrument(skip_all)]
pub async fn import_students<R: Read>(store: &Store, input: R) -> Result<ImportReport, Error> {
    let students = read_students(input)?;
    let mut report = ImportReport::default();
    let mut trans = store.pool().begin().await?;
    for student in &students {
        if student.roll_no.trim().is_empty() || student.student_name.trim().is_empty() {
            debug!(group = %student.group_name, "row without roll number or name");
            report.blank += 1;
            continue;
        }
        let result = sqlx::query(
            "INSERT INTO students (
                roll_no, student_name, father_name, student_email, group_name,
                gender, father_mobile, student_mobile, mode_new
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(student.roll_no.trim())
        .bind(&student.student_name)
        .bind(&student.father_name)
        .bind(&student.student_email)
        .bind(student.group_name.trim())
        .bind(&student.gender)
        .bind(&student.father_mobile)
        .bind(&student.student_mobile)
        .bind(&student.mode_new)
        .execute(&mut *trans)
        .await;
        match result {
            Ok(_) => report.inserted += 1,
            Err(err) if classify(&err) == Failure::UniqueViolation => {
                debug!(student = %student, group = %student.group_name, "student already present");
                report.skipped += 1;
            }
            Err(err) => return Err(err).context("cannot insert student"),
        }
    }
    trans
        .commit()
        .await
        .context("error when committing transaction")?;
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        blank = report.blank,
        "students imported"
    );
    Ok(report)
}

fn read_students<R: Read>(input: R) -> Result<Vec<Student>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    let headers = reader.headers().context("cannot read CSV header")?.clone();
    let missing = Student::COLUMNS
        .iter()
        .copied()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .collect::<Vec<_>>();
    ensure!(
        missing.is_empty(),
        "incorrect file format, missing columns {} (required columns: {})",
        missing.join(", "),
        Student::COLUMNS.join(", ")
    );
    reader
        .deserialize::<Student>()
        .enumerate()
        .map(|(n, record)| record.with_context(|| format!("invalid record on line {}", n + 2)))
        .collect()
}
