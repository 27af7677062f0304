//! Walks through the student record store: insert two students, query them a few different ways, update them, and
//! delete one.  Each step prints what it got.
use anyhow::{Context, Result};
use log::*;

use roster_datastore::{Assignment, Direction, Expr, Predicate, Timestamp};
use roster_students::{columns, Student, StudentStore};

/// Render students the way a list of them reads: `[Student 1: ..., Student 2: ...]`.
fn show(students: &[Student]) -> String {
    let inner = students
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

fn main() -> Result<()> {
    roster_logging::log_to_stderr();
    let mut store = StudentStore::open_in_memory()?;
    info!("Store is up");

    let mut new_students = [
        Student::new(
            "Albert Einstein",
            "albert.einstein@zurich.edu",
            6,
            Timestamp::from_ymd(1879, 3, 14)?,
        ),
        Student::new(
            "Alan Turing",
            "alan.turing@sherborne.edu",
            11,
            Timestamp::from_ymd(1912, 6, 23)?,
        ),
    ];

    let mut session = store.session()?;
    session.bulk_insert(&mut new_students)?;
    session.commit()?;
    for student in new_students.iter() {
        let id = student.id.context("Inserted students should have ids")?;
        println!("New student ID is {}.", id);
    }

    let mut session = store.session()?;

    // Everything, as the store returns it.
    let students = session.all()?;
    println!("{}", show(&students));
    for student in students.iter() {
        println!("{}", student);
    }

    // One column.
    let names: Vec<String> = session.project(&Student::query(), &[columns::NAME])?;
    println!("{:?}", names);

    let by_name: Vec<String> = session.project(
        &Student::query().order_by(columns::NAME, Direction::Ascending),
        &[columns::NAME],
    )?;
    println!("{:?}", by_name);

    let by_grade_desc: Vec<(String, i64)> = session.project(
        &Student::query().order_by(columns::GRADE, Direction::Descending),
        &[columns::NAME, columns::GRADE],
    )?;
    println!("{:?}", by_grade_desc);

    // The oldest student: sort by birthday and keep one.
    let oldest_query = Student::query().order_by(columns::BIRTHDAY, Direction::Ascending);
    let oldest: Vec<(String, Timestamp)> = session.project(
        &oldest_query.clone().limit(1),
        &[columns::NAME, columns::BIRTHDAY],
    )?;
    for (name, birthday) in oldest.iter() {
        println!("[({:?}, {})]", name, birthday);
    }

    match session.first(&oldest_query)? {
        Some(s) => println!("({:?}, {})", s.name, s.birthday),
        None => println!("None"),
    }

    println!("Student count: {}", session.count(&Student::query())?);

    let query = Student::query()
        .filter(Predicate::like(columns::NAME, "%Alan%"))
        .filter(Predicate::eq(columns::GRADE, 11));
    for student in session.fetch(&query)? {
        println!("{}", student.name);
    }

    // Load, change, stage, commit.
    for mut student in session.all()? {
        student.grade += 1;
        session.update(&student)?;
    }
    session.commit()?;

    let name_and_grade = Student::query().order_by(columns::ID, Direction::Ascending);
    let name_and_grade_columns = [columns::NAME, columns::GRADE];

    let mut session = store.session()?;
    let grades: Vec<(String, i64)> = session.project(&name_and_grade, &name_and_grade_columns)?;
    println!("{:?}", grades);

    // The same kind of change, without loading anything.
    session.bulk_update(
        &Student::query(),
        &[Assignment::new(
            columns::GRADE,
            Expr::column(columns::GRADE).sub(1),
        )],
    )?;
    let grades: Vec<(String, i64)> = session.project(&name_and_grade, &name_and_grade_columns)?;
    println!("{:?}", grades);
    session.commit()?;

    // Delete through the session.
    let einstein = Student::query().filter(Predicate::eq(columns::NAME, "Albert Einstein"));
    let mut session = store.session()?;
    if let Some(albert) = session.first(&einstein)? {
        session.delete(&albert)?;
    }
    session.commit()?;

    let mut session = store.session()?;
    println!("{:?}", session.first(&einstein)?);

    // Delete in the store.
    let removed = session.bulk_delete(&einstein)?;
    println!("Removed {} students.", removed);
    println!("{:?}", session.first(&einstein)?);
    session.commit()?;

    info!("Done");
    Ok(())
}
