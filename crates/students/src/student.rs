use roster_datastore::{DatabaseDescriptor, DatabaseDescriptorBuilder, Query, Timestamp};

/// The table students live in.
pub const TABLE: &str = "students";

/// Column names, for building queries.
pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const GRADE: &str = "grade";
    pub const BIRTHDAY: &str = "birthday";
    pub const ENROLLED_DATE: &str = "enrolled_date";
}

pub const MIN_GRADE: i64 = 1;
pub const MAX_GRADE: i64 = 12;
pub const MAX_EMAIL_LENGTH: u32 = 55;

/// A student.
///
/// Nothing here is checked: the store enforces the unique email, the grade range, and the email length when the
/// student is written.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Student {
    /// Assigned by the store on first insert.  `None` until then.
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: Timestamp,
    /// Filled in by the store with the insert time when left as `None`.  Students loaded from the store always have
    /// one.
    pub enrolled_date: Option<Timestamp>,
}

impl Student {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: Timestamp,
    ) -> Student {
        Student {
            id: None,
            name: name.into(),
            email: email.into(),
            grade,
            birthday,
            enrolled_date: None,
        }
    }

    /// A query over every student, to be narrowed with filters, ordering, and limits.
    pub fn query() -> Query {
        Query::table(TABLE)
    }
}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Student {}: {}, Grade {}", id, self.name, self.grade),
            None => write!(f, "Student (unsaved): {}, Grade {}", self.name, self.grade),
        }
    }
}

/// Add the students table to a database descriptor.
pub fn build_descriptor(builder: &mut DatabaseDescriptorBuilder) -> roster_datastore::Result<()> {
    builder.add_table(TABLE.into(), |tb| {
        tb.add_key_column(columns::ID.into(), "id_pk".into())?;
        tb.add_string_column(columns::NAME.into(), false)?;
        tb.add_string_column(columns::EMAIL.into(), false)?;
        tb.add_integer_column(columns::GRADE.into(), false)?;
        tb.add_timestamp_column(columns::BIRTHDAY.into(), false)?;
        tb.add_timestamp_column(columns::ENROLLED_DATE.into(), false)?;
        tb.set_insert_time_default(columns::ENROLLED_DATE)?;

        tb.add_unique_constraint("unique_email".into(), columns::EMAIL.into())?;
        tb.add_max_length_constraint(
            "email_max_length".into(),
            columns::EMAIL.into(),
            MAX_EMAIL_LENGTH,
        )?;
        tb.add_range_constraint(
            "grade_between_1_and_12".into(),
            columns::GRADE.into(),
            MIN_GRADE,
            MAX_GRADE,
        )?;

        tb.add_index("index_name".into(), vec![columns::NAME.into()])?;
        Ok(())
    })
}

/// A descriptor for a database holding only students.
pub fn database_descriptor() -> roster_datastore::Result<DatabaseDescriptor> {
    let mut builder = DatabaseDescriptorBuilder::new();
    build_descriptor(&mut builder)?;
    builder.build()
}
