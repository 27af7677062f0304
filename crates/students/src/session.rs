//! Sessions: the unit of work.
//!
//! A session holds one transaction.  Inserts and bulk statements go to the store right away, inside that transaction.
//! Changes to students which were already loaded are staged instead, and only reach the store on [Session::flush] or
//! [Session::commit].  Queries never flush, so until then they see the store as it was.
//!
//! Dropping a session without committing rolls everything back, staged or not.
use std::collections::BTreeMap;

use log::*;
use roster_datastore::{Assignment, Database, Query, Transaction};

use crate::{database_descriptor, Error, Result, Student, TABLE};

/// Owns the in-memory database.
pub struct StudentStore {
    db: Database,
}

impl StudentStore {
    /// Create a fresh, empty store.  It goes away when dropped.
    pub fn open_in_memory() -> Result<StudentStore> {
        let db = Database::open_in_memory(database_descriptor()?)?;
        Ok(StudentStore { db })
    }

    /// Start a unit of work.  Only one can be open at a time.
    pub fn session(&mut self) -> Result<Session<'_>> {
        Ok(Session {
            transaction: self.db.transaction()?,
            pending: Default::default(),
        })
    }
}

#[derive(Debug)]
enum PendingChange {
    Update(Student),
    Delete,
}

pub struct Session<'a> {
    transaction: Transaction<'a>,
    /// Staged changes by student id.  The last change staged for a student wins.
    pending: BTreeMap<i64, PendingChange>,
}

fn persisted_id(student: &Student) -> Result<i64> {
    student.id.ok_or_else(|| Error::NotPersisted {
        name: student.name.clone(),
    })
}

impl<'a> Session<'a> {
    /// Insert students in one batch, writing the assigned ids back into them.
    ///
    /// If any of them is refused by the store, none are inserted and no ids are written.
    pub fn bulk_insert(&mut self, students: &mut [Student]) -> Result<()> {
        let ids = self.transaction.insert_rows(TABLE, &students[..])?;
        for (student, id) in students.iter_mut().zip(ids.into_iter()) {
            student.id = Some(id);
        }
        Ok(())
    }

    /// Insert one student, returning its new id.
    pub fn add(&mut self, student: &mut Student) -> Result<i64> {
        self.bulk_insert(std::slice::from_mut(student))?;
        persisted_id(student)
    }

    /// All students, in whatever order the store produces them.
    pub fn all(&self) -> Result<Vec<Student>> {
        self.fetch(&Student::query())
    }

    pub fn fetch(&self, query: &Query) -> Result<Vec<Student>> {
        Ok(self.transaction.fetch_all(query)?)
    }

    /// The first student matching the query, or `None`.
    pub fn first(&self, query: &Query) -> Result<Option<Student>> {
        Ok(self.transaction.fetch_first(query)?)
    }

    /// Only some columns.  One column comes back as values, e.g. `Vec<String>` for names; more come back as tuples.
    pub fn project<T: serde::de::DeserializeOwned>(
        &self,
        query: &Query,
        columns: &[&str],
    ) -> Result<Vec<T>> {
        Ok(self.transaction.project(query, columns)?)
    }

    /// How many students match, counted by the store.
    pub fn count(&self, query: &Query) -> Result<u64> {
        Ok(self.transaction.count(query)?)
    }

    /// Stage the current state of a loaded student to be written on the next flush.
    pub fn update(&mut self, student: &Student) -> Result<()> {
        let id = persisted_id(student)?;
        self.pending
            .insert(id, PendingChange::Update(student.clone()));
        Ok(())
    }

    /// Stage a loaded student for deletion on the next flush.
    pub fn delete(&mut self, student: &Student) -> Result<()> {
        let id = persisted_id(student)?;
        self.pending.insert(id, PendingChange::Delete);
        Ok(())
    }

    /// How many students have staged changes.
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    /// Write staged changes to the store.
    ///
    /// Updates go first, as one batch; if the store refuses any of them, none are written and everything stays
    /// staged.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut updates = vec![];
        let mut deletes = vec![];
        for (id, change) in self.pending.iter() {
            match change {
                PendingChange::Update(s) => updates.push(s.clone()),
                PendingChange::Delete => deletes.push(*id),
            }
        }

        self.transaction.update_rows(TABLE, &updates)?;
        self.transaction.delete_rows(TABLE, &deletes)?;
        debug!(
            "Flushed {} updates and {} deletes",
            updates.len(),
            deletes.len()
        );
        self.pending.clear();
        Ok(())
    }

    /// Apply assignments to every matching student inside the store, without loading any of them.  Returns how many
    /// matched.
    ///
    /// Students already loaded into memory keep their old values; query again to see the new ones.
    pub fn bulk_update(&mut self, query: &Query, assignments: &[Assignment]) -> Result<usize> {
        Ok(self.transaction.update_where(query, assignments)?)
    }

    /// Delete every matching student inside the store, without loading any of them.  Returns how many were deleted.
    pub fn bulk_delete(&mut self, query: &Query) -> Result<usize> {
        Ok(self.transaction.delete_where(query)?)
    }

    /// Flush, then commit.
    pub fn commit(mut self) -> Result<()> {
        self.flush()?;
        self.transaction.commit()?;
        Ok(())
    }

    /// Throw away staged changes and everything done in this session.
    pub fn rollback(self) -> Result<()> {
        if !self.pending.is_empty() {
            debug!("Discarding {} staged changes", self.pending.len());
        }
        self.transaction.rollback()?;
        Ok(())
    }
}
