//! Taking, reviewing and correcting attendance.
//!
//! A session starts as an [`AttendanceSheet`] with every student on the
//! roster marked present. Statuses are toggled in memory and the sheet is
//! persisted as a single record when saved.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use shared::{
    AttendanceEntry, AttendanceRecord, AttendanceRecordPatch, AttendanceStatus, ClassRoom,
    NewAttendanceRecord, SessionSummary,
};
use std::collections::HashMap;

use super::attendance_stats;
use crate::storage::{Entity, Repository, RepositoryError};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AttendanceValidationError {
    #[error("Student {0} is not part of this session")]
    StudentNotInSession(String),
}

/// Unsaved attendance for one session of a class
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSheet {
    class_id: String,
    class_name: String,
    entries: Vec<AttendanceEntry>,
}

impl AttendanceSheet {
    /// One entry per roster student, in roster order, all present
    pub fn for_class(class: &ClassRoom) -> Self {
        Self {
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            entries: class
                .students
                .iter()
                .map(|student| AttendanceEntry {
                    student_id: student.id.clone(),
                    student_name: student.name.clone(),
                    status: AttendanceStatus::Present,
                })
                .collect(),
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Name of the class when the session was started
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn entries(&self) -> &[AttendanceEntry] {
        &self.entries
    }

    /// Flip a student between present and absent, returning the new status
    pub fn toggle(&mut self, student_id: &str) -> Result<AttendanceStatus, AttendanceValidationError> {
        let entry = self.entry_mut(student_id)?;
        entry.status = entry.status.toggled();
        Ok(entry.status)
    }

    pub fn set_status(&mut self, student_id: &str, status: AttendanceStatus) -> Result<(), AttendanceValidationError> {
        self.entry_mut(student_id)?.status = status;
        Ok(())
    }

    pub fn summary(&self) -> SessionSummary {
        attendance_stats::summarize_entries(&self.entries)
    }

    fn entry_mut(&mut self, student_id: &str) -> Result<&mut AttendanceEntry, AttendanceValidationError> {
        self.entries
            .iter_mut()
            .find(|e| e.student_id == student_id)
            .ok_or_else(|| AttendanceValidationError::StudentNotInSession(student_id.to_string()))
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    repository: Repository,
}

impl AttendanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Begin a session for a class using its current roster
    pub async fn start_session(&self, class_id: &str) -> Result<AttendanceSheet> {
        let class = self
            .repository
            .get_class(class_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Entity::Class, class_id))?;
        Ok(AttendanceSheet::for_class(&class))
    }

    /// Persist a sheet as an attendance record dated `date`, under the
    /// class's name at the time of saving
    pub async fn save_session(&self, sheet: AttendanceSheet, date: DateTime<Utc>) -> Result<AttendanceRecord> {
        let summary = sheet.summary();
        let class_name = match self.repository.get_class(&sheet.class_id).await? {
            Some(class) => class.name,
            None => return Err(RepositoryError::not_found(Entity::Class, sheet.class_id).into()),
        };
        let record = self
            .repository
            .create_attendance_record(NewAttendanceRecord {
                class_id: sheet.class_id,
                class_name,
                date,
                attendance: sheet.entries,
            })
            .await
            .context("Failed to save attendance")?;

        info!(
            "Saved attendance {} for class {}: {} present, {} absent",
            record.id, record.class_id, summary.present, summary.absent
        );
        Ok(record)
    }

    /// Records for a class, most recent session first
    pub async fn history_for_class(&self, class_id: &str) -> Result<Vec<AttendanceRecord>> {
        let mut records = self
            .repository
            .list_attendance_for_class(class_id)
            .await
            .context("Failed to load attendance history")?;
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    pub async fn get_record(&self, record_id: &str) -> Result<AttendanceRecord> {
        Ok(self
            .repository
            .get_attendance_record(record_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Entity::AttendanceRecord, record_id))?)
    }

    /// Change statuses on a saved record.
    ///
    /// Students not mentioned in `statuses` keep their status. The record's
    /// whole entry list is replaced, with names and order preserved.
    pub async fn edit_record(
        &self,
        record_id: &str,
        statuses: &HashMap<String, AttendanceStatus>,
    ) -> Result<AttendanceRecord> {
        let updated = self
            .repository
            .patch_attendance_record_with(record_id, |record| {
                if let Some(unknown) = statuses.keys().find(|id| record.entry_for(id).is_none()) {
                    return Err(anyhow::Error::from(
                        AttendanceValidationError::StudentNotInSession(unknown.clone()),
                    ));
                }

                let attendance = record
                    .attendance
                    .iter()
                    .map(|entry| AttendanceEntry {
                        status: statuses.get(&entry.student_id).copied().unwrap_or(entry.status),
                        ..entry.clone()
                    })
                    .collect();
                Ok(AttendanceRecordPatch::attendance(attendance))
            })
            .await
            .context("Failed to update attendance")?;

        info!("Edited attendance record {}", record_id);
        Ok(updated)
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<()> {
        self.repository
            .delete_attendance_record(record_id)
            .await
            .context("Failed to delete attendance record")
    }

    pub async fn session_summary(&self, record_id: &str) -> Result<SessionSummary> {
        let record = self.get_record(record_id).await?;
        Ok(attendance_stats::session_summary(&record))
    }
}
