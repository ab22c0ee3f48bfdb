//! # Repository
//!
//! Typed CRUD over the `classes` and `attendance` collections.
//!
//! Every mutation is a full read-modify-write of the affected collection,
//! performed while holding that collection's writer lock. Unknown ids are
//! reported as [`RepositoryError::NotFound`] and never cause a write.
//!
//! ## Cascading delete
//!
//! Deleting a class also deletes its attendance records. The backend has no
//! multi-key transactions, so the two writes are ordered to fail safe:
//!
//! 1. the attendance collection is rewritten without the class's records;
//! 2. the classes collection is rewritten without the class.
//!
//! If step 2 fails the old attendance collection is written back. A class
//! may therefore briefly lose its records, but records never outlive their
//! class.

use chrono::Utc;
use log::{debug, error, info, warn};
use shared::{
    AttendanceRecord, AttendanceRecordPatch, ClassPatch, ClassRoom, NewAttendanceRecord, Student,
};
use uuid::Uuid;

use super::error::{Entity, RepositoryError};
use super::store::{Collection, JsonStore};

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Clone)]
pub struct Repository {
    store: JsonStore,
}

impl Repository {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Fresh identifier for a class, student or record
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn list_classes(&self) -> Result<Vec<ClassRoom>> {
        Ok(self.store.read_collection(Collection::Classes).await?)
    }

    pub async fn get_class(&self, class_id: &str) -> Result<Option<ClassRoom>> {
        let classes = self.list_classes().await?;
        Ok(classes.into_iter().find(|c| c.id == class_id))
    }

    /// Create a class whose roster is built from `student_names`, in order
    pub async fn create_class(&self, name: &str, student_names: Vec<String>) -> Result<ClassRoom> {
        let _guard = self.store.lock(Collection::Classes).await;
        let mut classes: Vec<ClassRoom> = self.store.read_collection(Collection::Classes).await?;

        let class = ClassRoom {
            id: Self::generate_id(),
            name: name.to_string(),
            students: student_names
                .into_iter()
                .map(|student_name| Student {
                    id: Self::generate_id(),
                    name: student_name,
                    roll_number: None,
                })
                .collect(),
            created_at: Utc::now(),
        };

        classes.push(class.clone());
        self.store.write_collection(Collection::Classes, &classes).await?;

        info!(
            "Created class {} ({}) with {} students",
            class.id,
            class.name,
            class.students.len()
        );
        Ok(class)
    }

    /// Overwrite the fields present in `patch` and return the updated class
    pub async fn update_class(&self, class_id: &str, patch: ClassPatch) -> Result<ClassRoom> {
        self.patch_class_with(class_id, |_| Ok::<_, RepositoryError>(patch))
            .await
    }

    /// Build a patch from the class as currently stored and apply it, all
    /// under the classes writer lock. Use this when the new value depends on
    /// the old one, such as appending to a roster.
    ///
    /// If `build_patch` fails nothing is written and its error is returned.
    pub async fn patch_class_with<F, E>(&self, class_id: &str, build_patch: F) -> std::result::Result<ClassRoom, E>
    where
        F: FnOnce(&ClassRoom) -> std::result::Result<ClassPatch, E>,
        E: From<RepositoryError>,
    {
        let _guard = self.store.lock(Collection::Classes).await;
        let mut classes: Vec<ClassRoom> = self
            .store
            .read_collection(Collection::Classes)
            .await
            .map_err(RepositoryError::from)?;

        let class = classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| RepositoryError::not_found(Entity::Class, class_id))?;

        build_patch(class)?.apply(class);
        let updated = class.clone();

        self.store
            .write_collection(Collection::Classes, &classes)
            .await
            .map_err(RepositoryError::from)?;

        debug!("Updated class {}", class_id);
        Ok(updated)
    }

    /// Delete a class and every attendance record that references it.
    /// Returns the number of attendance records removed.
    pub async fn delete_class(&self, class_id: &str) -> Result<usize> {
        let _classes_guard = self.store.lock(Collection::Classes).await;
        let _attendance_guard = self.store.lock(Collection::Attendance).await;

        let classes: Vec<ClassRoom> = self.store.read_collection(Collection::Classes).await?;
        if !classes.iter().any(|c| c.id == class_id) {
            return Err(RepositoryError::not_found(Entity::Class, class_id));
        }

        let attendance: Vec<AttendanceRecord> =
            self.store.read_collection(Collection::Attendance).await?;
        let kept: Vec<&AttendanceRecord> = attendance
            .iter()
            .filter(|r| r.class_id != class_id)
            .collect();
        let removed = attendance.len() - kept.len();

        if removed > 0 {
            self.store.write_collection(Collection::Attendance, &kept).await?;
        }

        let remaining: Vec<&ClassRoom> = classes.iter().filter(|c| c.id != class_id).collect();
        if let Err(e) = self.store.write_collection(Collection::Classes, &remaining).await {
            if removed == 0 {
                return Err(e.into());
            }

            warn!(
                "Failed to remove class {} after removing its attendance, restoring {} records",
                class_id, removed
            );
            return match self.store.write_collection(Collection::Attendance, &attendance).await {
                Ok(()) => Err(e.into()),
                Err(restore_error) => {
                    error!(
                        "Could not restore attendance for class {}: {}",
                        class_id, restore_error
                    );
                    Err(RepositoryError::PartialCascade {
                        class_id: class_id.to_string(),
                        source: e,
                    })
                }
            };
        }

        info!("Deleted class {} and {} attendance records", class_id, removed);
        Ok(removed)
    }

    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>> {
        Ok(self.store.read_collection(Collection::Attendance).await?)
    }

    /// Records for one class, in storage order
    pub async fn list_attendance_for_class(&self, class_id: &str) -> Result<Vec<AttendanceRecord>> {
        let attendance = self.list_attendance().await?;
        Ok(attendance
            .into_iter()
            .filter(|r| r.class_id == class_id)
            .collect())
    }

    pub async fn get_attendance_record(&self, record_id: &str) -> Result<Option<AttendanceRecord>> {
        let attendance = self.list_attendance().await?;
        Ok(attendance.into_iter().find(|r| r.id == record_id))
    }

    /// Persist a new record. The class it refers to must exist.
    pub async fn create_attendance_record(&self, record: NewAttendanceRecord) -> Result<AttendanceRecord> {
        // Held so the class cannot be deleted between the check and the write
        let _classes_guard = self.store.lock(Collection::Classes).await;
        let classes: Vec<ClassRoom> = self.store.read_collection(Collection::Classes).await?;
        if !classes.iter().any(|c| c.id == record.class_id) {
            return Err(RepositoryError::not_found(Entity::Class, record.class_id));
        }

        let _attendance_guard = self.store.lock(Collection::Attendance).await;
        let mut attendance: Vec<AttendanceRecord> =
            self.store.read_collection(Collection::Attendance).await?;

        let created = AttendanceRecord {
            id: Self::generate_id(),
            class_id: record.class_id,
            class_name: record.class_name,
            date: record.date,
            attendance: record.attendance,
            timestamp: Utc::now(),
        };

        attendance.push(created.clone());
        self.store.write_collection(Collection::Attendance, &attendance).await?;

        info!(
            "Stored attendance record {} for class {} ({} entries)",
            created.id,
            created.class_id,
            created.attendance.len()
        );
        Ok(created)
    }

    pub async fn update_attendance_record(
        &self,
        record_id: &str,
        patch: AttendanceRecordPatch,
    ) -> Result<AttendanceRecord> {
        self.patch_attendance_record_with(record_id, |_| Ok::<_, RepositoryError>(patch))
            .await
    }

    /// Attendance counterpart of [`patch_class_with`](Self::patch_class_with):
    /// read, patch and write happen under the attendance writer lock.
    pub async fn patch_attendance_record_with<F, E>(
        &self,
        record_id: &str,
        build_patch: F,
    ) -> std::result::Result<AttendanceRecord, E>
    where
        F: FnOnce(&AttendanceRecord) -> std::result::Result<AttendanceRecordPatch, E>,
        E: From<RepositoryError>,
    {
        let _guard = self.store.lock(Collection::Attendance).await;
        let mut attendance: Vec<AttendanceRecord> = self
            .store
            .read_collection(Collection::Attendance)
            .await
            .map_err(RepositoryError::from)?;

        let record = attendance
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| RepositoryError::not_found(Entity::AttendanceRecord, record_id))?;

        build_patch(record)?.apply(record);
        let updated = record.clone();

        self.store
            .write_collection(Collection::Attendance, &attendance)
            .await
            .map_err(RepositoryError::from)?;

        debug!("Updated attendance record {}", record_id);
        Ok(updated)
    }

    pub async fn delete_attendance_record(&self, record_id: &str) -> Result<()> {
        let _guard = self.store.lock(Collection::Attendance).await;
        let attendance: Vec<AttendanceRecord> =
            self.store.read_collection(Collection::Attendance).await?;

        let kept: Vec<&AttendanceRecord> = attendance.iter().filter(|r| r.id != record_id).collect();
        if kept.len() == attendance.len() {
            return Err(RepositoryError::not_found(Entity::AttendanceRecord, record_id));
        }

        self.store.write_collection(Collection::Attendance, &kept).await?;

        info!("Deleted attendance record {}", record_id);
        Ok(())
    }
}
