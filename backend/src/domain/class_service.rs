//! Class and roster management.
//!
//! ## Business Rules
//!
//! - A class needs a non-blank name and at least one student
//! - Rosters are entered one student per line; blank lines are ignored
//! - Students added to an existing class get a roll number `R{n}`, where `n`
//!   is their position in the roster
//! - Deleting a class deletes its attendance history

use anyhow::{Context, Result};
use log::info;
use shared::{ClassPatch, ClassRoom, Student};

use crate::storage::{Entity, Repository, RepositoryError};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ClassValidationError {
    #[error("Class name cannot be empty")]
    EmptyName,
    #[error("A class needs at least one student")]
    NoStudents,
    #[error("Student name cannot be empty")]
    EmptyStudentName,
    #[error("Student {0} is not on this class's roster")]
    UnknownStudent(String),
}

/// Split newline-delimited roster input into trimmed, non-empty names
pub fn parse_roster(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct ClassService {
    repository: Repository,
}

impl ClassService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_classes(&self) -> Result<Vec<ClassRoom>> {
        self.repository
            .list_classes()
            .await
            .context("Failed to load classes")
    }

    pub async fn get_class(&self, class_id: &str) -> Result<ClassRoom> {
        self.repository
            .get_class(class_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(Entity::Class, class_id).into())
    }

    /// Create a class from a name and newline-delimited roster text
    pub async fn create_class(&self, name: &str, roster_text: &str) -> Result<ClassRoom> {
        self.create_class_from_names(name, parse_roster(roster_text))
            .await
    }

    pub async fn create_class_from_names(&self, name: &str, student_names: Vec<String>) -> Result<ClassRoom> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassValidationError::EmptyName.into());
        }

        let student_names: Vec<String> = student_names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if student_names.is_empty() {
            return Err(ClassValidationError::NoStudents.into());
        }

        let class = self
            .repository
            .create_class(name, student_names)
            .await
            .context("Failed to add class")?;
        Ok(class)
    }

    pub async fn rename_class(&self, class_id: &str, name: &str) -> Result<ClassRoom> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassValidationError::EmptyName.into());
        }

        Ok(self
            .repository
            .update_class(class_id, ClassPatch::name(name))
            .await?)
    }

    /// Append a student to an existing class and return them
    pub async fn add_student(&self, class_id: &str, name: &str) -> Result<Student> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassValidationError::EmptyStudentName.into());
        }

        let student_id = Repository::generate_id();
        let class = self
            .repository
            .patch_class_with(class_id, |current| {
                let mut students = current.students.clone();
                students.push(Student {
                    id: student_id.clone(),
                    name: name.to_string(),
                    roll_number: Some(format!("R{}", current.students.len() + 1)),
                });
                Ok::<_, anyhow::Error>(ClassPatch::students(students))
            })
            .await
            .context("Failed to add student")?;

        info!("Added student {} to class {}", student_id, class_id);
        class
            .find_student(&student_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Student {} missing after insert", student_id))
    }

    /// Remove a student from the roster. Their past attendance entries are kept.
    pub async fn remove_student(&self, class_id: &str, student_id: &str) -> Result<ClassRoom> {
        let class = self
            .repository
            .patch_class_with(class_id, |current| {
                if current.find_student(student_id).is_none() {
                    return Err(anyhow::Error::from(ClassValidationError::UnknownStudent(
                        student_id.to_string(),
                    )));
                }
                Ok::<_, anyhow::Error>(ClassPatch::students(
                    current
                        .students
                        .iter()
                        .filter(|s| s.id != student_id)
                        .cloned()
                        .collect(),
                ))
            })
            .await
            .context("Failed to delete student")?;

        info!("Removed student {} from class {}", student_id, class_id);
        Ok(class)
    }

    /// Delete a class and its attendance history.
    /// Returns how many attendance records went with it.
    pub async fn delete_class(&self, class_id: &str) -> Result<usize> {
        Ok(self.repository.delete_class(class_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::yielding_repository;
    use crate::storage::{JsonStore, MemoryBackend};
    use std::sync::Arc;

    fn setup_service() -> ClassService {
        let store = JsonStore::new(Arc::new(MemoryBackend::new()));
        ClassService::new(Repository::new(store))
    }

    fn validation_error(err: &anyhow::Error) -> Option<&ClassValidationError> {
        err.downcast_ref::<ClassValidationError>()
    }

    #[test]
    fn test_parse_roster_trims_and_skips_blank_lines() {
        let names = parse_roster("  Ada Lovelace \n\n Grace Hopper\r\n   \nLinus");
        assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper", "Linus"]);
        assert!(parse_roster(" \n \n").is_empty());
    }

    #[tokio::test]
    async fn test_create_class_from_roster_text() {
        let service = setup_service();

        let class = service
            .create_class("  CS101 ", "Ada\nGrace\n")
            .await
            .expect("Failed to create class");

        assert_eq!(class.name, "CS101");
        let names: Vec<_> = class.students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
        assert_eq!(service.list_classes().await.unwrap(), vec![class]);
    }

    #[tokio::test]
    async fn test_create_class_validation() {
        let service = setup_service();

        let err = service.create_class("   ", "Ada").await.unwrap_err();
        assert_eq!(validation_error(&err), Some(&ClassValidationError::EmptyName));

        let err = service.create_class("CS101", "\n  \n").await.unwrap_err();
        assert_eq!(validation_error(&err), Some(&ClassValidationError::NoStudents));

        let err = service
            .create_class_from_names("CS101", vec!["  ".to_string()])
            .await
            .unwrap_err();
        assert_eq!(validation_error(&err), Some(&ClassValidationError::NoStudents));

        assert!(service.list_classes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_student_assigns_roll_number() {
        let service = setup_service();
        let class = service.create_class("CS101", "Ada\nGrace").await.unwrap();

        let student = service.add_student(&class.id, " Linus ").await.expect("Failed to add student");

        assert_eq!(student.name, "Linus");
        assert_eq!(student.roll_number.as_deref(), Some("R3"));

        let stored = service.get_class(&class.id).await.unwrap();
        assert_eq!(stored.students.len(), 3);
        assert_eq!(stored.students[2], student);
    }

    #[tokio::test]
    async fn test_add_student_validation_and_unknown_class() {
        let service = setup_service();
        let class = service.create_class("CS101", "Ada").await.unwrap();

        let err = service.add_student(&class.id, "  ").await.unwrap_err();
        assert_eq!(validation_error(&err), Some(&ClassValidationError::EmptyStudentName));

        let err = service.add_student("missing", "Linus").await.unwrap_err();
        let repo_err = err.downcast_ref::<RepositoryError>().expect("repository error");
        assert!(repo_err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_student_additions_are_all_kept() {
        let service = ClassService::new(yielding_repository());
        let class = service.create_class("CS101", "Ada").await.unwrap();

        let (first, second) = tokio::join!(
            service.add_student(&class.id, "Grace"),
            service.add_student(&class.id, "Linus"),
        );
        first.unwrap();
        second.unwrap();

        let stored = service.get_class(&class.id).await.unwrap();
        assert_eq!(stored.students.len(), 3);
        let mut rolls: Vec<_> = stored.students[1..]
            .iter()
            .map(|s| s.roll_number.clone().unwrap())
            .collect();
        rolls.sort();
        assert_eq!(rolls, vec!["R2", "R3"]);
    }

    #[tokio::test]
    async fn test_remove_student() {
        let service = setup_service();
        let class = service.create_class("CS101", "Ada\nGrace").await.unwrap();
        let ada = class.students[0].clone();

        let updated = service.remove_student(&class.id, &ada.id).await.expect("Failed to remove student");

        assert_eq!(updated.students.len(), 1);
        assert_eq!(updated.students[0].name, "Grace");

        let err = service.remove_student(&class.id, &ada.id).await.unwrap_err();
        assert_eq!(
            validation_error(&err),
            Some(&ClassValidationError::UnknownStudent(ada.id.clone()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_removals_of_same_student() {
        let service = ClassService::new(yielding_repository());
        let class = service.create_class("CS101", "Ada\nGrace").await.unwrap();
        let ada = class.students[0].id.clone();

        let (first, second) = tokio::join!(
            service.remove_student(&class.id, &ada),
            service.remove_student(&class.id, &ada),
        );

        // Exactly one call removes Ada, the other finds her already gone
        let (ok, err) = match (first, second) {
            (Ok(class), Err(err)) | (Err(err), Ok(class)) => (class, err),
            (first, second) => panic!("expected one success, got {:?} and {:?}", first, second),
        };
        assert_eq!(ok.students.len(), 1);
        assert_eq!(
            validation_error(&err),
            Some(&ClassValidationError::UnknownStudent(ada.clone()))
        );
        assert_eq!(service.get_class(&class.id).await.unwrap().students.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_and_delete_class() {
        let service = setup_service();
        let class = service.create_class("CS101", "Ada").await.unwrap();

        let renamed = service.rename_class(&class.id, "CS102").await.unwrap();
        assert_eq!(renamed.name, "CS102");
        assert_eq!(renamed.students, class.students);

        assert_eq!(service.delete_class(&class.id).await.unwrap(), 0);
        assert!(service.get_class(&class.id).await.is_err());
    }
}
