use crate::directory::StudentDirectory;
use crate::model::{ChildLink, Student};

/// Students linked to the parent being onboarded. Ids are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildLinks {
    links: Vec<ChildLink>,
}

impl ChildLinks {
    pub fn from_links(links: Vec<ChildLink>) -> Self {
        let mut out = Self::default();
        for link in links {
            if !out.contains(&link.student_id) {
                out.links.push(link);
            }
        }
        out
    }

    pub fn as_slice(&self) -> &[ChildLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.links.iter().any(|l| l.student_id == student_id)
    }

    /// Links a student from the directory. Returns false when nothing changed:
    /// blank id, unknown student, or already linked.
    pub fn add(&mut self, directory: &dyn StudentDirectory, student_id: &str) -> bool {
        let student_id = student_id.trim();
        if student_id.is_empty() || self.contains(student_id) {
            return false;
        }
        let Some(student) = directory.find_by_id(student_id) else {
            tracing::debug!(student_id, "child link skipped: unknown student");
            return false;
        };
        self.links.push(ChildLink::from_student(student));
        true
    }

    pub fn remove(&mut self, student_id: &str) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l.student_id != student_id);
        self.links.len() != before
    }

    /// Directory entries not linked yet.
    pub fn available<'a>(&self, directory: &'a dyn StudentDirectory) -> Vec<&'a Student> {
        directory
            .list_all()
            .iter()
            .filter(|s| !self.contains(&s.id))
            .collect()
    }
}
