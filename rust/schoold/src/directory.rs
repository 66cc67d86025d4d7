use crate::model::{
    Gender, Relationship, Student, StudentAcademic, StudentContact, StudentGuardian,
    StudentMedical, StudentPersonal, StudentProfile, StudentStatus,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Read-only student lookup used by the child-link manager.
pub trait StudentDirectory {
    fn find_by_id(&self, id: &str) -> Option<&Student>;
    fn list_all(&self) -> &[Student];
}

/// In-memory roster, loaded from the workspace or seeded from [`Roster::builtin`].
#[derive(Debug, Clone, Default)]
pub struct Roster {
    students: Vec<Student>,
}

impl StudentDirectory for Roster {
    fn find_by_id(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    fn list_all(&self) -> &[Student] {
        &self.students
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub search: Option<String>,
    pub grade: Option<u8>,
    pub status: Option<StudentStatus>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug)]
pub struct StudentPage<'a> {
    pub students: Vec<&'a Student>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl Roster {
    pub fn new(students: Vec<Student>) -> Self {
        Self { students }
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Replaces the student with the same id, or appends.
    pub fn upsert(&mut self, student: Student) {
        match self.students.iter_mut().find(|s| s.id == student.id) {
            Some(slot) => *slot = student,
            None => self.students.push(student),
        }
    }

    pub fn query(&self, q: &StudentQuery) -> StudentPage<'_> {
        let needle = q
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let matches: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| match &needle {
                Some(n) => {
                    s.full_name().to_lowercase().contains(n)
                        || s.id.to_lowercase().contains(n)
                        || s.profile.contact.email.to_lowercase().contains(n)
                        || s.profile.academic.student_number.to_lowercase().contains(n)
                }
                None => true,
            })
            .filter(|s| q.grade.map(|g| s.grade_level() == Some(g)).unwrap_or(true))
            .filter(|s| {
                q.status
                    .map(|st| s.profile.academic.status == st)
                    .unwrap_or(true)
            })
            .collect();

        let page_size = q.page_size.clamp(1, MAX_PAGE_SIZE);
        let page = q.page.max(1);
        let total = matches.len();
        let students = matches
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        StudentPage {
            students,
            total,
            page,
            page_size,
        }
    }

    /// Demo roster used before a workspace exists and to seed new workspaces.
    pub fn builtin() -> Self {
        use Gender::{Female, Male};
        use StudentStatus::{Active, Graduated, Inactive};

        // (id, first, last, gender, class, guardian first name, birth date, status)
        let rows: [(&str, &str, &str, Gender, &str, &str, &str, StudentStatus); 10] = [
            ("1", "Emma", "Johnson", Female, "Grade 5 - A", "Sarah", "2015-03-14", Active),
            ("2", "Liam", "Smith", Male, "Grade 5 - B", "Michael", "2015-07-02", Active),
            ("3", "Olivia", "Brown", Female, "Grade 7 - A", "Karen", "2013-11-21", Active),
            ("4", "Noah", "Davis", Male, "Grade 8 - C", "Robert", "2012-01-09", Active),
            ("5", "Ava", "Wilson", Female, "Grade 3 - A", "Linda", "2017-05-30", Active),
            ("6", "Ethan", "Moore", Male, "Grade 10 - B", "James", "2010-09-12", Active),
            ("7", "Sophia", "Taylor", Female, "KG-2", "Patricia", "2020-02-18", Active),
            ("8", "Mason", "Anderson", Male, "Grade 12 - A", "David", "2008-04-25", Graduated),
            ("9", "Isabella", "Thomas", Female, "Grade 7 - B", "Mary", "2013-08-03", Inactive),
            ("10", "Lucas", "Martin", Male, "Grade 1 - A", "Jennifer", "2019-12-11", Active),
        ];

        let students = rows
            .into_iter()
            .map(|(id, first, last, gender, class_name, guardian, dob, status)| {
                let login = format!("{}.{}", first.to_lowercase(), last.to_lowercase());
                Student {
                    id: id.to_string(),
                    profile: StudentProfile {
                        personal: StudentPersonal {
                            first_name: first.to_string(),
                            last_name: last.to_string(),
                            date_of_birth: dob.to_string(),
                            gender,
                            nationality: String::new(),
                        },
                        contact: StudentContact {
                            email: format!("{}@students.example.edu", login),
                            phone: String::new(),
                            address: String::new(),
                            city: String::new(),
                        },
                        academic: StudentAcademic {
                            student_number: format!("STU-{:04}", id.parse::<u32>().unwrap_or(0)),
                            class_name: class_name.to_string(),
                            enrollment_date: "2024-09-01".to_string(),
                            status,
                        },
                        guardian: StudentGuardian {
                            guardian_name: format!("{} {}", guardian, last),
                            guardian_phone: String::new(),
                            guardian_email: String::new(),
                            guardian_relationship: Relationship::Guardian,
                        },
                        medical: StudentMedical::default(),
                    },
                    updated_at: None,
                }
            })
            .collect();
        Self { students }
    }
}
