//! Student profile editor. Nothing is required, and the step indicator can
//! select any step directly.

use super::{choice, flag, text, Navigation, RecordStamp, StepDef, WizardForm};
use crate::error::FieldError;
use crate::model::{Student, StudentProfile};
use serde_json::Value;

pub const STEP_REVIEW: usize = 5;

static STUDENT_STEPS: [StepDef; 6] = [
    StepDef {
        id: "personal",
        label: "Personal Information",
        fields: &["firstName", "lastName", "dateOfBirth", "gender", "nationality"],
    },
    StepDef {
        id: "contact",
        label: "Contact Details",
        fields: &["email", "phone", "address", "city"],
    },
    StepDef {
        id: "academic",
        label: "Academic Information",
        fields: &["studentNumber", "className", "enrollmentDate", "status"],
    },
    StepDef {
        id: "guardian",
        label: "Guardian",
        fields: &[
            "guardianName",
            "guardianPhone",
            "guardianEmail",
            "guardianRelationship",
        ],
    },
    StepDef {
        id: "medical",
        label: "Medical Information",
        fields: &["bloodType", "allergies", "medicalNotes", "hasSpecialNeeds"],
    },
    StepDef {
        id: "review",
        label: "Review",
        fields: &[],
    },
];

/// Edits to one field of a [`StudentProfile`], grouped by step.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentField {
    FirstName(String),
    LastName(String),
    DateOfBirth(String),
    Gender(crate::model::Gender),
    Nationality(String),
    Email(String),
    Phone(String),
    Address(String),
    City(String),
    StudentNumber(String),
    ClassName(String),
    EnrollmentDate(String),
    Status(crate::model::StudentStatus),
    GuardianName(String),
    GuardianPhone(String),
    GuardianEmail(String),
    GuardianRelationship(crate::model::Relationship),
    BloodType(String),
    Allergies(String),
    MedicalNotes(String),
    HasSpecialNeeds(bool),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentForm {
    pub profile: StudentProfile,
}

impl StudentForm {
    pub fn from_student(student: &Student) -> Self {
        Self {
            profile: student.profile.clone(),
        }
    }
}

impl WizardForm for StudentForm {
    type Field = StudentField;
    type Record = Student;

    const KIND: &'static str = "student";
    const NAVIGATION: Navigation = Navigation::Free;

    fn steps() -> &'static [StepDef] {
        &STUDENT_STEPS
    }

    fn parse_field(name: &str, value: &Value) -> Result<StudentField, FieldError> {
        use StudentField as F;
        let field = match name {
            "firstName" => F::FirstName(text("firstName", value)?),
            "lastName" => F::LastName(text("lastName", value)?),
            "dateOfBirth" => F::DateOfBirth(text("dateOfBirth", value)?),
            "gender" => F::Gender(choice(
                "gender",
                value,
                "must be one of: unspecified, female, male, other",
            )?),
            "nationality" => F::Nationality(text("nationality", value)?),
            "email" => F::Email(text("email", value)?),
            "phone" => F::Phone(text("phone", value)?),
            "address" => F::Address(text("address", value)?),
            "city" => F::City(text("city", value)?),
            "studentNumber" => F::StudentNumber(text("studentNumber", value)?),
            "className" => F::ClassName(text("className", value)?),
            "enrollmentDate" => F::EnrollmentDate(text("enrollmentDate", value)?),
            "status" => F::Status(choice(
                "status",
                value,
                "must be one of: active, inactive, graduated, transferred",
            )?),
            "guardianName" => F::GuardianName(text("guardianName", value)?),
            "guardianPhone" => F::GuardianPhone(text("guardianPhone", value)?),
            "guardianEmail" => F::GuardianEmail(text("guardianEmail", value)?),
            "guardianRelationship" => F::GuardianRelationship(choice(
                "guardianRelationship",
                value,
                "must be one of: guardian, mother, father, grandparent, other",
            )?),
            "bloodType" => F::BloodType(text("bloodType", value)?),
            "allergies" => F::Allergies(text("allergies", value)?),
            "medicalNotes" => F::MedicalNotes(text("medicalNotes", value)?),
            "hasSpecialNeeds" => F::HasSpecialNeeds(flag("hasSpecialNeeds", value)?),
            other => return Err(FieldError::Unknown(other.to_string())),
        };
        Ok(field)
    }

    fn apply(&mut self, field: StudentField) {
        let p = &mut self.profile;
        match field {
            StudentField::FirstName(v) => p.personal.first_name = v,
            StudentField::LastName(v) => p.personal.last_name = v,
            StudentField::DateOfBirth(v) => p.personal.date_of_birth = v,
            StudentField::Gender(v) => p.personal.gender = v,
            StudentField::Nationality(v) => p.personal.nationality = v,
            StudentField::Email(v) => p.contact.email = v,
            StudentField::Phone(v) => p.contact.phone = v,
            StudentField::Address(v) => p.contact.address = v,
            StudentField::City(v) => p.contact.city = v,
            StudentField::StudentNumber(v) => p.academic.student_number = v,
            StudentField::ClassName(v) => p.academic.class_name = v,
            StudentField::EnrollmentDate(v) => p.academic.enrollment_date = v,
            StudentField::Status(v) => p.academic.status = v,
            StudentField::GuardianName(v) => p.guardian.guardian_name = v,
            StudentField::GuardianPhone(v) => p.guardian.guardian_phone = v,
            StudentField::GuardianEmail(v) => p.guardian.guardian_email = v,
            StudentField::GuardianRelationship(v) => p.guardian.guardian_relationship = v,
            StudentField::BloodType(v) => p.medical.blood_type = v,
            StudentField::Allergies(v) => p.medical.allergies = v,
            StudentField::MedicalNotes(v) => p.medical.medical_notes = v,
            StudentField::HasSpecialNeeds(v) => p.medical.has_special_needs = v,
        }
    }

    fn validate(&self, step: usize) -> bool {
        step <= STEP_REVIEW
    }

    fn fields_json(&self) -> Value {
        serde_json::to_value(&self.profile).unwrap_or(Value::Null)
    }

    fn build_record(&self, stamp: RecordStamp) -> Student {
        Student {
            id: stamp.id,
            profile: self.profile.clone(),
            updated_at: Some(stamp.updated_at.unwrap_or(stamp.created_at)),
        }
    }
}
