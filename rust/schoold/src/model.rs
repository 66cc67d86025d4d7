use crate::grade;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Unspecified,
    Female,
    Male,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
    Transferred,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[default]
    Guardian,
    Mother,
    Father,
    Grandparent,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    #[default]
    Password,
    Otp,
}

// ---------------------------------------------------------------------------
// Student profile, one struct per edit-wizard step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentPersonal {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: Gender,
    pub nationality: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentContact {
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentAcademic {
    pub student_number: String,
    pub class_name: String,
    pub enrollment_date: String,
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentGuardian {
    pub guardian_name: String,
    pub guardian_phone: String,
    pub guardian_email: String,
    pub guardian_relationship: Relationship,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentMedical {
    pub blood_type: String,
    pub allergies: String,
    pub medical_notes: String,
    pub has_special_needs: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(flatten)]
    pub personal: StudentPersonal,
    #[serde(flatten)]
    pub contact: StudentContact,
    #[serde(flatten)]
    pub academic: StudentAcademic,
    #[serde(flatten)]
    pub guardian: StudentGuardian,
    #[serde(flatten)]
    pub medical: StudentMedical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        let p = &self.profile.personal;
        format!("{} {}", p.first_name.trim(), p.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn class_name(&self) -> &str {
        &self.profile.academic.class_name
    }

    pub fn grade_level(&self) -> Option<u8> {
        grade::parse_grade_level(self.class_name())
    }
}

// ---------------------------------------------------------------------------
// Parent record, as produced by the onboarding wizard
// ---------------------------------------------------------------------------

/// A student linked to a parent. Replaced as a whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildLink {
    pub student_id: String,
    pub student_name: String,
    pub grade: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<u8>,
    pub class_name: String,
}

impl ChildLink {
    pub fn from_student(student: &Student) -> Self {
        Self {
            student_id: student.id.clone(),
            student_name: student.full_name(),
            grade: grade::grade_label(student.class_name()),
            grade_level: student.grade_level(),
            class_name: student.class_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentPersonal {
    pub full_name: String,
    pub email: String,
    pub occupation: String,
    pub relationship: Relationship,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentContact {
    pub phone: String,
    pub alternate_phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentConsent {
    pub consent_given: bool,
    pub email_notifications: bool,
    pub sms_notifications: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentAccount {
    pub has_account_access: bool,
    pub login_method: LoginMethod,
    /// Salted SHA-256 of the password, `salt$hex`. Never the clear text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRecord {
    pub id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub personal: ParentPersonal,
    #[serde(flatten)]
    pub contact: ParentContact,
    #[serde(default)]
    pub children: Vec<ChildLink>,
    #[serde(flatten)]
    pub account: ParentAccount,
    #[serde(flatten)]
    pub consent: ParentConsent,
}

impl ParentRecord {
    /// Response form of the record. The stored digest is replaced by
    /// `hasPassword`; only `record_json` keeps it.
    pub fn to_wire(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.remove("passwordHash");
            obj.insert(
                "hasPassword".to_string(),
                Value::Bool(self.account.password_hash.is_some()),
            );
        }
        value
    }
}
