//! Parent onboarding wizard: personal details, contact, linked children,
//! portal account and consent.

use super::children::ChildLinks;
use super::{choice, flag, text, Navigation, RecordStamp, StepDef, Wizard, WizardForm};
use crate::directory::StudentDirectory;
use crate::error::FieldError;
use crate::model::{
    LoginMethod, ParentAccount, ParentConsent, ParentContact, ParentPersonal, ParentRecord,
    Relationship, Student,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const STEP_PERSONAL: usize = 0;
pub const STEP_CONTACT: usize = 1;
pub const STEP_CHILDREN: usize = 2;
pub const STEP_ACCOUNT: usize = 3;
pub const STEP_CONSENT: usize = 4;

static PARENT_STEPS: [StepDef; 5] = [
    StepDef {
        id: "personal",
        label: "Personal Information",
        fields: &["fullName", "email", "occupation", "relationship"],
    },
    StepDef {
        id: "contact",
        label: "Contact Details",
        fields: &["phone", "alternatePhone", "address"],
    },
    StepDef {
        id: "children",
        label: "Link Children",
        fields: &["children"],
    },
    StepDef {
        id: "account",
        label: "Account Access",
        fields: &["hasAccountAccess", "loginMethod", "password"],
    },
    StepDef {
        id: "consent",
        label: "Consent & Preferences",
        fields: &["consentGiven", "emailNotifications", "smsNotifications"],
    },
];

#[derive(Debug, Clone, PartialEq)]
pub enum ParentField {
    FullName(String),
    Email(String),
    Occupation(String),
    Relationship(Relationship),
    Phone(String),
    AlternatePhone(String),
    Address(String),
    HasAccountAccess(bool),
    LoginMethod(LoginMethod),
    Password(String),
    ConsentGiven(bool),
    EmailNotifications(bool),
    SmsNotifications(bool),
}

/// Account step input. Holds the clear-text password until submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountInput {
    pub has_account_access: bool,
    pub login_method: LoginMethod,
    pub password: String,
}

impl AccountInput {
    fn needs_password(&self) -> bool {
        self.has_account_access && self.login_method == LoginMethod::Password
    }

    pub fn is_valid(&self) -> bool {
        !self.needs_password() || self.password.chars().count() >= MIN_PASSWORD_LEN
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentForm {
    pub personal: ParentPersonal,
    pub contact: ParentContact,
    pub children: ChildLinks,
    pub account: AccountInput,
    pub consent: ParentConsent,
}

impl ParentForm {
    /// Seeds an edit session. The stored password digest is not carried over;
    /// password sign-in requires a new password to be entered.
    pub fn from_record(record: &ParentRecord) -> Self {
        Self {
            personal: record.personal.clone(),
            contact: record.contact.clone(),
            children: ChildLinks::from_links(record.children.clone()),
            account: AccountInput {
                has_account_access: record.account.has_account_access,
                login_method: record.account.login_method,
                password: String::new(),
            },
            consent: record.consent.clone(),
        }
    }
}

impl WizardForm for ParentForm {
    type Field = ParentField;
    type Record = ParentRecord;

    const KIND: &'static str = "parent";
    const NAVIGATION: Navigation = Navigation::Gated;

    fn steps() -> &'static [StepDef] {
        &PARENT_STEPS
    }

    fn parse_field(name: &str, value: &Value) -> Result<ParentField, FieldError> {
        let field = match name {
            "fullName" => ParentField::FullName(text("fullName", value)?),
            "email" => ParentField::Email(text("email", value)?),
            "occupation" => ParentField::Occupation(text("occupation", value)?),
            "relationship" => ParentField::Relationship(choice(
                "relationship",
                value,
                "must be one of: guardian, mother, father, grandparent, other",
            )?),
            "phone" => ParentField::Phone(text("phone", value)?),
            "alternatePhone" => ParentField::AlternatePhone(text("alternatePhone", value)?),
            "address" => ParentField::Address(text("address", value)?),
            "hasAccountAccess" => ParentField::HasAccountAccess(flag("hasAccountAccess", value)?),
            "loginMethod" => ParentField::LoginMethod(choice(
                "loginMethod",
                value,
                "must be one of: password, otp",
            )?),
            "password" => ParentField::Password(text("password", value)?),
            "consentGiven" => ParentField::ConsentGiven(flag("consentGiven", value)?),
            "emailNotifications" => {
                ParentField::EmailNotifications(flag("emailNotifications", value)?)
            }
            "smsNotifications" => ParentField::SmsNotifications(flag("smsNotifications", value)?),
            other => return Err(FieldError::Unknown(other.to_string())),
        };
        Ok(field)
    }

    fn apply(&mut self, field: ParentField) {
        match field {
            ParentField::FullName(v) => self.personal.full_name = v,
            ParentField::Email(v) => self.personal.email = v,
            ParentField::Occupation(v) => self.personal.occupation = v,
            ParentField::Relationship(v) => self.personal.relationship = v,
            ParentField::Phone(v) => self.contact.phone = v,
            ParentField::AlternatePhone(v) => self.contact.alternate_phone = v,
            ParentField::Address(v) => self.contact.address = v,
            ParentField::HasAccountAccess(v) => self.account.has_account_access = v,
            ParentField::LoginMethod(v) => self.account.login_method = v,
            ParentField::Password(v) => self.account.password = v,
            ParentField::ConsentGiven(v) => self.consent.consent_given = v,
            ParentField::EmailNotifications(v) => self.consent.email_notifications = v,
            ParentField::SmsNotifications(v) => self.consent.sms_notifications = v,
        }
    }

    fn validate(&self, step: usize) -> bool {
        match step {
            STEP_PERSONAL => !self.personal.full_name.trim().is_empty(),
            STEP_CONTACT => !self.contact.phone.trim().is_empty(),
            STEP_CHILDREN => !self.children.is_empty(),
            STEP_ACCOUNT => self.account.is_valid(),
            STEP_CONSENT => self.consent.consent_given,
            _ => false,
        }
    }

    fn fields_json(&self) -> Value {
        json!({
            "fullName": self.personal.full_name,
            "email": self.personal.email,
            "occupation": self.personal.occupation,
            "relationship": self.personal.relationship,
            "phone": self.contact.phone,
            "alternatePhone": self.contact.alternate_phone,
            "address": self.contact.address,
            "children": self.children.as_slice(),
            "childCount": self.children.len(),
            "hasAccountAccess": self.account.has_account_access,
            "loginMethod": self.account.login_method,
            "passwordLength": self.account.password.chars().count(),
            "consentGiven": self.consent.consent_given,
            "emailNotifications": self.consent.email_notifications,
            "smsNotifications": self.consent.sms_notifications,
        })
    }

    fn build_record(&self, stamp: RecordStamp) -> ParentRecord {
        let password_hash = if self.account.needs_password() {
            Some(hash_password(&self.account.password))
        } else {
            None
        };
        ParentRecord {
            id: stamp.id,
            created_at: stamp.created_at,
            updated_at: stamp.updated_at,
            personal: ParentPersonal {
                full_name: self.personal.full_name.trim().to_string(),
                email: self.personal.email.trim().to_string(),
                occupation: self.personal.occupation.trim().to_string(),
                relationship: self.personal.relationship,
            },
            contact: ParentContact {
                phone: self.contact.phone.trim().to_string(),
                alternate_phone: self.contact.alternate_phone.trim().to_string(),
                address: self.contact.address.trim().to_string(),
            },
            children: self.children.as_slice().to_vec(),
            account: ParentAccount {
                has_account_access: self.account.has_account_access,
                login_method: self.account.login_method,
                password_hash,
            },
            consent: self.consent.clone(),
        }
    }
}

/// `salt$hex(sha256(salt || password))`.
fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{}${:x}", salt, hasher.finalize())
}

impl Wizard<ParentForm> {
    pub fn add_child(&mut self, directory: &dyn StudentDirectory, student_id: &str) -> bool {
        self.form_mut().children.add(directory, student_id)
    }

    pub fn remove_child(&mut self, student_id: &str) -> bool {
        self.form_mut().children.remove(student_id)
    }

    pub fn available_students<'a>(&self, directory: &'a dyn StudentDirectory) -> Vec<&'a Student> {
        self.form().children.available(directory)
    }
}
