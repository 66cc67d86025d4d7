//! Stepped form wizards.
//!
//! A wizard owns one in-progress record (the form), a fixed list of steps and
//! a cursor into that list. Forward movement is gated by the current step's
//! validator; the final step hands the assembled record to a
//! [`SubmitHandler`].

pub mod children;
pub mod parent;
pub mod student;

use crate::error::{FieldError, WizardError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// One entry of a wizard's fixed step list.
#[derive(Debug, Clone, Copy)]
pub struct StepDef {
    pub id: &'static str,
    pub label: &'static str,
    pub fields: &'static [&'static str],
}

/// Whether the step indicator may move the cursor without validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Forward movement only through `next`; jumps may only go back.
    Gated,
    /// Any step may be selected directly.
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardMode {
    Add,
    Edit,
}

/// Identity carried into the finished record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStamp {
    pub id: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

pub trait WizardForm {
    type Field;
    type Record;

    const KIND: &'static str;
    const NAVIGATION: Navigation;

    fn steps() -> &'static [StepDef];

    /// Parses a wire-level field name and value into a typed field.
    fn parse_field(name: &str, value: &Value) -> Result<Self::Field, FieldError>;

    fn apply(&mut self, field: Self::Field);

    /// Pure check of the data collected by `step`.
    fn validate(&self, step: usize) -> bool;

    fn fields_json(&self) -> Value;

    fn build_record(&self, stamp: RecordStamp) -> Self::Record;
}

/// Receives the finished record when a wizard is submitted.
pub trait SubmitHandler<R> {
    fn on_save(&mut self, record: &R) -> anyhow::Result<()>;
}

impl<R, F> SubmitHandler<R> for F
where
    F: FnMut(&R) -> anyhow::Result<()>,
{
    fn on_save(&mut self, record: &R) -> anyhow::Result<()> {
        self(record)
    }
}

#[derive(Debug)]
pub enum Advance<R> {
    Moved { to: usize },
    /// Current step did not validate; nothing changed.
    Refused,
    Submitted(R),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    pub index: usize,
    pub id: &'static str,
    pub label: &'static str,
    pub fields: &'static [&'static str],
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub kind: &'static str,
    pub mode: WizardMode,
    pub current_step: usize,
    pub step_count: usize,
    pub steps: Vec<StepStatus>,
    pub can_advance: bool,
    pub is_terminal: bool,
    pub submitted: bool,
    pub fields: Value,
}

#[derive(Debug, Clone)]
struct Existing {
    id: String,
    created_at: String,
}

pub struct Wizard<F: WizardForm> {
    form: F,
    cursor: usize,
    existing: Option<Existing>,
    submitted: bool,
}

impl<F: WizardForm> Wizard<F> {
    /// Wizard for a new record; id and creation time are assigned on submit.
    pub fn new(form: F) -> Self {
        Self {
            form,
            cursor: 0,
            existing: None,
            submitted: false,
        }
    }

    /// Wizard seeded from an existing record, which keeps its id.
    pub fn edit(form: F, id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            form,
            cursor: 0,
            existing: Some(Existing {
                id: id.into(),
                created_at: created_at.into(),
            }),
            submitted: false,
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub(crate) fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    pub fn mode(&self) -> WizardMode {
        if self.existing.is_some() {
            WizardMode::Edit
        } else {
            WizardMode::Add
        }
    }

    pub fn current_step(&self) -> usize {
        self.cursor
    }

    pub fn step_count(&self) -> usize {
        F::steps().len()
    }

    pub fn is_terminal(&self) -> bool {
        self.cursor + 1 == self.step_count()
    }

    pub fn can_advance(&self) -> bool {
        !self.is_submitted() && self.form.validate(self.cursor)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn set_field(&mut self, field: F::Field) {
        self.form.apply(field);
    }

    /// Parses and applies a wire-level field edit.
    pub fn set_field_raw(&mut self, name: &str, value: &Value) -> Result<(), WizardError> {
        let field = F::parse_field(name, value)?;
        self.set_field(field);
        Ok(())
    }

    pub fn next(
        &mut self,
        handler: &mut dyn SubmitHandler<F::Record>,
    ) -> Result<Advance<F::Record>, WizardError> {
        if self.submitted {
            return Err(WizardError::AlreadySubmitted);
        }
        if !self.form.validate(self.cursor) {
            return Ok(Advance::Refused);
        }
        if self.is_terminal() {
            return self.submit(handler).map(Advance::Submitted);
        }
        self.cursor += 1;
        Ok(Advance::Moved { to: self.cursor })
    }

    pub fn previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn jump_to(&mut self, step: usize) -> Result<(), WizardError> {
        let count = self.step_count();
        if step >= count {
            return Err(WizardError::StepOutOfRange { step, count });
        }
        if F::NAVIGATION == Navigation::Gated && step > self.cursor {
            return Err(WizardError::JumpNotAllowed {
                from: self.cursor,
                to: step,
            });
        }
        self.cursor = step;
        Ok(())
    }

    pub fn submit(
        &mut self,
        handler: &mut dyn SubmitHandler<F::Record>,
    ) -> Result<F::Record, WizardError> {
        if self.submitted {
            return Err(WizardError::AlreadySubmitted);
        }
        if !self.is_terminal() {
            return Err(WizardError::NotTerminalStep {
                current: self.cursor,
            });
        }
        if !self.form.validate(self.cursor) {
            return Err(WizardError::StepInvalid {
                step: F::steps()[self.cursor].id,
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        let stamp = match &self.existing {
            Some(e) => RecordStamp {
                id: e.id.clone(),
                created_at: e.created_at.clone(),
                updated_at: Some(now),
            },
            None => RecordStamp {
                id: uuid::Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: None,
            },
        };
        let record_id = stamp.id.clone();
        let record = self.form.build_record(stamp);
        handler.on_save(&record).map_err(WizardError::Save)?;
        self.submitted = true;
        tracing::info!(kind = F::KIND, id = %record_id, "wizard submitted");
        Ok(record)
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let steps = F::steps()
            .iter()
            .enumerate()
            .map(|(index, def)| StepStatus {
                index,
                id: def.id,
                label: def.label,
                fields: def.fields,
                valid: self.form.validate(index),
            })
            .collect();
        WizardSnapshot {
            kind: F::KIND,
            mode: self.mode(),
            current_step: self.current_step(),
            step_count: self.step_count(),
            steps,
            can_advance: self.can_advance(),
            is_terminal: self.is_terminal(),
            submitted: self.submitted,
            fields: self.form.fields_json(),
        }
    }
}

// ---------------------------------------------------------------------------
// Field value parsing shared by the concrete forms
// ---------------------------------------------------------------------------

pub(crate) fn text(field: &'static str, value: &Value) -> Result<String, FieldError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        _ => Err(FieldError::InvalidValue {
            field,
            expected: "must be a string",
        }),
    }
}

pub(crate) fn flag(field: &'static str, value: &Value) -> Result<bool, FieldError> {
    value.as_bool().ok_or(FieldError::InvalidValue {
        field,
        expected: "must be a boolean",
    })
}

pub(crate) fn choice<T: DeserializeOwned>(
    field: &'static str,
    value: &Value,
    expected: &'static str,
) -> Result<T, FieldError> {
    serde_json::from_value(value.clone())
        .map_err(|_| FieldError::InvalidValue { field, expected })
}
