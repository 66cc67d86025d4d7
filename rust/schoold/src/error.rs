#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("unknown field: {0}")]
    Unknown(String),

    #[error("{field} {expected}")]
    InvalidValue {
        field: &'static str,
        expected: &'static str,
    },
}

impl FieldError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "unknown_field",
            Self::InvalidValue { .. } => "invalid_value",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("step {step} is out of range (0..{count})")]
    StepOutOfRange { step: usize, count: usize },

    #[error("cannot jump forward from step {from} to step {to} in this wizard")]
    JumpNotAllowed { from: usize, to: usize },

    #[error("submit is only available on the final step (currently on step {current})")]
    NotTerminalStep { current: usize },

    #[error("step '{step}' is incomplete")]
    StepInvalid { step: &'static str },

    #[error("this wizard has already been submitted")]
    AlreadySubmitted,

    #[error("children can only be linked in the parent wizard")]
    ChildrenUnsupported,

    #[error("save failed: {0:#}")]
    Save(anyhow::Error),
}

impl WizardError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Field(e) => e.code(),
            Self::StepOutOfRange { .. } | Self::ChildrenUnsupported => "bad_params",
            Self::JumpNotAllowed { .. } => "jump_not_allowed",
            Self::NotTerminalStep { .. } => "not_terminal_step",
            Self::StepInvalid { .. } => "step_invalid",
            Self::AlreadySubmitted => "already_submitted",
            Self::Save(_) => "save_failed",
        }
    }
}
