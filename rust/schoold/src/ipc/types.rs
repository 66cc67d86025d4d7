use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use crate::config::DaemonConfig;
use crate::directory::Roster;
use crate::error::WizardError;
use crate::features::FeatureFlagStore;
use crate::kv::{KeyValueStore, MemoryStore, SqliteStore};
use crate::wizard::parent::ParentForm;
use crate::wizard::student::StudentForm;
use crate::wizard::{Wizard, WizardSnapshot};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An open wizard dialog.
pub enum Session {
    Parent(Wizard<ParentForm>),
    Student(Wizard<StudentForm>),
}

impl Session {
    pub fn snapshot(&self) -> WizardSnapshot {
        match self {
            Self::Parent(w) => w.snapshot(),
            Self::Student(w) => w.snapshot(),
        }
    }

    pub fn set_field_raw(&mut self, name: &str, value: &Value) -> Result<(), WizardError> {
        match self {
            Self::Parent(w) => w.set_field_raw(name, value),
            Self::Student(w) => w.set_field_raw(name, value),
        }
    }

    pub fn previous(&mut self) {
        match self {
            Self::Parent(w) => w.previous(),
            Self::Student(w) => w.previous(),
        }
    }

    pub fn jump_to(&mut self, step: usize) -> Result<(), WizardError> {
        match self {
            Self::Parent(w) => w.jump_to(step),
            Self::Student(w) => w.jump_to(step),
        }
    }

    /// True when `next` would hand the record to the submit handler.
    pub fn submit_pending(&self) -> bool {
        match self {
            Self::Parent(w) => w.is_terminal() && w.can_advance(),
            Self::Student(w) => w.is_terminal() && w.can_advance(),
        }
    }
}

pub struct AppState {
    pub config: DaemonConfig,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Settings storage until a workspace is selected.
    pub memory_kv: MemoryStore,
    pub roster: Roster,
    pub sessions: HashMap<String, Session>,
}

impl AppState {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            workspace: None,
            db: None,
            memory_kv: MemoryStore::default(),
            roster: Roster::builtin(),
            sessions: HashMap::new(),
        }
    }

    pub fn kv(&mut self) -> Box<dyn KeyValueStore + '_> {
        match self.db.as_ref() {
            Some(conn) => Box::new(SqliteStore::new(conn)),
            None => Box::new(&mut self.memory_kv),
        }
    }

    pub fn flags(&mut self) -> FeatureFlagStore<Box<dyn KeyValueStore + '_>> {
        FeatureFlagStore::new(self.kv())
    }

    pub fn current_school_id(&mut self) -> String {
        let fallback = self.config.default_school_id.clone();
        self.flags().current_school_id(&fallback)
    }
}
