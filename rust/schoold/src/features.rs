use crate::kv::KeyValueStore;
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHOOL_KEY: &str = "current_school_id";
pub const DEFAULT_SCHOOL_ID: &str = "1";

pub fn features_key(school_id: &str) -> String {
    format!("school_features_{}", school_id)
}

/// Dashboard capabilities a school operator can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Applications,
    Students,
    Teachers,
    Parents,
    Payments,
    AcademicProgress,
    Attendance,
    Calendar,
    Timetable,
    Announcements,
    ActivityLog,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Self::Applications,
        Self::Students,
        Self::Teachers,
        Self::Parents,
        Self::Payments,
        Self::AcademicProgress,
        Self::Attendance,
        Self::Calendar,
        Self::Timetable,
        Self::Announcements,
        Self::ActivityLog,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == s)
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Students => "students",
            Self::Teachers => "teachers",
            Self::Parents => "parents",
            Self::Payments => "payments",
            Self::AcademicProgress => "academicProgress",
            Self::Attendance => "attendance",
            Self::Calendar => "calendar",
            Self::Timetable => "timetable",
            Self::Announcements => "announcements",
            Self::ActivityLog => "activityLog",
        }
    }
}

/// Stored flag blob. Keys missing from a stored blob decode as enabled, so
/// flags added later stay on for schools saved before they existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureFlags {
    pub applications: bool,
    pub students: bool,
    pub teachers: bool,
    pub parents: bool,
    pub payments: bool,
    pub academic_progress: bool,
    pub attendance: bool,
    pub calendar: bool,
    pub timetable: bool,
    pub announcements: bool,
    pub activity_log: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            applications: true,
            students: true,
            teachers: true,
            parents: true,
            payments: true,
            academic_progress: true,
            attendance: true,
            calendar: true,
            timetable: true,
            announcements: true,
            activity_log: true,
        }
    }
}

impl FeatureFlags {
    fn slot(&mut self, feature: Feature) -> &mut bool {
        match feature {
            Feature::Applications => &mut self.applications,
            Feature::Students => &mut self.students,
            Feature::Teachers => &mut self.teachers,
            Feature::Parents => &mut self.parents,
            Feature::Payments => &mut self.payments,
            Feature::AcademicProgress => &mut self.academic_progress,
            Feature::Attendance => &mut self.attendance,
            Feature::Calendar => &mut self.calendar,
            Feature::Timetable => &mut self.timetable,
            Feature::Announcements => &mut self.announcements,
            Feature::ActivityLog => &mut self.activity_log,
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        let mut flags = *self;
        *flags.slot(feature)
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        *self.slot(feature) = enabled;
    }
}

/// Keys of a client-supplied flag object that name no [`Feature`].
///
/// Stored blobs decode leniently; requests are checked with this first so a
/// misspelled name cannot turn into a silent reset to the default.
pub fn unknown_flag_keys(obj: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    obj.keys()
        .filter(|k| Feature::parse(k).is_none())
        .cloned()
        .collect()
}

/// Per-school feature flags on top of any key-value store.
///
/// Storage and decode failures never reach the caller: reads fall back to
/// [`FeatureFlags::default`] and writes report `false`.
pub struct FeatureFlagStore<S> {
    kv: S,
}

impl<S: KeyValueStore> FeatureFlagStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn get(&self, school_id: &str) -> FeatureFlags {
        let key = features_key(school_id);
        let raw = match self.kv.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return FeatureFlags::default(),
            Err(e) => {
                tracing::warn!(school_id, error = %e, "failed to read feature flags");
                return FeatureFlags::default();
            }
        };
        match serde_json::from_str::<FeatureFlags>(&raw) {
            Ok(flags) => flags,
            Err(e) => {
                tracing::warn!(school_id, error = %e, "stored feature flags are malformed");
                FeatureFlags::default()
            }
        }
    }

    /// Overwrites the whole blob for `school_id`. Returns whether it was stored.
    pub fn set(&mut self, school_id: &str, flags: &FeatureFlags) -> bool {
        let encoded = match serde_json::to_string(flags) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(school_id, error = %e, "failed to encode feature flags");
                return false;
            }
        };
        match self.kv.set(&features_key(school_id), &encoded) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(school_id, error = %e, "failed to persist feature flags");
                false
            }
        }
    }

    pub fn current_school_id(&self, fallback: &str) -> String {
        match self.kv.get(CURRENT_SCHOOL_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => id,
            Ok(_) => fallback.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read current school id");
                fallback.to_string()
            }
        }
    }

    pub fn set_current_school_id(&mut self, school_id: &str) -> bool {
        match self.kv.set(CURRENT_SCHOOL_KEY, school_id) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(school_id, error = %e, "failed to persist current school id");
                false
            }
        }
    }
}
