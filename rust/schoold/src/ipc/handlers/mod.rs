pub mod activity;
pub mod core;
pub mod features;
pub mod parents;
pub mod students;
pub mod wizard;
