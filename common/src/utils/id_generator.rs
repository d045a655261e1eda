//! Unique ID generator.
//!
//! Provides identifiers used to correlate log lines of one refresh run.

use uuid::Uuid;

/// Generates unique identifiers.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates a unique run ID.
    ///
    /// # Returns
    /// A unique UUID string.
    pub fn run_id() -> String {
        Uuid::new_v4().to_string()
    }
}
