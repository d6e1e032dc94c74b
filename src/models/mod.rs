pub mod assignment;
pub mod settings;

pub use assignment::{Assignment, Conflict, ScheduledAssignment, TimeSlot};
pub use settings::AppSettings;
