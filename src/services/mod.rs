pub mod assignment_service;
pub mod background_sync;
pub mod schedule_service;
pub mod settings_service;
pub mod upload_service;
