pub mod alarm;
pub mod recording;
pub mod status;
