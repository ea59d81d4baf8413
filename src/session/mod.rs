// Recording session control and the durable event log

pub mod log;
pub mod recording;

pub use log::EventLog;
pub use recording::RecordingSession;
