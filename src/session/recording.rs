// RecordingSession - guarded persistence state machine
//
// States: Idle, Recording. While Recording, every successfully produced
// classification event is appended to the durable log exactly once, in
// arrival order. While Idle, events are still computed for live display
// but never persisted. stop() transitions to Idle and truncates the log
// body back to header-only; persisted history from a stopped session is
// deliberately cleared, never partially kept.
//
// The active flag lives behind a mutex so a stop() racing a record() can
// never let an event slip into the log after the truncate.

use log::{debug, info};
use std::sync::Mutex;

use crate::analysis::ClassificationEvent;
use crate::error::{RecordingError, log_recording_error};
use crate::session::EventLog;

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// Controls whether classification events reach the durable log
pub struct RecordingSession {
    state: Mutex<RecordingState>,
    log: EventLog,
}

impl RecordingSession {
    pub fn new(log: EventLog) -> Self {
        Self {
            state: Mutex::new(RecordingState::Idle),
            log,
        }
    }

    /// Begin persisting events. Idempotent: starting while already
    /// recording keeps the current log untouched.
    pub fn start(&self) -> Result<(), RecordingError> {
        match self.transition_to_recording() {
            Ok(()) => {
                info!("[Recording] started");
                Ok(())
            }
            Err(RecordingError::AlreadyRecording) => {
                debug!("[Recording] start ignored, already recording");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Stop persisting and clear the log body back to header-only
    ///
    /// No-op when already Idle.
    pub fn stop(&self) -> Result<(), RecordingError> {
        let mut state = self.state.lock().map_err(|_| RecordingError::Poisoned)?;
        if *state == RecordingState::Idle {
            debug!("[Recording] stop ignored, already idle");
            return Ok(());
        }
        // Truncate while holding the state lock: no record() can interleave
        self.log.truncate_to_header()?;
        *state = RecordingState::Idle;
        info!("[Recording] stopped, log cleared to header");
        Ok(())
    }

    /// Persist one event iff recording
    ///
    /// Returns whether the event was appended. Lock acquisition failures
    /// inside the log escalate; they are the one hard session failure.
    pub fn record(&self, event: &ClassificationEvent) -> Result<bool, RecordingError> {
        let state = self.state.lock().map_err(|_| RecordingError::Poisoned)?;
        if *state != RecordingState::Recording {
            return Ok(false);
        }
        if let Err(err) = self.log.append(event) {
            log_recording_error(&err, "record");
            return Err(err);
        }
        Ok(true)
    }

    pub fn is_recording(&self) -> bool {
        self.state
            .lock()
            .map(|state| *state == RecordingState::Recording)
            .unwrap_or(false)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    fn transition_to_recording(&self) -> Result<(), RecordingError> {
        let mut state = self.state.lock().map_err(|_| RecordingError::Poisoned)?;
        if *state == RecordingState::Recording {
            return Err(RecordingError::AlreadyRecording);
        }
        *state = RecordingState::Recording;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LoadLabel;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_log_path(tag: &str) -> PathBuf {
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "cogload_session_{}_{}_{}.csv",
            tag,
            std::process::id(),
            unique
        ))
    }

    fn session(tag: &str) -> (RecordingSession, PathBuf) {
        let path = temp_log_path(tag);
        let log = EventLog::create(&path, 5).unwrap();
        (RecordingSession::new(log), path)
    }

    fn event() -> ClassificationEvent {
        ClassificationEvent {
            timestamp: Utc::now(),
            ci_alpha: 20.0,
            alpha_apen: Some(0.3),
            beta_apen: Some(0.3),
            theta_apen: Some(0.3),
            prediction: 1,
            label: LoadLabel::High,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_idle_events_not_persisted() {
        let (session, path) = session("idle");

        assert!(!session.record(&event()).unwrap());
        assert_eq!(session.log().data_row_count().unwrap(), 0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_recording_appends_in_order() {
        let (session, path) = session("append");
        session.start().unwrap();

        for _ in 0..3 {
            assert!(session.record(&event()).unwrap());
        }
        assert_eq!(session.log().data_row_count().unwrap(), 3);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_stop_truncates_to_header() {
        let (session, path) = session("stop");
        session.start().unwrap();
        for _ in 0..3 {
            session.record(&event()).unwrap();
        }

        session.stop().unwrap();
        assert!(!session.is_recording());
        assert_eq!(session.log().data_row_count().unwrap(), 0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_start_is_idempotent() {
        let (session, path) = session("idempotent");
        session.start().unwrap();
        session.record(&event()).unwrap();

        // Second start must not clear or restart anything
        session.start().unwrap();
        assert!(session.is_recording());
        assert_eq!(session.log().data_row_count().unwrap(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (session, path) = session("noop");
        session.stop().unwrap();
        assert!(!session.is_recording());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_events_after_stop_not_persisted() {
        let (session, path) = session("afterstop");
        session.start().unwrap();
        session.record(&event()).unwrap();
        session.stop().unwrap();

        assert!(!session.record(&event()).unwrap());
        assert_eq!(session.log().data_row_count().unwrap(), 0);
        std::fs::remove_file(&path).ok();
    }
}
