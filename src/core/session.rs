use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::{
    engine::geodesy::distance_between,
    trail::TrailV2,
    types::{ActivityType, DeviceInfo, Reading},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,
    #[error("no recording in progress")]
    NotRecording,
}

/// Result of feeding one fix to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// Stored; carries the accumulated distance.
    Appended { distance: f64 },
    /// Same position as the previous reading; dropped.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRecording {
    started_at_ms: u64,
    readings: Vec<Reading>,
    distance: f64,
}

/// Recording state owned by the client UI loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecordingSession {
    #[default]
    Idle,
    Recording(ActiveRecording),
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::Idle
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording(_))
    }

    pub fn start(&mut self, now_ms: u64) -> Result<(), SessionError> {
        if self.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }
        *self = Self::Recording(ActiveRecording {
            started_at_ms: now_ms,
            readings: Vec::new(),
            distance: 0.0,
        });
        Ok(())
    }

    /// Appends a fix unless it repeats the previous position exactly.
    pub fn record_fix(
        &mut self,
        lat: f64,
        lon: f64,
        at_ms: u64,
    ) -> Result<FixOutcome, SessionError> {
        let Self::Recording(rec) = self else {
            return Err(SessionError::NotRecording);
        };

        let elapsed = at_ms.saturating_sub(rec.started_at_ms) as f64;
        let reading = Reading::timed(lat, lon, elapsed);
        if let Some(last) = rec.readings.last() {
            if last.same_position(&reading) {
                return Ok(FixOutcome::Duplicate);
            }
            rec.distance += distance_between(last.lat, last.lon, lat, lon);
        }
        rec.readings.push(reading);
        Ok(FixOutcome::Appended {
            distance: rec.distance,
        })
    }

    pub fn readings(&self) -> &[Reading] {
        match self {
            Self::Idle => &[],
            Self::Recording(rec) => &rec.readings,
        }
    }

    pub fn distance(&self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::Recording(rec) => rec.distance,
        }
    }

    /// Finalizes the recording into a v2 trail and returns to `Idle`.
    pub fn stop(
        &mut self,
        now_ms: u64,
        device: &DeviceInfo,
        activity: ActivityType,
    ) -> Result<TrailV2, SessionError> {
        let Self::Recording(rec) = std::mem::take(self) else {
            return Err(SessionError::NotRecording);
        };

        Ok(TrailV2 {
            uuid: new_trail_uuid(),
            device: device.clone(),
            start: rec.started_at_ms as f64,
            end: now_ms.max(rec.started_at_ms) as f64,
            distance: rec.distance,
            activity,
            waypoints: Vec::new(),
            readings: rec.readings,
        })
    }
}

/// 16 uppercase hex digits.
pub fn new_trail_uuid() -> String {
    format!("{:016X}", rand::random::<u64>())
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
