//! Expiry alarm
//!
//! The reconciler decides *whether* the alarm should sound; an [`AlarmSink`]
//! does the actual playing. [`AlarmSignal`] sits in between and turns repeated
//! start/stop requests into single transitions.

/// What the reconciler asks of the alarm after a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmCommand {
    Start,
    Stop,
}

/// Physical alarm output (speaker, buzzer, log)
pub trait AlarmSink: Send {
    /// Begin looping the alarm sound
    fn start_loop(&mut self);
    /// Silence it
    fn stop_loop(&mut self);
}

/// Idempotent wrapper around a sink
#[derive(Debug)]
pub struct AlarmSignal<S> {
    sink: S,
    playing: bool,
}

impl<S: AlarmSink> AlarmSignal<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Returns true when the sink was actually started
    pub fn start(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.sink.start_loop();
        self.playing = true;
        true
    }

    /// Returns true when the sink was actually stopped
    pub fn stop(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.sink.stop_loop();
        self.playing = false;
        true
    }

    pub fn apply(&mut self, command: AlarmCommand) -> bool {
        match command {
            AlarmCommand::Start => self.start(),
            AlarmCommand::Stop => self.stop(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Sink that only logs, for headless displays and tests
#[derive(Debug, Default)]
pub struct TracingAlarm {
    kitchen_id: i64,
}

impl TracingAlarm {
    pub fn new(kitchen_id: i64) -> Self {
        Self { kitchen_id }
    }
}

impl AlarmSink for TracingAlarm {
    fn start_loop(&mut self) {
        tracing::warn!(kitchen_id = self.kitchen_id, "Timer expired, alarm on");
    }

    fn stop_loop(&mut self) {
        tracing::info!(kitchen_id = self.kitchen_id, "Alarm off");
    }
}
