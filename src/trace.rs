use std::collections::VecDeque;

use crate::{Error, Result};

const DEFAULT_TRACE_LOG_LIMIT: usize = 10_000;

/// Bounded buffer of page trace lines.
///
/// Lines are kept only while tracing is enabled. Each kept line is also emitted as
/// a `tracing` debug event unless forwarding is switched off.
#[derive(Debug)]
pub(crate) struct TraceState {
    enabled: bool,
    events: bool,
    timers: bool,
    logs: VecDeque<String>,
    log_limit: usize,
    forward: bool,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            logs: VecDeque::new(),
            log_limit: DEFAULT_TRACE_LOG_LIMIT,
            forward: true,
        }
    }
}

impl TraceState {
    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_events(&mut self, enabled: bool) {
        self.events = enabled;
    }

    pub(crate) fn set_timers(&mut self, enabled: bool) {
        self.timers = enabled;
    }

    pub(crate) fn set_forward(&mut self, enabled: bool) {
        self.forward = enabled;
    }

    pub(crate) fn set_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::invalid_config(
                "set_trace_log_limit requires at least 1 entry",
            ));
        }
        self.log_limit = max_entries;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn take_logs(&mut self) -> Vec<String> {
        self.logs.drain(..).collect()
    }

    pub(crate) fn event_line(&mut self, line: impl FnOnce() -> String) {
        if self.enabled && self.events {
            self.line(line());
        }
    }

    pub(crate) fn timer_line(&mut self, line: impl FnOnce() -> String) {
        if self.enabled && self.timers {
            self.line(line());
        }
    }

    fn line(&mut self, line: String) {
        if self.forward {
            tracing::debug!(target: "storefront_widgets", "{line}");
        }
        if self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }
}
