//! JSON log lines keyed by trace id, written to the Worker console.

use serde::Serialize;
use worker::console_log;

/// Log levels for structured logging
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Structured log entry
#[derive(Debug, Serialize)]
pub struct LogEntry<'a> {
    pub level: LogLevel,
    pub trace_id: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_size: Option<usize>,
    pub timestamp_ms: i64,
}

impl<'a> LogEntry<'a> {
    pub fn new(level: LogLevel, trace_id: &'a str, message: &'a str) -> Self {
        Self {
            level,
            trace_id,
            message,
            method: None,
            network: None,
            client_ip: None,
            latency_ms: None,
            status: None,
            error_code: None,
            error_message: None,
            request_size: None,
            timestamp_ms: crate::types::now_ms(),
        }
    }

    pub fn with_method(mut self, method: &'a str) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_network(mut self, network: &'a str) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_client_ip(mut self, ip: &'a str) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn with_latency(mut self, latency_ms: i64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_status(mut self, status: &'a str) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_error(mut self, code: i32, message: &'a str) -> Self {
        self.error_code = Some(code);
        self.error_message = Some(message);
        self
    }

    pub fn with_request_size(mut self, size: usize) -> Self {
        self.request_size = Some(size);
        self
    }

    /// Output the log entry as JSON
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            console_log!("{}", json);
        }
    }
}

/// Per-request logging state for one JSON-RPC call.
pub struct RequestContext<'a> {
    pub trace_id: &'a str,
    pub client_ip: &'a str,
    pub network: Option<&'a str>,
    pub start_ms: i64,
}

impl<'a> RequestContext<'a> {
    pub fn new(trace_id: &'a str, client_ip: &'a str, start_ms: i64) -> Self {
        Self {
            trace_id,
            client_ip,
            network: None,
            start_ms,
        }
    }

    pub fn with_network(mut self, network: Option<&'a str>) -> Self {
        self.network = network;
        self
    }

    fn entry<'b>(&'b self, level: LogLevel, message: &'b str, method: &'b str) -> LogEntry<'b> {
        let mut entry = LogEntry::new(level, self.trace_id, message)
            .with_method(method)
            .with_client_ip(self.client_ip);
        if let Some(network) = self.network {
            entry = entry.with_network(network);
        }
        entry
    }

    pub fn log_request_start(&self, method: &str, request_size: usize) {
        self.entry(LogLevel::Info, "request_start", method)
            .with_request_size(request_size)
            .emit();
    }

    pub fn log_request_complete(&self, method: &str) {
        let latency = crate::types::now_ms().saturating_sub(self.start_ms);
        self.entry(LogLevel::Info, "request_complete", method)
            .with_latency(latency)
            .with_status("success")
            .emit();
    }

    pub fn log_request_error(&self, method: &str, error_code: i32, error_message: &str) {
        let latency = crate::types::now_ms().saturating_sub(self.start_ms);
        self.entry(LogLevel::Error, "request_error", method)
            .with_latency(latency)
            .with_status("error")
            .with_error(error_code, error_message)
            .emit();
    }
}

/// Convenience macros for structured logging
#[macro_export]
macro_rules! log_warn {
    ($trace_id:expr, $message:expr $(, $field:ident = $value:expr)* $(,)?) => {
        $crate::log_entry!(Warn, $trace_id, $message $(, $field = $value)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($trace_id:expr, $message:expr $(, $field:ident = $value:expr)* $(,)?) => {
        $crate::log_entry!(Error, $trace_id, $message $(, $field = $value)*)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_entry {
    ($level:ident, $trace_id:expr, $message:expr $(, $field:ident = $value:expr)*) => {{
        #[allow(unused_mut)]
        let mut entry = $crate::infra::structured_log::LogEntry::new(
            $crate::infra::structured_log::LogLevel::$level,
            $trace_id,
            $message,
        );
        $(
            entry = entry.$field($value);
        )*
        entry.emit()
    }};
}
