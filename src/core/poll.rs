//! Blocking process polling for mutations that return a process handle.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::core::client::{Client, PlatformResult};
use crate::core::error::{PlatformError, codes};
use crate::core::types::Process;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 40;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Polls a process until a terminal status. Terminal includes FAILED
/// and CANCELED; callers inspect `status` and `fail_reason` themselves.
pub fn poll_process(client: &dyn Client, process_id: &str) -> PlatformResult<Process> {
    poll_process_with(client, process_id, PollConfig::default())
}

pub fn poll_process_with(
    client: &dyn Client,
    process_id: &str,
    cfg: PollConfig,
) -> PlatformResult<Process> {
    for attempt in 1..=cfg.max_attempts {
        let proc = client.get_process(process_id)?;
        if proc.is_terminal() {
            return Ok(proc);
        }
        debug!(process_id, status = %proc.status, attempt, "process still running");
        if attempt < cfg.max_attempts {
            thread::sleep(cfg.interval);
        }
    }

    let ceiling = cfg.interval.as_secs() * u64::from(cfg.max_attempts);
    Err(PlatformError::new(
        codes::API_TIMEOUT,
        format!("Process {} still running after {}s", process_id, ceiling),
        "Check process status manually with zerops_process",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockClient;
    use crate::core::types::{Process, ServiceStackRef};

    fn process(status: &str) -> Process {
        Process {
            id: "proc-1".into(),
            action_name: "stack.deploy".into(),
            status: status.into(),
            service_stacks: vec![ServiceStackRef {
                id: "s1".into(),
                name: "app".into(),
            }],
            created: String::new(),
            started: None,
            finished: None,
            fail_reason: None,
        }
    }

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::ZERO,
            max_attempts: 3,
        }
    }

    #[test]
    fn test_returns_on_terminal_status() {
        let client = MockClient::new().with_process(process("FINISHED"));
        let proc = poll_process_with(&client, "proc-1", fast()).expect("poll");
        assert_eq!(proc.status, "FINISHED");
    }

    #[test]
    fn test_failed_is_terminal_not_error() {
        let client = MockClient::new().with_process(process("FAILED"));
        let proc = poll_process_with(&client, "proc-1", fast()).expect("poll");
        assert_eq!(proc.status, "FAILED");
    }

    #[test]
    fn test_times_out_when_never_terminal() {
        let client = MockClient::new().with_process(process("RUNNING"));
        let err = poll_process_with(&client, "proc-1", fast()).expect_err("timeout");
        assert_eq!(err.code, codes::API_TIMEOUT);
        assert!(err.message.contains("proc-1"));
    }

    #[test]
    fn test_propagates_lookup_error() {
        let client = MockClient::new();
        let err = poll_process_with(&client, "missing", fast()).expect_err("lookup");
        assert_eq!(err.code, codes::PROCESS_NOT_FOUND);
    }
}
