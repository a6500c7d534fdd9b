// scout-core/src/executor.rs

//! Bounded concurrent execution of independent invocations.

use crate::errors::InvocationError;
use crate::invocation::Invocation;
use crate::tools::process::{ProcessRunner, RunFailure};
use crate::tools::CommandOutput;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Which exit codes count as success for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// 0 and 1; ripgrep exits 1 when nothing matched.
    ZeroOrNoMatches,
    ZeroOnly,
}

impl ExitPolicy {
    pub fn accepts(&self, code: i32) -> bool {
        match self {
            ExitPolicy::ZeroOrNoMatches => code == 0 || code == 1,
            ExitPolicy::ZeroOnly => code == 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub invocation: Invocation,
    pub outcome: Result<CommandOutput, InvocationError>,
}

impl InvocationReport {
    pub fn stdout(&self) -> Option<&str> {
        self.outcome.as_ref().ok().map(|output| output.stdout.as_str())
    }
}

pub struct Executor {
    runner: Arc<dyn ProcessRunner>,
    parallelism: usize,
    timeout: Duration,
}

impl Executor {
    pub fn new(runner: Arc<dyn ProcessRunner>, parallelism: usize, timeout: Duration) -> Self {
        Self {
            runner,
            parallelism: parallelism.max(1),
            timeout,
        }
    }

    /// Runs every invocation with at most `parallelism` in flight. Reports
    /// come back in input order whatever order the processes finish in, and
    /// one invocation failing never stops the others.
    pub async fn run_all(&self, invocations: Vec<Invocation>, policy: ExitPolicy) -> Vec<InvocationReport> {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut handles = Vec::with_capacity(invocations.len());

        for invocation in invocations {
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&self.runner);
            let timeout = self.timeout;
            let task_invocation = invocation.clone();
            let handle = tokio::spawn(async move {
                // Never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                runner.run(&task_invocation, timeout).await
            });
            handles.push((invocation, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (invocation, handle) in handles {
            let joined = handle
                .await
                .unwrap_or_else(|e| Err(RunFailure::Launch(format!("invocation task failed: {}", e))));
            let outcome = self.classify(&invocation, joined, policy);
            reports.push(InvocationReport { invocation, outcome });
        }
        reports
    }

    fn classify(
        &self,
        invocation: &Invocation,
        result: Result<CommandOutput, RunFailure>,
        policy: ExitPolicy,
    ) -> Result<CommandOutput, InvocationError> {
        let program = invocation.program.clone();
        let pattern = invocation.pattern.as_ref().map(|p| p.value.clone());
        match result {
            Ok(output) if policy.accepts(output.status) => {
                debug!(program = %program, status = output.status, "Invocation finished");
                Ok(output)
            }
            Ok(output) => {
                warn!(program = %program, status = output.status, "Invocation exited with a failure code");
                Err(InvocationError::Exit {
                    program,
                    pattern,
                    code: output.status,
                    stderr: output.stderr.trim().to_string(),
                })
            }
            Err(RunFailure::Launch(message)) => Err(InvocationError::Launch {
                program,
                pattern,
                message,
            }),
            Err(RunFailure::Timeout) => Err(InvocationError::Timeout {
                program,
                pattern,
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Pattern, PatternKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Finishes invocations in reverse order of submission and tracks peak concurrency.
    struct ReversingRunner {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ProcessRunner for ReversingRunner {
        async fn run(&self, invocation: &Invocation, _timeout: Duration) -> Result<CommandOutput, RunFailure> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let index: u64 = invocation.args[0].parse().unwrap();
            tokio::time::sleep(Duration::from_millis(50 - index * 10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match index {
                2 => Ok(CommandOutput {
                    status: 2,
                    stdout: String::new(),
                    stderr: "regex parse error\n".to_string(),
                }),
                3 => Err(RunFailure::Timeout),
                _ => Ok(CommandOutput {
                    status: if index == 1 { 1 } else { 0 },
                    stdout: format!("out-{}", index),
                    stderr: String::new(),
                }),
            }
        }
    }

    fn invocation(index: usize) -> Invocation {
        Invocation {
            program: "rg".to_string(),
            args: vec![index.to_string()],
            cwd: std::env::temp_dir(),
            pattern: Some(Pattern::new(PatternKind::Fixed, format!("p{}", index))),
        }
    }

    #[tokio::test]
    async fn reports_keep_input_order_and_isolate_failures() {
        let runner = Arc::new(ReversingRunner {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let executor = Executor::new(runner.clone(), 2, Duration::from_secs(1));
        let reports = executor
            .run_all((0..5).map(invocation).collect(), ExitPolicy::ZeroOrNoMatches)
            .await;

        assert_eq!(reports.len(), 5);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.invocation.args[0], i.to_string());
        }
        assert_eq!(reports[0].stdout(), Some("out-0"));
        assert_eq!(reports[1].stdout(), Some("out-1"));
        assert_eq!(
            reports[2].outcome,
            Err(InvocationError::Exit {
                program: "rg".to_string(),
                pattern: Some("p2".to_string()),
                code: 2,
                stderr: "regex parse error".to_string(),
            })
        );
        assert!(reports[3].outcome.as_ref().unwrap_err().is_timeout());
        assert_eq!(reports[4].stdout(), Some("out-4"));
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_only_policy_rejects_no_match_code() {
        let runner = Arc::new(ReversingRunner {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let executor = Executor::new(runner, 4, Duration::from_secs(1));
        let reports = executor.run_all(vec![invocation(1)], ExitPolicy::ZeroOnly).await;
        assert!(matches!(reports[0].outcome, Err(InvocationError::Exit { code: 1, .. })));
    }

    #[test]
    fn exit_policies() {
        assert!(ExitPolicy::ZeroOrNoMatches.accepts(1));
        assert!(!ExitPolicy::ZeroOrNoMatches.accepts(2));
        assert!(!ExitPolicy::ZeroOnly.accepts(1));
    }
}
