use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use voicecheck_contracts::error::{CompareError, Result};
use voicecheck_contracts::progress::RetryProgress;

use crate::transport::{Transport, WireReply};

/// Bounds on the retry loop. Backoff is linear: the wait after attempt `k`
/// is `k * backoff_unit` (2s, 4s, 6s, 8s with the defaults).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
    /// Deadline for a single attempt, independent of the overall budget. A
    /// hung connection becomes a retryable failure instead of stalling the
    /// whole loop.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_unit: Duration::from_millis(2000),
            attempt_timeout: Duration::from_secs(90),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.max(1)
    }
}

enum AttemptOutcome {
    Success(Value),
    Retryable(String),
    Fatal(CompareError),
}

/// Log-only record of one pass through the loop.
#[derive(Debug)]
struct RequestAttempt {
    number: u32,
    outcome: &'static str,
    wait_before_next_ms: Option<u64>,
}

/// Delivers one logical request, absorbing transient unavailability.
///
/// Each attempt is an independent call with the identical payload; nothing
/// but the attempt counter carries across attempts. Before every backoff
/// sleep a [`RetryProgress`] goes out through `progress` (if a caller is
/// listening), so the loop always reaches a terminal outcome within the
/// bounded attempts-times-backoff budget.
pub async fn send_with_retries<T: Transport>(
    transport: &T,
    payload: &Value,
    policy: &RetryPolicy,
    progress: Option<&UnboundedSender<RetryProgress>>,
) -> Result<Value> {
    let mut last_failure = String::new();

    for attempt in 1..=policy.max_attempts {
        match run_attempt(transport, payload, policy.attempt_timeout).await {
            AttemptOutcome::Success(envelope) => {
                let record = RequestAttempt {
                    number: attempt,
                    outcome: "success",
                    wait_before_next_ms: None,
                };
                tracing::debug!(?record, "request settled");
                return Ok(envelope);
            }
            AttemptOutcome::Fatal(err) => {
                let record = RequestAttempt {
                    number: attempt,
                    outcome: "fatal",
                    wait_before_next_ms: None,
                };
                tracing::debug!(?record, "request settled");
                return Err(err);
            }
            AttemptOutcome::Retryable(failure) => {
                last_failure = failure;
                if attempt == policy.max_attempts {
                    break;
                }
                let wait = policy.backoff_for(attempt);
                let record = RequestAttempt {
                    number: attempt,
                    outcome: "retryable",
                    wait_before_next_ms: Some(wait.as_millis() as u64),
                };
                tracing::warn!(
                    ?record,
                    max_attempts = policy.max_attempts,
                    failure = %last_failure,
                    "transient failure, backing off"
                );
                if let Some(sender) = progress {
                    // Receiver may already be gone; that is the caller's call.
                    let _ = sender.send(RetryProgress::new(attempt, policy.max_attempts));
                }
                tokio::time::sleep(wait).await;
            }
        }
    }

    Err(CompareError::Service(format!(
        "giving up after {} attempts: {last_failure}",
        policy.max_attempts
    )))
}

async fn run_attempt<T: Transport>(
    transport: &T,
    payload: &Value,
    deadline: Duration,
) -> AttemptOutcome {
    let reply = match tokio::time::timeout(deadline, transport.send(payload)).await {
        Err(_) => {
            return AttemptOutcome::Retryable(format!(
                "attempt timed out after {}s",
                deadline.as_secs()
            ))
        }
        Ok(Err(err)) => return AttemptOutcome::Retryable(error_chain_text(&err, 512)),
        Ok(Ok(reply)) => reply,
    };
    classify_reply(reply)
}

fn classify_reply(reply: WireReply) -> AttemptOutcome {
    // An embedded error field counts as a failed attempt even on a 200.
    let embedded = embedded_error_message(&reply.body);
    if reply.is_success() {
        if let Some(message) = embedded {
            return AttemptOutcome::Retryable(format!("service reported an error: {message}"));
        }
        return match serde_json::from_str::<Value>(&reply.body) {
            Ok(envelope) => AttemptOutcome::Success(envelope),
            Err(err) => AttemptOutcome::Fatal(CompareError::Decode(format!(
                "service returned an invalid JSON envelope: {err}"
            ))),
        };
    }
    let detail = embedded.unwrap_or_else(|| truncate_text(&reply.body, 512));
    let message = format!("HTTP {}: {detail}", reply.status);
    if is_retryable_status(reply.status) {
        AttemptOutcome::Retryable(message)
    } else {
        AttemptOutcome::Fatal(CompareError::Service(message))
    }
}

/// Overload and server-side trouble are worth retrying; the rest of the 4xx
/// range (bad key, malformed request) will fail identically next time, so it
/// does not get to consume the attempt budget.
fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

fn embedded_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let error = parsed.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| error.as_str().map(str::to_string))?;
    Some(message)
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use crate::transport::testing::{Scripted, ScriptedTransport};

    use super::*;

    fn overloaded() -> Scripted {
        Scripted::Reply(WireReply::new(
            503,
            r#"{"error":{"message":"The model is overloaded."}}"#,
        ))
    }

    fn ok_envelope() -> Scripted {
        Scripted::Reply(WireReply::new(200, r#"{"candidates":[]}"#))
    }

    fn payload() -> Value {
        serde_json::json!({"contents": []})
    }

    #[tokio::test(start_paused = true)]
    async fn four_transient_failures_then_success_takes_exactly_five_attempts() {
        let transport = ScriptedTransport::new(vec![
            overloaded(),
            overloaded(),
            overloaded(),
            overloaded(),
            ok_envelope(),
        ]);
        let envelope = send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap();
        assert_eq!(transport.calls(), 5);
        assert!(envelope.get("candidates").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn five_transient_failures_exhaust_the_budget_with_no_sixth_attempt() {
        let transport = ScriptedTransport::new(vec![
            overloaded(),
            overloaded(),
            overloaded(),
            overloaded(),
            overloaded(),
        ]);
        let err = send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap_err();
        assert_eq!(transport.calls(), 5);
        assert_eq!(err.kind(), "service");
        assert!(err.to_string().contains("giving up after 5 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_linear_in_the_attempt_number() {
        let transport = ScriptedTransport::new(vec![
            overloaded(),
            overloaded(),
            overloaded(),
            overloaded(),
            ok_envelope(),
        ]);
        let start = Instant::now();
        send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap();
        // 2s + 4s + 6s + 8s between the five attempts.
        assert_eq!(start.elapsed(), Duration::from_millis(20_000));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_count_against_the_same_budget() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Error("connection reset by peer".into()),
            ok_envelope(),
        ]);
        send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn embedded_error_in_a_200_is_a_failed_attempt() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Reply(WireReply::new(200, r#"{"error":{"message":"quota"}}"#)),
            ok_envelope(),
        ]);
        send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn a_400_terminates_immediately_without_spending_the_budget() {
        let transport = ScriptedTransport::new(vec![Scripted::Reply(WireReply::new(
            400,
            r#"{"error":{"message":"API key not valid"}}"#,
        ))]);
        let err = send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap_err();
        assert_eq!(transport.calls(), 1);
        assert_eq!(err.kind(), "service");
        assert!(err.to_string().contains("HTTP 400"));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test(start_paused = true)]
    async fn a_hung_attempt_times_out_and_is_retried() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang, ok_envelope()]);
        send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_goes_out_before_each_backoff_sleep() {
        let transport = ScriptedTransport::new(vec![
            overloaded(),
            overloaded(),
            overloaded(),
            overloaded(),
            ok_envelope(),
        ]);
        let (sender, mut receiver) = mpsc::unbounded_channel();
        send_with_retries(
            &transport,
            &payload(),
            &RetryPolicy::default(),
            Some(&sender),
        )
        .await
        .unwrap();
        drop(sender);

        let mut messages = Vec::new();
        while let Some(update) = receiver.recv().await {
            messages.push(update.message);
        }
        assert_eq!(
            messages,
            vec![
                "Model overloaded, retrying 1/5...",
                "Model overloaded, retrying 2/5...",
                "Model overloaded, retrying 3/5...",
                "Model overloaded, retrying 4/5...",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_envelope_json_on_a_200_is_a_decode_error_not_a_retry() {
        let transport =
            ScriptedTransport::new(vec![Scripted::Reply(WireReply::new(200, "<html>oops</html>"))]);
        let err = send_with_retries(&transport, &payload(), &RetryPolicy::default(), None)
            .await
            .unwrap_err();
        assert_eq!(transport.calls(), 1);
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn backoff_table_matches_the_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(8000));
    }
}
