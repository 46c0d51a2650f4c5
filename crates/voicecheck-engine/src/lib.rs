//! Compares a candidate TTS take against a trusted reference recording by
//! delegating the judgement to a remote multimodal model. The pipeline is
//! encode → prompt → resilient request → decode; only the request executor
//! has interesting control flow.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use voicecheck_contracts::analysis::AnalysisResult;
use voicecheck_contracts::error::{CompareError, Result};
use voicecheck_contracts::progress::RetryProgress;
use voicecheck_contracts::request::ComparisonRequest;

pub mod decode;
pub mod encode;
pub mod executor;
pub mod gemini;
pub mod prompt;
pub mod transport;

pub use executor::RetryPolicy;
pub use gemini::GeminiTransport;
pub use transport::{Transport, WireReply};

/// One comparison pipeline around an injected transport. At most one
/// `compare` runs at a time; a second concurrent call is rejected outright
/// instead of trusting the caller to have disabled its submit button.
pub struct Comparator<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    progress: Option<UnboundedSender<RetryProgress>>,
    busy: AtomicBool,
}

impl Comparator<GeminiTransport> {
    /// Comparator backed by the real endpoint, credentials from the
    /// environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(GeminiTransport::from_env()?))
    }
}

impl<T: Transport> Comparator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            progress: None,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Where "retrying n/max" notifications go while the executor waits out
    /// a backoff. Callers that do not subscribe pay nothing.
    pub fn with_progress(mut self, sender: UnboundedSender<RetryProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Runs one full comparison. Always reaches a terminal outcome within
    /// the bounded retry budget, and always releases the busy flag on the
    /// way out, whatever the outcome.
    pub async fn compare(&self, request: &ComparisonRequest) -> Result<AnalysisResult> {
        let _guard = BusyGuard::acquire(&self.busy)?;

        if request.reference.is_empty() {
            return Err(CompareError::Input("reference audio".to_string()));
        }
        if request.candidate.is_empty() {
            return Err(CompareError::Input("candidate audio".to_string()));
        }

        let reference = encode::encode_audio(&request.reference)?;
        let candidate = encode::encode_audio(&request.candidate)?;
        let payload = gemini::build_payload(
            prompt::system_instruction(),
            &prompt::user_instruction(
                &request.character_description,
                request.reference_script.as_deref(),
            ),
            &reference,
            &candidate,
        );

        let envelope = executor::send_with_retries(
            &self.transport,
            &payload,
            &self.policy,
            self.progress.as_ref(),
        )
        .await?;
        decode::decode_analysis(&envelope)
    }
}

/// Single-flight latch. Dropping it releases the flag, so every exit path —
/// success, exhaustion, input rejection — resets it.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CompareError::Busy);
        }
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
