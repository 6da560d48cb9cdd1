use crate::invoke::InvocationOutcome;

/// Classification policy over retrieved log messages in arrival order.
/// Kept behind a trait because substring matching on free text is a
/// heuristic, not a structured signal; callers can swap in something
/// stricter without touching the orchestrator.
pub trait VerdictPolicy {
    fn classify(&self, messages: &[String]) -> InvocationOutcome;
}

/// Default heuristic: any message containing the literal marker fails the
/// run. The scan goes newest-first so the reported reason is the last
/// error the job emitted, biasing toward its final state.
#[derive(Debug, Clone)]
pub struct MarkerScanPolicy {
    marker: String,
}

impl MarkerScanPolicy {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerScanPolicy {
    fn default() -> Self {
        Self::new("ERROR")
    }
}

impl VerdictPolicy for MarkerScanPolicy {
    fn classify(&self, messages: &[String]) -> InvocationOutcome {
        for message in messages.iter().rev() {
            if message.contains(&self.marker) {
                return InvocationOutcome::Failed {
                    reason: message.clone(),
                };
            }
        }
        InvocationOutcome::Succeeded
    }
}
