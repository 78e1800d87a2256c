//! Session-wide flags coordinating stepping, attach/shutdown lifecycle,
//! and smart-step bookkeeping.

use tokio::sync::oneshot;

/// What the next `Debugger.paused` notification should report as its stop
/// reason, set by the command that's expected to induce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStopReason {
    Step,
    UserRequest,
}

impl ExpectedStopReason {
    pub fn as_dap_reason(self) -> &'static str {
        match self {
            ExpectedStopReason::Step => "step",
            ExpectedStopReason::UserRequest => "user_request",
        }
    }
}

#[derive(Default)]
pub struct SessionFlags {
    pub attach_mode: bool,
    pub client_attached: bool,
    pub has_terminated: bool,
    pub in_shutdown: bool,

    pub expecting_resumed_event: bool,
    pub expecting_stop_reason: Option<ExpectedStopReason>,

    pub smart_step: bool,
    pub smart_step_count: u32,

    /// The single-slot rendezvous gating `Stopped` emission until the
    /// response to the step/continue/pause that induced it has been sent.
    /// Reassigned per step: a fresh `(sender, receiver)` pair is created
    /// when a step is issued, and the sender is consumed exactly once when
    /// the response is written.
    current_step: Option<oneshot::Receiver<()>>,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a new step/continue/pause request, returning the
    /// sender the caller must fire once the DAP response has been written.
    ///
    /// `set_resumed` is `false` only for `pause()`: a user-initiated pause
    /// sets `expectingStopReason` but not `expectingResumedEvent`, so a
    /// `Debugger.resumed` following it is *not* suppressed and the editor
    /// still sees a `Continued`.
    pub fn begin_step(&mut self, set_resumed: bool, expected: Option<ExpectedStopReason>) -> oneshot::Sender<()> {
        self.expecting_resumed_event = set_resumed;
        self.expecting_stop_reason = expected;
        let (tx, rx) = oneshot::channel();
        self.current_step = Some(rx);
        tx
    }

    /// Wait (bounded by 300 ms) for the in-flight step's response to have
    /// been sent. Returns immediately if no step is in flight.
    pub async fn await_step_completion(&mut self) {
        if let Some(rx) = self.current_step.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_millis(300), rx).await;
        }
    }

    /// Consume and clear the expected stop reason.
    pub fn take_expected_stop_reason(&mut self) -> Option<ExpectedStopReason> {
        self.expecting_stop_reason.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn await_step_completion_returns_once_response_sent() {
        let mut flags = SessionFlags::new();
        let tx = flags.begin_step(true, Some(ExpectedStopReason::Step));
        tx.send(()).unwrap();
        flags.await_step_completion().await;
        assert!(flags.current_step.is_none());
    }

    #[tokio::test]
    async fn await_step_completion_times_out_without_hanging_forever() {
        let mut flags = SessionFlags::new();
        let _tx = flags.begin_step(false, Some(ExpectedStopReason::UserRequest));
        flags.await_step_completion().await;
    }

    #[test]
    fn begin_step_sets_expecting_resumed_and_reason() {
        let mut flags = SessionFlags::new();
        flags.begin_step(true, Some(ExpectedStopReason::Step));
        assert!(flags.expecting_resumed_event);
        assert_eq!(flags.take_expected_stop_reason(), Some(ExpectedStopReason::Step));
    }

    #[test]
    fn pause_sets_stop_reason_without_expecting_resumed() {
        let mut flags = SessionFlags::new();
        flags.begin_step(false, Some(ExpectedStopReason::UserRequest));
        assert!(!flags.expecting_resumed_event);
        assert_eq!(flags.take_expected_stop_reason(), Some(ExpectedStopReason::UserRequest));
    }
}
