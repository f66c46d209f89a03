//! Per-endpoint interaction state machine and the session outcome table.
//!
//! The [`InteractionController`] owns all mutable session state: which
//! payment option is currently being configured, the in-progress field
//! values, the latest outcome per resource URL, and the set of URLs
//! with an attempt in flight. State is guarded by a mutex that is only
//! taken at transition points and never held across an await, so
//! attempts against distinct URLs interleave freely while attempts
//! against the same URL are single-flight.
//!
//! Transitions per interaction:
//!
//! ```text
//! Idle --trigger (inputs needed)--> Collecting --submit--> Executing --> Resulted
//! Idle --trigger (no inputs)------> Executing --> Resulted
//! Collecting --cancel--> Idle
//! Resulted --new_request--> Collecting    Resulted --close--> Idle
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;
use x402_probe_types::PaymentOption;

use crate::executor::{RequestExecutor, RequestOutcome};
use crate::schema::{self, ResolvedInputs};

/// Display state of the current interaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Input collection in progress for the focused option.
    Collecting,
    /// An attempt for the focused option is in flight.
    Executing,
    /// Terminal display state holding the focused attempt's outcome.
    Resulted,
}

/// Result of triggering an endpoint.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The option needs user input; the session is now Collecting.
    Collecting(ResolvedInputs),
    /// The option needed no input and was executed directly.
    Executed(RequestOutcome),
    /// An attempt for this URL is already in flight; nothing was started.
    Busy,
}

/// Result of submitting collected inputs.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Required fields are missing; the session stays in Collecting.
    MissingRequired(Vec<String>),
    Executed(RequestOutcome),
    /// An attempt for this URL is already in flight; nothing was started.
    Busy,
    /// There is no interaction being collected.
    NothingToSubmit,
}

/// The interaction currently being configured or displayed.
struct Focus {
    option: PaymentOption,
    inputs: ResolvedInputs,
    values: HashMap<String, String>,
    outcome: Option<RequestOutcome>,
}

#[derive(Default)]
struct SessionState {
    state: InteractionState,
    focus: Option<Focus>,
    /// Latest attempt per resource URL. History is not kept.
    outcomes: HashMap<Url, RequestOutcome>,
    /// Resource URLs with an attempt in flight; the UI disables their
    /// triggers while present.
    in_flight: HashSet<Url>,
}

/// Owns the session state and drives interactions end to end.
pub struct InteractionController {
    executor: RequestExecutor,
    session: Mutex<SessionState>,
}

impl InteractionController {
    pub fn new(executor: RequestExecutor) -> Self {
        Self {
            executor,
            session: Mutex::new(SessionState::default()),
        }
    }

    /// Starts an interaction for `option`: prompts for inputs when the
    /// schema asks for any, executes immediately otherwise.
    #[instrument(name = "probe.trigger", skip(self, option), fields(url = %option.resource))]
    pub async fn trigger(&self, option: &PaymentOption) -> TriggerOutcome {
        let resolved = schema::resolve(option);
        if resolved.needs_input() {
            let mut session = self.session.lock().unwrap();
            session.focus = Some(Focus {
                option: option.clone(),
                inputs: resolved.clone(),
                values: HashMap::new(),
                outcome: None,
            });
            session.state = InteractionState::Collecting;
            return TriggerOutcome::Collecting(resolved);
        }
        match self.run(option.clone(), HashMap::new()).await {
            Some(outcome) => TriggerOutcome::Executed(outcome),
            None => TriggerOutcome::Busy,
        }
    }

    /// Records one in-progress field value. Ignored outside Collecting.
    pub fn set_value(&self, name: &str, value: &str) {
        let mut session = self.session.lock().unwrap();
        if session.state != InteractionState::Collecting {
            return;
        }
        if let Some(focus) = session.focus.as_mut() {
            focus.values.insert(name.to_string(), value.to_string());
        }
    }

    /// Submits the collected values for the focused option.
    ///
    /// Required fields are enforced here, at the collection boundary:
    /// submission with missing values does not leave Collecting.
    #[instrument(name = "probe.submit", skip(self))]
    pub async fn submit(&self) -> SubmitOutcome {
        let (option, values) = {
            let session = self.session.lock().unwrap();
            if session.state != InteractionState::Collecting {
                return SubmitOutcome::NothingToSubmit;
            }
            let Some(focus) = session.focus.as_ref() else {
                return SubmitOutcome::NothingToSubmit;
            };
            let missing = focus.inputs.missing_required(&focus.values);
            if !missing.is_empty() {
                debug!(?missing, "Submission blocked on required fields");
                return SubmitOutcome::MissingRequired(missing);
            }
            (focus.option.clone(), focus.values.clone())
        };
        match self.run(option, values).await {
            Some(outcome) => SubmitOutcome::Executed(outcome),
            None => SubmitOutcome::Busy,
        }
    }

    /// Discards the in-progress values and returns to Idle.
    pub fn cancel(&self) {
        let mut session = self.session.lock().unwrap();
        if session.state == InteractionState::Collecting {
            session.focus = None;
            session.state = InteractionState::Idle;
        }
    }

    /// Leaves a Resulted interaction and returns to Idle. Collecting is
    /// left through [`cancel`](Self::cancel), and an in-flight attempt
    /// is never cancelled; it still records its outcome.
    pub fn close(&self) {
        let mut session = self.session.lock().unwrap();
        if session.state == InteractionState::Resulted {
            session.focus = None;
            session.state = InteractionState::Idle;
        }
    }

    /// From Resulted back to Collecting: values cleared, the focused
    /// outcome discarded.
    pub fn new_request(&self) {
        let mut session = self.session.lock().unwrap();
        if session.state != InteractionState::Resulted {
            return;
        }
        if let Some(focus) = session.focus.as_mut() {
            focus.values.clear();
            focus.outcome = None;
            session.state = InteractionState::Collecting;
        }
    }

    pub fn state(&self) -> InteractionState {
        self.session.lock().unwrap().state
    }

    /// Whether an attempt for `url` is in flight. The UI disables the
    /// trigger for that URL while this is true.
    pub fn is_in_flight(&self, url: &Url) -> bool {
        self.session.lock().unwrap().in_flight.contains(url)
    }

    /// Latest recorded outcome for `url`.
    pub fn outcome_for(&self, url: &Url) -> Option<RequestOutcome> {
        self.session.lock().unwrap().outcomes.get(url).cloned()
    }

    /// Outcome of the focused interaction, once Resulted.
    pub fn focused_outcome(&self) -> Option<RequestOutcome> {
        self.session
            .lock()
            .unwrap()
            .focus
            .as_ref()
            .and_then(|focus| focus.outcome.clone())
    }

    /// Probes an arbitrary URL with a plain GET, outside any catalog
    /// entry: no input collection and no modal state. Shares the
    /// single-flight guard and the outcome table with catalog attempts.
    /// Returns `None` when an attempt for `url` is already in flight.
    #[instrument(name = "probe.url", skip(self), fields(%url))]
    pub async fn probe_url(&self, url: &Url) -> Option<RequestOutcome> {
        {
            let mut session = self.session.lock().unwrap();
            if !session.in_flight.insert(url.clone()) {
                debug!(%url, "Attempt already in flight, ignoring trigger");
                return None;
            }
        }

        let outcome = self.executor.execute_url(url).await;

        let mut session = self.session.lock().unwrap();
        session.in_flight.remove(url);
        session.outcomes.insert(url.clone(), outcome.clone());
        Some(outcome)
    }

    /// Runs one attempt under the single-flight guard. Returns `None`
    /// without executing when the URL already has an attempt in flight.
    ///
    /// Only an attempt that owns the session display, a submit for the
    /// focused option or a direct trigger from Idle, drives the state
    /// machine; any other attempt completes in the background and
    /// touches nothing but the outcome table.
    async fn run(
        &self,
        option: PaymentOption,
        values: HashMap<String, String>,
    ) -> Option<RequestOutcome> {
        let url = option.resource.clone();
        let owns_display;
        {
            let mut session = self.session.lock().unwrap();
            if !session.in_flight.insert(url.clone()) {
                debug!(%url, "Attempt already in flight, ignoring trigger");
                return None;
            }
            owns_display = match session.focus.as_ref() {
                Some(focus) => focus.option.resource == url,
                None => session.state == InteractionState::Idle,
            };
            if owns_display {
                session.state = InteractionState::Executing;
            }
        }

        let outcome = self.executor.execute(&option, &values).await;

        let mut session = self.session.lock().unwrap();
        session.in_flight.remove(&url);
        session.outcomes.insert(url.clone(), outcome.clone());
        // Surface the result on the focused interaction unless the user
        // already navigated away.
        if owns_display && session.state == InteractionState::Executing {
            session.state = InteractionState::Resulted;
            if let Some(focus) = session.focus.as_mut() {
                if focus.option.resource == url {
                    focus.outcome = Some(outcome.clone());
                }
            }
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{FetchFailure, PaidFetch, ProbeRequest, ProbeResponse};
    use async_trait::async_trait;
    use http::HeaderMap;
    use http::header::CONTENT_TYPE;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Stub fetch that counts invocations, records requests, and can
    /// hold responses until released. Each response body carries the
    /// one-based call number.
    struct GatedFetch {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        seen: Mutex<Vec<ProbeRequest>>,
    }

    impl GatedFetch {
        fn immediate() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: None,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn gated(gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Some(gate),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaidFetch for GatedFetch {
        async fn fetch(&self, request: ProbeRequest) -> Result<ProbeResponse, FetchFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
            Ok(ProbeResponse {
                status: 200,
                headers,
                body: format!("{{\"call\": {call}}}"),
            })
        }
    }

    fn controller_with(fetch: Arc<GatedFetch>) -> InteractionController {
        let executor = RequestExecutor::new(
            fetch,
            Url::parse("https://probe.example.com").unwrap(),
        );
        InteractionController::new(executor)
    }

    fn free_get_option(url: &str) -> PaymentOption {
        serde_json::from_value(serde_json::json!({
            "asset": "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
            "maxAmountRequired": "0",
            "network": "base",
            "payTo": "0x0000000000000000000000000000000000000001",
            "resource": url,
            "scheme": "exact"
        }))
        .unwrap()
    }

    fn paid_post_option(url: &str) -> PaymentOption {
        serde_json::from_value(serde_json::json!({
            "asset": "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
            "maxAmountRequired": "100000",
            "network": "base",
            "payTo": "0x0000000000000000000000000000000000000001",
            "resource": url,
            "scheme": "exact",
            "outputSchema": {
                "input": {
                    "method": "POST",
                    "bodyFields": {
                        "amount": { "type": "number", "required": true }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_direct_path_skips_collecting() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let option = free_get_option("https://api.example.com/free");
        assert!(option.max_amount_required.is_free());
        assert_eq!(option.max_amount_required.display_price(6), "Free");

        let outcome = controller.trigger(&option).await;
        assert!(matches!(outcome, TriggerOutcome::Executed(_)));
        assert_eq!(controller.state(), InteractionState::Resulted);
        assert_eq!(fetch.calls(), 1);

        let recorded = controller.outcome_for(&option.resource).unwrap();
        assert!(!recorded.is_error());
    }

    #[tokio::test]
    async fn test_required_field_blocks_submission() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let option = paid_post_option("https://api.example.com/paid");

        let trigger = controller.trigger(&option).await;
        assert!(matches!(trigger, TriggerOutcome::Collecting(_)));
        assert_eq!(controller.state(), InteractionState::Collecting);

        // Submitting with the required field empty must not execute.
        match controller.submit().await {
            SubmitOutcome::MissingRequired(missing) => assert_eq!(missing, ["amount"]),
            other => panic!("expected missing-required, got {other:?}"),
        }
        assert_eq!(controller.state(), InteractionState::Collecting);
        assert_eq!(fetch.calls(), 0);

        controller.set_value("amount", "5");
        let submitted = controller.submit().await;
        assert!(matches!(submitted, SubmitOutcome::Executed(_)));
        assert_eq!(controller.state(), InteractionState::Resulted);
        assert_eq!(fetch.calls(), 1);

        let request = fetch.seen.lock().unwrap().last().unwrap().clone();
        assert_eq!(request.method, "POST");
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"amount": "5"}));
    }

    #[tokio::test]
    async fn test_same_url_is_single_flight() {
        let gate = Arc::new(Notify::new());
        let fetch = GatedFetch::gated(gate.clone());
        let controller = Arc::new(controller_with(fetch.clone()));
        let option = free_get_option("https://api.example.com/slow");
        let url = option.resource.clone();

        let first = {
            let controller = controller.clone();
            let option = option.clone();
            tokio::spawn(async move { controller.trigger(&option).await })
        };
        // Wait for the first attempt to reach the fetch.
        while fetch.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(controller.is_in_flight(&url));

        // Second trigger for the same URL while in flight: no-op.
        let second = controller.trigger(&option).await;
        assert!(matches!(second, TriggerOutcome::Busy));
        assert_eq!(fetch.calls(), 1);

        gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, TriggerOutcome::Executed(_)));
        assert!(!controller.is_in_flight(&url));
        assert!(controller.outcome_for(&url).is_some());
    }

    #[tokio::test]
    async fn test_distinct_urls_run_concurrently() {
        let gate = Arc::new(Notify::new());
        let fetch = GatedFetch::gated(gate.clone());
        let controller = Arc::new(controller_with(fetch.clone()));
        let slow = free_get_option("https://api.example.com/slow");
        let other = free_get_option("https://api.example.com/other");

        let first = {
            let controller = controller.clone();
            let slow = slow.clone();
            tokio::spawn(async move { controller.trigger(&slow).await })
        };
        while fetch.calls() == 0 {
            tokio::task::yield_now().await;
        }

        // A different URL is not blocked by the slow one.
        let second = {
            let controller = controller.clone();
            let other = other.clone();
            tokio::spawn(async move { controller.trigger(&other).await })
        };
        while fetch.calls() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(controller.is_in_flight(&slow.resource));
        assert!(controller.is_in_flight(&other.resource));

        gate.notify_one();
        gate.notify_one();
        assert!(matches!(first.await.unwrap(), TriggerOutcome::Executed(_)));
        assert!(matches!(second.await.unwrap(), TriggerOutcome::Executed(_)));
        assert!(controller.outcome_for(&slow.resource).is_some());
        assert!(controller.outcome_for(&other.resource).is_some());
    }

    #[tokio::test]
    async fn test_direct_trigger_leaves_unrelated_collecting_session_alone() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let paid = paid_post_option("https://api.example.com/paid");
        let free = free_get_option("https://api.example.com/free");

        controller.trigger(&paid).await;
        controller.set_value("amount", "5");
        assert_eq!(controller.state(), InteractionState::Collecting);

        // A direct-path attempt for a different endpoint completes in
        // the background without touching the collection in progress.
        let direct = controller.trigger(&free).await;
        assert!(matches!(direct, TriggerOutcome::Executed(_)));
        assert_eq!(controller.state(), InteractionState::Collecting);
        assert!(controller.focused_outcome().is_none());
        assert!(controller.outcome_for(&free.resource).is_some());

        // The held values survive and the submission still goes through.
        let submitted = controller.submit().await;
        assert!(matches!(submitted, SubmitOutcome::Executed(_)));
        assert_eq!(controller.state(), InteractionState::Resulted);
        assert!(!controller.focused_outcome().unwrap().is_error());

        // Nor does a direct trigger displace a Resulted display.
        controller.trigger(&free).await;
        assert_eq!(controller.state(), InteractionState::Resulted);
        assert!(controller.focused_outcome().is_some());
    }

    #[tokio::test]
    async fn test_close_only_leaves_resulted() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let option = paid_post_option("https://api.example.com/paid");

        // Collecting is left through cancel, never close.
        controller.trigger(&option).await;
        controller.close();
        assert_eq!(controller.state(), InteractionState::Collecting);
        controller.cancel();
        assert_eq!(controller.state(), InteractionState::Idle);

        controller.trigger(&option).await;
        controller.set_value("amount", "5");
        controller.submit().await;
        assert_eq!(controller.state(), InteractionState::Resulted);
        controller.close();
        assert_eq!(controller.state(), InteractionState::Idle);
        assert!(controller.focused_outcome().is_none());
    }

    #[tokio::test]
    async fn test_close_is_a_no_op_while_executing() {
        let gate = Arc::new(Notify::new());
        let fetch = GatedFetch::gated(gate.clone());
        let controller = Arc::new(controller_with(fetch.clone()));
        let option = free_get_option("https://api.example.com/slow");

        let attempt = {
            let controller = controller.clone();
            let option = option.clone();
            tokio::spawn(async move { controller.trigger(&option).await })
        };
        while fetch.calls() == 0 {
            tokio::task::yield_now().await;
        }

        controller.close();
        assert_eq!(controller.state(), InteractionState::Executing);

        gate.notify_one();
        assert!(matches!(attempt.await.unwrap(), TriggerOutcome::Executed(_)));
        assert_eq!(controller.state(), InteractionState::Resulted);
        assert!(controller.outcome_for(&option.resource).is_some());
    }

    #[tokio::test]
    async fn test_url_probe_records_outcome_without_modal_state() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let url: Url = "https://api.example.com/adhoc".parse().unwrap();

        let outcome = controller.probe_url(&url).await.unwrap();
        assert!(!outcome.is_error());
        assert_eq!(controller.state(), InteractionState::Idle);
        assert!(controller.outcome_for(&url).is_some());
    }

    #[tokio::test]
    async fn test_url_probe_shares_the_single_flight_guard() {
        let gate = Arc::new(Notify::new());
        let fetch = GatedFetch::gated(gate.clone());
        let controller = Arc::new(controller_with(fetch.clone()));
        let option = free_get_option("https://api.example.com/slow");
        let url = option.resource.clone();

        let first = {
            let controller = controller.clone();
            let option = option.clone();
            tokio::spawn(async move { controller.trigger(&option).await })
        };
        while fetch.calls() == 0 {
            tokio::task::yield_now().await;
        }

        // An ad-hoc probe against the executing URL is a no-op.
        assert!(controller.probe_url(&url).await.is_none());
        assert_eq!(fetch.calls(), 1);

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), TriggerOutcome::Executed(_)));
    }

    #[tokio::test]
    async fn test_latest_outcome_overwrites_previous() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let option = free_get_option("https://api.example.com/free");

        controller.trigger(&option).await;
        controller.close();
        controller.trigger(&option).await;

        // The table holds only the latest attempt, not history.
        assert_eq!(fetch.calls(), 2);
        let recorded = controller.outcome_for(&option.resource).unwrap();
        match recorded {
            RequestOutcome::Completed { data, .. } => {
                assert_eq!(data, serde_json::json!({"call": 2}));
            }
            other => panic!("expected completed outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_values() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let option = paid_post_option("https://api.example.com/paid");

        controller.trigger(&option).await;
        controller.set_value("amount", "5");
        controller.cancel();
        assert_eq!(controller.state(), InteractionState::Idle);
        assert_eq!(fetch.calls(), 0);

        // A fresh trigger starts with empty values again.
        controller.trigger(&option).await;
        match controller.submit().await {
            SubmitOutcome::MissingRequired(missing) => assert_eq!(missing, ["amount"]),
            other => panic!("expected missing-required, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_request_clears_prior_result() {
        let fetch = GatedFetch::immediate();
        let controller = controller_with(fetch.clone());
        let option = paid_post_option("https://api.example.com/paid");

        controller.trigger(&option).await;
        controller.set_value("amount", "5");
        controller.submit().await;
        assert_eq!(controller.state(), InteractionState::Resulted);
        assert!(controller.focused_outcome().is_some());

        controller.new_request();
        assert_eq!(controller.state(), InteractionState::Collecting);
        assert!(controller.focused_outcome().is_none());
        match controller.submit().await {
            SubmitOutcome::MissingRequired(missing) => assert_eq!(missing, ["amount"]),
            other => panic!("expected missing-required, got {other:?}"),
        }
    }
}
