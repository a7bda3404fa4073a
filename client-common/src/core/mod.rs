use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, atomic::{AtomicU64, Ordering}},
    time::Duration,
};
use derivative::Derivative;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, trace};

use common::{
    indication::{Advisory, Indication, IndicationState, Presenter},
    range::Exposure,
    strength::{StrengthPolicy, StrengthVerdict},
};

use crate::{config::Config, hibp::{RangeSource, check_exposure}};

mod token;
pub use token::CheckToken;

/// Where the password being typed lives.
pub trait TextSource: Send + Sync {
    fn current_text(&self) -> String;
}

impl TextSource for watch::Receiver<String> {
    fn current_text(&self) -> String {
        self.borrow().clone()
    }
}

/// Where results go. Called with the orchestrator's display lock held, so it must
/// not call back into the [`Checker`].
pub trait RenderSink: Send + Sync {
    fn render(&self, state: IndicationState, advisories: &[Advisory]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The input changed during the debounce delay, nothing was looked up.
    Superseded,
    /// The input changed while the lookup was in flight, the result was dropped.
    Stale,
    Rendered(IndicationState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub exposure: Exposure,
    pub verdict: StrengthVerdict,
    pub indication: Indication,
}

/// One undebounced check. `None` for an empty password, which is never looked up.
///
/// The lookup and the strength classification run concurrently.
pub async fn check_once(source: &dyn RangeSource, policy: &StrengthPolicy, presenter: &Presenter, password: &str) -> Option<CheckReport> {
    if password.is_empty() {
        return None;
    }

    let (exposure, verdict) = tokio::join!(
        check_exposure(source, password),
        async { policy.classify(password) },
    );
    let indication = presenter.present(exposure, &verdict);

    Some(CheckReport { exposure, verdict, indication })
}

#[derive(Debug)]
enum Phase {
    Idle,
    Pending(CheckToken),
}

#[derive(Debug)]
struct View {
    phase: Phase,
    shown: IndicationState,
}

#[derive(Derivative)]
#[derivative(Debug)]
struct Inner {
    #[derivative(Debug="ignore")]
    source: Arc<dyn RangeSource>,
    #[derivative(Debug="ignore")]
    input: Box<dyn TextSource>,
    #[derivative(Debug="ignore")]
    sink: Arc<dyn RenderSink>,
    policy: StrengthPolicy,
    presenter: Presenter,
    delay: Duration,
    next_token_id: AtomicU64,
    view: Mutex<View>,
}

/// Debounces keystrokes into checks and makes sure only a result for the text
/// currently in the input is ever rendered.
///
/// Nothing is ever cancelled: every check compares its bound text with the live
/// input after the debounce delay and again once its lookup resolved, and quietly
/// gives up if they differ. The final comparison and the render happen under the
/// same lock, so two checks can't interleave their renders.
#[derive(Debug, Clone)]
pub struct Checker {
    inner: Arc<Inner>,
}

impl Checker {
    pub fn new(source: Arc<dyn RangeSource>, input: impl TextSource + 'static, sink: Arc<dyn RenderSink>, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                input: Box::new(input),
                sink,
                policy: config.strength_policy(),
                presenter: config.presenter(),
                delay: config.check_delay(),
                next_token_id: AtomicU64::new(0),
                view: Mutex::new(View {
                    phase: Phase::Idle,
                    shown: IndicationState::Neutral,
                }),
            }),
        }
    }

    /// To be called after every change of the input.
    ///
    /// Must be called from within a tokio runtime. The returned handle resolves once
    /// the scheduled check rendered or gave up; dropping it doesn't cancel anything.
    pub fn on_keystroke(&self) -> Option<JoinHandle<CheckOutcome>> {
        let text = self.inner.input.current_text();

        if text.is_empty() {
            let mut view = self.inner.lock_view();
            view.phase = Phase::Idle;
            view.shown = IndicationState::Neutral;
            self.inner.sink.render(IndicationState::Neutral, &[]);
            trace!("input cleared");
            return None;
        }

        let token = CheckToken::new(self.inner.next_token_id.fetch_add(1, Ordering::Relaxed), text);
        trace!(token = token.id(), "check scheduled");
        self.inner.lock_view().phase = Phase::Pending(token.clone());

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(inner.resolve(token)))
    }

    /// What was rendered last.
    pub fn displayed(&self) -> IndicationState {
        self.inner.lock_view().shown
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.lock_view().phase, Phase::Pending(_))
    }
}

impl Inner {
    fn lock_view(&self) -> MutexGuard<'_, View> {
        // the view is always left consistent, a panicking sink doesn't change that
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn resolve(self: Arc<Self>, token: CheckToken) -> CheckOutcome {
        tokio::time::sleep(self.delay).await;

        if !token.is_current(&self.input.current_text()) {
            trace!(token = token.id(), "superseded before lookup");
            return CheckOutcome::Superseded;
        }

        let report = check_once(self.source.as_ref(), &self.policy, &self.presenter, token.text()).await;

        let mut view = self.lock_view();
        let report = match report {
            Some(report) if token.is_current(&self.input.current_text()) => report,
            _ => {
                debug!(token = token.id(), "dropping result of a stale check");
                return CheckOutcome::Stale;
            }
        };

        let Indication { state, advisories } = report.indication;
        self.sink.render(state, &advisories);
        view.shown = state;
        if matches!(&view.phase, Phase::Pending(pending) if pending.id() == token.id()) {
            view.phase = Phase::Idle;
        }
        trace!(token = token.id(), %state, "rendered");

        CheckOutcome::Rendered(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::{HashMap, HashSet}, sync::atomic::AtomicUsize};
    use async_trait::async_trait;
    use common::hash::{HashPrefix, PasswordDigest};
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    use crate::mocked::MockedRangeSource;

    fn prefix_of(password: &str) -> String {
        PasswordDigest::of(password).split().0.as_str().to_owned()
    }

    #[derive(Default)]
    struct ScriptedSource {
        latencies: HashMap<String, Duration>,
        failing: HashSet<String>,
        records: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn slow(mut self, password: &str, latency: Duration) -> Self {
            self.latencies.insert(prefix_of(password), latency);
            self
        }

        fn failing(mut self, password: &str) -> Self {
            self.failing.insert(prefix_of(password));
            self
        }

        fn leaked(mut self, password: &str, count: u64) -> Self {
            let (prefix, suffix) = PasswordDigest::of(password).split();
            self.records.insert(prefix.as_str().to_owned(), format!("{}:{}", suffix.as_str(), count));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RangeSource for ScriptedSource {
        async fn get_range(&self, prefix: &HashPrefix) -> common::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = self.latencies.get(prefix.as_str()) {
                sleep(*latency).await;
            }
            if self.failing.contains(prefix.as_str()) {
                return Err(common::Error::NetworkFailure(eyre::eyre!("connection reset")));
            }
            Ok(self.records.get(prefix.as_str()).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        renders: Mutex<Vec<(IndicationState, Vec<String>)>>,
    }

    impl RecordingSink {
        fn renders(&self) -> Vec<(IndicationState, Vec<String>)> {
            self.renders.lock().unwrap().clone()
        }
    }

    impl RenderSink for RecordingSink {
        fn render(&self, state: IndicationState, advisories: &[Advisory]) {
            self.renders.lock().unwrap().push((state, advisories.iter().map(ToString::to_string).collect()));
        }
    }

    struct Harness {
        input: watch::Sender<String>,
        checker: Checker,
        source: Arc<ScriptedSource>,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new(source: ScriptedSource) -> Self {
            let (input, rx) = watch::channel(String::new());
            let source = Arc::new(source);
            let sink = Arc::new(RecordingSink::default());
            let checker = Checker::new(source.clone(), rx, sink.clone(), &Config::default());
            Self { input, checker, source, sink }
        }

        fn type_text(&self, text: &str) -> Option<JoinHandle<CheckOutcome>> {
            self.input.send_replace(text.to_owned());
            self.checker.on_keystroke()
        }
    }

    fn render(state: IndicationState, advisories: &[&str]) -> (IndicationState, Vec<String>) {
        (state, advisories.iter().map(|s| s.to_string()).collect())
    }

    const TOO_SHORT: &str = "The password should include at least 8 characters";

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_renders_only_the_last_value() {
        let h = Harness::new(ScriptedSource::default());

        let a = h.type_text("a").unwrap();
        sleep(Duration::from_millis(100)).await;
        let ab = h.type_text("ab").unwrap();
        sleep(Duration::from_millis(100)).await;
        let abc = h.type_text("abc").unwrap();
        assert!(h.checker.is_pending());

        assert_eq!(a.await.unwrap(), CheckOutcome::Superseded);
        assert_eq!(ab.await.unwrap(), CheckOutcome::Superseded);
        assert_eq!(abc.await.unwrap(), CheckOutcome::Rendered(IndicationState::Warning));

        assert_eq!(h.source.calls(), 1);
        assert_eq!(h.sink.renders(), vec![render(IndicationState::Warning, &["No leaks detected", TOO_SHORT])]);
        assert_eq!(h.checker.displayed(), IndicationState::Warning);
        assert!(!h.checker.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_for_an_older_value_is_dropped() {
        let h = Harness::new(ScriptedSource::default().slow("a", Duration::from_secs(1)));

        let a = h.type_text("a").unwrap();
        sleep(Duration::from_millis(300)).await;
        // "a" settled, its lookup is now in flight
        assert_eq!(h.source.calls(), 1);

        let ab = h.type_text("ab").unwrap();
        sleep(Duration::from_millis(100)).await;
        let abc = h.type_text("abc").unwrap();

        assert_eq!(abc.await.unwrap(), CheckOutcome::Rendered(IndicationState::Warning));
        assert_eq!(ab.await.unwrap(), CheckOutcome::Superseded);
        assert_eq!(a.await.unwrap(), CheckOutcome::Stale);

        assert_eq!(h.source.calls(), 2);
        assert_eq!(h.sink.renders(), vec![render(IndicationState::Warning, &["No leaks detected", TOO_SHORT])]);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_responses() {
        // the older lookup is slower and resolves last
        let h = Harness::new(ScriptedSource::default()
            .slow("password1", Duration::from_secs(2))
            .slow("password12", Duration::from_millis(10))
            .leaked("password1", 2_413_945));

        let first = h.type_text("password1").unwrap();
        sleep(Duration::from_millis(500)).await;
        let second = h.type_text("password12").unwrap();

        assert_eq!(second.await.unwrap(), CheckOutcome::Rendered(IndicationState::Success));
        assert_eq!(first.await.unwrap(), CheckOutcome::Stale);

        assert_eq!(h.sink.renders(), vec![render(IndicationState::Success, &["No leaks detected"])]);
        assert_eq!(h.checker.displayed(), IndicationState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_the_input_is_immediate() {
        let h = Harness::new(ScriptedSource::default().slow("abc", Duration::from_secs(1)));

        let abc = h.type_text("abc").unwrap();
        sleep(Duration::from_millis(300)).await;
        assert!(h.checker.is_pending());

        assert!(h.type_text("").is_none());
        assert!(!h.checker.is_pending());
        assert_eq!(h.checker.displayed(), IndicationState::Neutral);

        assert_eq!(abc.await.unwrap(), CheckOutcome::Stale);
        assert_eq!(h.sink.renders(), vec![render(IndicationState::Neutral, &[])]);
        assert_eq!(h.checker.displayed(), IndicationState::Neutral);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_never_hits_the_network() {
        let h = Harness::new(ScriptedSource::default());

        assert!(h.type_text("").is_none());
        sleep(Duration::from_secs(1)).await;

        assert_eq!(h.source.calls(), 0);
        assert_eq!(h.sink.renders(), vec![render(IndicationState::Neutral, &[])]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_renders_unknown_once() {
        let h = Harness::new(ScriptedSource::default().failing("correct horse"));

        let outcome = h.type_text("correct horse").unwrap().await.unwrap();

        assert_eq!(outcome, CheckOutcome::Rendered(IndicationState::Warning));
        assert_eq!(h.source.calls(), 1);
        assert_eq!(h.sink.renders(), vec![render(IndicationState::Warning, &["Error: Unable to check the password for leaks"])]);

        // no retry until the input changes again
        sleep(Duration::from_secs(10)).await;
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn few_leaks_on_a_strong_password() {
        let h = Harness::new(ScriptedSource::default().leaked("Tr0ub4dor&3", 3));

        let outcome = h.type_text("Tr0ub4dor&3").unwrap().await.unwrap();

        assert_eq!(outcome, CheckOutcome::Rendered(IndicationState::Warning));
        assert_eq!(h.sink.renders(), vec![render(IndicationState::Warning, &["A few leaks detected"])]);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_delay_is_respected() {
        let h = Harness::new(ScriptedSource::default());

        let handle = h.type_text("password1").unwrap();
        sleep(Duration::from_millis(239)).await;
        assert_eq!(h.source.calls(), 0);
        assert!(h.sink.renders().is_empty());

        assert_eq!(handle.await.unwrap(), CheckOutcome::Rendered(IndicationState::Success));
        assert_eq!(h.source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn a_later_check_keeps_the_newer_token_pending() {
        let h = Harness::new(ScriptedSource::default().slow("abcdefgh1", Duration::from_secs(1)));

        let first = h.type_text("abcdefgh1").unwrap();
        sleep(Duration::from_millis(300)).await;
        let second = h.type_text("abcdefgh12").unwrap();
        sleep(Duration::from_millis(100)).await;
        // back to the first value while its lookup is still in flight
        let third = h.type_text("abcdefgh1").unwrap();

        assert_eq!(first.await.unwrap(), CheckOutcome::Rendered(IndicationState::Success));
        assert!(h.checker.is_pending());
        assert_eq!(second.await.unwrap(), CheckOutcome::Superseded);
        assert_eq!(third.await.unwrap(), CheckOutcome::Rendered(IndicationState::Success));
        assert!(!h.checker.is_pending());
    }

    #[tokio::test]
    async fn one_shot_check() {
        let source = MockedRangeSource::new().with_password("hello12345", 7);
        let policy = StrengthPolicy::default();
        let presenter = Presenter::default();

        assert!(check_once(&source, &policy, &presenter, "").await.is_none());

        let report = check_once(&source, &policy, &presenter, "hello12345").await.unwrap();
        assert_eq!(report.exposure, Exposure::Count(7));
        assert!(!report.verdict.is_weak());
        assert_eq!(report.indication.state, IndicationState::Warning);
        assert_eq!(report.indication.advisories.len(), 1);
    }
}
