//! In-memory cluster used by the unit tests.
//!
//! Members are scripted: a process exits when killed (unless told to ignore
//! signals), an armed breakpoint either panics the process immediately or on
//! the next defrag/compact call, and the peer proxy records its state so tests
//! can assert that every disruption was undone.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{ClientError, HookError, ProcessError};
use crate::traits::{
    ClientOptions, Cluster, ClusterClient, Member, PeerProxy, Process, RemoteHooks, Revision,
};

/// Exit code reported by a process that was killed or panicked.
pub(crate) const CRASH_EXIT_CODE: i32 = 2;

pub(crate) struct TestProcess {
    running: watch::Sender<bool>,
    kills: AtomicUsize,
    starts: AtomicUsize,
    failing_kills: AtomicUsize,
    ignore_kill: AtomicBool,
    fail_start: AtomicBool,
}

impl TestProcess {
    fn new(running: bool) -> Self {
        let (running, _) = watch::channel(running);
        Self {
            running,
            kills: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            failing_kills: AtomicUsize::new(0),
            ignore_kill: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
        }
    }

    pub(crate) fn crash(&self) {
        self.running.send_replace(false);
    }

    pub(crate) fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_next_kills(&self, count: usize) {
        self.failing_kills.store(count, Ordering::SeqCst);
    }

    pub(crate) fn ignore_kill(&self, ignore: bool) {
        self.ignore_kill.store(ignore, Ordering::SeqCst);
    }

    pub(crate) fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Process for TestProcess {
    fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    fn kill(&self) -> Result<(), ProcessError> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        let pending = self.failing_kills.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_kills.store(pending - 1, Ordering::SeqCst);
            return Err(ProcessError::Signal("operation not permitted".to_string()));
        }
        if !self.ignore_kill.load(Ordering::SeqCst) {
            self.crash();
        }
        Ok(())
    }

    async fn wait(&self) -> Result<(), ProcessError> {
        let mut rx = self.running.subscribe();
        let _ = rx.wait_for(|running| !*running).await;
        Err(ProcessError::UnexpectedExitCode {
            code: CRASH_EXIT_CODE,
        })
    }

    async fn start(&self) -> Result<(), ProcessError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ProcessError::Start("address already in use".to_string()));
        }
        self.running.send_replace(true);
        Ok(())
    }
}

pub(crate) struct TestHooks {
    process: Arc<TestProcess>,
    breakpoints: HashSet<String>,
    on_trigger: HashSet<String>,
    armed: Mutex<Option<String>>,
    setups: AtomicUsize,
    failing_setups: AtomicUsize,
}

impl TestHooks {
    pub(crate) fn setups(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_next_setups(&self, count: usize) {
        self.failing_setups.store(count, Ordering::SeqCst);
    }

    /// Panics the process if a trigger-only breakpoint is armed.
    fn fire(&self) -> bool {
        let armed = self.armed.lock().unwrap().take();
        if armed.is_some() {
            self.process.crash();
            return true;
        }
        false
    }
}

#[async_trait]
impl RemoteHooks for TestHooks {
    async fn setup(&self, name: &str, action: &str) -> Result<(), HookError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        let pending = self.failing_setups.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_setups.store(pending - 1, Ordering::SeqCst);
            return Err(HookError::Unreachable("connection refused".to_string()));
        }
        if !self.breakpoints.contains(name) {
            return Err(HookError::UnknownBreakpoint(name.to_string()));
        }
        if action != "panic" {
            return Err(HookError::Rejected(format!("unsupported action {action}")));
        }
        if self.on_trigger.contains(name) {
            *self.armed.lock().unwrap() = Some(name.to_string());
        } else {
            self.process.crash();
        }
        Ok(())
    }

    fn available(&self) -> HashSet<String> {
        self.breakpoints.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProxyState {
    pub tx_blackholed: bool,
    pub rx_blackholed: bool,
    pub tx_delay: Option<(Duration, Duration)>,
    pub rx_delay: Option<(Duration, Duration)>,
    pub events: Vec<&'static str>,
}

impl ProxyState {
    pub(crate) fn is_degraded(&self) -> bool {
        self.tx_blackholed || self.rx_blackholed || self.tx_delay.is_some() || self.rx_delay.is_some()
    }
}

#[derive(Default)]
pub(crate) struct TestProxy {
    state: Mutex<ProxyState>,
}

impl TestProxy {
    pub(crate) fn state(&self) -> ProxyState {
        self.state.lock().unwrap().clone()
    }

    fn update(&self, event: &'static str, f: impl FnOnce(&mut ProxyState)) {
        let mut state = self.state.lock().unwrap();
        f(&mut state);
        state.events.push(event);
    }
}

impl PeerProxy for TestProxy {
    fn blackhole_tx(&self) {
        self.update("blackhole_tx", |s| s.tx_blackholed = true);
    }

    fn blackhole_rx(&self) {
        self.update("blackhole_rx", |s| s.rx_blackholed = true);
    }

    fn unblackhole_tx(&self) {
        self.update("unblackhole_tx", |s| s.tx_blackholed = false);
    }

    fn unblackhole_rx(&self) {
        self.update("unblackhole_rx", |s| s.rx_blackholed = false);
    }

    fn delay_tx(&self, latency: Duration, jitter: Duration) {
        self.update("delay_tx", |s| s.tx_delay = Some((latency, jitter)));
    }

    fn delay_rx(&self, latency: Duration, jitter: Duration) {
        self.update("delay_rx", |s| s.rx_delay = Some((latency, jitter)));
    }

    fn undelay_tx(&self) {
        self.update("undelay_tx", |s| s.tx_delay = None);
    }

    fn undelay_rx(&self) {
        self.update("undelay_rx", |s| s.rx_delay = None);
    }
}

struct TestClient {
    hooks: Option<Arc<TestHooks>>,
    calls: Arc<Mutex<Vec<String>>>,
    revision: Revision,
    rpc_error: Option<ClientError>,
}

impl TestClient {
    fn finish(&self, call: String) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call);
        if let Some(err) = &self.rpc_error {
            return Err(err.clone());
        }
        if self.hooks.as_ref().is_some_and(|h| h.fire()) {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for TestClient {
    async fn defragment(&self, endpoint: &str) -> Result<(), ClientError> {
        self.finish(format!("defragment {endpoint}"))
    }

    async fn get(&self, key: &str) -> Result<Revision, ClientError> {
        self.calls.lock().unwrap().push(format!("get {key}"));
        Ok(self.revision)
    }

    async fn compact(&self, revision: Revision) -> Result<(), ClientError> {
        self.finish(format!("compact {revision}"))
    }
}

pub(crate) struct TestMember {
    name: String,
    pub process: Arc<TestProcess>,
    pub hooks: Option<Arc<TestHooks>>,
    pub proxy: Option<Arc<TestProxy>>,
    endpoints: Vec<String>,
    calls: Arc<Mutex<Vec<String>>>,
    rpc_error: Mutex<Option<ClientError>>,
    connect_error: Mutex<Option<ClientError>>,
}

impl TestMember {
    pub(crate) fn client_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn fail_rpcs_with(&self, err: ClientError) {
        *self.rpc_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_connect_with(&self, err: ClientError) {
        *self.connect_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn proxy_state(&self) -> ProxyState {
        self.proxy.as_ref().map(|p| p.state()).unwrap_or_default()
    }
}

#[async_trait]
impl Member for TestMember {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self) -> &dyn Process {
        self.process.as_ref()
    }

    fn hooks(&self) -> Option<&dyn RemoteHooks> {
        self.hooks.as_deref().map(|h| h as &dyn RemoteHooks)
    }

    fn peer_proxy(&self) -> Option<&dyn PeerProxy> {
        self.proxy.as_deref().map(|p| p as &dyn PeerProxy)
    }

    fn endpoints(&self) -> Vec<String> {
        self.endpoints.clone()
    }

    async fn connect(&self, _options: ClientOptions) -> Result<Box<dyn ClusterClient>, ClientError> {
        if let Some(err) = self.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Box::new(TestClient {
            hooks: self.hooks.clone(),
            calls: Arc::clone(&self.calls),
            revision: 42,
            rpc_error: self.rpc_error.lock().unwrap().clone(),
        }))
    }
}

pub(crate) struct TestCluster {
    members: Vec<Arc<dyn Member>>,
    typed: Vec<Arc<TestMember>>,
    leader: Option<usize>,
}

impl TestCluster {
    pub(crate) fn builder() -> TestClusterBuilder {
        TestClusterBuilder::default()
    }

    pub(crate) fn member(&self, index: usize) -> &Arc<TestMember> {
        &self.typed[index]
    }

    pub(crate) fn test_members(&self) -> &[Arc<TestMember>] {
        &self.typed
    }

    pub(crate) fn all_running(&self) -> bool {
        self.typed.iter().all(|m| m.process.is_running())
    }

    pub(crate) fn any_degraded(&self) -> bool {
        self.typed.iter().any(|m| m.proxy_state().is_degraded())
    }
}

#[async_trait]
impl Cluster for TestCluster {
    fn members(&self) -> &[Arc<dyn Member>] {
        &self.members
    }

    async fn wait_leader(&self, timeout: Duration) -> Option<usize> {
        if self.leader.is_none() {
            tokio::time::sleep(timeout).await;
        }
        self.leader
    }
}

pub(crate) struct TestClusterBuilder {
    size: usize,
    leader: Option<usize>,
    breakpoints: Vec<String>,
    on_trigger: Vec<String>,
    without_hooks: HashSet<usize>,
    without_proxy: HashSet<usize>,
    stopped: HashSet<usize>,
}

impl Default for TestClusterBuilder {
    fn default() -> Self {
        Self {
            size: 3,
            leader: Some(0),
            breakpoints: Vec::new(),
            on_trigger: Vec::new(),
            without_hooks: HashSet::new(),
            without_proxy: HashSet::new(),
            stopped: HashSet::new(),
        }
    }
}

impl TestClusterBuilder {
    pub(crate) fn members(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn leader(mut self, leader: Option<usize>) -> Self {
        self.leader = leader;
        self
    }

    /// Breakpoints that panic the member as soon as they are armed.
    pub(crate) fn breakpoints(mut self, names: &[&str]) -> Self {
        self.breakpoints.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Breakpoints that only panic once a defrag or compact call reaches them.
    pub(crate) fn trigger_breakpoints(mut self, names: &[&str]) -> Self {
        self.breakpoints.extend(names.iter().map(|n| n.to_string()));
        self.on_trigger.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub(crate) fn without_hooks(mut self, index: usize) -> Self {
        self.without_hooks.insert(index);
        self
    }

    pub(crate) fn without_proxy(mut self, index: usize) -> Self {
        self.without_proxy.insert(index);
        self
    }

    pub(crate) fn stopped(mut self, index: usize) -> Self {
        self.stopped.insert(index);
        self
    }

    pub(crate) fn build(self) -> TestCluster {
        let typed: Vec<Arc<TestMember>> = (0..self.size)
            .map(|i| {
                let process = Arc::new(TestProcess::new(!self.stopped.contains(&i)));
                let hooks = (!self.without_hooks.contains(&i)).then(|| {
                    Arc::new(TestHooks {
                        process: Arc::clone(&process),
                        breakpoints: self.breakpoints.iter().cloned().collect(),
                        on_trigger: self.on_trigger.iter().cloned().collect(),
                        armed: Mutex::new(None),
                        setups: AtomicUsize::new(0),
                        failing_setups: AtomicUsize::new(0),
                    })
                });
                let proxy = (!self.without_proxy.contains(&i)).then(|| Arc::new(TestProxy::default()));
                Arc::new(TestMember {
                    name: format!("infra{i}"),
                    process,
                    hooks,
                    proxy,
                    endpoints: vec![format!("http://127.0.0.1:{}", 20000 + i * 10)],
                    calls: Arc::new(Mutex::new(Vec::new())),
                    rpc_error: Mutex::new(None),
                    connect_error: Mutex::new(None),
                })
            })
            .collect();

        let members = typed
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn Member>)
            .collect();

        TestCluster {
            members,
            typed,
            leader: self.leader,
        }
    }
}
