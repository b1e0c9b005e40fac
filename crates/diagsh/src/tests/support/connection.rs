//! Management connection doubles.
//!
//! [`MockConnection`] is a plain `mockall` mock for command tests.
//! [`ScriptedProvider`] hands out mocks wired to a shared [`TargetLedger`] so
//! session tests can observe invocations and sever the link mid-session.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mockall::mock;
use serde_json::Value;

use crate::remote::{ConnectError, ConnectionProvider, ManagementConnection, RemoteError};

mock! {
    pub Connection {}

    impl ManagementConnection for Connection {
        fn endpoint(&self) -> String;
        fn invoke(&mut self, operation: &str, arguments: &[String]) -> Result<Value, RemoteError>;
        fn is_alive(&self) -> bool;
        fn close(&mut self);
    }
}

/// Shared observations of the fake remote target.
#[derive(Clone, Default)]
pub struct TargetLedger {
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    severed: Arc<AtomicBool>,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl TargetLedger {
    /// Number of connections handed out.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of `close` calls observed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Operations invoked so far, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().expect("invocations lock").clone()
    }

    /// Makes every subsequent invocation fail as if the target went away.
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
    }
}

/// Provider returning ledger-backed mocks, or a scripted failure.
pub struct ScriptedProvider {
    endpoint: String,
    failure: Option<String>,
    ledger: TargetLedger,
}

impl ScriptedProvider {
    /// Provider whose connections always succeed.
    pub fn healthy(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            failure: None,
            ledger: TargetLedger::default(),
        }
    }

    /// Provider whose `connect` always fails with `reason`.
    pub fn unreachable(endpoint: &str, reason: &str) -> Self {
        Self {
            failure: Some(reason.to_owned()),
            ..Self::healthy(endpoint)
        }
    }

    /// Shared ledger for assertions.
    pub fn ledger(&self) -> TargetLedger {
        self.ledger.clone()
    }

    fn connection(&self) -> MockConnection {
        let alive = Arc::new(AtomicBool::new(true));
        let mut connection = MockConnection::new();

        let endpoint = self.endpoint.clone();
        connection
            .expect_endpoint()
            .returning(move || endpoint.clone());

        let ledger_alive = Arc::clone(&alive);
        connection
            .expect_is_alive()
            .returning(move || ledger_alive.load(Ordering::SeqCst));

        let close_alive = Arc::clone(&alive);
        let closes = Arc::clone(&self.ledger.closes);
        connection.expect_close().returning(move || {
            close_alive.store(false, Ordering::SeqCst);
            closes.fetch_add(1, Ordering::SeqCst);
        });

        let ledger = self.ledger.clone();
        connection
            .expect_invoke()
            .returning(move |operation: &str, _args: &[String]| {
                ledger
                    .invocations
                    .lock()
                    .expect("invocations lock")
                    .push(operation.to_owned());
                if ledger.severed.load(Ordering::SeqCst) {
                    alive.store(false, Ordering::SeqCst);
                    return Err(RemoteError::Disconnected);
                }
                Ok(Value::Null)
            });
        connection
    }
}

impl ConnectionProvider for ScriptedProvider {
    fn connect(&self) -> Result<Box<dyn ManagementConnection>, ConnectError> {
        if let Some(reason) = &self.failure {
            return Err(ConnectError::Unavailable {
                endpoint: self.endpoint.clone(),
                reason: reason.clone(),
            });
        }
        self.ledger.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.connection()))
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}
