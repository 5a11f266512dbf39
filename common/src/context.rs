use std::fmt;

/// Per-scenario context handed to every gateway and verifier call.
///
/// Holds the scenario label used in logs and the backend session id
/// obtained from `setup`. Each scenario owns its own value, so scenarios
/// can run on separate workers without sharing state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContext {
    scenario: String,
    session_id: Option<String>,
}

impl TestContext {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn set_session(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

impl fmt::Display for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.session_id {
            Some(session) => write!(f, "{} (session {})", self.scenario, session),
            None => write!(f, "{}", self.scenario),
        }
    }
}
