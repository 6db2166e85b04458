use std::env;

/// Supplies the capture metadata stamped onto every tracked event.
pub trait Environment: Send + Sync + 'static {
    /// Location identifier of the calling context.
    fn origin(&self) -> Option<String>;

    /// Client identifier of the calling context.
    fn agent(&self) -> Option<String>;
}

/// No metadata. Events get empty `origin` and `agent` fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEnvironment;

impl Environment for NoEnvironment {
    fn origin(&self) -> Option<String> {
        None
    }

    fn agent(&self) -> Option<String> {
        None
    }
}

/// Fixed metadata.
#[derive(Clone, Debug, Default)]
pub struct StaticEnvironment {
    origin: Option<String>,
    agent: Option<String>,
}

impl StaticEnvironment {
    /// Creates a new `StaticEnvironment`.
    pub fn new(origin: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            agent: Some(agent.into()),
        }
    }
}

impl Environment for StaticEnvironment {
    fn origin(&self) -> Option<String> {
        self.origin.clone()
    }

    fn agent(&self) -> Option<String> {
        self.agent.clone()
    }
}

/// Metadata describing the running process: the executable path as origin
/// and `name/version (os; arch)` as agent.
#[derive(Clone, Debug)]
pub struct ProcessEnvironment {
    origin: Option<String>,
    agent: String,
}

impl ProcessEnvironment {
    /// Creates a new `ProcessEnvironment` for the named program.
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        let origin = env::current_exe()
            .ok()
            .map(|path| path.display().to_string());

        Self {
            origin,
            agent: format!(
                "{name}/{version} ({}; {})",
                env::consts::OS,
                env::consts::ARCH
            ),
        }
    }
}

impl Environment for ProcessEnvironment {
    fn origin(&self) -> Option<String> {
        self.origin.clone()
    }

    fn agent(&self) -> Option<String> {
        Some(self.agent.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_environment() {
        let environment = ProcessEnvironment::new("beacon", "1.2.3");

        let agent = environment.agent().unwrap();
        assert!(agent.starts_with("beacon/1.2.3 ("));
        assert!(agent.contains(env::consts::OS));
        assert!(agent.ends_with(&format!("{})", env::consts::ARCH)));

        assert!(environment.origin().is_some_and(|origin| !origin.is_empty()));
    }

    #[test]
    fn test_static_and_empty_environments() {
        let environment = StaticEnvironment::new("https://app/home", "agent/1");

        assert_eq!(environment.origin().as_deref(), Some("https://app/home"));
        assert_eq!(environment.agent().as_deref(), Some("agent/1"));
        assert_eq!(NoEnvironment.origin(), None);
        assert_eq!(NoEnvironment.agent(), None);
    }
}
