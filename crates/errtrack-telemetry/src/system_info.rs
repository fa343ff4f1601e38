//! Host environment collectors
//!
//! Gathers the environment name and non-identifying runtime metadata for
//! fault reports. Never includes hostname or username.

use errtrack_core::domain::SystemData;
use errtrack_core::ports::HostEnvironment;

/// Variable naming the deployment environment.
pub const ENV_APP_ENV: &str = "APP_ENV";

/// Variable naming the server software, set by CGI-style front ends.
pub const ENV_SERVER_SOFTWARE: &str = "SERVER_SOFTWARE";

/// Environment assumed when `APP_ENV` is unset.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Host environment read from the running process.
///
/// Values are collected once at construction.
#[derive(Debug, Clone)]
pub struct ProcessHost {
    environment: String,
    system: SystemData,
}

impl ProcessHost {
    /// Collect from the current process.
    ///
    /// # Arguments
    ///
    /// * `framework_version` - Version string of the host framework, if any
    pub fn collect(framework_version: Option<String>) -> Self {
        Self::collect_with(framework_version, |name| std::env::var(name).ok())
    }

    /// Collect using `lookup` in place of the process environment.
    pub fn collect_with<F>(framework_version: Option<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(ENV_APP_ENV)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Self {
            environment,
            system: SystemData {
                runtime_version: runtime_version(),
                framework_version,
                server: lookup(ENV_SERVER_SOFTWARE).filter(|s| !s.is_empty()),
            },
        }
    }
}

impl HostEnvironment for ProcessHost {
    fn environment_name(&self) -> String {
        self.environment.clone()
    }

    fn system_data(&self) -> SystemData {
        self.system.clone()
    }
}

/// Host environment with fixed values, for tests and embedders that
/// resolve their own metadata.
#[derive(Debug, Clone)]
pub struct StaticHost {
    environment: String,
    system: SystemData,
}

impl StaticHost {
    pub fn new(environment: impl Into<String>, system: SystemData) -> Self {
        Self {
            environment: environment.into(),
            system,
        }
    }
}

impl HostEnvironment for StaticHost {
    fn environment_name(&self) -> String {
        self.environment.clone()
    }

    fn system_data(&self) -> SystemData {
        self.system.clone()
    }
}

/// `rust <os>-<arch>`, with the kernel release appended when known.
fn runtime_version() -> String {
    let base = format!(
        "rust {}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    match read_kernel_version() {
        Some(kernel) => format!("{base} (kernel {kernel})"),
        None => base,
    }
}

fn read_kernel_version() -> Option<String> {
    std::fs::read_to_string("/proc/version")
        .ok()
        .and_then(|v| v.split_whitespace().nth(2).map(String::from))
}
