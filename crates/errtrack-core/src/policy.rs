//! Report policy
//!
//! Decides whether a fault is reported at all. Three independent gates must
//! pass: the global enable switch, the environment allow-list and the
//! excluded fault kinds. The decision is pure; logging of rejections is left
//! to the caller.

use std::fmt;

use crate::config::TrackerConfig;
use crate::domain::{FaultKind, FaultTaxonomy};

/// Why a fault was not reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// `enabled` is false
    Disabled,
    /// The current environment is not in the allow-list
    EnvironmentNotTracked(String),
    /// The fault is (a subkind of) this excluded kind
    ExcludedType(FaultKind),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "error tracking is disabled"),
            Self::EnvironmentNotTracked(env) => {
                write!(f, "environment '{env}' is not tracked")
            }
            Self::ExcludedType(kind) => write!(f, "fault kind '{kind}' is excluded"),
        }
    }
}

/// Stateless reportability gate over a borrowed configuration
pub struct ReportPolicy<'a> {
    config: &'a TrackerConfig,
    taxonomy: &'a dyn FaultTaxonomy,
}

impl<'a> ReportPolicy<'a> {
    pub fn new(config: &'a TrackerConfig, taxonomy: &'a dyn FaultTaxonomy) -> Self {
        Self { config, taxonomy }
    }

    /// Evaluates the gates in order and returns the first rejection
    pub fn evaluate(&self, kind: &FaultKind, environment: &str) -> Result<(), RejectReason> {
        if !self.config.enabled {
            return Err(RejectReason::Disabled);
        }

        if !self.config.tracks_environment(environment) {
            return Err(RejectReason::EnvironmentNotTracked(environment.to_string()));
        }

        if let Some(excluded) = self
            .config
            .exclude_exceptions
            .iter()
            .find(|excluded| self.taxonomy.is_a(kind, excluded))
        {
            return Err(RejectReason::ExcludedType(excluded.clone()));
        }

        Ok(())
    }

    /// Boolean view of [`ReportPolicy::evaluate`]
    #[must_use]
    pub fn should_report(&self, kind: &FaultKind, environment: &str) -> bool {
        self.evaluate(kind, environment).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::domain::{DottedTaxonomy, TaxonomyMap};

    fn kind(s: &str) -> FaultKind {
        FaultKind::new(s).unwrap()
    }

    #[test]
    fn test_disabled_rejects_everything() {
        let config = ConfigBuilder::new().enabled(false).build();
        let policy = ReportPolicy::new(&config, &DottedTaxonomy);

        assert_eq!(
            policy.evaluate(&kind("runtime"), "production"),
            Err(RejectReason::Disabled)
        );
        assert!(!policy.should_report(&kind("runtime"), "qa"));
        assert!(!policy.should_report(&kind("validation"), "production"));
    }

    #[test]
    fn test_untracked_environment_rejected() {
        let config = TrackerConfig::default();
        let policy = ReportPolicy::new(&config, &DottedTaxonomy);

        assert_eq!(
            policy.evaluate(&kind("runtime"), "qa"),
            Err(RejectReason::EnvironmentNotTracked("qa".to_string()))
        );
        // Environment names are matched exactly
        assert!(!policy.should_report(&kind("runtime"), "Production"));
    }

    #[test]
    fn test_excluded_kind_and_subkinds_rejected() {
        let config = TrackerConfig::default();
        let policy = ReportPolicy::new(&config, &DottedTaxonomy);

        assert_eq!(
            policy.evaluate(&kind("validation"), "production"),
            Err(RejectReason::ExcludedType(kind("validation")))
        );
        assert!(!policy.should_report(&kind("validation.email"), "staging"));
        assert!(!policy.should_report(&kind("http.not_found"), "production"));
        assert!(policy.should_report(&kind("http.internal"), "production"));
    }

    #[test]
    fn test_runtime_fault_in_production_reported() {
        let config = TrackerConfig::default();
        let policy = ReportPolicy::new(&config, &DottedTaxonomy);

        assert_eq!(policy.evaluate(&kind("runtime"), "production"), Ok(()));
        assert!(policy.should_report(&kind("runtime"), "production"));
    }

    #[test]
    fn test_empty_exclusions_report_all_kinds() {
        let config = ConfigBuilder::new().exclude(Vec::new()).build();
        let policy = ReportPolicy::new(&config, &DottedTaxonomy);

        assert!(policy.should_report(&kind("validation"), "testing"));
    }

    #[test]
    fn test_host_taxonomy_drives_exclusion() {
        let config = TrackerConfig::default();
        let taxonomy = TaxonomyMap::new().with_parent(kind("model_not_found"), kind("http.not_found"));
        let policy = ReportPolicy::new(&config, &taxonomy);

        assert_eq!(
            policy.evaluate(&kind("model_not_found"), "production"),
            Err(RejectReason::ExcludedType(kind("http.not_found")))
        );
        assert!(ReportPolicy::new(&config, &DottedTaxonomy)
            .should_report(&kind("model_not_found"), "production"));
    }

    #[test]
    fn test_gate_combinations() {
        for enabled in [true, false] {
            for env in ["production", "qa"] {
                for fault in ["runtime", "validation"] {
                    let config = ConfigBuilder::new().enabled(enabled).build();
                    let policy = ReportPolicy::new(&config, &DottedTaxonomy);
                    let expected = enabled && env == "production" && fault == "runtime";
                    assert_eq!(
                        policy.should_report(&kind(fault), env),
                        expected,
                        "enabled={enabled} env={env} fault={fault}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::Disabled.to_string(), "error tracking is disabled");
        assert_eq!(
            RejectReason::EnvironmentNotTracked("qa".into()).to_string(),
            "environment 'qa' is not tracked"
        );
        assert_eq!(
            RejectReason::ExcludedType(kind("validation")).to_string(),
            "fault kind 'validation' is excluded"
        );
    }
}
