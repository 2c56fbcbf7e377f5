use serde::{Deserialize, Serialize};

/// Risk level of a change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Small, contained change
    Low = 0,
    /// Touches several files or configuration
    Medium = 1,
    /// Wide change, deployment or critical dependents
    High = 2,
    /// Very wide change, or deployment together with configuration
    Critical = 3,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

impl RiskLevel {
    /// Get a description of this risk level
    pub fn description(&self) -> &str {
        match self {
            Self::Low => "Small, contained change",
            Self::Medium => "Touches several files or configuration",
            Self::High => "Wide change or deployment impact",
            Self::Critical => "Very wide change touching deployment and configuration",
        }
    }

    /// Lower-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to risk classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskFactors {
    /// Total affected files.
    pub total_files: usize,
    /// Any configuration file touched.
    pub touches_config: bool,
    /// Any deployment file touched.
    pub touches_deployment: bool,
    /// Any file with critical priority.
    pub has_critical_file: bool,
}

impl RiskFactors {
    /// Classify.
    ///
    /// More than 20 files, or deployment together with configuration, is
    /// critical. More than 10 files, any deployment file or any critical file
    /// is high. More than 5 files or any configuration file is medium.
    pub fn assess(&self) -> RiskLevel {
        if self.total_files > 20 || (self.touches_deployment && self.touches_config) {
            return RiskLevel::Critical;
        }
        if self.total_files > 10 || self.touches_deployment || self.has_critical_file {
            return RiskLevel::High;
        }
        if self.total_files > 5 || self.touches_config {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn factors(total: usize, config: bool, deploy: bool, critical: bool) -> RiskFactors {
        RiskFactors {
            total_files: total,
            touches_config: config,
            touches_deployment: deploy,
            has_critical_file: critical,
        }
    }

    #[test]
    fn risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[rstest]
    #[case(factors(1, false, false, false), RiskLevel::Low)]
    #[case(factors(5, false, false, false), RiskLevel::Low)]
    #[case(factors(6, false, false, false), RiskLevel::Medium)]
    #[case(factors(1, true, false, false), RiskLevel::Medium)]
    #[case(factors(11, false, false, false), RiskLevel::High)]
    #[case(factors(2, false, true, false), RiskLevel::High)]
    #[case(factors(2, false, false, true), RiskLevel::High)]
    #[case(factors(21, false, false, false), RiskLevel::Critical)]
    #[case(factors(2, true, true, false), RiskLevel::Critical)]
    fn assess_thresholds(#[case] input: RiskFactors, #[case] expected: RiskLevel) {
        assert_eq!(input.assess(), expected);
    }

    #[test]
    fn display_is_lowercase_label() {
        assert_eq!(RiskLevel::High.to_string(), "high");
        assert_eq!(RiskLevel::Critical.description(), "Very wide change touching deployment and configuration");
    }
}
