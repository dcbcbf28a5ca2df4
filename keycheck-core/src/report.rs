//! Probe results accumulated during a single diagnostic run

/// Outcome of one probe step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub label: String,
    pub passed: bool,
    pub detail: String,
}

impl ProbeResult {
    pub fn pass(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Ordered, append-only list of probe results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    results: Vec<ProbeResult>,
}

impl ProbeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ProbeResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn passed(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// True when nothing failed and at least `min_results` steps were recorded
    pub fn all_passed(&self, min_results: usize) -> bool {
        self.results.len() >= min_results && self.results.iter().all(|r| r.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_passed_requires_minimum() {
        let mut report = ProbeReport::new();
        report.push(ProbeResult::pass("WebSocket Connection", "Connected"));
        assert!(!report.all_passed(2));
        assert!(report.all_passed(1));

        report.push(ProbeResult::pass("API Setup", "Configuration accepted"));
        assert!(report.all_passed(2));
    }

    #[test]
    fn test_single_failure_fails_report() {
        let mut report = ProbeReport::new();
        report.push(ProbeResult::pass("WebSocket Connection", "Connected"));
        report.push(ProbeResult::pass("API Setup", "Configuration accepted"));
        report.push(ProbeResult::fail("API Error", "quota exceeded"));

        assert!(!report.all_passed(2));
        assert_eq!(report.passed().count(), 2);
        assert_eq!(report.failed().next().unwrap().detail, "quota exceeded");
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut report = ProbeReport::new();
        for label in ["a", "b", "c"] {
            report.push(ProbeResult::pass(label, ""));
        }
        let labels: Vec<_> = report.results().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["a", "b", "c"]);
    }
}
