use std::fmt;

/// A metric value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    Float(f64),
    Count(usize),
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Metric::Float(v) => write!(f, "{}", v),
            Metric::Count(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Metric {
    fn from(v: f64) -> Self {
        Metric::Float(v)
    }
}

impl From<usize> for Metric {
    fn from(v: usize) -> Self {
        Metric::Count(v)
    }
}

/// Ordered mapping from metric names to values.
///
/// The result of running one benchmark on one set of embeddings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationResult {
    metrics: Vec<(String, Metric)>,
}

impl EvaluationResult {
    pub fn new() -> Self {
        EvaluationResult::default()
    }

    /// Append a metric.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Metric>) -> Self {
        self.metrics.push((name.into(), value.into()));
        self
    }

    /// Get the value of a metric.
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics
            .iter()
            .find(|(metric_name, _)| metric_name == name)
            .map(|&(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate over the metrics in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Metric)> {
        self.metrics
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// Prefix all metric names with `prefix` and an underscore.
    pub fn prefixed(self, prefix: &str) -> Self {
        EvaluationResult {
            metrics: self
                .metrics
                .into_iter()
                .map(|(name, value)| (format!("{}_{}", prefix, name), value))
                .collect(),
        }
    }

    /// Append the metrics of another result.
    pub fn extend(&mut self, other: EvaluationResult) {
        self.metrics.extend(other.metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::{EvaluationResult, Metric};

    #[test]
    fn metrics_keep_insertion_order() {
        let result = EvaluationResult::new()
            .with("total_acc", 60.)
            .with("total", 5usize)
            .with("sem_acc", 66.5);
        let names = result.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, vec!["total_acc", "total", "sem_acc"]);
        assert_eq!(result.get("total"), Some(Metric::Count(5)));
        assert_eq!(result.get("syn_acc"), None);
    }

    #[test]
    fn prefix_and_extend() {
        let mut result = EvaluationResult::new().with("oov_ratio", 30.).prefixed("simlex999");
        result.extend(EvaluationResult::new().with("total", 3usize));
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get("simlex999_oov_ratio"),
            Some(Metric::Float(30.))
        );
    }

    #[test]
    fn display_metrics() {
        assert_eq!(Metric::Float(0.5).to_string(), "0.5");
        assert_eq!(Metric::Count(4478).to_string(), "4478");
    }
}
