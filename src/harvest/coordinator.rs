use crate::error::{HarvestError, Result};

/// Drives a list of independent per-entity operations: every entity is
/// attempted in caller order, failures are recorded and skipped over, and
/// one aggregate error naming every failed identifier is raised at the end.
///
/// The runner performs no I/O of its own; durable effects belong to the
/// operations. The failure list lives for one run only.
#[derive(Debug, Default)]
pub struct BatchRunner {
    failed: Vec<String>,
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt every item. A failure never prevents later items from being
    /// attempted.
    pub fn run<T, I, F>(&mut self, items: &[T], ident: I, mut op: F)
    where
        I: Fn(&T) -> String,
        F: FnMut(&T) -> Result<()>,
    {
        for item in items {
            let id = ident(item);
            if let Err(error) = op(item) {
                self.record_failure(id, &error);
            }
        }
    }

    /// Record a failure observed outside `run`, e.g. while interleaving
    /// watermark bookkeeping with the item loop.
    pub fn record_failure(&mut self, ident: impl Into<String>, error: &HarvestError) {
        let ident = ident.into();
        tracing::error!(item = %ident, %error, "processing failed");
        self.failed.push(ident);
    }

    /// Fold a sub-run's result into this runner, qualifying nested failure
    /// identifiers with `prefix` so the final aggregate names every failed
    /// file, not just the failed source.
    pub fn absorb(&mut self, prefix: &str, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(HarvestError::Aggregate(idents)) => {
                for ident in idents {
                    self.failed.push(format!("{prefix}/{ident}"));
                }
            }
            Err(error) => self.record_failure(prefix, &error),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Consume the runner: `Ok` for a clean run, otherwise the aggregate
    /// error enumerating every failed identifier in attempt order.
    pub fn finish(self) -> Result<()> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(HarvestError::Aggregate(self.failed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_run_finishes_ok() {
        let mut runner = BatchRunner::new();
        runner.run(&["A", "B"], |s| s.to_string(), |_| Ok(()));
        assert!(runner.is_clean());
        assert!(runner.finish().is_ok());
    }

    #[test]
    fn test_failure_does_not_stop_later_entities() {
        let mut attempted = Vec::new();
        let mut runner = BatchRunner::new();
        runner.run(
            &["A", "B", "C"],
            |s| s.to_string(),
            |entity| {
                attempted.push(entity.to_string());
                if *entity == "B" {
                    Err(HarvestError::Transport("unreachable".to_string()))
                } else {
                    Ok(())
                }
            },
        );

        assert_eq!(attempted, vec!["A", "B", "C"]);
        match runner.finish() {
            Err(HarvestError::Aggregate(failed)) => assert_eq!(failed, vec!["B"]),
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[test]
    fn test_aggregate_preserves_attempt_order() {
        let mut runner = BatchRunner::new();
        runner.run(
            &["C", "A", "B"],
            |s| s.to_string(),
            |_| Err(HarvestError::Transport("down".to_string())),
        );

        match runner.finish() {
            Err(HarvestError::Aggregate(failed)) => assert_eq!(failed, vec!["C", "A", "B"]),
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[test]
    fn test_absorb_qualifies_nested_identifiers() {
        let mut runner = BatchRunner::new();
        runner.absorb(
            "meteoswiss/meteodata",
            Err(HarvestError::Aggregate(vec![
                "VQCA44.2024030100.csv".to_string(),
            ])),
        );
        runner.absorb(
            "dwd/meteodata",
            Err(HarvestError::Transport("down".to_string())),
        );
        runner.absorb("arso/meteodata", Ok(()));

        match runner.finish() {
            Err(HarvestError::Aggregate(failed)) => assert_eq!(
                failed,
                vec![
                    "meteoswiss/meteodata/VQCA44.2024030100.csv".to_string(),
                    "dwd/meteodata".to_string(),
                ]
            ),
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }
}
