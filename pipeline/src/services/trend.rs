use crate::processor::{TrendAssessment, TrendBaseline, TrendValidator, ValidationVerdict};
use common::Result;
use common::config::Settings;
use etl::DataSource;
use notification::{GateActions, Notice};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct TrendOutcome {
    pub assessment: TrendAssessment,
    pub notice: Notice,
}

/// Counts today's records, validates them against the baseline and fires
/// exactly one of the two gate actions.
pub struct TrendService {
    source: Arc<dyn DataSource>,
    validator: TrendValidator,
    actions: GateActions,
}

impl TrendService {
    pub fn new(source: Arc<dyn DataSource>, validator: TrendValidator, actions: GateActions) -> Self {
        Self {
            source,
            validator,
            actions,
        }
    }

    pub fn from_settings(settings: &Settings, source: Arc<dyn DataSource>) -> Result<Self> {
        let baseline = TrendBaseline::with_tolerance(
            &settings.trend.historical_counts,
            settings.trend.tolerance,
        )?;
        let actions = GateActions::from_config(&settings.notification);
        Ok(Self::new(source, TrendValidator::new(baseline), actions))
    }

    pub async fn current_count(&self) -> Result<u64> {
        let batch = self.source.fetch().await?;
        let count = batch.num_rows() as u64;
        info!(count, "Fetched current record count");
        Ok(count)
    }

    /// Uses `count` when given, otherwise fetches the dataset and counts it.
    pub async fn run(&self, count: Option<u64>) -> Result<TrendOutcome> {
        let current_count = match count {
            Some(count) => count,
            None => self.current_count().await?,
        };
        self.gate(Some(current_count))
    }

    pub fn gate(&self, current_count: Option<u64>) -> Result<TrendOutcome> {
        let assessment = self.validator.assess(current_count)?;
        let notice = match assessment.verdict {
            ValidationVerdict::Valid => self.actions.continue_path()?,
            ValidationVerdict::Invalid => self.actions.halt_path()?,
        };
        Ok(TrendOutcome { assessment, notice })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::NotificationConfig;
    use etl::MemoryDataSource;
    use notification::{Branch, MemoryNotifier};

    const HISTORY: [u64; 5] = [1450, 1510, 1480, 1550, 1470];

    fn service(body: &str, notifier: Arc<MemoryNotifier>) -> TrendService {
        let source = Arc::new(MemoryDataSource::from_json(body.as_bytes()).unwrap());
        let validator = TrendValidator::new(TrendBaseline::new(&HISTORY).unwrap());
        let actions = GateActions::new(&NotificationConfig::default()).with_notifier(Box::new(notifier));
        TrendService::new(source, validator, actions)
    }

    #[tokio::test]
    async fn test_supplied_count_takes_continue_branch() {
        let notifier = Arc::new(MemoryNotifier::new());
        let outcome = service("[]", notifier.clone()).run(Some(1200)).await.unwrap();

        assert_eq!(outcome.assessment.verdict, ValidationVerdict::Valid);
        assert_eq!(outcome.notice.branch, Branch::Continue);
        assert_eq!(notifier.notices(), vec![outcome.notice]);
    }

    #[tokio::test]
    async fn test_low_count_takes_halt_branch_only() {
        let notifier = Arc::new(MemoryNotifier::new());
        let outcome = service("[]", notifier.clone()).run(Some(1000)).await.unwrap();

        assert_eq!(outcome.assessment.verdict, ValidationVerdict::Invalid);
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].branch, Branch::Halt);
    }

    #[tokio::test]
    async fn test_fetched_batch_is_counted() {
        let notifier = Arc::new(MemoryNotifier::new());
        let outcome = service(r#"[{"city": "a"}, {"city": "b"}]"#, notifier.clone())
            .run(None)
            .await
            .unwrap();

        assert_eq!(outcome.assessment.current_count, 2);
        assert_eq!(outcome.notice.branch, Branch::Halt);
    }

    #[test]
    fn test_missing_count_fires_no_action() {
        let notifier = Arc::new(MemoryNotifier::new());
        let result = service("[]", notifier.clone()).gate(None);

        assert!(matches!(result, Err(common::Error::InputUnavailable(_))));
        assert!(notifier.notices().is_empty());
    }
}
