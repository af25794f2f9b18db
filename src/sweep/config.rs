use crate::core::{MessageType, Result, SweepError};
use serde::{Deserialize, Serialize};

/// Idle sweep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Label given to the utility session opened for each rollback
    pub session_label: String,

    /// Text of the notification sent after a sweep that rolled something back
    pub notification_message: String,

    /// Text used instead when nothing was rolled back
    pub nothing_rolled_back_message: String,

    /// Severity of that notification; `Information` is rejected
    pub notification_severity: MessageType,

    /// Append "N of M could not be rolled back" when items failed
    pub report_failure_count: bool,

    /// Stop opening new sessions once the monitor is canceled
    pub honor_cancellation: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            session_label: "End idle transaction".to_string(),
            notification_message: "Transactions have been rolled back after long idle period"
                .to_string(),
            nothing_rolled_back_message: "No idle transactions were rolled back".to_string(),
            notification_severity: MessageType::Error,
            report_failure_count: true,
            honor_cancellation: true,
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_label(mut self, label: &str) -> Self {
        self.session_label = label.to_string();
        self
    }

    pub fn notification_message(mut self, message: &str) -> Self {
        self.notification_message = message.to_string();
        self
    }

    pub fn nothing_rolled_back_message(mut self, message: &str) -> Self {
        self.nothing_rolled_back_message = message.to_string();
        self
    }

    pub fn notification_severity(mut self, severity: MessageType) -> Self {
        self.notification_severity = severity;
        self
    }

    pub fn report_failure_count(mut self, enabled: bool) -> Self {
        self.report_failure_count = enabled;
        self
    }

    pub fn honor_cancellation(mut self, enabled: bool) -> Self {
        self.honor_cancellation = enabled;
        self
    }

    /// Parse from JSON; missing fields keep their defaults
    ///
    /// # Examples
    ///
    /// ```
    /// use idlesweep::SweepConfig;
    ///
    /// let config = SweepConfig::from_json(r#"{"report_failure_count": false}"#).unwrap();
    /// assert!(!config.report_failure_count);
    /// assert_eq!(config.session_label, "End idle transaction");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SweepConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.session_label.trim().is_empty() {
            return Err(SweepError::Config("session_label must not be empty".into()));
        }

        if self.notification_message.trim().is_empty() {
            return Err(SweepError::Config(
                "notification_message must not be empty".into(),
            ));
        }

        if self.nothing_rolled_back_message.trim().is_empty() {
            return Err(SweepError::Config(
                "nothing_rolled_back_message must not be empty".into(),
            ));
        }

        if self.notification_severity == MessageType::Information {
            return Err(SweepError::Config(
                "notification_severity must be Warning or Error".into(),
            ));
        }

        Ok(())
    }

    /// Build the notification text for a finished sweep
    ///
    /// Skipped items are always mentioned; failures only when
    /// `report_failure_count` is set.
    pub(crate) fn render_message(
        &self,
        rolled_back: usize,
        failed: usize,
        skipped: usize,
    ) -> String {
        let total = rolled_back + failed + skipped;
        let base = if rolled_back > 0 {
            &self.notification_message
        } else {
            &self.nothing_rolled_back_message
        };

        let mut details = Vec::new();
        if self.report_failure_count && failed > 0 {
            details.push(format!("{} of {} could not be rolled back", failed, total));
        }
        if skipped > 0 {
            details.push(format!("{} of {} skipped: sweep canceled", skipped, total));
        }

        if details.is_empty() {
            base.clone()
        } else {
            format!("{} ({})", base, details.join("; "))
        }
    }
}
