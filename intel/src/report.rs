use crate::analyzer::TextGenerator;
use crate::config::Config;
use crate::error::GenerationError;
use crate::executor::{ResilientExecutor, RetryNotice, RetryPolicy, Sleeper, TokioSleeper};
use crate::locale::{Language, Market};
use crate::mail::{summary_body, MailDraft};
use crate::prompt::{build_request, report_date, section_heading};
use crate::sections::{split_sections, ReportSections};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub recipient: String,
    pub preview_chars: usize,
}

/// One generated brief. Built for a single render and then dropped.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub language: Language,
    pub markets: Vec<Market>,
    pub generated_on: NaiveDate,
    pub attempts: u32,
    pub raw_text: String,
    pub sections: ReportSections,
    pub mail_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub key: String,
    pub heading: &'static str,
    pub text: String,
}

impl Report {
    /// Sections with localized headings, whitespace trimmed for display.
    pub fn rendered_sections(&self) -> Vec<RenderedSection> {
        self.sections
            .iter()
            .map(|(key, text)| RenderedSection {
                key: key.to_string(),
                heading: section_heading(self.language, key),
                text: text.trim().to_string(),
            })
            .collect()
    }
}

/// Prompt → executor → splitter → mail link.
pub struct ReportService<G, S = TokioSleeper> {
    executor: ResilientExecutor<G, S>,
    mail: MailSettings,
    utc_offset_hours: i32,
}

impl<G: TextGenerator> ReportService<G, TokioSleeper> {
    pub fn from_config(generator: G, config: &Config) -> Self {
        Self::new(
            ResilientExecutor::new(generator, RetryPolicy::from_config(config)),
            MailSettings {
                recipient: config.mail_recipient.clone(),
                preview_chars: config.mail_preview_chars,
            },
            config.report_utc_offset_hours,
        )
    }
}

impl<G: TextGenerator, S: Sleeper> ReportService<G, S> {
    pub fn new(executor: ResilientExecutor<G, S>, mail: MailSettings, utc_offset_hours: i32) -> Self {
        Self { executor, mail, utc_offset_hours }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.executor.policy()
    }

    pub async fn generate<F>(
        &self,
        language: Language,
        markets: &[Market],
        on_retry: F,
    ) -> Result<Report, GenerationError>
    where
        F: FnMut(&RetryNotice) + Send,
    {
        let date = report_date(self.utc_offset_hours);
        self.generate_on(language, markets, date, on_retry).await
    }

    pub async fn generate_on<F>(
        &self,
        language: Language,
        markets: &[Market],
        date: NaiveDate,
        on_retry: F,
    ) -> Result<Report, GenerationError>
    where
        F: FnMut(&RetryNotice) + Send,
    {
        let id = Uuid::new_v4();
        let request = build_request(language, markets, date);
        info!(
            "Report {id}: language={} markets={:?}",
            language.code(),
            markets.iter().map(|m| m.code()).collect::<Vec<_>>()
        );

        let execution = self.executor.execute(&request, on_retry).await?;
        let sections = split_sections(&execution.text, request.expected_markers());
        if sections.is_fallback() {
            info!("Report {id}: section markers missing, showing full text");
        }

        let subject = format!("{} ({date})", language.profile().mail_subject);
        let body = summary_body(&subject, &execution.text, self.mail.preview_chars);
        let mail_link = MailDraft {
            recipient: &self.mail.recipient,
            subject: &subject,
            body: &body,
        }
        .to_link();

        Ok(Report {
            id,
            language,
            markets: markets.to_vec(),
            generated_on: date,
            attempts: execution.attempts,
            raw_text: execution.text,
            sections,
            mail_link,
        })
    }
}
