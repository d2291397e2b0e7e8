use crate::locale::{Language, Market};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};

pub const NEWS_MARKER: &str = "[NEWS]";
pub const TRENDS_MARKER: &str = "[TRENDS]";
pub const STRATEGY_MARKER: &str = "[STRATEGY]";

/// Section markers the prompt asks the model to emit, in order.
pub const REPORT_MARKERS: [&str; 3] = [NEWS_MARKER, TRENDS_MARKER, STRATEGY_MARKER];

/// One user-triggered generation: the rendered prompt plus the markers the
/// response is expected to contain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt_text: String,
    expected_markers: Vec<String>,
}

impl GenerationRequest {
    pub fn new<I, S>(prompt_text: impl Into<String>, expected_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt_text: prompt_text.into(),
            expected_markers: expected_markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn expected_markers(&self) -> &[String] {
        &self.expected_markers
    }
}

/// Today's date in the zone reports are stamped in.
pub fn report_date(utc_offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset).date_naive()
}

/// Render the market-development-manager prompt for the given selections.
pub fn build_request(language: Language, markets: &[Market], date: NaiveDate) -> GenerationRequest {
    let profile = language.profile();
    // Markets are always named with the bilingual zh-TW labels; the output
    // language is set separately by the [IMPORTANT] line.
    let market_list = markets
        .iter()
        .map(|m| m.label(Language::TraditionalChinese))
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "Today is {date}.\n\
         Search for the latest {year} news about the server market in: {market_list} \
         (especially GPU servers and the NVIDIA Blackwell series).\n\
         Write as a professional market development manager. Cover supply chain trends, \
         activity of Japanese enterprises, and business development opportunities.\n\
         Structure the report in exactly three sections, each starting on its own line \
         with the literal marker shown, in this order:\n\
         {NEWS_MARKER} latest news with sources\n\
         {TRENDS_MARKER} supply chain and market trends\n\
         {STRATEGY_MARKER} business development strategy and recommended actions\n\
         Do not use these markers anywhere else.\n\
         [IMPORTANT]: write the entire report in {lang}.",
        date = date.format("%Y-%m-%d"),
        year = date.format("%Y"),
        lang = profile.prompt_name,
    );

    GenerationRequest::new(prompt, REPORT_MARKERS)
}

/// Localized heading for a section key.
pub fn section_heading(language: Language, key: &str) -> &'static str {
    let profile = language.profile();
    match key {
        NEWS_MARKER => profile.news_heading,
        TRENDS_MARKER => profile.trends_heading,
        STRATEGY_MARKER => profile.strategy_heading,
        _ => profile.fallback_heading,
    }
}
