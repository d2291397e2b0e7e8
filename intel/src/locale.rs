//! Output languages, market regions, and the per-language UI labels.
//!
//! Label tables are immutable statics; a render picks one profile via
//! [`Language::profile`] and reads from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-tw")]
    TraditionalChinese,
    #[serde(rename = "ja")]
    BusinessJapanese,
    #[serde(rename = "en")]
    BusinessEnglish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Global,
    Japan,
    #[serde(rename = "taiwan")]
    TaiwanSupplyChain,
}

/// Everything a render needs to present one language.
#[derive(Debug)]
pub struct LanguageProfile {
    pub code: &'static str,
    /// Name used inside the prompt ("write the whole report in ...").
    pub prompt_name: &'static str,
    pub display_name: &'static str,
    pub page_title: &'static str,
    pub generate_button: &'static str,
    pub busy_text: &'static str,
    pub success_text: &'static str,
    pub retrying_text: &'static str,
    pub exhausted_text: &'static str,
    pub failure_text: &'static str,
    pub busy_conflict_text: &'static str,
    pub no_market_text: &'static str,
    pub mail_subject: &'static str,
    pub mail_button: &'static str,
    pub news_heading: &'static str,
    pub trends_heading: &'static str,
    pub strategy_heading: &'static str,
    pub fallback_heading: &'static str,
    pub market_labels: [&'static str; 3],
}

static TRADITIONAL_CHINESE: LanguageProfile = LanguageProfile {
    code: "zh-tw",
    prompt_name: "繁體中文 (Traditional Chinese)",
    display_name: "繁體中文",
    page_title: "全球 & 日本伺服器市場動態監測",
    generate_button: "開始分析並生成報告",
    busy_text: "正在分析伺服器市場動態...",
    success_text: "報告生成完成！",
    retrying_text: "API 請求過於頻繁，稍後自動重試",
    exhausted_text: "API 配額已用盡，請稍後再試。",
    failure_text: "執行錯誤",
    busy_conflict_text: "已有報告正在生成中，請稍候。",
    no_market_text: "請至少選擇一個關注市場。",
    mail_subject: "伺服器市場情報摘要",
    mail_button: "以郵件寄送摘要",
    news_heading: "最新新聞",
    trends_heading: "供應鏈趨勢",
    strategy_heading: "業務開發策略",
    fallback_heading: "完整報告",
    market_labels: ["全球 (Global)", "日本 (Japan)", "台灣供應鏈 (Taiwan)"],
};

static BUSINESS_JAPANESE: LanguageProfile = LanguageProfile {
    code: "ja",
    prompt_name: "商務日文 (Business Japanese)",
    display_name: "ビジネス日本語",
    page_title: "グローバル & 日本サーバー市場動向モニター",
    generate_button: "分析を開始してレポートを生成",
    busy_text: "サーバー市場の動向を分析しています...",
    success_text: "レポートの生成が完了しました！",
    retrying_text: "リクエストが集中しています。しばらくして自動的に再試行します",
    exhausted_text: "API の利用上限に達しました。時間をおいて再度お試しください。",
    failure_text: "実行エラー",
    busy_conflict_text: "別のレポートを生成中です。しばらくお待ちください。",
    no_market_text: "対象市場を一つ以上選択してください。",
    mail_subject: "サーバー市場インテリジェンス概要",
    mail_button: "概要をメールで送信",
    news_heading: "最新ニュース",
    trends_heading: "サプライチェーン動向",
    strategy_heading: "事業開発戦略",
    fallback_heading: "レポート全文",
    market_labels: ["グローバル (Global)", "日本 (Japan)", "台湾サプライチェーン (Taiwan)"],
};

static BUSINESS_ENGLISH: LanguageProfile = LanguageProfile {
    code: "en",
    prompt_name: "商務英文 (Business English)",
    display_name: "Business English",
    page_title: "Global & Japan Server Market Monitor",
    generate_button: "Analyze and generate report",
    busy_text: "Analyzing server market developments...",
    success_text: "Report generated!",
    retrying_text: "Rate limited by the API, retrying shortly",
    exhausted_text: "API quota exhausted. Please try again later.",
    failure_text: "Execution error",
    busy_conflict_text: "A report is already being generated. Please wait.",
    no_market_text: "Select at least one market.",
    mail_subject: "Server Market Intelligence Summary",
    mail_button: "Email summary",
    news_heading: "Latest News",
    trends_heading: "Supply Chain Trends",
    strategy_heading: "Business Development Strategy",
    fallback_heading: "Full Report",
    market_labels: ["Global", "Japan", "Taiwan Supply Chain"],
};

impl Language {
    pub const ALL: [Language; 3] = [
        Language::TraditionalChinese,
        Language::BusinessJapanese,
        Language::BusinessEnglish,
    ];

    pub fn profile(self) -> &'static LanguageProfile {
        match self {
            Language::TraditionalChinese => &TRADITIONAL_CHINESE,
            Language::BusinessJapanese => &BUSINESS_JAPANESE,
            Language::BusinessEnglish => &BUSINESS_ENGLISH,
        }
    }

    pub fn code(self) -> &'static str {
        self.profile().code
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|l| l.code() == code)
    }
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Global, Market::Japan, Market::TaiwanSupplyChain];

    /// Selection used when the user has not picked anything yet.
    pub const DEFAULT_SELECTION: [Market; 2] = [Market::Global, Market::Japan];

    pub fn code(self) -> &'static str {
        match self {
            Market::Global => "global",
            Market::Japan => "japan",
            Market::TaiwanSupplyChain => "taiwan",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    /// Deduplicate a selection and put it in canonical order.
    pub fn normalize_selection(selection: &[Market]) -> Vec<Market> {
        Self::ALL.into_iter().filter(|m| selection.contains(m)).collect()
    }

    pub fn label(self, language: Language) -> &'static str {
        let labels = &language.profile().market_labels;
        match self {
            Market::Global => labels[0],
            Market::Japan => labels[1],
            Market::TaiwanSupplyChain => labels[2],
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown language '{s}' (expected zh-tw, ja or en)"))
    }
}

impl std::str::FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown market '{s}' (expected global, japan or taiwan)"))
    }
}
