//! Versioned defaults for the chart layout and the analysis prompt.
//!
//! Changing a study or the prompt wording means adding a new version here and
//! pointing `CURRENT_*` at it; the pipeline itself stays the same.

use serde::Serialize;

pub const EXCHANGE_PREFIX: &str = "BINANCE";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_overlay: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<StudyInput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StudyInput {
    #[serde(rename_all = "camelCase")]
    MovingAverageMultiple {
        first_periods: u32,
        second_periods: u32,
        third_periods: u32,
        method: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ChartPreset {
    pub version: &'static str,
    pub theme: &'static str,
    pub show_study_last_value: bool,
    pub studies: &'static [Study],
}

pub const CHART_PRESET_V1: ChartPreset = ChartPreset {
    version: "v1",
    theme: "dark",
    show_study_last_value: false,
    studies: &[
        Study {
            name: "Volume",
            force_overlay: Some(true),
            input: None,
        },
        Study {
            name: "Moving Average Multiple",
            force_overlay: None,
            input: Some(StudyInput::MovingAverageMultiple {
                first_periods: 5,
                second_periods: 10,
                third_periods: 20,
                method: "Exponential",
            }),
        },
        Study {
            name: "MACD",
            force_overlay: None,
            input: None,
        },
    ],
};

pub const CURRENT_CHART_PRESET: ChartPreset = CHART_PRESET_V1;

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub version: &'static str,
    pub body: &'static str,
    pub temperature: f64,
    pub fallback_report: &'static str,
}

impl PromptTemplate {
    pub fn render(&self, symbol: &str) -> String {
        self.body.replace("{symbol}", symbol)
    }
}

pub const PROMPT_TEMPLATE_V1: PromptTemplate = PromptTemplate {
    version: "v1",
    temperature: 0.1,
    fallback_report: "AI 分析失敗，請稍後再試。",
    body: r#"
你是一位專業的技術分析師，專門分析加密貨幣走勢。

我會提供你一張技術分析圖表，包含多條移動平均線（EMA）與 MACD 指標。請根據圖中走勢給出下列分析報告，語氣與格式請模仿 CoinAnk 行情分析風格，保持專業、條列清楚、簡潔易讀。

請依下列格式回覆：

---
【技術分析報告】
幣種代號：{symbol}
趨勢判斷：請根據 EMA 排列與 MACD 指標給出：「偏多 / 偏空 / 震盪整理」

技術解讀：
- 均線系統：根據 EMA 的排列關係，說明是否呈現多頭排列、空頭排列或均線糾結。
- MACD：說明目前是金叉或死叉，柱狀圖變化，是否顯示趨勢改變。

操作建議：
請從以下五項中選擇一個：「強力買入 / 買入 / 中立 / 賣出 / 強力賣出」，並簡要說明依據。

注意事項：
- 報告務必以條列清楚呈現，易讀性為優先
- 不需展開過程，只需給出結論與解讀
---
"#,
};

pub const CURRENT_PROMPT_TEMPLATE: PromptTemplate = PROMPT_TEMPLATE_V1;
