//! Section summarizer.
//!
//! Builds one templated instruction per section (business, financial, or a
//! free-form extra topic), embeds the extracted text, and asks the
//! [`Completion`] collaborator for a bullet-point digest. Calls are
//! single-shot: identical input may produce different output, and failures
//! propagate as [`Error::SummarizationFailure`] for the caller to isolate.

use tracing::{debug, info};

use crate::completion::Completion;
use crate::config::CompletionConfig;
use crate::error::{Error, Result};
use crate::models::{ExtractedText, SummaryRequest, TopicKind};

pub const ANALYST_PERSONA: &str = "あなたは優秀な企業アナリストです。";
pub const FINANCIAL_ANALYST_PERSONA: &str = "あなたは優秀な財務アナリストです。";

const BUSINESS_POINTS: [&str; 5] = [
    "主力商品・サービス",
    "顧客層（BtoB / BtoC、業種、地域など）",
    "ビジネスモデル（収益の仕組み）",
    "主な競合企業",
    "その他の特徴・強み",
];

const FINANCIAL_POINTS: [&str; 5] = [
    "売上高・営業利益・純利益などの主要な数値",
    "セグメント別の売上・利益の内訳",
    "成長・減益の主な要因",
    "特筆すべき財務イベント（M&A、増資、減損など）",
    "資料から読み取れない数値は推測せず「不明」と記載すること",
];

/// The persona and user prompt for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub persona: &'static str,
    pub body: String,
}

/// Render the instruction for `request`. Pure; no collaborator calls.
pub fn build_prompt(request: &SummaryRequest<'_>) -> Prompt {
    let text = request.source_text.prefix(request.truncation_limit);
    match request.kind {
        TopicKind::Business => {
            let mut body = String::from(
                "以下のIR資料の内容をもとに、企業の事業内容を次の観点で箇条書きで要約してください。\n\n",
            );
            push_points(&mut body, &BUSINESS_POINTS);
            if let Some(topic) = request.topic_label.filter(|t| !t.trim().is_empty()) {
                body.push_str(&format!("- 追加観点: {}\n", topic.trim()));
            }
            push_document(&mut body, text);
            Prompt {
                persona: ANALYST_PERSONA,
                body,
            }
        }
        TopicKind::Financial => {
            let mut body = String::from(
                "以下のIR資料の内容をもとに、企業の財務状況を次の観点で箇条書きで要約してください。\n\n",
            );
            push_points(&mut body, &FINANCIAL_POINTS);
            push_document(&mut body, text);
            Prompt {
                persona: FINANCIAL_ANALYST_PERSONA,
                body,
            }
        }
        TopicKind::Custom => {
            let topic = request.topic_label.unwrap_or("").trim();
            let mut body = format!(
                "以下のIR資料の内容をもとに、「{}」に関する情報だけを箇条書きで要約してください。\n\
                 資料に記載がない場合は推測せず「不明」と記載してください。\n",
                topic
            );
            push_document(&mut body, text);
            Prompt {
                persona: ANALYST_PERSONA,
                body,
            }
        }
    }
}

fn push_points(body: &mut String, points: &[&str]) {
    for point in points {
        body.push_str("- ");
        body.push_str(point);
        body.push('\n');
    }
}

fn push_document(body: &mut String, text: &str) {
    body.push_str("\nIR資料:\n");
    body.push_str(text);
}

pub struct Summarizer<'a> {
    completion: &'a dyn Completion,
    temperature: f32,
    truncation_limit: Option<usize>,
}

impl<'a> Summarizer<'a> {
    pub fn new(completion: &'a dyn Completion, config: &CompletionConfig) -> Self {
        Self {
            completion,
            temperature: config.temperature,
            truncation_limit: config.truncate_chars,
        }
    }

    pub async fn summarize_business(
        &self,
        text: &ExtractedText,
        extra_topic: Option<&str>,
    ) -> Result<String> {
        self.summarize(self.request(TopicKind::Business, extra_topic, text))
            .await
    }

    pub async fn summarize_financial(&self, text: &ExtractedText) -> Result<String> {
        self.summarize(self.request(TopicKind::Financial, None, text))
            .await
    }

    pub async fn summarize_custom(&self, text: &ExtractedText, topic: &str) -> Result<String> {
        if topic.trim().is_empty() {
            return Err(Error::InvalidInput("custom topic is empty".to_string()));
        }
        self.summarize(self.request(TopicKind::Custom, Some(topic), text))
            .await
    }

    /// Send one request and return the trimmed reply. A blank reply is a failure.
    pub async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String> {
        let prompt = build_prompt(&request);
        info!(kind = ?request.kind, topic = request.topic_label.unwrap_or(""), "summarizing section");
        debug!(prompt_chars = prompt.body.chars().count(), "prompt built");

        let reply = self
            .completion
            .complete(prompt.persona, &prompt.body, self.temperature)
            .await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::SummarizationFailure(
                "model returned an empty response".to_string(),
            ));
        }
        Ok(reply.to_string())
    }

    fn request<'r>(
        &self,
        kind: TopicKind,
        topic_label: Option<&'r str>,
        source_text: &'r ExtractedText,
    ) -> SummaryRequest<'r> {
        SummaryRequest {
            kind,
            topic_label,
            source_text,
            truncation_limit: self.truncation_limit,
        }
    }
}
