//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::completion::Completion;
use crate::error::{Error, Result};
use crate::extract::TextExtractor;
use crate::fetch::{Fetcher, HttpResponse};
use crate::models::{ExtractedText, SourceDocument};
use crate::search::WebSearch;

/// Returns its canned URLs verbatim, whatever the limit, and records calls.
pub struct StubSearch {
    urls: Vec<String>,
    failure: Option<String>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl StubSearch {
    pub fn new<S: Into<String>>(urls: Vec<S>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::empty()
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for StubSearch {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push((query.to_string(), limit));
        match &self.failure {
            Some(msg) => Err(Error::SearchFailure(msg.clone())),
            None => Ok(self.urls.clone()),
        }
    }
}

/// Serves canned responses per URL; unknown URLs fail like a refused connection.
pub struct StubFetcher {
    responses: HashMap<String, std::result::Result<HttpResponse, String>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, url: &str, response: std::result::Result<HttpResponse, String>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn ok(self, url: &str, body: &[u8]) -> Self {
        self.with(
            url,
            Ok(HttpResponse {
                status: 200,
                body: body.to_vec(),
            }),
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str) -> std::result::Result<HttpResponse, String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(format!("connection refused: {}", url)))
    }
}

/// Maps exact byte contents to text; anything else is unparseable.
pub struct StubExtractor {
    texts: Vec<(Vec<u8>, String)>,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self { texts: Vec::new() }
    }

    pub fn with(mut self, bytes: &[u8], text: &str) -> Self {
        self.texts.push((bytes.to_vec(), text.to_string()));
        self
    }
}

impl TextExtractor for StubExtractor {
    fn extract(&self, doc: &SourceDocument) -> Result<ExtractedText> {
        self.texts
            .iter()
            .find(|(bytes, _)| bytes.as_slice() == doc.bytes())
            .map(|(_, text)| ExtractedText::new(text.clone()))
            .ok_or_else(|| Error::UnparseableDocument("stub: unknown bytes".to_string()))
    }
}

/// One recorded completion call.
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub persona: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Answers by the first rule whose needle occurs in the prompt, else the default.
pub struct ScriptedCompletion {
    rules: Vec<(String, std::result::Result<String, String>)>,
    default: std::result::Result<String, String>,
    calls: Mutex<Vec<CompletionCall>>,
}

impl ScriptedCompletion {
    pub fn answering(default: &str) -> Self {
        Self {
            rules: Vec::new(),
            default: Ok(default.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn when(mut self, needle: &str, answer: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(answer.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str, error: &str) -> Self {
        self.rules.push((needle.to_string(), Err(error.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, persona: &str, prompt: &str, temperature: f32) -> Result<String> {
        self.calls.lock().unwrap().push(CompletionCall {
            persona: persona.to_string(),
            prompt: prompt.to_string(),
            temperature,
        });
        let answer = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, answer)| answer)
            .unwrap_or(&self.default);
        answer.clone().map_err(Error::SummarizationFailure)
    }
}

/// A valid PDF with one page per entry, each showing that text in Courier.
pub fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
