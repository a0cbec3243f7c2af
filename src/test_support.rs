//! In-memory backends for exercising the pipeline without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::services::generator::TextGenerator;

/// Answers call `n` with `"{label} #{n}"` and records every prompt.
pub struct ScriptedGenerator {
    label: String,
    prompts: Mutex<Vec<String>>,
    fail_on: Option<usize>,
}

impl ScriptedGenerator {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            prompts: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Makes the zero-based call `index` return an error.
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let index = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };
        tokio::task::yield_now().await;

        if self.fail_on == Some(index) {
            bail!("{} backend unavailable", self.label);
        }
        Ok(format!("{} #{index}", self.label))
    }
}

/// Tracks how many requests are in flight at once.
#[derive(Clone)]
pub struct ConcurrencyTracker {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    pair: Arc<Barrier>,
}

impl ConcurrencyTracker {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            pair: Arc::new(Barrier::new(2)),
        }
    }

    /// A backend that only answers once its partner request is also waiting.
    pub fn generator(&self, label: &str) -> TrackedGenerator {
        TrackedGenerator {
            label: label.to_string(),
            tracker: self.clone(),
            paired: true,
        }
    }

    pub fn solo_generator(&self, label: &str) -> TrackedGenerator {
        TrackedGenerator {
            label: label.to_string(),
            tracker: self.clone(),
            paired: false,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub struct TrackedGenerator {
    label: String,
    tracker: ConcurrencyTracker,
    paired: bool,
}

#[async_trait]
impl TextGenerator for TrackedGenerator {
    fn model(&self) -> &str {
        &self.label
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        let now = self.tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.paired {
            self.tracker.pair.wait().await;
        }
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.label.clone())
    }
}

/// Builds a PDF with one page per entry, each drawn in Courier at the top
/// left. An empty entry gives a page with no text at all.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

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

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.clone(),
            "Count" => kids.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
