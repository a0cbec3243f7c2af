//! Chunk → notes/quiz per chunk → aggregate → merge.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::config::{LlmConfig, PipelineConfig};
use crate::services::chunker;
use crate::services::generator::{RigGenerator, TextGenerator};
use crate::services::prompts::{MERGE_PROMPT, NOTES_PROMPT, QUIZ_PROMPT};

/// Separator between per-chunk outputs in an aggregate.
pub const AGGREGATE_SEPARATOR: &str = "\n\n";

/// Notes and quiz produced for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub notes: String,
    pub quiz: String,
}

/// Sends each chunk to the notes and quiz backends at the same time.
#[derive(Clone)]
pub struct DualGenerator {
    notes: Arc<dyn TextGenerator>,
    quiz: Arc<dyn TextGenerator>,
}

impl DualGenerator {
    pub fn new(notes: Arc<dyn TextGenerator>, quiz: Arc<dyn TextGenerator>) -> Self {
        Self { notes, quiz }
    }

    /// Both requests are in flight together; the first failure wins.
    pub async fn generate(&self, chunk: &str) -> Result<GenerationResult> {
        let notes_prompt = NOTES_PROMPT.render(&[("topic", chunk)])?;
        let quiz_prompt = QUIZ_PROMPT.render(&[("topic", chunk)])?;

        let (notes, quiz) = tokio::try_join!(
            async {
                self.notes
                    .generate(&notes_prompt)
                    .await
                    .with_context(|| format!("Notes generation failed ({})", self.notes.model()))
            },
            async {
                self.quiz
                    .generate(&quiz_prompt)
                    .await
                    .with_context(|| format!("Quiz generation failed ({})", self.quiz.model()))
            },
        )?;

        Ok(GenerationResult { notes, quiz })
    }
}

/// Per-chunk outputs kept in chunk order.
#[derive(Debug, Default)]
pub struct Aggregate {
    notes: Vec<String>,
    quizzes: Vec<String>,
}

impl Aggregate {
    pub fn with_capacity(chunks: usize) -> Self {
        Self {
            notes: Vec::with_capacity(chunks),
            quizzes: Vec::with_capacity(chunks),
        }
    }

    pub fn push(&mut self, result: GenerationResult) {
        self.notes.push(result.notes);
        self.quizzes.push(result.quiz);
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Returns `(notes, quizzes)`, each joined with a blank line.
    pub fn join(&self) -> (String, String) {
        (
            self.notes.join(AGGREGATE_SEPARATOR),
            self.quizzes.join(AGGREGATE_SEPARATOR),
        )
    }
}

/// Folds the aggregated notes and quizzes into one document.
#[derive(Clone)]
pub struct Merger {
    backend: Arc<dyn TextGenerator>,
}

impl Merger {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self { backend }
    }

    pub async fn merge(&self, notes: &str, quizzes: &str) -> Result<String> {
        let prompt = MERGE_PROMPT.render(&[("notes", notes), ("quizes", quizzes)])?;
        self.backend
            .generate(&prompt)
            .await
            .with_context(|| format!("Merge failed ({})", self.backend.model()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    pub chunk_count: usize,
    pub notes: String,
    pub quizzes: String,
    pub merged: String,
}

#[derive(Clone)]
pub struct Pipeline {
    chunk_size: usize,
    dual: DualGenerator,
    merger: Merger,
}

impl Pipeline {
    pub fn new(chunk_size: usize, dual: DualGenerator, merger: Merger) -> Self {
        Self {
            chunk_size,
            dual,
            merger,
        }
    }

    /// Wires rig backends for the configured notes, quiz and merge models.
    pub fn from_config(llm: &LlmConfig, pipeline: &PipelineConfig) -> Result<Self> {
        let notes: Arc<dyn TextGenerator> = Arc::new(RigGenerator::new(llm, &llm.notes_model)?);
        let quiz: Arc<dyn TextGenerator> = Arc::new(RigGenerator::new(llm, &llm.quiz_model)?);
        let merge: Arc<dyn TextGenerator> = if llm.merge_model() == llm.notes_model {
            notes.clone()
        } else {
            Arc::new(RigGenerator::new(llm, llm.merge_model())?)
        };

        Ok(Self::new(
            pipeline.chunk_size,
            DualGenerator::new(notes, quiz),
            Merger::new(merge),
        ))
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Runs the whole pipeline over `text`.
    ///
    /// Chunks are processed strictly one after another. Any failure aborts
    /// the run and nothing computed so far is returned.
    pub async fn run(&self, text: &str) -> Result<PipelineOutput> {
        let started = Instant::now();
        let chunks = chunker::chunk_text(text, self.chunk_size);
        if chunks.is_empty() {
            bail!("No text to generate notes and quizzes from");
        }

        let total = chunks.len();
        tracing::info!("Generating notes and quizzes for {total} chunks");

        let mut aggregate = Aggregate::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            tracing::debug!("Chunk {}/{total} ({} chars)", index + 1, chunk.chars().count());
            let result = self
                .dual
                .generate(chunk)
                .await
                .with_context(|| format!("Chunk {} of {total}", index + 1))?;
            aggregate.push(result);
        }
        debug_assert_eq!(aggregate.len(), total);

        let (notes, quizzes) = aggregate.join();
        let merged = self.merger.merge(&notes, &quizzes).await?;

        tracing::info!(
            "Pipeline finished: {total} chunks in {:.1}s",
            started.elapsed().as_secs_f64()
        );

        Ok(PipelineOutput {
            chunk_count: total,
            notes,
            quizzes,
            merged,
        })
    }
}
