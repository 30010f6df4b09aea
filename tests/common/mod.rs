#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfrag::{AnswerGenerator, Embedder, ProviderError, FALLBACK_ANSWER};

/// Writes a PDF with one line of Courier text per page.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("save pdf");
    path
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
}

/// Bag-of-words embedder over a fixed vocabulary plus a constant bias slot.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.vocabulary.len() + 1
    }
}

impl Embedder for KeywordEmbedder {
    fn provider(&self) -> &'static str {
        "test"
    }

    fn model(&self) -> &str {
        "keywords"
    }

    fn batch_size(&self) -> usize {
        8
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimension()];
                for word in words(text) {
                    if let Some(idx) = self.vocabulary.iter().position(|v| *v == word) {
                        vector[idx] += 1.0;
                    }
                }
                vector[self.vocabulary.len()] = 0.5;
                vector
            })
            .collect())
    }
}

const STOPWORDS: &[&str] = &[
    "what", "which", "when", "where", "have", "does", "that", "this", "with", "there", "think",
];

/// Follows the prompt rules literally: answers with the context sentence that
/// mentions a keyword of the question, otherwise with the fallback sentence.
pub struct ContextOnlyGenerator;

impl AnswerGenerator for ContextOnlyGenerator {
    fn provider(&self) -> &'static str {
        "test"
    }

    fn model(&self) -> &str {
        "context-only"
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let section = |start: &str, end: &str| -> String {
            let from = prompt.find(start).map(|idx| idx + start.len()).unwrap_or(0);
            let to = prompt[from..].find(end).map(|idx| from + idx).unwrap_or(prompt.len());
            prompt[from..to].to_string()
        };
        let context = section("CONTEXT:\n", "\n\nRULES:");
        let question = section("USER QUESTION:\n", "\n\nANSWER THE");
        let keywords: Vec<String> = words(&question)
            .filter(|word| word.len() > 3 && !STOPWORDS.contains(&word.as_str()))
            .collect();

        let sentence = context
            .split_inclusive('.')
            .map(str::trim)
            .find(|sentence| words(sentence).any(|word| keywords.contains(&word)));
        Ok(sentence.unwrap_or(FALLBACK_ANSWER).to_string())
    }
}
