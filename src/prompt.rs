//! Prompt assembly for context-restricted answers.

/// Sentence the generator is instructed to answer with when the context is silent.
pub const FALLBACK_ANSWER: &str =
    "I do not have the necessary information to answer your question.";

const RULES: &str = "RULES:\n\
- Answer only based on the CONTEXT.\n\
- If the information is not explicitly in the CONTEXT, answer:\n  \"";

const OUT_OF_CONTEXT_QUESTIONS: [&str; 3] = [
    "What is the capital of France?",
    "How many customers do we have in 2024?",
    "Do you think this is good or bad?",
];

/// Builds the prompt sent to the generator.
///
/// Sections appear in a fixed order: the retrieved context joined by blank
/// lines, the answering rules, out-of-context examples that all map to
/// [`FALLBACK_ANSWER`], and finally the user's question verbatim.
pub fn assemble<S: AsRef<str>>(context_chunks: &[S], query: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("CONTEXT:\n");
    for (idx, chunk) in context_chunks.iter().enumerate() {
        if idx > 0 {
            prompt.push_str("\n\n");
        }
        prompt.push_str(chunk.as_ref());
    }
    prompt.push_str("\n\n");

    prompt.push_str(RULES);
    prompt.push_str(FALLBACK_ANSWER);
    prompt.push_str("\"\n");
    prompt.push_str("- Never invent or use outside knowledge.\n");
    prompt.push_str("- Never give opinions or interpretations beyond what is written.\n\n");

    prompt.push_str("EXAMPLES OF OUT-OF-CONTEXT QUESTIONS:\n");
    for question in OUT_OF_CONTEXT_QUESTIONS {
        prompt.push_str(&format!(
            "Question: \"{question}\"\nAnswer: \"{FALLBACK_ANSWER}\"\n\n"
        ));
    }

    prompt.push_str("USER QUESTION:\n");
    prompt.push_str(query);
    prompt.push_str("\n\nANSWER THE \"USER QUESTION\"\n");
    prompt
}
