//! Question/answer output and the interactive loop.

use anyhow::Result;
use colored::Colorize;
use speech_qa_core::{QaChain, QueryResult};
use std::io::{self, BufRead, Write};

/// Words that end the interactive session, compared case-insensitively.
const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

fn is_exit(input: &str) -> bool {
    EXIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

/// Asks one question, streaming the answer to `out` as it is generated.
pub async fn ask<W: Write + Send>(chain: &QaChain, question: &str, out: &mut W) -> Result<QueryResult> {
    writeln!(out)?;
    writeln!(out, "{} {}", "Question:".bold(), question)?;
    write!(out, "{} ", "Answer:".bold().green())?;
    out.flush()?;

    let result = chain
        .ask_stream(question, |token| {
            // A closed stdout surfaces on the trailing newline below
            let _ = write!(out, "{}", token);
            let _ = out.flush();
        })
        .await?;

    writeln!(out)?;
    if !result.retrieved_chunks.is_empty() {
        writeln!(out, "{}", format!("(Retrieved {} relevant chunks)", result.retrieved_chunks.len()).dimmed())?;
    }

    Ok(result)
}

/// Reads questions line by line from `input` until an exit word or EOF.
///
/// Empty lines are skipped. A failed question is reported and the loop
/// carries on with the next one.
pub async fn run_interactive<R: BufRead, W: Write + Send>(chain: &QaChain, input: R, out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Interactive Mode - Type your questions (or 'quit'/'exit' to stop)")?;
    writeln!(out)?;

    let mut lines = input.lines();
    loop {
        write!(out, "{} ", "You:".bold().cyan())?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            writeln!(out, "Goodbye!")?;
            return Ok(());
        };
        let line = line?;
        let question = line.trim();

        if is_exit(question) {
            writeln!(out)?;
            writeln!(out, "Goodbye!")?;
            return Ok(());
        }
        if question.is_empty() {
            continue;
        }

        if let Err(e) = ask(chain, question, out).await {
            writeln!(out)?;
            writeln!(out, "{} {}", "Error:".red().bold(), e)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use speech_qa_core::provider::{self, Message};
    use speech_qa_core::qa::{Generator, Retriever};
    use speech_qa_core::rag::{Chunk, EmbedderError, RagError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns two chunks, or fails for the question "boom".
    struct StubRetriever;

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<Chunk>, RagError> {
            if query == "boom" {
                return Err(RagError::Embedder(EmbedderError::NoEmbeddings));
            }
            Ok(vec![Chunk::new("one"), Chunk::new("two")].into_iter().take(k).collect())
        }
    }

    #[derive(Default)]
    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn complete(
            &self,
            _messages: &[Message],
            on_token: &mut (dyn FnMut(&str) + Send),
        ) -> provider::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            on_token("Liberty, ");
            on_token("equality.");
            Ok("Liberty, equality.".to_string())
        }
    }

    fn chain(generator: Arc<CountingGenerator>) -> QaChain {
        QaChain::new(Arc::new(StubRetriever), generator)
    }

    async fn session(input: &str) -> (String, usize) {
        colored::control::set_override(false);
        let generator = Arc::new(CountingGenerator::default());
        let mut out = Vec::new();
        run_interactive(&chain(generator.clone()), input.as_bytes(), &mut out)
            .await
            .unwrap();
        (String::from_utf8(out).unwrap(), generator.calls.load(Ordering::SeqCst))
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit("quit"));
        assert!(is_exit("EXIT"));
        assert!(is_exit("Q"));
        assert!(!is_exit("quite"));
        assert!(!is_exit(""));
    }

    #[tokio::test]
    async fn test_ask_prints_answer_and_chunk_count() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let result = ask(&chain(Arc::default()), "What is liberty?", &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(result.answer, "Liberty, equality.");
        assert!(printed.contains("Question: What is liberty?"));
        assert!(printed.contains("Answer: Liberty, equality."));
        assert!(printed.contains("(Retrieved 2 relevant chunks)"));
    }

    #[tokio::test]
    async fn test_quit_stops_before_later_questions() {
        let (printed, calls) = session("first\nquit\nsecond\n").await;
        assert_eq!(calls, 1);
        assert!(printed.contains("Question: first"));
        assert!(!printed.contains("Question: second"));
        assert!(printed.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_empty_lines_are_skipped_and_eof_ends() {
        let (printed, calls) = session("\n   \nfirst\n\n").await;
        assert_eq!(calls, 1);
        assert!(printed.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_failed_question_does_not_end_session() {
        let (printed, calls) = session("boom\nafter\nexit\n").await;
        assert_eq!(calls, 1);
        assert!(printed.contains("Error: Retrieval failed"));
        assert!(printed.contains("Question: after"));
    }
}
