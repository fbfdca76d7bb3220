//! Checks that a local Ollama server can embed and chat with the configured models.

use speech_qa_core::provider::{ChatRequest, ChatResponse, Message, OllamaProvider, Provider};
use speech_qa_core::Config;
use std::io::Write;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match Config::load_or_default("config.yaml") {
        Ok(c) => {
            println!("Model: {}", c.llm.model);
            println!("Embedding model: {}", c.rag.embedding_model.id);
            println!("Base URL: {}", c.llm.base_url);
            c
        }
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    let provider = OllamaProvider::new(&config.llm.base_url);
    let embedding_model = &config.rag.embedding_model.id;

    println!("\nTesting embeddings with model: {}", embedding_model);
    let embedded = match provider.ensure_model(embedding_model).await {
        Ok(()) => provider.embed("Caste is a state of the mind.", embedding_model).await,
        Err(e) => Err(e),
    };
    match embedded {
        Ok(vector) => println!("Got a {}-dimensional vector", vector.len()),
        Err(e) => eprintln!("Embedding test failed: {}", e),
    }

    println!("\nTesting chat with model: {}", config.llm.model);
    let request = ChatRequest::new(&config.llm.model, vec![Message::user("Hi there!")])
        .with_temperature(config.llm.temperature);

    let result = provider
        .chat(
            request,
            Box::new(|response: ChatResponse| {
                print!("{}", response.content);
                std::io::stdout().flush().ok();
            }),
        )
        .await;

    match result {
        Ok(()) => println!("\n\nChat test successful!"),
        Err(e) => {
            eprintln!("\n\nChat test failed: {}", e);
            eprintln!("\nTroubleshooting:");
            eprintln!("  1. Is Ollama running? (ollama serve)");
            eprintln!("  2. Is the model pulled? (ollama pull {})", config.llm.model);
            eprintln!("  3. Is the base URL correct? ({})", config.llm.base_url);
        }
    }
}
