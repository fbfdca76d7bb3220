use speech_qa_core::models::{Model, ModelRegistry};

fn main() {
    let registry = ModelRegistry::new();

    println!("=== All Models ===");
    for model in registry.all_models() {
        match model {
            Model::Chat(chat) => {
                println!("Chat: {} - temp: {}", chat.name, chat.default_temperature);
            }
            Model::Embedding(embed) => {
                println!("Embedding: {} - {} dims", embed.name, embed.embedding_dim);
            }
        }
    }

    println!("\n=== Get Specific Model ===");
    if let Some(embed) = registry.get_embedding("nomic-embed-text:latest") {
        println!("Found: {} ({})", embed.name, embed.id);
        println!("Embedding dimension: {}", embed.embedding_dim);
    }

    println!("\n=== Embedding Models Only ===");
    for embed in registry.embedding_models() {
        println!("{} ({})", embed.name, embed.id);
    }
}
