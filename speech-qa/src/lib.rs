//! speech-qa - Ask questions about a speech, answered from the speech itself
//!
//! This is the convenience wrapper crate that re-exports the core pipeline.
//!
//! # Quick Start
//!
//! ```no_run
//! use speech_qa::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load_or_default("config.yaml")?;
//! let provider = Arc::new(OllamaProvider::new(&config.llm.base_url));
//!
//! let session = setup(&config, provider, &SetupOptions::from_config(&config)).await?;
//! let result = session.chain.ask("What is the real remedy?").await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use speech_qa_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use speech_qa_core::{
        setup, Config, IndexOrigin, OllamaProvider, Provider, QaChain, QueryResult, Session, SetupError,
        SetupOptions,
    };
}
