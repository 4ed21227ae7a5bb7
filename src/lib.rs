//! Kestrel — extensible task-execution runtime for AI agents.
//!
//! Given a natural-language task, Kestrel drives an opaque language-model
//! provider through a bounded sequence of reasoning/tool-use steps,
//! dispatches tool calls to a dynamically loaded set of capability skills,
//! enforces a filesystem sandbox around what those skills may read or
//! write, and runs a post-hoc quality gate that critiques and optionally
//! rewrites the final answer before release.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kestrel::prelude::*;
//!
//! # async fn example(provider: Arc<dyn kestrel::provider::ModelProvider>) -> kestrel::error::Result<()> {
//! let registry = Arc::new(SkillRegistry::new());
//! let sink = Arc::new(BufferSink::new());
//! let engine = RunEngine::new(provider, registry, sink.clone(), EngineConfig::default());
//!
//! engine.wake(None).await?;
//! let report = engine.execute("Summarize the workspace", RunOptions::default()).await?;
//! println!("{}: {}", report.status, report.final_text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod sandbox;
pub mod sink;
pub mod skills;
pub mod types;
