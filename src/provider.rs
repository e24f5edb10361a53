/// Engine providers and the fallback chain that tries them in order.
///
/// Each provider inspects an uploaded file and either produces a ready query
/// engine or explains why it cannot. The chain records every rejection so a
/// caller can report which provider won and what the others said.

use log::{debug, info};

use crate::engine::QueryExecutor;
use crate::error::EngineError;
use crate::interpreter::InterpreterEngine;
use crate::upload::{tables_from_csv, tables_from_json, tables_from_upload, Upload};

/// A strategy for turning an uploaded file into a live query engine.
pub trait EngineProvider {
    /// Short name used in logs and load reports.
    fn name(&self) -> &str;

    /// Try to open the upload. A rejection here moves the chain on to the
    /// next provider.
    fn open(&self, upload: &Upload) -> Result<Box<dyn QueryExecutor + Send>, EngineError>;
}

/// The engine produced by a chain, the provider that produced it, and the
/// rejections collected from the providers tried before it.
pub struct LoadOutcome {
    pub engine: Box<dyn QueryExecutor + Send>,
    pub provider: String,
    pub rejections: Vec<(String, EngineError)>,
}

/// An ordered list of providers, tried front to back.
pub struct ProviderChain {
    providers: Vec<Box<dyn EngineProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        ProviderChain {
            providers: Vec::new(),
        }
    }

    /// The default chain: strict tabular parsing first, then the interpreter
    /// fallback that accepts anything.
    pub fn standard() -> Self {
        let mut chain = ProviderChain::new();
        chain.push(Box::new(TabularFileProvider));
        chain.push(Box::new(InterpreterProvider));
        chain
    }

    pub fn push(&mut self, provider: Box<dyn EngineProvider>) {
        self.providers.push(provider);
    }

    /// Try each provider in order, returning the first engine produced.
    /// Fails only when every provider rejects the upload.
    pub fn open(&self, upload: &Upload) -> Result<LoadOutcome, EngineError> {
        let mut rejections = Vec::new();

        for provider in &self.providers {
            match provider.open(upload) {
                Ok(engine) => {
                    info!("provider {} opened {}", provider.name(), upload.name);
                    return Ok(LoadOutcome {
                        engine,
                        provider: provider.name().to_string(),
                        rejections,
                    });
                }
                Err(err) => {
                    debug!("provider {} rejected {}: {}", provider.name(), upload.name, err);
                    rejections.push((provider.name().to_string(), err));
                }
            }
        }

        Err(EngineError::LoadFailure(format!(
            "no provider could open {}",
            upload.name
        )))
    }
}

impl Default for ProviderChain {
    fn default() -> Self {
        ProviderChain::standard()
    }
}

// ============================================================================
// Built-in providers
// ============================================================================

/// Strict CSV and JSON parsing. Rejects other extensions and files that do
/// not parse cleanly into at least one table.
pub struct TabularFileProvider;

impl EngineProvider for TabularFileProvider {
    fn name(&self) -> &str {
        "tabular"
    }

    fn open(&self, upload: &Upload) -> Result<Box<dyn QueryExecutor + Send>, EngineError> {
        let extension = upload.extension().unwrap_or_default();
        let parse = match extension.as_str() {
            "csv" => tables_from_csv,
            "json" => tables_from_json,
            _ => {
                return Err(EngineError::UnrecognizedFile(format!(
                    "unsupported file extension for {}",
                    upload.name
                )))
            }
        };

        let text = upload.as_text().ok_or_else(|| {
            EngineError::UnrecognizedFile(format!("{} is not valid UTF-8", upload.name))
        })?;

        match parse(&upload.name, text) {
            Some(tables) if !tables.is_empty() => Ok(Box::new(InterpreterEngine::new(tables))),
            _ => Err(EngineError::UnrecognizedFile(format!(
                "could not parse {} as {}",
                upload.name, extension
            ))),
        }
    }
}

/// Last-resort provider. Accepts any upload by building interpreter tables
/// from it, falling back to a single diagnostic table for unreadable files.
pub struct InterpreterProvider;

impl EngineProvider for InterpreterProvider {
    fn name(&self) -> &str {
        "interpreter"
    }

    fn open(&self, upload: &Upload) -> Result<Box<dyn QueryExecutor + Send>, EngineError> {
        Ok(Box::new(InterpreterEngine::new(tables_from_upload(upload))))
    }
}
