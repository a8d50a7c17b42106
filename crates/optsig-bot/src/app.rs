//! Main application orchestration.
//!
//! Reads JSON-lines message records, runs each through the instruction
//! pipeline in arrival order and writes one JSON line per instruction:
//! - Input from a file or stdin
//! - Output to a file or stdout
//! - Optional open-positions snapshot for the last resolution fallback
//! - Prometheus text dump at shutdown

use crate::config::AppConfig;
use crate::error::AppResult;
use chrono::{Local, NaiveDateTime};
use optsig_context::{ContextResolver, HistoryBuffer, InstructionPipeline, PositionBook};
use optsig_core::{Instruction, MessageRecord, SymbolComposer};
use optsig_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// One output line: the instruction tagged with its record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionLine {
    pub record_id: String,
    #[serde(flatten)]
    pub instruction: Instruction,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Non-empty input lines.
    pub lines_read: u64,
    /// Lines that were not a valid message record.
    pub skipped: u64,
    /// Instructions written.
    pub emitted: u64,
    pub unclassified: u64,
    /// Actionable instructions left without a canonical symbol.
    pub incomplete: u64,
}

impl RunStats {
    fn tally(&mut self, instruction: &Instruction) {
        self.emitted += 1;
        if instruction.is_unclassified() {
            self.unclassified += 1;
        } else if instruction.is_instrument_bearing() && instruction.canonical_symbol.is_none() {
            self.incomplete += 1;
        }
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    pipeline: InstructionPipeline,
}

impl Application {
    /// Create a new application, loading the positions snapshot if one is
    /// configured.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let mut resolver = ContextResolver::new(config.resolver.settings())?;
        if let Some(path) = &config.positions.snapshot_path {
            let book = PositionBook::from_snapshot_file(path)?;
            info!(path = %path.display(), positions = book.len(), "Loaded positions snapshot");
            resolver = resolver.with_positions(Arc::new(book));
        }

        let composer = SymbolComposer::new(config.resolver.weekly_cutoff_hour);
        let history = HistoryBuffer::with_capacity_limit(config.resolver.history_capacity);

        Ok(Self {
            config,
            pipeline: InstructionPipeline::new(resolver, composer, history),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &InstructionPipeline {
        &self.pipeline
    }

    /// Run over the configured input until EOF or Ctrl-C.
    pub async fn run(mut self) -> AppResult<RunStats> {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &self.config.input.path {
            Some(path) => {
                info!(path = %path.display(), "Reading records from file");
                Box::new(BufReader::new(tokio::fs::File::open(path).await?))
            }
            None => {
                info!("Reading records from stdin");
                Box::new(BufReader::new(tokio::io::stdin()))
            }
        };

        let writer: Box<dyn AsyncWrite + Unpin + Send> = match &self.config.output.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Box::new(tokio::fs::File::create(path).await?)
            }
            None => Box::new(tokio::io::stdout()),
        };

        let stats = self.process_stream(reader, writer).await?;
        self.write_metrics().await?;
        Ok(stats)
    }

    /// Process every line of `reader`, writing instructions to `writer`.
    ///
    /// Stops at EOF or on Ctrl-C. Malformed lines are logged and skipped.
    pub async fn process_stream<R, W>(&mut self, reader: R, mut writer: W) -> AppResult<RunStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut stats = RunStats::default();

        info!("Entering main loop");
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            self.handle_line(&line, &mut writer, &mut stats).await?;
                        }
                        None => {
                            debug!("End of input");
                            break;
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        writer.flush().await?;
        info!(
            lines_read = stats.lines_read,
            emitted = stats.emitted,
            skipped = stats.skipped,
            unclassified = stats.unclassified,
            incomplete = stats.incomplete,
            "Shutting down"
        );
        Ok(stats)
    }

    async fn handle_line<W>(
        &mut self,
        line: &str,
        writer: &mut W,
        stats: &mut RunStats,
    ) -> AppResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        stats.lines_read += 1;

        let record: MessageRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                stats.skipped += 1;
                warn!(error = %e, line_no = stats.lines_read, "Skipping malformed record");
                return Ok(());
            }
        };

        let record_id = record.id.clone();
        let instruction = self.pipeline.process(record, received_at());
        if instruction.is_instrument_bearing() && instruction.canonical_symbol.is_none() {
            warn!(
                record_id = %record_id,
                action = %instruction.action,
                "Instruction incomplete, no canonical symbol"
            );
        }
        stats.tally(&instruction);

        let mut json = serde_json::to_string(&InstructionLine {
            record_id,
            instruction,
        })?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        Ok(())
    }

    async fn write_metrics(&self) -> AppResult<()> {
        if let Some(path) = &self.config.telemetry.metrics_path {
            let text = Metrics::encode_text()?;
            tokio::fs::write(path, text).await?;
            info!(path = %path.display(), "Wrote metrics");
        }
        Ok(())
    }
}

/// Stand-in reference time for records without a timestamp.
fn received_at() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_process_stream_skips_bad_lines() {
        let input = concat!(
            r#"{"id":"1","timestamp":"2026-02-02 10:00:00","text":"TSLA 440c 2/9 3.1","group_position":"first"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"id":"2","timestamp":"2026-02-02 10:01:00","text":"止损在2.9","group_position":"last"}"#,
            "\n",
        );
        let reader = BufReader::new(Builder::new().read(input.as_bytes()).build());
        let mut output = Vec::new();

        let mut app = Application::new(AppConfig::default()).unwrap();
        let stats = app.process_stream(reader, &mut output).await.unwrap();

        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.incomplete, 0);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<InstructionLine> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].record_id, "2");
        assert_eq!(
            lines[1].instruction.canonical_symbol.as_ref().map(|s| s.as_str()),
            Some("TSLA260209C440000.US")
        );
    }

    #[test]
    fn test_stats_tally() {
        let mut stats = RunStats::default();
        stats.tally(&Instruction::unclassified("hi"));
        stats.tally(&Instruction::new(
            "止损在2.9",
            optsig_core::Action::Modify {
                stop_loss: None,
                take_profit: None,
            },
        ));
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.unclassified, 1);
        assert_eq!(stats.incomplete, 1);
    }

    #[test]
    fn test_new_fails_on_missing_snapshot() {
        let mut config = AppConfig::default();
        config.positions.snapshot_path = Some("/nonexistent/positions.json".into());
        assert!(Application::new(config).is_err());
    }
}
