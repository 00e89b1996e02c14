//! Session state machine: selection, dataset load, paced streaming, verdict

use super::{BatchCursor, Inbound, SessionConfig, SessionState, Transport};
use crate::classifier::Classifier;
use crate::dataset::{load_csv, DatasetCatalog, FeatureTable, Preprocessor};
use crate::error::{DatasetError, PreprocessError, SessionError};
use crate::models::{Label, SelectionRequest, ServerMessage};
use crate::observability::{StreamMetrics, StructuredLogger};
use crate::vote::majority_vote;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Read-only collaborators shared by every session
#[derive(Clone)]
pub struct SessionContext {
    pub classifier: Arc<dyn Classifier>,
    pub catalog: Arc<DatasetCatalog>,
    pub preprocessor: Preprocessor,
    pub config: SessionConfig,
    pub metrics: StreamMetrics,
    pub logger: StructuredLogger,
}

impl SessionContext {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        catalog: Arc<DatasetCatalog>,
        config: SessionConfig,
    ) -> Self {
        Self {
            classifier,
            catalog,
            preprocessor: Preprocessor::default(),
            config,
            metrics: StreamMetrics::new(),
            logger: StructuredLogger::new("canids"),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }
}

/// What a finished session did
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: u64,
    pub state: SessionState,
    pub category: Option<String>,
    pub interval_results: Vec<Label>,
    pub verdict: Option<Label>,
    pub rows_consumed: usize,
    pub error: Option<SessionError>,
}

/// One client's stream session
pub struct StreamingSession {
    id: u64,
    ctx: Arc<SessionContext>,
    state: SessionState,
    category: Option<String>,
    interval_results: Vec<Label>,
    rows_consumed: usize,
}

impl StreamingSession {
    pub fn new(id: u64, ctx: Arc<SessionContext>) -> Self {
        Self {
            id,
            ctx,
            state: SessionState::AwaitingSelection,
            category: None,
            interval_results: Vec::new(),
            rows_consumed: 0,
        }
    }

    /// Run the session to completion over `transport`, then close it.
    ///
    /// Errors are reported to the client as a single `{error}` message,
    /// except a disconnect, after which nothing is sent.
    pub async fn run<T: Transport + ?Sized>(mut self, transport: &mut T) -> SessionOutcome {
        let metrics = self.ctx.metrics.clone();
        let logger = self.ctx.logger.clone();

        metrics.session_opened();
        logger.log_session_started(self.id);

        let (verdict, error) = match self.drive(transport).await {
            Ok(verdict) => {
                self.state = SessionState::Completed;
                metrics.inc_sessions_completed();
                logger.log_session_completed(
                    self.id,
                    self.interval_results.len(),
                    self.rows_consumed,
                    verdict,
                );
                (verdict, None)
            }
            Err(SessionError::TransportClosed) => {
                self.state = SessionState::Errored;
                metrics.inc_session_errors(SessionError::TransportClosed.kind());
                logger.log_session_abandoned(self.id, self.interval_results.len());
                (None, Some(SessionError::TransportClosed))
            }
            Err(err) => {
                self.state = SessionState::Errored;
                metrics.inc_session_errors(err.kind());
                logger.log_session_failed(self.id, err.kind(), &err.to_string());
                if let Err(send_err) = transport.send(&ServerMessage::error(err.to_string())).await {
                    debug!(session_id = self.id, error = %send_err, "Could not deliver error message");
                }
                (None, Some(err))
            }
        };

        transport.close().await;
        metrics.session_closed();

        SessionOutcome {
            session_id: self.id,
            state: self.state,
            category: self.category,
            interval_results: self.interval_results,
            verdict,
            rows_consumed: self.rows_consumed,
            error,
        }
    }

    async fn drive<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<Label>, SessionError> {
        let category = self.await_selection(transport).await?;
        let table = self.load_dataset(&category).await?;
        self.state = SessionState::Streaming;
        self.stream(&table, transport).await
    }

    /// Accept exactly one selection frame naming a known category
    async fn await_selection<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<String, SessionError> {
        let text = match transport.recv().await {
            Inbound::Text(text) => text,
            Inbound::Binary(_) => {
                return Err(SessionError::MalformedRequest(
                    "expected a JSON text frame".to_string(),
                ))
            }
            Inbound::Closed => return Err(SessionError::TransportClosed),
        };

        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| SessionError::MalformedRequest(e.to_string()))?;
        if !value.is_object() {
            return Err(SessionError::MalformedRequest(
                "expected a JSON object".to_string(),
            ));
        }
        let request: SelectionRequest = serde_json::from_value(value)
            .map_err(|e| SessionError::MalformedRequest(e.to_string()))?;

        // A missing or non-string key is an unknown category, not a bad frame
        let key = request
            .attack_key()
            .ok_or(SessionError::InvalidSelection(None))?
            .to_string();
        if self.ctx.catalog.resolve(&key).is_none() {
            return Err(SessionError::InvalidSelection(Some(key)));
        }

        debug!(session_id = self.id, category = %key, "Category selected");
        self.category = Some(key.clone());
        Ok(key)
    }

    /// Read and preprocess the dataset off the async runtime
    async fn load_dataset(&self, category: &str) -> Result<FeatureTable, SessionError> {
        let path = self
            .ctx
            .catalog
            .resolve(category)
            .ok_or_else(|| SessionError::InvalidSelection(Some(category.to_string())))?
            .to_path_buf();
        let preprocessor = self.ctx.preprocessor.clone();
        let start = Instant::now();

        let table = tokio::task::spawn_blocking(move || -> Result<FeatureTable, SessionError> {
            let raw = load_csv(&path)?;
            Ok(preprocessor.preprocess(&raw)?)
        })
        .await
        .map_err(|e| SessionError::DatasetLoad(DatasetError::Task(e.to_string())))??;

        if let Some(expected) = self.ctx.classifier.input_width() {
            if expected != table.column_count() {
                return Err(PreprocessError::SchemaMismatch {
                    expected,
                    actual: table.column_count(),
                }
                .into());
            }
        }

        let needed = self.ctx.config.rows_per_session();
        if table.row_count() < needed {
            debug!(
                session_id = self.id,
                rows = table.row_count(),
                needed,
                "Dataset ends before the last interval"
            );
        }

        let elapsed = start.elapsed();
        self.ctx.metrics.observe_dataset_load(elapsed.as_secs_f64());
        self.ctx.logger.log_dataset_loaded(
            self.id,
            category,
            table.row_count(),
            table.column_count(),
            elapsed.as_millis(),
        );
        Ok(table)
    }

    async fn stream<T: Transport + ?Sized>(
        &mut self,
        table: &FeatureTable,
        transport: &mut T,
    ) -> Result<Option<Label>, SessionError> {
        let ctx = Arc::clone(&self.ctx);
        let mut cursor = BatchCursor::new(table, ctx.config.rows_per_batch);

        for interval in 0..ctx.config.total_intervals {
            let batch_labels = classify_interval(&ctx, &mut cursor)?;
            self.rows_consumed = cursor.position();

            if batch_labels.is_empty() {
                debug!(
                    session_id = self.id,
                    interval = interval,
                    rows_consumed = self.rows_consumed,
                    "Dataset exhausted"
                );
                break;
            }

            let prediction = majority_vote(&batch_labels)?;
            self.interval_results.push(prediction);
            self.emit(transport, ServerMessage::interim(prediction)).await?;

            ctx.metrics.inc_intervals_emitted();
            ctx.logger
                .log_interval(self.id, interval, batch_labels.len(), prediction);

            self.pace(transport).await?;
        }

        self.reject_pending_message(transport).await?;

        let verdict = if self.interval_results.is_empty() {
            None
        } else {
            Some(majority_vote(&self.interval_results)?)
        };
        self.emit(transport, ServerMessage::verdict(verdict)).await?;
        Ok(verdict)
    }

    async fn emit<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        message: ServerMessage,
    ) -> Result<(), SessionError> {
        transport.send(&message).await.map_err(|e| {
            debug!(session_id = self.id, error = %e, "Send failed");
            SessionError::TransportClosed
        })
    }

    /// Wait out the interval delay. This is the only point where the session
    /// yields, so it is also where a disconnect or stray message is noticed.
    async fn pace<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), SessionError> {
        tokio::select! {
            biased;
            _ = tokio::time::sleep(self.ctx.config.interval_delay) => Ok(()),
            inbound = transport.recv() => Err(stray_inbound(inbound)),
        }
    }

    /// Check, without waiting, for a frame that arrived after the last delay
    /// elapsed or while no delay ran at all.
    async fn reject_pending_message<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
    ) -> Result<(), SessionError> {
        tokio::select! {
            biased;
            inbound = transport.recv() => Err(stray_inbound(inbound)),
            _ = std::future::ready(()) => Ok(()),
        }
    }
}

/// Any inbound activity once streaming has started ends the session
fn stray_inbound(inbound: Inbound) -> SessionError {
    match inbound {
        Inbound::Closed => SessionError::TransportClosed,
        Inbound::Text(_) | Inbound::Binary(_) => SessionError::UnexpectedMessage,
    }
}

/// Classify up to `batches_per_interval` full batches, one majority label each
fn classify_interval(
    ctx: &SessionContext,
    cursor: &mut BatchCursor<'_>,
) -> Result<Vec<Label>, SessionError> {
    let mut labels = Vec::with_capacity(ctx.config.batches_per_interval);

    for _ in 0..ctx.config.batches_per_interval {
        let Some(batch) = cursor.next_batch() else {
            break;
        };

        let start = Instant::now();
        let row_labels = ctx
            .classifier
            .predict(batch)
            .map_err(|e| SessionError::Prediction(format!("{:#}", e)))?;
        ctx.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());

        if row_labels.len() != batch.rows() {
            return Err(SessionError::Prediction(format!(
                "classifier returned {} labels for {} rows",
                row_labels.len(),
                batch.rows()
            )));
        }

        ctx.metrics.inc_batches_classified();
        labels.push(majority_vote(&row_labels)?);
    }

    Ok(labels)
}
