//! API handler for modelforge
//!
//! Parses a request, dispatches it to the schema registry or record engine
//! and renders the outcome. Holds no lock of its own; the store serializes
//! commits, so one handler may serve many threads.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::errors::{ApiError, ApiResult};
use super::request::{Envelope, Request};
use super::response::Response;
use crate::error::{EngineError, EngineResult};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::record::RecordEngine;
use crate::schema::SchemaRegistry;
use crate::store::{Backend, Owner};

pub struct ApiHandler<B> {
    registry: SchemaRegistry<B>,
    engine: RecordEngine<B>,
    metrics: Arc<MetricsRegistry>,
}

impl<B: Backend> ApiHandler<B> {
    pub fn new(backend: Arc<B>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            registry: SchemaRegistry::new(Arc::clone(&backend)),
            engine: RecordEngine::new(backend),
            metrics,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry<B> {
        &self.registry
    }

    pub fn engine(&self) -> &RecordEngine<B> {
        &self.engine
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Handle a raw JSON request string
    pub fn handle(&self, json_request: &str) -> Response {
        let envelope = match Envelope::parse(json_request) {
            Ok(envelope) => envelope,
            Err(e) => {
                Logger::warn(
                    Event::RequestRejected.as_str(),
                    &[("code", e.code()), ("op", "-")],
                );
                return Response::error(&e);
            }
        };

        match self.dispatch(envelope) {
            Ok(Value::Null) => Response::ok(),
            Ok(data) => Response::success(data),
            Err(e) => Response::error(&e),
        }
    }

    /// Runs one parsed request
    pub fn dispatch(&self, envelope: Envelope) -> ApiResult<Value> {
        let op = envelope.request.op();
        let Envelope { caller, request } = envelope;

        let outcome = self.execute(request, caller);
        outcome.map_err(|err| {
            self.metrics.record_failure(&err);
            let api_err = ApiError::from_engine(&err);
            let event = match err {
                EngineError::StorageFailure(_) => Event::StorageFailed,
                _ => Event::RequestRejected,
            };
            let fields = [("code", api_err.code()), ("op", op)];
            if api_err.is_fatal() {
                Logger::fatal(event.as_str(), &fields);
            } else if event == Event::StorageFailed {
                Logger::error(event.as_str(), &fields);
            } else {
                Logger::warn(event.as_str(), &fields);
            }
            api_err
        })?
    }

    fn execute(&self, request: Request, caller: Option<Owner>) -> EngineResult<ApiResult<Value>> {
        let data = match request {
            Request::DefineModel { name, fields } => {
                let model = self.registry.define_model(&name, &fields, caller)?;
                self.metrics.increment_models_defined();
                self.metrics.increment_commits();
                to_data(&model)
            }
            Request::FindModel { name } => to_data(&self.registry.find_model_by_name(&name)?),
            Request::GetModel { id } => to_data(&self.registry.get_model(id)?),
            Request::DeleteModel { id } => {
                self.registry.delete_model(id)?;
                self.metrics.increment_models_deleted();
                self.metrics.increment_commits();
                Ok(Value::Null)
            }
            Request::DeleteField { id } => {
                self.registry.delete_field(id)?;
                self.metrics.increment_fields_deleted();
                self.metrics.increment_commits();
                Ok(Value::Null)
            }
            Request::CreateRecord { model_id, values } => {
                let record = self.engine.create_record(model_id, &values, caller)?;
                self.metrics.increment_records_created();
                self.metrics.increment_commits();
                to_data(&record)
            }
            Request::GetRecord { id } => to_data(&self.engine.get_record(id)?),
            Request::DeleteRecord { id } => {
                self.engine.delete_record(id)?;
                self.metrics.increment_records_deleted();
                self.metrics.increment_commits();
                Ok(Value::Null)
            }
            Request::DeleteValue { id } => {
                self.engine.delete_value(id)?;
                self.metrics.increment_values_deleted();
                self.metrics.increment_commits();
                Ok(Value::Null)
            }
            Request::Metrics => to_data(&self.metrics.snapshot()),
        };
        Ok(data)
    }
}

fn to_data<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::internal(format!("Failed to render response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    fn handler() -> ApiHandler<MemoryBackend> {
        ApiHandler::new(Arc::new(MemoryBackend::new()), Arc::new(MetricsRegistry::new()))
    }

    fn call(handler: &ApiHandler<MemoryBackend>, json: &str) -> Value {
        serde_json::from_str(&handler.handle(json).to_json()).unwrap()
    }

    fn define_invoice(handler: &ApiHandler<MemoryBackend>) -> Value {
        call(
            handler,
            r#"{"op": "define_model", "caller": "u-1", "name": "Invoice",
                "fields": [{"name": "amount", "type": "float"}, {"name": "note", "type": "string"}]}"#,
        )
    }

    #[test]
    fn test_define_and_find() {
        let h = handler();
        let defined = define_invoice(&h);
        assert_eq!(defined["status"], "ok");
        assert_eq!(defined["data"]["owner"], "u-1");

        let found = call(&h, r#"{"op": "find_model", "name": "Invoice"}"#);
        assert_eq!(found["data"]["id"], defined["data"]["id"]);
        assert_eq!(found["data"]["fields"][1]["name"], "note");
    }

    #[test]
    fn test_duplicate_definition_conflicts() {
        let h = handler();
        define_invoice(&h);
        let second = define_invoice(&h);
        assert_eq!(second["status"], "error");
        assert_eq!(second["code"], "FORGE_CONFLICT");
        assert_eq!(h.metrics().snapshot().rejected_conflict, 1);
        assert_eq!(h.metrics().snapshot().models_defined, 1);
    }

    #[test]
    fn test_record_round_trip() {
        let h = handler();
        let model_id = define_invoice(&h)["data"]["id"].as_str().unwrap().to_string();

        let created = call(
            &h,
            &format!(
                r#"{{"op": "create_record", "model_id": "{}", "values": {{"amount": "12.50", "note": "paid"}}}}"#,
                model_id
            ),
        );
        assert_eq!(created["status"], "ok");
        let record_id = created["data"]["id"].as_str().unwrap().to_string();

        let fetched = call(&h, &format!(r#"{{"op": "get_record", "id": "{}"}}"#, record_id));
        assert_eq!(fetched["data"]["model_id"], model_id.as_str());
        assert_eq!(fetched["data"]["values"][0]["value"], "12.50");
        assert_eq!(fetched["data"]["values"][1]["value"], "paid");
    }

    #[test]
    fn test_type_mismatch_reported() {
        let h = handler();
        let model_id = define_invoice(&h)["data"]["id"].as_str().unwrap().to_string();
        let rejected = call(
            &h,
            &format!(
                r#"{{"op": "create_record", "model_id": "{}", "values": {{"amount": "twelve"}}}}"#,
                model_id
            ),
        );
        assert_eq!(rejected["code"], "FORGE_TYPE_MISMATCH");
        assert!(rejected["message"].as_str().unwrap().contains("amount"));
    }

    #[test]
    fn test_delete_returns_null_data() {
        let h = handler();
        let model_id = define_invoice(&h)["data"]["id"].as_str().unwrap().to_string();
        let deleted = call(&h, &format!(r#"{{"op": "delete_model", "id": "{}"}}"#, model_id));
        assert_eq!(deleted["status"], "ok");
        assert_eq!(deleted["data"], Value::Null);

        let missing = call(&h, &format!(r#"{{"op": "get_model", "id": "{}"}}"#, model_id));
        assert_eq!(missing["code"], "FORGE_NOT_FOUND");
    }

    #[test]
    fn test_metrics_op() {
        let h = handler();
        define_invoice(&h);
        let metrics = call(&h, r#"{"op": "metrics"}"#);
        assert_eq!(metrics["data"]["models_defined"], 1);
        assert_eq!(metrics["data"]["commits"], 1);
    }

    #[test]
    fn test_malformed_json() {
        let h = handler();
        let resp = call(&h, "{not json");
        assert_eq!(resp["code"], "FORGE_INVALID_REQUEST");
    }
}
