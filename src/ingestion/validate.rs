//! Field-level validation applied before an entry is buffered.

use crate::model::log_entry::{MAX_MESSAGE_LEN, MAX_SHORT_FIELD_LEN};
use crate::model::LogLevel;

use super::pipeline::CreateLogRequest;

#[derive(Debug, Clone)]
pub struct ValidationIssue(pub String);

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate(req: &CreateLogRequest) -> Result<(), ValidationIssue> {
    if LogLevel::from_u8(req.level).is_none() {
        return Err(ValidationIssue(format!("level {} out of range [0,5]", req.level)));
    }
    if req.message.trim().is_empty() {
        return Err(ValidationIssue("message is required".into()));
    }
    if req.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(ValidationIssue(format!(
                    "message exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }
    if req.server_name.trim().is_empty() {
        return Err(ValidationIssue("serverName is required".into()));
    }
    check_width("serverName", &req.server_name)?;
    if let Some(v) = &req.category {
        check_width("category", v)?;
    }
    if let Some(v) = &req.source_context {
        check_width("sourceContext", v)?;
    }
    if let Some(v) = &req.correlation_id {
        check_width("correlationId", v)?;
    }
    if let Some(v) = &req.trace_id {
        check_width("traceId", v)?;
    }
    if let Some(v) = &req.span_id {
        check_width("spanId", v)?;
    }
    if let Some(v) = &req.parent_span_id {
        check_width("parentSpanId", v)?;
    }
    if let Some(v) = &req.environment {
        check_width("environment", v)?;
    }
    if let Some(v) = &req.application_version {
        check_width("applicationVersion", v)?;
    }
    if let Some(props) = &req.properties {
        if !props.is_object() {
            return Err(ValidationIssue("properties must be a JSON object".into()));
        }
    }
    Ok(())
}

fn check_width(field: &str, value: &str) -> Result<(), ValidationIssue> {
    if value.chars().count() > MAX_SHORT_FIELD_LEN {
        return Err(ValidationIssue(format!(
                    "{field} exceeds {MAX_SHORT_FIELD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CreateLogRequest {
        CreateLogRequest {
            timestamp: None,
            level: 2,
            message: "hello".into(),
            job_id: None,
            job_execution_id: None,
            server_name: "S1".into(),
            category: None,
            source_context: None,
            correlation_id: None,
            trace_id: None,
            span_id: None,
            parent_span_id: None,
            exception: None,
            properties: None,
            tags: Vec::new(),
            environment: None,
            application_version: None,
        }
    }

    #[test]
    fn rejects_out_of_range_level() {
        let mut req = base();
        req.level = 9;
        assert!(validate(&req).is_err());
    }

    #[test]
    fn rejects_missing_message() {
        let mut req = base();
        req.message = " ".into();
        assert!(validate(&req).is_err());
    }

    #[test]
    fn rejects_non_object_properties() {
        let mut req = base();
        req.properties = Some(serde_json::json!([1, 2, 3]));
        assert!(validate(&req).is_err());
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(validate(&base()).is_ok());
    }
}
