//! Report payload construction
//!
//! Turns a [`FaultEvent`] and the request it interrupted into the sanitized
//! [`ReportRecord`] that is posted to the collection endpoint.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use errtrack_core::config::TrackerConfig;
use errtrack_core::domain::{
    AuthenticatedUser, FaultEvent, FrameRecord, ReportRecord, RequestContext, RequestData,
    StackFrame, UserData,
};
use errtrack_core::ports::HostEnvironment;
use serde_json::{Map, Value};
use tracing::debug;

use crate::sanitizer::{sanitize_stack_args, Sanitizer};

/// File name reported for frames without a source location.
pub const INTERNAL_FRAME_FILE: &str = "[internal function]";

/// Builds sanitized report records.
///
/// Building never fails: missing optional inputs degrade to `null` or empty
/// values in the record.
pub struct PayloadBuilder {
    config: Arc<TrackerConfig>,
    host: Arc<dyn HostEnvironment>,
    sanitizer: Sanitizer,
}

impl PayloadBuilder {
    pub fn new(config: Arc<TrackerConfig>, host: Arc<dyn HostEnvironment>) -> Self {
        let sanitizer = Sanitizer::new(&config.privacy);
        Self {
            config,
            host,
            sanitizer,
        }
    }

    /// Build a record stamped with the current time.
    pub fn build(&self, fault: &FaultEvent, context: &RequestContext) -> ReportRecord {
        self.build_at(fault, context, Utc::now())
    }

    /// Build a record stamped with `occurred_at`.
    pub fn build_at(
        &self,
        fault: &FaultEvent,
        context: &RequestContext,
        occurred_at: DateTime<Utc>,
    ) -> ReportRecord {
        let stack_trace: Vec<FrameRecord> = fault.stack_trace().iter().map(frame_record).collect();

        debug!(
            kind = %fault.kind(),
            frames = stack_trace.len(),
            has_user = context.authenticated_user.is_some(),
            "Building fault report"
        );

        ReportRecord {
            application_id: self.config.app_id.clone(),
            exception_type: fault.type_name().to_string(),
            message: fault.message().to_string(),
            file: fault.origin().map(|o| o.file.clone()),
            line: fault.origin().map(|o| o.line),
            stack_trace,
            request_data: self.request_data(context),
            user_data: context.authenticated_user.as_ref().map(user_data),
            system_data: self.host.system_data(),
            environment: self.host.environment_name(),
            occurred_at: occurred_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }

    fn request_data(&self, context: &RequestContext) -> RequestData {
        RequestData {
            url: context.url.clone(),
            method: context.method.clone(),
            ip: context.client_ip.clone(),
            user_agent: context.user_agent.clone(),
            headers: self.sanitizer.headers(&context.headers),
            query: self.sanitizer.fields(&context.query_params),
            body: self
                .sanitizer
                .fields(&without_fields(&context.body_fields, self.sanitizer.sensitive_fields())),
        }
    }
}

/// Drop top-level entries whose key exactly equals one of `names`
/// (case-insensitive).
fn without_fields(fields: &Map<String, Value>, names: &[String]) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(key, _)| {
            let key = key.to_lowercase();
            !names.iter().any(|name| *name == key)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn user_data(user: &AuthenticatedUser) -> UserData {
    UserData {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
    }
}

fn frame_record(frame: &StackFrame) -> FrameRecord {
    FrameRecord {
        file: frame
            .file
            .clone()
            .unwrap_or_else(|| INTERNAL_FRAME_FILE.to_string()),
        line: frame.line,
        function: frame.function.clone(),
        class: frame.type_context.clone(),
        call_type: frame.call_type.map(|c| c.to_string()),
        args: frame.args.as_ref().map(sanitize_stack_args),
    }
}
