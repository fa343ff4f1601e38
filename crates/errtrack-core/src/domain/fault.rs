//! Fault events captured from the host application
//!
//! A [`FaultEvent`] is the immutable snapshot of a raised fault: its kind,
//! message, origin and the stack frames recorded by the runtime. It is
//! constructed once per report and discarded after delivery.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::kind::FaultKind;

// ============================================================================
// Origin
// ============================================================================

/// Source location where a fault was raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Source file path as reported by the runtime
    pub file: String,
    /// 1-based line number
    pub line: u32,
}

impl Origin {
    /// Creates a new Origin
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

// ============================================================================
// Stack frame arguments
// ============================================================================

/// A live argument value captured on a stack frame
///
/// Objects, collections and resource handles are captured as-is and must be
/// reduced to placeholders before leaving the process.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An object instance, identified by its declared type name
    Object { type_name: String },
    /// A list or map of further values
    Collection(Vec<ArgValue>),
    /// An open handle (file, socket, stream) identified by category
    Resource { kind: String },
}

impl ArgValue {
    /// Convenience constructor for object arguments
    pub fn object(type_name: impl Into<String>) -> Self {
        ArgValue::Object {
            type_name: type_name.into(),
        }
    }

    /// Convenience constructor for resource arguments
    pub fn resource(kind: impl Into<String>) -> Self {
        ArgValue::Resource { kind: kind.into() }
    }

    /// Returns true for values that pass through sanitization unchanged
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ArgValue::Null
                | ArgValue::Bool(_)
                | ArgValue::Int(_)
                | ArgValue::Float(_)
                | ArgValue::Str(_)
        )
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

/// Arguments recorded on a stack frame, either positional or keyed
#[derive(Debug, Clone, PartialEq)]
pub enum FrameArgs {
    Positional(Vec<ArgValue>),
    Named(BTreeMap<String, ArgValue>),
}

impl FrameArgs {
    /// Number of recorded arguments
    pub fn len(&self) -> usize {
        match self {
            FrameArgs::Positional(args) => args.len(),
            FrameArgs::Named(args) => args.len(),
        }
    }

    /// Returns true if no arguments were recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// StackFrame
// ============================================================================

/// How a frame's function was invoked relative to its type context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// Method called on an instance
    Instance,
    /// Associated function called on the type itself
    Static,
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallType::Instance => "instance",
            CallType::Static => "static",
        };
        write!(f, "{}", s)
    }
}

/// A single frame of a captured stack trace
///
/// Native or runtime-internal frames carry no `file`/`line`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackFrame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    /// Type (class, impl block, module) the function belongs to
    pub type_context: Option<String>,
    pub call_type: Option<CallType>,
    pub args: Option<FrameArgs>,
}

impl StackFrame {
    /// Creates a frame for the given function with no location
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Self::default()
        }
    }

    /// Sets the source location
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Sets the type context and call type
    pub fn in_type(mut self, type_context: impl Into<String>, call_type: CallType) -> Self {
        self.type_context = Some(type_context.into());
        self.call_type = Some(call_type);
        self
    }

    /// Sets the recorded arguments
    pub fn with_args(mut self, args: FrameArgs) -> Self {
        self.args = Some(args);
        self
    }

    /// Returns true if the frame has no source location
    pub fn is_internal(&self) -> bool {
        self.file.is_none()
    }
}

// ============================================================================
// FaultEvent
// ============================================================================

/// An immutable snapshot of a raised fault
#[derive(Debug, Clone, PartialEq)]
pub struct FaultEvent {
    kind: FaultKind,
    type_name: String,
    message: String,
    origin: Option<Origin>,
    stack_trace: Vec<StackFrame>,
}

impl FaultEvent {
    /// Creates a new fault of the given kind
    ///
    /// The reported type name defaults to the kind identifier.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            type_name: kind.to_string(),
            kind,
            message: message.into(),
            origin: None,
            stack_trace: Vec::new(),
        }
    }

    /// Creates a fault from an error value, joining its source chain into
    /// the message (`outer: caused by inner`)
    pub fn from_error(kind: FaultKind, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": caused by ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(kind, message)
    }

    /// Sets the concrete type name reported as `exception_type`
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Sets where the fault was raised
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Sets the captured stack trace
    pub fn with_stack_trace(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack_trace = frames;
        self
    }

    /// Parses and attaches frames from a captured [`Backtrace`]
    pub fn with_backtrace(self, backtrace: &Backtrace) -> Self {
        let frames = parse_backtrace(&backtrace.to_string());
        self.with_stack_trace(frames)
    }

    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn stack_trace(&self) -> &[StackFrame] {
        &self.stack_trace
    }
}

/// Parse the textual form of a `std::backtrace::Backtrace` into frames.
///
/// Recognizes `N: path::to::function` lines followed by an optional
/// `at file:line:col` line. Frame order is preserved as printed.
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line_no) = split_location(location);
                    frame.file = Some(file);
                    frame.line = line_no;
                }
            }
            continue;
        }

        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let symbol = strip_symbol_hash(symbol.trim());
        let mut frame = StackFrame::default();
        match symbol.rsplit_once("::") {
            Some((type_context, function)) => {
                frame.type_context = Some(type_context.to_string());
                frame.function = Some(function.to_string());
            }
            None => frame.function = Some(symbol.to_string()),
        }
        frames.push(frame);
    }

    frames
}

/// Split `file:line:col` into the file and line. Windows drive letters
/// survive because only the trailing numeric components are removed.
fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle, last) {
        (Some(file), Some(line), Some(col))
            if line.parse::<u32>().is_ok() && col.parse::<u32>().is_ok() =>
        {
            (file.to_string(), line.parse().ok())
        }
        _ => match location.rsplit_once(':') {
            Some((file, line)) if line.parse::<u32>().is_ok() => {
                (file.to_string(), line.parse().ok())
            }
            _ => (location.to_string(), None),
        },
    }
}

/// Remove the trailing `::h0123456789abcdef` disambiguator from a symbol
fn strip_symbol_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            head
        }
        _ => symbol,
    }
}
