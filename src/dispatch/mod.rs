//! Command dispatch
//!
//! The [`Dispatcher`] decodes one raw line into commands and runs each on
//! the [`PlotSession`] in decode order. Handler lookup is a closed match on
//! [`Handler`]; names outside that set go to the diagnostic fallback, which
//! logs and touches nothing.
//!
//! Nothing escapes `dispatch`. Handler errors and panics are logged with
//! the offending command, recorded as diagnostics, and the remaining
//! commands of the message still run.

pub mod decoder;

pub use decoder::{Command, JsonMessageDecoder, MessageDecoder, FALLBACK_HANDLER};

use crate::error::{Result, StreamPlotError};
use crate::session::{PlotSession, Renderer, Severity};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};

/// The closed set of handlers a message can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    PlotPoint,
    ClearPlot,
    ClearData,
    SetAxisLabels,
    SetPlotTitle,
    ShowData,
    RegisterCurves,
    NoFunction,
}

impl Handler {
    pub const ALL: [Handler; 8] = [
        Handler::PlotPoint,
        Handler::ClearPlot,
        Handler::ClearData,
        Handler::SetAxisLabels,
        Handler::SetPlotTitle,
        Handler::ShowData,
        Handler::RegisterCurves,
        Handler::NoFunction,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|handler| handler.name() == name)
    }

    /// Wire name of the handler
    pub fn name(&self) -> &'static str {
        match self {
            Handler::PlotPoint => "generate_plot_pointbypoint",
            Handler::ClearPlot => "clear_plot",
            Handler::ClearData => "clear_data",
            Handler::SetAxisLabels => "set_axis_labels",
            Handler::SetPlotTitle => "set_plot_title",
            Handler::ShowData => "showdata",
            Handler::RegisterCurves => "register_available_curves",
            Handler::NoFunction => FALLBACK_HANDLER,
        }
    }
}

/// A command that ran and failed
#[derive(Debug, Clone, PartialEq)]
pub struct CommandFailure {
    pub handler: String,
    pub argument: Value,
    pub error: String,
}

/// What one `dispatch` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Commands that ran to completion
    pub executed: usize,
    pub failures: Vec<CommandFailure>,
    /// Names that reached the diagnostic fallback
    pub unrecognized: Vec<String>,
}

impl DispatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unrecognized.is_empty()
    }
}

/// Routes decoded commands to session handlers
#[derive(Debug, Default)]
pub struct Dispatcher<D: MessageDecoder = JsonMessageDecoder> {
    decoder: D,
}

impl Dispatcher<JsonMessageDecoder> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: MessageDecoder> Dispatcher<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self { decoder }
    }

    /// Decode `raw` and run its commands in order
    pub fn dispatch<R: Renderer>(
        &self,
        raw: &str,
        session: &mut PlotSession<R>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for command in self.decoder.decode(raw) {
            let Some(handler) = Handler::from_name(&command.handler_name) else {
                fallback(session, &command.handler_name, raw);
                outcome.unrecognized.push(command.handler_name);
                continue;
            };

            if handler == Handler::NoFunction {
                let verbatim = match &command.argument {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                fallback(session, FALLBACK_HANDLER, &verbatim);
                outcome.unrecognized.push(command.handler_name);
                continue;
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_handler(handler, &command.argument, session)
            }));

            let error = match result {
                Ok(Ok(())) => {
                    outcome.executed += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("handler panicked: {}", panic_message(payload.as_ref())),
            };

            tracing::warn!(
                handler = handler.name(),
                argument = %command.argument,
                "Command failed: {}",
                error
            );
            session.report(
                Severity::Warning,
                format!("{} failed: {}", handler.name(), error),
            );
            outcome.failures.push(CommandFailure {
                handler: command.handler_name,
                argument: command.argument,
                error,
            });
        }

        outcome
    }
}

fn run_handler<R: Renderer>(
    handler: Handler,
    argument: &Value,
    session: &mut PlotSession<R>,
) -> Result<()> {
    match handler {
        Handler::PlotPoint => session.ingest_point(argument),
        Handler::ClearPlot => {
            session.clear_plot();
            Ok(())
        }
        Handler::ClearData => session.clear_data(argument),
        Handler::SetAxisLabels => session.set_axis_labels(argument),
        Handler::SetPlotTitle => {
            session.set_plot_title(argument);
            Ok(())
        }
        Handler::ShowData => {
            session.show_data(argument);
            Ok(())
        }
        Handler::RegisterCurves => {
            session.register_curves();
            Ok(())
        }
        // Routed to the fallback before reaching here
        Handler::NoFunction => Ok(()),
    }
}

fn fallback<R: Renderer>(session: &mut PlotSession<R>, name: &str, message: &str) {
    let error = StreamPlotError::UnrecognizedCommand {
        name: name.to_string(),
        message: message.to_string(),
    };
    tracing::warn!(handler = name, "{}. Not calling any handler", error);
    session.report(Severity::Warning, error.to_string());
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
