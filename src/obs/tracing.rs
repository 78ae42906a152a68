// crates.io
use tracing::{Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::CallKind};

/// A span builder used around every gateway call.
#[derive(Clone, Debug)]
pub struct CallSpan {
	span: Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + operation.
	pub fn new(kind: CallKind, operation: &str) -> Self {
		Self { span: tracing::info_span!("projectx.call", kind = kind.as_str(), operation) }
	}

	/// Underlying span, for recording extra fields.
	pub fn span(&self) -> &Span {
		&self.span
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}
