pub mod init;
pub mod langfuse;
pub mod sink;

pub use init::{init_tracing, OtelGuard};
pub use langfuse::LangfuseSink;
pub use sink::{select_trace_sink, LogSink, SpanEnd, SpanHandle, SpanLevel, TraceSink};
