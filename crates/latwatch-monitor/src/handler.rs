//! Handler registration and dispatch.
//!
//! A handler's calling convention is fixed when it is registered. The
//! dispatcher invokes every handler, in registration order, for every
//! alert that is not suppressed and for every restore.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use latwatch_core::{EpisodeContext, HighLatencyQueues};

use crate::error::{WatchdogError, WatchdogResult};

/// An event delivered to handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatchdogEvent<'a> {
    HighLatency {
        queues: &'a HighLatencyQueues,
        context: EpisodeContext,
    },
    Restored {
        context: EpisodeContext,
    },
}

impl WatchdogEvent<'_> {
    /// Stable event name, used as the log event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HighLatency { .. } => "high_latency_queues",
            Self::Restored { .. } => "high_latency_queues_restored",
        }
    }

    /// Depth and duration of the episode the event belongs to.
    pub fn context(&self) -> EpisodeContext {
        match self {
            Self::HighLatency { context, .. } | Self::Restored { context } => *context,
        }
    }

    /// The high-latency queues, absent for restores.
    pub fn queues(&self) -> Option<&HighLatencyQueues> {
        match self {
            Self::HighLatency { queues, .. } => Some(queues),
            Self::Restored { .. } => None,
        }
    }
}

/// One positional argument handed to a variadic handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandlerArg<'a> {
    Queues(&'a HighLatencyQueues),
    Context(EpisodeContext),
}

pub type QueuesFn = Arc<dyn Fn(&HighLatencyQueues) -> anyhow::Result<()> + Send + Sync>;
pub type ContextFn =
    Arc<dyn Fn(Option<&HighLatencyQueues>, &EpisodeContext) -> anyhow::Result<()> + Send + Sync>;
pub type VariadicFn = Arc<dyn Fn(&[HandlerArg<'_>]) -> anyhow::Result<()> + Send + Sync>;
pub type EventFn = Arc<dyn Fn(&WatchdogEvent<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A registered handler and its calling convention.
#[derive(Clone)]
pub enum Handler {
    /// Receives only the queue mapping. Restores pass an empty mapping,
    /// since no queue is high any more.
    Queues(QueuesFn),
    /// Receives the mapping and the episode context. Restores pass `None`
    /// in place of the mapping.
    WithContext(ContextFn),
    /// Receives every available argument as a slice: `[Queues, Context]`
    /// for alerts, `[Context]` for restores.
    Variadic(VariadicFn),
    /// Receives the typed event. Used by the built-in handlers.
    Event(EventFn),
}

impl Handler {
    /// Register a handler that takes only the queue mapping.
    pub fn queues<F>(f: F) -> Self
    where
        F: Fn(&HighLatencyQueues) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Queues(Arc::new(f))
    }

    /// Register a handler that takes the mapping and the episode context.
    pub fn with_context<F>(f: F) -> Self
    where
        F: Fn(Option<&HighLatencyQueues>, &EpisodeContext) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self::WithContext(Arc::new(f))
    }

    /// Register a handler that takes a slice of positional arguments.
    pub fn variadic<F>(f: F) -> Self
    where
        F: Fn(&[HandlerArg<'_>]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Variadic(Arc::new(f))
    }

    /// Register a handler that takes the typed event.
    pub fn event<F>(f: F) -> Self
    where
        F: Fn(&WatchdogEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Event(Arc::new(f))
    }

    /// Call the handler with arguments shaped for its convention.
    pub fn invoke(&self, event: &WatchdogEvent<'_>) -> anyhow::Result<()> {
        match (self, event) {
            (Self::Queues(f), WatchdogEvent::HighLatency { queues, .. }) => f(queues),
            (Self::Queues(f), WatchdogEvent::Restored { .. }) => f(&HighLatencyQueues::new()),
            (Self::WithContext(f), event) => f(event.queues(), &event.context()),
            (Self::Variadic(f), WatchdogEvent::HighLatency { queues, context }) => {
                f(&[HandlerArg::Queues(queues), HandlerArg::Context(*context)])
            }
            (Self::Variadic(f), WatchdogEvent::Restored { context }) => {
                f(&[HandlerArg::Context(*context)])
            }
            (Self::Event(f), event) => f(event),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Queues(_) => "Queues",
            Self::WithContext(_) => "WithContext",
            Self::Variadic(_) => "Variadic",
            Self::Event(_) => "Event",
        };
        f.debug_tuple("Handler").field(&kind).finish()
    }
}

/// Ordered handler list.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    handlers: Vec<Handler>,
}

impl Dispatcher {
    /// Create a dispatcher over handlers in invocation order.
    pub fn new(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }

    /// Append a handler; it runs after those already registered.
    pub fn push(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke every handler in order.
    ///
    /// A failing handler does not stop the others. The first failure is
    /// returned once all handlers have run.
    pub fn dispatch(&self, event: &WatchdogEvent<'_>) -> WatchdogResult<()> {
        let mut first_error = None;

        for (index, handler) in self.handlers.iter().enumerate() {
            if let Err(e) = handler.invoke(event) {
                warn!(
                    handler = index,
                    event = event.name(),
                    error = %format!("{e:#}"),
                    "watchdog handler failed"
                );
                if first_error.is_none() {
                    first_error = Some(WatchdogError::Handler { index, source: e });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
