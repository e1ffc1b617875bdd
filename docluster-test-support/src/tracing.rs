//! A `tracing` layer that keeps every closed span and emitted event so tests
//! can assert on instrumentation.
//!
//! ```
//! use docluster_test_support::tracing::RecordingLayer;
//! use tracing::Level;
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let layer = RecordingLayer::default();
//! let subscriber = tracing_subscriber::registry().with(layer.clone());
//! tracing::subscriber::with_default(subscriber, || {
//!     let _span = tracing::info_span!("job", rows = 3).entered();
//!     tracing::warn!(code = "X", "slow batch");
//! });
//!
//! let warning = layer.find_event(Level::WARN, "slow batch").expect("recorded");
//! assert_eq!(warning.fields.get("code").map(String::as_str), Some("X"));
//! assert_eq!(layer.find_span("job").expect("closed").fields["rows"], "3");
//! ```

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    span,
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Field name to rendered value.
pub type Fields = BTreeMap<String, String>;

/// A span that has closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanRecord {
    pub name: String,
    /// Fields from creation plus any later `record` calls.
    pub fields: Fields,
}

/// An emitted event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub level: Level,
    pub target: String,
    /// Includes the formatted `message`.
    pub fields: Fields,
}

#[derive(Default)]
struct Journal {
    spans: Vec<SpanRecord>,
    events: Vec<EventRecord>,
}

/// Cloneable recording layer; clones share one journal.
#[derive(Clone, Default)]
pub struct RecordingLayer {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingLayer {
    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closed spans in the order they closed.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.journal().spans.clone()
    }

    /// Events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.journal().events.clone()
    }

    /// Messages of the events recorded at `level`.
    #[must_use]
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.journal()
            .events
            .iter()
            .filter(|event| event.level == level)
            .filter_map(|event| event.fields.get("message").cloned())
            .collect()
    }

    /// First event at `level` whose message is exactly `message`.
    #[must_use]
    pub fn find_event(&self, level: Level, message: &str) -> Option<EventRecord> {
        self.journal()
            .events
            .iter()
            .find(|event| {
                event.level == level
                    && event.fields.get("message").map(String::as_str) == Some(message)
            })
            .cloned()
    }

    /// First closed span called `name`.
    #[must_use]
    pub fn find_span(&self, name: &str) -> Option<SpanRecord> {
        self.journal()
            .spans
            .iter()
            .find(|span| span.name == name)
            .cloned()
    }
}

/// Open-span state stored in the registry extensions.
struct Pending(SpanRecord);

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Fields::new();
        attrs.record(&mut Collect(&mut fields));
        span.extensions_mut().insert(Pending(SpanRecord {
            name: attrs.metadata().name().to_owned(),
            fields,
        }));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id)
            && let Some(Pending(record)) = span.extensions_mut().get_mut::<Pending>()
        {
            values.record(&mut Collect(&mut record.fields));
        }
    }

    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        let closed = ctx
            .span(&id)
            .and_then(|span| span.extensions_mut().remove::<Pending>());
        if let Some(Pending(record)) = closed {
            self.journal().spans.push(record);
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::new();
        event.record(&mut Collect(&mut fields));
        let metadata = event.metadata();
        self.journal().events.push(EventRecord {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            fields,
        });
    }
}

/// Strings are kept verbatim; other values go through `Debug`, which matches
/// `Display` for numbers, booleans and `%`-captured values.
struct Collect<'a>(&'a mut Fields);

impl Visit for Collect<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0.insert(field.name().to_owned(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}
