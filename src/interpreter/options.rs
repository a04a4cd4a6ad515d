use super::EventSender;

/// Construction options for an [`Interpreter`](super::Interpreter).
///
/// # Example
///
/// ```rust
/// use statecraft::interpreter::Options;
///
/// let options = Options::new().name("checkout").record_trace(false);
///
/// assert_eq!(options.get_name(), "checkout");
/// assert!(!options.records_trace());
/// ```
#[derive(Clone, Debug)]
pub struct Options {
    pub(crate) name: String,
    pub(crate) parent: Option<EventSender>,
    pub(crate) invoke_id: Option<String>,
    pub(crate) record_trace: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in log fields and as the origin of events sent upwards.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sender of the interpreter that invoked this one.
    pub fn parent(mut self, parent: EventSender) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Id under which the parent knows this interpreter.
    pub fn invoke_id(mut self, invoke_id: impl Into<String>) -> Self {
        self.invoke_id = Some(invoke_id.into());
        self
    }

    pub fn record_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_invoke_id(&self) -> Option<&str> {
        self.invoke_id.as_deref()
    }

    pub fn records_trace(&self) -> bool {
        self.record_trace
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            name: "statechart".to_string(),
            parent: None,
            invoke_id: None,
            record_trace: true,
        }
    }
}
