// Callback descriptors and dispatch
//
// A callback descriptor bundles a method with an optional context value
// and extra arguments, as a concrete struct rather than a duck-typed
// shape. Invocation always appends the list's result identifiers as the
// final argument.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use loadweave_types::UnitId;

/// What a callback method receives when it runs.
pub struct CallbackInvocation<'a> {
    /// Extra arguments supplied at registration time, in order.
    pub arguments: &'a [serde_json::Value],
    /// The list's result identifiers, appended as the final argument.
    pub result_ids: &'a [UnitId],
    /// Optional context value supplied at registration time.
    pub context: Option<&'a (dyn Any + Send + Sync)>,
}

type CallbackFn = dyn Fn(CallbackInvocation<'_>) + Send + Sync;

/// A registered success or failure callback: method + context + arguments.
#[derive(Clone)]
pub struct CallbackDescriptor {
    method: Arc<CallbackFn>,
    context: Option<Arc<dyn Any + Send + Sync>>,
    arguments: Vec<serde_json::Value>,
}

impl CallbackDescriptor {
    pub fn new(method: impl Fn(CallbackInvocation<'_>) + Send + Sync + 'static) -> Self {
        Self {
            method: Arc::new(method),
            context: None,
            arguments: Vec::new(),
        }
    }

    /// Attach a context value handed to the method on every invocation.
    pub fn with_context(mut self, context: Arc<dyn Any + Send + Sync>) -> Self {
        self.context = Some(context);
        self
    }

    /// Append one extra argument.
    pub fn with_argument(mut self, argument: serde_json::Value) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Replace the extra arguments wholesale.
    pub fn with_arguments(mut self, arguments: Vec<serde_json::Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub(crate) fn invoke(&self, result_ids: &[UnitId]) {
        let invocation = CallbackInvocation {
            arguments: &self.arguments,
            result_ids,
            context: self.context.as_deref(),
        };
        (self.method)(invocation);
    }
}

impl fmt::Debug for CallbackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDescriptor")
            .field("context", &self.context.is_some())
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// The success and failure callbacks registered against one list.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallbackSet {
    success: Vec<CallbackDescriptor>,
    failure: Vec<CallbackDescriptor>,
}

impl CallbackSet {
    pub fn push_success(&mut self, descriptor: CallbackDescriptor) {
        self.success.push(descriptor);
    }

    pub fn push_failure(&mut self, descriptor: CallbackDescriptor) {
        self.failure.push(descriptor);
    }

    /// Run every success callback, registration order, ids appended.
    pub fn dispatch_success(&self, result_ids: &[UnitId]) {
        trace!(callbacks = self.success.len(), "dispatching success callbacks");
        for descriptor in &self.success {
            descriptor.invoke(result_ids);
        }
    }

    /// Run every failure callback with the ids that did load.
    pub fn dispatch_failure(&self, loaded_ids: &[UnitId]) {
        trace!(callbacks = self.failure.len(), "dispatching failure callbacks");
        for descriptor in &self.failure {
            descriptor.invoke(loaded_ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_invocation_appends_result_ids() {
        let seen: Arc<Mutex<Vec<(Vec<String>, Vec<String>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let descriptor = CallbackDescriptor::new(move |invocation| {
            let args = invocation
                .arguments
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>();
            let ids = invocation
                .result_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>();
            sink.lock().push((args, ids));
        })
        .with_argument(serde_json::json!("extra"))
        .with_argument(serde_json::json!(7));

        descriptor.invoke(&[UnitId::new("u1"), UnitId::new("u2")]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, vec!["\"extra\"", "7"]);
        assert_eq!(seen[0].1, vec!["u1", "u2"]);
    }

    #[test]
    fn test_context_reaches_the_method() {
        let hit = Arc::new(Mutex::new(false));
        let sink = hit.clone();

        let descriptor = CallbackDescriptor::new(move |invocation| {
            let context = invocation
                .context
                .and_then(|c| c.downcast_ref::<String>())
                .cloned();
            *sink.lock() = context.as_deref() == Some("ctx");
        })
        .with_context(Arc::new("ctx".to_string()));

        descriptor.invoke(&[]);
        assert!(*hit.lock());
    }

    #[test]
    fn test_all_registered_descriptors_run_in_order() {
        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let mut set = CallbackSet::default();
        for n in 0..3 {
            let sink = order.clone();
            set.push_success(CallbackDescriptor::new(move |_| sink.lock().push(n)));
        }

        set.dispatch_success(&[]);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
