use crate::error::{BindwireError, Result};
use crate::signals::{SignalId, SignalManager, SignalType};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "stream")]
use crate::signals::stream::SignalStream;

/// Callback registered on a signal.
///
/// Listeners are compared by identity: clones of one `Listener` are equal,
/// two listeners built from identical closures are not.
pub struct Listener<A> {
    callback: Arc<dyn Fn(&A) + Send + Sync>,
    label: Cow<'static, str>,
}

impl<A: 'static> Listener<A> {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            label: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }

    /// Listener with a readable name for error messages and traces.
    pub fn named<F>(label: impl Into<Cow<'static, str>>, callback: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, args: &A) {
        (self.callback)(args)
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            label: self.label.clone(),
        }
    }
}

impl<A> PartialEq for Listener<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<A> Eq for Listener<A> {}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.label).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSettings {
    /// Firing with nobody handling the signal is an error.
    pub requires_handler: bool,
    /// Buffer size of the observer stream.
    pub stream_capacity: usize,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            requires_handler: false,
            stream_capacity: 100,
        }
    }
}

/// A typed signal: an ordered set of listeners plus optional cross-cutting
/// handlers and stream observers.
///
/// # Example
/// ```rust,ignore
/// struct ScoreChanged;
///
/// impl SignalType for ScoreChanged {
///     type Args = (u32, String);
/// }
///
/// let signal = Signal::<ScoreChanged>::new(SignalSettings::default());
/// let on_score = Listener::new(|(score, player): &(u32, String)| {
///     tracing::info!("{} scored {}", player, score);
/// });
/// signal.listen(&on_score)?;
/// signal.fire((10, "ada".into()))?;
/// signal.unlisten(&on_score)?;
/// ```
pub struct Signal<S: SignalType> {
    id: SignalId,
    settings: SignalSettings,
    listeners: Mutex<Vec<Listener<S::Args>>>,
    manager: Option<Arc<SignalManager>>,
    #[cfg(feature = "stream")]
    stream: SignalStream<S::Args>,
}

impl<S: SignalType> Signal<S> {
    pub fn new(settings: SignalSettings) -> Self {
        Self::with_manager(settings, None, None)
    }

    /// Signal that consults `manager` for cross-cutting handlers on fire.
    pub fn with_manager(
        settings: SignalSettings,
        identifier: Option<crate::di::Identifier>,
        manager: Option<Arc<SignalManager>>,
    ) -> Self {
        Self {
            id: SignalId::of::<S>(identifier),
            settings,
            listeners: Mutex::new(Vec::new()),
            manager,
            #[cfg(feature = "stream")]
            stream: SignalStream::new(settings.stream_capacity),
        }
    }

    pub fn id(&self) -> &SignalId {
        &self.id
    }

    pub fn settings(&self) -> &SignalSettings {
        &self.settings
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Add a listener. Adding the same listener twice is an error.
    pub fn listen(&self, listener: &Listener<S::Args>) -> Result<()> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.contains(listener) {
            return Err(BindwireError::DuplicateListener {
                signal: self.id.to_string(),
                listener: listener.label().to_string(),
            });
        }
        listeners.push(listener.clone());
        Ok(())
    }

    /// Remove a listener. Removing one that was never added is an error.
    pub fn unlisten(&self, listener: &Listener<S::Args>) -> Result<()> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        match listeners.iter().position(|l| l == listener) {
            Some(index) => {
                listeners.remove(index);
                Ok(())
            }
            None => Err(BindwireError::ListenerNotFound {
                signal: self.id.to_string(),
                listener: listener.label().to_string(),
            }),
        }
    }

    /// Receiver of every argument tuple fired after this call.
    ///
    /// An open receiver counts as handling the signal.
    #[cfg(feature = "stream")]
    pub fn stream(&self) -> tokio::sync::broadcast::Receiver<S::Args> {
        self.stream.subscribe()
    }

    /// Fire the signal.
    ///
    /// Cross-cutting handlers run first, then listeners in registration
    /// order, then stream observers. Listeners run over a snapshot, so
    /// listeners added or removed during the fire take effect on the next one.
    pub fn fire(&self, args: S::Args) -> Result<()> {
        let _span = tracing::trace_span!("signal_fire", signal = %self.id).entered();

        let mut handled = match &self.manager {
            Some(manager) => manager.trigger(&self.id, &args)?,
            None => false,
        };

        let snapshot = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        handled |= !snapshot.is_empty();

        for listener in &snapshot {
            let _span = tracing::trace_span!("signal_listener", listener = listener.label()).entered();
            listener.call(&args);
        }

        #[cfg(feature = "stream")]
        {
            handled |= self.stream.has_observers();
            let _span = tracing::trace_span!("signal_stream").entered();
            self.stream.publish(args);
        }

        if self.settings.requires_handler && !handled {
            tracing::error!("Signal '{}' fired without any handler", self.id);
            return Err(BindwireError::UnhandledSignal {
                signal: self.id.to_string(),
            });
        }
        Ok(())
    }
}

impl<S: SignalType> fmt::Debug for Signal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("listeners", &self.listener_count())
            .field("has_manager", &self.manager.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    struct ScoreChanged;

    impl SignalType for ScoreChanged {
        type Args = (u32, &'static str);
    }

    fn required() -> SignalSettings {
        SignalSettings {
            requires_handler: true,
            ..SignalSettings::default()
        }
    }

    #[test]
    fn test_duplicate_listen_fails() {
        let signal = Signal::<ScoreChanged>::new(SignalSettings::default());
        let listener = Listener::named("on_score", |_: &(u32, &'static str)| {});

        signal.listen(&listener).unwrap();
        let err = signal.listen(&listener.clone()).unwrap_err();
        assert!(matches!(err, BindwireError::DuplicateListener { .. }));
        assert!(err.to_string().contains("on_score"));
        assert_eq!(signal.listener_count(), 1);
    }

    #[test]
    fn test_unlisten_unknown_listener_fails() {
        let signal = Signal::<ScoreChanged>::new(SignalSettings::default());
        let added = Listener::new(|_: &(u32, &'static str)| {});
        let never_added = Listener::new(|_: &(u32, &'static str)| {});

        signal.listen(&added).unwrap();
        assert!(matches!(
            signal.unlisten(&never_added),
            Err(BindwireError::ListenerNotFound { .. })
        ));
        signal.unlisten(&added).unwrap();
        assert!(signal.unlisten(&added).is_err());
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let signal = Signal::<ScoreChanged>::new(SignalSettings::default());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let listeners: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|name| {
                let calls = Arc::clone(&calls);
                Listener::new(move |(score, _): &(u32, &'static str)| {
                    calls.lock().unwrap().push(format!("{}:{}", name, score));
                })
            })
            .collect();
        for listener in &listeners {
            signal.listen(listener).unwrap();
        }

        signal.fire((3, "ada")).unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:3", "second:3", "third:3"]
        );
    }

    #[test]
    fn test_required_handler_without_listeners_fails() {
        let signal = Signal::<ScoreChanged>::new(required());
        assert!(matches!(
            signal.fire((1, "ada")),
            Err(BindwireError::UnhandledSignal { .. })
        ));

        signal
            .listen(&Listener::new(|_: &(u32, &'static str)| {}))
            .unwrap();
        signal.fire((1, "ada")).unwrap();
    }

    #[test]
    fn test_unlisten_self_during_fire_keeps_snapshot() {
        let signal = Arc::new(Signal::<ScoreChanged>::new(SignalSettings::default()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let own_handle: Arc<OnceLock<Listener<(u32, &'static str)>>> = Arc::new(OnceLock::new());

        let once = {
            let signal = Arc::clone(&signal);
            let calls = Arc::clone(&calls);
            let own_handle = Arc::clone(&own_handle);
            Listener::new(move |_: &(u32, &'static str)| {
                calls.lock().unwrap().push("once");
                if let Some(me) = own_handle.get() {
                    signal.unlisten(me).unwrap();
                }
            })
        };
        own_handle.set(once.clone()).unwrap();

        let after = {
            let calls = Arc::clone(&calls);
            Listener::new(move |_: &(u32, &'static str)| calls.lock().unwrap().push("after"))
        };

        signal.listen(&once).unwrap();
        signal.listen(&after).unwrap();

        signal.fire((1, "ada")).unwrap();
        signal.fire((2, "ada")).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["once", "after", "after"]);
        assert_eq!(signal.listener_count(), 1);
    }

    #[test]
    fn test_listener_added_during_fire_waits_for_next_fire() {
        let signal = Arc::new(Signal::<ScoreChanged>::new(SignalSettings::default()));
        let late_calls = Arc::new(Mutex::new(0));

        let late = {
            let late_calls = Arc::clone(&late_calls);
            Listener::new(move |_: &(u32, &'static str)| *late_calls.lock().unwrap() += 1)
        };
        let adder = {
            let signal = Arc::clone(&signal);
            let late = late.clone();
            Listener::new(move |_: &(u32, &'static str)| {
                let _ = signal.listen(&late);
            })
        };

        signal.listen(&adder).unwrap();
        signal.fire((1, "ada")).unwrap();
        assert_eq!(*late_calls.lock().unwrap(), 0);

        signal.fire((2, "ada")).unwrap();
        assert_eq!(*late_calls.lock().unwrap(), 1);
    }

    #[cfg(feature = "stream")]
    #[test]
    fn test_stream_observer_counts_as_handler() {
        let signal = Signal::<ScoreChanged>::new(required());
        let mut receiver = signal.stream();

        signal.fire((7, "grace")).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), (7, "grace"));

        drop(receiver);
        assert!(signal.fire((8, "grace")).is_err());
    }
}
