use fluxion_error::FluxionError;

/// A tagged variant over everything that can happen on a subscription:
/// exactly the shape `onSubscribe`/`onNext`/`onError`/`onComplete` collapse
/// into when an operator needs to treat them uniformly.
///
/// Most operators never construct a `Signal` directly — they call the four
/// [`crate::subscriber::Subscriber`] methods straight through. `Signal`
/// becomes first-class only where the protocol itself needs to hand a whole
/// signal around as data, e.g. `switchOnFirst` inspecting the first emission
/// before deciding how to transform the rest, or a `materialize` operator
/// that turns a sequence of signals into a sequence of values.
#[derive(Debug, Clone)]
pub enum Signal<T> {
    /// A value produced by `onNext`.
    Next(T),
    /// The terminal error produced by `onError`. Mutually exclusive with
    /// [`Signal::Complete`] and always last.
    Error(FluxionError),
    /// The terminal completion produced by `onComplete`. Mutually exclusive
    /// with [`Signal::Error`] and always last.
    Complete,
}

impl<T> Signal<T> {
    /// True for [`Signal::Error`] or [`Signal::Complete`] — the two terminal
    /// variants after which no further signal may be delivered.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Complete)
    }

    /// True for [`Signal::Next`].
    #[must_use]
    pub fn is_next(&self) -> bool {
        matches!(self, Self::Next(_))
    }

    /// Borrow the value carried by a [`Signal::Next`], if this is one.
    #[must_use]
    pub fn next_value(&self) -> Option<&T> {
        match self {
            Self::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the signal, returning the value carried by a [`Signal::Next`].
    #[must_use]
    pub fn into_next_value(self) -> Option<T> {
        match self {
            Self::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Map the value inside [`Signal::Next`], leaving terminal signals as-is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Signal<U> {
        match self {
            Self::Next(v) => Signal::Next(f(v)),
            Self::Error(e) => Signal::Error(e),
            Self::Complete => Signal::Complete,
        }
    }
}
