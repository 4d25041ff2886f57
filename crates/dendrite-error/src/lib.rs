use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

#[cfg(feature = "backtrace")]
use std::backtrace::Backtrace;

pub type NeatResult<T> = Result<T, NeatError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidConfig,
    SensorArity,
    ActivationDepthLoop,
    ActivationStepsExceeded,
    UnknownActivator,
    RecursiveModeOnModularNet,
    GenomeInvariant,
    InnovationLookupMiss,
    Io,
    Canceled,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<Cow<'static, str>>> From<T> for ErrString {
    fn from(v: T) -> Self {
        Self(v.into())
    }
}

#[derive(Debug)]
pub enum NeatError {
    InvalidConfig {
        message: ErrString,
    },
    /// The sensor vector handed to a solver does not match the network's input arity.
    SensorArity {
        expected: usize,
        actual: usize,
    },
    /// Depth calculation walked past the configured ceiling, which indicates a loop.
    ActivationDepthLoop {
        ceiling: usize,
    },
    /// The settling loop ran out of sub-steps before every output activated.
    ActivationStepsExceeded {
        steps: usize,
    },
    UnknownActivator {
        message: ErrString,
    },
    /// Recursive activation is undefined for networks with control modules.
    RecursiveModeOnModularNet,
    GenomeInvariant {
        message: ErrString,
    },
    /// Internal: an innovation lookup missed. Recovered by allocating fresh numbers.
    InnovationLookupMiss {
        message: ErrString,
    },
    Io {
        source: std::io::Error,
    },
    Canceled,
    Context {
        context: ErrorContext,
        source: Box<NeatError>,
        #[cfg(feature = "backtrace")]
        backtrace: Backtrace,
    },
}

impl NeatError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::SensorArity { .. } => ErrorCode::SensorArity,
            Self::ActivationDepthLoop { .. } => ErrorCode::ActivationDepthLoop,
            Self::ActivationStepsExceeded { .. } => ErrorCode::ActivationStepsExceeded,
            Self::UnknownActivator { .. } => ErrorCode::UnknownActivator,
            Self::RecursiveModeOnModularNet => ErrorCode::RecursiveModeOnModularNet,
            Self::GenomeInvariant { .. } => ErrorCode::GenomeInvariant,
            Self::InnovationLookupMiss { .. } => ErrorCode::InnovationLookupMiss,
            Self::Io { .. } => ErrorCode::Io,
            Self::Canceled => ErrorCode::Canceled,
            Self::Context { .. } => ErrorCode::Context,
        }
    }

    pub fn with_context(self, msg: impl Into<String>) -> Self {
        NeatError::Context {
            context: ErrorContext::new(msg),
            source: Box::new(self),
            #[cfg(feature = "backtrace")]
            backtrace: Backtrace::capture(),
        }
    }
}

impl Display for NeatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => write!(f, "Invalid configuration: {}", message),
            Self::SensorArity { expected, actual } => write!(
                f,
                "Sensor arity mismatch: network expects {} inputs, got {}",
                expected, actual
            ),
            Self::ActivationDepthLoop { ceiling } => write!(
                f,
                "Depth calculation exceeded ceiling of {}, loop detected",
                ceiling
            ),
            Self::ActivationStepsExceeded { steps } => write!(
                f,
                "Network failed to activate all outputs within {} settling steps",
                steps
            ),
            Self::UnknownActivator { message } => write!(f, "Unknown activator: {}", message),
            Self::RecursiveModeOnModularNet => {
                write!(f, "Recursive activation is not supported on modular networks")
            }
            Self::GenomeInvariant { message } => write!(f, "Genome invariant violated: {}", message),
            Self::InnovationLookupMiss { message } => {
                write!(f, "Innovation lookup miss: {}", message)
            }
            Self::Io { source } => write!(f, "I/O error: {}", source),
            Self::Canceled => write!(f, "Canceled"),
            Self::Context {
                context, source, ..
            } => write!(f, "{}\nCaused by: {}", context, source),
        }
    }
}

impl std::error::Error for NeatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source } => Some(source),
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NeatError {
    fn from(source: std::io::Error) -> Self {
        NeatError::Io { source }
    }
}

#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}

impl ErrorContext {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorContext {}

// Ergonomic Result extensions (context)
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> NeatResult<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> NeatResult<T>;
}

impl<T, E: Into<NeatError>> ResultExt<T> for Result<T, E> {
    fn context(self, msg: impl Into<String>) -> NeatResult<T> {
        self.map_err(|e| e.into().with_context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> NeatResult<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

// Macros: err, bail, ensure
#[doc(hidden)]
pub mod __private {
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use<E>(e: E) -> E {
        e
    }
}

#[macro_export]
macro_rules! dendrite_err {
    (InvalidConfig: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::NeatError::InvalidConfig { message: format!($fmt, $($arg),*).into() })
    };
    (UnknownActivator: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::NeatError::UnknownActivator { message: format!($fmt, $($arg),*).into() })
    };
    (GenomeInvariant: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::NeatError::GenomeInvariant { message: format!($fmt, $($arg),*).into() })
    };
    (InnovationLookupMiss: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::NeatError::InnovationLookupMiss { message: format!($fmt, $($arg),*).into() })
    };
}

#[macro_export]
macro_rules! dendrite_bail {
    ($($tt:tt)+) => { return Err($crate::dendrite_err!($($tt)+)) };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond { $crate::dendrite_bail!($($tt)+); }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_round_trip_variants() {
        let err = dendrite_err!(InvalidConfig: "unknown key '{}'", "foo");
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
        assert!(err.to_string().contains("unknown key 'foo'"));

        let err = NeatError::SensorArity {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.code(), ErrorCode::SensorArity);
    }

    #[test]
    fn context_chains_display() {
        let inner = dendrite_err!(GenomeInvariant: "gene 4 references missing node 9");
        let err = inner.with_context("verifying genome 12");
        assert_eq!(err.code(), ErrorCode::Context);
        let text = err.to_string();
        assert!(text.contains("verifying genome 12"));
        assert!(text.contains("missing node 9"));
    }

    #[test]
    fn ensure_bails_on_false() {
        fn check(flag: bool) -> NeatResult<()> {
            ensure!(flag, InvalidConfig: "flag must be set");
            Ok(())
        }
        assert!(check(true).is_ok());
        assert!(check(false).is_err());
    }
}
