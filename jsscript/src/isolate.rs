//! The per-thread [v8::Isolate] that scripts run in.

use anyhow::{Result, bail};

static INIT_V8: std::sync::OnceLock<()> = std::sync::OnceLock::new();

/// Initialises [v8]. Must be called before any other functions in [v8] or this crate. Can safely
/// be called multiple times. Must be called from the main thread.
pub fn init_v8() {
    INIT_V8.get_or_init(|| {
        let platform = v8::new_default_platform(0, false).make_shared();
        v8::V8::initialize_platform(platform);
        v8::V8::initialize();
    });
}

/// As [init_v8], but may be called from any thread. Provides fewer security protections, so is
/// only appropriate for tests.
pub fn init_v8_for_testing() {
    INIT_V8.get_or_init(|| {
        let platform = v8::new_unprotected_default_platform(0, false).make_shared();
        v8::V8::initialize_platform(platform);
        v8::V8::initialize();
    });
}

thread_local! {
    static SCRIPT_ISOLATE: std::cell::RefCell<Option<ThreadIsolate>> = const {
        std::cell::RefCell::new(None)
    };
}

/// Owns the script isolate of the thread that created it, destroying the isolate on [Drop].
///
/// [crate::JsScriptCapability] runs scripts in the isolate of whichever thread calls it, so
/// every thread that evaluates parameters must hold one of these.
pub struct ScriptIsolate(
    // Neither [Send] nor [Sync]: the isolate belongs to the creating thread.
    std::marker::PhantomData<*const ()>,
);

impl ScriptIsolate {
    pub fn for_current_thread() -> Result<Self> {
        SCRIPT_ISOLATE.try_with(|cell| {
            if cell.borrow().is_some() {
                bail!("a script isolate already exists for this thread");
            }
            cell.replace(Some(ThreadIsolate {
                isolate: v8::Isolate::new(v8::CreateParams::default()),
            }));
            log::debug!("Created script isolate for {:?}.", std::thread::current().id());
            Ok(Self(std::marker::PhantomData))
        })?
    }
}

impl Drop for ScriptIsolate {
    fn drop(&mut self) {
        if let Err(err) = SCRIPT_ISOLATE.try_with(|cell| cell.borrow_mut().take()) {
            log::warn!("Could not drop script isolate: {err}.");
        }
    }
}

/// The current thread's isolate, as lent by [with_thread_isolate].
pub struct ThreadIsolate {
    isolate: v8::OwnedIsolate,
}

impl ThreadIsolate {
    pub fn isolate(&mut self) -> &mut v8::OwnedIsolate {
        &mut self.isolate
    }

    /// Handle through which other threads may terminate running scripts.
    pub fn termination_handle(&self) -> v8::IsolateHandle {
        self.isolate.thread_safe_handle()
    }
}

#[derive(Debug)]
pub enum IsolateError {
    /// The thread local could not be accessed, e.g. during thread shutdown.
    Access(std::thread::AccessError),
    /// No [ScriptIsolate] exists for the current thread.
    NotCreated,
}

impl std::fmt::Display for IsolateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsolateError::Access(err) => write!(f, "accessing script isolate: {err}"),
            IsolateError::NotCreated => {
                write!(f, "no script isolate was created for the current thread")
            }
        }
    }
}

impl std::error::Error for IsolateError {}

/// Runs `f` with the current thread's isolate.
pub fn with_thread_isolate<F, R>(f: F) -> Result<R, IsolateError>
where
    F: FnOnce(&mut ThreadIsolate) -> R,
{
    SCRIPT_ISOLATE
        .try_with(|cell| {
            let mut borrowed = cell.borrow_mut();
            let isolate = borrowed.as_mut().ok_or(IsolateError::NotCreated)?;
            Ok(f(isolate))
        })
        .map_err(IsolateError::Access)?
}
