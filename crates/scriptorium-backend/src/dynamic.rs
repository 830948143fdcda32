//! Dynamic backend loading.
//!
//! Dynamic backends are cdylibs exporting [`ENTRY_SYMBOL`], an
//! `unsafe extern "C" fn() -> *mut BackendExport` usually produced by
//! the [`declare_backend!`] macro. The loader keeps the
//! [`libloading::Library`] alive for as long as the wrapped backend.

use std::path::Path;
use std::sync::Arc;

use libloading::Library;

use scriptorium_core::{LanguageBackend, Script, ScriptApi, ScriptError, Value};

/// ABI version of the backend export. Bumped on any breaking change to
/// [`BackendExport`] or the [`LanguageBackend`] trait.
pub const BACKEND_API_VERSION: u32 = 1;

/// Symbol a dynamic backend must export.
pub const ENTRY_SYMBOL: &str = "scriptorium_backend_entry";

/// What a dynamic backend hands to the host.
pub struct BackendExport {
    /// Must equal [`BACKEND_API_VERSION`].
    pub api_version: u32,
    /// The backend implementation.
    pub backend: Box<dyn LanguageBackend>,
}

/// Signature of the exported entry function.
pub type BackendEntry = unsafe extern "C" fn() -> *mut BackendExport;

/// Declare the entry point of a dynamic scriptorium backend.
///
/// The argument is an expression evaluating to a type implementing
/// `LanguageBackend`.
///
/// ```ignore
/// use scriptorium_backend::declare_backend;
///
/// struct PythonBackend;
/// // impl LanguageBackend for PythonBackend { ... }
///
/// declare_backend!(PythonBackend);
/// ```
#[macro_export]
macro_rules! declare_backend {
    ($ctor:expr) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn scriptorium_backend_entry()
        -> *mut $crate::dynamic::BackendExport {
            Box::into_raw(Box::new($crate::dynamic::BackendExport {
                api_version: $crate::dynamic::BACKEND_API_VERSION,
                backend: Box::new($ctor),
            }))
        }
    };
}

/// A backend loaded from a cdylib. Holds the library open so the
/// backend's code stays mapped for the process lifetime.
pub struct DynamicBackend {
    _library: Arc<Library>,
    inner: Box<dyn LanguageBackend>,
}

impl DynamicBackend {
    /// Load a backend from the given library path.
    ///
    /// # Safety
    ///
    /// Loading a shared library executes its initializers; the caller
    /// must trust the file. The entry symbol must match
    /// [`BackendEntry`] and the export must come from a compatible
    /// build.
    pub unsafe fn load(path: &Path) -> Result<Self, ScriptError> {
        let load_err = |message: String| ScriptError::BackendLoad {
            path: path.to_path_buf(),
            message,
        };

        // SAFETY: caller contract, see above.
        let library = unsafe { Library::new(path) }.map_err(|e| load_err(e.to_string()))?;
        let export = {
            let entry = unsafe { library.get::<BackendEntry>(ENTRY_SYMBOL.as_bytes()) }
                .map_err(|e| load_err(format!("missing entry symbol: {e}")))?;
            unsafe { Box::from_raw(entry()) }
        };

        if export.api_version != BACKEND_API_VERSION {
            return Err(load_err(format!(
                "incompatible API version {} (host supports {})",
                export.api_version, BACKEND_API_VERSION
            )));
        }

        Ok(Self {
            _library: Arc::new(library),
            inner: export.backend,
        })
    }
}

impl LanguageBackend for DynamicBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn url(&self) -> &str {
        self.inner.url()
    }

    fn line_comment(&self) -> &str {
        self.inner.line_comment()
    }

    fn handles_file(&self, path: &Path) -> bool {
        self.inner.handles_file(path)
    }

    fn execute(&self, script: &Script, api: &mut ScriptApi) -> Result<Value, ScriptError> {
        self.inner.execute(script, api)
    }
}
