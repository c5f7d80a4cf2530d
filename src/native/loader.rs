//! Dynamic Sort Primitive Loader
//!
//! Resolves `qsort` (and `qsort_r`) from shared libraries at runtime with
//! libloading, instead of linking them at build time.

use std::os::raw::c_void;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use super::{CompareFn, ContextCompareFn, NativeSort};
use crate::error::{SortError, SortResult};

/// File name of the C library that exports `qsort` on this platform
#[cfg(target_os = "linux")]
pub const DEFAULT_C_LIBRARY: &str = "libc.so.6";
#[cfg(target_os = "macos")]
pub const DEFAULT_C_LIBRARY: &str = "libSystem.B.dylib";
#[cfg(target_os = "windows")]
pub const DEFAULT_C_LIBRARY: &str = "ucrtbase.dll";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const DEFAULT_C_LIBRARY: &str = "libc.so";

type QsortFn = unsafe extern "C" fn(*mut c_void, usize, usize, Option<CompareFn>);
type QsortRFn =
    unsafe extern "C" fn(*mut c_void, usize, usize, Option<ContextCompareFn>, *mut c_void);

/// `qsort` resolved from a shared library
pub struct DynamicQsort {
    /// Where the symbol came from, for logs and errors
    origin: String,
    /// Keeps the code behind `func` mapped
    _library: Library,
    func: QsortFn,
}

impl DynamicQsort {
    /// Open `path` and resolve `qsort` from it
    pub fn load(path: impl AsRef<Path>) -> SortResult<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        // Safety: opening a library runs its initializers; the caller chose
        // the path and vouches for it.
        let library = unsafe { Library::new(path) }.map_err(|e| SortError::Load {
            path: origin.clone(),
            reason: e.to_string(),
        })?;

        Self::resolve(library, origin)
    }

    /// Resolve `qsort` from the running process image
    pub fn from_process() -> SortResult<Self> {
        Self::resolve(process_library()?, "<process>".to_string())
    }

    fn resolve(library: Library, origin: String) -> SortResult<Self> {
        // Safety: `qsort` has had this signature since C89.
        let func = unsafe { symbol::<QsortFn>(&library, "qsort", &origin)? };
        debug!(library = %origin, "resolved qsort");
        Ok(Self {
            origin,
            _library: library,
            func,
        })
    }

    /// Where `qsort` was resolved from
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

unsafe impl NativeSort for DynamicQsort {
    fn name(&self) -> &str {
        "dynamic"
    }

    unsafe fn sort(&self, base: *mut c_void, count: usize, size: usize, cmp: CompareFn) {
        (self.func)(base, count, size, Some(cmp))
    }
}

impl std::fmt::Debug for DynamicQsort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicQsort")
            .field("origin", &self.origin)
            .finish()
    }
}

/// `qsort_r` resolved from the running process image.
///
/// Only the glibc/musl argument order (`compare(a, b, ctx)` with `ctx` last)
/// is supported; BSD and macOS ship an incompatible `qsort_r`.
pub struct ContextQsort {
    _library: Library,
    func: QsortRFn,
}

impl ContextQsort {
    /// Resolve `qsort_r` from the running process
    #[cfg(target_os = "linux")]
    pub fn from_process() -> SortResult<Self> {
        let library = process_library()?;
        // Safety: glibc >= 2.8 and musl >= 1.2.3 share this signature.
        let func = unsafe { symbol::<QsortRFn>(&library, "qsort_r", "<process>")? };
        debug!("resolved qsort_r");
        Ok(Self {
            _library: library,
            func,
        })
    }

    /// Resolve `qsort_r` from the running process
    #[cfg(not(target_os = "linux"))]
    pub fn from_process() -> SortResult<Self> {
        Err(SortError::Unsupported(
            "qsort_r with a trailing context argument".to_string(),
        ))
    }

    /// Sort with a comparator that receives `ctx` as its third argument.
    ///
    /// # Safety
    ///
    /// Same contract as [`NativeSort::sort`]; `ctx` must stay valid for the
    /// whole call and match what `cmp` expects.
    pub unsafe fn sort(
        &self,
        base: *mut c_void,
        count: usize,
        size: usize,
        cmp: ContextCompareFn,
        ctx: *mut c_void,
    ) {
        (self.func)(base, count, size, Some(cmp), ctx)
    }
}

impl std::fmt::Debug for ContextQsort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextQsort").finish_non_exhaustive()
    }
}

/// Look up `name` in `library` and copy the function pointer out.
///
/// # Safety
///
/// `F` must match the symbol's real type.
unsafe fn symbol<F: Copy>(library: &Library, name: &str, origin: &str) -> SortResult<F> {
    let mut c_name = name.as_bytes().to_vec();
    c_name.push(0);
    let symbol = library
        .get::<F>(&c_name)
        .map_err(|_| SortError::SymbolNotFound {
            symbol: name.to_string(),
            library: origin.to_string(),
        })?;
    Ok(*symbol)
}

#[cfg(unix)]
fn process_library() -> SortResult<Library> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn process_library() -> SortResult<Library> {
    libloading::os::windows::Library::this()
        .map(Into::into)
        .map_err(|e| SortError::Load {
            path: "<process>".to_string(),
            reason: e.to_string(),
        })
}

/// Library loader with search paths
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a loader seeded with the platform's default search paths
    pub fn new() -> Self {
        Self {
            search_paths: default_search_paths(),
        }
    }

    /// Add a search path; later paths are tried after earlier ones
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    /// Put a search path in front of all others
    pub fn prepend_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.insert(0, path.as_ref().to_path_buf());
    }

    /// The current search paths, in lookup order
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find a library by name
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        self.candidates(name).into_iter().next()
    }

    /// Every file on the search paths that could be `name`, in lookup order.
    ///
    /// An unversioned `libfoo.so` is often a linker script from a dev
    /// package, so versioned siblings (`libfoo.so.1`) follow it in each
    /// directory.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        // If it's already a path, check if it exists
        let path = Path::new(name);
        if path.is_absolute() {
            return if path.exists() {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            };
        }

        let lib_name = library_filename(name);
        let mut found = Vec::new();
        for dir in &self.search_paths {
            let exact = dir.join(&lib_name);
            if exact.is_file() {
                found.push(exact);
            }
            if lib_name.ends_with(".so") {
                found.extend(versioned_siblings(dir, &lib_name));
            }
        }
        found
    }

    /// Find `name` on the search paths and resolve `qsort` from it.
    ///
    /// Candidates that fail to load are skipped. When none loads, the name is
    /// handed to the system loader, which applies its own lookup rules.
    pub fn open(&self, name: &str) -> SortResult<DynamicQsort> {
        let mut last_error = None;
        for path in self.candidates(name) {
            match DynamicQsort::load(&path) {
                Ok(native) => return Ok(native),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "candidate not usable, trying next");
                    last_error = Some(e);
                }
            }
        }

        debug!(library = name, "deferring to system loader");
        DynamicQsort::load(library_filename(name)).map_err(|e| match (e, last_error) {
            (_, Some(earlier)) => earlier,
            (SortError::Load { .. }, None) => SortError::LibraryNotFound(name.to_string()),
            (other, None) => other,
        })
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default library search paths for this platform
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(ld_path) = std::env::var("LD_LIBRARY_PATH") {
            paths.extend(ld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/lib"));
        paths.push(PathBuf::from("/lib64"));
        paths.push(PathBuf::from("/usr/lib64"));
        #[cfg(target_arch = "x86_64")]
        {
            paths.push(PathBuf::from("/lib/x86_64-linux-gnu"));
            paths.push(PathBuf::from("/usr/lib/x86_64-linux-gnu"));
        }
        #[cfg(target_arch = "aarch64")]
        {
            paths.push(PathBuf::from("/lib/aarch64-linux-gnu"));
            paths.push(PathBuf::from("/usr/lib/aarch64-linux-gnu"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(dyld_path) = std::env::var("DYLD_LIBRARY_PATH") {
            paths.extend(dyld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/opt/homebrew/lib"));
    }

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from("C:\\Windows\\System32"));
        if let Ok(path) = std::env::var("PATH") {
            paths.extend(path.split(';').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
    }

    paths
}

/// `lib_name.N...` files in `dir`, sorted by name
fn versioned_siblings(dir: &Path, lib_name: &str) -> Vec<PathBuf> {
    let prefix = format!("{}.", lib_name);
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut siblings: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    siblings.sort();
    siblings
}

/// Construct the platform-specific library filename.
///
/// Names that already carry a shared-library suffix (including versioned
/// ones like `libc.so.6`) are returned unchanged.
pub(crate) fn library_filename(name: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        if name.ends_with(".dylib") {
            name.to_string()
        } else {
            format!("lib{}.dylib", name)
        }
    }

    #[cfg(target_os = "windows")]
    {
        if name.ends_with(".dll") {
            name.to_string()
        } else {
            format!("{}.dll", name)
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if name.ends_with(".so") || name.contains(".so.") {
            name.to_string()
        } else {
            format!("lib{}.so", name)
        }
    }
}
