//! Caller identity: function, file, and line of the public call site.
//!
//! File and line come from `#[track_caller]`, which pins them to the code
//! that called into `sig` no matter how the crate is laid out internally.
//! The function name is resolved by a [`ResolveCaller`] implementation, or
//! captured at compile time with the [`caller!`](crate::caller!) and
//! [`start!`](crate::start!) macros.

use once_cell::sync::Lazy;
use regex::Regex;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::Location;
use std::path::Path;

/// Identity of the code that started a unit of work or emitted an event.
///
/// Any field may be blank when it could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// File and line of `location`, with no function name.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self {
            function: String::new(),
            file: location.file().to_string(),
            line: location.line(),
        }
    }

    /// File and line of whoever called this function.
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }
}

/// Resolves the identity of a call site.
pub trait ResolveCaller: Send + Sync {
    /// Resolve the caller at `site`. Must not fail; unresolved fields stay blank.
    fn resolve(&self, site: &'static Location<'static>) -> Caller;
}

/// File and line only. No stack inspection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationResolver;

impl ResolveCaller for LocationResolver {
    fn resolve(&self, site: &'static Location<'static>) -> Caller {
        Caller::from_location(site)
    }
}

/// Finds the function name by walking a captured backtrace to the frame
/// at the call site.
///
/// Needs symbols in the binary; a stripped build yields a blank function.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceResolver;

impl ResolveCaller for BacktraceResolver {
    fn resolve(&self, site: &'static Location<'static>) -> Caller {
        let mut caller = Caller::from_location(site);
        let trace = Backtrace::force_capture();
        if trace.status() == BacktraceStatus::Captured {
            if let Some(function) = function_at(&trace.to_string(), site.file(), site.line()) {
                caller.function = function;
            }
        }
        caller
    }
}

static HASH_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"::h[0-9a-f]{16}$").expect("valid regex"));

/// Symbol of the first frame in a rendered backtrace located at `file:line`.
fn function_at(rendered: &str, file: &str, line: u32) -> Option<String> {
    let mut symbol: Option<&str> = None;
    for entry in rendered.lines().map(str::trim) {
        if let Some(position) = entry.strip_prefix("at ") {
            if let Some(name) = symbol {
                if frame_matches(position, file, line) {
                    let name = HASH_SUFFIX.replace(name, "");
                    return Some(trim_closures(&name).to_string());
                }
            }
        } else {
            // "12: crate::module::function" or an unnumbered inlined symbol
            symbol = Some(match entry.split_once(": ") {
                Some((index, name)) if index.chars().all(|c| c.is_ascii_digit()) => name,
                _ => entry,
            });
        }
    }
    None
}

/// Whether a backtrace position `path:line:col` is `file:line`.
fn frame_matches(position: &str, file: &str, line: u32) -> bool {
    let mut parts = position.rsplitn(3, ':');
    let (Some(_column), Some(frame_line), Some(frame_file)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    frame_line.parse::<u32>() == Ok(line) && Path::new(frame_file).ends_with(file)
}

/// Strip trailing `::{{closure}}` segments so closures and async blocks
/// report their enclosing function.
#[doc(hidden)]
pub fn trim_closures(name: &str) -> &str {
    let mut name = name;
    while let Some(stripped) = name.strip_suffix("::{{closure}}") {
        name = stripped;
    }
    name
}

/// Path of the enclosing function, resolved at compile time.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __sig_probe() {}
        fn __sig_type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __sig_type_name_of(__sig_probe);
        $crate::caller::trim_closures(name.strip_suffix("::__sig_probe").unwrap_or(name))
    }};
}

/// Full [`Caller`](crate::Caller) for the invocation site.
#[macro_export]
macro_rules! caller {
    () => {
        $crate::Caller::new($crate::function_name!(), file!(), line!())
    };
}
