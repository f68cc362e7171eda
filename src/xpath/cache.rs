//! Compiled Expression Cache
//!
//! Facade lookups tend to repeat the same few path strings, so compiled
//! programs are kept in a small per-thread LRU keyed by expression text.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use super::compiler::{compile, CompiledExpr};
use crate::error::XPathError;

/// Maximum number of compiled expressions kept per thread
pub const CACHE_SIZE: usize = 64;

thread_local! {
    static COMPILED: RefCell<LruCache<String, Rc<CompiledExpr>>> = RefCell::new(
        LruCache::new(NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
    );
}

/// Compile an expression, reusing a cached program when available.
/// Failed compilations are not cached.
pub fn compile_cached(xpath: &str) -> Result<Rc<CompiledExpr>, XPathError> {
    if let Some(hit) = COMPILED.with(|cache| cache.borrow_mut().get(xpath).cloned()) {
        return Ok(hit);
    }

    let compiled = Rc::new(compile(xpath)?);
    COMPILED.with(|cache| {
        cache
            .borrow_mut()
            .put(xpath.to_string(), Rc::clone(&compiled));
    });
    tracing::trace!(xpath, "compiled xpath expression");
    Ok(compiled)
}

/// Number of expressions currently cached on this thread
pub fn cached_len() -> usize {
    COMPILED.with(|cache| cache.borrow().len())
}
