//! Pluggable key-value persistence for client preferences.
//!
//! This module defines the [`Store`] (async) and [`BlockingStore`]
//! (blocking) traits via a shared macro, mirroring the source generation
//! pattern in [`crate::source`]. The feed itself never touches a store;
//! front-ends use one to remember things such as the last browsed
//! category.

#[cfg(feature = "storage-file")]
mod file;
mod memory;

#[cfg(feature = "storage-file")]
pub use file::FileStore;
pub use memory::InMemoryStore;

/// Well-known keys used by the bundled front-ends.
pub mod keys {
    /// Category code of the last browsed feed.
    pub const LAST_CATEGORY: &str = "lastCategory";
}

/// Generates a store trait (async or blocking) with all methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_store {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_store!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_store!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        define_store!(@method $mode, get,
            "Returns the value stored under `key`, or `Ok(None)` if absent.\n\n# Errors\n\nReturns an error if the storage backend fails to read.",
            key: &str, -> Result<Option<String>>);
        define_store!(@method $mode, set,
            "Stores `value` under `key`, replacing any previous value.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            key: &str, value: &str, -> Result<()>);
        define_store!(@method $mode, remove,
            "Removes `key`. Removing an absent key is not an error.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            key: &str, -> Result<()>);
        define_store!(@method $mode, clear,
            "Removes every stored key.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_store {
    //! Async store trait definition.

    use crate::error::Result;

    define_store! {
        trait_name: Store,
        trait_doc: "Async key-value store for client preferences.\n\nAll methods take `&self`; implementations should use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_store {
    //! Blocking store trait definition.

    use crate::error::Result;

    define_store! {
        trait_name: BlockingStore,
        trait_doc: "Blocking key-value store for client preferences.\n\nAll methods take `&self`; implementations should use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_store::Store;
#[cfg(feature = "blocking")]
pub use blocking_store::BlockingStore;
