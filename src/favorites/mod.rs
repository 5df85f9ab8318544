//! Favorites Module
//!
//! Observable set store used to track the user's favorite items.

mod dispatch;
mod set;


pub use set::ObservableSet;

/// Handle returned by `subscribe`, used to unsubscribe later.
pub type ObserverId = u64;

/// Catalog item identifier.
pub type ItemId = u32;

/// The favorites store: the set of favorite item ids.
pub type FavoritesStore = ObservableSet<ItemId>;
