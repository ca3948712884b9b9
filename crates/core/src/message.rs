//! Stable user-facing failure messages.
//!
//! These strings are part of the API contract: clients match on them
//! verbatim, so changing one is a breaking change.

pub const ITEM_NOT_FOUND: &str = "item not found";
pub const RECORD_NOT_FOUND: &str = "specified record does not exist";
pub const RECORD_ITEM_MISMATCH: &str = "item id and record id do not match";
pub const INSUFFICIENT_STOCK: &str = "insufficient stock";

pub const CATEGORY_NOT_FOUND: &str = "category not found";
pub const CATEGORY_LIMIT_REACHED: &str = "category limit reached";
pub const CATEGORY_NAME_TAKEN: &str = "category name already exists";
pub const CATEGORY_HAS_ACTIVE_ITEMS: &str = "category still has registered items";
pub const DEFAULT_CATEGORY_NOT_EDITABLE: &str = "default categories cannot be edited";
pub const DEFAULT_CATEGORY_NOT_DELETABLE: &str = "default categories cannot be deleted";

pub const ITEM_NAME_TAKEN: &str = "item name already exists";
pub const NO_ITEMS_REGISTERED: &str = "no items registered";
pub const DEFAULT_ITEM_NOT_DELETABLE: &str = "default items cannot be deleted";

pub const CATEGORY_NAME_REQUIRED: &str = "category name is required";
pub const CATEGORY_NAME_TOO_LONG: &str = "category name must be 50 characters or less";
pub const ITEM_NAME_REQUIRED: &str = "item name is required";
pub const ITEM_NAME_TOO_LONG: &str = "item name must be 50 characters or less";

pub const QUANTITY_NEGATIVE: &str = "quantity must not be negative";
pub const OUT_QUANTITY_NOT_POSITIVE: &str = "quantity must be greater than zero for out records";
pub const PRICE_NEGATIVE: &str = "price must not be negative";
pub const SOURCE_RECORD_REQUIRED: &str = "source record id is required for out records";
pub const SOURCE_RECORD_FORBIDDEN: &str = "source record id is only allowed on out records";
pub const PRICE_FORBIDDEN_ON_OUT: &str = "price is only allowed on in records";
pub const EXPIRATION_FORBIDDEN_ON_OUT: &str = "expiration date is only allowed on in records";

pub const STORAGE_UNAVAILABLE: &str = "storage unavailable";

/// Generic body for unclassified failures; internals are never echoed to
/// clients.
pub const SERVER_ERROR: &str = "a server error has occurred";
