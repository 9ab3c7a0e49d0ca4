//! Authentication utilities - shared-secret gate and session store encryption

mod shared_secret;
mod store_key;

pub use shared_secret::SharedSecret;
pub use store_key::{StoreCipher, StoreKeyError, SALT_LEN};
