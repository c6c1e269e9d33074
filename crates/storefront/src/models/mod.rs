pub mod cart;

pub use cart::{CartItem, CartVariant, session_keys};
