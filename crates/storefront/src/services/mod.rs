pub mod cart;
pub mod notifications;

pub use cart::{CartError, CartService, CartStore, CheckoutGateway, SessionCartStore};
pub use notifications::{Notification, NotificationKind, NotificationQueue};
