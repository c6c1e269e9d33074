//! Cart state and checkout session synchronization.
//!
//! The cart lives in the visitor's session; the remote checkout session is
//! kept in sync through [`CheckoutGateway`]. All mutating operations run
//! under a single async lock so concurrent requests cannot interleave
//! remote mutations out of order.
//!
//! Error policy: precondition failures (unknown item, unsynchronized line,
//! zero quantity) are returned to the caller. Remote checkout failures are
//! swallowed into an error notification and leave local state unchanged;
//! the local mirror only moves once the checkout session has accepted the
//! mutation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};
use url::Url;

use loomline_core::{CheckoutId, CurrencyCode, LineId, Price, VariantId};

use crate::models::{CartItem, session_keys};
use crate::services::notifications::NotificationQueue;
use crate::shopify::ShopifyError;
use crate::shopify::storefront::StorefrontClient;
use crate::shopify::types::{
    Checkout, CheckoutLineInput, CheckoutLineUpdate, Product, ProductVariant,
};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("item is not in the cart")]
    ItemNotFound,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("cart line has not been synchronized with the checkout session")]
    MissingLineId,
    #[error("no checkout session exists for this cart")]
    NoCheckout,
    #[error("checkout unavailable: {0}")]
    CheckoutUnavailable(String),
    #[error("session storage error: {0}")]
    Store(String),
}

impl From<tower_sessions::session::Error> for CartError {
    fn from(e: tower_sessions::session::Error) -> Self {
        Self::Store(e.to_string())
    }
}

// =============================================================================
// Seams
// =============================================================================

/// Remote checkout session operations.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout(&self) -> Result<Checkout, ShopifyError>;
    async fn get_checkout(&self, checkout_id: &CheckoutId) -> Result<Checkout, ShopifyError>;
    async fn add_line_items(
        &self,
        checkout_id: &CheckoutId,
        lines: Vec<CheckoutLineInput>,
    ) -> Result<Checkout, ShopifyError>;
    async fn update_line_items(
        &self,
        checkout_id: &CheckoutId,
        updates: Vec<CheckoutLineUpdate>,
    ) -> Result<Checkout, ShopifyError>;
    async fn remove_line_items(
        &self,
        checkout_id: &CheckoutId,
        line_ids: Vec<LineId>,
    ) -> Result<Checkout, ShopifyError>;
}

#[async_trait]
impl CheckoutGateway for StorefrontClient {
    async fn create_checkout(&self) -> Result<Checkout, ShopifyError> {
        Self::create_checkout(self).await
    }

    async fn get_checkout(&self, checkout_id: &CheckoutId) -> Result<Checkout, ShopifyError> {
        Self::get_checkout(self, checkout_id).await
    }

    async fn add_line_items(
        &self,
        checkout_id: &CheckoutId,
        lines: Vec<CheckoutLineInput>,
    ) -> Result<Checkout, ShopifyError> {
        Self::add_line_items(self, checkout_id, lines).await
    }

    async fn update_line_items(
        &self,
        checkout_id: &CheckoutId,
        updates: Vec<CheckoutLineUpdate>,
    ) -> Result<Checkout, ShopifyError> {
        Self::update_line_items(self, checkout_id, updates).await
    }

    async fn remove_line_items(
        &self,
        checkout_id: &CheckoutId,
        line_ids: Vec<LineId>,
    ) -> Result<Checkout, ShopifyError> {
        Self::remove_line_items(self, checkout_id, line_ids).await
    }
}

/// Per-visitor persistence of cart state.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn checkout_id(&self) -> Result<Option<CheckoutId>, CartError>;
    async fn set_checkout_id(&self, id: Option<&CheckoutId>) -> Result<(), CartError>;
    async fn items(&self) -> Result<Vec<CartItem>, CartError>;
    async fn set_items(&self, items: &[CartItem]) -> Result<(), CartError>;
    async fn is_open(&self) -> Result<bool, CartError>;
    async fn set_open(&self, open: bool) -> Result<(), CartError>;
}

/// [`CartStore`] backed by the request session.
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CartStore for SessionCartStore {
    async fn checkout_id(&self) -> Result<Option<CheckoutId>, CartError> {
        Ok(self
            .session
            .get::<String>(session_keys::CHECKOUT_ID)
            .await?
            .map(CheckoutId::new))
    }

    async fn set_checkout_id(&self, id: Option<&CheckoutId>) -> Result<(), CartError> {
        match id {
            Some(id) => {
                self.session
                    .insert(session_keys::CHECKOUT_ID, id.as_str())
                    .await?;
            }
            None => {
                self.session
                    .remove::<String>(session_keys::CHECKOUT_ID)
                    .await?;
            }
        }
        Ok(())
    }

    async fn items(&self) -> Result<Vec<CartItem>, CartError> {
        Ok(self
            .session
            .get::<Vec<CartItem>>(session_keys::CART_ITEMS)
            .await?
            .unwrap_or_default())
    }

    async fn set_items(&self, items: &[CartItem]) -> Result<(), CartError> {
        self.session.insert(session_keys::CART_ITEMS, items).await?;
        Ok(())
    }

    async fn is_open(&self) -> Result<bool, CartError> {
        Ok(self
            .session
            .get::<bool>(session_keys::CART_OPEN)
            .await?
            .unwrap_or(false))
    }

    async fn set_open(&self, open: bool) -> Result<(), CartError> {
        self.session.insert(session_keys::CART_OPEN, open).await?;
        Ok(())
    }
}

// =============================================================================
// CartService
// =============================================================================

/// Orchestrates cart mutations against the session store and the remote
/// checkout session.
pub struct CartService {
    gateway: Arc<dyn CheckoutGateway>,
    notifications: NotificationQueue,
    /// Serializes mutating operations. Held across remote calls so the
    /// checkout session always sees mutations in submission order.
    ops: tokio::sync::Mutex<()>,
}

impl CartService {
    #[must_use]
    pub fn new(gateway: Arc<dyn CheckoutGateway>, notifications: NotificationQueue) -> Self {
        Self {
            gateway,
            notifications,
            ops: tokio::sync::Mutex::new(()),
        }
    }

    /// Restore the cart's checkout session, creating a fresh one if the
    /// persisted session is gone. Persisted items are replayed into a fresh
    /// session and their line ids re-resolved by variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails. Remote failures degrade
    /// to an error notification.
    #[instrument(skip(self, store))]
    pub async fn initialize(&self, store: &dyn CartStore) -> Result<(), CartError> {
        let _guard = self.ops.lock().await;

        let mut items = store.items().await?;

        if let Some(checkout_id) = store.checkout_id().await? {
            match self.gateway.get_checkout(&checkout_id).await {
                Ok(checkout) => {
                    reconcile_line_ids(&mut items, &checkout);
                    store.set_items(&items).await?;
                    return Ok(());
                }
                Err(e) => {
                    debug!(error = %e, "persisted checkout session is gone, creating a new one");
                }
            }
        }

        let checkout = match self.create_with_retry().await {
            Ok(checkout) => checkout,
            Err(e) => {
                warn!(error = %e, "failed to create checkout session");
                self.notifications
                    .error("Checkout is temporarily unavailable");
                return Ok(());
            }
        };
        store.set_checkout_id(Some(&checkout.id)).await?;

        if items.is_empty() {
            return Ok(());
        }

        // Replay the persisted cart into the fresh session
        let lines: Vec<CheckoutLineInput> = items
            .iter()
            .map(|item| CheckoutLineInput {
                variant_id: item.variant.id.clone(),
                quantity: i64::from(item.quantity),
            })
            .collect();

        match self.gateway.add_line_items(&checkout.id, lines).await {
            Ok(updated) => {
                reconcile_line_ids(&mut items, &updated);
            }
            Err(e) => {
                warn!(error = %e, "failed to replay cart into new checkout session");
                self.notifications
                    .error("Some items could not be restored to checkout");
                for item in &mut items {
                    item.line_id = None;
                }
            }
        }
        store.set_items(&items).await?;

        Ok(())
    }

    /// Add a variant to the cart. Adding a variant that is already present
    /// merges quantities into the existing entry.
    ///
    /// The remote add happens first; local state only changes once the
    /// checkout session has accepted the line, so a remote failure leaves
    /// the cart untouched apart from an error notification.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity, or an
    /// error if the session store fails.
    #[instrument(skip(self, store, product, variant), fields(handle = %product.handle, variant_id = %variant.id))]
    pub async fn add_to_cart(
        &self,
        store: &dyn CartStore,
        product: &Product,
        variant: &ProductVariant,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let _guard = self.ops.lock().await;

        let checkout_id = match self.ensure_checkout(store).await {
            Ok(id) => id,
            Err(CartError::Store(e)) => return Err(CartError::Store(e)),
            Err(e) => {
                warn!(error = %e, "no checkout session available for add");
                self.notifications.error("Could not add to cart");
                return Ok(());
            }
        };

        let line = CheckoutLineInput {
            variant_id: variant.id.clone(),
            quantity: i64::from(quantity),
        };
        let checkout = match self.gateway.add_line_items(&checkout_id, vec![line]).await {
            Ok(checkout) => checkout,
            Err(e) => {
                warn!(error = %e, "failed to add item to checkout session");
                self.notifications.error("Could not add to cart");
                return Ok(());
            }
        };

        let mut items = store.items().await?;

        // One entry per variant
        if let Some(existing) = items.iter_mut().find(|i| i.variant.id == variant.id) {
            existing.quantity += quantity;
        } else {
            items.push(CartItem::from_variant(product, variant, quantity));
        }
        reconcile_line_ids(&mut items, &checkout);

        store.set_items(&items).await?;
        store.set_open(true).await?;
        self.notifications.success("Added to cart");

        Ok(())
    }

    /// Set a line's quantity. Quantities above `max_inventory` are clamped
    /// with an error notification; zero removes the line.
    ///
    /// The remote update happens first; local state only changes once the
    /// checkout session has accepted the new quantity, so a remote failure
    /// leaves the cart untouched apart from an error notification.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for an unknown variant and
    /// [`CartError::MissingLineId`] for a line that has never synchronized.
    #[instrument(skip(self, store), fields(variant_id = %variant_id))]
    pub async fn update_quantity(
        &self,
        store: &dyn CartStore,
        variant_id: &VariantId,
        quantity: u32,
        max_inventory: Option<u32>,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_from_cart(store, variant_id).await;
        }

        let _guard = self.ops.lock().await;

        let mut items = store.items().await?;
        let item = items
            .iter_mut()
            .find(|i| &i.variant.id == variant_id)
            .ok_or(CartError::ItemNotFound)?;

        let quantity = match max_inventory {
            Some(max) if quantity > max => {
                self.notifications
                    .error(format!("Only {max} available"));
                // Sold out clamps to zero, which is a removal
                if max == 0 {
                    drop(_guard);
                    return self.remove_from_cart(store, variant_id).await;
                }
                max
            }
            _ => quantity,
        };

        let line_id = item.line_id.clone().ok_or(CartError::MissingLineId)?;

        let Some(checkout_id) = store.checkout_id().await? else {
            warn!("cart line has an id but no checkout session is persisted");
            self.notifications.error("Could not update cart");
            return Ok(());
        };
        let update = CheckoutLineUpdate {
            line_id,
            quantity: i64::from(quantity),
        };
        if let Err(e) = self
            .gateway
            .update_line_items(&checkout_id, vec![update])
            .await
        {
            warn!(error = %e, "failed to update quantity in checkout session");
            self.notifications.error("Could not update cart");
            return Ok(());
        }

        item.quantity = quantity;
        store.set_items(&items).await?;
        self.notifications.success("Cart updated");

        Ok(())
    }

    /// Remove a variant from the cart.
    ///
    /// The remote removal happens first; a remote failure leaves the cart
    /// untouched apart from an error notification.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for an unknown variant and
    /// [`CartError::MissingLineId`] for a line that has never synchronized.
    #[instrument(skip(self, store), fields(variant_id = %variant_id))]
    pub async fn remove_from_cart(
        &self,
        store: &dyn CartStore,
        variant_id: &VariantId,
    ) -> Result<(), CartError> {
        let _guard = self.ops.lock().await;

        let mut items = store.items().await?;
        let (position, line_id) = items
            .iter()
            .enumerate()
            .find(|(_, i)| &i.variant.id == variant_id)
            .map(|(position, i)| (position, i.line_id.clone()))
            .ok_or(CartError::ItemNotFound)?;
        let line_id = line_id.ok_or(CartError::MissingLineId)?;

        let Some(checkout_id) = store.checkout_id().await? else {
            warn!("cart line has an id but no checkout session is persisted");
            self.notifications.error("Could not remove from cart");
            return Ok(());
        };
        if let Err(e) = self
            .gateway
            .remove_line_items(&checkout_id, vec![line_id])
            .await
        {
            warn!(error = %e, "failed to remove line from checkout session");
            self.notifications.error("Could not remove from cart");
            return Ok(());
        }

        items.remove(position);
        store.set_items(&items).await?;
        self.notifications.success("Removed from cart");

        Ok(())
    }

    /// Empty the local cart. The checkout session id is kept so a later add
    /// reuses the same session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self, store))]
    pub async fn clear_cart(&self, store: &dyn CartStore) -> Result<(), CartError> {
        let _guard = self.ops.lock().await;
        store.set_items(&[]).await?;
        Ok(())
    }

    /// Toggle the cart drawer. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn toggle_cart(&self, store: &dyn CartStore) -> Result<bool, CartError> {
        let open = !store.is_open().await?;
        store.set_open(open).await?;
        Ok(open)
    }

    /// Total number of units in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn cart_count(&self, store: &dyn CartStore) -> Result<u32, CartError> {
        Ok(store.items().await?.iter().map(|i| i.quantity).sum())
    }

    /// Sum of the cart's line totals, in the currency of the first item
    /// (carts never mix currencies; an empty cart totals to USD zero).
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn cart_total(&self, store: &dyn CartStore) -> Result<Price, CartError> {
        let items = store.items().await?;
        let currency = items
            .first()
            .map_or_else(CurrencyCode::default, |i| i.variant.currency_code);
        let amount = items.iter().map(|i| i.line_total().amount).sum();
        Ok(Price::new(amount, currency))
    }

    /// The web checkout URL for this cart's session.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoCheckout`] if no session exists and
    /// [`CartError::CheckoutUnavailable`] if the session cannot be fetched.
    /// Unlike cart mutations, this cannot degrade: there is no URL to
    /// redirect to without the remote session.
    #[instrument(skip(self, store))]
    pub async fn checkout_url(&self, store: &dyn CartStore) -> Result<String, CartError> {
        let checkout_id = store.checkout_id().await?.ok_or(CartError::NoCheckout)?;
        let checkout = self
            .gateway
            .get_checkout(&checkout_id)
            .await
            .map_err(|e| CartError::CheckoutUnavailable(e.to_string()))?;
        Ok(checkout.web_url)
    }

    /// Inspect a post-checkout return URL. If it marks a completed order,
    /// the cart is emptied. The checkout session id is retained; Shopify
    /// invalidates completed carts itself and [`initialize`](Self::initialize)
    /// replaces the id on the next visit.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self, store, return_url))]
    pub async fn handle_return_url(
        &self,
        store: &dyn CartStore,
        return_url: &str,
    ) -> Result<bool, CartError> {
        if !checkout_completed(return_url) {
            return Ok(false);
        }

        let _guard = self.ops.lock().await;
        store.set_items(&[]).await?;
        store.set_open(false).await?;
        self.notifications.success("Thanks for your order!");
        Ok(true)
    }

    async fn ensure_checkout(&self, store: &dyn CartStore) -> Result<CheckoutId, CartError> {
        if let Some(id) = store.checkout_id().await? {
            return Ok(id);
        }
        let checkout = self
            .create_with_retry()
            .await
            .map_err(|e| CartError::CheckoutUnavailable(e.to_string()))?;
        store.set_checkout_id(Some(&checkout.id)).await?;
        Ok(checkout.id)
    }

    /// Checkout creation gets exactly one retry.
    async fn create_with_retry(&self) -> Result<Checkout, ShopifyError> {
        match self.gateway.create_checkout().await {
            Ok(checkout) => Ok(checkout),
            Err(first) => {
                debug!(error = %first, "checkout creation failed, retrying once");
                self.gateway.create_checkout().await
            }
        }
    }
}

/// Re-resolve local line ids from a checkout snapshot, matching by variant
/// id. Lines the checkout no longer carries lose their id.
fn reconcile_line_ids(items: &mut [CartItem], checkout: &Checkout) {
    for item in items {
        item.line_id = checkout
            .line_for_variant(&item.variant.id)
            .map(|line| line.id.clone());
    }
}

/// Whether a post-checkout return URL marks a completed order.
fn checkout_completed(return_url: &str) -> bool {
    if let Ok(url) = Url::parse(return_url) {
        if url
            .query_pairs()
            .any(|(k, v)| k == "checkout_completed" && v == "true")
        {
            return true;
        }
        // Landing back on the hosted checkout domain only happens post-order
        if url
            .host_str()
            .is_some_and(|h| h == "checkout.shopify.com")
        {
            return true;
        }
        let path = url.path();
        return path.contains("thank_you") || path.contains("thank-you");
    }
    // Relative and malformed URLs fall back to substring markers
    return_url.contains("thank_you")
        || return_url.contains("thank-you")
        || return_url.contains("checkout_completed=true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use loomline_core::ProductId;
    use rust_decimal::Decimal;

    use crate::services::notifications::NotificationKind;
    use crate::shopify::types::{CheckoutLine, Money};

    /// In-memory [`CartStore`] for tests.
    #[derive(Default)]
    struct MemoryCartStore {
        checkout_id: Mutex<Option<CheckoutId>>,
        items: Mutex<Vec<CartItem>>,
        open: Mutex<bool>,
    }

    #[async_trait]
    impl CartStore for MemoryCartStore {
        async fn checkout_id(&self) -> Result<Option<CheckoutId>, CartError> {
            Ok(self.checkout_id.lock().unwrap().clone())
        }

        async fn set_checkout_id(&self, id: Option<&CheckoutId>) -> Result<(), CartError> {
            *self.checkout_id.lock().unwrap() = id.cloned();
            Ok(())
        }

        async fn items(&self) -> Result<Vec<CartItem>, CartError> {
            Ok(self.items.lock().unwrap().clone())
        }

        async fn set_items(&self, items: &[CartItem]) -> Result<(), CartError> {
            *self.items.lock().unwrap() = items.to_vec();
            Ok(())
        }

        async fn is_open(&self) -> Result<bool, CartError> {
            Ok(*self.open.lock().unwrap())
        }

        async fn set_open(&self, open: bool) -> Result<(), CartError> {
            *self.open.lock().unwrap() = open;
            Ok(())
        }
    }

    /// Stateful fake checkout backend. Tracks carts and lines like the real
    /// API, and can be told to fail the next N calls.
    #[derive(Default)]
    struct FakeGateway {
        carts: Mutex<HashMap<String, Vec<CheckoutLine>>>,
        next_id: AtomicU64,
        fail_creates: AtomicUsize,
        fail_mutations: AtomicUsize,
        create_calls: AtomicUsize,
    }

    impl FakeGateway {
        fn checkout(&self, id: &str) -> Checkout {
            let carts = self.carts.lock().unwrap();
            Checkout {
                id: CheckoutId::new(id),
                web_url: format!("https://shop.example/checkouts/{id}"),
                lines: carts.get(id).cloned().unwrap_or_default(),
            }
        }

        fn take_failure(&self, counter: &AtomicUsize) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn remote_error() -> ShopifyError {
            ShopifyError::UserError("merchandise is out of stock".to_string())
        }
    }

    #[async_trait]
    impl CheckoutGateway for FakeGateway {
        async fn create_checkout(&self) -> Result<Checkout, ShopifyError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.take_failure(&self.fail_creates) {
                return Err(Self::remote_error());
            }
            let id = format!("cart-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.carts.lock().unwrap().insert(id.clone(), Vec::new());
            Ok(self.checkout(&id))
        }

        async fn get_checkout(&self, checkout_id: &CheckoutId) -> Result<Checkout, ShopifyError> {
            if !self.carts.lock().unwrap().contains_key(checkout_id.as_str()) {
                return Err(ShopifyError::NotFound(checkout_id.to_string()));
            }
            Ok(self.checkout(checkout_id.as_str()))
        }

        async fn add_line_items(
            &self,
            checkout_id: &CheckoutId,
            lines: Vec<CheckoutLineInput>,
        ) -> Result<Checkout, ShopifyError> {
            if self.take_failure(&self.fail_mutations) {
                return Err(Self::remote_error());
            }
            {
                let mut carts = self.carts.lock().unwrap();
                let cart = carts
                    .get_mut(checkout_id.as_str())
                    .ok_or_else(|| ShopifyError::NotFound(checkout_id.to_string()))?;
                for input in lines {
                    if let Some(line) =
                        cart.iter_mut().find(|l| l.variant_id == input.variant_id)
                    {
                        line.quantity += input.quantity;
                    } else {
                        let line_number = self.next_id.fetch_add(1, Ordering::SeqCst);
                        cart.push(CheckoutLine {
                            id: LineId::new(format!("line-{line_number}")),
                            variant_id: input.variant_id,
                            quantity: input.quantity,
                            price: Money {
                                amount: "35.00".to_string(),
                                currency_code: "USD".to_string(),
                            },
                        });
                    }
                }
            }
            Ok(self.checkout(checkout_id.as_str()))
        }

        async fn update_line_items(
            &self,
            checkout_id: &CheckoutId,
            updates: Vec<CheckoutLineUpdate>,
        ) -> Result<Checkout, ShopifyError> {
            if self.take_failure(&self.fail_mutations) {
                return Err(Self::remote_error());
            }
            {
                let mut carts = self.carts.lock().unwrap();
                let cart = carts
                    .get_mut(checkout_id.as_str())
                    .ok_or_else(|| ShopifyError::NotFound(checkout_id.to_string()))?;
                for update in updates {
                    let line = cart
                        .iter_mut()
                        .find(|l| l.id == update.line_id)
                        .ok_or_else(|| ShopifyError::UserError("line not found".to_string()))?;
                    line.quantity = update.quantity;
                }
            }
            Ok(self.checkout(checkout_id.as_str()))
        }

        async fn remove_line_items(
            &self,
            checkout_id: &CheckoutId,
            line_ids: Vec<LineId>,
        ) -> Result<Checkout, ShopifyError> {
            if self.take_failure(&self.fail_mutations) {
                return Err(Self::remote_error());
            }
            {
                let mut carts = self.carts.lock().unwrap();
                let cart = carts
                    .get_mut(checkout_id.as_str())
                    .ok_or_else(|| ShopifyError::NotFound(checkout_id.to_string()))?;
                cart.retain(|l| !line_ids.contains(&l.id));
            }
            Ok(self.checkout(checkout_id.as_str()))
        }
    }

    fn product_with_variant(variant_suffix: &str) -> (Product, ProductVariant) {
        let variant = ProductVariant {
            id: VariantId::new(format!("gid://shopify/ProductVariant/{variant_suffix}")),
            title: "M".to_string(),
            available_for_sale: true,
            quantity_available: Some(12),
            sku: Some("LL-TEE-M".to_string()),
            price: Money {
                amount: "35.00".to_string(),
                currency_code: "USD".to_string(),
            },
            compare_at_price: None,
            image: None,
        };
        let product = Product {
            id: ProductId::new("gid://shopify/Product/1"),
            handle: "rib-knit-tee".to_string(),
            title: "Rib Knit Tee".to_string(),
            description: String::new(),
            available_for_sale: true,
            product_type: "Tops".to_string(),
            vendor: "Loomline".to_string(),
            tags: vec![],
            featured_image: None,
            images: vec![],
            variants: vec![variant.clone()],
            metafields: std::collections::BTreeMap::new(),
        };
        (product, variant)
    }

    fn service(gateway: &Arc<FakeGateway>) -> CartService {
        CartService::new(
            Arc::clone(gateway) as Arc<dyn CheckoutGateway>,
            NotificationQueue::new(),
        )
    }

    #[tokio::test]
    async fn test_add_creates_checkout_and_resolves_line_id() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 2)
            .await
            .unwrap();

        let items = store.items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert!(items[0].line_id.is_some());
        assert!(store.checkout_id().await.unwrap().is_some());
        assert!(store.is_open().await.unwrap());
    }

    #[tokio::test]
    async fn test_add_same_variant_merges_quantities() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();
        service
            .add_to_cart(&store, &product, &variant, 2)
            .await
            .unwrap();

        let items = store.items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_add_leaves_cart_untouched_when_remote_fails() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_mutations.store(1, Ordering::SeqCst);
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();

        assert!(store.items().await.unwrap().is_empty());
        let active = service.notifications.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_an_error() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        let result = service.add_to_cart(&store, &product, &variant, 0).await;

        assert!(matches!(result, Err(CartError::InvalidQuantity)));
        assert!(store.items().await.unwrap().is_empty());
        assert!(store.checkout_id().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_quantity_clamps_to_max_inventory() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();
        service
            .update_quantity(&store, &variant.id, 8, Some(3))
            .await
            .unwrap();

        let items = store.items().await.unwrap();
        assert_eq!(items[0].quantity, 3);
        assert!(
            service
                .notifications
                .active()
                .iter()
                .any(|n| n.kind == NotificationKind::Error)
        );
    }

    #[tokio::test]
    async fn test_update_quantity_zero_removes() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 2)
            .await
            .unwrap();
        service
            .update_quantity(&store, &variant.id, 0, None)
            .await
            .unwrap();

        assert!(store.items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sold_out_clamp_removes_the_line() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 2)
            .await
            .unwrap();
        service
            .update_quantity(&store, &variant.id, 5, Some(0))
            .await
            .unwrap();

        assert!(store.items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_variant_is_an_error() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();

        let result = service
            .update_quantity(
                &store,
                &VariantId::new("gid://shopify/ProductVariant/404"),
                2,
                None,
            )
            .await;

        assert!(matches!(result, Err(CartError::ItemNotFound)));
    }

    #[tokio::test]
    async fn test_update_unsynchronized_line_is_an_error() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        // An item persisted before it ever reached the checkout session
        let item = CartItem::from_variant(&product, &variant, 1);
        store.set_items(&[item]).await.unwrap();

        let result = service.update_quantity(&store, &variant.id, 3, None).await;
        assert!(matches!(result, Err(CartError::MissingLineId)));

        // Precondition failure leaves the cart untouched
        assert_eq!(store.items().await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_remove_unsynchronized_line_is_an_error() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        let item = CartItem::from_variant(&product, &variant, 1);
        store.set_items(&[item]).await.unwrap();

        let result = service.remove_from_cart(&store, &variant.id).await;
        assert!(matches!(result, Err(CartError::MissingLineId)));

        let items = store.items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_update_remote_failure_leaves_quantity_unchanged() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 2)
            .await
            .unwrap();
        gateway.fail_mutations.store(1, Ordering::SeqCst);

        service
            .update_quantity(&store, &variant.id, 5, None)
            .await
            .unwrap();

        assert_eq!(store.items().await.unwrap()[0].quantity, 2);
        let active = service.notifications.active();
        assert_eq!(
            active.last().map(|n| n.kind),
            Some(NotificationKind::Error)
        );
    }

    #[tokio::test]
    async fn test_remove_remote_failure_keeps_item() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();
        gateway.fail_mutations.store(1, Ordering::SeqCst);

        service.remove_from_cart(&store, &variant.id).await.unwrap();

        assert_eq!(store.items().await.unwrap().len(), 1);
        let active = service.notifications.active();
        assert_eq!(
            active.last().map(|n| n.kind),
            Some(NotificationKind::Error)
        );
    }

    #[tokio::test]
    async fn test_update_and_remove_queue_success_notifications() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();
        service
            .update_quantity(&store, &variant.id, 3, None)
            .await
            .unwrap();
        service.remove_from_cart(&store, &variant.id).await.unwrap();

        let messages: Vec<String> = service
            .notifications
            .active()
            .iter()
            .map(|n| n.message.clone())
            .collect();
        assert_eq!(
            messages,
            ["Added to cart", "Cart updated", "Removed from cart"]
        );
    }

    #[tokio::test]
    async fn test_remove_last_item_leaves_empty_cart_with_session() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();
        service.remove_from_cart(&store, &variant.id).await.unwrap();

        assert!(store.items().await.unwrap().is_empty());
        assert!(store.checkout_id().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_initialize_replays_items_into_fresh_session() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        // A cart persisted against a session the backend no longer knows
        store
            .set_checkout_id(Some(&CheckoutId::new("cart-gone")))
            .await
            .unwrap();
        let mut item = CartItem::from_variant(&product, &variant, 2);
        item.line_id = Some(LineId::new("line-stale"));
        store.set_items(&[item]).await.unwrap();

        service.initialize(&store).await.unwrap();

        let checkout_id = store.checkout_id().await.unwrap().unwrap();
        assert_ne!(checkout_id.as_str(), "cart-gone");

        let items = store.items().await.unwrap();
        assert_eq!(items[0].quantity, 2);
        let line_id = items[0].line_id.clone().unwrap();
        assert_ne!(line_id.as_str(), "line-stale");

        // The replayed line exists remotely under the new id
        let checkout = gateway.get_checkout(&checkout_id).await.unwrap();
        assert_eq!(checkout.lines.len(), 1);
        assert_eq!(checkout.lines[0].id, line_id);
    }

    #[tokio::test]
    async fn test_initialize_retries_creation_once() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_creates.store(1, Ordering::SeqCst);
        let service = service(&gateway);
        let store = MemoryCartStore::default();

        service.initialize(&store).await.unwrap();

        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 2);
        assert!(store.checkout_id().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_initialize_survives_total_creation_failure() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_creates.store(2, Ordering::SeqCst);
        let service = service(&gateway);
        let store = MemoryCartStore::default();

        service.initialize(&store).await.unwrap();

        assert!(store.checkout_id().await.unwrap().is_none());
        assert!(!service.notifications.active().is_empty());
    }

    #[tokio::test]
    async fn test_cart_count_and_total() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant_a) = product_with_variant("10");
        let (_, variant_b) = product_with_variant("11");

        service
            .add_to_cart(&store, &product, &variant_a, 2)
            .await
            .unwrap();
        service
            .add_to_cart(&store, &product, &variant_b, 1)
            .await
            .unwrap();

        assert_eq!(service.cart_count(&store).await.unwrap(), 3);
        let total = service.cart_total(&store).await.unwrap();
        assert_eq!(total.amount, Decimal::new(10500, 2));
        assert_eq!(total.display(), "$105.00");
    }

    #[tokio::test]
    async fn test_checkout_url_without_session_is_an_error() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();

        let result = service.checkout_url(&store).await;
        assert!(matches!(result, Err(CartError::NoCheckout)));
    }

    #[tokio::test]
    async fn test_completed_return_url_clears_items_but_keeps_session() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();

        let completed = service
            .handle_return_url(
                &store,
                "https://shop.example/checkouts/c1/thank_you",
            )
            .await
            .unwrap();

        assert!(completed);
        assert!(store.items().await.unwrap().is_empty());
        assert!(store.checkout_id().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_incomplete_return_url_keeps_cart() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();
        let (product, variant) = product_with_variant("10");

        service
            .add_to_cart(&store, &product, &variant, 1)
            .await
            .unwrap();

        let completed = service
            .handle_return_url(&store, "https://shop.example/checkouts/c1/review")
            .await
            .unwrap();

        assert!(!completed);
        assert_eq!(store.items().await.unwrap().len(), 1);
    }

    #[test]
    fn test_return_url_markers() {
        assert!(checkout_completed(
            "https://checkout.shopify.com/c/1/thank-you"
        ));
        assert!(checkout_completed(
            "https://shop.example/return?checkout_completed=true"
        ));
        assert!(checkout_completed("/checkouts/c1/thank_you"));
        assert!(!checkout_completed(
            "https://shop.example/return?checkout_completed=false"
        ));
        assert!(!checkout_completed("https://shop.example/collections/all"));
    }

    #[tokio::test]
    async fn test_toggle_cart_flips_state() {
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&gateway);
        let store = MemoryCartStore::default();

        assert!(service.toggle_cart(&store).await.unwrap());
        assert!(!service.toggle_cart(&store).await.unwrap());
    }
}
