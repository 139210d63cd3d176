use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle for addressing one cart line from the UI.
///
/// Lines the server has confirmed are addressed by their server id; lines
/// still inside their optimistic window only have the client-assigned ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineRef {
    Server(u64),
    Pending(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-assigned id; `None` while the add is still in flight.
    #[serde(default)]
    pub id: Option<u64>,
    /// Client-assigned handle for a line awaiting confirmation. Never crosses
    /// the wire and is never persisted; a committed cart has only server ids.
    #[serde(skip)]
    pub client_ref: Option<Uuid>,
    pub product_id: u64,
    #[serde(default)]
    pub variant_id: Option<u64>,
    /// Always >= 1: a quantity reaching zero destroys the line instead.
    pub quantity: u32,
    /// Price snapshot taken when the line was added; immutable afterwards.
    pub price_at_time: Decimal,
    /// Retail price at add time; shown struck through when above the paid price.
    #[serde(default)]
    pub retail_price_at_time: Option<Decimal>,
}

impl CartItem {
    /// A new speculative line, addressable by client ref until the server
    /// assigns an id.
    pub fn pending(
        product_id: u64,
        variant_id: Option<u64>,
        quantity: u32,
        price_at_time: Decimal,
        retail_price_at_time: Option<Decimal>,
    ) -> Self {
        Self {
            id: None,
            client_ref: Some(Uuid::new_v4()),
            product_id,
            variant_id,
            quantity,
            price_at_time,
            retail_price_at_time,
        }
    }

    pub fn matches(&self, line: &LineRef) -> bool {
        match line {
            LineRef::Server(id) => self.id == Some(*id),
            LineRef::Pending(client_ref) => self.client_ref == Some(*client_ref),
        }
    }

    pub fn line_ref(&self) -> Option<LineRef> {
        match (self.id, self.client_ref) {
            (Some(id), _) => Some(LineRef::Server(id)),
            (None, Some(client_ref)) => Some(LineRef::Pending(client_ref)),
            (None, None) => None,
        }
    }

    pub fn line_subtotal(&self) -> Decimal {
        self.price_at_time * Decimal::from(self.quantity)
    }

    /// True when the item was added below its retail price.
    pub fn is_marked_down(&self) -> bool {
        self.retail_price_at_time
            .map(|retail| retail > self.price_at_time)
            .unwrap_or(false)
    }
}

/// The server-owned cart aggregate, as cached locally.
///
/// At most one gift card, one referral code and one loyalty redemption can be
/// applied at a time; the client reflects whatever the server returns and
/// enforces no stacking rules of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub id: Option<u64>,
    /// Insertion-ordered.
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub applied_gift_card_code: Option<String>,
    #[serde(default)]
    pub gift_card_discount: Option<Decimal>,
    #[serde(default)]
    pub applied_referral_code: Option<String>,
    #[serde(default)]
    pub referral_discount: Option<Decimal>,
    #[serde(default)]
    pub applied_loyalty_points: Option<u32>,
    #[serde(default)]
    pub loyalty_discount: Option<Decimal>,
    /// Server-computed aggregate of all discount sources.
    #[serde(default)]
    pub total_discount: Option<Decimal>,
    /// Server-computed authoritative subtotal, preferred over local derivation.
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

impl Cart {
    pub fn item(&self, line: &LineRef) -> Option<&CartItem> {
        self.items.iter().find(|item| item.matches(line))
    }

    pub fn item_mut(&mut self, line: &LineRef) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.matches(line))
    }

    /// The line holding a given product/variant pair, if present.
    pub fn find_line_mut(
        &mut self,
        product_id: u64,
        variant_id: Option<u64>,
    ) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id && item.variant_id == variant_id)
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Local fallback when the server has not supplied a subtotal.
    pub fn derived_subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn server_item(id: u64, quantity: u32, price: Decimal) -> CartItem {
        CartItem {
            id: Some(id),
            client_ref: None,
            product_id: id * 10,
            variant_id: None,
            quantity,
            price_at_time: price,
            retail_price_at_time: None,
        }
    }

    #[test]
    fn test_derived_subtotal() {
        let cart = Cart {
            items: vec![server_item(1, 2, dec!(10.00)), server_item(2, 1, dec!(5.00))],
            ..Cart::default()
        };
        assert_eq!(cart.derived_subtotal(), dec!(25.00));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_marked_down() {
        let mut item = server_item(1, 1, dec!(8.00));
        assert!(!item.is_marked_down());

        item.retail_price_at_time = Some(dec!(10.00));
        assert!(item.is_marked_down());

        item.retail_price_at_time = Some(dec!(8.00));
        assert!(!item.is_marked_down());
    }

    #[test]
    fn test_line_lookup_by_ref() {
        let pending = CartItem::pending(42, None, 1, dec!(3.50), None);
        let pending_ref = pending.line_ref().unwrap();
        let cart = Cart {
            items: vec![server_item(7, 1, dec!(1.00)), pending],
            ..Cart::default()
        };

        assert!(cart.item(&LineRef::Server(7)).is_some());
        assert!(cart.item(&LineRef::Server(8)).is_none());
        assert_eq!(cart.item(&pending_ref).unwrap().product_id, 42);
    }

    #[test]
    fn test_wire_deserialization() {
        // Server payloads carry plain numeric ids and decimal strings.
        let cart: Cart = serde_json::from_str(
            r#"{
                "id": 3,
                "items": [
                    {"id": 11, "product_id": 5, "quantity": 2, "price_at_time": "10.00"}
                ],
                "total_discount": "2.50",
                "subtotal": "20.00"
            }"#,
        )
        .unwrap();

        assert_eq!(cart.id, Some(3));
        assert_eq!(cart.items[0].id, Some(11));
        assert_eq!(cart.items[0].client_ref, None);
        assert_eq!(cart.items[0].price_at_time, dec!(10.00));
        assert_eq!(cart.total_discount, Some(dec!(2.50)));
    }
}
