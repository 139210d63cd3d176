pub mod cart;
pub mod product;
pub mod review;
pub mod wishlist;

pub use cart::{Cart, CartItem, LineRef};
pub use product::ProductDetail;
pub use review::{RatingStats, Review, ReviewListResponse, ReviewPage};
pub use wishlist::{WishlistCheck, WishlistItem};
