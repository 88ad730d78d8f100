//! Entity module - Contains all SeaORM entity definitions for the
//! marketplace schema: accounts, catalog, orders, the balance ledger,
//! reviews, and the legacy load-only tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account_balance;
pub mod balance_tx;
pub mod inventory;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_review;
pub mod purchase;
pub mod review_vote;
pub mod seller_review;
pub mod user;
pub mod wish;

// Re-export specific types to avoid conflicts
pub use account_balance::{
    Column as AccountBalanceColumn, Entity as AccountBalance, Model as AccountBalanceModel,
};
pub use balance_tx::{Column as BalanceTxColumn, Entity as BalanceTx, Model as BalanceTxModel};
pub use inventory::{Column as InventoryColumn, Entity as Inventory, Model as InventoryModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use product_review::{
    Column as ProductReviewColumn, Entity as ProductReview, Model as ProductReviewModel,
};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use review_vote::{Column as ReviewVoteColumn, Entity as ReviewVote, Model as ReviewVoteModel};
pub use seller_review::{
    Column as SellerReviewColumn, Entity as SellerReview, Model as SellerReviewModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wish::{Column as WishColumn, Entity as Wish, Model as WishModel};
