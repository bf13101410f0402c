pub mod commission;
pub mod commission_setting;
pub mod order;
pub mod referral_link;
pub mod user;

pub use commission::CommissionStatus;
#[allow(unused_imports)]
pub use order::OrderStatus;
#[allow(unused_imports)]
pub use user::UserRole;
