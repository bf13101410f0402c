pub mod commission;
pub mod order;
pub mod referral;
pub mod settings;
pub mod stats;
#[cfg(test)]
pub mod test_utils;
pub mod user;

pub use commission::Commission;
pub use order::Order;
pub use referral::Referral;
pub use settings::Settings;
pub use stats::Stats;
pub use user::User;
