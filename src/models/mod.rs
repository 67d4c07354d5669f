mod amount;
mod batch_month;
mod contribution;
mod permission;
mod signatories;
mod user;

pub use amount::*;
pub use batch_month::*;
pub use contribution::*;
pub use permission::*;
pub use signatories::*;
pub use user::*;
