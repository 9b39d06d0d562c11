//! tally-core: canonical record types, errors, and time helpers shared by the tally crates

pub mod error;
pub mod record;
pub mod time;

pub use error::{Result, TallyError};
pub use record::{
    AssociationKey, CHANNEL_ALIPAY, CHANNEL_FAMILY_CARD, CHANNEL_WECHAT_PAY, CanonicalRecord,
    Category, Direction,
};
