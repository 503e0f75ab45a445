//! Provider adapters bound behind the account, checkout and subscription
//! contracts.

pub mod cleeng;
pub mod inplayer;
