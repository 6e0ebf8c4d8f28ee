pub mod client;
pub mod identity;

pub use client::{
    ClientChanges, ClientMetadata, ClientType, OAuthClient, OAuthClientResponse,
    RevocationSummary, StoredSecret,
};
pub use identity::{BanState, UserIdentity, UserQuery, DEFAULT_BAN_REASON};
