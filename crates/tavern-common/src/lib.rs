pub mod errors;
pub mod id;
pub mod protocol;
pub mod text;

pub use errors::{ConfigError, TavernError, ValidationError};
pub use id::{new_id, ConnectionId, NegotiationId};
pub use protocol::{
    ChatMessage, ClientMessage, IceCandidate, MemberInfo, RequestKind, SdpType, ServerMessage,
    SessionDescription, SYSTEM_AUTHOR,
};
pub use text::{validate_field, validate_optional_body, Field};

pub type Result<T> = std::result::Result<T, TavernError>;
