pub mod attachment;
pub mod error;
pub mod identity;
pub mod ids;
pub mod naming;
pub mod time;

pub use attachment::{RawAttachment, RichAttachment};
pub use error::CoreError;
pub use identity::ActorProfile;
pub use ids::*;
