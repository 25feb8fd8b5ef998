pub mod expo;
pub mod util;

pub use expo::ExpoPushSender;
