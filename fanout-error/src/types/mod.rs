pub mod dispatch;
pub mod logging;
pub mod settings;
pub mod subscription;

pub use dispatch::*;
pub use logging::*;
pub use settings::*;
pub use subscription::*;
