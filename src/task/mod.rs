pub mod delay;
pub mod execute;
mod retry;
mod sync_task;

pub use delay::DelayTaskProcessor;
pub use delay::DistroDelayTask;
pub use delay::DistroDelayTaskEngine;
pub use delay::DistroDelayTaskProcessor;
pub use execute::DispatchKey;
pub use execute::ExecuteTask;
pub use execute::ExecuteTaskEngine;
pub use retry::*;
pub use sync_task::*;
