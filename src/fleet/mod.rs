//! Fleet core: layout, the slot registry and the worker flows that act on
//! managed windows (launch, broadcast, click capture)

pub mod activator;
pub mod broadcast;
pub mod capture;
pub mod gate;
pub mod launch;
pub mod layout;
pub mod registry;

pub use activator::WindowActivator;
pub use broadcast::{Action, DeliveryStatus, InputBroadcaster};
pub use capture::CaptureWatcher;
pub use gate::WorkerGate;
pub use launch::LaunchCoordinator;
pub use layout::Topology;
pub use registry::{RegistrySnapshot, WindowRegistry};
