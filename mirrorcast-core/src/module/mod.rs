//! Streaming modules: catalogue, selection and lifecycle.
//!
//! | Module       | Purpose                                             |
//! |--------------|-----------------------------------------------------|
//! | `descriptor` | `ModuleId`, `Capability`, `ModuleDescriptor`         |
//! | `streaming`  | `StreamingModule` contract                          |
//! | `selection`  | Distinct-until-changed `SelectionStream`             |
//! | `registry`   | `ModuleRegistry`: selector + serialised transitions |
//! | `hosted`     | `HostedModule`: one `ServiceHost` per start          |

pub mod descriptor;
pub mod hosted;
pub mod registry;
pub mod selection;
pub mod streaming;

pub use descriptor::{Capability, ModuleDescriptor, ModuleId};
pub use hosted::HostedModule;
pub use registry::ModuleRegistry;
pub use selection::SelectionStream;
pub use streaming::StreamingModule;
