//! Operation handlers installed on the registry root for the whole tree

mod export_resource;
mod read_resource;

pub use export_resource::ExportResourceHandler;
pub use read_resource::ReadResourceHandler;
