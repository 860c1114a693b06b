pub mod actions;
pub mod aliases;
pub mod details;
pub mod master_detail;
pub mod resource;
pub mod table;

pub use aliases::alias_table;
pub use master_detail::{Drill, MasterDetail, PageKind};
pub use resource::resource_view;
