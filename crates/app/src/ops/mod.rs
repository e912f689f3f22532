pub mod generate;
pub mod init;
pub mod list;
pub mod pack;
pub mod version;

pub use generate::Generate;
pub use init::Init;
pub use list::List;
pub use pack::Pack;
pub use version::Version;
