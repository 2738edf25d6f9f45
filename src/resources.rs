mod config_map;
mod resource_folder;

pub use self::config_map::ConfigMap;
pub use self::resource_folder::ResourceError;
pub use self::resource_folder::ResourceFolder;
