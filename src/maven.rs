pub mod coordinates;
pub mod mapping;
pub mod metadata_xml;
pub mod paths;
pub mod pom;
pub mod repository;
pub mod resolver;
pub mod version;
