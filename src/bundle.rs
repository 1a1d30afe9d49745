pub mod archive;
pub mod dir_inventory;
pub mod inventory;
pub mod static_inventory;
