pub mod caption;
pub mod overlay;
pub mod window;
