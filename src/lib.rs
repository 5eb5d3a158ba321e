pub mod driver;
pub mod encoding;
pub mod glyphs;
pub mod overlay;
pub mod phases;
pub mod raster;
pub mod scene;
pub mod schema;
pub mod session;
pub mod timeline;
pub mod transcode;
