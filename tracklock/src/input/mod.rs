pub mod trackmap;
pub mod trackmap_parser;
pub mod reactions;
