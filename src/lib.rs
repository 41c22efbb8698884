pub mod cli;
pub mod collectors;
pub mod exporter;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
