pub mod debug;
pub mod props;
